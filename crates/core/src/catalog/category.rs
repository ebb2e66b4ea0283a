//! Documentation categories and reference links.
//!
//! Categories group generated wrappers in docs; they never decide inclusion.

use std::fmt;

const PREFIXES: &[(DocCategory, &[&str])] = &[
    (
        DocCategory::Arithmetic,
        &[
            "add", "subtract", "multiply", "divide", "linear", "math", "abs", "sign", "round",
            "floor", "ceil", "max", "min", "avg",
        ],
    ),
    (
        DocCategory::Convolution,
        &["conv", "sharpen", "gaussblur", "sobel", "canny"],
    ),
    (
        DocCategory::Resample,
        &["resize", "shrink", "reduce", "thumbnail", "affine", "similarity"],
    ),
    (
        DocCategory::Colour,
        &[
            "colourspace",
            "icc",
            "Lab2XYZ",
            "XYZ2Lab",
            "Lab2LCh",
            "LCh2Lab",
            "sRGB2HSV",
            "HSV2sRGB",
        ],
    ),
    (
        DocCategory::Conversion,
        &[
            "flip", "rot", "extract", "embed", "crop", "join", "bandjoin", "bandmean",
        ],
    ),
    (
        DocCategory::Histogram,
        &["hist_", "stdif", "percent", "profile"],
    ),
    (
        DocCategory::Morphology,
        &["morph", "rank", "erode", "dilate"],
    ),
    (DocCategory::Draw, &["draw_", "text"]),
];

/// Documentation grouping for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocCategory {
    /// Pixel arithmetic.
    Arithmetic,
    /// Convolution filters.
    Convolution,
    /// Resampling.
    Resample,
    /// Colour space conversion.
    Colour,
    /// Geometric and band conversion.
    Conversion,
    /// Histograms.
    Histogram,
    /// Morphology.
    Morphology,
    /// Drawing.
    Draw,
    /// Loaders.
    ForeignLoad,
    /// Savers.
    ForeignSave,
    /// Anything else.
    Operation,
    /// A category named by the descriptor's source file (e.g. `create`).
    Named(String),
}

impl DocCategory {
    /// Classify by operation name. Suffixes win over prefixes.
    pub fn from_operation_name(name: &str) -> Self {
        if ["load", "load_buffer", "load_source"]
            .iter()
            .any(|s| name.ends_with(s))
        {
            return DocCategory::ForeignLoad;
        }
        if ["save", "save_buffer", "save_target"]
            .iter()
            .any(|s| name.ends_with(s))
        {
            return DocCategory::ForeignSave;
        }

        PREFIXES
            .iter()
            .find(|(_, prefixes)| prefixes.iter().any(|p| name.starts_with(p)))
            .map_or(DocCategory::Operation, |(category, _)| category.clone())
    }

    /// Category from a descriptor source file such as `libvips/include/vips/arithmetic.h`.
    pub fn from_source_file(filename: &str) -> Option<Self> {
        let (_, rest) = filename.split_once("vips/")?;
        let stem = rest.rsplit('/').next().unwrap_or(rest);
        let stem = stem.split('.').next().unwrap_or(stem);
        if stem.is_empty() {
            return None;
        }
        Some(Self::from_name(stem))
    }

    /// Parse a stored category name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "arithmetic" => DocCategory::Arithmetic,
            "convolution" => DocCategory::Convolution,
            "resample" => DocCategory::Resample,
            "colour" => DocCategory::Colour,
            "conversion" => DocCategory::Conversion,
            "histogram" => DocCategory::Histogram,
            "morphology" => DocCategory::Morphology,
            "draw" => DocCategory::Draw,
            "foreign_load" => DocCategory::ForeignLoad,
            "foreign_save" => DocCategory::ForeignSave,
            "operation" => DocCategory::Operation,
            other => DocCategory::Named(other.to_string()),
        }
    }

    /// Stable name.
    pub fn as_str(&self) -> &str {
        match self {
            DocCategory::Arithmetic => "arithmetic",
            DocCategory::Convolution => "convolution",
            DocCategory::Resample => "resample",
            DocCategory::Colour => "colour",
            DocCategory::Conversion => "conversion",
            DocCategory::Histogram => "histogram",
            DocCategory::Morphology => "morphology",
            DocCategory::Draw => "draw",
            DocCategory::ForeignLoad => "foreign_load",
            DocCategory::ForeignSave => "foreign_save",
            DocCategory::Operation => "operation",
            DocCategory::Named(name) => name,
        }
    }

    /// Reference documentation page.
    pub fn doc_page(&self) -> String {
        if self.as_str().starts_with("foreign") {
            "VipsForeignSave".to_string()
        } else {
            format!("libvips-{}", self.as_str())
        }
    }
}

impl fmt::Display for DocCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference documentation link for an operation.
pub fn doc_url(name: &str, category: &DocCategory) -> String {
    format!(
        "https://www.libvips.org/API/current/{}.html#vips-{}",
        category.doc_page(),
        name.replace('_', "-")
    )
}
