//! Image format and saver discovery.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::naming::{capitalize_first, image_type_symbol};
use super::types::ImageFormatInfo;
use crate::catalog::{FormatRole, TypeCatalog};
use crate::session::IntrospectionSession;

/// Known formats in enum order, with MIME types.
pub const FORMAT_CATALOG: &[(&str, &str)] = &[
    ("gif", "image/gif"),
    ("jpeg", "image/jpeg"),
    ("magick", ""),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("heif", "image/heif"),
    ("bmp", "image/bmp"),
    ("avif", "image/avif"),
    ("jp2k", "image/jp2"),
];

// Longest suffixes first so `load_buffer` is not read as tag `..._buffer` + `load`.
const FORMAT_SUFFIXES: &[&str] = &[
    "load_buffer",
    "load_source",
    "save_buffer",
    "save_target",
    "load",
    "save",
];

const SAVER_TAGS: &[&str] = &["jpeg", "png", "webp", "tiff", "heif", "gif", "jp2k"];

const HEIF_COMPRESSION: &str = "VipsForeignHeifCompression";
const HEIF_COMPRESSION_AV1: &str = "VIPS_FOREIGN_HEIF_COMPRESSION_AV1";

/// Format tag of a loader or saver name (`jpegload_buffer` -> `jpeg`).
pub fn format_tag(name: &str) -> Option<&str> {
    FORMAT_SUFFIXES.iter().find_map(|suffix| {
        name.strip_suffix(*suffix)
            .filter(|tag| !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()))
    })
}

fn avif_supported(catalog: &dyn TypeCatalog, session: &mut IntrospectionSession) -> bool {
    catalog.format_exists(session, "heif", FormatRole::SaveBuffer)
        && catalog.enum_value_exists(session, HEIF_COMPRESSION, HEIF_COMPRESSION_AV1)
}

/// Image formats found among `operation_names`, `unknown` first, then the catalog order,
/// then any other tags sorted.
pub fn discover_image_formats<'a>(
    operation_names: impl IntoIterator<Item = &'a str>,
    catalog: &dyn TypeCatalog,
    session: &mut IntrospectionSession,
) -> Vec<ImageFormatInfo> {
    let mut tags: BTreeSet<String> = operation_names
        .into_iter()
        .filter_map(format_tag)
        .map(str::to_string)
        .collect();

    if avif_supported(catalog, session) {
        tags.insert("avif".to_string());
    }

    let mut formats = vec![ImageFormatInfo {
        tag: "unknown".to_string(),
        symbol: image_type_symbol("unknown"),
        mime_type: String::new(),
        order: 0,
    }];

    for (tag, mime) in FORMAT_CATALOG {
        if tags.remove(*tag) {
            formats.push(ImageFormatInfo {
                tag: (*tag).to_string(),
                symbol: image_type_symbol(tag),
                mime_type: (*mime).to_string(),
                order: formats.len(),
            });
        }
    }

    // BTreeSet iteration is sorted
    for tag in tags {
        debug!(tag = %tag, "Appending format outside the known catalog.");
        formats.push(ImageFormatInfo {
            symbol: image_type_symbol(&tag),
            tag,
            mime_type: String::new(),
            order: formats.len(),
        });
    }

    formats
}

/// `Has<Tag>Saver` flags, keyed by flag name.
pub fn discover_supported_savers(
    catalog: &dyn TypeCatalog,
    session: &mut IntrospectionSession,
) -> BTreeMap<String, bool> {
    let mut savers = BTreeMap::new();
    for tag in SAVER_TAGS {
        let exists = catalog.format_exists(session, tag, FormatRole::SaveBuffer);
        savers.insert(format!("Has{}Saver", capitalize_first(tag)), exists);
    }
    savers.insert(
        "HasLegacyGifSaver".to_string(),
        catalog.format_exists(session, "magick", FormatRole::SaveBuffer),
    );
    savers.insert("HasAvifSaver".to_string(), avif_supported(catalog, session));
    savers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, RawEnumValue, RawOperation};

    fn catalog(names: &[&str]) -> MemoryCatalog {
        names.iter().fold(MemoryCatalog::new(), |catalog, name| {
            catalog.with_operation(RawOperation::new(*name, ""))
        })
    }

    #[test]
    fn test_format_tag() {
        assert_eq!(format_tag("jpegload"), Some("jpeg"));
        assert_eq!(format_tag("pngsave_buffer"), Some("png"));
        assert_eq!(format_tag("webpload_source"), Some("webp"));
        assert_eq!(format_tag("jp2ksave_target"), Some("jp2k"));
        assert_eq!(format_tag("embed"), None);
        assert_eq!(format_tag("load"), None);
    }

    #[test]
    fn test_unknown_first_and_extra_tags_appended() {
        let names = [
            "pngload", "csvload", "jpegsave_buffer", "matrixload", "gifload", "embed",
        ];
        let catalog = catalog(&names);
        let mut session = IntrospectionSession::new();

        let formats = discover_image_formats(names, &catalog, &mut session);
        let tags: Vec<_> = formats.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, vec!["unknown", "gif", "jpeg", "png", "csv", "matrix"]);
        assert_eq!(formats[2].symbol, "ImageTypeJpeg");
        assert_eq!(formats[2].mime_type, "image/jpeg");
        assert_eq!(formats[4].mime_type, "");
        assert!(formats.iter().enumerate().all(|(i, f)| f.order == i));
    }

    #[test]
    fn test_avif_rule() {
        let names = ["heifsave_buffer", "heifload"];
        let mut session = IntrospectionSession::new();

        let without = catalog(&names);
        let formats = discover_image_formats(names, &without, &mut session);
        assert!(!formats.iter().any(|f| f.tag == "avif"));

        let with = catalog(&names).with_enum(
            HEIF_COMPRESSION,
            vec![RawEnumValue::new(HEIF_COMPRESSION_AV1, 4, "av1")],
        );
        let formats = discover_image_formats(names, &with, &mut session);
        assert!(formats.iter().any(|f| f.tag == "avif" && f.mime_type == "image/avif"));
        assert!(discover_supported_savers(&with, &mut session)["HasAvifSaver"]);
    }

    #[test]
    fn test_supported_savers() {
        let catalog = catalog(&["jpegsave_buffer", "magicksave_buffer", "pngsave"]);
        let mut session = IntrospectionSession::new();
        let savers = discover_supported_savers(&catalog, &mut session);

        assert!(savers["HasJpegSaver"]);
        assert!(!savers["HasPngSaver"]);
        assert!(savers["HasLegacyGifSaver"]);
        assert!(!savers["HasGifSaver"]);
        assert!(!savers["HasAvifSaver"]);
        assert!(savers.contains_key("HasJp2kSaver"));
    }
}
