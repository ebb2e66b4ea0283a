//! Template loading and rendering.
//!
//! Templates are tera files named after the artifact they produce (`vips.go.tera`).
//! Static files are copied next to the generated ones with a trailing `.tmpl` stripped.

use std::collections::BTreeMap;
use std::error::Error as _;
use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::RustEmbed;
use tera::{Context, Tera};
use tracing::debug;
use walkdir::WalkDir;

use super::writer::RenderedFile;
use crate::error::{GenError, Result};

const STATIC_SUFFIX: &str = ".tmpl";

#[derive(RustEmbed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

#[derive(RustEmbed)]
#[folder = "statics/"]
struct EmbeddedStatics;

/// Where templates and static files come from.
pub trait TemplateSource {
    /// Short description for logs.
    fn describe(&self) -> String;

    /// Template text by file name, e.g. `vips.go.tera`.
    fn load(&self, name: &str) -> Result<String>;

    /// Static files as (output path, content), sorted by path.
    fn statics(&self) -> Result<Vec<(String, String)>>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn load(&self, name: &str) -> Result<String> {
        (**self).load(name)
    }

    fn statics(&self) -> Result<Vec<(String, String)>> {
        (**self).statics()
    }
}

/// Output path of a static file.
pub fn static_output_name(path: &str) -> &str {
    path.strip_suffix(STATIC_SUFFIX).unwrap_or(path)
}

/// Render a template with tera.
pub fn render(name: &str, template: &str, context: &Context) -> Result<String> {
    Tera::one_off(template, context, false).map_err(|err| {
        // tera keeps the useful part in the source chain
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(inner) = source {
            message.push_str(&format!(": {inner}"));
            source = inner.source();
        }
        GenError::Emission {
            file: name.trim_end_matches(".tera").to_string(),
            template: name.to_string(),
            message,
        }
    })
}

fn utf8(name: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|err| GenError::Emission {
        file: static_output_name(name).to_string(),
        template: name.to_string(),
        message: format!("not valid UTF-8: {err}"),
    })
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplateSource;

impl TemplateSource for EmbeddedTemplateSource {
    fn describe(&self) -> String {
        "embedded".to_string()
    }

    fn load(&self, name: &str) -> Result<String> {
        let file = EmbeddedTemplates::get(name).ok_or_else(|| GenError::Emission {
            file: name.trim_end_matches(".tera").to_string(),
            template: name.to_string(),
            message: "template not found".to_string(),
        })?;
        utf8(name, &file.data)
    }

    fn statics(&self) -> Result<Vec<(String, String)>> {
        let mut statics = Vec::new();
        for path in EmbeddedStatics::iter() {
            if let Some(file) = EmbeddedStatics::get(&path) {
                statics.push((
                    static_output_name(&path).to_string(),
                    utf8(&path, &file.data)?,
                ));
            }
        }
        // Sort for deterministic output
        statics.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(statics)
    }
}

impl EmbeddedTemplateSource {
    /// Every embedded file laid out as a [`DirectoryTemplateSource`] root expects:
    /// `templates/<name>.tera` and `statics/<name>.tmpl`, unstripped.
    pub fn files() -> Result<Vec<RenderedFile>> {
        let mut files = Vec::new();
        for path in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&path) {
                files.push(RenderedFile {
                    path: format!("templates/{path}"),
                    content: utf8(&path, &file.data)?,
                });
            }
        }
        for path in EmbeddedStatics::iter() {
            if let Some(file) = EmbeddedStatics::get(&path) {
                files.push(RenderedFile {
                    path: format!("statics/{path}"),
                    content: utf8(&path, &file.data)?,
                });
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// Templates read from `<root>/templates` and `<root>/statics`.
///
/// Files missing from the directory fall back to the embedded set, per name.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateSource {
    root: PathBuf,
}

impl DirectoryTemplateSource {
    /// Source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirectoryTemplateSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join("templates").join(name);
        if path.exists() {
            debug!(template = %path.display(), "Loading template from directory.");
            return fs::read_to_string(&path).map_err(|err| GenError::io(&path, err));
        }
        debug!(template = name, "Template not in directory, using embedded copy.");
        EmbeddedTemplateSource.load(name)
    }

    fn statics(&self) -> Result<Vec<(String, String)>> {
        let mut statics: BTreeMap<String, String> =
            EmbeddedTemplateSource.statics()?.into_iter().collect();

        let dir = self.root.join("statics");
        if dir.is_dir() {
            for entry in WalkDir::new(&dir) {
                let entry = entry.map_err(|err| GenError::Emission {
                    file: dir.display().to_string(),
                    template: String::new(),
                    message: format!("Failed to read static directory: {err}"),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel_path = entry
                    .path()
                    .strip_prefix(&dir)
                    .map_err(|err| GenError::Internal(format!("Failed to build relative path: {err}")))?;
                let path_str = rel_path.to_string_lossy().replace('\\', "/");
                let content = fs::read_to_string(entry.path())
                    .map_err(|err| GenError::io(entry.path(), err))?;
                statics.insert(static_output_name(&path_str).to_string(), content);
            }
        }

        Ok(statics.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_templates_present() {
        for name in ["vips.go.tera", "vips.h.tera", "vips.c.tera", "image.go.tera", "types.go.tera"] {
            assert!(EmbeddedTemplateSource.load(name).is_ok(), "{name}");
        }
        assert!(EmbeddedTemplateSource.load("missing.tera").is_err());
    }

    #[test]
    fn test_static_names_stripped() {
        let statics = EmbeddedTemplateSource.statics().unwrap();
        let names: Vec<_> = statics.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"image_ref.go"));
        assert!(names.contains(&"vips_helpers.go"));
        assert!(names.iter().all(|n| !n.ends_with(".tmpl")));
        assert_eq!(static_output_name("a/b.go.tmpl"), "a/b.go");
        assert_eq!(static_output_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_directory_overrides_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::create_dir_all(dir.path().join("statics")).unwrap();
        fs::write(dir.path().join("templates/vips.h.tera"), "// custom").unwrap();
        fs::write(dir.path().join("statics/extra.go.tmpl"), "package vips\n").unwrap();

        let source = DirectoryTemplateSource::new(dir.path());
        assert_eq!(source.load("vips.h.tera").unwrap(), "// custom");
        assert!(source.load("vips.go.tera").unwrap().contains("DO NOT EDIT"));

        let statics = source.statics().unwrap();
        assert!(statics.iter().any(|(n, c)| n == "extra.go" && c == "package vips\n"));
        assert!(statics.iter().any(|(n, _)| n == "image_ref.go"));
    }

    #[test]
    fn test_extracted_files_round_trip_through_directory() {
        let files = EmbeddedTemplateSource::files().unwrap();
        assert!(files.iter().any(|f| f.path == "templates/vips.go.tera"));
        assert!(files.iter().any(|f| f.path == "statics/image_ref.go.tmpl"));

        let dir = tempfile::tempdir().unwrap();
        crate::emit::write_files(dir.path(), &files).unwrap();
        let source = DirectoryTemplateSource::new(dir.path());
        assert_eq!(
            source.load("types.go.tera").unwrap(),
            EmbeddedTemplateSource.load("types.go.tera").unwrap()
        );
        assert_eq!(source.statics().unwrap(), EmbeddedTemplateSource.statics().unwrap());
    }

    #[test]
    fn test_render_error_names_template() {
        let err = render("vips.go.tera", "{{ missing.field }}", &Context::new()).unwrap_err();
        assert!(matches!(
            err,
            GenError::Emission { ref file, ref template, .. }
                if file == "vips.go" && template == "vips.go.tera"
        ));
    }
}
