//! Writing rendered files and comparing them with what is on disk.

use std::fs;
use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use tracing::debug;

use crate::error::{GenError, Result};

/// A rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the output directory.
    pub path: String,
    /// Full file content.
    pub content: String,
}

/// Write every file under `out_dir`, creating directories as needed.
pub fn write_files(out_dir: &Path, files: &[RenderedFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = out_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| GenError::io(parent, err))?;
        }
        fs::write(&path, &file.content).map_err(|err| GenError::io(&path, err))?;
        debug!(
            path = %path.display(),
            bytes = file.content.len(),
            "Wrote generated file."
        );
        written.push(path);
    }
    Ok(written)
}

/// A file that would be created or modified.
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Path relative to the output directory.
    pub rel_path: String,
    /// Content that would be written.
    pub new_content: String,
    /// Content on disk, `None` when the file does not exist.
    pub existing_content: Option<String>,
}

impl FileChange {
    /// File does not exist yet.
    pub fn is_new(&self) -> bool {
        self.existing_content.is_none()
    }

    /// File exists with different content.
    pub fn is_modified(&self) -> bool {
        match &self.existing_content {
            Some(existing) => existing != &self.new_content,
            None => false,
        }
    }

    /// File exists and matches.
    pub fn is_unchanged(&self) -> bool {
        !self.is_new() && !self.is_modified()
    }

    /// Grouped line diff against the current content, `None` when unchanged or new.
    ///
    /// Lines start with `-`, `+` or a space; hunks are separated by `...`.
    pub fn diff(&self) -> Option<String> {
        let existing = self.existing_content.as_ref()?;
        if existing == &self.new_content {
            return None;
        }

        let diff = TextDiff::from_lines(existing, &self.new_content);
        let mut output = String::new();

        output.push_str(&format!("--- {} (current)\n", self.rel_path));
        output.push_str(&format!("+++ {} (new)\n", self.rel_path));

        for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
            if idx > 0 {
                output.push_str("...\n");
            }
            for op in group {
                for change in diff.iter_changes(op) {
                    let sign = match change.tag() {
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                        ChangeTag::Equal => " ",
                    };
                    output.push_str(sign);
                    output.push_str(change.value());
                    if change.missing_newline() {
                        output.push('\n');
                    }
                }
            }
        }

        Some(output)
    }
}

/// Compare rendered files with the contents of `out_dir`.
pub fn collect_changes(out_dir: &Path, files: &[RenderedFile]) -> Result<Vec<FileChange>> {
    let mut changes = Vec::with_capacity(files.len());
    for file in files {
        let target = out_dir.join(&file.path);
        let existing_content = if target.exists() {
            Some(fs::read_to_string(&target).map_err(|err| GenError::io(&target, err))?)
        } else {
            None
        };
        changes.push(FileChange {
            rel_path: file.path.clone(),
            new_content: file.content.clone(),
            existing_content,
        });
    }

    // Sort by path for consistent output
    changes.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(changes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> RenderedFile {
        RenderedFile {
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_files(dir.path(), &[file("nested/vips.go", "package vips\n")]).unwrap();
        assert_eq!(written, vec![dir.path().join("nested/vips.go")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("nested/vips.go")).unwrap(),
            "package vips\n"
        );
    }

    #[test]
    fn test_collect_changes_classifies_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("same.go"), "a\n").unwrap();
        fs::write(dir.path().join("changed.go"), "a\nb\n").unwrap();

        let changes = collect_changes(
            dir.path(),
            &[
                file("same.go", "a\n"),
                file("new.go", "x\n"),
                file("changed.go", "a\nc\n"),
            ],
        )
        .unwrap();

        let by_path = |p: &str| changes.iter().find(|c| c.rel_path == p).unwrap();
        assert!(by_path("same.go").is_unchanged());
        assert!(by_path("new.go").is_new());
        assert!(by_path("changed.go").is_modified());
        assert_eq!(changes[0].rel_path, "changed.go");

        let diff = by_path("changed.go").diff().unwrap();
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+c\n"));
        assert!(by_path("same.go").diff().is_none());
    }
}
