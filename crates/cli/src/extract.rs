use std::path::PathBuf;

use clap::Args;
use console::style;
use vipsgen_core::EmbeddedTemplateSource;
use vipsgen_core::emit::write_files;

use crate::run_cli;

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Destination; pass it back to `generate --templates`
    #[arg(long, value_name = "DIR", default_value = "./templates")]
    pub dir: PathBuf,
}

pub fn run(args: ExtractArgs) -> i32 {
    run_cli(|| run_inner(&args))
}

fn run_inner(args: &ExtractArgs) -> Result<(), String> {
    let files = EmbeddedTemplateSource::files().map_err(|err| err.to_string())?;
    let written = write_files(&args.dir, &files).map_err(|err| err.to_string())?;
    for path in &written {
        println!("  {} {}", style("+").green(), path.display());
    }
    println!(
        "{} Extracted {} file(s) into {}",
        style("✓").green(),
        written.len(),
        style(args.dir.display()).bold()
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_writes_templates_and_statics() {
        let dir = tempfile::tempdir().unwrap();
        let code = run(ExtractArgs {
            dir: dir.path().to_path_buf(),
        });
        assert_eq!(code, 0);
        assert!(dir.path().join("templates/vips.go.tera").is_file());
        assert!(dir.path().join("statics/vips_helpers.go.tmpl").is_file());
    }
}
