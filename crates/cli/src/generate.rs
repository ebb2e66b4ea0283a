use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use vipsgen_core::emit::{RenderedFile, TemplateSource, collect_changes};
use vipsgen_core::{
    DirectoryTemplateSource, EmbeddedTemplateSource, Emitter, GenerationSummary, generate,
    introspect,
};

use crate::run_cli;
use crate::source::SourceArgs;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output directory
    #[arg(long, value_name = "DIR", default_value = "./out")]
    pub out: PathBuf,

    /// Template directory with `templates/` and `statics/` overrides
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Compare with the output directory instead of writing; fails when anything differs
    #[arg(long)]
    pub check: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn run(args: GenerateArgs) -> i32 {
    run_cli(|| run_inner(&args))
}

fn run_inner(args: &GenerateArgs) -> Result<(), String> {
    let config = args.source.config()?;
    let templates = template_source(args.templates.as_deref());

    if args.check {
        return args.source.with_catalog(|catalog| {
            let normalized = introspect(catalog, &config).map_err(|err| err.to_string())?;
            let rendered = Emitter::new(templates)
                .render(&normalized.ir)
                .map_err(|err| err.to_string())?;
            check(&args.out, &rendered.files)
        });
    }

    let summary = args.source.with_catalog(|catalog| {
        generate(catalog, &config, templates, &args.out).map_err(|err| err.to_string())
    })?;
    print_summary(&args.out, &summary);
    Ok(())
}

fn template_source(dir: Option<&Path>) -> Box<dyn TemplateSource> {
    match dir {
        Some(dir) => Box::new(DirectoryTemplateSource::new(dir)),
        None => Box::new(EmbeddedTemplateSource),
    }
}

fn check(out: &Path, files: &[RenderedFile]) -> Result<(), String> {
    let changes = collect_changes(out, files).map_err(|err| err.to_string())?;
    let new_files: Vec<_> = changes.iter().filter(|c| c.is_new()).collect();
    let modified_files: Vec<_> = changes.iter().filter(|c| c.is_modified()).collect();
    let unchanged_count = changes.len() - new_files.len() - modified_files.len();

    if !new_files.is_empty() {
        println!("{}", style("Missing files:").green());
        for file in &new_files {
            println!("  {} {}", style("+").green(), file.rel_path);
        }
        println!();
    }

    if !modified_files.is_empty() {
        println!("{}", style("Out of date:").yellow());
        for file in &modified_files {
            println!("  {} {}", style("~").yellow(), file.rel_path);
        }
        println!();

        for file in &modified_files {
            if let Some(diff) = file.diff() {
                println!("{}", colorize_diff(&diff));
            }
        }
    }

    println!(
        "Summary: {} new, {} modified, {} unchanged",
        new_files.len(),
        modified_files.len(),
        unchanged_count
    );

    if new_files.is_empty() && modified_files.is_empty() {
        println!("{} Generated files are up to date.", style("✓").green());
        Ok(())
    } else {
        Err(format!("Generated files in {} are out of date", out.display()))
    }
}

fn colorize_diff(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("---") || line.starts_with("+++") {
                style(line).bold().to_string()
            } else if line.starts_with('-') {
                style(line).red().to_string()
            } else if line.starts_with('+') {
                style(line).green().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_summary(out: &Path, summary: &GenerationSummary) {
    println!(
        "{} Generated {} operation(s) into {}",
        style("✓").green(),
        style(summary.emitted).cyan(),
        style(out.display()).bold()
    );
    println!(
        "  {} discovered, {} filtered, {} file(s) written ({} static)",
        summary.discovered,
        summary.filtered,
        summary.emission.files.len(),
        summary.emission.statics
    );
}
