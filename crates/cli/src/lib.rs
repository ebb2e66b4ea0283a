//! Command-line front end for vipsgen.
//!
//! The `vipsgen` binary is a thin shell over [`run`]; everything here is reachable from tests
//! without spawning a process.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod extract;
mod generate;
mod introspect;
mod source;

#[derive(Parser)]
#[command(
    name = "vipsgen",
    version,
    about = "Generate Go/cgo bindings for libvips operations"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate wrappers into an output directory
    Generate(generate::GenerateArgs),
    /// Print the normalized operation model
    Introspect(introspect::IntrospectArgs),
    /// Write the embedded templates to disk for customization
    ExtractTemplates(extract::ExtractArgs),
}

/// Parse `args` (including argv[0]) and run the selected command. Returns the exit code.
pub fn run(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => {
            init_tracing();
            match cli.command {
                Some(Commands::Generate(args)) => generate::run(args),
                Some(Commands::Introspect(args)) => introspect::run(args),
                Some(Commands::ExtractTemplates(args)) => extract::run(args),
                None => {
                    let mut cmd = Cli::command();
                    let _ = cmd.print_help();
                    println!();
                    0
                }
            }
        }
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

/// Map a command body's result to an exit code, printing the error.
fn run_cli<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), String>,
{
    match f() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err}", console::style("error:").red().bold());
            1
        }
    }
}

fn init_tracing() {
    // VIPSGEN_LOG controls log level: "trace", "debug", "info", "warn", "error"
    // or a full tracing filter spec like "vipsgen_core=debug,vipsgen_live=trace"
    let filter = match std::env::var("VIPSGEN_LOG") {
        Ok(level) if is_plain_level(&level) => plain_filter(&level),
        Ok(spec) => spec,
        Err(_) => plain_filter("info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn plain_filter(level: &str) -> String {
    ["vipsgen_core", "vipsgen_live", "vipsgen_cli"]
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_level_detection() {
        assert!(is_plain_level("DEBUG"));
        assert!(!is_plain_level("vipsgen_core=debug"));
        assert_eq!(
            plain_filter("warn"),
            "vipsgen_core=warn,vipsgen_live=warn,vipsgen_cli=warn"
        );
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        assert_eq!(run(vec!["vipsgen".into(), "frobnicate".into()]), 2);
    }
}
