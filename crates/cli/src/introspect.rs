use clap::{Args, ValueEnum};
use vipsgen_core::introspect;

use crate::run_cli;
use crate::source::SourceArgs;

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
#[value(rename_all = "lower")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Args, Debug, Clone)]
pub struct IntrospectArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn run(args: IntrospectArgs) -> i32 {
    run_cli(|| run_inner(&args))
}

fn run_inner(args: &IntrospectArgs) -> Result<(), String> {
    let config = args.source.config()?;
    let normalized = args
        .source
        .with_catalog(|catalog| introspect(catalog, &config).map_err(|err| err.to_string()))?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&normalized)
            .map_err(|err| format!("Failed to serialize IR: {err}"))?,
        OutputFormat::Yaml => serde_yaml::to_string(&normalized)
            .map_err(|err| format!("Failed to serialize IR: {err}"))?,
    };
    println!("{output}");
    Ok(())
}
