//! Catalog and config selection shared by `generate` and `introspect`.

use std::path::{Path, PathBuf};

use clap::Args;
use regex::Regex;
use tracing::info;
use vipsgen_core::{GeneratorConfig, StaticCatalog, StaticCatalogOptions, TypeCatalog};

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Serialized introspection descriptor (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub descriptor: Option<PathBuf>,

    /// Discover operations from the installed libvips
    #[cfg(feature = "live")]
    #[arg(long, conflicts_with = "descriptor")]
    pub live: bool,

    /// Generator config (TOML or YAML). Defaults to ./vipsgen.toml when present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only keep descriptor callables whose name matches
    #[arg(long, value_name = "REGEX")]
    pub include: Option<String>,

    /// Keep callables marked non-introspectable
    #[arg(long)]
    pub ignore_non_introspectable: bool,

    /// Expected descriptor namespace
    #[arg(long, value_name = "NAME", default_value = "Vips")]
    pub namespace: String,

    /// Expected descriptor namespace major version
    #[arg(long, value_name = "MAJOR", default_value_t = 8)]
    pub namespace_version: u32,
}

impl SourceArgs {
    /// Resolve the config relative to the working directory.
    pub fn config(&self) -> Result<GeneratorConfig, String> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        GeneratorConfig::load(self.config.as_deref(), &cwd).map_err(|err| err.to_string())
    }

    fn static_options(&self) -> Result<StaticCatalogOptions, String> {
        let include = self
            .include
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| format!("Invalid --include pattern: {err}"))?;
        Ok(StaticCatalogOptions {
            include,
            ignore_non_introspectable: self.ignore_non_introspectable,
            expected_namespace: self.namespace.clone(),
            expected_major: self.namespace_version,
        })
    }

    #[cfg(feature = "live")]
    fn wants_live(&self) -> bool {
        self.live
    }

    #[cfg(not(feature = "live"))]
    fn wants_live(&self) -> bool {
        false
    }

    /// Open the selected catalog and hand it to `f`.
    ///
    /// The live runtime, when used, lives exactly as long as the call.
    pub fn with_catalog<T>(
        &self,
        f: impl FnOnce(&dyn TypeCatalog) -> Result<T, String>,
    ) -> Result<T, String> {
        if let Some(path) = &self.descriptor {
            let catalog = open_descriptor(path, &self.static_options()?)?;
            return f(&catalog);
        }

        if self.wants_live() {
            return with_live_catalog(f);
        }

        Err(no_source_message())
    }
}

fn open_descriptor(path: &Path, options: &StaticCatalogOptions) -> Result<StaticCatalog, String> {
    let catalog = StaticCatalog::from_path(path, options).map_err(|err| err.to_string())?;
    let stats = catalog.debug_info();
    info!(
        descriptor = %path.display(),
        functions_found = stats.functions_found,
        processed = stats.processed,
        filtered_out = stats.filtered_out,
        deprecated_skipped = stats.deprecated_skipped,
        non_operation_skipped = stats.non_operation_skipped,
        "Loaded descriptor."
    );
    Ok(catalog)
}

#[cfg(feature = "live")]
fn with_live_catalog<T>(
    f: impl FnOnce(&dyn TypeCatalog) -> Result<T, String>,
) -> Result<T, String> {
    let runtime = vipsgen_live::LiveRuntime::init().map_err(|err| err.to_string())?;
    let catalog = vipsgen_live::LiveCatalog::new(&runtime);
    f(&catalog)
}

#[cfg(not(feature = "live"))]
fn with_live_catalog<T>(
    _f: impl FnOnce(&dyn TypeCatalog) -> Result<T, String>,
) -> Result<T, String> {
    Err(no_source_message())
}

#[cfg(feature = "live")]
fn no_source_message() -> String {
    "No operation source: pass --descriptor <FILE> or --live".to_string()
}

#[cfg(not(feature = "live"))]
fn no_source_message() -> String {
    "No operation source: pass --descriptor <FILE> (rebuild with --features live for --live)"
        .to_string()
}
