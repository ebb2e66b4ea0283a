//! End-to-end run: catalog -> normalizer -> emitter.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::catalog::TypeCatalog;
use crate::config::GeneratorConfig;
use crate::emit::{EmissionReport, Emitter, TemplateSource};
use crate::error::Result;
use crate::ir::{NormalizedIr, Normalizer};
use crate::marshal::{CShimRules, GoRules};
use crate::session::{DiscoveryCounters, IntrospectionSession};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    /// Operation names the catalog returned.
    pub discovered: usize,
    /// Operations skipped for any reason.
    pub filtered: usize,
    /// Operations with generated wrappers.
    pub emitted: usize,
    /// What the emitter wrote.
    pub emission: EmissionReport,
    /// Session counters at the end of discovery.
    pub counters: DiscoveryCounters,
}

/// Discover and normalize without emitting.
pub fn introspect(catalog: &dyn TypeCatalog, config: &GeneratorConfig) -> Result<NormalizedIr> {
    let mut session = IntrospectionSession::new();
    Normalizer::new(catalog, &mut session, config, &GoRules, &CShimRules).run()
}

/// Generate Go/cgo wrappers for everything `catalog` offers into `out_dir`.
pub fn generate(
    catalog: &dyn TypeCatalog,
    config: &GeneratorConfig,
    templates: impl TemplateSource + 'static,
    out_dir: &Path,
) -> Result<GenerationSummary> {
    let mut session = IntrospectionSession::new();
    let normalized =
        Normalizer::new(catalog, &mut session, config, &GoRules, &CShimRules).run()?;
    let counters = session.counters();

    let emission = Emitter::new(templates).emit(&normalized.ir, out_dir)?;

    let summary = GenerationSummary {
        discovered: normalized.report.discovered,
        filtered: normalized.report.filtered(),
        emitted: emission.operations,
        emission,
        counters,
    };

    info!(
        discovered = summary.discovered,
        filtered = summary.filtered,
        emitted = summary.emitted,
        "Generation finished."
    );

    Ok(summary)
}
