//! Code emission from the IR.
//!
//! The pipeline per operation is a small state machine
//! (`Classified -> ArgumentsResolved -> BodyEmitted -> Written`):
//! 1. Resolve: ask the host and foreign [`MarshalRules`] for fragments of every argument
//! 2. Body: stitch fragments into the host wrapper, options aggregate, foreign shims and
//!    receiver surface via the [`Emit`] trait
//! 3. Render: hand the bodies to the tera templates, one file per artifact
//! 4. Write: put rendered and static files under the output directory
//!
//! ## Module Structure
//!
//! - `code`: Go/C syntax nodes and the `Emit` trait
//! - `plan`: per-operation state machine and body construction
//! - `receiver`: methods and constructors on the managed image type
//! - `templates`: template sources (embedded or directory) and rendering
//! - `writer`: file output and change detection

mod code;
mod plan;
mod receiver;
mod templates;
mod writer;

pub use code::{C_INDENT, CFunction, Emit, GO_INDENT, GoField, GoFunction, GoStruct, Stmt};
pub use plan::{EmissionShape, EmissionState, OperationBody, OperationPlan, ResolvedArgument};
pub use templates::{
    DirectoryTemplateSource, EmbeddedTemplateSource, TemplateSource, render, static_output_name,
};
pub use writer::{FileChange, RenderedFile, collect_changes, write_files};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tera::Context;
use tracing::{debug, info};

use crate::error::Result;
use crate::ir::GeneratorIr;
use crate::marshal::{CShimRules, GoRules, MarshalRules, VECTOR_CAPACITY};

/// Generated artifacts in output order, with the template producing each.
pub const ARTIFACTS: &[(&str, &str)] = &[
    ("vips.go", "vips.go.tera"),
    ("vips.h", "vips.h.tera"),
    ("vips.c", "vips.c.tera"),
    ("image.go", "image.go.tera"),
    ("types.go", "types.go.tera"),
];

/// Host packages imported on demand by generated Go files.
const GO_IMPORTS: &[&str] = &["runtime", "unsafe"];

/// Rendered files, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    /// Generated artifacts followed by static files.
    pub files: Vec<RenderedFile>,
    /// Operations with a wrapper in the output.
    pub operations: usize,
    /// Static files included.
    pub statics: usize,
}

/// What an emission run wrote.
#[derive(Debug, Clone, Serialize)]
pub struct EmissionReport {
    /// Files written, in write order.
    pub files: Vec<PathBuf>,
    /// Operations emitted.
    pub operations: usize,
    /// Static files copied.
    pub statics: usize,
}

/// Renders the IR through a template source and a pair of rule tables.
pub struct Emitter {
    templates: Box<dyn TemplateSource>,
    host: Box<dyn MarshalRules>,
    foreign: Box<dyn MarshalRules>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("templates", &self.templates.describe())
            .field("host", &self.host.language())
            .field("foreign", &self.foreign.language())
            .finish()
    }
}

impl Emitter {
    /// Go wrappers over C shims, rendered from `templates`.
    pub fn new(templates: impl TemplateSource + 'static) -> Self {
        Self::with_rules(templates, GoRules, CShimRules)
    }

    /// Emitter with explicit rule tables.
    pub fn with_rules(
        templates: impl TemplateSource + 'static,
        host: impl MarshalRules + 'static,
        foreign: impl MarshalRules + 'static,
    ) -> Self {
        Self {
            templates: Box::new(templates),
            host: Box::new(host),
            foreign: Box::new(foreign),
        }
    }

    /// Resolve and build bodies for every operation, in IR order.
    ///
    /// The first argument without a rule aborts the whole run.
    pub fn plan<'ir>(&self, ir: &'ir GeneratorIr) -> Result<Vec<OperationPlan<'ir>>> {
        let mut plans = Vec::with_capacity(ir.operations.len());
        for operation in &ir.operations {
            let mut plan = OperationPlan::new(operation);
            plan.resolve(self.host.as_ref(), self.foreign.as_ref())?;
            plan.emit_body(self.host.as_ref(), self.foreign.as_ref(), &ir.image_formats)?;
            debug!(
                operation = %operation.name,
                shapes = ?plan.shapes(),
                "Emitted operation body."
            );
            plans.push(plan);
        }
        Ok(plans)
    }

    /// Render every artifact and static file without writing.
    pub fn render(&self, ir: &GeneratorIr) -> Result<RenderedOutput> {
        let plans = self.plan(ir)?;
        self.render_plans(ir, &plans)
    }

    /// Render and write under `out_dir`.
    pub fn emit(&self, ir: &GeneratorIr, out_dir: &Path) -> Result<EmissionReport> {
        let mut plans = self.plan(ir)?;
        let output = self.render_plans(ir, &plans)?;
        let files = write_files(out_dir, &output.files)?;
        for plan in &mut plans {
            plan.mark_written()?;
        }

        info!(
            out_dir = %out_dir.display(),
            operations = output.operations,
            files = files.len(),
            "Emission finished."
        );

        Ok(EmissionReport {
            files,
            operations: output.operations,
            statics: output.statics,
        })
    }

    fn render_plans(&self, ir: &GeneratorIr, plans: &[OperationPlan<'_>]) -> Result<RenderedOutput> {
        let bodies: Vec<&OperationBody> = plans.iter().filter_map(OperationPlan::body).collect();

        let wrappers: Vec<String> = bodies
            .iter()
            .map(|b| {
                let mut text = String::new();
                for part in [&b.options_struct, &b.default_options].into_iter().flatten() {
                    text.push_str(part);
                    text.push('\n');
                }
                text.push_str(&b.wrapper);
                text
            })
            .collect();
        let receivers: Vec<String> = bodies.iter().filter_map(|b| b.receiver.clone()).collect();
        let declarations: Vec<String> = bodies.iter().map(|b| b.prototypes.join("\n")).collect();
        let shims: Vec<String> = bodies.iter().map(|b| b.shims.clone()).collect();

        let mut vips_go = Context::new();
        vips_go.insert("imports", &go_imports(&wrappers));
        vips_go.insert("operations", &wrappers);

        let mut vips_h = Context::new();
        vips_h.insert("vector_capacity", &VECTOR_CAPACITY);
        vips_h.insert("declarations", &declarations);

        let mut vips_c = Context::new();
        vips_c.insert("functions", &shims);

        let mut image_go = Context::new();
        image_go.insert("imports", &go_imports(&receivers));
        image_go.insert("methods", &receivers);

        let mut types_go = Context::new();
        types_go.insert("enums", &ir.enums);
        types_go.insert("image_formats", &ir.image_formats);
        types_go.insert("savers", &ir.savers);

        let contexts = [vips_go, vips_h, vips_c, image_go, types_go];
        let mut jobs = Vec::with_capacity(ARTIFACTS.len());
        for ((file, template), context) in ARTIFACTS.iter().zip(contexts) {
            jobs.push((*file, *template, self.templates.load(template)?, context));
        }

        let mut files: Vec<RenderedFile> = jobs
            .par_iter()
            .map(|(file, template, text, context)| {
                render(template, text, context).map(|content| RenderedFile {
                    path: (*file).to_string(),
                    content,
                })
            })
            .collect::<Result<_>>()?;

        let statics = self.templates.statics()?;
        let static_count = statics.len();
        files.extend(
            statics
                .into_iter()
                .map(|(path, content)| RenderedFile { path, content }),
        );

        Ok(RenderedOutput {
            files,
            operations: bodies.len(),
            statics: static_count,
        })
    }
}

/// Packages referenced as `pkg.` by any of the bodies.
fn go_imports(bodies: &[String]) -> Vec<&'static str> {
    GO_IMPORTS
        .iter()
        .copied()
        .filter(|pkg| {
            let qualifier = format!("{pkg}.");
            bodies.iter().any(|b| b.contains(&qualifier))
        })
        .collect()
}
