//! Wrapper code generation for libvips operations.
//!
//! libvips exposes every image operation through GObject introspection. This crate turns
//! that metadata into typed Go/cgo wrappers over small C shims:
//!
//! ```text
//! TypeCatalog ──> Normalizer ──> GeneratorIr ──> Emitter ──> vips.go, vips.h, vips.c, ...
//!  (catalog)      (ir)                           (emit, consults marshal rule tables)
//! ```
//!
//! The catalog is a trait: [`StaticCatalog`](catalog::StaticCatalog) reads a serialized
//! descriptor, [`MemoryCatalog`](catalog::MemoryCatalog) is built in code, and the
//! `vipsgen-live` crate walks a running libvips. Nothing past the catalog knows which one ran.
//!
//! [`pipeline::generate`] wires the stages for the common case.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod emit;
pub mod error;
pub mod ir;
pub mod marshal;
pub mod pipeline;
pub mod session;

pub use catalog::{MemoryCatalog, StaticCatalog, StaticCatalogOptions, TypeCatalog};
pub use config::{ConfigFile, GeneratorConfig, OperationOverride};
pub use emit::{DirectoryTemplateSource, EmbeddedTemplateSource, EmissionReport, Emitter};
pub use error::{GenError, MarshalError, Result, SkipReason};
pub use ir::{GeneratorIr, NormalizationReport, NormalizedIr, Normalizer};
pub use pipeline::{GenerationSummary, generate, introspect};
pub use session::IntrospectionSession;
