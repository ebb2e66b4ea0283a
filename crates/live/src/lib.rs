//! Live libvips discovery for vipsgen.
//!
//! [`LiveRuntime`] starts libvips once per process. [`LiveCatalog`] borrows it and answers
//! [`TypeCatalog`](vipsgen_core::TypeCatalog) queries by walking the GObject type system:
//! every non-abstract `VipsOperation` descendant with a nickname is an operation, and
//! arguments are read through `vips_argument_map`.
//!
//! ```no_run
//! use vipsgen_core::{EmbeddedTemplateSource, GeneratorConfig, generate};
//! use vipsgen_live::{LiveCatalog, LiveRuntime};
//!
//! let runtime = LiveRuntime::init()?;
//! let catalog = LiveCatalog::new(&runtime);
//! let summary = generate(
//!     &catalog,
//!     &GeneratorConfig::builtin(),
//!     EmbeddedTemplateSource,
//!     std::path::Path::new("vips"),
//! )?;
//! println!("{} operations", summary.emitted);
//! # Ok::<(), vipsgen_core::GenError>(())
//! ```
//!
//! This is the only crate in the workspace with `unsafe` code. Every native handle is owned
//! by a guard that releases it on drop.

mod catalog;
mod ffi;
mod guard;
mod runtime;

pub use catalog::LiveCatalog;
pub use runtime::LiveRuntime;
