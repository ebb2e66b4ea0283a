//! Intermediate representation for wrapper generation.
//!
//! Two layers:
//! 1. Raw records from a [`TypeCatalog`](crate::catalog::TypeCatalog) (names, native types, flag bits)
//! 2. Normalized IR: classified arguments, bucketed operations, enum types, image formats
//!
//! All libvips corner cases (deprecated slots, vector pairs, enum aliases, colliding
//! identifiers) are resolved during normalization, so emission is mechanical.
//!
//! ## Module Structure
//!
//! - `types`: the IR data model (`Operation`, `Argument`, `EnumType`, ...)
//! - `normalize`: raw records -> IR
//! - `formats`: image format and saver discovery
//! - `naming`: identifier helpers shared across modules

mod formats;
pub mod naming;
mod normalize;
mod types;

pub use formats::{FORMAT_CATALOG, discover_image_formats, discover_supported_savers, format_tag};
pub use normalize::{NormalizationReport, NormalizedIr, Normalizer, SkippedOperation};
pub use types::{
    ArgCategory, Argument, Direction, EnumType, EnumValue, GeneratorIr, ImageFormatInfo,
    Operation, VectorShape,
};
