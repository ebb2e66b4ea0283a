//! Error taxonomy for the generator.
//!
//! Fatal conditions are variants of [`GenError`] and abort the run:
//! - runtime initialization failures
//! - argument types with no known marshaling category
//! - template, marshaling and file-write failures during emission
//!
//! Recoverable conditions (an operation missing from the installed library, two operations
//! colliding on one generated identifier) are not errors. They are logged and recorded as a
//! [`SkipReason`] so the run keeps going.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::ir::{ArgCategory, Direction};

/// Result alias used across the crate.
pub type Result<T, E = GenError> = std::result::Result<T, E>;

/// Fatal generator errors.
#[derive(Debug, Error)]
pub enum GenError {
    /// The native runtime could not be started.
    #[error("Failed to initialize native runtime: {0}")]
    Initialization(String),

    /// An argument's native type does not map to any marshaling category.
    #[error(
        "Unsupported argument type '{type_name}' for argument '{argument}' of operation '{operation}'"
    )]
    Classification {
        /// Native operation name.
        operation: String,
        /// Native argument name.
        argument: String,
        /// Native type name that failed to classify.
        type_name: String,
    },

    /// A rule table has no rule for an argument.
    #[error("Failed to marshal argument '{argument}' of operation '{operation}': {source}")]
    Marshal {
        /// Native operation name.
        operation: String,
        /// Native argument name.
        argument: String,
        /// Underlying rule table error.
        #[source]
        source: MarshalError,
    },

    /// Template rendering or output assembly failed.
    #[error("Failed to emit {file} (template {template}): {message}")]
    Emission {
        /// Output file being produced.
        file: String,
        /// Template in use.
        template: String,
        /// Failure detail.
        message: String,
    },

    /// The static descriptor could not be read or reconciled.
    #[error("Invalid introspection descriptor: {0}")]
    Descriptor(String),

    /// The override/exclusion configuration could not be loaded.
    #[error("Invalid configuration {path}: {message}")]
    Config {
        /// Configuration file.
        path: PathBuf,
        /// Failure detail.
        message: String,
    },

    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Misuse of the introspection session.
    #[error("Introspection session error: {0}")]
    Session(String),

    /// Generator invariant violated, such as an out-of-order emission step.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the fatal classification error.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Classification { .. })
    }
}

/// Errors raised by a marshaling rule table.
#[derive(Debug, Clone, Copy, Error)]
pub enum MarshalError {
    /// No rule for this category/direction pair.
    #[error("no {direction} rule for {category} arguments")]
    Unsupported {
        /// Semantic category of the argument.
        category: ArgCategory,
        /// Input or output.
        direction: Direction,
    },

    /// Enum or flags argument without a resolved enum type.
    #[error("enum argument has no resolved enum type")]
    MissingEnumType,
}

/// Why an operation was left out of the IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// Listed in the exclusion set.
    Excluded,
    /// Override entry marks it as not generated.
    Configured,
    /// Not present or not usable in the installed library.
    Unavailable,
    /// Another operation already claimed the generated identifier.
    Duplicate {
        /// Native name of the operation that was kept.
        kept: String,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Excluded => f.write_str("excluded"),
            SkipReason::Configured => f.write_str("configured"),
            SkipReason::Unavailable => f.write_str("unavailable"),
            SkipReason::Duplicate { kept } => write!(f, "duplicate of {kept}"),
        }
    }
}
