//! Marshaling rule tables.
//!
//! A [`MarshalRules`] implementation knows, for one side of the foreign call, how every
//! ([`ArgCategory`], [`Direction`]) pair is declared, converted before the call, passed,
//! and decoded or released after it. The emission engine asks the host table
//! ([`GoRules`]) and the shim table ([`CShimRules`]) for [`Fragments`] and stitches them
//! into function bodies; it never matches on categories itself.
//!
//! A pair with no rule is a [`MarshalError::Unsupported`], fatal at emission time.

mod c;
mod go;

pub use c::CShimRules;
pub use go::GoRules;

use crate::catalog::RawDefault;
use crate::error::MarshalError;
use crate::ir::{ArgCategory, Argument, Direction, EnumType};

/// Upper bound on elements decoded from a pointer-plus-length output.
pub const VECTOR_CAPACITY: usize = 1024;

/// Code pieces for one argument on one side of the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    /// Parameter declaration (inputs) or local declaration (outputs). May span lines.
    pub declaration: Option<String>,
    /// Statements run before the call.
    pub pre_call: Vec<String>,
    /// Expression(s) passed to the call, comma-separated when one argument spans two slots.
    pub call: String,
    /// Statements run after a successful call: decoding and release.
    pub post_call: Vec<String>,
    /// Expression holding the decoded output value.
    pub result: Option<String>,
}

impl Fragments {
    /// Fragments that pass `call` through unchanged.
    pub fn direct(declaration: impl Into<String>, call: impl Into<String>) -> Self {
        Self {
            declaration: Some(declaration.into()),
            call: call.into(),
            ..Self::default()
        }
    }
}

/// An optional argument as carried in the options aggregate.
///
/// Optional inputs are read out of the aggregate before the call; optional outputs are
/// stored back into it after a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionField {
    /// Field name in the aggregate.
    pub name: String,
    /// Field type.
    pub type_name: String,
    /// Expression reading the native value out of the aggregate (inputs), or the field
    /// itself (outputs).
    pub value: String,
    /// Statement storing the decoded output into the aggregate. `None` for inputs.
    pub write_back: Option<String>,
}

/// A native handle as exposed through the managed receiver type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedType {
    /// Managed type name.
    pub type_name: String,
    /// Expression turning the managed `value` into the native handle.
    pub to_native: String,
    /// Expression turning the native `value` into the managed type.
    pub from_native: String,
}

/// One side of the foreign-call boundary.
pub trait MarshalRules {
    /// Language name, for logs.
    fn language(&self) -> &'static str;

    /// Whether an identifier would clash with the language or the emitted locals.
    fn is_reserved(&self, ident: &str) -> bool;

    /// Type name for a category and direction. `enum_type` is set for resolved enum/flags.
    fn type_name(
        &self,
        category: ArgCategory,
        direction: Direction,
        enum_type: Option<&EnumType>,
    ) -> String;

    /// Fragments for an argument whose value is read from `value`.
    fn rule(&self, arg: &Argument, value: &str) -> Result<Fragments, MarshalError>;

    /// Zero value returned for an output on the error path.
    fn zero_value(&self, arg: &Argument) -> String;

    /// Typed declaration of the value [`Fragments::call`] passes, when the side has one.
    fn call_declaration(&self, _arg: &Argument, _value: &str) -> Option<String> {
        None
    }

    /// Field carrying an optional argument inside the aggregate named `options`.
    fn option_field(&self, arg: &Argument, options: &str) -> OptionField {
        OptionField {
            name: arg.identifier.clone(),
            type_name: arg.target_type.clone(),
            value: format!("{options}.{}", arg.identifier),
            write_back: None,
        }
    }

    /// Literal for a native default, `None` when the language zero value already matches
    /// or the default cannot be written as a literal.
    fn default_literal(&self, _arg: &Argument, _value: &RawDefault) -> Option<String> {
        None
    }

    /// Managed wrapper for handle arguments, `None` when the value is exposed as is.
    fn managed_type(&self, _arg: &Argument, _value: &str) -> Option<ManagedType> {
        None
    }
}

/// Unsupported-pair error for an argument.
pub(crate) fn unsupported(arg: &Argument) -> MarshalError {
    MarshalError::Unsupported {
        category: arg.category,
        direction: arg.direction(),
    }
}
