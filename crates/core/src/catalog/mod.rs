//! Discovery of native operations.
//!
//! [`TypeCatalog`] is the seam between "where operation metadata comes from" and everything
//! downstream. Implementations:
//! - [`StaticCatalog`]: a serialized GIR-shaped descriptor (JSON or YAML)
//! - [`MemoryCatalog`]: records built in code, for tests and embedders
//! - `LiveCatalog` in the `vipsgen-live` crate: the running libvips type system
//!
//! The normalizer and emitter never learn which implementation produced the records.

mod category;
mod descriptor;
mod memory;
mod static_catalog;

pub use category::{DocCategory, doc_url};
pub use descriptor::{
    Callable, ClassDescriptor, Descriptor, EnumMember, EnumerationDescriptor, NamespaceInfo,
    ParameterArray, ParameterDescriptor, SourcePosition, TypeRef,
};
pub use memory::MemoryCatalog;
pub use static_catalog::{
    DEFAULT_INCLUDE_PATTERN, StaticCatalog, StaticCatalogDebugInfo, StaticCatalogOptions,
};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::IntrospectionSession;

/// `VipsArgumentFlags` bits.
pub mod arg_flags {
    /// Must be set before the operation builds.
    pub const REQUIRED: u32 = 1;
    /// Set at construction time.
    pub const CONSTRUCT: u32 = 2;
    /// May only be set once.
    pub const SET_ONCE: u32 = 4;
    /// Always set, even if unchanged.
    pub const SET_ALWAYS: u32 = 8;
    /// Input slot.
    pub const INPUT: u32 = 16;
    /// Output slot.
    pub const OUTPUT: u32 = 32;
    /// Deprecated slot, never wrapped.
    pub const DEPRECATED: u32 = 64;
    /// Modified in place.
    pub const MODIFY: u32 = 128;

    /// Required input as libvips reports it.
    pub const REQUIRED_INPUT: u32 = REQUIRED | CONSTRUCT | INPUT;
    /// Optional input as libvips reports it.
    pub const OPTIONAL_INPUT: u32 = CONSTRUCT | INPUT;
    /// Required output as libvips reports it.
    pub const REQUIRED_OUTPUT: u32 = REQUIRED | CONSTRUCT | OUTPUT;
    /// Optional output as libvips reports it.
    pub const OPTIONAL_OUTPUT: u32 = CONSTRUCT | OUTPUT;
}

/// `VipsOperationFlags` bits.
pub mod op_flags {
    /// Can work sequentially with a small buffer.
    pub const SEQUENTIAL: u32 = 1;
    /// Must not be cached.
    pub const NOCACHE: u32 = 4;
    /// Deprecated operation.
    pub const DEPRECATED: u32 = 8;
    /// Not safe for untrusted input.
    pub const UNTRUSTED: u32 = 16;
    /// Blocked by the runtime.
    pub const BLOCKED: u32 = 32;
}

/// How a native type relates to the GObject type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawTypeKind {
    /// Anything not derived from GEnum or GFlags.
    #[default]
    Plain,
    /// Derived from `G_TYPE_ENUM`.
    Enum,
    /// Derived from `G_TYPE_FLAGS`.
    Flags,
}

/// Default value of an argument, as the native side reports it.
///
/// Enum and flags defaults are carried as their integer value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDefault {
    /// `gboolean`.
    Bool(bool),
    /// Integral, enum or flags value.
    Int(i64),
    /// Floating point value.
    Double(f64),
    /// String value.
    String(String),
}

/// One argument slot as discovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawArgument {
    /// Native name.
    pub name: String,
    /// Native value type name.
    pub type_name: String,
    /// Enum/flags derivation.
    pub kind: RawTypeKind,
    /// `VipsArgumentFlags` bits.
    pub flags: u32,
    /// Blurb or nick.
    pub description: String,
    /// Length slot folded into this argument, for vector outputs.
    pub length_slot: Option<String>,
    /// Value the native side uses when the argument is not set.
    pub default: Option<RawDefault>,
}

impl RawArgument {
    /// Plain argument with the given flag bits.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, flags: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: RawTypeKind::Plain,
            flags,
            description: String::new(),
            length_slot: None,
            default: None,
        }
    }

    /// Set the enum/flags derivation.
    pub fn with_kind(mut self, kind: RawTypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark as a vector output paired with `length_slot`.
    pub fn with_length_slot(mut self, length_slot: impl Into<String>) -> Self {
        self.length_slot = Some(length_slot.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: RawDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether the given flag bits are all set.
    pub fn has_flags(&self, bits: u32) -> bool {
        self.flags & bits == bits
    }
}

/// One operation as discovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawOperation {
    /// Native nickname.
    pub name: String,
    /// Description.
    pub description: String,
    /// `VipsOperationFlags` bits.
    pub flags: u32,
    /// Arguments in native order.
    pub arguments: Vec<RawArgument>,
    /// Documentation category, when the source knows it.
    pub category: Option<String>,
}

impl RawOperation {
    /// Operation with no arguments yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            flags: 0,
            arguments: Vec::new(),
            category: None,
        }
    }

    /// Append an argument.
    pub fn with_argument(mut self, argument: RawArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Set the operation flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

/// One enum or flags value as discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEnumValue {
    /// Native value name.
    pub name: String,
    /// Integer value.
    pub value: i64,
    /// Native nickname.
    pub nick: String,
}

impl RawEnumValue {
    /// Construct from parts.
    pub fn new(name: impl Into<String>, value: i64, nick: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            nick: nick.into(),
        }
    }
}

/// Which format operation variant to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRole {
    /// `<tag>load`
    Load,
    /// `<tag>load_buffer`
    LoadBuffer,
    /// `<tag>save`
    Save,
    /// `<tag>save_buffer`
    SaveBuffer,
}

impl FormatRole {
    /// Operation name suffix for this role.
    pub fn suffix(self) -> &'static str {
        match self {
            FormatRole::Load => "load",
            FormatRole::LoadBuffer => "load_buffer",
            FormatRole::Save => "save",
            FormatRole::SaveBuffer => "save_buffer",
        }
    }

    /// Operation name for a format tag.
    pub fn operation_name(self, tag: &str) -> String {
        format!("{tag}{}", self.suffix())
    }
}

/// Source of operation and enum metadata.
pub trait TypeCatalog {
    /// Every wrappable operation name, sorted and unique.
    fn discover_operation_names(&self, session: &mut IntrospectionSession) -> Result<Vec<String>>;

    /// Describe one operation. `None` when the installed library does not have it.
    fn describe_operation(
        &self,
        session: &mut IntrospectionSession,
        name: &str,
    ) -> Result<Option<RawOperation>>;

    /// Values of an enum or flags type in native order. `None` when the type is unknown.
    fn describe_enum(
        &self,
        session: &mut IntrospectionSession,
        native_type: &str,
    ) -> Result<Option<Vec<RawEnumValue>>>;

    /// Whether `<tag><role suffix>` exists.
    fn format_exists(&self, session: &mut IntrospectionSession, tag: &str, role: FormatRole)
    -> bool;

    /// Whether an enum type has a value with this native name.
    fn enum_value_exists(
        &self,
        session: &mut IntrospectionSession,
        native_type: &str,
        value_name: &str,
    ) -> bool {
        match self.describe_enum(session, native_type) {
            Ok(Some(values)) => values.iter().any(|v| v.name == value_name),
            _ => false,
        }
    }

    /// Documentation category, by name heuristics only.
    fn category(&self, name: &str) -> DocCategory {
        DocCategory::from_operation_name(name)
    }
}
