//! Normalized operation model.
//!
//! - `Operation`: one wrapped native operation with bucketed arguments
//! - `Argument`: one typed slot, classified into an `ArgCategory`
//! - `EnumType`: enum/flags types reached from arguments
//! - `ImageFormatInfo`: load/save formats found among the operation names
//! - `GeneratorIr`: everything the emission engine consumes

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::{RawDefault, RawTypeKind};

/// Semantic category of an argument, used to pick its marshaling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgCategory {
    /// `VipsImage` handle.
    Image,
    /// `gboolean`.
    Bool,
    /// Integral scalar up to 32 bits.
    Int,
    /// `gint64`.
    Int64,
    /// `guint64`.
    UInt64,
    /// Floating point scalar.
    Double,
    /// NUL-terminated string.
    String,
    /// `VipsArrayInt`.
    ArrayInt,
    /// `VipsArrayDouble`.
    ArrayDouble,
    /// `VipsArrayImage`.
    ArrayImage,
    /// `VipsBlob` binary buffer.
    Blob,
    /// `VipsInterpolate` handle.
    Interpolate,
    /// `VipsSource` stream handle.
    Source,
    /// `VipsTarget` stream handle.
    Target,
    /// GEnum-derived type.
    Enum,
    /// GFlags-derived type.
    Flags,
}

impl ArgCategory {
    /// Map a native type name to its category.
    ///
    /// Returns `None` for anything outside the table; callers treat that as fatal.
    pub fn from_native(type_name: &str, kind: RawTypeKind) -> Option<Self> {
        match kind {
            RawTypeKind::Enum => return Some(ArgCategory::Enum),
            RawTypeKind::Flags => return Some(ArgCategory::Flags),
            RawTypeKind::Plain => {}
        }

        let category = match type_name {
            "VipsImage" => ArgCategory::Image,
            "gboolean" => ArgCategory::Bool,
            "gint" | "guint" => ArgCategory::Int,
            "gint64" => ArgCategory::Int64,
            "guint64" => ArgCategory::UInt64,
            "gdouble" | "gfloat" => ArgCategory::Double,
            "gchararray" => ArgCategory::String,
            "VipsArrayInt" => ArgCategory::ArrayInt,
            "VipsArrayDouble" => ArgCategory::ArrayDouble,
            "VipsArrayImage" => ArgCategory::ArrayImage,
            "VipsBlob" => ArgCategory::Blob,
            "VipsInterpolate" => ArgCategory::Interpolate,
            "VipsSource" => ArgCategory::Source,
            "VipsTarget" => ArgCategory::Target,
            _ => return None,
        };
        Some(category)
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgCategory::Image => "image",
            ArgCategory::Bool => "bool",
            ArgCategory::Int => "int",
            ArgCategory::Int64 => "int64",
            ArgCategory::UInt64 => "uint64",
            ArgCategory::Double => "double",
            ArgCategory::String => "string",
            ArgCategory::ArrayInt => "array_int",
            ArgCategory::ArrayDouble => "array_double",
            ArgCategory::ArrayImage => "array_image",
            ArgCategory::Blob => "blob",
            ArgCategory::Interpolate => "interpolate",
            ArgCategory::Source => "source",
            ArgCategory::Target => "target",
            ArgCategory::Enum => "enum",
            ArgCategory::Flags => "flags",
        }
    }

    /// Array categories travel as pointer plus length.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ArgCategory::ArrayInt | ArgCategory::ArrayDouble | ArgCategory::ArrayImage
        )
    }

    /// Categories backed by an enum type registered in the session.
    pub fn is_enum_like(&self) -> bool {
        matches!(self, ArgCategory::Enum | ArgCategory::Flags)
    }
}

impl fmt::Display for ArgCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument direction across the foreign call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Passed into the operation.
    Input,
    /// Written by the operation.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Pointer-plus-length output decoded as one sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorShape {
    /// Native name of the length slot.
    pub length_name: String,
}

/// One typed slot of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    /// Native property/parameter name.
    pub name: String,
    /// Host-language identifier.
    pub identifier: String,
    /// Native type name (e.g. `VipsImage`, `gdouble`).
    pub native_type: String,
    /// Host-language type name.
    pub target_type: String,
    /// Foreign-call (C) type name.
    pub foreign_type: String,
    /// Human description.
    pub description: String,
    /// Required by the native operation.
    pub required: bool,
    /// Passed in.
    pub is_input: bool,
    /// Written out.
    pub is_output: bool,
    /// Raw `VipsArgumentFlags`.
    pub flags: u32,
    /// Marshaling category.
    pub category: ArgCategory,
    /// Native enum type name for enum/flags arguments.
    pub enum_type: Option<String>,
    /// Set for vector outputs spanning a value and a length slot.
    pub vector: Option<VectorShape>,
    /// Native default, for optional inputs that report one.
    pub default: Option<RawDefault>,
    /// Synthesized by configuration, not present on the native operation.
    pub synthetic: bool,
}

impl Argument {
    /// Direction, output winning for in/out slots.
    pub fn direction(&self) -> Direction {
        if self.is_output {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    /// Image handle argument.
    pub fn is_image(&self) -> bool {
        self.category == ArgCategory::Image
    }
}

/// One wrapped native operation.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    /// Native nickname (e.g. `extract_area`).
    pub name: String,
    /// Host identifier (e.g. `ExtractArea`).
    pub identifier: String,
    /// Human description.
    pub description: String,
    /// Raw `VipsOperationFlags`.
    pub flags: u32,
    /// Documentation category.
    pub category: String,
    /// Reference documentation link.
    pub doc_url: String,
    /// All arguments in native order.
    pub arguments: Vec<Argument>,
    /// Required inputs in native order.
    pub required_inputs: Vec<Argument>,
    /// Optional inputs in native order.
    pub optional_inputs: Vec<Argument>,
    /// Outputs in native order.
    pub outputs: Vec<Argument>,
    /// Some input is an image handle.
    pub has_image_input: bool,
    /// Some output is an image handle.
    pub has_image_output: bool,
    /// Receiver surface is hand-written.
    pub needs_custom_wrapper: bool,
}

impl Operation {
    /// Outputs the host wrapper returns.
    pub fn required_outputs(&self) -> impl Iterator<Item = &Argument> {
        self.outputs.iter().filter(|arg| arg.required)
    }

    /// Outputs written back into the options aggregate.
    pub fn optional_outputs(&self) -> impl Iterator<Item = &Argument> {
        self.outputs.iter().filter(|arg| !arg.required)
    }

    /// Required inputs and required outputs, in native order.
    pub fn required_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|arg| arg.required)
    }

    /// First required input is an image, so the operation can be a receiver method.
    pub fn first_input_is_image(&self) -> bool {
        self.required_inputs.first().is_some_and(Argument::is_image)
    }

    /// Has optional inputs or outputs, and so an options aggregate.
    pub fn has_options(&self) -> bool {
        !self.optional_inputs.is_empty() || self.optional_outputs().next().is_some()
    }
}

/// One value of an enum or flags type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    /// Native value name (e.g. `VIPS_INTERPRETATION_sRGB`).
    pub native_name: String,
    /// Generated symbol, unique within the type (e.g. `Srgb`).
    pub symbol: String,
    /// Qualified host constant (e.g. `InterpretationSrgb`).
    pub generated_name: String,
    /// Integer value.
    pub value: i64,
    /// Native nickname.
    pub nick: String,
}

/// Enum or flags type reached from some argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumType {
    /// Native type name (e.g. `VipsInterpretation`).
    pub native_name: String,
    /// Host type name (e.g. `Interpretation`).
    pub generated_name: String,
    /// Flags (bitmask) rather than a plain enum.
    pub is_flags: bool,
    /// Values in native order.
    pub values: Vec<EnumValue>,
}

impl EnumType {
    /// Integer value behind a generated symbol.
    pub fn value_of(&self, symbol: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|v| v.symbol == symbol)
            .map(|v| v.value)
    }

    /// Generated symbol for an integer value.
    pub fn symbol_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.symbol.as_str())
    }
}

/// An image format found among load/save operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFormatInfo {
    /// Short tag (e.g. `jpeg`).
    pub tag: String,
    /// Generated enum symbol (e.g. `ImageTypeJpeg`).
    pub symbol: String,
    /// MIME type, empty when unknown.
    pub mime_type: String,
    /// Position in the generated enum.
    pub order: usize,
}

/// The normalized model handed to emission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeneratorIr {
    /// Operations sorted by native name.
    pub operations: Vec<Operation>,
    /// Enum types sorted by native name.
    pub enums: Vec<EnumType>,
    /// Image formats, `unknown` first.
    pub image_formats: Vec<ImageFormatInfo>,
    /// Saver availability flags (e.g. `HasJpegSaver`).
    pub savers: BTreeMap<String, bool>,
}

impl GeneratorIr {
    /// Look up an enum type by native name.
    pub fn enum_type(&self, native_name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|e| e.native_name == native_name)
    }

    /// Look up an operation by native name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_native() {
        assert_eq!(
            ArgCategory::from_native("VipsImage", RawTypeKind::Plain),
            Some(ArgCategory::Image)
        );
        assert_eq!(
            ArgCategory::from_native("gdouble", RawTypeKind::Plain),
            Some(ArgCategory::Double)
        );
        assert_eq!(
            ArgCategory::from_native("VipsInterpretation", RawTypeKind::Enum),
            Some(ArgCategory::Enum)
        );
        assert_eq!(
            ArgCategory::from_native("VipsForeignPngFilter", RawTypeKind::Flags),
            Some(ArgCategory::Flags)
        );
        assert_eq!(
            ArgCategory::from_native("gint64", RawTypeKind::Plain),
            Some(ArgCategory::Int64)
        );
        assert_eq!(
            ArgCategory::from_native("guint64", RawTypeKind::Plain),
            Some(ArgCategory::UInt64)
        );
        assert_eq!(ArgCategory::from_native("VipsRegion", RawTypeKind::Plain), None);
        assert_eq!(ArgCategory::from_native("gpointer", RawTypeKind::Plain), None);
    }

    #[test]
    fn test_enum_lookup() {
        let ty = EnumType {
            native_name: "VipsSample".into(),
            generated_name: "Sample".into(),
            is_flags: false,
            values: vec![EnumValue {
                native_name: "FOO".into(),
                symbol: "Foo".into(),
                generated_name: "SampleFoo".into(),
                value: 0,
                nick: "foo".into(),
            }],
        };
        assert_eq!(ty.value_of("Foo"), Some(0));
        assert_eq!(ty.symbol_of(0), Some("Foo"));
        assert_eq!(ty.value_of("Bar"), None);
    }
}
