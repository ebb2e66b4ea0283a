//! Serialized introspection descriptor.
//!
//! A GIR-shaped document, written as JSON or YAML. Field names follow the GIR attributes
//! with `:` and `-` folded to `_` (`c:identifier` -> `c_identifier`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RawDefault;
use crate::error::{GenError, Result};

/// Root of a descriptor document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    /// Namespace header.
    pub namespace: NamespaceInfo,
    /// Top-level functions.
    pub functions: Vec<Callable>,
    /// Classes and their callables.
    pub classes: Vec<ClassDescriptor>,
    /// Interfaces and their callables.
    pub interfaces: Vec<ClassDescriptor>,
    /// Records and their callables.
    pub records: Vec<ClassDescriptor>,
    /// Enumerations.
    pub enumerations: Vec<EnumerationDescriptor>,
    /// Bitfields (flags).
    pub bitfields: Vec<EnumerationDescriptor>,
}

/// Namespace header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceInfo {
    /// Namespace name, e.g. `Vips`.
    pub name: String,
    /// Namespace version, e.g. `8.0`.
    pub version: String,
    /// Shared library the symbols come from.
    pub shared_library: String,
    /// Prefix stripped from C identifiers, e.g. `vips`.
    pub c_symbol_prefix: String,
}

impl NamespaceInfo {
    /// Major component of the version.
    pub fn major_version(&self) -> Option<u32> {
        self.version.split('.').next()?.trim().parse().ok()
    }
}

/// A class, interface or record with its callables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDescriptor {
    /// GIR name, e.g. `Image`.
    pub name: String,
    /// C type, e.g. `VipsImage`.
    pub c_type: String,
    /// Instance methods.
    pub methods: Vec<Callable>,
    /// Static functions.
    pub functions: Vec<Callable>,
    /// Constructors.
    pub constructors: Vec<Callable>,
}

impl ClassDescriptor {
    /// Methods, functions, then constructors.
    pub fn callables(&self) -> impl Iterator<Item = &Callable> {
        self.methods
            .iter()
            .chain(&self.functions)
            .chain(&self.constructors)
    }
}

/// A function, method or constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Callable {
    /// GIR name, e.g. `embed`.
    pub name: String,
    /// C symbol, e.g. `vips_embed`.
    pub c_identifier: Option<String>,
    /// `introspectable="0"` in GIR is `false` here.
    pub introspectable: Option<bool>,
    /// Deprecated callable.
    pub deprecated: bool,
    /// Documentation text.
    pub doc: Option<String>,
    /// Declaring header.
    pub source_position: Option<SourcePosition>,
    /// `self` parameter for methods.
    pub instance_parameter: Option<ParameterDescriptor>,
    /// Declared parameters.
    pub parameters: Vec<ParameterDescriptor>,
}

impl Callable {
    /// Introspectable unless explicitly marked otherwise.
    pub fn is_introspectable(&self) -> bool {
        self.introspectable.unwrap_or(true)
    }

    /// Ends in `...`, the calling convention of every libvips operation.
    pub fn is_varargs(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.varargs)
    }
}

/// Where a callable is declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePosition {
    /// Header path.
    pub filename: String,
}

/// One parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterDescriptor {
    /// Parameter name.
    pub name: String,
    /// `in`, `out` or `inout`. Missing means `in`.
    pub direction: Option<String>,
    /// Optional parameter.
    pub optional: bool,
    /// The `...` parameter.
    pub varargs: bool,
    /// Scalar type.
    #[serde(rename = "type")]
    pub type_ref: Option<TypeRef>,
    /// Array type.
    pub array: Option<ParameterArray>,
    /// Documentation text.
    pub doc: Option<String>,
    /// Default for optional parameters. Not a GIR attribute; added by descriptor snapshots.
    pub default: Option<RawDefault>,
}

impl ParameterDescriptor {
    /// C type of the parameter, array or scalar.
    pub fn c_type(&self) -> &str {
        if let Some(array) = &self.array {
            return &array.c_type;
        }
        self.type_ref
            .as_ref()
            .map_or("", |t| if t.c_type.is_empty() { &t.name } else { &t.c_type })
    }

    /// Declared as an `out` parameter.
    pub fn is_out(&self) -> bool {
        matches!(self.direction.as_deref(), Some("out" | "inout"))
    }
}

/// Scalar type reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRef {
    /// GIR type name.
    pub name: String,
    /// C type.
    pub c_type: String,
}

/// Array type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterArray {
    /// C type of the whole array.
    pub c_type: String,
    /// Index of the parameter carrying the length.
    pub length: Option<usize>,
    /// Element type.
    pub element: Option<TypeRef>,
}

/// Enumeration or bitfield.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerationDescriptor {
    /// GIR name, e.g. `Interpretation`.
    pub name: String,
    /// C type, e.g. `VipsInterpretation`.
    pub c_type: String,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
}

/// One enumeration member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumMember {
    /// GIR name, e.g. `srgb`.
    pub name: String,
    /// Integer value.
    pub value: i64,
    /// C identifier, e.g. `VIPS_INTERPRETATION_sRGB`.
    pub c_identifier: String,
    /// Nickname. Falls back to `name`.
    pub nick: Option<String>,
}

impl Descriptor {
    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|err| GenError::Descriptor(format!("Failed to parse JSON descriptor: {err}")))
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|err| GenError::Descriptor(format!("Failed to parse YAML descriptor: {err}")))
    }

    /// Read a descriptor, picking the format from the extension (`.yaml`/`.yml` or JSON).
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| GenError::io(path, err))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Every callable: top-level functions, then classes, interfaces and records.
    pub fn callables(&self) -> impl Iterator<Item = &Callable> {
        self.functions.iter().chain(
            self.classes
                .iter()
                .chain(&self.interfaces)
                .chain(&self.records)
                .flat_map(ClassDescriptor::callables),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_descriptor() {
        let json = r#"{
            "namespace": { "name": "Vips", "version": "8.0", "c_symbol_prefix": "vips" },
            "functions": [{ "name": "black", "c_identifier": "vips_black" }],
            "classes": [{
                "name": "Image",
                "c_type": "VipsImage",
                "methods": [{
                    "name": "copy",
                    "c_identifier": "vips_copy",
                    "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
                    "parameters": [
                        { "name": "out", "direction": "out", "type": { "name": "Image", "c_type": "VipsImage**" } },
                        { "name": "...", "varargs": true }
                    ]
                }]
            }]
        }"#;

        let descriptor = Descriptor::from_json_str(json).unwrap();
        assert_eq!(descriptor.namespace.major_version(), Some(8));
        let names: Vec<_> = descriptor.callables().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["black", "copy"]);

        let copy = &descriptor.classes[0].methods[0];
        assert!(copy.is_introspectable());
        assert_eq!(copy.parameters[0].c_type(), "VipsImage**");
        assert!(copy.parameters[0].is_out());
        assert!(copy.parameters[1].varargs);
    }

    #[test]
    fn test_parse_yaml_descriptor() {
        let yaml = r#"
namespace:
  name: Vips
  version: "8.16"
enumerations:
  - name: Interpretation
    c_type: VipsInterpretation
    members:
      - { name: srgb, value: 22, c_identifier: VIPS_INTERPRETATION_sRGB }
"#;
        let descriptor = Descriptor::from_yaml_str(yaml).unwrap();
        assert_eq!(descriptor.enumerations[0].members[0].value, 22);
        assert_eq!(descriptor.namespace.major_version(), Some(8));
    }

    #[test]
    fn test_invalid_descriptor() {
        let err = Descriptor::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, GenError::Descriptor(_)));
    }
}
