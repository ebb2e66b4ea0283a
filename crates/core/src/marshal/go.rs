//! Host side: Go over cgo.

use super::{Fragments, ManagedType, MarshalRules, OptionField, unsupported};
use crate::catalog::RawDefault;
use crate::error::MarshalError;
use crate::ir::naming::{GO_RESERVED_WORDS, capitalize_first};
use crate::ir::{ArgCategory, Argument, Direction, EnumType};

/// Go/cgo rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoRules;

impl GoRules {
    fn local(prefix: &str, arg: &Argument) -> String {
        format!("{prefix}{}", capitalize_first(&arg.identifier))
    }

    fn input(arg: &Argument, value: &str) -> Result<Fragments, MarshalError> {
        let declaration = format!("{} {}", arg.identifier, arg.target_type);
        let c = Self::local("c", arg);
        let p = Self::local("p", arg);

        let fragments = match arg.category {
            ArgCategory::Image
            | ArgCategory::Interpolate
            | ArgCategory::Source
            | ArgCategory::Target => Fragments::direct(declaration, value),
            ArgCategory::Bool => {
                Fragments::direct(declaration, format!("C.int(boolToInt({value}))"))
            }
            ArgCategory::Int | ArgCategory::Flags => {
                Fragments::direct(declaration, format!("C.int({value})"))
            }
            ArgCategory::Int64 => Fragments::direct(declaration, format!("C.gint64({value})")),
            ArgCategory::UInt64 => Fragments::direct(declaration, format!("C.guint64({value})")),
            ArgCategory::Double => Fragments::direct(declaration, format!("C.double({value})")),
            ArgCategory::Enum => {
                let native = arg.enum_type.as_deref().ok_or(MarshalError::MissingEnumType)?;
                Fragments::direct(declaration, format!("C.{native}({value})"))
            }
            ArgCategory::String => {
                let pre_call = if arg.required {
                    vec![
                        format!("{c} := C.CString({value})"),
                        format!("defer freeCString({c})"),
                    ]
                } else {
                    vec![
                        format!("var {c} *C.char"),
                        format!("if {value} != \"\" {{"),
                        format!("\t{c} = C.CString({value})"),
                        format!("\tdefer freeCString({c})"),
                        "}".to_string(),
                    ]
                };
                Fragments {
                    declaration: Some(declaration),
                    pre_call,
                    call: c,
                    ..Fragments::default()
                }
            }
            ArgCategory::ArrayInt => Fragments {
                declaration: Some(declaration),
                pre_call: vec![
                    format!("{c} := make([]C.int, len({value}))"),
                    format!("for idx, elem := range {value} {{"),
                    format!("\t{c}[idx] = C.int(elem)"),
                    "}".to_string(),
                    format!("var {p} *C.int"),
                    format!("if len({c}) > 0 {{"),
                    format!("\t{p} = &{c}[0]"),
                    "}".to_string(),
                ],
                call: format!("{p}, C.int(len({value}))"),
                ..Fragments::default()
            },
            ArgCategory::ArrayDouble => Fragments {
                declaration: Some(declaration),
                pre_call: vec![
                    format!("var {p} *C.double"),
                    format!("if len({value}) > 0 {{"),
                    format!("\t{p} = (*C.double)(unsafe.Pointer(&{value}[0]))"),
                    "}".to_string(),
                ],
                call: format!("{p}, C.int(len({value}))"),
                ..Fragments::default()
            },
            ArgCategory::ArrayImage => Fragments {
                declaration: Some(declaration),
                pre_call: vec![
                    format!("{c} := {value}"),
                    format!("var {p} **C.VipsImage"),
                    format!("if len({c}) > 0 {{"),
                    format!("\t{p} = &{c}[0]"),
                    "}".to_string(),
                ],
                call: format!("{p}, C.int(len({c}))"),
                ..Fragments::default()
            },
            ArgCategory::Blob => Fragments {
                declaration: Some(declaration),
                pre_call: vec![
                    format!("var {p} unsafe.Pointer"),
                    format!("if len({value}) > 0 {{"),
                    format!("\t{p} = unsafe.Pointer(&{value}[0])"),
                    "}".to_string(),
                    format!("defer runtime.KeepAlive({value})"),
                ],
                call: format!("{p}, C.size_t(len({value}))"),
                ..Fragments::default()
            },
        };
        Ok(fragments)
    }

    fn output(arg: &Argument) -> Result<Fragments, MarshalError> {
        let id = &arg.identifier;
        let c = Self::local("c", arg);

        let scalar = |c_type: &str, result: String| Fragments {
            declaration: Some(format!("var {c} {c_type}")),
            call: format!("&{c}"),
            result: Some(result),
            ..Fragments::default()
        };
        let vector = |element: &str, decode: Vec<String>| {
            let mut post_call = vec![format!("defer gFreePointer(unsafe.Pointer({c}))")];
            post_call.extend(decode);
            Fragments {
                declaration: Some(format!("var {c} *{element}\nvar {c}Len C.int")),
                call: format!("&{c}, &{c}Len"),
                post_call,
                result: Some(id.clone()),
                ..Fragments::default()
            }
        };
        let window = format!("[:{c}Len:{c}Len]");

        let fragments = match arg.category {
            ArgCategory::Image => Fragments {
                declaration: Some(format!("var {id} *C.VipsImage")),
                call: format!("&{id}"),
                result: Some(id.clone()),
                ..Fragments::default()
            },
            ArgCategory::Bool => scalar("C.int", format!("{c} != 0")),
            ArgCategory::Int | ArgCategory::Flags => scalar("C.int", format!("int({c})")),
            ArgCategory::Int64 => scalar("C.gint64", format!("int64({c})")),
            ArgCategory::UInt64 => scalar("C.guint64", format!("uint64({c})")),
            ArgCategory::Enum => scalar("C.int", format!("{}({c})", arg.target_type)),
            ArgCategory::Double => scalar("C.double", format!("float64({c})")),
            ArgCategory::String => Fragments {
                declaration: Some(format!("var {c} *C.char")),
                call: format!("&{c}"),
                post_call: vec![format!("defer gFreePointer(unsafe.Pointer({c}))")],
                result: Some(format!("C.GoString({c})")),
                ..Fragments::default()
            },
            ArgCategory::ArrayDouble => vector(
                "C.double",
                vec![
                    format!("{id} := make([]float64, int({c}Len))"),
                    format!("if {c}Len > 0 {{"),
                    format!("\tcopy({id}, (*[vectorCapacity]float64)(unsafe.Pointer({c})){window})"),
                    "}".to_string(),
                ],
            ),
            ArgCategory::ArrayInt => vector(
                "C.int",
                vec![
                    format!("{id} := make([]int, int({c}Len))"),
                    format!("if {c}Len > 0 {{"),
                    format!(
                        "\tfor idx, elem := range (*[vectorCapacity]C.int)(unsafe.Pointer({c})){window} {{"
                    ),
                    format!("\t\t{id}[idx] = int(elem)"),
                    "\t}".to_string(),
                    "}".to_string(),
                ],
            ),
            ArgCategory::ArrayImage => vector(
                "*C.VipsImage",
                vec![
                    format!("{id} := make([]*C.VipsImage, int({c}Len))"),
                    format!("if {c}Len > 0 {{"),
                    format!(
                        "\tcopy({id}, (*[vectorCapacity]*C.VipsImage)(unsafe.Pointer({c})){window})"
                    ),
                    "}".to_string(),
                ],
            ),
            ArgCategory::Blob => Fragments {
                declaration: Some(format!("var {c} unsafe.Pointer\nvar {c}Len C.size_t")),
                call: format!("&{c}, &{c}Len"),
                result: Some(format!("bufferToBytes({c}, {c}Len)")),
                ..Fragments::default()
            },
            ArgCategory::Interpolate | ArgCategory::Source | ArgCategory::Target => {
                return Err(unsupported(arg));
            }
        };
        Ok(fragments)
    }
}

impl MarshalRules for GoRules {
    fn language(&self) -> &'static str {
        "go"
    }

    fn is_reserved(&self, ident: &str) -> bool {
        GO_RESERVED_WORDS.contains(ident)
    }

    fn type_name(
        &self,
        category: ArgCategory,
        _direction: Direction,
        enum_type: Option<&EnumType>,
    ) -> String {
        match category {
            ArgCategory::Image => "*C.VipsImage".to_string(),
            ArgCategory::Bool => "bool".to_string(),
            ArgCategory::Int | ArgCategory::Flags => "int".to_string(),
            ArgCategory::Int64 => "int64".to_string(),
            ArgCategory::UInt64 => "uint64".to_string(),
            ArgCategory::Double => "float64".to_string(),
            ArgCategory::String => "string".to_string(),
            ArgCategory::ArrayInt => "[]int".to_string(),
            ArgCategory::ArrayDouble => "[]float64".to_string(),
            ArgCategory::ArrayImage => "[]*C.VipsImage".to_string(),
            ArgCategory::Blob => "[]byte".to_string(),
            ArgCategory::Interpolate => "*C.VipsInterpolate".to_string(),
            ArgCategory::Source => "*C.VipsSource".to_string(),
            ArgCategory::Target => "*C.VipsTarget".to_string(),
            ArgCategory::Enum => {
                enum_type.map_or_else(|| "int".to_string(), |e| e.generated_name.clone())
            }
        }
    }

    fn rule(&self, arg: &Argument, value: &str) -> Result<Fragments, MarshalError> {
        match arg.direction() {
            Direction::Input => Self::input(arg, value),
            Direction::Output => Self::output(arg),
        }
    }

    fn zero_value(&self, arg: &Argument) -> String {
        match arg.category {
            ArgCategory::Bool => "false",
            ArgCategory::Int
            | ArgCategory::Int64
            | ArgCategory::UInt64
            | ArgCategory::Double
            | ArgCategory::Enum
            | ArgCategory::Flags => "0",
            ArgCategory::String => "\"\"",
            _ => "nil",
        }
        .to_string()
    }

    fn option_field(&self, arg: &Argument, options: &str) -> OptionField {
        let name = capitalize_first(&arg.identifier);
        let field = format!("{options}.{name}");

        if arg.direction() == Direction::Output {
            let decoded = Self::output(arg)
                .ok()
                .and_then(|f| f.result)
                .unwrap_or_else(|| arg.identifier.clone());
            let (type_name, stored) = match self.managed_type(arg, &decoded) {
                Some(managed) => (managed.type_name, managed.from_native),
                None => (arg.target_type.clone(), decoded),
            };
            return OptionField {
                name,
                type_name,
                write_back: Some(format!("{field} = {stored}")),
                value: field,
            };
        }

        match self.managed_type(arg, &field) {
            Some(managed) => OptionField {
                name,
                type_name: managed.type_name,
                value: managed.to_native,
                write_back: None,
            },
            None => OptionField {
                name,
                type_name: arg.target_type.clone(),
                value: field,
                write_back: None,
            },
        }
    }

    fn default_literal(&self, arg: &Argument, value: &RawDefault) -> Option<String> {
        let literal = match (arg.category, value) {
            (ArgCategory::Bool, RawDefault::Bool(true)) => "true".to_string(),
            (
                ArgCategory::Int | ArgCategory::Int64 | ArgCategory::Flags | ArgCategory::Double,
                RawDefault::Int(v),
            ) if *v != 0 => v.to_string(),
            (ArgCategory::UInt64, RawDefault::Int(v)) if *v > 0 => v.to_string(),
            (ArgCategory::Enum, RawDefault::Int(v)) if *v != 0 => {
                format!("{}({v})", arg.target_type)
            }
            (ArgCategory::Double, RawDefault::Double(v)) if *v != 0.0 && v.is_finite() => {
                format!("{v}")
            }
            (ArgCategory::String, RawDefault::String(v))
                if !v.is_empty() && v.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) =>
            {
                format!("{v:?}")
            }
            _ => return None,
        };
        Some(literal)
    }

    fn managed_type(&self, arg: &Argument, value: &str) -> Option<ManagedType> {
        match arg.category {
            ArgCategory::Image => Some(ManagedType {
                type_name: "*Image".to_string(),
                to_native: format!("imageHandle({value})"),
                from_native: format!("newImageRef({value}, ImageTypeUnknown, nil)"),
            }),
            ArgCategory::ArrayImage => Some(ManagedType {
                type_name: "[]*Image".to_string(),
                to_native: format!("convertImagesToVipsImages({value})"),
                from_native: format!("convertVipsImagesToImages({value})"),
            }),
            _ => None,
        }
    }
}
