//! Foreign side: C shims over `vips_call`.

use super::{Fragments, MarshalRules, unsupported};
use crate::error::MarshalError;
use crate::ir::naming::C_RESERVED_WORDS;
use crate::ir::{ArgCategory, Argument, Direction, EnumType};

/// C shim rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CShimRules;

/// (element C type, `VipsArray*` type, constructor, getter) for array categories.
fn array_parts(category: ArgCategory) -> Option<(&'static str, &'static str, &'static str, &'static str)> {
    match category {
        ArgCategory::ArrayInt => Some((
            "int",
            "VipsArrayInt",
            "vips_array_int_new",
            "vips_array_int_get",
        )),
        ArgCategory::ArrayDouble => Some((
            "double",
            "VipsArrayDouble",
            "vips_array_double_new",
            "vips_array_double_get",
        )),
        ArgCategory::ArrayImage => Some((
            "VipsImage*",
            "VipsArrayImage",
            "vips_array_image_new",
            "vips_array_image_get",
        )),
        _ => None,
    }
}

impl CShimRules {
    fn length_name(arg: &Argument, name: &str) -> String {
        arg.vector
            .as_ref()
            .map_or_else(|| format!("{name}_n"), |v| v.length_name.replace('-', "_"))
    }

    fn input(arg: &Argument, name: &str) -> Fragments {
        if let Some((element, array_type, new_fn, _)) = array_parts(arg.category) {
            let constness = if arg.category == ArgCategory::ArrayImage { "" } else { "const " };
            return Fragments {
                declaration: Some(format!("{constness}{element}* {name}, int {name}_n")),
                pre_call: vec![format!(
                    "{array_type}* {name}_array = {new_fn}({name}, {name}_n);"
                )],
                call: format!("{name}_array"),
                post_call: vec![format!("vips_area_unref(VIPS_AREA({name}_array));")],
                result: None,
            };
        }

        if arg.category == ArgCategory::Blob {
            return Fragments {
                declaration: Some(format!("const void* {name}, size_t {name}_len")),
                pre_call: vec![format!(
                    "VipsBlob* {name}_blob = vips_blob_copy({name}, {name}_len);"
                )],
                call: format!("{name}_blob"),
                post_call: vec![format!("vips_area_unref(VIPS_AREA({name}_blob));")],
                result: None,
            };
        }

        Fragments::direct(format!("{} {name}", arg.foreign_type), name)
    }

    fn output(arg: &Argument, name: &str) -> Result<Fragments, MarshalError> {
        if let Some((element, array_type, _, get_fn)) = array_parts(arg.category) {
            let len = Self::length_name(arg, name);
            let mut post_call = vec![
                format!("if ({name}_array != NULL) {{"),
                format!("    int {name}_count = 0;"),
                format!("    {element}* {name}_values = {get_fn}({name}_array, &{name}_count);"),
                format!(
                    "    if ({name}_count > VIPSGEN_VECTOR_CAPACITY) {name}_count = VIPSGEN_VECTOR_CAPACITY;"
                ),
            ];
            if arg.category == ArgCategory::ArrayImage {
                post_call.push(format!(
                    "    for (int i = 0; i < {name}_count; i++) g_object_ref({name}_values[i]);"
                ));
            }
            post_call.extend([
                format!(
                    "    *{name} = g_memdup2({name}_values, (gsize) {name}_count * sizeof({element}));"
                ),
                format!("    *{len} = {name}_count;"),
                format!("    vips_area_unref(VIPS_AREA({name}_array));"),
                "}".to_string(),
            ]);
            return Ok(Fragments {
                declaration: Some(format!("{element}** {name}, int* {len}")),
                pre_call: vec![
                    format!("{array_type}* {name}_array = NULL;"),
                    format!("*{name} = NULL;"),
                    format!("*{len} = 0;"),
                ],
                call: format!("&{name}_array"),
                post_call,
                result: None,
            });
        }

        let fragments = match arg.category {
            ArgCategory::Blob => Fragments {
                declaration: Some(format!("void** {name}, size_t* {name}_len")),
                pre_call: vec![
                    format!("VipsBlob* {name}_blob = NULL;"),
                    format!("*{name} = NULL;"),
                    format!("*{name}_len = 0;"),
                ],
                call: format!("&{name}_blob"),
                post_call: vec![
                    format!("if ({name}_blob != NULL) {{"),
                    format!("    size_t {name}_size = 0;"),
                    format!("    const void* {name}_data = vips_blob_get({name}_blob, &{name}_size);"),
                    format!("    *{name} = g_memdup2({name}_data, {name}_size);"),
                    format!("    *{name}_len = {name}_size;"),
                    format!("    vips_area_unref(VIPS_AREA({name}_blob));"),
                    "}".to_string(),
                ],
                result: None,
            },
            ArgCategory::Image
            | ArgCategory::Bool
            | ArgCategory::Int
            | ArgCategory::Int64
            | ArgCategory::UInt64
            | ArgCategory::Double
            | ArgCategory::String
            | ArgCategory::Enum
            | ArgCategory::Flags => Fragments::direct(format!("{} {name}", arg.foreign_type), name),
            _ => return Err(unsupported(arg)),
        };
        Ok(fragments)
    }
}

impl MarshalRules for CShimRules {
    fn language(&self) -> &'static str {
        "c"
    }

    fn is_reserved(&self, ident: &str) -> bool {
        C_RESERVED_WORDS.contains(ident)
    }

    fn type_name(
        &self,
        category: ArgCategory,
        direction: Direction,
        enum_type: Option<&EnumType>,
    ) -> String {
        let base = match category {
            ArgCategory::Image => "VipsImage*",
            ArgCategory::Bool | ArgCategory::Int | ArgCategory::Flags => "int",
            ArgCategory::Int64 => "gint64",
            ArgCategory::UInt64 => "guint64",
            ArgCategory::Double => "double",
            ArgCategory::String => match direction {
                Direction::Input => "const char*",
                Direction::Output => "char*",
            },
            ArgCategory::ArrayInt => "int*",
            ArgCategory::ArrayDouble => "double*",
            ArgCategory::ArrayImage => "VipsImage**",
            ArgCategory::Blob => "void*",
            ArgCategory::Interpolate => "VipsInterpolate*",
            ArgCategory::Source => "VipsSource*",
            ArgCategory::Target => "VipsTarget*",
            ArgCategory::Enum => match (direction, enum_type) {
                (Direction::Input, Some(e)) => e.native_name.as_str(),
                _ => "int",
            },
        };
        match direction {
            Direction::Input => base.to_string(),
            Direction::Output => format!("{base}*"),
        }
    }

    fn rule(&self, arg: &Argument, value: &str) -> Result<Fragments, MarshalError> {
        match arg.direction() {
            Direction::Input => Ok(Self::input(arg, value)),
            Direction::Output => Self::output(arg, value),
        }
    }

    fn zero_value(&self, arg: &Argument) -> String {
        match arg.category {
            ArgCategory::Bool
            | ArgCategory::Int
            | ArgCategory::Int64
            | ArgCategory::UInt64
            | ArgCategory::Double
            | ArgCategory::Enum
            | ArgCategory::Flags => "0",
            _ => "NULL",
        }
        .to_string()
    }

    fn call_declaration(&self, arg: &Argument, value: &str) -> Option<String> {
        let output = arg.direction() == Direction::Output;
        let call_type = if let Some((_, array_type, _, _)) = array_parts(arg.category) {
            if output {
                format!("{array_type}**")
            } else {
                format!("{array_type}*")
            }
        } else if arg.category == ArgCategory::Blob {
            if output { "VipsBlob**" } else { "VipsBlob*" }.to_string()
        } else {
            arg.foreign_type.clone()
        };
        Some(format!("{call_type} {value}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::VectorShape;

    fn arg(name: &str, category: ArgCategory, output: bool) -> Argument {
        let direction = if output { Direction::Output } else { Direction::Input };
        Argument {
            name: name.to_string(),
            identifier: name.to_string(),
            native_type: String::new(),
            target_type: String::new(),
            foreign_type: CShimRules.type_name(category, direction, None),
            description: String::new(),
            required: true,
            is_input: !output,
            is_output: output,
            flags: 0,
            category,
            enum_type: None,
            vector: None,
            default: None,
            synthetic: false,
        }
    }

    #[test]
    fn test_direct_slots() {
        let f = CShimRules.rule(&arg("in", ArgCategory::Image, false), "in").unwrap();
        assert_eq!(f.declaration.as_deref(), Some("VipsImage* in"));
        assert_eq!(f.call, "in");

        let f = CShimRules.rule(&arg("out", ArgCategory::Image, true), "out").unwrap();
        assert_eq!(f.declaration.as_deref(), Some("VipsImage** out"));
        assert_eq!(f.call, "out");
    }

    #[test]
    fn test_wide_integer_slots() {
        let f = CShimRules.rule(&arg("limit", ArgCategory::UInt64, false), "limit").unwrap();
        assert_eq!(f.declaration.as_deref(), Some("guint64 limit"));
        let f = CShimRules.rule(&arg("total", ArgCategory::Int64, true), "total").unwrap();
        assert_eq!(f.declaration.as_deref(), Some("gint64* total"));
        assert_eq!(f.call, "total");
    }

    #[test]
    fn test_array_input_is_wrapped_and_released() {
        let f = CShimRules
            .rule(&arg("background", ArgCategory::ArrayDouble, false), "background")
            .unwrap();
        assert_eq!(
            f.declaration.as_deref(),
            Some("const double* background, int background_n")
        );
        assert_eq!(f.call, "background_array");
        assert!(f.pre_call[0].contains("vips_array_double_new(background, background_n)"));
        assert!(f.post_call[0].contains("vips_area_unref"));
    }

    #[test]
    fn test_vector_output_uses_length_slot() {
        let mut a = arg("out_array", ArgCategory::ArrayDouble, true);
        a.vector = Some(VectorShape {
            length_name: "n".into(),
        });
        let f = CShimRules.rule(&a, "out_array").unwrap();
        assert_eq!(f.declaration.as_deref(), Some("double** out_array, int* n"));
        assert_eq!(f.call, "&out_array_array");
        assert!(f.post_call.iter().any(|l| l.contains("g_memdup2")));
        assert!(f.post_call.iter().any(|l| l.contains("*n = out_array_count;")));
    }

    #[test]
    fn test_call_declarations() {
        let a = arg("in", ArgCategory::ArrayImage, false);
        assert_eq!(
            CShimRules.call_declaration(&a, "in_array").as_deref(),
            Some("VipsArrayImage* in_array")
        );
        let a = arg("filename", ArgCategory::String, false);
        assert_eq!(
            CShimRules.call_declaration(&a, "filename").as_deref(),
            Some("const char* filename")
        );
    }

    #[test]
    fn test_source_output_unsupported() {
        assert!(CShimRules.rule(&arg("src", ArgCategory::Source, true), "src").is_err());
    }
}
