//! Identifier helpers shared by normalization and emission.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Go identifiers that generated arguments must not shadow.
///
/// Keywords, plus the predeclared names and locals the emitted wrapper bodies use.
pub static GO_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // keywords
        "break",
        "case",
        "chan",
        "const",
        "continue",
        "default",
        "defer",
        "else",
        "fallthrough",
        "for",
        "func",
        "go",
        "goto",
        "if",
        "import",
        "interface",
        "map",
        "package",
        "range",
        "return",
        "select",
        "struct",
        "switch",
        "type",
        "var",
        // predeclared
        "bool",
        "byte",
        "cap",
        "copy",
        "error",
        "false",
        "int",
        "len",
        "make",
        "new",
        "nil",
        "string",
        "true",
        // wrapper locals
        "err",
        "elem",
        "idx",
        "options",
        "r",
        "result",
    ]
    .into_iter()
    .collect()
});

/// C keywords, used to guard shim parameter names.
pub static C_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
        "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
        "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch",
        "typedef", "union", "unsigned", "void", "volatile", "while", "operation", "optional",
        "result",
    ]
    .into_iter()
    .collect()
});

/// Capitalize the first letter of a string, leaving the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Lowercase the first letter of a string, leaving the rest untouched.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// `extract_area` -> `ExtractArea`. Parts keep their inner casing (`sRGB2HSV` -> `SRGB2HSV`).
pub fn snake_to_camel(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect()
}

/// PascalCase identifier for an operation.
pub fn operation_identifier(name: &str) -> String {
    let ident = snake_to_camel(&name.replace('-', "_"));
    if ident.is_empty() {
        return "Op".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("Op{ident}");
    }
    ident
}

/// lowerCamelCase identifier for an argument, with `_` appended to reserved words.
pub fn argument_identifier(name: &str, is_reserved: impl Fn(&str) -> bool) -> String {
    let mut ident = lower_first(&snake_to_camel(&name.replace('-', "_")));

    if ident.is_empty() {
        return "arg_".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("_{ident}");
    }
    if is_reserved(&ident) {
        ident.push('_');
    }
    ident
}

/// C parameter name for a native argument.
pub fn c_identifier(name: &str) -> String {
    let ident = name.replace('-', "_");
    if C_RESERVED_WORDS.contains(ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// `VipsForeignHeifCompression` -> `HeifCompression`.
pub fn enum_type_name(native: &str) -> String {
    let name = native.strip_prefix("Vips").unwrap_or(native);
    let name = name.strip_prefix("Foreign").unwrap_or(name);
    name.to_string()
}

/// Symbol for an enum value, unique within its type.
///
/// `VIPS_INTERPRETATION_sRGB` in `Interpretation` -> `Srgb`; `BAZ_QUX` -> `BazQux`.
pub fn enum_value_symbol(type_name: &str, value_name: &str) -> String {
    let camel = snake_to_camel(&value_name.to_lowercase());
    let lower = camel.to_lowercase();
    let type_lower = type_name.to_lowercase();

    for prefix in [
        format!("vipsforeign{type_lower}"),
        format!("vips{type_lower}"),
    ] {
        if lower.starts_with(&prefix) && lower.len() > prefix.len() {
            return camel[prefix.len()..].to_string();
        }
    }
    camel
}

/// Qualified enum constant: `Interpretation` + `Srgb`.
pub fn enum_constant(type_name: &str, symbol: &str) -> String {
    format!("{type_name}{symbol}")
}

/// `jpeg` -> `ImageTypeJpeg`.
pub fn image_type_symbol(tag: &str) -> String {
    format!("ImageType{}", capitalize_first(tag))
}

/// Collapse a description into one comment-safe line.
pub fn comment_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("*/", "* /")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn go_reserved(ident: &str) -> bool {
        GO_RESERVED_WORDS.contains(ident)
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("extract_area"), "ExtractArea");
        assert_eq!(snake_to_camel("copy"), "Copy");
        assert_eq!(snake_to_camel("sRGB2HSV"), "SRGB2HSV");
        assert_eq!(snake_to_camel("resize_"), "Resize");
        assert_eq!(snake_to_camel(""), "");
    }

    #[test]
    fn test_operation_identifier() {
        assert_eq!(operation_identifier("extract_area"), "ExtractArea");
        assert_eq!(operation_identifier("hist-find"), "HistFind");
        assert_eq!(operation_identifier("resize"), operation_identifier("resize_"));
    }

    #[test]
    fn test_argument_identifier() {
        assert_eq!(argument_identifier("in", go_reserved), "in");
        assert_eq!(argument_identifier("type", go_reserved), "type_");
        assert_eq!(argument_identifier("page-height", go_reserved), "pageHeight");
        assert_eq!(argument_identifier("Q", go_reserved), "q");
        assert_eq!(argument_identifier("len", go_reserved), "len_");
        assert_eq!(argument_identifier("options", go_reserved), "options_");
    }

    #[test]
    fn test_c_identifier() {
        assert_eq!(c_identifier("page-height"), "page_height");
        assert_eq!(c_identifier("in"), "in");
        assert_eq!(c_identifier("default"), "default_");
    }

    #[test]
    fn test_enum_type_name() {
        assert_eq!(enum_type_name("VipsInterpretation"), "Interpretation");
        assert_eq!(enum_type_name("VipsForeignHeifCompression"), "HeifCompression");
        assert_eq!(enum_type_name("Sample"), "Sample");
    }

    #[test]
    fn test_enum_value_symbol() {
        assert_eq!(
            enum_value_symbol("Interpretation", "VIPS_INTERPRETATION_sRGB"),
            "Srgb"
        );
        assert_eq!(
            enum_value_symbol("HeifCompression", "VIPS_FOREIGN_HEIF_COMPRESSION_AV1"),
            "Av1"
        );
        assert_eq!(enum_value_symbol("Sample", "FOO"), "Foo");
        assert_eq!(enum_value_symbol("Sample", "BAZ_QUX"), "BazQux");
        assert_eq!(enum_constant("Interpretation", "Srgb"), "InterpretationSrgb");
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(comment_text("copy an\n  image"), "copy an image");
        assert_eq!(comment_text("a */ b"), "a * / b");
    }

    #[test]
    fn test_image_type_symbol() {
        assert_eq!(image_type_symbol("jpeg"), "ImageTypeJpeg");
        assert_eq!(image_type_symbol("jp2k"), "ImageTypeJp2k");
    }
}
