//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use vipsgen_core::catalog::{MemoryCatalog, RawArgument, RawEnumValue, RawOperation, RawTypeKind, arg_flags};

pub fn image_in(name: &str) -> RawArgument {
    RawArgument::new(name, "VipsImage", arg_flags::REQUIRED_INPUT)
}

pub fn image_out(name: &str) -> RawArgument {
    RawArgument::new(name, "VipsImage", arg_flags::REQUIRED_OUTPUT)
}

pub fn int_in(name: &str) -> RawArgument {
    RawArgument::new(name, "gint", arg_flags::REQUIRED_INPUT)
}

pub fn copy() -> RawOperation {
    RawOperation::new("copy", "copy an image")
        .with_argument(image_in("in"))
        .with_argument(image_out("out"))
}

pub fn measure() -> RawOperation {
    RawOperation::new("measure", "measure a set of patches on a color chart")
        .with_argument(image_in("in"))
        .with_argument(RawArgument::new("scale", "gdouble", arg_flags::REQUIRED_INPUT))
        .with_argument(RawArgument::new("out", "gdouble", arg_flags::REQUIRED_OUTPUT))
}

pub fn embed() -> RawOperation {
    RawOperation::new("embed", "embed an image in a larger image")
        .with_argument(image_in("in"))
        .with_argument(image_out("out"))
        .with_argument(int_in("x"))
        .with_argument(int_in("y"))
        .with_argument(int_in("width"))
        .with_argument(int_in("height"))
        .with_argument(RawArgument::new("extend", "gint", arg_flags::OPTIONAL_INPUT))
}

/// `copy`, `measure` and `embed`.
pub fn basic_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_operation(copy())
        .with_operation(measure())
        .with_operation(embed())
}

/// `sample` taking a `VipsSample` enum with values FOO, BAR, BAZ_QUX.
pub fn enum_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_operation(
            RawOperation::new("sample", "sample an image")
                .with_argument(image_in("in"))
                .with_argument(image_out("out"))
                .with_argument(
                    RawArgument::new("kind", "VipsSample", arg_flags::REQUIRED_INPUT)
                        .with_kind(RawTypeKind::Enum),
                ),
        )
        .with_enum(
            "VipsSample",
            vec![
                RawEnumValue::new("FOO", 0, "foo"),
                RawEnumValue::new("BAR", 1, "bar"),
                RawEnumValue::new("BAZ_QUX", 2, "baz-qux"),
            ],
        )
}

/// A GIR-shaped descriptor with a few image methods, a loader, a saver and an enum.
pub const DESCRIPTOR_JSON: &str = r#"{
  "namespace": { "name": "Vips", "version": "8.0", "shared_library": "libvips.so.42", "c_symbol_prefix": "vips" },
  "functions": [
    {
      "name": "jpegload",
      "c_identifier": "vips_jpegload",
      "doc": "load jpeg from file\n\nOptional arguments:\n* @shrink: shrink factor",
      "source_position": { "filename": "libvips/include/vips/foreign.h" },
      "parameters": [
        { "name": "filename", "type": { "name": "utf8", "c_type": "const char*" }, "doc": "file to load" },
        { "name": "out", "direction": "out", "type": { "name": "Image", "c_type": "VipsImage**" } },
        { "name": "...", "varargs": true }
      ]
    },
    {
      "name": "free",
      "c_identifier": "g_free",
      "parameters": [ { "name": "mem", "type": { "name": "gpointer", "c_type": "gpointer" } } ]
    },
    {
      "name": "old_thing",
      "c_identifier": "vips_old_thing",
      "deprecated": true,
      "parameters": []
    }
  ],
  "classes": [
    {
      "name": "Image",
      "c_type": "VipsImage",
      "methods": [
        {
          "name": "embed",
          "c_identifier": "vips_embed",
          "doc": "embed an image in a larger image",
          "source_position": { "filename": "libvips/include/vips/conversion.h" },
          "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
          "parameters": [
            { "name": "out", "direction": "out", "type": { "name": "Image", "c_type": "VipsImage**" } },
            { "name": "x", "type": { "name": "gint", "c_type": "int" } },
            { "name": "y", "type": { "name": "gint", "c_type": "int" } },
            { "name": "width", "type": { "name": "gint", "c_type": "int" } },
            { "name": "height", "type": { "name": "gint", "c_type": "int" } },
            { "name": "...", "varargs": true }
          ]
        },
        {
          "name": "getpoint",
          "c_identifier": "vips_getpoint",
          "doc": "read a point from an image",
          "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
          "parameters": [
            {
              "name": "vector",
              "direction": "out",
              "array": { "c_type": "double**", "length": 1, "element": { "name": "gdouble", "c_type": "gdouble" } }
            },
            { "name": "n", "direction": "out", "type": { "name": "gint", "c_type": "int*" } },
            { "name": "x", "type": { "name": "gint", "c_type": "int" } },
            { "name": "y", "type": { "name": "gint", "c_type": "int" } },
            { "name": "...", "varargs": true }
          ]
        },
        {
          "name": "colourspace",
          "c_identifier": "vips_colourspace",
          "doc": "convert to a new colorspace",
          "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
          "parameters": [
            { "name": "out", "direction": "out", "type": { "name": "Image", "c_type": "VipsImage**" } },
            { "name": "space", "type": { "name": "Interpretation", "c_type": "VipsInterpretation" } },
            { "name": "...", "varargs": true }
          ]
        },
        {
          "name": "pngsave_buffer",
          "c_identifier": "vips_pngsave_buffer",
          "doc": "save image to png buffer",
          "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
          "parameters": [
            {
              "name": "buf",
              "direction": "out",
              "array": { "c_type": "void**", "element": { "name": "guint8", "c_type": "guint8" } }
            },
            { "name": "len", "direction": "out", "type": { "name": "gsize", "c_type": "size_t*" } },
            { "name": "...", "varargs": true }
          ]
        }
      ]
    }
  ],
  "enumerations": [
    {
      "name": "Interpretation",
      "c_type": "VipsInterpretation",
      "members": [
        { "name": "multiband", "value": 0, "c_identifier": "VIPS_INTERPRETATION_MULTIBAND" },
        { "name": "b_w", "value": 1, "c_identifier": "VIPS_INTERPRETATION_B_W" },
        { "name": "srgb", "value": 22, "c_identifier": "VIPS_INTERPRETATION_sRGB" }
      ]
    }
  ]
}"#;

/// Every regular file under `dir`, keyed by relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(dir).unwrap().to_string_lossy().to_string();
            files.insert(rel, fs::read_to_string(entry.path()).unwrap());
        }
    }
    files
}
