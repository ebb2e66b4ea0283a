//! Descriptor-backed runs: indexing policy, normalization and generated output.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs;

use regex::Regex;
use vipsgen_core::catalog::{
    Descriptor, ParameterDescriptor, RawDefault, StaticCatalog, StaticCatalogOptions, TypeCatalog,
    TypeRef,
};
use vipsgen_core::ir::ArgCategory;
use vipsgen_core::{
    DirectoryTemplateSource, EmbeddedTemplateSource, GenError, GeneratorConfig,
    IntrospectionSession, generate, introspect,
};

use common::{DESCRIPTOR_JSON, read_tree};

fn catalog() -> StaticCatalog {
    let descriptor = Descriptor::from_json_str(DESCRIPTOR_JSON).unwrap();
    StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap()
}

#[test]
fn test_default_filter_and_deprecation() {
    let catalog = catalog();
    let mut session = IntrospectionSession::new();
    let names = catalog.discover_operation_names(&mut session).unwrap();
    assert_eq!(
        names,
        vec!["colourspace", "embed", "getpoint", "jpegload", "pngsave_buffer"]
    );

    let info = catalog.debug_info();
    assert_eq!(info.functions_found, 7);
    assert_eq!(info.filtered_out, 1);
    assert_eq!(info.deprecated_skipped, 1);
    assert_eq!(info.processed, 5);
    assert_eq!(info.non_operation_skipped, 0);
}

const HELPER_DESCRIPTOR: &str = r#"{
  "namespace": { "name": "Vips", "version": "8.0", "c_symbol_prefix": "vips" },
  "classes": [{
    "name": "Image",
    "c_type": "VipsImage",
    "methods": [
      {
        "name": "invert",
        "c_identifier": "vips_invert",
        "instance_parameter": { "name": "in", "type": { "name": "Image", "c_type": "VipsImage*" } },
        "parameters": [
          { "name": "out", "direction": "out", "type": { "name": "Image", "c_type": "VipsImage**" } },
          { "name": "...", "varargs": true }
        ]
      },
      {
        "name": "set",
        "c_identifier": "vips_image_set",
        "instance_parameter": { "name": "image", "type": { "name": "Image", "c_type": "VipsImage*" } },
        "parameters": [
          { "name": "name", "type": { "name": "utf8", "c_type": "const char*" } },
          { "name": "value", "type": { "name": "GObject.Value", "c_type": "GValue*" } }
        ]
      }
    ]
  }]
}"#;

#[test]
fn test_helpers_without_varargs_are_not_operations() {
    let descriptor = Descriptor::from_json_str(HELPER_DESCRIPTOR).unwrap();
    let catalog = StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap();
    assert_eq!(catalog.debug_info().non_operation_skipped, 1);

    let normalized = introspect(&catalog, &GeneratorConfig::empty()).unwrap();
    let names: Vec<_> = normalized.ir.operations.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["invert"]);
}

#[test]
fn test_unclassifiable_operation_argument_stays_fatal() {
    let mut descriptor = Descriptor::from_json_str(HELPER_DESCRIPTOR).unwrap();
    let set = &mut descriptor.classes[0].methods[1];
    set.c_identifier = Some("vips_setvalue".to_string());
    set.parameters.push(ParameterDescriptor {
        name: "...".to_string(),
        varargs: true,
        ..ParameterDescriptor::default()
    });
    let catalog = StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap();

    let err = introspect(&catalog, &GeneratorConfig::empty()).unwrap_err();
    assert!(matches!(
        err,
        GenError::Classification { ref operation, ref argument, ref type_name }
            if operation == "setvalue" && argument == "value" && type_name == "GValue"
    ));
}

#[test]
fn test_include_filter_and_namespace_policy() {
    let mut descriptor = Descriptor::from_json_str(DESCRIPTOR_JSON).unwrap();
    descriptor.namespace.name = "Other".to_string();

    let err = StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap_err();
    assert!(matches!(err, GenError::Descriptor(_)));

    let options = StaticCatalogOptions {
        include: Some(Regex::new("^vips_(embed|getpoint)$").unwrap()),
        ..StaticCatalogOptions::default()
    };
    let catalog = StaticCatalog::new(&descriptor, &options).unwrap();
    let mut session = IntrospectionSession::new();
    assert_eq!(
        catalog.discover_operation_names(&mut session).unwrap(),
        vec!["embed", "getpoint"]
    );
}

#[test]
fn test_vector_and_blob_slots_are_folded() {
    let normalized = introspect(&catalog(), &GeneratorConfig::builtin()).unwrap();

    let getpoint = normalized.ir.operation("getpoint").unwrap();
    let arg_names: Vec<_> = getpoint.arguments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(arg_names, vec!["in", "vector", "x", "y"]);
    let vector = &getpoint.outputs[0];
    assert_eq!(vector.category, ArgCategory::ArrayDouble);
    assert_eq!(vector.vector.as_ref().unwrap().length_name, "n");

    let save = normalized.ir.operation("pngsave_buffer").unwrap();
    assert_eq!(save.outputs.len(), 1);
    assert_eq!(save.outputs[0].category, ArgCategory::Blob);
    assert!(save.arguments.iter().all(|a| a.name != "len"));
}

#[test]
fn test_descriptor_enums_and_formats() {
    let normalized = introspect(&catalog(), &GeneratorConfig::builtin()).unwrap();
    let ir = &normalized.ir;

    let interpretation = ir.enum_type("VipsInterpretation").unwrap();
    assert_eq!(interpretation.generated_name, "Interpretation");
    assert_eq!(interpretation.value_of("Srgb"), Some(22));
    assert_eq!(interpretation.value_of("BW"), Some(1));

    let tags: Vec<_> = ir.image_formats.iter().map(|f| f.tag.as_str()).collect();
    assert_eq!(tags, vec!["unknown", "jpeg", "png"]);
    assert_eq!(ir.savers.get("HasPngSaver"), Some(&true));
    assert_eq!(ir.savers.get("HasJpegSaver"), Some(&false));

    let jpegload = ir.operation("jpegload").unwrap();
    assert!(jpegload.needs_custom_wrapper);
    assert_eq!(jpegload.optional_inputs[0].name, "option_string");
}

#[test]
fn test_generate_from_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let summary = generate(
        &catalog(),
        &GeneratorConfig::builtin(),
        EmbeddedTemplateSource,
        dir.path(),
    )
    .unwrap();
    assert_eq!(summary.discovered, 5);
    assert_eq!(summary.emitted, 5);

    let files = read_tree(dir.path());
    let image_go = &files["image.go"];
    assert!(image_go.contains("func (r *Image) Getpoint(x int, y int) ([]float64, error) {"));
    assert!(image_go.contains("func (r *Image) Colourspace(space Interpretation) error {"));
    assert!(image_go.contains("func (r *Image) PngsaveBuffer() ([]byte, error) {"));
    assert!(!image_go.contains("Jpegload"));

    let vips_go = &files["vips.go"];
    assert!(vips_go.contains("func vipsgenJpegload(filename string, options *JpegloadOptions) (*C.VipsImage, error) {"));
    assert!(vips_go.contains("\"unsafe\""));

    let vips_c = &files["vips.c"];
    assert!(vips_c.contains("static int vipsgen_jpegload_split("));
    assert!(vips_c.contains("vips_call_split_option_string(\"jpegload\""));
    assert!(files["vips.h"].contains("double** vector, int* n"));

    let types_go = &files["types.go"];
    assert!(types_go.contains("\tInterpretationSrgb Interpretation = 22\n"));
    assert!(types_go.contains("\tImageTypeJpeg: \"image/jpeg\",\n"));
    assert!(types_go.contains("\tHasPngSaver = true\n"));
}

#[test]
fn test_descriptor_defaults_reach_default_options() {
    let mut descriptor = Descriptor::from_json_str(DESCRIPTOR_JSON).unwrap();
    let embed = &mut descriptor.classes[0].methods[0];
    let varargs = embed.parameters.len() - 1;
    embed.parameters.insert(
        varargs,
        ParameterDescriptor {
            name: "extend".to_string(),
            optional: true,
            type_ref: Some(TypeRef {
                name: "gint".to_string(),
                c_type: "int".to_string(),
            }),
            default: Some(RawDefault::Int(1)),
            ..ParameterDescriptor::default()
        },
    );
    let catalog = StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap();

    let normalized = introspect(&catalog, &GeneratorConfig::builtin()).unwrap();
    let extend = &normalized.ir.operation("embed").unwrap().optional_inputs[0];
    assert_eq!(extend.name, "extend");
    assert_eq!(extend.default, Some(RawDefault::Int(1)));

    let dir = tempfile::tempdir().unwrap();
    generate(
        &catalog,
        &GeneratorConfig::builtin(),
        EmbeddedTemplateSource,
        dir.path(),
    )
    .unwrap();
    let files = read_tree(dir.path());
    assert!(files["vips.go"].contains(
        "func DefaultEmbedOptions() *EmbedOptions {\n\treturn &EmbedOptions{\n\t\tExtend: 1,\n\t}\n}\n"
    ));
}

/// Text of the function starting at `head`, up to its closing brace.
fn function_text<'a>(source: &'a str, head: &str) -> &'a str {
    let start = source.find(head).unwrap();
    let end = source[start..].find("\n}\n").unwrap();
    &source[start..start + end + 3]
}

/// Each needle occurs in `haystack`, in the given order.
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        let found = haystack[from..].find(needle);
        assert!(found.is_some(), "missing or out of order: {needle}\n{haystack}");
        from += found.unwrap() + needle.len();
    }
}

#[test]
fn test_vector_output_copies_reported_length() {
    let dir = tempfile::tempdir().unwrap();
    generate(
        &catalog(),
        &GeneratorConfig::builtin(),
        EmbeddedTemplateSource,
        dir.path(),
    )
    .unwrap();
    let files = read_tree(dir.path());

    let shim = function_text(&files["vips.c"], "int vipsgen_getpoint(");
    assert_in_order(
        shim,
        &[
            "int vipsgen_getpoint(VipsImage* in, double** vector, int* n, int x, int y) {",
            "VipsArrayDouble* vector_array = NULL;",
            "*vector = NULL;",
            "*n = 0;",
            "int result = vips_call(\"getpoint\", in, &vector_array, x, y, NULL);",
            "int vector_count = 0;",
            "double* vector_values = vips_array_double_get(vector_array, &vector_count);",
            "if (vector_count > VIPSGEN_VECTOR_CAPACITY) vector_count = VIPSGEN_VECTOR_CAPACITY;",
            "*vector = g_memdup2(vector_values, (gsize) vector_count * sizeof(double));",
            "*n = vector_count;",
            "vips_area_unref(VIPS_AREA(vector_array));",
            "return result;",
        ],
    );

    let wrapper = function_text(&files["vips.go"], "func vipsgenGetpoint(");
    assert_in_order(
        wrapper,
        &[
            "func vipsgenGetpoint(in *C.VipsImage, x int, y int) ([]float64, error) {",
            "var cVector *C.double",
            "var cVectorLen C.int",
            "result := C.vipsgen_getpoint(in, &cVector, &cVectorLen, C.int(x), C.int(y))",
            "return nil, handleVipsError()",
            "defer gFreePointer(unsafe.Pointer(cVector))",
            "vector := make([]float64, int(cVectorLen))",
            "if cVectorLen > 0 {",
            "copy(vector, (*[vectorCapacity]float64)(unsafe.Pointer(cVector))[:cVectorLen:cVectorLen])",
            "return vector, nil",
        ],
    );
}

#[test]
fn test_template_directory_override() {
    let templates = tempfile::tempdir().unwrap();
    fs::create_dir_all(templates.path().join("templates")).unwrap();
    fs::write(
        templates.path().join("templates/types.go.tera"),
        "package vips\n{% for format in image_formats %}// {{ format.tag }}\n{% endfor %}",
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    generate(
        &catalog(),
        &GeneratorConfig::builtin(),
        DirectoryTemplateSource::new(templates.path()),
        out.path(),
    )
    .unwrap();

    let files = read_tree(out.path());
    assert_eq!(files["types.go"], "package vips\n// unknown\n// jpeg\n// png\n");
    assert!(files["vips.go"].contains("DO NOT EDIT"));
}
