//! Catalog backed by a serialized descriptor.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::category::DocCategory;
use super::descriptor::{Callable, Descriptor, NamespaceInfo, ParameterDescriptor};
use super::{
    FormatRole, RawArgument, RawEnumValue, RawOperation, RawTypeKind, TypeCatalog, arg_flags,
};
use crate::error::{GenError, Result};
use crate::session::IntrospectionSession;

/// Default inclusion filter on C identifiers.
pub const DEFAULT_INCLUDE_PATTERN: &str = "^vips_";

const MAX_DESCRIPTION_LEN: usize = 100;

/// How to read a descriptor.
#[derive(Debug, Clone)]
pub struct StaticCatalogOptions {
    /// Explicit inclusion filter. Also relaxes the namespace check to a warning.
    pub include: Option<Regex>,
    /// Keep callables marked non-introspectable.
    pub ignore_non_introspectable: bool,
    /// Expected namespace name.
    pub expected_namespace: String,
    /// Expected namespace major version.
    pub expected_major: u32,
}

impl Default for StaticCatalogOptions {
    fn default() -> Self {
        Self {
            include: None,
            ignore_non_introspectable: false,
            expected_namespace: "Vips".to_string(),
            expected_major: 8,
        }
    }
}

/// Counters collected while reading a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StaticCatalogDebugInfo {
    /// Callables in the document.
    pub functions_found: usize,
    /// Callables turned into operations.
    pub processed: usize,
    /// Non-introspectable callables kept because of `ignore_non_introspectable`.
    pub non_introspectable_included: usize,
    /// Callables whose C identifier had to be synthesized.
    pub missing_identifier_included: usize,
    /// Callables rejected by the inclusion filter.
    pub filtered_out: usize,
    /// Deprecated callables dropped.
    pub deprecated_skipped: usize,
    /// Matching callables dropped because they are not varargs operations.
    pub non_operation_skipped: usize,
}

/// [`TypeCatalog`] over a [`Descriptor`].
#[derive(Debug)]
pub struct StaticCatalog {
    namespace: NamespaceInfo,
    operations: BTreeMap<String, RawOperation>,
    enums: BTreeMap<String, Vec<RawEnumValue>>,
    debug_info: StaticCatalogDebugInfo,
}

impl StaticCatalog {
    /// Read and index a descriptor file.
    pub fn from_path(path: &Path, options: &StaticCatalogOptions) -> Result<Self> {
        debug!(descriptor_path = %path.display(), "Loading introspection descriptor.");
        Self::new(&Descriptor::from_path(path)?, options)
    }

    /// Index a parsed descriptor.
    pub fn new(descriptor: &Descriptor, options: &StaticCatalogOptions) -> Result<Self> {
        check_namespace(&descriptor.namespace, options)?;

        let default_include;
        let include = match &options.include {
            Some(regex) => regex,
            None => {
                default_include = Regex::new(DEFAULT_INCLUDE_PATTERN)
                    .map_err(|err| GenError::Descriptor(format!("Invalid include filter: {err}")))?;
                &default_include
            }
        };

        let prefix = if descriptor.namespace.c_symbol_prefix.is_empty() {
            "vips".to_string()
        } else {
            descriptor.namespace.c_symbol_prefix.clone()
        };

        let mut kinds = HashMap::new();
        let mut enums = BTreeMap::new();
        for (list, kind) in [
            (&descriptor.enumerations, RawTypeKind::Enum),
            (&descriptor.bitfields, RawTypeKind::Flags),
        ] {
            for enumeration in list {
                kinds.insert(enumeration.c_type.clone(), kind);
                let values = enumeration
                    .members
                    .iter()
                    .map(|m| {
                        let name = if m.c_identifier.is_empty() {
                            m.name.clone()
                        } else {
                            m.c_identifier.clone()
                        };
                        let nick = m.nick.clone().unwrap_or_else(|| m.name.clone());
                        RawEnumValue::new(name, m.value, nick)
                    })
                    .collect();
                enums.insert(enumeration.c_type.clone(), values);
            }
        }

        let mut debug_info = StaticCatalogDebugInfo::default();
        let mut operations = BTreeMap::new();

        for callable in descriptor.callables() {
            debug_info.functions_found += 1;

            let Some(c_identifier) = resolve_identifier(callable, &prefix, &mut debug_info) else {
                continue;
            };
            if !include.is_match(&c_identifier) {
                debug_info.filtered_out += 1;
                continue;
            }
            if callable.deprecated {
                debug_info.deprecated_skipped += 1;
                debug!(function = %c_identifier, "Skipping deprecated function.");
                continue;
            }
            if !callable.is_introspectable() {
                if !options.ignore_non_introspectable {
                    debug!(function = %c_identifier, "Skipping non-introspectable function.");
                    continue;
                }
                debug_info.non_introspectable_included += 1;
            }
            if !callable.is_varargs() {
                debug_info.non_operation_skipped += 1;
                debug!(function = %c_identifier, "Skipping helper that is not a varargs operation.");
                continue;
            }

            let name = c_identifier
                .strip_prefix(&format!("{prefix}_"))
                .unwrap_or(&callable.name)
                .to_string();

            if operations.contains_key(&name) {
                debug!(operation = %name, "Skipping repeated callable for operation.");
                continue;
            }

            let operation = build_operation(&name, callable, &kinds);
            debug_info.processed += 1;
            operations.insert(name, operation);
        }

        debug!(
            functions_found = debug_info.functions_found,
            processed = debug_info.processed,
            non_introspectable_included = debug_info.non_introspectable_included,
            missing_identifier_included = debug_info.missing_identifier_included,
            filtered_out = debug_info.filtered_out,
            non_operation_skipped = debug_info.non_operation_skipped,
            "Indexed introspection descriptor."
        );

        Ok(Self {
            namespace: descriptor.namespace.clone(),
            operations,
            enums,
            debug_info,
        })
    }

    /// Counters collected while indexing.
    pub fn debug_info(&self) -> StaticCatalogDebugInfo {
        self.debug_info
    }

    /// Descriptor namespace header.
    pub fn namespace(&self) -> &NamespaceInfo {
        &self.namespace
    }
}

impl TypeCatalog for StaticCatalog {
    fn discover_operation_names(&self, session: &mut IntrospectionSession) -> Result<Vec<String>> {
        let names: Vec<String> = self.operations.keys().cloned().collect();
        session.counters_mut().operations_discovered += names.len();
        Ok(names)
    }

    fn describe_operation(
        &self,
        session: &mut IntrospectionSession,
        name: &str,
    ) -> Result<Option<RawOperation>> {
        let operation = self.operations.get(name).cloned();
        if operation.is_some() {
            session.counters_mut().operations_described += 1;
        }
        Ok(operation)
    }

    fn describe_enum(
        &self,
        _session: &mut IntrospectionSession,
        native_type: &str,
    ) -> Result<Option<Vec<RawEnumValue>>> {
        Ok(self.enums.get(native_type).cloned())
    }

    fn format_exists(
        &self,
        _session: &mut IntrospectionSession,
        tag: &str,
        role: FormatRole,
    ) -> bool {
        self.operations.contains_key(&role.operation_name(tag))
    }
}

fn check_namespace(namespace: &NamespaceInfo, options: &StaticCatalogOptions) -> Result<()> {
    let name_ok = namespace.name == options.expected_namespace;
    let version_ok = namespace.major_version() == Some(options.expected_major);
    if name_ok && version_ok {
        return Ok(());
    }

    let message = format!(
        "Descriptor namespace {}-{} does not match expected {}-{}",
        namespace.name, namespace.version, options.expected_namespace, options.expected_major
    );
    if options.include.is_some() {
        warn!(
            namespace = %namespace.name,
            version = %namespace.version,
            "Processing non-default namespace because an explicit include filter was given."
        );
        Ok(())
    } else {
        Err(GenError::Descriptor(message))
    }
}

fn resolve_identifier(
    callable: &Callable,
    prefix: &str,
    debug_info: &mut StaticCatalogDebugInfo,
) -> Option<String> {
    match &callable.c_identifier {
        Some(ident) if !ident.is_empty() => Some(ident.clone()),
        _ if callable.name.is_empty() => None,
        _ => {
            let ident = format!("{prefix}_{}", callable.name);
            debug_info.missing_identifier_included += 1;
            info!(function = %callable.name, c_identifier = %ident, "Synthesized C identifier.");
            Some(ident)
        }
    }
}

fn build_operation(
    name: &str,
    callable: &Callable,
    kinds: &HashMap<String, RawTypeKind>,
) -> RawOperation {
    let mut operation = RawOperation::new(
        name,
        extract_description(callable.doc.as_deref().unwrap_or_default()),
    );
    operation.category = callable
        .source_position
        .as_ref()
        .and_then(|pos| DocCategory::from_source_file(&pos.filename))
        .map(|category| category.as_str().to_string());

    if let Some(instance) = &callable.instance_parameter {
        let type_name = native_type(instance);
        operation.arguments.push(
            RawArgument::new(&instance.name, &type_name, arg_flags::REQUIRED_INPUT)
                .with_kind(kind_of(&type_name, kinds))
                .with_description(extract_description(
                    instance.doc.as_deref().unwrap_or_default(),
                )),
        );
    }

    let params = &callable.parameters;
    let folded = folded_length_slots(params);

    for (index, param) in params.iter().enumerate() {
        if param.varargs || folded.contains(&index) {
            continue;
        }

        let is_output = is_output(param);
        let type_name = argument_type(param, is_output);
        let direction = if is_output {
            arg_flags::OUTPUT
        } else {
            arg_flags::INPUT
        };
        let mut flags = arg_flags::CONSTRUCT | direction;
        if !param.optional {
            flags |= arg_flags::REQUIRED;
        }

        let mut argument = RawArgument::new(&param.name, &type_name, flags)
            .with_kind(kind_of(&type_name, kinds))
            .with_description(extract_description(param.doc.as_deref().unwrap_or_default()));

        if let Some(default) = &param.default {
            argument = argument.with_default(default.clone());
        }
        if is_output && param.array.is_some() && type_name != "VipsBlob" {
            if let Some(length) = length_slot(params, index) {
                argument = argument.with_length_slot(&params[length].name);
            }
        }

        operation.arguments.push(argument);
    }

    operation
}

fn is_output(param: &ParameterDescriptor) -> bool {
    param.is_out() || param.name == "out" || (param.array.is_none() && param.c_type().ends_with("**"))
}

/// Indices of length parameters folded into the array or blob before them.
fn folded_length_slots(params: &[ParameterDescriptor]) -> BTreeSet<usize> {
    let mut folded = BTreeSet::new();
    for (index, param) in params.iter().enumerate() {
        if is_blob(param) {
            if params.get(index + 1).is_some_and(|next| next.name == "len") {
                folded.insert(index + 1);
            }
        } else if param.array.is_some() {
            if let Some(length) = length_slot(params, index) {
                folded.insert(length);
            }
        }
    }
    folded
}

fn length_slot(params: &[ParameterDescriptor], index: usize) -> Option<usize> {
    let array = params[index].array.as_ref()?;
    match array.length {
        Some(length) if length < params.len() && length != index => Some(length),
        _ => params
            .get(index + 1)
            .is_some_and(|next| next.name == "n")
            .then_some(index + 1),
    }
}

fn is_blob(param: &ParameterDescriptor) -> bool {
    if base_type(param.c_type()) == "VipsBlob" {
        return true;
    }
    let element = param
        .array
        .as_ref()
        .and_then(|array| array.element.as_ref())
        .map(|element| base_type(&element.c_type))
        .unwrap_or_default();
    let raw = matches!(element.as_str(), "void" | "guint8" | "gpointer" | "unsigned char");
    param.name == "buf" && (raw || base_type(param.c_type()) == "void")
}

fn argument_type(param: &ParameterDescriptor, is_output: bool) -> String {
    if is_blob(param) {
        return "VipsBlob".to_string();
    }
    let Some(array) = &param.array else {
        return native_type(param);
    };

    let element = array
        .element
        .as_ref()
        .map(|e| {
            if e.c_type.is_empty() {
                gir_name_to_c(&e.name)
            } else {
                base_type(&e.c_type)
            }
        })
        .unwrap_or_else(|| base_type(&array.c_type));

    match element.as_str() {
        "gint" | "guint" => "VipsArrayInt".to_string(),
        "gdouble" | "gfloat" => "VipsArrayDouble".to_string(),
        "VipsImage" => "VipsArrayImage".to_string(),
        other => {
            debug!(parameter = %param.name, element = %other, is_output, "Unmapped array element type.");
            other.to_string()
        }
    }
}

fn native_type(param: &ParameterDescriptor) -> String {
    match &param.type_ref {
        Some(type_ref) if !type_ref.c_type.is_empty() => base_type(&type_ref.c_type),
        Some(type_ref) => gir_name_to_c(&type_ref.name),
        None => base_type(param.c_type()),
    }
}

fn gir_name_to_c(name: &str) -> String {
    match name {
        "utf8" | "filename" => "gchararray".to_string(),
        "none" => "void".to_string(),
        n if n.starts_with(|c: char| c.is_ascii_uppercase()) && !n.starts_with("Vips") => {
            format!("Vips{n}")
        }
        n => base_type(n),
    }
}

/// Strip qualifiers and pointers, and map C scalars to GLib names.
pub(crate) fn base_type(c_type: &str) -> String {
    let base = c_type
        .trim()
        .trim_start_matches("const ")
        .trim_end_matches(['*', '[', ']'])
        .trim();

    match base {
        "int" => "gint",
        "double" => "gdouble",
        "float" => "gfloat",
        "char" | "gchar" => "gchararray",
        other => other,
    }
    .to_string()
}

fn kind_of(type_name: &str, kinds: &HashMap<String, RawTypeKind>) -> RawTypeKind {
    kinds.get(type_name).copied().unwrap_or_default()
}

/// First meaningful doc line, truncated.
pub(crate) fn extract_description(doc: &str) -> String {
    doc.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with("Optional arguments:")
                && !line.starts_with('*')
                && !line.starts_with("See also:")
        })
        .map(|line| {
            if line.chars().count() > MAX_DESCRIPTION_LEN {
                let head: String = line.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
                format!("{head}...")
            } else {
                line.to_string()
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("const char*"), "gchararray");
        assert_eq!(base_type("VipsImage**"), "VipsImage");
        assert_eq!(base_type("int"), "gint");
        assert_eq!(base_type("double*"), "gdouble");
        assert_eq!(base_type("gboolean"), "gboolean");
        assert_eq!(base_type("VipsInterpretation"), "VipsInterpretation");
    }

    #[test]
    fn test_extract_description() {
        let doc = "\nOptional arguments:\n* @extend: how to extend\nEmbed @in within an image of size @width by @height.\n";
        assert_eq!(
            extract_description(doc),
            "Embed @in within an image of size @width by @height."
        );
        assert_eq!(extract_description(""), "");

        let long = "x".repeat(150);
        let desc = extract_description(&long);
        assert_eq!(desc.chars().count(), 100);
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn test_namespace_mismatch_policy() {
        let mut descriptor = Descriptor::default();
        descriptor.namespace.name = "Gtk".into();
        descriptor.namespace.version = "4.0".into();

        let err = StaticCatalog::new(&descriptor, &StaticCatalogOptions::default()).unwrap_err();
        assert!(matches!(err, GenError::Descriptor(_)));

        let options = StaticCatalogOptions {
            include: Some(Regex::new("^gtk_").unwrap()),
            ..StaticCatalogOptions::default()
        };
        assert!(StaticCatalog::new(&descriptor, &options).is_ok());
    }

    #[test]
    fn test_gir_names() {
        assert_eq!(gir_name_to_c("Image"), "VipsImage");
        assert_eq!(gir_name_to_c("utf8"), "gchararray");
        assert_eq!(gir_name_to_c("gint"), "gint");
    }
}
