//! Normalization from raw catalog records to the IR.
//!
//! This module handles all the libvips-specific resolution:
//! - exclusion and override filtering
//! - argument classification and lazy enum discovery
//! - bucketing, identifier generation and deduplication

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::formats::{discover_image_formats, discover_supported_savers};
use super::naming::{
    argument_identifier, enum_constant, enum_type_name, enum_value_symbol, operation_identifier,
};
use super::types::{
    ArgCategory, Argument, Direction, EnumType, EnumValue, GeneratorIr, Operation, VectorShape,
};
use crate::catalog::{DocCategory, RawArgument, RawOperation, RawTypeKind, TypeCatalog, arg_flags, doc_url};
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result, SkipReason};
use crate::marshal::MarshalRules;
use crate::session::IntrospectionSession;

/// An operation left out of the IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedOperation {
    /// Native name.
    pub name: String,
    /// Why.
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What normalization left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    /// Names returned by discovery.
    pub discovered: usize,
    /// Skipped operations in discovery order.
    pub skipped: Vec<SkippedOperation>,
}

impl NormalizationReport {
    /// Operations skipped for any reason.
    pub fn filtered(&self) -> usize {
        self.skipped.len()
    }

    /// Skip reason for an operation, if it was skipped.
    pub fn reason_for(&self, name: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.reason)
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        self.skipped.push(SkippedOperation {
            name: name.to_string(),
            reason,
        });
    }
}

/// Normalized IR plus the report of what was left out.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedIr {
    /// The IR handed to emission.
    pub ir: GeneratorIr,
    /// Skipped operations.
    pub report: NormalizationReport,
}

/// Turns raw catalog records into the IR.
pub struct Normalizer<'a> {
    catalog: &'a dyn TypeCatalog,
    session: &'a mut IntrospectionSession,
    config: &'a GeneratorConfig,
    host: &'a dyn MarshalRules,
    foreign: &'a dyn MarshalRules,
    report: NormalizationReport,
}

impl std::fmt::Debug for Normalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("host", &self.host.language())
            .field("foreign", &self.foreign.language())
            .field("report", &self.report)
            .finish()
    }
}

impl<'a> Normalizer<'a> {
    /// Bind a catalog, session, config and the two rule tables.
    pub fn new(
        catalog: &'a dyn TypeCatalog,
        session: &'a mut IntrospectionSession,
        config: &'a GeneratorConfig,
        host: &'a dyn MarshalRules,
        foreign: &'a dyn MarshalRules,
    ) -> Self {
        Self {
            catalog,
            session,
            config,
            host,
            foreign,
            report: NormalizationReport::default(),
        }
    }

    /// Discover and describe every operation the catalog offers.
    ///
    /// Operations the catalog cannot describe are recorded as unavailable.
    pub fn discover(&mut self) -> Result<Vec<RawOperation>> {
        let names = self.catalog.discover_operation_names(self.session)?;
        self.report.discovered = names.len();
        info!(count = names.len(), "Discovered operations.");

        let mut raw = Vec::with_capacity(names.len());
        for name in names {
            match self.catalog.describe_operation(self.session, &name)? {
                Some(operation) => raw.push(operation),
                None => {
                    warn!(operation = %name, "Operation unavailable in the installed library, skipping.");
                    self.report.skip(&name, SkipReason::Unavailable);
                }
            }
        }
        Ok(raw)
    }

    /// Discover, describe and normalize in one go.
    pub fn run(mut self) -> Result<NormalizedIr> {
        let raw = self.discover()?;
        self.normalize(raw)
    }

    /// Normalize raw operations, in the order given.
    pub fn normalize(mut self, raw_operations: Vec<RawOperation>) -> Result<NormalizedIr> {
        if self.report.discovered == 0 {
            self.report.discovered = raw_operations.len() + self.report.skipped.len();
        }

        let mut operations: Vec<Operation> = Vec::new();
        let mut identifiers: HashMap<String, String> = HashMap::new();

        for raw in raw_operations {
            let name = raw.name.clone();

            // Exclusion set first, then configured skips, then the generic rules
            if self.config.is_excluded(&name) {
                info!(operation = %name, "Excluding operation.");
                self.report.skip(&name, SkipReason::Excluded);
                continue;
            }
            let override_entry = self.config.override_for(&name).cloned().unwrap_or_default();
            if override_entry.skip_generation {
                info!(operation = %name, "Skipping operation (configured).");
                self.report.skip(&name, SkipReason::Configured);
                continue;
            }

            let mut arguments = Vec::with_capacity(raw.arguments.len() + 1);
            for raw_arg in &raw.arguments {
                if let Some(argument) = self.classify(&name, raw_arg)? {
                    arguments.push(argument);
                }
            }

            if let Some(param) = &override_entry.options_param {
                if arguments.iter().any(|a| &a.name == param) {
                    debug!(operation = %name, argument = %param, "Options argument already present.");
                } else {
                    arguments.push(self.options_argument(param));
                }
            }

            let mut operation = self.build_operation(&raw, arguments);
            operation.needs_custom_wrapper = override_entry.needs_custom_wrapper;

            if let Some(kept) = identifiers.get(&operation.identifier) {
                warn!(
                    operation = %name,
                    kept = %kept,
                    identifier = %operation.identifier,
                    "Skipping duplicate operation."
                );
                self.report.skip(
                    &name,
                    SkipReason::Duplicate {
                        kept: kept.clone(),
                    },
                );
                continue;
            }
            identifiers.insert(operation.identifier.clone(), name.clone());

            debug!(
                operation = %name,
                identifier = %operation.identifier,
                required = operation.required_inputs.len(),
                optional = operation.optional_inputs.len(),
                outputs = operation.outputs.len(),
                "Normalized operation."
            );
            operations.push(operation);
        }

        operations.sort_by(|a, b| a.name.cmp(&b.name));

        let referenced: BTreeSet<&str> = operations
            .iter()
            .flat_map(|op| &op.arguments)
            .filter_map(|arg| arg.enum_type.as_deref())
            .collect();
        let enums: Vec<EnumType> = self
            .session
            .enums()
            .filter(|e| referenced.contains(e.native_name.as_str()))
            .cloned()
            .collect();

        let image_formats = discover_image_formats(
            operations.iter().map(|op| op.name.as_str()),
            self.catalog,
            self.session,
        );
        let savers = discover_supported_savers(self.catalog, self.session);

        info!(
            discovered = self.report.discovered,
            normalized = operations.len(),
            skipped = self.report.filtered(),
            enums = enums.len(),
            "Normalization finished."
        );

        Ok(NormalizedIr {
            ir: GeneratorIr {
                operations,
                enums,
                image_formats,
                savers,
            },
            report: self.report,
        })
    }

    /// Classify one raw argument. `None` for slots that are never wrapped.
    fn classify(&mut self, operation: &str, raw: &RawArgument) -> Result<Option<Argument>> {
        if raw.flags & arg_flags::DEPRECATED != 0 {
            debug!(operation = %operation, argument = %raw.name, "Skipping deprecated argument.");
            return Ok(None);
        }

        let is_input = raw.flags & arg_flags::INPUT != 0;
        let is_output = raw.flags & arg_flags::OUTPUT != 0;
        if !is_input && !is_output {
            debug!(operation = %operation, argument = %raw.name, "Skipping argument with no direction.");
            return Ok(None);
        }

        let mut category = ArgCategory::from_native(&raw.type_name, raw.kind).ok_or_else(|| {
            GenError::Classification {
                operation: operation.to_string(),
                argument: raw.name.clone(),
                type_name: raw.type_name.clone(),
            }
        })?;

        let mut enum_type = None;
        if category.is_enum_like() {
            if self.ensure_enum(&raw.type_name, raw.kind == RawTypeKind::Flags)? {
                enum_type = Some(raw.type_name.clone());
            } else {
                warn!(
                    operation = %operation,
                    argument = %raw.name,
                    enum_type = %raw.type_name,
                    "Enum type not found, treating argument as int."
                );
                category = ArgCategory::Int;
            }
        }

        let direction = if is_output {
            Direction::Output
        } else {
            Direction::Input
        };
        let resolved = enum_type.as_deref().and_then(|e| self.session.enum_type(e));
        let target_type = self.host.type_name(category, direction, resolved);
        let foreign_type = self.foreign.type_name(category, direction, resolved);

        let vector = (is_output && category.is_array()).then(|| VectorShape {
            length_name: raw
                .length_slot
                .clone()
                .unwrap_or_else(|| format!("{}_n", raw.name)),
        });

        Ok(Some(Argument {
            name: raw.name.clone(),
            identifier: argument_identifier(&raw.name, |w| self.host.is_reserved(w)),
            native_type: raw.type_name.clone(),
            target_type,
            foreign_type,
            description: raw.description.clone(),
            required: raw.flags & arg_flags::REQUIRED != 0,
            is_input,
            is_output,
            flags: raw.flags,
            category,
            enum_type,
            vector,
            default: raw.default.clone(),
            synthetic: false,
        }))
    }

    /// Make sure an enum type is registered. `false` when the catalog does not know it.
    fn ensure_enum(&mut self, native_type: &str, is_flags: bool) -> Result<bool> {
        if self.session.enum_type(native_type).is_some() {
            return Ok(true);
        }
        if self.session.is_missing_enum(native_type) {
            return Ok(false);
        }

        let Some(raw_values) = self.catalog.describe_enum(self.session, native_type)? else {
            self.session.mark_missing_enum(native_type);
            return Ok(false);
        };

        let generated_name = enum_type_name(native_type);
        let mut seen_values = HashSet::new();
        let mut seen_symbols = HashSet::new();
        let mut values = Vec::with_capacity(raw_values.len());

        for raw in raw_values {
            if !seen_values.insert(raw.value) {
                info!(
                    enum_type = %native_type,
                    value = raw.value,
                    alias = %raw.name,
                    "Skipping enum alias."
                );
                continue;
            }

            let mut symbol = enum_value_symbol(&generated_name, &raw.name);
            if !seen_symbols.insert(symbol.clone()) {
                symbol = format!("{symbol}_{}", raw.value.unsigned_abs());
                seen_symbols.insert(symbol.clone());
            }

            values.push(EnumValue {
                generated_name: enum_constant(&generated_name, &symbol),
                symbol,
                native_name: raw.name,
                value: raw.value,
                nick: raw.nick,
            });
        }

        self.session.register_enum(EnumType {
            native_name: native_type.to_string(),
            generated_name,
            is_flags,
            values,
        })?;
        Ok(true)
    }

    fn options_argument(&self, name: &str) -> Argument {
        Argument {
            name: name.to_string(),
            identifier: argument_identifier(name, |w| self.host.is_reserved(w)),
            native_type: "gchararray".to_string(),
            target_type: self
                .host
                .type_name(ArgCategory::String, Direction::Input, None),
            foreign_type: self
                .foreign
                .type_name(ArgCategory::String, Direction::Input, None),
            description: "libvips option string, e.g. \"[shrink=2]\"".to_string(),
            required: false,
            is_input: true,
            is_output: false,
            flags: arg_flags::OPTIONAL_INPUT,
            category: ArgCategory::String,
            enum_type: None,
            vector: None,
            default: None,
            synthetic: true,
        }
    }

    fn build_operation(&self, raw: &RawOperation, arguments: Vec<Argument>) -> Operation {
        let category = raw
            .category
            .as_deref()
            .map_or_else(|| self.catalog.category(&raw.name), DocCategory::from_name);

        let mut required_inputs = Vec::new();
        let mut optional_inputs = Vec::new();
        let mut outputs = Vec::new();
        for arg in &arguments {
            match (arg.direction(), arg.required) {
                (Direction::Output, _) => outputs.push(arg.clone()),
                (Direction::Input, true) => required_inputs.push(arg.clone()),
                (Direction::Input, false) => optional_inputs.push(arg.clone()),
            }
        }

        let has_image_input = arguments.iter().any(|a| a.is_input && a.is_image());
        let has_image_output = outputs.iter().any(Argument::is_image);

        Operation {
            identifier: operation_identifier(&raw.name),
            name: raw.name.clone(),
            description: raw.description.clone(),
            flags: raw.flags,
            doc_url: doc_url(&raw.name, &category),
            category: category.as_str().to_string(),
            arguments,
            required_inputs,
            optional_inputs,
            outputs,
            has_image_input,
            has_image_output,
            needs_custom_wrapper: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, RawEnumValue};
    use crate::marshal::{CShimRules, GoRules};

    fn normalize(catalog: &MemoryCatalog, config: &GeneratorConfig) -> Result<NormalizedIr> {
        let mut session = IntrospectionSession::new();
        Normalizer::new(catalog, &mut session, config, &GoRules, &CShimRules).run()
    }

    fn image_op(name: &str) -> RawOperation {
        RawOperation::new(name, "test")
            .with_argument(RawArgument::new("in", "VipsImage", arg_flags::REQUIRED_INPUT))
            .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT))
    }

    #[test]
    fn test_deprecated_arguments_dropped() {
        let catalog = MemoryCatalog::new().with_operation(image_op("copy").with_argument(
            RawArgument::new("bands", "gint", arg_flags::OPTIONAL_INPUT | arg_flags::DEPRECATED),
        ));
        let ir = normalize(&catalog, &GeneratorConfig::empty()).unwrap().ir;
        assert_eq!(ir.operations[0].arguments.len(), 2);
    }

    #[test]
    fn test_missing_enum_degrades_to_int() {
        let catalog = MemoryCatalog::new().with_operation(image_op("embed").with_argument(
            RawArgument::new("extend", "VipsExtend", arg_flags::OPTIONAL_INPUT)
                .with_kind(RawTypeKind::Enum),
        ));
        let ir = normalize(&catalog, &GeneratorConfig::empty()).unwrap().ir;
        let extend = &ir.operations[0].optional_inputs[0];
        assert_eq!(extend.category, ArgCategory::Int);
        assert_eq!(extend.target_type, "int");
        assert!(extend.enum_type.is_none());
        assert!(ir.enums.is_empty());
    }

    #[test]
    fn test_enum_alias_keeps_first() {
        let catalog = MemoryCatalog::new()
            .with_operation(image_op("cast").with_argument(
                RawArgument::new("format", "VipsBandFormat", arg_flags::REQUIRED_INPUT)
                    .with_kind(RawTypeKind::Enum),
            ))
            .with_enum(
                "VipsBandFormat",
                vec![
                    RawEnumValue::new("VIPS_FORMAT_UCHAR", 0, "uchar"),
                    RawEnumValue::new("VIPS_FORMAT_CHAR", 1, "char"),
                    RawEnumValue::new("VIPS_FORMAT_BYTE", 1, "byte"),
                ],
            );
        let ir = normalize(&catalog, &GeneratorConfig::empty()).unwrap().ir;
        let format = ir.enum_type("VipsBandFormat").unwrap();
        assert_eq!(format.generated_name, "BandFormat");
        let names: Vec<_> = format.values.iter().map(|v| v.native_name.as_str()).collect();
        assert_eq!(names, vec!["VIPS_FORMAT_UCHAR", "VIPS_FORMAT_CHAR"]);
        assert_eq!(ir.operations[0].required_inputs[1].target_type, "BandFormat");
        assert_eq!(ir.operations[0].required_inputs[1].foreign_type, "VipsBandFormat");
    }

    #[test]
    fn test_options_param_synthesized() {
        let catalog = MemoryCatalog::new().with_operation(
            RawOperation::new("jpegload", "load jpeg")
                .with_argument(RawArgument::new("filename", "gchararray", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT)),
        );
        let ir = normalize(&catalog, &GeneratorConfig::builtin()).unwrap().ir;
        let op = &ir.operations[0];
        assert!(op.needs_custom_wrapper);
        let synthetic = op.optional_inputs.last().unwrap();
        assert!(synthetic.synthetic);
        assert_eq!(synthetic.identifier, "optionString");
        assert_eq!(op.category, "foreign_load");
    }

    #[test]
    fn test_operation_without_inputs_is_kept() {
        let catalog = MemoryCatalog::new().with_operation(
            RawOperation::new("black", "make a black image")
                .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT)),
        );
        let normalized = normalize(&catalog, &GeneratorConfig::empty()).unwrap();
        assert!(normalized.report.skipped.is_empty());
        let black = normalized.ir.operation("black").unwrap();
        assert!(black.required_inputs.is_empty());
        assert!(black.has_image_output);
    }

    #[test]
    fn test_array_outputs_are_vectors() {
        let catalog = MemoryCatalog::new().with_operation(
            RawOperation::new("getpoint", "read a point")
                .with_argument(RawArgument::new("in", "VipsImage", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new(
                    "out_array",
                    "VipsArrayDouble",
                    arg_flags::REQUIRED_OUTPUT,
                )),
        );
        let ir = normalize(&catalog, &GeneratorConfig::empty()).unwrap().ir;
        let out = &ir.operations[0].outputs[0];
        assert_eq!(
            out.vector,
            Some(VectorShape {
                length_name: "out_array_n".into()
            })
        );
        assert_eq!(out.identifier, "outArray");
    }

    #[test]
    fn test_unavailable_recorded() {
        let catalog = MemoryCatalog::new()
            .with_operation(image_op("copy"))
            .with_unavailable("heifload");
        let normalized = normalize(&catalog, &GeneratorConfig::empty()).unwrap();
        assert_eq!(normalized.report.discovered, 2);
        assert_eq!(
            normalized.report.reason_for("heifload"),
            Some(&SkipReason::Unavailable)
        );
    }
}
