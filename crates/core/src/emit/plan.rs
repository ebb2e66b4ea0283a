//! Per-operation emission: argument resolution and body construction.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::code::{CFunction, Emit, GoField, GoFunction, GoStruct, Stmt};
use super::receiver;
use crate::catalog::op_flags;
use crate::error::{GenError, Result};
use crate::ir::naming::{c_identifier, comment_text};
use crate::ir::{Argument, Direction, ImageFormatInfo, Operation};
use crate::marshal::{Fragments, MarshalRules, OptionField};

/// Name of the options aggregate parameter in host wrappers.
const OPTIONS: &str = "options";

/// Where an operation is in the emission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionState {
    /// Arguments classified by the normalizer.
    Classified,
    /// Every argument has host and foreign fragments.
    ArgumentsResolved,
    /// Wrapper, shim and receiver text built.
    BodyEmitted,
    /// Included in files written to disk.
    Written,
}

impl EmissionState {
    /// The only state reachable from this one.
    pub fn next(self) -> Option<Self> {
        match self {
            EmissionState::Classified => Some(EmissionState::ArgumentsResolved),
            EmissionState::ArgumentsResolved => Some(EmissionState::BodyEmitted),
            EmissionState::BodyEmitted => Some(EmissionState::Written),
            EmissionState::Written => None,
        }
    }
}

impl fmt::Display for EmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmissionState::Classified => "classified",
            EmissionState::ArgumentsResolved => "arguments_resolved",
            EmissionState::BodyEmitted => "body_emitted",
            EmissionState::Written => "written",
        };
        f.write_str(name)
    }
}

/// What the host wrapper returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionShape {
    /// A newly owned image handle, other required outputs, and an error.
    ImageProducing,
    /// Decoded output values and an error.
    ValueProducing,
    /// Only an error.
    ErrorOnly,
    /// Managed-image methods and constructors layered over the other shapes.
    Receiver,
}

impl EmissionShape {
    /// Wrapper shape for an operation.
    pub fn of(operation: &Operation) -> Self {
        let mut outputs = operation.required_outputs().peekable();
        if outputs.peek().is_none() {
            EmissionShape::ErrorOnly
        } else if operation.required_outputs().any(Argument::is_image) {
            EmissionShape::ImageProducing
        } else {
            EmissionShape::ValueProducing
        }
    }
}

/// One argument with its fragments on both sides of the call.
#[derive(Debug, Clone)]
pub struct ResolvedArgument<'ir> {
    /// The classified argument.
    pub argument: &'ir Argument,
    /// Host-side fragments.
    pub host: Fragments,
    /// Foreign-side fragments.
    pub foreign: Fragments,
    /// Foreign parameter name.
    pub foreign_name: String,
    /// Aggregate field, for optional inputs and outputs.
    pub option: Option<OptionField>,
}

impl ResolvedArgument<'_> {
    pub(super) fn is_required_input(&self) -> bool {
        self.argument.direction() == Direction::Input && self.argument.required
    }

    pub(super) fn is_optional_input(&self) -> bool {
        self.argument.direction() == Direction::Input && !self.argument.required
    }

    pub(super) fn is_required_output(&self) -> bool {
        self.argument.direction() == Direction::Output && self.argument.required
    }

    pub(super) fn is_optional_output(&self) -> bool {
        self.argument.direction() == Direction::Output && !self.argument.required
    }

    /// Travels through the options aggregate.
    pub(super) fn is_optional(&self) -> bool {
        !self.argument.required
    }
}

/// Text produced for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationBody {
    /// Options aggregate declaration.
    pub options_struct: Option<String>,
    /// `Default<Op>Options` constructor filled with native defaults.
    pub default_options: Option<String>,
    /// Host wrapper function.
    pub wrapper: String,
    /// Foreign shim declarations for the header.
    pub prototypes: Vec<String>,
    /// Foreign shim definitions.
    pub shims: String,
    /// Receiver method or constructor.
    pub receiver: Option<String>,
}

/// Emission plan for one operation.
#[derive(Debug, Clone)]
pub struct OperationPlan<'ir> {
    operation: &'ir Operation,
    shape: EmissionShape,
    state: EmissionState,
    arguments: Vec<ResolvedArgument<'ir>>,
    body: Option<OperationBody>,
}

impl<'ir> OperationPlan<'ir> {
    /// Plan for a normalized operation.
    pub fn new(operation: &'ir Operation) -> Self {
        Self {
            operation,
            shape: EmissionShape::of(operation),
            state: EmissionState::Classified,
            arguments: Vec::new(),
            body: None,
        }
    }

    /// The operation being emitted.
    pub fn operation(&self) -> &'ir Operation {
        self.operation
    }

    /// Wrapper shape.
    pub fn shape(&self) -> EmissionShape {
        self.shape
    }

    /// Current state.
    pub fn state(&self) -> EmissionState {
        self.state
    }

    /// Resolved arguments, empty before [`OperationPlan::resolve`].
    pub fn arguments(&self) -> &[ResolvedArgument<'ir>] {
        &self.arguments
    }

    /// Emitted text, `None` before [`OperationPlan::emit_body`].
    pub fn body(&self) -> Option<&OperationBody> {
        self.body.as_ref()
    }

    /// Wrapper shape, plus [`EmissionShape::Receiver`] when a receiver surface was emitted.
    pub fn shapes(&self) -> Vec<EmissionShape> {
        let mut shapes = vec![self.shape];
        if self.body.as_ref().is_some_and(|b| b.receiver.is_some()) {
            shapes.push(EmissionShape::Receiver);
        }
        shapes
    }

    fn advance(&mut self, to: EmissionState) -> Result<()> {
        self.expect_state(to)?;
        self.state = to;
        Ok(())
    }

    fn expect_state(&self, to: EmissionState) -> Result<()> {
        if self.state.next() == Some(to) {
            Ok(())
        } else {
            Err(GenError::Internal(format!(
                "operation '{}' cannot move from {} to {}",
                self.operation.name, self.state, to
            )))
        }
    }

    /// Ask both rule tables for every argument.
    pub fn resolve(&mut self, host: &dyn MarshalRules, foreign: &dyn MarshalRules) -> Result<()> {
        self.expect_state(EmissionState::ArgumentsResolved)?;

        let operation = self.operation;
        let mut arguments = Vec::with_capacity(operation.arguments.len());
        for argument in &operation.arguments {
            let option = (!argument.required).then(|| host.option_field(argument, OPTIONS));
            let host_value = match &option {
                Some(field) if argument.direction() == Direction::Input => field.value.clone(),
                _ => argument.identifier.clone(),
            };
            let foreign_name = c_identifier(&argument.name);

            let marshal_error = |source| GenError::Marshal {
                operation: operation.name.clone(),
                argument: argument.name.clone(),
                source,
            };
            let host_fragments = host.rule(argument, &host_value).map_err(marshal_error)?;
            let foreign_fragments = foreign.rule(argument, &foreign_name).map_err(marshal_error)?;

            arguments.push(ResolvedArgument {
                argument,
                host: host_fragments,
                foreign: foreign_fragments,
                foreign_name,
                option,
            });
        }

        self.arguments = arguments;
        self.advance(EmissionState::ArgumentsResolved)
    }

    /// Build wrapper, shim and receiver text from the resolved arguments.
    pub fn emit_body(
        &mut self,
        host: &dyn MarshalRules,
        foreign: &dyn MarshalRules,
        formats: &[ImageFormatInfo],
    ) -> Result<()> {
        self.expect_state(EmissionState::BodyEmitted)?;

        let options_struct = self.options_struct().map(|s| s.emit());
        let default_options = self.default_options(host).map(|f| f.emit());
        let wrapper = self.go_wrapper(host).emit();

        let shims = self.c_shims(foreign);
        let prototypes = shims
            .iter()
            .filter(|f| !f.is_static)
            .map(CFunction::prototype)
            .collect();
        let shims = shims
            .iter()
            .map(Emit::emit)
            .collect::<Vec<_>>()
            .join("\n");

        let receiver = receiver::receiver_function(self, host, formats).map(|f| f.emit());
        if receiver.is_none() {
            debug!(operation = %self.operation.name, "No receiver surface for operation.");
        }

        self.body = Some(OperationBody {
            options_struct,
            default_options,
            wrapper,
            prototypes,
            shims,
            receiver,
        });
        self.advance(EmissionState::BodyEmitted)
    }

    /// Record that the body reached disk.
    pub fn mark_written(&mut self) -> Result<()> {
        self.advance(EmissionState::Written)
    }

    // =========================================================================
    // Host side
    // =========================================================================

    /// Name of the options aggregate type.
    pub fn options_type(&self) -> String {
        format!("{}Options", self.operation.identifier)
    }

    /// Host wrapper function name.
    pub fn wrapper_name(&self) -> String {
        format!("vipsgen{}", self.operation.identifier)
    }

    fn options_struct(&self) -> Option<GoStruct> {
        if !self.operation.has_options() {
            return None;
        }
        let name = self.options_type();
        let fields = self
            .arguments
            .iter()
            .filter_map(|arg| {
                arg.option.as_ref().map(|field| GoField {
                    name: field.name.clone(),
                    type_name: field.type_name.clone(),
                    doc: Some(comment_text(&arg.argument.description)),
                })
            })
            .collect();
        Some(GoStruct {
            doc: vec![
                format!("{name} optional arguments for vips_{}", self.operation.name),
                format!(
                    "Zero-valued inputs are passed as given; start from Default{name} for the libvips defaults."
                ),
            ],
            name,
            fields,
        })
    }

    fn default_options(&self, host: &dyn MarshalRules) -> Option<GoFunction> {
        if !self.operation.has_options() {
            return None;
        }
        let type_name = self.options_type();
        let name = format!("Default{type_name}");

        let fields: Vec<String> = self
            .arguments
            .iter()
            .filter(|a| a.is_optional_input())
            .filter_map(|a| {
                let field = a.option.as_ref()?;
                let literal = host.default_literal(a.argument, a.argument.default.as_ref()?)?;
                Some(format!("\t{}: {literal},", field.name))
            })
            .collect();
        let value = if fields.is_empty() {
            format!("return &{type_name}{{}}")
        } else {
            format!("return &{type_name}{{\n{}\n}}", fields.join("\n"))
        };

        Some(GoFunction {
            doc: vec![format!(
                "{name} creates default value for vips_{} optional arguments",
                self.operation.name
            )],
            receiver: None,
            name,
            params: Vec::new(),
            results: vec![format!("*{type_name}")],
            body: vec![Stmt::line(value)],
        })
    }

    pub(super) fn doc_lines(&self, name: &str) -> Vec<String> {
        let mut doc = vec![format!("{name} {}", comment_text(&self.operation.description))];
        if self.operation.flags & op_flags::DEPRECATED != 0 {
            doc.push(String::new());
            doc.push(format!(
                "Deprecated: vips_{} is deprecated in libvips.",
                self.operation.name
            ));
        }
        doc
    }

    fn go_wrapper(&self, host: &dyn MarshalRules) -> GoFunction {
        let op = self.operation;
        let name = self.wrapper_name();
        let shim = format!("C.vipsgen_{}", c_identifier(&op.name));

        let mut params: Vec<String> = self
            .arguments
            .iter()
            .filter(|a| a.is_required_input())
            .filter_map(|a| a.host.declaration.clone())
            .collect();
        if op.has_options() {
            params.push(format!("{OPTIONS} *{}", self.options_type()));
        }

        let outputs: Vec<&ResolvedArgument<'_>> = self
            .arguments
            .iter()
            .filter(|a| a.is_required_output())
            .collect();
        let optional_outputs: Vec<&ResolvedArgument<'_>> = self
            .arguments
            .iter()
            .filter(|a| a.is_optional_output())
            .collect();
        let mut results: Vec<String> = outputs
            .iter()
            .map(|a| a.argument.target_type.clone())
            .collect();
        results.push("error".to_string());

        let mut body = Vec::new();
        for arg in self.arguments.iter().filter(|a| a.is_required_input()) {
            body.extend(Stmt::lines(arg.host.pre_call.iter().cloned()));
        }
        for arg in outputs.iter().chain(&optional_outputs) {
            body.extend(arg.host.declaration.clone().map(Stmt::Line));
        }

        // Native order for the required call, optionals appended in native order
        let required_calls: Vec<&str> = self
            .arguments
            .iter()
            .filter(|a| !a.is_optional())
            .map(|a| a.host.call.as_str())
            .collect();

        if op.has_options() {
            let mut option_body: Vec<Stmt> = self
                .arguments
                .iter()
                .filter(|a| a.is_optional_input())
                .flat_map(|a| Stmt::lines(a.host.pre_call.iter().cloned()))
                .collect();
            let all_calls: Vec<&str> = required_calls
                .iter()
                .copied()
                .chain(
                    self.arguments
                        .iter()
                        .filter(|a| a.is_optional())
                        .map(|a| a.host.call.as_str()),
                )
                .collect();
            option_body.push(Stmt::line(format!(
                "result = {shim}_with_options({})",
                all_calls.join(", ")
            )));

            body.push(Stmt::line("var result C.int"));
            body.push(Stmt::Block {
                head: format!("if {OPTIONS} != nil"),
                body: option_body,
                else_body: Some(vec![Stmt::line(format!(
                    "result = {shim}({})",
                    required_calls.join(", ")
                ))]),
            });
        } else {
            body.push(Stmt::line(format!(
                "result := {shim}({})",
                required_calls.join(", ")
            )));
        }

        let error_value = outputs
            .iter()
            .find(|a| a.argument.is_image())
            .map_or_else(
                || "handleVipsError()".to_string(),
                |a| format!("handleImageError({})", a.argument.identifier),
            );
        let mut error_return: Vec<String> =
            outputs.iter().map(|a| host.zero_value(a.argument)).collect();
        error_return.push(error_value);
        body.push(Stmt::Block {
            head: "if result != 0".to_string(),
            body: vec![Stmt::line(format!("return {}", error_return.join(", ")))],
            else_body: None,
        });

        for arg in &outputs {
            body.extend(Stmt::lines(arg.host.post_call.iter().cloned()));
        }
        if !optional_outputs.is_empty() {
            let mut store = Vec::new();
            for arg in &optional_outputs {
                store.extend(Stmt::lines(arg.host.post_call.iter().cloned()));
                store.extend(
                    arg.option
                        .as_ref()
                        .and_then(|field| field.write_back.clone())
                        .map(Stmt::Line),
                );
            }
            body.push(Stmt::Block {
                head: format!("if {OPTIONS} != nil"),
                body: store,
                else_body: None,
            });
        }
        let mut values: Vec<String> = outputs
            .iter()
            .map(|a| {
                a.host
                    .result
                    .clone()
                    .unwrap_or_else(|| a.argument.identifier.clone())
            })
            .collect();
        values.push("nil".to_string());
        body.push(Stmt::line(format!("return {}", values.join(", "))));

        GoFunction {
            doc: self.doc_lines(&name),
            receiver: None,
            name,
            params,
            results,
            body,
        }
    }

    // =========================================================================
    // Foreign side
    // =========================================================================

    fn c_shims(&self, foreign: &dyn MarshalRules) -> Vec<CFunction> {
        let op = self.operation;
        let base = format!("vipsgen_{}", c_identifier(&op.name));
        let quoted = format!("\"{}\"", op.name);

        let required: Vec<&ResolvedArgument<'_>> =
            self.arguments.iter().filter(|a| !a.is_optional()).collect();
        let optional: Vec<&ResolvedArgument<'_>> =
            self.arguments.iter().filter(|a| a.is_optional()).collect();

        let mut shims = Vec::new();

        let mut call: Vec<String> = vec![quoted.clone()];
        call.extend(required.iter().map(|a| a.foreign.call.clone()));
        call.push("NULL".to_string());
        shims.push(CFunction {
            is_static: false,
            return_type: "int".to_string(),
            name: base.clone(),
            params: declarations(&required),
            body: call_body(&required, &format!("vips_call({})", call.join(", "))),
        });

        if optional.is_empty() {
            return shims;
        }

        let split = optional.iter().find(|a| a.argument.synthetic);
        let pairs: Vec<String> = optional
            .iter()
            .filter(|a| !a.argument.synthetic)
            .map(|a| format!("\"{}\", {}", a.argument.name, a.foreign.call))
            .collect();

        let with_options_call = if let Some(option_string) = split {
            let helper = self.split_helper(foreign, &base, &required);
            let mut args = vec![option_string.foreign.call.clone()];
            args.extend(required.iter().map(|a| a.foreign.call.clone()));
            args.extend(pairs);
            args.push("NULL".to_string());
            let call = format!("{}({})", helper.name, args.join(", "));
            shims.push(helper);
            call
        } else {
            let mut args = call;
            args.pop();
            args.extend(pairs);
            args.push("NULL".to_string());
            format!("vips_call({})", args.join(", "))
        };

        let all: Vec<&ResolvedArgument<'_>> =
            required.iter().chain(optional.iter()).copied().collect();
        shims.push(CFunction {
            is_static: false,
            return_type: "int".to_string(),
            name: format!("{base}_with_options"),
            params: declarations(&all),
            body: call_body(&all, &with_options_call),
        });

        shims
    }

    /// Variadic helper applying a libvips option string before the optional pairs.
    fn split_helper(
        &self,
        foreign: &dyn MarshalRules,
        base: &str,
        required: &[&ResolvedArgument<'_>],
    ) -> CFunction {
        let mut params = vec!["const char* option_string".to_string()];
        let mut names = Vec::with_capacity(required.len());
        for arg in required {
            let name = arg.foreign_name.clone();
            params.push(
                foreign
                    .call_declaration(arg.argument, &name)
                    .unwrap_or_else(|| format!("{} {name}", arg.argument.foreign_type)),
            );
            names.push(name);
        }
        params.push("...".to_string());

        let last = names
            .last()
            .cloned()
            .unwrap_or_else(|| "option_string".to_string());
        let mut call_args = vec![
            format!("\"{}\"", self.operation.name),
            "option_string".to_string(),
            "optional".to_string(),
        ];
        call_args.extend(names);

        CFunction {
            is_static: true,
            return_type: "int".to_string(),
            name: format!("{base}_split"),
            params,
            body: vec![
                Stmt::line("va_list optional;"),
                Stmt::line(format!("va_start(optional, {last});")),
                Stmt::line(format!(
                    "int result = vips_call_split_option_string({});",
                    call_args.join(", ")
                )),
                Stmt::line("va_end(optional);"),
                Stmt::line("return result;"),
            ],
        }
    }
}

fn declarations(arguments: &[&ResolvedArgument<'_>]) -> Vec<String> {
    arguments
        .iter()
        .filter_map(|a| a.foreign.declaration.clone())
        .collect()
}

fn call_body(arguments: &[&ResolvedArgument<'_>], call: &str) -> Vec<Stmt> {
    let pre: Vec<Stmt> = arguments
        .iter()
        .flat_map(|a| Stmt::lines(a.foreign.pre_call.iter().cloned()))
        .collect();
    let post: Vec<Stmt> = arguments
        .iter()
        .flat_map(|a| Stmt::lines(a.foreign.post_call.iter().cloned()))
        .collect();

    if pre.is_empty() && post.is_empty() {
        return vec![Stmt::line(format!("return {call};"))];
    }

    let mut body = pre;
    body.push(Stmt::line(format!("int result = {call};")));
    body.extend(post);
    body.push(Stmt::line("return result;"));
    body
}
