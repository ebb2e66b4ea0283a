//! Receiver surface over the managed `Image` type.
//!
//! Operations whose first required input is an image become methods with that image as
//! the receiver; image-producing operations with no image input become `New<Op>`
//! constructors. Both delegate to the host wrapper.

use super::code::{GoFunction, Stmt};
use super::plan::{EmissionShape, OperationPlan, ResolvedArgument};
use crate::ir::naming::image_type_symbol;
use crate::ir::{ArgCategory, ImageFormatInfo, format_tag};
use crate::marshal::MarshalRules;

const UNKNOWN_FORMAT: &str = "ImageTypeUnknown";

/// Method or constructor for an operation, `None` when it gets no receiver surface.
pub(super) fn receiver_function(
    plan: &OperationPlan<'_>,
    host: &dyn MarshalRules,
    formats: &[ImageFormatInfo],
) -> Option<GoFunction> {
    let op = plan.operation();
    if op.needs_custom_wrapper {
        return None;
    }
    if op.first_input_is_image() {
        Some(method(plan, host))
    } else if !op.has_image_input && op.has_image_output {
        Some(constructor(plan, host, formats))
    } else {
        None
    }
}

/// Declaration and wrapper argument for a required input.
fn parameter(arg: &ResolvedArgument<'_>, host: &dyn MarshalRules) -> (String, String) {
    let id = &arg.argument.identifier;
    match host.managed_type(arg.argument, id) {
        Some(managed) => (format!("{id} {}", managed.type_name), managed.to_native),
        None => (
            arg.host
                .declaration
                .clone()
                .unwrap_or_else(|| format!("{id} {}", arg.argument.target_type)),
            id.clone(),
        ),
    }
}

/// Result types, error-path zeros and success values for outputs handed back unchanged
/// or rewrapped.
struct Returned {
    types: Vec<String>,
    zeros: Vec<String>,
    values: Vec<String>,
    rewrapped: bool,
}

fn returned(outputs: &[&ResolvedArgument<'_>], host: &dyn MarshalRules) -> Returned {
    let mut returned = Returned {
        types: Vec::new(),
        zeros: Vec::new(),
        values: Vec::new(),
        rewrapped: false,
    };
    for arg in outputs {
        let id = &arg.argument.identifier;
        if let Some(managed) = host.managed_type(arg.argument, id) {
            returned.types.push(managed.type_name);
            returned.zeros.push("nil".to_string());
            returned.values.push(managed.from_native);
            returned.rewrapped = true;
        } else {
            returned.types.push(arg.argument.target_type.clone());
            returned.zeros.push(host.zero_value(arg.argument));
            returned.values.push(id.clone());
        }
    }
    returned
}

fn with_error(mut items: Vec<String>, last: &str) -> String {
    items.push(last.to_string());
    items.join(", ")
}

fn locals(outputs: &[&ResolvedArgument<'_>]) -> String {
    let mut names: Vec<String> = outputs
        .iter()
        .map(|a| a.argument.identifier.clone())
        .collect();
    names.push("err".to_string());
    names.join(", ")
}

fn error_check(zeros: Vec<String>) -> Stmt {
    Stmt::Block {
        head: "if err != nil".to_string(),
        body: vec![Stmt::line(format!("return {}", with_error(zeros, "err")))],
        else_body: None,
    }
}

fn method(plan: &OperationPlan<'_>, host: &dyn MarshalRules) -> GoFunction {
    let op = plan.operation();

    let mut params = Vec::new();
    let mut call_args = vec!["r.image".to_string()];
    for arg in plan
        .arguments()
        .iter()
        .filter(|a| a.is_required_input())
        .skip(1)
    {
        let (declaration, value) = parameter(arg, host);
        params.push(declaration);
        call_args.push(value);
    }
    if op.has_options() {
        params.push(format!("options *{}", plan.options_type()));
        call_args.push("options".to_string());
    }
    let call = format!("{}({})", plan.wrapper_name(), call_args.join(", "));

    let outputs: Vec<&ResolvedArgument<'_>> =
        plan.arguments().iter().filter(|a| a.is_required_output()).collect();
    let primary = (plan.shape() == EmissionShape::ImageProducing)
        .then(|| outputs.iter().position(|a| a.argument.is_image()))
        .flatten();

    let (results, body) = if let Some(primary) = primary {
        let extras: Vec<&ResolvedArgument<'_>> = outputs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != primary)
            .map(|(_, a)| *a)
            .collect();
        let returned = returned(&extras, host);
        let body = vec![
            Stmt::line(format!("{} := {call}", locals(&outputs))),
            error_check(returned.zeros),
            Stmt::line(format!(
                "r.setImage({})",
                outputs[primary].argument.identifier
            )),
            Stmt::line(format!("return {}", with_error(returned.values, "nil"))),
        ];
        (with_error_type(returned.types), body)
    } else {
        let returned = returned(&outputs, host);
        let body = if returned.rewrapped {
            vec![
                Stmt::line(format!("{} := {call}", locals(&outputs))),
                error_check(returned.zeros),
                Stmt::line(format!("return {}", with_error(returned.values, "nil"))),
            ]
        } else {
            vec![Stmt::line(format!("return {call}"))]
        };
        (with_error_type(returned.types), body)
    };

    GoFunction {
        doc: plan.doc_lines(&op.identifier),
        receiver: Some("r *Image".to_string()),
        name: op.identifier.clone(),
        params,
        results,
        body,
    }
}

fn constructor(
    plan: &OperationPlan<'_>,
    host: &dyn MarshalRules,
    formats: &[ImageFormatInfo],
) -> GoFunction {
    let op = plan.operation();
    let name = format!("New{}", op.identifier);

    let required: Vec<&ResolvedArgument<'_>> = plan
        .arguments()
        .iter()
        .filter(|a| a.is_required_input())
        .collect();
    let mut params = Vec::new();
    let mut call_args = Vec::new();
    for arg in &required {
        let (declaration, value) = parameter(arg, host);
        params.push(declaration);
        call_args.push(value);
    }
    if op.has_options() {
        params.push(format!("options *{}", plan.options_type()));
        call_args.push("options".to_string());
    }
    let call = format!("{}({})", plan.wrapper_name(), call_args.join(", "));

    let format = format_tag(&op.name)
        .filter(|tag| formats.iter().any(|f| f.tag == *tag))
        .map_or_else(|| UNKNOWN_FORMAT.to_string(), image_type_symbol);
    let buffer = required
        .iter()
        .find(|a| a.argument.category == ArgCategory::Blob)
        .map_or_else(|| "nil".to_string(), |a| a.argument.identifier.clone());

    let outputs: Vec<&ResolvedArgument<'_>> =
        plan.arguments().iter().filter(|a| a.is_required_output()).collect();
    let primary = outputs
        .iter()
        .position(|a| a.argument.is_image())
        .unwrap_or_default();
    let extras: Vec<&ResolvedArgument<'_>> = outputs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != primary)
        .map(|(_, a)| *a)
        .collect();
    let returned = returned(&extras, host);

    let mut zeros = vec!["nil".to_string()];
    zeros.extend(returned.zeros);
    let mut values = vec![format!(
        "newImageRef({}, {format}, {buffer})",
        outputs
            .get(primary)
            .map_or("out", |a| a.argument.identifier.as_str())
    )];
    values.extend(returned.values);
    let mut results = vec!["*Image".to_string()];
    results.extend(returned.types);

    GoFunction {
        doc: plan.doc_lines(&name),
        receiver: None,
        name,
        params,
        results: with_error_type(results),
        body: vec![
            Stmt::line(format!("{} := {call}", locals(&outputs))),
            error_check(zeros),
            Stmt::line(format!("return {}", with_error(values, "nil"))),
        ],
    }
}

fn with_error_type(mut types: Vec<String>) -> Vec<String> {
    types.push("error".to_string());
    types
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, RawArgument, RawOperation, arg_flags};
    use crate::config::GeneratorConfig;
    use crate::emit::code::Emit;
    use crate::ir::{GeneratorIr, Normalizer};
    use crate::marshal::{CShimRules, GoRules};
    use crate::session::IntrospectionSession;

    fn receiver(operation: RawOperation) -> Option<String> {
        let catalog = MemoryCatalog::new().with_operation(operation);
        let mut session = IntrospectionSession::new();
        let ir: GeneratorIr = Normalizer::new(
            &catalog,
            &mut session,
            &GeneratorConfig::empty(),
            &GoRules,
            &CShimRules,
        )
        .run()
        .unwrap()
        .ir;
        let mut plan = OperationPlan::new(&ir.operations[0]);
        plan.resolve(&GoRules, &CShimRules).unwrap();
        receiver_function(&plan, &GoRules, &ir.image_formats).map(|f| f.emit())
    }

    #[test]
    fn test_image_method_replaces_receiver() {
        let code = receiver(
            RawOperation::new("insert", "insert image @sub into @main at @x, @y")
                .with_argument(RawArgument::new("main", "VipsImage", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("sub", "VipsImage", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT))
                .with_argument(RawArgument::new("x", "gint", arg_flags::REQUIRED_INPUT)),
        )
        .unwrap();

        assert!(code.contains("func (r *Image) Insert(sub *Image, x int) error {"));
        assert!(code.contains("\tout, err := vipsgenInsert(r.image, imageHandle(sub), x)\n"));
        assert!(code.contains("\t\treturn err\n"));
        assert!(code.contains("\tr.setImage(out)\n\treturn nil\n"));
    }

    #[test]
    fn test_value_method_returns_wrapper_directly() {
        let code = receiver(
            RawOperation::new("avg", "find image average")
                .with_argument(RawArgument::new("in", "VipsImage", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "gdouble", arg_flags::REQUIRED_OUTPUT)),
        )
        .unwrap();
        assert_eq!(
            code,
            "// Avg find image average\nfunc (r *Image) Avg() (float64, error) {\n\treturn vipsgenAvg(r.image)\n}\n"
        );
    }

    #[test]
    fn test_constructor_for_buffer_loader() {
        let code = receiver(
            RawOperation::new("pngload_buffer", "load png from buffer")
                .with_argument(RawArgument::new("buffer", "VipsBlob", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT)),
        )
        .unwrap();
        assert!(code.contains("func NewPngloadBuffer(buffer []byte) (*Image, error) {"));
        assert!(code.contains("\t\treturn nil, err\n"));
        assert!(code.contains("\treturn newImageRef(out, ImageTypePng, buffer), nil\n"));
    }

    #[test]
    fn test_constructor_converts_image_arrays() {
        let code = receiver(
            RawOperation::new("bandjoin", "bandwise join a set of images")
                .with_argument(RawArgument::new("in", "VipsArrayImage", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "VipsImage", arg_flags::REQUIRED_OUTPUT)),
        )
        .unwrap();
        assert!(code.contains("func NewBandjoin(in []*Image) (*Image, error) {"));
        assert!(code.contains("vipsgenBandjoin(convertImagesToVipsImages(in))"));
        assert!(code.contains("newImageRef(out, ImageTypeUnknown, nil)"));
    }

    #[test]
    fn test_no_surface_without_image() {
        let code = receiver(
            RawOperation::new("sum_values", "sum numbers")
                .with_argument(RawArgument::new("in", "VipsArrayDouble", arg_flags::REQUIRED_INPUT))
                .with_argument(RawArgument::new("out", "gdouble", arg_flags::REQUIRED_OUTPUT)),
        );
        assert!(code.is_none());
    }
}
