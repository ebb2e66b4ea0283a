//! Discovery against an installed libvips.
//!
//! Run with `cargo test -p vipsgen-live -- --ignored` on a machine with libvips.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use tracing_test::traced_test;
use vipsgen_core::catalog::{FormatRole, RawDefault, TypeCatalog, op_flags};
use vipsgen_core::{GeneratorConfig, IntrospectionSession, introspect};
use vipsgen_live::{LiveCatalog, LiveRuntime};

// One runtime per process, so every check lives in a single test.
#[test]
#[ignore = "requires libvips"]
#[traced_test]
fn test_live_discovery() {
    let runtime = LiveRuntime::init().unwrap();
    assert!(runtime.version().starts_with('8'));
    assert!(LiveRuntime::init().is_err());

    let catalog = LiveCatalog::new(&runtime);
    let mut session = IntrospectionSession::new();

    let names = catalog.discover_operation_names(&mut session).unwrap();
    assert!(names.iter().any(|n| n == "embed"));
    assert!(names.windows(2).all(|w| w[0] < w[1]));

    let embed = catalog
        .describe_operation(&mut session, "embed")
        .unwrap()
        .unwrap();
    let arg_names: Vec<_> = embed.arguments.iter().map(|a| a.name.as_str()).collect();
    assert!(arg_names.contains(&"in"));
    assert!(arg_names.contains(&"out"));
    let max = catalog
        .describe_operation(&mut session, "max")
        .unwrap()
        .unwrap();
    let size = max.arguments.iter().find(|a| a.name == "size").unwrap();
    assert_eq!(size.default, Some(RawDefault::Int(10)));

    assert!(
        catalog
            .describe_operation(&mut session, "no_such_operation")
            .unwrap()
            .is_none()
    );

    let extend = catalog
        .describe_enum(&mut session, "VipsExtend")
        .unwrap()
        .unwrap();
    assert!(extend.iter().any(|v| v.nick == "black"));
    assert!(catalog.describe_enum(&mut session, "NoSuchEnum").unwrap().is_none());

    assert!(catalog.format_exists(&mut session, "jpeg", FormatRole::Load));
    assert!(!catalog.format_exists(&mut session, "nosuchformat", FormatRole::Load));

    // Deprecated operations never reach describe, so none are reported unavailable
    for name in &names {
        let op = catalog.describe_operation(&mut session, name).unwrap().unwrap();
        assert_eq!(op.flags & op_flags::DEPRECATED, 0, "{name}");
    }

    let counters = session.counters();
    assert!(counters.types_visited >= counters.operations_discovered);
    assert!(logs_contain("Walked operation hierarchy."));

    let normalized = introspect(&catalog, &GeneratorConfig::builtin()).unwrap();
    assert!(normalized.ir.operations.iter().any(|op| op.name == "embed"));
    assert!(normalized.report.reason_for("embed").is_none());
    assert!(!logs_contain("Operation unavailable in the installed library"));
}
