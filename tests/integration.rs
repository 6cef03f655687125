//! Integration tests for a2e-lang
//!
//! End-to-end runs of the whole pipeline: parse, validate, compile, simulate
//! and decompile.
//!
mod common;
use a2e_lang::prelude::*;
use common::*;
use serde_json::json;
use std::fs;

const ORDERS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/orders.a2e");
const ORDERS_INPUT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/orders.json");

/// Parse, validate, and compile only when there is nothing to report.
fn build(source: &str, format: WireFormat) -> std::result::Result<String, Vec<Finding>> {
    let workflow = parse(source).expect("Failed to parse workflow source");
    let findings = validate(&workflow, &Limits::default());
    if !findings.is_empty() {
        return Err(findings);
    }
    Ok(compile_to_jsonl(&workflow, format, false).expect("Failed to compile valid workflow"))
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_message_workflow_end_to_end() {
        let validator = Validator::builder()
            .with_custom_kind(KindSpec::new("Message").with_required(&["text"]))
            .build();
        let workflow = parse_ok(MESSAGE_SOURCE);
        assert!(validator.validate(&workflow).is_empty());

        let jsonl = compile_to_jsonl(&workflow, WireFormat::Spec, false).expect("Failed to compile");
        let lines: Vec<serde_json::Value> = jsonl
            .lines()
            .map(|l| serde_json::from_str(l).expect("each line is JSON"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], json!("operationUpdate"));
        assert_eq!(lines[0]["operationId"], json!("a"));
        assert_eq!(lines[1]["type"], json!("beginExecution"));
        assert_eq!(lines[1]["operationOrder"], json!(["a"]));
    }

    #[test]
    fn test_undefined_operation_blocks_compilation() {
        let result = build(
            "workflow \"w\"\na = Wait { duration: 1 }\nrun: a -> b\n",
            WireFormat::Spec,
        );
        let findings = result.expect_err("compilation must be refused");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnresolvedReference);
        assert_eq!(findings[0].identifiers, vec!["b".to_string()]);
    }

    #[test]
    fn test_cycle_blocks_compilation() {
        let source = r#"
            workflow "c"
            a = Conditional { if /go exists then b }
            b = Conditional { if /go exists then c }
            c = Conditional { if /go exists then a }
            run: a
        "#;
        let findings = build(source, WireFormat::Legacy).expect_err("compilation must be refused");
        assert_eq!(kinds_of(&findings), vec![FindingKind::CycleDetected]);
        assert_eq!(findings[0].identifiers, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_end_to_end() {
        let workflow = parse_valid(POINTS_SOURCE);

        let low = Simulator::new().simulate(&workflow, &MockInput::new(json!({"order": {"points": 50}})));
        assert_eq!(low.entries[0].status, TraceStatus::Skipped);

        let high = Simulator::new().simulate(&workflow, &MockInput::new(json!({"order": {"points": 150}})));
        assert_eq!(high.entries[0].status, TraceStatus::Ok);
        assert_eq!(high.data["passed"], json!({"points": 150}));
        assert_eq!(high.data["order"], high.data["passed"]);
    }

    #[test]
    fn test_fixture_pipeline() {
        let source = fs::read_to_string(ORDERS_PATH).expect("Failed to read fixture");
        let workflow = parse_valid(&source);
        assert_eq!(workflow.name, "order-digest");
        assert_eq!(workflow.operations.len(), 10);

        let input = MockInput::from_file(ORDERS_INPUT_PATH).expect("Failed to load mock input");
        let trace = simulate(&workflow, &input, &Limits::default());

        assert_eq!(
            trace.visited(),
            vec!["fetch", "large", "stamp", "any", "each", "combine", "post", "save"]
        );
        assert_eq!(trace.count(TraceStatus::Ok), 10);
        assert_eq!(trace.count(TraceStatus::Error), 0);

        let large = trace.entry("large").expect("large is traced");
        assert_eq!(large.note.as_deref(), Some("kept 2 of 4"));

        let each = trace.entry("each").expect("each is traced");
        assert_eq!(each.iterations.len(), 2);
        assert_eq!(each.iterations[1].item["id"], json!("o-4"));

        let digest = &trace.data["workflow"]["digest"];
        assert_eq!(digest[0].as_array().map(Vec::len), Some(2));
        assert_eq!(digest[1]["_simulated"], json!(true));

        let post = trace.entry("post").expect("post is traced");
        let effect = post.effect.as_ref().expect("post records an effect");
        assert_eq!(effect.parameters["body"]["text"], json!("/workflow/digest"));
        assert_eq!(
            post.produced_at("/workflow/posted").map(|v| v["method"].clone()),
            Some(json!("POST"))
        );

        let summary = trace.summary();
        assert!(summary.starts_with("Simulation of 'order-digest'\n"));
        assert!(summary.contains("  [ok] any (Conditional)\n    condition failed -> each\n"));
        assert!(summary.ends_with("10 ok, 0 skipped, 0 error\n"));
    }

    #[test]
    fn test_fixture_round_trip_validates() {
        let source = fs::read_to_string(ORDERS_PATH).expect("Failed to read fixture");
        for format in [WireFormat::Legacy, WireFormat::Spec] {
            let jsonl = build(&source, format).expect("fixture is valid");
            let regenerated = decompile(&jsonl).expect("Failed to decompile");
            let reparsed = parse(&regenerated).expect("decompiled source parses");
            assert!(validate(&reparsed, &Limits::default()).is_empty());

            let recompiled = compile_to_jsonl(&reparsed, format, false).expect("Failed to recompile");
            assert_eq!(jsonl, recompiled);
        }
    }

    #[test]
    fn test_formats_agree_on_operations_and_order() {
        let source = fs::read_to_string(ORDERS_PATH).expect("Failed to read fixture");
        let workflow = parse_valid(&source);

        let from_legacy = reconstruct(&compile_to_jsonl(&workflow, WireFormat::Legacy, false).expect("legacy"))
            .expect("legacy reconstructs");
        let from_spec = reconstruct(&compile_to_jsonl(&workflow, WireFormat::Spec, false).expect("spec"))
            .expect("spec reconstructs");

        assert_eq!(from_legacy.operations, from_spec.operations);
        assert_eq!(
            from_spec.run.ids().collect::<Vec<_>>(),
            workflow.run.ids().collect::<Vec<_>>()
        );
        assert_eq!(from_legacy.run.root().map(|r| r.id.as_str()), Some("fetch"));
    }

    #[test]
    fn test_compile_repeatedly_is_byte_identical() {
        let source = fs::read_to_string(ORDERS_PATH).expect("Failed to read fixture");
        let first = build(&source, WireFormat::Spec).expect("fixture is valid");
        for _ in 0..5 {
            assert_eq!(build(&source, WireFormat::Spec).expect("fixture is valid"), first);
        }
    }

    #[test]
    fn test_path_like_literal_simulates_the_same_after_round_trip() {
        let source = r#"
            workflow "routes"
            home = FilterData { from /pages where url == "/home" -> /home_pages }
            run: home
        "#;
        let mock = MockInput::new(json!({
            "pages": [{ "url": "/home" }, { "url": "/about" }],
            "home": "/about"
        }));
        let expected = json!([{ "url": "/home" }]);

        let original = parse_valid(source);
        let trace = simulate(&original, &mock, &Limits::default());
        assert_eq!(trace.data["home_pages"], expected);

        let jsonl = compile_to_jsonl(&original, WireFormat::Spec, false).expect("Failed to compile");
        let rebuilt = reconstruct(&jsonl).expect("Failed to reconstruct");
        assert_eq!(
            rebuilt.operations[0].conditions[0].value,
            Some(Value::Path(Path::new("/home")))
        );
        let trace = simulate(&rebuilt, &mock, &Limits::default());
        assert_eq!(trace.data["home_pages"], expected);
    }
}
