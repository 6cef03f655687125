//! Unit tests for core a2e-lang types.
mod common;
use a2e_lang::ast::{EdgeClass, KindRegistry, Span, is_identifier};
use a2e_lang::graph::to_mermaid;
use a2e_lang::prelude::*;
use common::*;

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(-1.25)), "-1.25");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
    assert_eq!(format!("{}", Value::Null), "null");
    assert_eq!(
        format!("{}", Value::String("say \"hi\"\n".to_string())),
        r#""say \"hi\"\n""#
    );
    assert_eq!(
        format!("{}", Value::Credential("key".to_string())),
        r#"credential("key")"#
    );
    assert_eq!(format!("{}", Value::Object(Vec::new())), "{}");
    assert_eq!(
        format!(
            "{}",
            Value::Object(vec![
                ("plain".to_string(), Value::Number(1.0)),
                ("with space".to_string(), Value::Array(vec![Value::Null])),
            ])
        ),
        r#"{ plain: 1, "with space": [null] }"#
    );
}

#[test]
fn test_value_helpers() {
    let nested = Value::Array(vec![
        Value::Path(Path::new("/a")),
        Value::Object(vec![("k".to_string(), Value::Credential("c".to_string()))]),
    ]);
    assert!(nested.contains_credential());
    assert!(!nested.is_scalar());
    assert_eq!(nested.type_name(), "array");

    let mut paths = Vec::new();
    nested.for_each_path(&mut |p| paths.push(p.as_str().to_string()));
    assert_eq!(paths, vec!["/a".to_string()]);
}

#[test]
fn test_path_well_formed() {
    assert!(Path::new("/workflow/users").is_well_formed());
    assert!(!Path::new("workflow/users").is_well_formed());
    assert!(!Path::new("/").is_well_formed());
    assert!(!Path::new("/a//b").is_well_formed());
    assert!(!Path::new("/a/").is_well_formed());
    assert_eq!(
        Path::new("/a/b/c").segments().collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
}

#[test]
fn test_identifiers() {
    assert!(is_identifier("fetch_users2"));
    assert!(is_identifier("_private"));
    assert!(!is_identifier("2fast"));
    assert!(!is_identifier("kebab-case"));
    assert!(!is_identifier("null"));
    assert!(!is_identifier(""));
}

#[test]
fn test_span_display_and_join() {
    let start = Span::new(3, 5, 2);
    assert_eq!(start.to_string(), "line 3, col 5");
    assert_eq!(start.to(Span::new(3, 10, 4)), Span::new(3, 5, 9));
    assert!(Span::synthetic().is_synthetic());
    assert!(!start.is_synthetic());
}

#[test]
fn test_operation_kinds() {
    assert_eq!(OperationKind::BUILTIN.len(), 16);
    assert_eq!(OperationKind::from_name("ApiCall"), OperationKind::ApiCall);
    assert_eq!(
        OperationKind::from_name("Message"),
        OperationKind::Custom("Message".to_string())
    );
    assert_eq!(OperationKind::EncodeDecode.name(), "EncodeDecode");
    assert!(OperationKind::Wait.is_effect());
    assert!(!OperationKind::FilterData.is_effect());
    assert!(!OperationKind::Custom("X".to_string()).is_builtin());
}

#[test]
fn test_kind_registry() {
    let mut registry = KindRegistry::builtin();
    assert_eq!(registry.names().len(), 16);

    let api = registry.get("ApiCall").expect("ApiCall is built in");
    assert_eq!(api.required_properties, vec!["method", "url"]);
    assert!(api.requires_output);
    assert!(!api.requires_input);

    let store = registry.get("StoreData").expect("StoreData is built in");
    assert_eq!(store.required_properties, vec!["storage", "key"]);
    assert!(store.requires_input);

    assert!(!registry.contains("Notify"));
    let previous = registry.register(KindSpec::new("Notify").with_required(&["channel"]));
    assert!(previous.is_none());
    assert!(registry.contains("Notify"));
    assert_eq!(registry.names().len(), 17);
}

#[test]
fn test_operator_symbols() {
    for op in Operator::ALL {
        assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
    }
    assert_eq!(Operator::from_symbol("=~"), None);
    assert!(Operator::Exists.is_unary());
    assert!(Operator::Le.is_ordering());
    assert!(!Operator::In.is_ordering());
}

#[test]
fn test_workflow_edges() {
    let workflow = parse_ok(USERS_SOURCE);
    let edges: Vec<(&str, &str, EdgeClass)> = workflow
        .edges()
        .iter()
        .map(|e| (e.from, e.to, e.class))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("fetch", "active", EdgeClass::RunOrder),
            ("active", "check", EdgeClass::RunOrder),
            ("check", "store", EdgeClass::Then),
            ("check", "pause", EdgeClass::Else),
        ]
    );
}

#[test]
fn test_finding_display_without_span() {
    let finding = Finding::new(FindingKind::ComplexityExceeded, "too big");
    assert_eq!(finding.to_string(), "error: too big [ComplexityExceeded]");

    let finding = finding.at(Span::synthetic());
    assert!(finding.span.is_none());
}

#[test]
fn test_mermaid_graph() {
    let workflow = parse_ok(USERS_SOURCE);
    let graph = to_mermaid(&workflow);

    assert!(graph.starts_with("graph TD\n"));
    assert!(graph.contains("    fetch[/\"fetch: ApiCall\"/]\n"));
    assert!(graph.contains("    check{\"check: Conditional\"}\n"));
    assert!(graph.contains("    store[\"store: StoreData\"]\n"));
    assert!(graph.contains("    fetch -->|\"/workflow/users\"| active\n"));
    assert!(graph.contains("    active -->|\"/workflow/active\"| store\n"));
    assert!(graph.contains("    check -->|then| store\n"));
    assert!(graph.contains("    check -->|else| pause\n"));
    assert!(graph.contains("    fetch -.->|next| active\n"));
    assert!(graph.contains("    class check control\n"));
    assert!(graph.ends_with("    class fetch,store,pause effect\n"));

    let looped = to_mermaid(&parse_ok(LOOP_SOURCE));
    assert!(looped.contains("    each((\"each: Loop\"))\n"));
    assert!(looped.contains("    each -->|loop| label\n"));
}

#[test]
fn test_config_errors() {
    assert!(matches!(
        Limits::from_file("/nonexistent/limits.json"),
        Err(ConfigError::Io { .. })
    ));
    assert!(matches!(
        MockInput::from_json("{ not json"),
        Err(ConfigError::Json(_))
    ));
}
