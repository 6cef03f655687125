//! Property tests for a2e-lang
//!
//! Random workflows and literals checked against the invariants the pipeline
//! promises: printed values parse back, compilation is deterministic, and
//! decompiled output recompiles to the same bytes.
//!
mod common;
use a2e_lang::prelude::*;
use proptest::prelude::*;

fn arb_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-1_000_000i64..1_000_000).prop_map(|n| n as f64),
        (-4_000i64..4_000).prop_map(|n| n as f64 / 4.0),
    ]
}

fn arb_path() -> impl Strategy<Value = Path> {
    "/[a-z]{1,5}(/[a-z0-9_]{1,5}){0,2}".prop_map(Path::new)
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        "[ -~]{0,12}".prop_map(Value::String),
        arb_number().prop_map(Value::Number),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
        arb_path().prop_map(Value::Path),
        "[a-z][a-z0-9-]{0,8}".prop_map(Value::Credential),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z][a-z ]{0,5}", inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(Value::String),
        arb_number().prop_map(Value::Number),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
        arb_path().prop_map(Value::Path),
    ]
}

/// A `where`/`if` condition whose operand fits its operator, printed as source.
fn arb_condition() -> impl Strategy<Value = String> {
    let operand = prop_oneof![
        (prop_oneof![Just("=="), Just("!=")], arb_scalar()).prop_map(|(op, v)| format!("{} {}", op, v)),
        (
            prop_oneof![Just(">"), Just("<"), Just(">="), Just("<=")],
            prop_oneof![
                arb_number().prop_map(Value::Number),
                "[a-z]{0,6}".prop_map(Value::String),
            ],
        )
            .prop_map(|(op, v)| format!("{} {}", op, v)),
        (
            prop_oneof![Just("startsWith"), Just("endsWith")],
            "[a-z/]{0,6}".prop_map(Value::String),
        )
            .prop_map(|(op, v)| format!("{} {}", op, v)),
        arb_scalar().prop_map(|v| format!("contains {}", v)),
        prop::collection::vec("[a-z]{1,4}".prop_map(Value::String), 0..3)
            .prop_map(|items| format!("in {}", Value::Array(items))),
        prop_oneof![Just("exists".to_string()), Just("empty".to_string())],
    ];
    let field = prop_oneof![
        "field_[a-z]{0,4}".prop_map(String::from),
        arb_path().prop_map(|p| p.to_string()),
    ];
    (field, operand).prop_map(|(field, operand)| format!("{} {}", field, operand))
}

#[derive(Debug, Clone)]
enum Shape {
    Wait(u32, Vec<(String, Value)>),
    Filter(Vec<String>),
    Branch(String, bool),
    Loop,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (
            0u32..10_000,
            prop::collection::btree_map("k[a-z]{0,5}", arb_value(), 0..4),
        )
            .prop_map(|(duration, props)| Shape::Wait(duration, props.into_iter().collect())),
        prop::collection::vec(arb_condition(), 1..4).prop_map(Shape::Filter),
        (arb_condition(), any::<bool>()).prop_map(|(c, with_else)| Shape::Branch(c, with_else)),
        Just(Shape::Loop),
    ]
}

/// Waits, filters, branches and loops run in declaration order. Branches and
/// loop bodies point at two trailing `Wait` leaves outside the run order.
fn arb_workflow_source() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{0,10}", prop::collection::vec(arb_shape(), 1..6)).prop_map(
        |(name, shapes)| {
            let mut source = format!("workflow \"{}\"\n", name);
            let mut ids = Vec::new();
            for (i, shape) in shapes.into_iter().enumerate() {
                let id = format!("step_{}", i);
                match shape {
                    Shape::Wait(duration, props) => {
                        source.push_str(&format!("{} = Wait {{\n  duration: {}\n", id, duration));
                        for (key, value) in props {
                            source.push_str(&format!("  {}: {}\n", key, value));
                        }
                    }
                    Shape::Filter(conditions) => {
                        source.push_str(&format!(
                            "{} = FilterData {{\n  from /data/in_{}\n  where {}\n  -> /data/out_{}\n",
                            id,
                            i,
                            conditions.join(", "),
                            i
                        ));
                    }
                    Shape::Branch(condition, with_else) => {
                        source.push_str(&format!("{} = Conditional {{\n  if {} then leaf_a", id, condition));
                        if with_else {
                            source.push_str(" else leaf_b");
                        }
                        source.push('\n');
                    }
                    Shape::Loop => {
                        source.push_str(&format!(
                            "{} = Loop {{\n  from /items\n  operations: [leaf_a, leaf_b]\n  -> /looped_{}\n",
                            id, i
                        ));
                    }
                }
                source.push_str("}\n");
                ids.push(id);
            }
            source.push_str("leaf_a = Wait { duration: 1 }\nleaf_b = Wait { duration: 2 }\n");
            source.push_str(&format!("run: {}\n", ids.join(" -> ")));
            source
        },
    )
}

proptest! {
    #[test]
    fn test_value_display_parses_back(value in arb_value()) {
        let source = format!("workflow \"w\"\na = Wait {{ duration: 1, v: {} }}\nrun: a\n", value);
        let workflow = parse(&source).expect("Failed to parse printed value");
        prop_assert_eq!(workflow.operations[0].property("v"), Some(&value));
    }

    #[test]
    fn test_generated_workflows_validate(source in arb_workflow_source()) {
        let workflow = parse(&source).expect("Failed to parse generated workflow");
        prop_assert!(validate(&workflow, &Limits::default()).is_empty());
    }

    #[test]
    fn test_compilation_is_deterministic(source in arb_workflow_source()) {
        for format in [WireFormat::Legacy, WireFormat::Spec] {
            let first = compile_to_jsonl(&parse(&source).expect("parse"), format, false)
                .expect("Failed to compile");
            let second = compile_to_jsonl(&parse(&source).expect("parse"), format, false)
                .expect("Failed to compile");
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_decompiled_source_recompiles_identically(source in arb_workflow_source()) {
        let workflow = parse(&source).expect("Failed to parse generated workflow");
        for format in [WireFormat::Legacy, WireFormat::Spec] {
            let jsonl = compile_to_jsonl(&workflow, format, false).expect("Failed to compile");
            let regenerated = decompile(&jsonl).expect("Failed to decompile");
            let reparsed = parse(&regenerated).expect("Failed to parse decompiled source");
            prop_assert!(validate(&reparsed, &Limits::default()).is_empty());
            let recompiled = compile_to_jsonl(&reparsed, format, false).expect("Failed to recompile");
            prop_assert_eq!(jsonl, recompiled);
        }
    }
}
