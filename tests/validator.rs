//! Validator tests
//!
//! Every rule reports independently and the full finding set comes back in one call.
mod common;
use a2e_lang::ast::{Branch, FieldRef, Property, Reference, RunSpec};
use a2e_lang::validator::ValidationContext;
use a2e_lang::prelude::*;
use common::*;

const CHAIN_LENGTH: usize = 100_000;

fn wait_op(id: String) -> Operation {
    let mut op = Operation::new(id, OperationKind::Wait);
    op.properties.push(Property {
        key: "duration".to_string(),
        value: Value::Number(1.0),
        span: Span::synthetic(),
    });
    op
}

/// `if /flag exists then <target>`
fn conditional_op(id: String, target: String) -> Operation {
    let mut op = Operation::new(id, OperationKind::Conditional);
    op.branch = Some(Branch {
        condition: Condition {
            field: FieldRef::Path(Path::new("/flag")),
            operator: Operator::Exists,
            value: None,
            span: Span::synthetic(),
        },
        if_true: vec![Reference::new(target, Span::synthetic())],
        if_false: None,
        span: Span::synthetic(),
    });
    op
}

fn workflow_of(operations: Vec<Operation>, run: &[String]) -> Workflow {
    Workflow {
        name: "chain".to_string(),
        operations,
        run: RunSpec {
            order: run
                .iter()
                .map(|id| Reference::new(id.clone(), Span::synthetic()))
                .collect(),
            span: Span::synthetic(),
        },
        span: Span::synthetic(),
    }
}

/// Flags every `Wait`, to exercise custom rules.
struct NoWaitRule;

impl ValidationRule for NoWaitRule {
    fn id(&self) -> &'static str {
        "no-wait"
    }

    fn description(&self) -> &'static str {
        "Wait operations are not allowed"
    }

    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>) {
        for op in &cx.workflow.operations {
            if op.kind == OperationKind::Wait {
                findings.push(
                    Finding::new(FindingKind::ComplexityExceeded, format!("'{}' waits", op.id))
                        .at(op.span)
                        .in_operation(op),
                );
            }
        }
    }
}

#[cfg(test)]
mod validator_tests {
    use super::*;

    #[test]
    fn test_valid_workflow_has_no_findings() {
        parse_valid(USERS_SOURCE);
        parse_valid(LOOP_SOURCE);
        parse_valid(POINTS_SOURCE);
    }

    #[test]
    fn test_undefined_run_target() {
        let workflow = parse_ok("workflow \"w\"\na = Wait { duration: 1 }\nrun: a -> b\n");
        let findings = validate(&workflow, &Limits::default());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::UnresolvedReference);
        assert_eq!(findings[0].identifiers, vec!["b".to_string()]);
        assert_eq!(
            findings[0].to_string(),
            "error at line 3, col 11: Operation 'b' in the run order is not defined [UnresolvedReference]"
        );
    }

    #[test]
    fn test_undefined_branch_and_body_targets() {
        let source = r#"
            workflow "refs"
            c = Conditional { if /x exists then yes else no }
            l = Loop { from /items operations: [ghost] }
            yes = Wait { duration: 1 }
            run: c -> l
        "#;
        let findings = validate(&parse_ok(source), &Limits::default());

        assert_eq!(
            kinds_of(&findings),
            vec![FindingKind::UnresolvedReference, FindingKind::UnresolvedReference]
        );
        assert_eq!(
            findings[0].message,
            "Operation 'no' referenced in the else branch of 'c' is not defined"
        );
        assert_eq!(findings[0].operation.as_deref(), Some("c"));
        assert_eq!(findings[1].identifiers, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_duplicate_ids() {
        let source = "workflow \"d\"\na = Wait { duration: 1 }\na = Wait { duration: 2 }\nrun: a\n";
        let findings = validate(&parse_ok(source), &Limits::default());

        assert_eq!(kinds_of(&findings), vec![FindingKind::DuplicateId]);
        assert_eq!(
            findings[0].message,
            "Duplicate operation id 'a' (first declared at line 2, col 1)"
        );
        assert_eq!(findings[0].span.map(|s| s.line), Some(3));
    }

    #[test]
    fn test_cycle_reported_once() {
        let source = r#"
            workflow "loop-back"
            a = Conditional { if /x exists then b }
            b = Conditional { if /y exists then a }
            run: a
        "#;
        let findings = validate(&parse_ok(source), &Limits::default());

        assert_eq!(kinds_of(&findings), vec![FindingKind::CycleDetected]);
        assert_eq!(findings[0].message, "Cycle detected: a -> b -> a");
        assert_eq!(
            findings[0].identifiers,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_cycle_through_run_order() {
        let source = "workflow \"r\"\na = Wait { duration: 1 }\nb = Wait { duration: 1 }\nrun: a -> b -> a\n";
        let findings = validate(&parse_ok(source), &Limits::default());

        let cycles: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::CycleDetected)
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].identifiers, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_required_fields() {
        let source = "workflow \"m\"\nx = ApiCall { method: \"GET\" }\nf = FilterData { from /a -> /b }\nrun: x -> f\n";
        let findings = validate(&parse_ok(source), &Limits::default());

        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "ApiCall 'x' is missing required property 'url'",
                "ApiCall 'x' is missing an output path ('->')",
                "FilterData 'f' is missing filter conditions ('where')",
            ]
        );
        assert!(
            findings
                .iter()
                .all(|f| f.kind == FindingKind::MissingRequiredField)
        );
    }

    #[test]
    fn test_unknown_and_custom_kinds() {
        let workflow = parse_ok(MESSAGE_SOURCE);

        let findings = Validator::new().validate(&workflow);
        assert_eq!(kinds_of(&findings), vec![FindingKind::UnknownKind]);
        assert_eq!(findings[0].message, "Unknown operation kind 'Message' for 'a'");

        let validator = Validator::builder()
            .with_custom_kind(KindSpec::new("Message").with_required(&["text"]))
            .build();
        assert!(validator.validate(&workflow).is_empty());

        let bare = parse_ok("workflow \"w\"\na = Message {}\nrun: a\n");
        let findings = validator.validate(&bare);
        assert_eq!(kinds_of(&findings), vec![FindingKind::MissingRequiredField]);
    }

    #[test]
    fn test_invalid_paths() {
        let source = r#"
            workflow "p"
            f = FilterData { from /a//b where /c/ exists -> /ok }
            run: f
        "#;
        let findings = validate(&parse_ok(source), &Limits::default());

        assert_eq!(
            kinds_of(&findings),
            vec![FindingKind::InvalidPath, FindingKind::InvalidPath]
        );
        assert!(
            findings[0]
                .message
                .starts_with("Invalid path '/a//b' in input path of 'f'")
        );
        assert!(findings[1].message.starts_with("Invalid path '/c/' in condition of 'f'"));
    }

    #[test]
    fn test_incompatible_operators() {
        let source = r#"
            workflow "o"
            f = FilterData {
              from /items
              where name startsWith 5, count > true, token == credential("k"), tags in 3, age > /limits/age
              -> /out
            }
            run: f
        "#;
        let findings = validate(&parse_ok(source), &Limits::default());

        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Condition 'name startsWith 5' in 'f': 'startsWith' cannot be applied to a number value",
                "Condition 'count > true' in 'f': '>' cannot be applied to a boolean value",
                "Condition 'token == credential(\"k\")' in 'f': credentials cannot be compared",
                "Condition 'tags in 3' in 'f': 'in' cannot be applied to a number value",
            ]
        );
    }

    #[test]
    fn test_complexity_limits() {
        let workflow = parse_ok(USERS_SOURCE);

        let findings = Validator::builder()
            .max_operations(1)
            .max_conditions(1)
            .max_depth(0)
            .build()
            .validate(&workflow);
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Workflow has 5 operations; maximum allowed is 1",
                "Operation 'active' has 2 conditions; maximum allowed is 1",
                "Workflow reaches nesting depth 1 at 'check'; maximum allowed is 0",
            ]
        );
        assert!(
            findings
                .iter()
                .all(|f| f.kind == FindingKind::ComplexityExceeded)
        );

        let relaxed = Limits::default()
            .with_max_operations(5)
            .with_max_conditions(2)
            .with_max_depth(1);
        assert!(validate(&workflow, &relaxed).is_empty());
    }

    #[test]
    fn test_limits_from_json() {
        let limits = Limits::from_json(r#"{ "maxOperations": 3, "maxDepth": 2 }"#)
            .expect("Failed to parse limits");
        assert_eq!(limits.max_operations, Some(3));
        assert_eq!(limits.max_depth, Some(2));
        assert_eq!(limits.max_conditions_per_operation, None);

        assert!(Limits::from_json(r#"{ "maxOps": 3 }"#).is_err());
    }

    #[test]
    fn test_findings_are_collected_across_rules() {
        let source = r#"
            workflow "many"
            a = Wait { duration: 1 }
            a = Wait { duration: 2 }
            f = FilterData { from bad where x > "y" -> /out }
            g = Mystery {}
            run: a -> f -> g -> missing
        "#;
        // `from bad` is not a path, so build the defects the parser accepts.
        assert!(parse(source).is_err());

        let source = r#"
            workflow "many"
            a = Wait { duration: 1 }
            a = Wait { duration: 2 }
            f = FilterData { from /in// where x startsWith 1 -> /out }
            g = Mystery {}
            run: a -> f -> g -> missing
        "#;
        let findings = validate(&parse_ok(source), &Limits::default());
        assert_eq!(
            kinds_of(&findings),
            vec![
                FindingKind::DuplicateId,
                FindingKind::UnknownKind,
                FindingKind::UnresolvedReference,
                FindingKind::InvalidPath,
                FindingKind::IncompatibleOperator,
            ]
        );
    }

    #[test]
    fn test_custom_rule_runs_after_builtin_rules() {
        let validator = Validator::builder().with_rule(Box::new(NoWaitRule)).build();
        assert_eq!(
            validator.rules().map(|r| r.id()).collect::<Vec<_>>(),
            vec![
                "duplicate-id",
                "required-fields",
                "unresolved-reference",
                "invalid-path",
                "incompatible-operator",
                "cycle",
                "complexity",
                "no-wait"
            ]
        );

        let findings = validator.validate(&parse_ok(USERS_SOURCE));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "'pause' waits");
    }

    #[test]
    fn test_long_run_order_validates() {
        let ids: Vec<String> = (0..CHAIN_LENGTH).map(|i| format!("s{}", i)).collect();
        let operations = ids.iter().cloned().map(wait_op).collect();
        let workflow = workflow_of(operations, &ids);

        assert!(Validator::new().validate(&workflow).is_empty());
    }

    #[test]
    fn test_long_branch_cycle_is_reported_once() {
        let operations = (0..CHAIN_LENGTH)
            .map(|i| conditional_op(format!("c{}", i), format!("c{}", (i + 1) % CHAIN_LENGTH)))
            .collect();
        let workflow = workflow_of(operations, &["c0".to_string()]);

        let findings = Validator::new().validate(&workflow);
        assert_eq!(kinds_of(&findings), vec![FindingKind::CycleDetected]);
        assert!(findings[0].message.starts_with("Cycle detected: c0 -> c1 -> c2 -> "));
        assert!(findings[0].message.ends_with(" -> c99999 -> c0"));
    }

    #[test]
    fn test_long_branch_chain_depth() {
        let mut operations: Vec<Operation> = (0..CHAIN_LENGTH - 1)
            .map(|i| conditional_op(format!("c{}", i), format!("c{}", i + 1)))
            .collect();
        operations.push(wait_op(format!("c{}", CHAIN_LENGTH - 1)));
        let workflow = workflow_of(operations, &["c0".to_string()]);

        let findings = Validator::builder().max_depth(3).build().validate(&workflow);
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Workflow reaches nesting depth 99999 at 'c0'; maximum allowed is 3"]
        );
        assert!(Validator::new().validate(&workflow).is_empty());
    }
}
