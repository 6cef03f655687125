//! Semantic validation of a parsed [`Workflow`].
//!
//! Every rule runs against the full graph and appends to one shared list of
//! [`Finding`]s; nothing short-circuits. An empty list means the workflow may
//! be compiled or simulated. Rules run in registration order and each rule
//! walks operations in declaration order, so output is reproducible.
mod limits;
pub mod rules;

pub use limits::Limits;

use crate::ast::{KindRegistry, KindSpec, Operation, Span, Workflow};
use ahash::AHashMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FindingKind {
    DuplicateId,
    UnresolvedReference,
    CycleDetected,
    MissingRequiredField,
    UnknownKind,
    InvalidPath,
    IncompatibleOperator,
    ComplexityExceeded,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One structural or semantic defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
    pub span: Option<Span>,
    /// The operation the finding is attached to, if any.
    pub operation: Option<String>,
    /// The identifiers the finding is about: the unresolved id, the ids on a cycle, ...
    pub identifiers: Vec<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            operation: None,
            identifiers: Vec::new(),
        }
    }

    /// Synthetic spans are dropped.
    pub fn at(mut self, span: Span) -> Self {
        self.span = (!span.is_synthetic()).then_some(span);
        self
    }

    pub fn in_operation(mut self, op: &Operation) -> Self {
        self.operation = Some(op.id.clone());
        self
    }

    pub fn naming<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = ids.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "error at {}: {} [{}]", span, self.message, self.kind),
            None => write!(f, "error: {} [{}]", self.message, self.kind),
        }
    }
}

/// Everything a rule may look at.
pub struct ValidationContext<'a> {
    pub workflow: &'a Workflow,
    pub registry: &'a KindRegistry,
    pub limits: &'a Limits,
    index: AHashMap<&'a str, &'a Operation>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(workflow: &'a Workflow, registry: &'a KindRegistry, limits: &'a Limits) -> Self {
        Self {
            workflow,
            registry,
            limits,
            index: workflow.index(),
        }
    }

    pub fn operation(&self, id: &str) -> Option<&'a Operation> {
        self.index.get(id).copied()
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn index(&self) -> &AHashMap<&'a str, &'a Operation> {
        &self.index
    }
}

/// One independent check over the whole workflow.
pub trait ValidationRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn check(&self, cx: &ValidationContext<'_>, findings: &mut Vec<Finding>);
}

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    registry: KindRegistry,
    limits: Limits,
}

pub struct ValidatorBuilder {
    rules: Vec<Box<dyn ValidationRule>>,
    registry: KindRegistry,
    limits: Limits,
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        Self {
            rules: rules::default_rules(),
            registry: KindRegistry::builtin(),
            limits: Limits::default(),
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn max_operations(mut self, max: usize) -> Self {
        self.limits.max_operations = Some(max);
        self
    }

    pub fn max_depth(mut self, max: usize) -> Self {
        self.limits.max_depth = Some(max);
        self
    }

    pub fn max_conditions(mut self, max: usize) -> Self {
        self.limits.max_conditions_per_operation = Some(max);
        self
    }

    /// Accepts a plugin operation kind.
    pub fn with_custom_kind(mut self, spec: KindSpec) -> Self {
        self.registry.register(spec);
        self
    }

    /// Appends a rule after the built-in ones.
    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn build(self) -> Validator {
        Validator {
            rules: self.rules,
            registry: self.registry,
            limits: self.limits,
        }
    }
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        ValidatorBuilder::new().build()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::new()
    }

    pub fn validate(&self, workflow: &Workflow) -> Vec<Finding> {
        let cx = ValidationContext::new(workflow, &self.registry, &self.limits);
        let mut findings = Vec::new();
        for rule in self.rules() {
            tracing::trace!(rule = rule.id(), "running validation rule");
            rule.check(&cx, &mut findings);
        }
        tracing::debug!(
            workflow = %workflow.name,
            findings = findings.len(),
            "validated workflow"
        );
        findings
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn ValidationRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates with the built-in kinds and the given limits.
pub fn validate(workflow: &Workflow, limits: &Limits) -> Vec<Finding> {
    Validator::builder().limits(*limits).build().validate(workflow)
}
