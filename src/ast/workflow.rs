use super::kind::OperationKind;
use super::span::Span;
use super::value::{Path, Value};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The top-level named operation graph parsed from one source file.
///
/// Operations are an arena in declaration order. Cross references are identifier
/// strings resolved through [`Workflow::index`], never direct links, so a
/// workflow with duplicate or dangling identifiers is still representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub operations: Vec<Operation>,
    pub run: RunSpec,
    pub span: Span,
}

impl Workflow {
    /// First declaration wins when identifiers repeat.
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Identifier lookup table. First declaration wins when identifiers repeat.
    pub fn index(&self) -> AHashMap<&str, &Operation> {
        let mut index = AHashMap::with_capacity(self.operations.len());
        for op in &self.operations {
            index.entry(op.id.as_str()).or_insert(op);
        }
        index
    }

    /// Successor edges of the control graph in a fixed order: run order,
    /// then each operation's branch targets, then its loop body.
    pub fn edges(&self) -> Vec<Edge<'_>> {
        let mut edges: Vec<Edge<'_>> = self
            .run
            .order
            .windows(2)
            .map(|pair| Edge {
                from: &pair[0].id,
                to: &pair[1].id,
                class: EdgeClass::RunOrder,
            })
            .collect();

        for op in &self.operations {
            if let Some(branch) = &op.branch {
                for target in &branch.if_true {
                    edges.push(Edge::new(&op.id, &target.id, EdgeClass::Then));
                }
                for target in branch.if_false.iter().flatten() {
                    edges.push(Edge::new(&op.id, &target.id, EdgeClass::Else));
                }
            }
            for target in op.body.iter().flatten() {
                edges.push(Edge::new(&op.id, &target.id, EdgeClass::LoopBody));
            }
        }
        edges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    RunOrder,
    Then,
    Else,
    LoopBody,
}

impl EdgeClass {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeClass::RunOrder => "next",
            EdgeClass::Then => "then",
            EdgeClass::Else => "else",
            EdgeClass::LoopBody => "loop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub class: EdgeClass,
}

impl<'a> Edge<'a> {
    fn new(from: &'a str, to: &'a str, class: EdgeClass) -> Self {
        Self { from, to, class }
    }
}

/// One typed node of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub kind: OperationKind,
    pub properties: Vec<Property>,
    pub input_path: Option<Path>,
    pub output_path: Option<Path>,
    pub conditions: Vec<Condition>,
    pub branch: Option<Branch>,
    /// Loop body, in execution order.
    pub body: Option<Vec<Reference>>,
    pub span: Span,
}

impl Operation {
    pub fn new(id: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: Vec::new(),
            input_path: None,
            output_path: None,
            conditions: Vec::new(),
            branch: None,
            body: None,
            span: Span::synthetic(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }

    /// Control operations nest other operations through a branch or a loop body.
    pub fn is_control(&self) -> bool {
        self.branch.is_some() || self.body.is_some()
    }

    /// Every operation identifier this operation refers to, in declaration order.
    pub fn references(&self) -> Vec<(ReferenceRole, &str, Span)> {
        let mut refs = Vec::new();
        if let Some(branch) = &self.branch {
            for r in &branch.if_true {
                refs.push((ReferenceRole::Then, r.id.as_str(), r.span));
            }
            for r in branch.if_false.iter().flatten() {
                refs.push((ReferenceRole::Else, r.id.as_str(), r.span));
            }
        }
        for r in self.body.iter().flatten() {
            refs.push((ReferenceRole::LoopBody, r.id.as_str(), r.span));
        }
        for (id, span) in self.merge_sources() {
            refs.push((ReferenceRole::MergeSource, id, span));
        }
        refs
    }

    /// `MergeData` sources given by operation identifier rather than path.
    pub fn merge_sources(&self) -> Vec<(&str, Span)> {
        if self.kind != OperationKind::MergeData {
            return Vec::new();
        }
        let Some(prop) = self.properties.iter().find(|p| p.key == "sources") else {
            return Vec::new();
        };
        match &prop.value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(|id| (id, prop.span)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRole {
    Then,
    Else,
    LoopBody,
    MergeSource,
}

impl fmt::Display for ReferenceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReferenceRole::Then => "then branch",
            ReferenceRole::Else => "else branch",
            ReferenceRole::LoopBody => "loop body",
            ReferenceRole::MergeSource => "merge sources",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Value,
    pub span: Span,
}

/// An operation identifier used at a reference site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub span: Span,
}

impl Reference {
    pub fn new(id: impl Into<String>, span: Span) -> Self {
        Self {
            id: id.into(),
            span,
        }
    }
}

/// The left-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRef {
    /// An absolute path into the data space.
    Path(Path),
    /// A field of the item under test.
    Field(String),
}

impl FieldRef {
    /// Field references are written on the wire as raw strings.
    pub fn from_wire(raw: &str) -> Self {
        if raw.starts_with('/') {
            FieldRef::Path(Path::new(raw))
        } else {
            FieldRef::Field(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldRef::Path(p) => p.as_str(),
            FieldRef::Field(name) => name,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "empty")]
    Empty,
}

impl Operator {
    pub const ALL: [Operator; 12] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Ge,
        Operator::Le,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Contains,
        Operator::In,
        Operator::Exists,
        Operator::Empty,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Contains => "contains",
            Operator::In => "in",
            Operator::Exists => "exists",
            Operator::Empty => "empty",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// `exists` and `empty` take no right-hand value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Exists | Operator::Empty)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: FieldRef,
    pub operator: Operator,
    pub value: Option<Value>,
    pub span: Span,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

/// `if <condition> then <targets> [else <targets>]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub condition: Condition,
    pub if_true: Vec<Reference>,
    pub if_false: Option<Vec<Reference>>,
    pub span: Span,
}

/// The declared execution order. Never empty once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub order: Vec<Reference>,
    pub span: Span,
}

impl RunSpec {
    pub fn root(&self) -> Option<&Reference> {
        self.order.first()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|r| r.id.as_str())
    }
}
