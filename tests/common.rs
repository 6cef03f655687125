//! Common test utilities: workflow sources and mock input documents.
use a2e_lang::prelude::*;

/// The smallest complete workflow: one custom `Message` operation.
#[allow(dead_code)]
pub const MESSAGE_SOURCE: &str = r#"
workflow "w"

a = Message { text: "hi" }

run: a
"#;

/// Fetch users, keep the active ones, notify and store them.
#[allow(dead_code)]
pub const USERS_SOURCE: &str = r#"
# Sync active users to storage
workflow "user-sync"

fetch = ApiCall {
  method: "GET"
  url: "https://api.example.com/users"
  headers: { Authorization: credential("api-token"), "Content-Type": "application/json" }
  -> /workflow/users
}

active = FilterData {
  from /workflow/users
  where status == "active", points > 100
  -> /workflow/active
}

check = Conditional {
  if /workflow/active exists then store else pause
}

store = StoreData {
  from /workflow/active
  storage: "localStorage"
  key: "active-users"
}

pause = Wait { duration: 1000 }

run: fetch -> active -> check
"#;

/// A loop whose body formats every element of `/workflow/items`.
#[allow(dead_code)]
pub const LOOP_SOURCE: &str = r#"
workflow "each"

each = Loop {
  from /workflow/items
  operations: [label]
  -> /workflow/labels
}

label = FormatText {
  from /workflow/items
  format: "{name}"
  -> /workflow/label
}

run: each
"#;

/// Filters a single record against `points > 100`.
#[allow(dead_code)]
pub const POINTS_SOURCE: &str = r#"
workflow "points"

gate = FilterData {
  from /order
  where points > 100
  -> /passed
}

run: gate
"#;

#[allow(dead_code)]
pub const USERS_INPUT: &str = r#"{
  "workflow": {
    "users": [
      { "name": "ada", "status": "active", "points": 150 },
      { "name": "bob", "status": "inactive", "points": 300 },
      { "name": "cy", "status": "active", "points": 20 }
    ]
  }
}"#;

/// Parses a source that the test expects to be well formed.
#[allow(dead_code)]
pub fn parse_ok(source: &str) -> Workflow {
    parse(source).expect("Failed to parse workflow source")
}

/// Parses and asserts the validator has nothing to report.
#[allow(dead_code)]
pub fn parse_valid(source: &str) -> Workflow {
    let workflow = parse_ok(source);
    let findings = Validator::new().validate(&workflow);
    assert!(findings.is_empty(), "unexpected findings: {:#?}", findings);
    workflow
}

#[allow(dead_code)]
pub fn kinds_of(findings: &[Finding]) -> Vec<FindingKind> {
    findings.iter().map(|f| f.kind).collect()
}
