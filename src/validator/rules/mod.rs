//! The built-in validation rules, one per file.
mod complexity;
mod cycles;
mod duplicate_ids;
mod kinds;
mod operators;
mod paths;
mod references;

pub use complexity::ComplexityRule;
pub use cycles::CycleRule;
pub use duplicate_ids::DuplicateIdRule;
pub use kinds::KindRule;
pub use operators::OperatorRule;
pub use paths::PathRule;
pub use references::ReferenceRule;

use super::ValidationRule;

/// Built-in rules in the order their findings are reported.
pub fn default_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(DuplicateIdRule),
        Box::new(KindRule),
        Box::new(ReferenceRule),
        Box::new(PathRule),
        Box::new(OperatorRule),
        Box::new(CycleRule),
        Box::new(ComplexityRule),
    ]
}
