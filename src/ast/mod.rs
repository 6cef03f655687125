//! The workflow data model shared by every stage.
pub mod kind;
pub mod span;
pub mod value;
pub mod workflow;

pub use kind::*;
pub use span::*;
pub use value::*;
pub use workflow::*;
