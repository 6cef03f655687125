//! Mock input documents and the path-addressed data space the simulator reads and writes.
mod model;

pub use model::{DataSpace, MockInput};
