//! Dry runs of a validated [`Workflow`] over a mock input document.
//!
//! The simulator walks the run order, evaluates branch and filter conditions,
//! iterates loop bodies, and records what each operation would have done.
//! Side-effecting kinds (`ApiCall`, `StoreData`, `Wait`) only record an
//! effect; nothing leaves the process and credentials are never resolved.
pub mod condition;
mod engine;

use crate::ast::Workflow;
use crate::data::MockInput;
use crate::trace::ExecutionTrace;
use crate::validator::Limits;
use engine::SimulationEngine;

pub struct Simulator {
    limits: Limits,
}

pub struct SimulatorBuilder {
    limits: Limits,
}

impl SimulatorBuilder {
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
        }
    }

    /// Only `max_depth` bounds a run; it caps branch and loop nesting.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn max_depth(mut self, max: usize) -> Self {
        self.limits.max_depth = Some(max);
        self
    }

    pub fn build(self) -> Simulator {
        Simulator {
            limits: self.limits,
        }
    }
}

impl Default for SimulatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        SimulatorBuilder::new().build()
    }

    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::new()
    }

    pub fn simulate(&self, workflow: &Workflow, input: &MockInput) -> ExecutionTrace {
        let mut data = input.clone().into_data_space();
        let entries = SimulationEngine::new(workflow, &self.limits).run(&mut data);
        tracing::debug!(
            workflow = %workflow.name,
            entries = entries.len(),
            "simulated workflow"
        );
        ExecutionTrace {
            workflow: workflow.name.clone(),
            entries,
            data: data.into_document(),
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulates with the given limits.
pub fn simulate(workflow: &Workflow, input: &MockInput, limits: &Limits) -> ExecutionTrace {
    Simulator::builder().limits(*limits).build().simulate(workflow, input)
}
