//! FILENAME: core/step-engine/src/pipeline.rs
//! PURPOSE: Runs an ordered list of steps against a working table.
//! CONTEXT: Convenience for callers that do not keep their own session loop.
//! The output table of a step (when it returns one) becomes the input of the
//! next. The first failing step stops the run.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use table::Table;

use crate::definition::StepType;
use crate::error::ValidationError;
use crate::result::{StepExtras, StepResult};

/// One `{step_type, config}` entry, as the session layer stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub step_type: StepType,
    pub config: JsonValue,
}

impl PipelineStep {
    pub fn new(step_type: StepType, config: JsonValue) -> Self {
        PipelineStep { step_type, config }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

/// Final working table plus every step's result, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub table: Table,
    pub results: Vec<StepResult>,
}

impl Pipeline {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Pipeline { steps }
    }

    pub fn push(mut self, step_type: StepType, config: JsonValue) -> Self {
        self.steps.push(PipelineStep::new(step_type, config));
        self
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Executes every step. Errors carry the failing `step_index`.
    pub fn run(&self, table: &Table, extras: &StepExtras) -> Result<PipelineOutput, ValidationError> {
        let mut current = table.clone();
        let mut results = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let result = crate::execute(step.step_type, &current, &step.config, extras)
                .map_err(|e| e.with_detail("step_index", index))?;
            if let Some(next) = &result.table {
                current = next.clone();
            }
            results.push(result);
        }

        Ok(PipelineOutput {
            table: current,
            results,
        })
    }
}
