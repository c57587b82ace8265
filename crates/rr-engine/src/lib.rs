// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rr-engine: command execution, single-shot Workflow orchestration, DAG
//! resolution, and multi-node task dispatch (§4.5-§4.7).

pub mod dag;
pub mod executor;
pub mod task_engine;
pub mod workflow;

pub use dag::{resolve, PlanNode};
pub use executor::{CommandResult, Executor, OutputLine};
pub use task_engine::{RepeatReport, TaskEngine, TaskEngineContext, TaskOutcome};
pub use workflow::{PhaseOutcome, StepOutcome, StepsReport, Workflow, WorkflowOptions, WorkflowReport};
