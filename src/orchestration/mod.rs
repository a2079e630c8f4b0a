//! Planning and execution of work items.
//!
//! The [`Planner`] turns dependency-annotated items into phases, and the
//! [`Orchestrator`] runs those phases against registered [`Worker`]s.
//! [`Pipeline`] strings decomposition, planning and execution together.

mod dry_run;
mod executor;
mod pipeline;
mod planner;
mod registry;
mod report;
mod worker;

pub use dry_run::DryRunWorker;
pub use executor::{
    ExecutionEvent, ExecutorConfig, Orchestrator, Statistics, DEFAULT_ITEM_TIMEOUT_SECS,
};
pub use pipeline::{Pipeline, PreparedRun, RunOutcome};
pub use planner::{CriticalPathMode, ExecutionPlan, Phase, Planner, PlannerConfig};
pub use registry::WorkerRegistry;
pub use report::{ExecutionReport, ExecutionSummary, TaskError, TaskResult};
pub use worker::{Worker, WorkerError};
