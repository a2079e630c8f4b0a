//! Per-item results and the aggregated execution report.

use crate::core::item::{ItemId, ItemStatus};
use crate::core::role::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why an item did not complete.
///
/// These errors are recorded per item and never abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskError {
    #[error("no suitable worker for role {role}")]
    NoSuitableWorker { role: Role },

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("worker failed: {message}")]
    WorkerFailed { message: String },

    #[error("upstream item {upstream} did not complete")]
    UpstreamFailure { upstream: ItemId },

    #[error("decomposition failed: {reason}")]
    GeneratorFailed { reason: String },

    /// A composite item whose children did not all complete.
    #[error("subtree did not complete: {reason}")]
    Subtree { reason: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("worker panicked: {message}")]
    Panicked { message: String },

    #[error("item {0} is not part of the run")]
    UnknownItem(ItemId),
}

/// Outcome of a single work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub item_id: ItemId,
    /// Terminal status the item ended in.
    pub status: ItemStatus,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<TaskError>,
    pub duration_ms: u64,
    pub worker_id: Option<String>,
    pub role: Option<Role>,
}

impl TaskResult {
    fn new(item_id: ItemId, status: ItemStatus) -> Self {
        Self {
            item_id,
            status,
            success: status == ItemStatus::Completed,
            output: None,
            error: None,
            duration_ms: 0,
            worker_id: None,
            role: None,
        }
    }

    pub fn completed(item_id: ItemId, output: String) -> Self {
        let mut result = Self::new(item_id, ItemStatus::Completed);
        result.output = Some(output);
        result
    }

    pub fn failed(item_id: ItemId, error: TaskError) -> Self {
        Self::new(item_id, ItemStatus::Failed).with_error(error)
    }

    pub fn blocked(item_id: ItemId, error: TaskError) -> Self {
        Self::new(item_id, ItemStatus::Blocked).with_error(error)
    }

    pub fn skipped(item_id: ItemId) -> Self {
        Self::new(item_id, ItemStatus::Skipped).with_error(TaskError::Cancelled)
    }

    fn with_error(mut self, error: TaskError) -> Self {
        self.error = Some(error);
        self
    }

    /// Record which worker produced the result and how long it took.
    pub fn by_worker(mut self, worker_id: &str, role: Role, duration_ms: u64) -> Self {
        self.worker_id = Some(worker_id.to_string());
        self.role = Some(role);
        self.duration_ms = duration_ms;
        self
    }

    /// The upstream item this result was blocked by, if any.
    pub fn blocked_by(&self) -> Option<ItemId> {
        match &self.error {
            Some(TaskError::UpstreamFailure { upstream }) => Some(*upstream),
            _ => None,
        }
    }
}

/// Counts of items by terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.total += 1;
            match result.status {
                ItemStatus::Completed => summary.completed += 1,
                ItemStatus::Failed => summary.failed += 1,
                ItemStatus::Blocked => summary.blocked += 1,
                ItemStatus::Skipped => summary.skipped += 1,
                _ => {}
            }
        }
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.completed == self.total
    }
}

impl std::fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} items: {} completed, {} failed, {} blocked, {} skipped",
            self.total, self.completed, self.failed, self.blocked, self.skipped
        )
    }
}

/// Final report of one execution.
///
/// Every item of the plan has exactly one result with a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: HashMap<ItemId, TaskResult>,
    pub summary: ExecutionSummary,
    pub duration_ms: u64,
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn new(results: HashMap<ItemId, TaskResult>, duration_ms: u64, cancelled: bool) -> Self {
        let summary = ExecutionSummary::from_results(results.values());
        Self {
            results,
            summary,
            duration_ms,
            cancelled,
        }
    }

    /// Add or replace a result, keeping the summary current.
    pub fn insert(&mut self, result: TaskResult) {
        self.results.insert(result.item_id, result);
        self.summary = ExecutionSummary::from_results(self.results.values());
    }

    pub fn get(&self, id: &ItemId) -> Option<&TaskResult> {
        self.results.get(id)
    }

    pub fn status_of(&self, id: &ItemId) -> Option<ItemStatus> {
        self.results.get(id).map(|result| result.status)
    }

    /// Ids of items that ended with the given status.
    pub fn with_status(&self, status: ItemStatus) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .results
            .values()
            .filter(|result| result.status == status)
            .map(|result| result.item_id)
            .collect();
        ids.sort();
        ids
    }
}
