//! Worker contract.
//!
//! Workers are the role-specialized executors that carry out a single work
//! item. Concrete behavior lives outside this crate; the orchestrator only
//! depends on this trait.

use crate::core::item::WorkItem;
use crate::core::role::Role;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a worker reports for the item it was given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("{0}")]
    Failed(String),

    /// The worker observed the cancellation signal and stopped early.
    #[error("cancelled")]
    Cancelled,
}

impl WorkerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A capability-bearing executor for work items.
///
/// Workers keep no state between calls that the orchestrator relies on, and
/// must tolerate concurrent `execute` calls for different items.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Identifier reported in task results.
    fn id(&self) -> &str;

    fn role(&self) -> Role;

    fn capabilities(&self) -> Vec<String> {
        self.role()
            .default_capabilities()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Fast check whether this worker should take `item`.
    fn can_handle(&self, item: &WorkItem) -> bool {
        item.required_role() == self.role()
    }

    /// Carry out the item, returning its output.
    ///
    /// `cancel` fires when the run is cancelled; honoring it is cooperative.
    async fn execute(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, WorkerError>;
}
