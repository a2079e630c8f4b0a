//! Simulated workers for dry runs.

use crate::core::item::WorkItem;
use crate::core::role::Role;
use crate::orchestration::worker::{Worker, WorkerError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Simulates work by sleeping in proportion to the item's estimate.
///
/// Used by the CLI to exercise a plan without real workers.
#[derive(Debug, Clone)]
pub struct DryRunWorker {
    id: String,
    role: Role,
    per_hour: Duration,
    fail: bool,
}

impl DryRunWorker {
    pub fn new(role: Role) -> Self {
        Self {
            id: format!("dry-run-{role}"),
            role,
            per_hour: Duration::from_millis(10),
            fail: false,
        }
    }

    /// Simulated time per estimated hour of work.
    pub fn with_time_per_hour(mut self, per_hour: Duration) -> Self {
        self.per_hour = per_hour;
        self
    }

    /// Make every execution fail after its simulated work.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// One worker per role.
    pub fn full_team() -> Vec<DryRunWorker> {
        Role::ALL.iter().map(|role| DryRunWorker::new(*role)).collect()
    }
}

#[async_trait]
impl Worker for DryRunWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    async fn execute(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, WorkerError> {
        let hours = item.own_hours().max(1);
        let work = self.per_hour * hours;
        debug!(worker = %self.id, item = %item.id.short(), ?work, "simulating work");

        tokio::select! {
            _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
            _ = tokio::time::sleep(work) => {}
        }

        if self.fail {
            return Err(WorkerError::failed(format!("simulated failure for {}", item.title)));
        }
        Ok(format!("{} finished {} ({}h)", self.id, item.title, hours))
    }
}
