//! Registered workers and worker selection.

use crate::core::item::WorkItem;
use crate::core::role::Role;
use crate::orchestration::worker::Worker;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Ordered set of workers available to a run.
///
/// Selection is deterministic: workers are consulted in registration order.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: Vec<Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.push(worker);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, worker: impl Worker + 'static) -> Self {
        self.register(Arc::new(worker));
        self
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[Arc<dyn Worker>] {
        &self.workers
    }

    pub fn by_role(&self, role: Role) -> Vec<Arc<dyn Worker>> {
        self.workers
            .iter()
            .filter(|worker| worker.role() == role)
            .cloned()
            .collect()
    }

    /// Roles with at least one registered worker.
    pub fn roles(&self) -> BTreeSet<Role> {
        self.workers.iter().map(|worker| worker.role()).collect()
    }

    /// Pick the worker for `item`.
    ///
    /// The first worker whose `can_handle` accepts the item wins. Otherwise
    /// the first worker of the `fallback` role is used, if there is one.
    pub fn select(&self, item: &WorkItem, fallback: Option<Role>) -> Option<Arc<dyn Worker>> {
        self.workers
            .iter()
            .find(|worker| worker.can_handle(item))
            .or_else(|| {
                let fallback = fallback?;
                self.workers.iter().find(|worker| worker.role() == fallback)
            })
            .cloned()
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.workers
                    .iter()
                    .map(|worker| format!("{} ({})", worker.id(), worker.role())),
            )
            .finish()
    }
}
