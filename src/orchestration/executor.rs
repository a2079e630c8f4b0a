//! Phase-by-phase execution of a plan.
//!
//! Items of a phase run concurrently, each on its own tokio task with its own
//! timeout. A phase ends when every one of its items has settled, so a slow
//! item holds back the next phase but never a sibling. Failures are isolated:
//! they block the failed item's dependents and nothing else.

use crate::core::item::{ItemId, ItemStatus, WorkItem};
use crate::core::role::Role;
use crate::orchestration::planner::ExecutionPlan;
use crate::orchestration::registry::WorkerRegistry;
use crate::orchestration::report::{ExecutionReport, ExecutionSummary, TaskError, TaskResult};
use crate::orchestration::worker::{Worker, WorkerError};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time allowed for one item.
pub const DEFAULT_ITEM_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Time allowed for one worker call before the item fails.
    pub item_timeout: Duration,
    /// Role whose first worker takes items no other worker accepts.
    pub fallback_role: Option<Role>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            item_timeout: Duration::from_secs(DEFAULT_ITEM_TIMEOUT_SECS),
            fallback_role: Some(Role::Coordinator),
        }
    }
}

/// Progress notifications emitted while a plan executes.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PhaseStarted { index: usize, items: usize },
    /// An item was handed to a worker.
    ItemStarted { item_id: ItemId, worker_id: String },
    ItemCompleted { item_id: ItemId, duration_ms: u64 },
    ItemFailed { item_id: ItemId, error: TaskError },
    /// An item was not run because of an upstream or decomposition failure.
    ItemBlocked { item_id: ItemId, error: TaskError },
    ItemSkipped { item_id: ItemId },
    PhaseCompleted { index: usize },
    RunCompleted { summary: ExecutionSummary },
}

/// Snapshot of orchestrator activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_workers: usize,
    /// Items currently executing.
    pub active_tasks: usize,
    /// Items completed successfully since the orchestrator was created.
    pub completed_tasks: usize,
    /// Items dispatched per worker role.
    pub tasks_by_role: BTreeMap<Role, usize>,
}

#[derive(Debug, Default)]
struct Counters {
    active: usize,
    completed: usize,
    by_role: BTreeMap<Role, usize>,
}

/// An item handed to a worker, awaiting its outcome.
struct Dispatched {
    item_id: ItemId,
    worker_id: String,
    role: Role,
    started: Instant,
}

/// Runs [`ExecutionPlan`]s against a [`WorkerRegistry`].
pub struct Orchestrator {
    registry: WorkerRegistry,
    config: ExecutorConfig,
    cancel: CancellationToken,
    counters: Arc<Mutex<Counters>>,
    event_tx: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl Orchestrator {
    pub fn new(registry: WorkerRegistry, config: ExecutorConfig) -> Self {
        Self {
            registry,
            config,
            cancel: CancellationToken::new(),
            counters: Arc::new(Mutex::new(Counters::default())),
            event_tx: None,
        }
    }

    /// Emit [`ExecutionEvent`]s on `tx` while executing.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Token that cancels the run when triggered.
    ///
    /// Items not yet started are skipped; running workers see a child token
    /// fire. Cancellation is permanent for this orchestrator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        info!("cancelling run");
        self.cancel.cancel();
    }

    pub fn statistics(&self) -> Statistics {
        let counters = self.counters.lock();
        Statistics {
            total_workers: self.registry.len(),
            active_tasks: counters.active,
            completed_tasks: counters.completed,
            tasks_by_role: counters.by_role.clone(),
        }
    }

    /// Execute `plan`, updating the status of every planned item in `items`.
    ///
    /// Never fails as a whole: every planned item gets exactly one result.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        items: &mut HashMap<ItemId, WorkItem>,
    ) -> ExecutionReport {
        let started = Instant::now();
        let mut results: HashMap<ItemId, TaskResult> = HashMap::new();

        info!(
            phases = plan.phases.len(),
            items = plan.item_count(),
            workers = self.registry.len(),
            "executing plan"
        );

        for phase in &plan.phases {
            self.emit(ExecutionEvent::PhaseStarted {
                index: phase.index,
                items: phase.items.len(),
            });

            let mut dispatched = Vec::new();
            let mut handles = Vec::new();

            for id in &phase.items {
                let Some(item) = items.get_mut(id) else {
                    warn!(item = %id.short(), "planned item is missing");
                    self.record(&mut results, TaskResult::failed(*id, TaskError::UnknownItem(*id)));
                    continue;
                };

                if let Some(result) = settle_without_running(item, &results, &self.cancel) {
                    self.record(&mut results, result);
                    continue;
                }

                let Some(worker) = self.registry.select(item, self.config.fallback_role) else {
                    let error = TaskError::NoSuitableWorker {
                        role: item.required_role(),
                    };
                    warn!(item = %id.short(), %error, "no worker for item");
                    apply(item, ItemStatus::Failed, &error.to_string());
                    self.record(&mut results, TaskResult::failed(*id, error));
                    continue;
                };

                item.assigned_role = Some(worker.role());
                if item.status != ItemStatus::InProgress {
                    apply(item, ItemStatus::InProgress, "");
                }
                {
                    let mut counters = self.counters.lock();
                    counters.active += 1;
                    *counters.by_role.entry(worker.role()).or_insert(0) += 1;
                }

                debug!(item = %id.short(), worker = worker.id(), "dispatching");
                self.emit(ExecutionEvent::ItemStarted {
                    item_id: *id,
                    worker_id: worker.id().to_string(),
                });

                dispatched.push(Dispatched {
                    item_id: *id,
                    worker_id: worker.id().to_string(),
                    role: worker.role(),
                    started: Instant::now(),
                });
                handles.push(tokio::spawn(run_item(
                    worker,
                    item.clone(),
                    self.cancel.child_token(),
                    self.config.item_timeout,
                    Arc::clone(&self.counters),
                )));
            }

            let outcomes = join_all(handles).await;
            for (job, outcome) in dispatched.into_iter().zip(outcomes) {
                let result = match outcome {
                    Ok(result) => result,
                    Err(err) => {
                        let message = panic_message(err);
                        warn!(item = %job.item_id.short(), %message, "worker task died");
                        {
                            let mut counters = self.counters.lock();
                            counters.active = counters.active.saturating_sub(1);
                        }
                        TaskResult::failed(job.item_id, TaskError::Panicked { message }).by_worker(
                            &job.worker_id,
                            job.role,
                            elapsed_ms(job.started),
                        )
                    }
                };

                if let Some(item) = items.get_mut(&job.item_id) {
                    let reason = result
                        .error
                        .as_ref()
                        .map(|error| error.to_string())
                        .unwrap_or_default();
                    apply(item, result.status, &reason);
                }
                self.record(&mut results, result);
            }

            self.emit(ExecutionEvent::PhaseCompleted { index: phase.index });
        }

        let report = ExecutionReport::new(results, elapsed_ms(started), self.cancel.is_cancelled());
        info!(summary = %report.summary, duration_ms = report.duration_ms, "plan executed");
        self.emit(ExecutionEvent::RunCompleted {
            summary: report.summary,
        });
        report
    }

    fn record(&self, results: &mut HashMap<ItemId, TaskResult>, result: TaskResult) {
        let item_id = result.item_id;
        let event = match (result.status, &result.error) {
            (ItemStatus::Completed, _) => ExecutionEvent::ItemCompleted {
                item_id,
                duration_ms: result.duration_ms,
            },
            (ItemStatus::Blocked, Some(error)) => ExecutionEvent::ItemBlocked {
                item_id,
                error: error.clone(),
            },
            (ItemStatus::Skipped, _) => ExecutionEvent::ItemSkipped { item_id },
            (_, error) => ExecutionEvent::ItemFailed {
                item_id,
                error: error.clone().unwrap_or(TaskError::WorkerFailed {
                    message: result.status.to_string(),
                }),
            },
        };
        self.emit(event);
        results.insert(item_id, result);
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Decide an item's outcome without running it, if it must not run.
///
/// Covers items that already ended (for example blocked during
/// decomposition), items reached after cancellation and items with an
/// unsuccessful dependency.
fn settle_without_running(
    item: &mut WorkItem,
    results: &HashMap<ItemId, TaskResult>,
    cancel: &CancellationToken,
) -> Option<TaskResult> {
    let reason = || item.status_reason.clone().unwrap_or_else(|| item.status.to_string());
    match item.status {
        ItemStatus::Blocked => {
            return Some(TaskResult::blocked(
                item.id,
                TaskError::GeneratorFailed { reason: reason() },
            ))
        }
        ItemStatus::Failed => {
            return Some(TaskResult::failed(
                item.id,
                TaskError::WorkerFailed { message: reason() },
            ))
        }
        ItemStatus::Skipped => return Some(TaskResult::skipped(item.id)),
        ItemStatus::Completed => return Some(TaskResult::completed(item.id, String::new())),
        _ => {}
    }

    if cancel.is_cancelled() {
        apply(item, ItemStatus::Skipped, &TaskError::Cancelled.to_string());
        return Some(TaskResult::skipped(item.id));
    }

    let upstream = item.dependencies.iter().find(|dep| {
        results
            .get(dep)
            .map(|result| result.status.is_unsuccessful())
            .unwrap_or(false)
    });
    if let Some(upstream) = upstream.copied() {
        let error = TaskError::UpstreamFailure { upstream };
        debug!(item = %item.id.short(), upstream = %upstream.short(), "blocking on upstream failure");
        apply(item, ItemStatus::Blocked, &error.to_string());
        return Some(TaskResult::blocked(item.id, error));
    }

    None
}

/// Run one item on `worker`, settling its counters as soon as it ends.
async fn run_item(
    worker: Arc<dyn Worker>,
    item: WorkItem,
    cancel: CancellationToken,
    limit: Duration,
    counters: Arc<Mutex<Counters>>,
) -> TaskResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(limit, worker.execute(&item, cancel)).await;
    let duration_ms = elapsed_ms(started);

    let result = match outcome {
        Ok(Ok(output)) => TaskResult::completed(item.id, output),
        Ok(Err(WorkerError::Cancelled)) => TaskResult::skipped(item.id),
        Ok(Err(WorkerError::Failed(message))) => {
            TaskResult::failed(item.id, TaskError::WorkerFailed { message })
        }
        Err(_) => TaskResult::failed(
            item.id,
            TaskError::Timeout {
                after_ms: limit.as_millis() as u64,
            },
        ),
    };

    {
        let mut counters = counters.lock();
        counters.active = counters.active.saturating_sub(1);
        if result.success {
            counters.completed += 1;
        }
    }
    result.by_worker(worker.id(), worker.role(), duration_ms)
}

/// Move `item` to `status`, logging transitions the lifecycle rejects.
fn apply(item: &mut WorkItem, status: ItemStatus, reason: &str) {
    let outcome = match status {
        ItemStatus::InProgress => item.start(),
        ItemStatus::Completed => item.complete(),
        ItemStatus::Failed => item.fail(reason),
        ItemStatus::Blocked => item.block(reason),
        ItemStatus::Skipped => item.skip(reason),
        other => item.transition(other),
    };
    if let Err(err) = outcome {
        warn!(item = %item.id.short(), error = %err, "status update rejected");
    }
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
