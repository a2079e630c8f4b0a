//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Scripted workers that record calls and concurrency
//! - Scripted generators
//! - Predefined item sets

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use taskweave::core::{Effort, ItemId, ItemType, Level, Role, WorkItem};
use taskweave::decompose::{ChildSpec, Generator, GeneratorError};
use taskweave::orchestration::{
    ExecutionEvent, ExecutionPlan, ExecutionReport, ExecutorConfig, Orchestrator, Planner, Worker,
    WorkerError, WorkerRegistry,
};

/// A leaf-level task with the given title and effort.
pub fn task(title: &str, effort: Effort) -> WorkItem {
    WorkItem::new(title, "", Level::Task, ItemType::Implementation).with_effort(effort)
}

pub fn typed_task(title: &str, item_type: ItemType) -> WorkItem {
    WorkItem::new(title, "", Level::Task, item_type).with_effort(Effort::Small)
}

/// Look up an item by title.
pub fn by_title<'a>(items: &'a [WorkItem], title: &str) -> &'a WorkItem {
    items
        .iter()
        .find(|item| item.title == title)
        .unwrap_or_else(|| panic!("no item titled {title}"))
}

/// T1, T2 independent; T3 after both; T4 after T3.
pub fn diamond() -> Vec<WorkItem> {
    let t1 = task("T1", Effort::Small);
    let t2 = task("T2", Effort::Medium);
    let t3 = task("T3", Effort::Large)
        .with_dependency(t1.id)
        .with_dependency(t2.id);
    let t4 = task("T4", Effort::Trivial).with_dependency(t3.id);
    vec![t1, t2, t3, t4]
}

/// What a [`MockWorker`] does for one item.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Panic,
    /// Sleep, then succeed.
    Sleep(Duration),
    /// Wait for cancellation, then report it.
    WaitForCancel,
}

/// Worker whose behavior is scripted per item title.
///
/// Records every call and the peak number of concurrent calls.
pub struct MockWorker {
    id: String,
    role: Role,
    default: Behavior,
    script: HashMap<String, Behavior>,
    pub calls: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl MockWorker {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            role,
            default: Behavior::Succeed,
            script: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn on(mut self, title: &str, behavior: Behavior) -> Self {
        self.script.insert(title.to_string(), behavior);
        self
    }

    pub fn by_default(mut self, behavior: Behavior) -> Self {
        self.default = behavior;
        self
    }
}

#[async_trait]
impl Worker for MockWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    async fn execute(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, WorkerError> {
        self.calls.lock().push(item.title.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let behavior = self
            .script
            .get(&item.title)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        let outcome = match behavior {
            Behavior::Succeed => Ok(format!("{} done", item.title)),
            Behavior::Fail(message) => Err(WorkerError::failed(message)),
            Behavior::Panic => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("worker exploded on {}", item.title);
            }
            Behavior::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(format!("{} done", item.title))
            }
            Behavior::WaitForCancel => {
                cancel.cancelled().await;
                Err(WorkerError::Cancelled)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Orchestrator plus its event stream.
pub struct ExecutionHarness {
    pub orchestrator: Orchestrator,
    pub event_rx: mpsc::UnboundedReceiver<ExecutionEvent>,
}

impl ExecutionHarness {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    pub fn with_config(registry: WorkerRegistry, config: ExecutorConfig) -> Self {
        let (tx, event_rx) = mpsc::unbounded_channel();
        Self {
            orchestrator: Orchestrator::new(registry, config).with_events(tx),
            event_rx,
        }
    }

    /// Plan and execute `items`, returning the plan, the report and the
    /// items with their final statuses.
    pub async fn run(&self, items: Vec<WorkItem>) -> (ExecutionPlan, ExecutionReport, Vec<WorkItem>) {
        let order: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        let plan = Planner::default().plan(&items).expect("plan");
        let mut map: HashMap<ItemId, WorkItem> = items.into_iter().map(|item| (item.id, item)).collect();
        let report = self.orchestrator.execute(&plan, &mut map).await;
        let items = order
            .iter()
            .filter_map(|id| map.remove(id))
            .collect();
        (plan, report, items)
    }

    pub fn drain_events(&mut self) -> Vec<ExecutionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Generator answering from a fixed script keyed by parent title.
///
/// Titles not in the script get no children; titles in `failing` error.
#[derive(Default)]
pub struct ScriptedGenerator {
    children: HashMap<String, Vec<ChildSpec>>,
    failing: HashSet<String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(mut self, parent: &str, children: Vec<ChildSpec>) -> Self {
        self.children.insert(parent.to_string(), children);
        self
    }

    pub fn failing_on(mut self, parent: &str) -> Self {
        self.failing.insert(parent.to_string());
        self
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<ChildSpec>, GeneratorError> {
        self.calls.lock().push(item.title.clone());
        if self.failing.contains(&item.title) {
            return Err(GeneratorError::Backend(format!("cannot expand {}", item.title)));
        }
        Ok(self.children.get(&item.title).cloned().unwrap_or_default())
    }
}
