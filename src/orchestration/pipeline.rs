//! End-to-end facade: decompose a goal, plan it and execute it.

use crate::analysis::actionable_items;
use crate::config::Config;
use crate::core::arena::ItemArena;
use crate::core::item::{ItemId, ItemStatus, Level, WorkItem};
use crate::decompose::{Decomposer, Decomposition, Generator};
use crate::error::Result;
use crate::orchestration::executor::Orchestrator;
use crate::orchestration::planner::{ExecutionPlan, Planner};
use crate::orchestration::registry::WorkerRegistry;
use crate::orchestration::report::{ExecutionReport, TaskError, TaskResult};
use std::collections::HashMap;
use tracing::{info, warn};

/// A decomposed and planned goal, ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub decomposition: Decomposition,
    /// Leaves of the tree with dependencies lowered onto leaves.
    pub actionable: Vec<WorkItem>,
    pub plan: ExecutionPlan,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The tree with final statuses for every item.
    pub decomposition: Decomposition,
    pub plan: ExecutionPlan,
    /// Results for every item of the tree, composites included.
    pub report: ExecutionReport,
}

pub struct Pipeline {
    decomposer: Decomposer,
    planner: Planner,
    orchestrator: Orchestrator,
    target: Level,
}

impl Pipeline {
    pub fn new(config: &Config, registry: WorkerRegistry) -> Self {
        Self {
            decomposer: Decomposer::new(config.decomposer_config()),
            planner: Planner::new(config.planner_config()),
            orchestrator: Orchestrator::new(registry, config.executor_config()),
            target: config.decomposition.target_level,
        }
    }

    /// Replace the orchestrator, for example to attach an event channel.
    pub fn with_orchestrator(mut self, orchestrator: Orchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn target(&self) -> Level {
        self.target
    }

    /// Decompose `goal`, infer sibling dependencies and plan the leaves.
    pub async fn prepare(&self, goal: WorkItem, generator: &dyn Generator) -> Result<PreparedRun> {
        let mut decomposition = self.decomposer.decompose(goal, self.target, generator).await;
        let inferred = decomposition.arena.annotate_dependencies();
        let actionable = actionable_items(&decomposition.arena);
        let plan = self.planner.plan(&actionable)?;

        info!(
            items = decomposition.arena.len(),
            actionable = actionable.len(),
            inferred,
            phases = plan.phases.len(),
            "goal prepared"
        );

        Ok(PreparedRun {
            decomposition,
            actionable,
            plan,
        })
    }

    /// Execute a prepared run and roll leaf outcomes up the tree.
    pub async fn execute(&self, prepared: PreparedRun) -> RunOutcome {
        let PreparedRun {
            mut decomposition,
            actionable,
            plan,
        } = prepared;

        let mut items: HashMap<ItemId, WorkItem> =
            actionable.into_iter().map(|item| (item.id, item)).collect();
        let mut report = self.orchestrator.execute(&plan, &mut items).await;

        write_back(&mut decomposition.arena, &items);
        roll_up(&mut decomposition.arena);
        report_composites(&decomposition.arena, &mut report);

        RunOutcome {
            decomposition,
            plan,
            report,
        }
    }

    pub async fn run(&self, goal: WorkItem, generator: &dyn Generator) -> Result<RunOutcome> {
        let prepared = self.prepare(goal, generator).await?;
        Ok(self.execute(prepared).await)
    }
}

/// Copy execution state of leaves back into the tree.
///
/// Dependencies are left alone: the executed copies carry lowered
/// dependencies, the tree keeps the original ones.
fn write_back(arena: &mut ItemArena, executed: &HashMap<ItemId, WorkItem>) {
    for (id, item) in executed {
        if let Some(node) = arena.get_mut(id) {
            node.status = item.status;
            node.status_reason = item.status_reason.clone();
            node.assigned_role = item.assigned_role;
            node.started_at = item.started_at;
            node.completed_at = item.completed_at;
        }
    }
}

/// Derive composite item statuses from their children, deepest first.
///
/// A composite completes when all children completed. Otherwise it takes the
/// most severe child outcome: failed, then blocked, then skipped.
fn roll_up(arena: &mut ItemArena) {
    let composites: Vec<ItemId> = arena
        .iter()
        .filter(|item| !item.is_leaf())
        .map(|item| item.id)
        .collect();

    // Children are always created after their parent.
    for id in composites.into_iter().rev() {
        let statuses: Vec<ItemStatus> = arena
            .children_of(&id)
            .iter()
            .map(|child| child.status)
            .collect();
        let count = |status| statuses.iter().filter(|s| **s == status).count();

        let Some(item) = arena.get_mut(&id) else {
            continue;
        };
        if item.status.is_terminal() {
            continue;
        }

        let outcome = if statuses.iter().all(|s| *s == ItemStatus::Completed) {
            item.complete()
        } else if count(ItemStatus::Failed) > 0 {
            item.fail(&format!("{} of {} children failed", count(ItemStatus::Failed), statuses.len()))
        } else if count(ItemStatus::Blocked) > 0 {
            item.block(&format!("{} of {} children blocked", count(ItemStatus::Blocked), statuses.len()))
        } else if count(ItemStatus::Skipped) > 0 {
            item.skip(&format!("{} of {} children skipped", count(ItemStatus::Skipped), statuses.len()))
        } else {
            continue;
        };

        if let Err(err) = outcome {
            warn!(item = %id.short(), error = %err, "could not roll up status");
        }
    }
}

/// Add a result for each composite item carrying its rolled-up status.
fn report_composites(arena: &ItemArena, report: &mut ExecutionReport) {
    for item in arena.iter().filter(|item| !item.is_leaf()) {
        let reason = || TaskError::Subtree {
            reason: item.status_reason.clone().unwrap_or_default(),
        };
        let result = match item.status {
            ItemStatus::Completed => TaskResult::completed(item.id, String::new()),
            ItemStatus::Failed => TaskResult::failed(item.id, reason()),
            ItemStatus::Blocked => TaskResult::blocked(item.id, reason()),
            ItemStatus::Skipped => TaskResult::skipped(item.id),
            status => {
                warn!(item = %item.id.short(), %status, "composite did not settle");
                continue;
            }
        };
        report.insert(result);
    }
}
