//! Execution planning.
//!
//! Groups work items into phases with Kahn's algorithm: a phase holds every
//! item whose dependencies all sit in earlier phases. Items of one phase may
//! run concurrently; phases run strictly one after another.

use crate::core::dag::DependencyGraph;
use crate::core::item::{ItemId, WorkItem};
use crate::core::role::Role;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// How the critical path of a plan is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalPathMode {
    /// The heaviest item of each phase, in phase order.
    #[default]
    PhaseHeaviest,
    /// The exact effort-weighted longest path through the dependency graph.
    LongestPath,
}

impl std::fmt::Display for CriticalPathMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriticalPathMode::PhaseHeaviest => write!(f, "phase_heaviest"),
            CriticalPathMode::LongestPath => write!(f, "longest_path"),
        }
    }
}

impl std::str::FromStr for CriticalPathMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "phase_heaviest" => Ok(CriticalPathMode::PhaseHeaviest),
            "longest_path" => Ok(CriticalPathMode::LongestPath),
            other => Err(Error::Validation(format!("unknown critical path mode: {other}"))),
        }
    }
}

/// A set of items that may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub index: usize,
    /// Ordered by priority (highest first), then input order.
    pub items: Vec<ItemId>,
}

/// The output of planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub phases: Vec<Phase>,
    pub critical_path: Vec<ItemId>,
    /// Total effort along the critical path.
    pub critical_path_hours: u32,
    /// Number of items per required role.
    pub resource_requirements: BTreeMap<Role, usize>,
    /// Sum over phases of the largest item estimate in each phase.
    pub estimated_hours: u32,
}

impl ExecutionPlan {
    pub fn estimated_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.estimated_hours) * 3600)
    }

    pub fn item_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Index of the phase that holds `id`.
    pub fn phase_of(&self, id: &ItemId) -> Option<usize> {
        self.phases
            .iter()
            .find(|phase| phase.items.contains(id))
            .map(|phase| phase.index)
    }

    /// Every planned item id in execution order.
    pub fn ordered_items(&self) -> Vec<ItemId> {
        self.phases
            .iter()
            .flat_map(|phase| phase.items.iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    pub critical_path: CriticalPathMode,
}

/// Builds [`ExecutionPlan`]s from dependency-annotated items.
///
/// Planning never mutates the items.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn with_mode(mode: CriticalPathMode) -> Self {
        Self::new(PlannerConfig {
            critical_path: mode,
        })
    }

    /// Plan the execution of `items`.
    ///
    /// Fails with [`Error::UnknownDependency`] when an item depends on an id
    /// outside `items`, and with [`Error::CycleDetected`] when the
    /// dependencies contain a cycle. Duplicate ids keep their first
    /// occurrence.
    pub fn plan(&self, items: &[WorkItem]) -> Result<ExecutionPlan> {
        let mut seen = HashSet::new();
        let items: Vec<&WorkItem> = items.iter().filter(|item| seen.insert(item.id)).collect();

        let totals = subtree_hours(&items);
        let graph = DependencyGraph::build(items.iter().copied(), |item| {
            totals.get(&item.id).copied().unwrap_or(0)
        })?;

        let phases = layer(&items, &graph)?;
        let lookup: HashMap<ItemId, &WorkItem> = items.iter().map(|item| (item.id, *item)).collect();

        let (critical_path, critical_path_hours) = match self.config.critical_path {
            CriticalPathMode::PhaseHeaviest => heaviest_per_phase(&phases, &totals),
            CriticalPathMode::LongestPath => graph.longest_path()?,
        };

        let mut resource_requirements = BTreeMap::new();
        for item in &items {
            *resource_requirements.entry(item.required_role()).or_insert(0) += 1;
        }

        let estimated_hours = phases
            .iter()
            .map(|phase| {
                phase
                    .items
                    .iter()
                    .filter_map(|id| lookup.get(id))
                    .map(|item| item.own_hours())
                    .max()
                    .unwrap_or(0)
            })
            .sum();

        info!(
            items = items.len(),
            phases = phases.len(),
            estimated_hours,
            critical_path_hours,
            mode = %self.config.critical_path,
            "execution plan built"
        );

        Ok(ExecutionPlan {
            phases,
            critical_path,
            critical_path_hours,
            resource_requirements,
            estimated_hours,
        })
    }
}

/// Kahn layering with a deterministic order inside each phase.
fn layer(items: &[&WorkItem], graph: &DependencyGraph) -> Result<Vec<Phase>> {
    let mut remaining: Vec<(usize, &WorkItem)> = items.iter().copied().enumerate().collect();
    let mut scheduled: HashSet<ItemId> = HashSet::new();
    let mut phases = Vec::new();

    while !remaining.is_empty() {
        let (mut ready, blocked): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(_, item)| item.dependencies.iter().all(|dep| scheduled.contains(dep)));

        if ready.is_empty() {
            let mut members = graph.cycle_members();
            if members.is_empty() {
                members = blocked.iter().map(|(_, item)| item.id).collect();
                members.sort();
            }
            return Err(Error::CycleDetected { members });
        }

        ready.sort_by_key(|(position, item)| (Reverse(item.priority), *position));
        let ids: Vec<ItemId> = ready.iter().map(|(_, item)| item.id).collect();
        scheduled.extend(ids.iter().copied());

        debug!(phase = phases.len(), items = ids.len(), "phase planned");
        phases.push(Phase {
            index: phases.len(),
            items: ids,
        });
        remaining = blocked;
    }

    Ok(phases)
}

fn heaviest_per_phase(phases: &[Phase], totals: &HashMap<ItemId, u32>) -> (Vec<ItemId>, u32) {
    let mut path = Vec::new();
    let mut hours = 0;
    for phase in phases {
        let mut heaviest: Option<(ItemId, u32)> = None;
        for id in &phase.items {
            let weight = totals.get(id).copied().unwrap_or(0);
            if heaviest.map_or(true, |(_, best)| weight > best) {
                heaviest = Some((*id, weight));
            }
        }
        if let Some((id, weight)) = heaviest {
            path.push(id);
            hours += weight;
        }
    }
    (path, hours)
}

/// Effort of each item plus the effort of its children within `items`.
fn subtree_hours(items: &[&WorkItem]) -> HashMap<ItemId, u32> {
    fn visit(
        id: ItemId,
        lookup: &HashMap<ItemId, &WorkItem>,
        memo: &mut HashMap<ItemId, u32>,
        visiting: &mut HashSet<ItemId>,
    ) -> u32 {
        if let Some(&hours) = memo.get(&id) {
            return hours;
        }
        let Some(item) = lookup.get(&id) else {
            return 0;
        };
        // Malformed parent links must not recurse forever.
        if !visiting.insert(id) {
            return 0;
        }
        let mut total = item.own_hours();
        for child in &item.children {
            total += visit(*child, lookup, memo, visiting);
        }
        visiting.remove(&id);
        memo.insert(id, total);
        total
    }

    let lookup: HashMap<ItemId, &WorkItem> = items.iter().map(|item| (item.id, *item)).collect();
    let mut memo = HashMap::new();
    let mut visiting = HashSet::new();
    for item in items {
        visit(item.id, &lookup, &mut memo, &mut visiting);
    }
    memo
}
