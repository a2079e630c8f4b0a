//! Recursive decomposition of a goal into a work item tree.
//!
//! The decomposer expands items breadth-first. Every expandable item on the
//! same tree level is sent to the generator concurrently, and a failure for
//! one item only blocks that item.

use crate::core::arena::{ItemArena, ItemTree};
use crate::core::item::{ItemId, ItemStatus, Level, WorkItem};
use crate::decompose::generator::{ChildSpec, Generator, GeneratorError};
use futures::future::join_all;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default hard cap on the number of tree levels.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Default time allowed for a single generator call.
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 60;

/// Metadata key holding the reason an item was blocked during decomposition.
pub const BLOCKED_REASON_KEY: &str = "blocked_reason";

/// Configuration for the decomposer.
#[derive(Debug, Clone)]
pub struct DecomposerConfig {
    /// Maximum number of tree levels, counting the root.
    pub max_depth: usize,
    /// Time allowed for one `generate` call before the item is blocked.
    pub generator_timeout: Duration,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            generator_timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
        }
    }
}

/// Output of a decomposition: the root id and the arena owning every item.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub root: ItemId,
    pub arena: ItemArena,
}

impl Decomposition {
    /// Nested view of the whole tree.
    ///
    /// `None` only if the root was removed from the arena.
    pub fn tree(&self) -> Option<ItemTree> {
        self.arena.tree(&self.root)
    }

    /// Every item in creation order.
    pub fn flat(&self) -> Vec<&WorkItem> {
        self.arena.iter().collect()
    }

    pub fn root_item(&self) -> Option<&WorkItem> {
        self.arena.get(&self.root)
    }

    /// Total effort of the whole tree in hours.
    pub fn total_effort(&self) -> u32 {
        self.arena.total_effort(&self.root)
    }

    /// Items blocked because their generator call failed.
    pub fn blocked(&self) -> Vec<&WorkItem> {
        self.arena
            .iter()
            .filter(|item| item.status == ItemStatus::Blocked)
            .collect()
    }
}

/// Expands work items into subtrees using a [`Generator`].
#[derive(Debug, Clone, Default)]
pub struct Decomposer {
    config: DecomposerConfig,
}

impl Decomposer {
    pub fn new(config: DecomposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Expand `root` until every item reaches `target` granularity.
    ///
    /// Items finer than or equal to `target`, items on the last allowed tree
    /// level and items that are no longer pending are left as leaves.
    pub async fn decompose(
        &self,
        root: WorkItem,
        target: Level,
        generator: &dyn Generator,
    ) -> Decomposition {
        let mut arena = ItemArena::new();
        let root_id = arena.insert(root);
        let mut frontier = vec![root_id];
        let mut generation = 0usize;

        info!(
            root = %root_id.short(),
            target = %target,
            max_depth = self.config.max_depth,
            "decomposing"
        );

        while !frontier.is_empty() {
            let expandable: Vec<WorkItem> = frontier
                .iter()
                .filter_map(|id| arena.get(id))
                .filter(|item| self.should_expand(item, target, generation))
                .cloned()
                .collect();

            if expandable.is_empty() {
                break;
            }

            debug!(generation, items = expandable.len(), "expanding tree level");

            let outcomes = join_all(
                expandable
                    .iter()
                    .map(|item| self.generate_one(item, generator)),
            )
            .await;

            let mut next = Vec::new();
            for (parent, outcome) in expandable.iter().zip(outcomes) {
                match outcome {
                    Ok(specs) => next.extend(attach_children(&mut arena, parent, specs)),
                    Err(err) => block_item(&mut arena, &parent.id, &err),
                }
            }

            frontier = next;
            generation += 1;
        }

        info!(
            root = %root_id.short(),
            items = arena.len(),
            levels = generation + 1,
            "decomposition finished"
        );

        Decomposition {
            root: root_id,
            arena,
        }
    }

    fn should_expand(&self, item: &WorkItem, target: Level, generation: usize) -> bool {
        item.status == ItemStatus::Pending
            && item.level.depth() < target.depth()
            && item.level.next().is_some()
            && generation + 1 < self.config.max_depth
    }

    async fn generate_one(
        &self,
        item: &WorkItem,
        generator: &dyn Generator,
    ) -> Result<Vec<ChildSpec>, GeneratorError> {
        let limit = self.config.generator_timeout;
        match timeout(limit, generator.generate(item)).await {
            Ok(result) => result,
            Err(_) => Err(GeneratorError::Timeout(limit)),
        }
    }
}

/// Create children for `parent` from `specs`, returning their ids.
///
/// Explicit sibling indexes are resolved to the fresh ids; indexes that are
/// out of range or point at the spec itself are dropped.
fn attach_children(arena: &mut ItemArena, parent: &WorkItem, specs: Vec<ChildSpec>) -> Vec<ItemId> {
    let Some(level) = parent.level.next() else {
        return Vec::new();
    };

    let ids: Vec<ItemId> = specs.iter().map(|_| ItemId::new()).collect();
    for (index, spec) in specs.into_iter().enumerate() {
        let mut child = WorkItem::new(&spec.title, &spec.description, level, spec.item_type)
            .with_effort(spec.effort)
            .with_priority(spec.priority);
        child.id = ids[index];
        child.parent_id = Some(parent.id);
        child.assigned_role = spec.role;
        child.metadata = spec.metadata;

        for dep in spec.depends_on {
            if dep == index || dep >= ids.len() {
                warn!(
                    parent = %parent.id.short(),
                    child = %child.title,
                    index = dep,
                    "dropping invalid sibling dependency"
                );
                continue;
            }
            child.add_dependency(ids[dep]);
        }

        arena.insert(child);
    }

    if let Some(item) = arena.get_mut(&parent.id) {
        if let Err(err) = item.mark_decomposed() {
            warn!(item = %parent.id.short(), error = %err, "could not mark item decomposed");
        }
    }

    if ids.is_empty() {
        debug!(item = %parent.id.short(), "generator returned no children, keeping as leaf");
    }
    ids
}

fn block_item(arena: &mut ItemArena, id: &ItemId, err: &GeneratorError) {
    warn!(item = %id.short(), error = %err, "generator failed, blocking item");
    let Some(item) = arena.get_mut(id) else {
        return;
    };
    let reason = err.to_string();
    if let Err(transition) = item.block(&reason) {
        warn!(item = %id.short(), error = %transition, "could not block item");
        return;
    }
    item.metadata
        .insert(BLOCKED_REASON_KEY.to_string(), reason);
}
