//! Implicit dependency inference.
//!
//! Siblings that carry no explicit dependencies are chained in priority
//! order: each one waits for the sibling ranked just above it. This is a
//! conservative default. It serializes siblings even when their work is
//! independent, and explicit generator edges are the only way around it.
//! A chain edge that would contradict the explicit edges is left out.

use crate::core::arena::ItemArena;
use crate::core::item::{ItemId, WorkItem};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Compute the `(item, dependency)` edges the sibling chain adds.
fn sibling_chain<'a>(items: impl Iterator<Item = &'a WorkItem>) -> Vec<(ItemId, ItemId)> {
    let mut groups: HashMap<Option<ItemId>, Vec<&WorkItem>> = HashMap::new();
    for item in items {
        groups.entry(item.parent_id).or_default().push(item);
    }

    let mut edges = Vec::new();
    for siblings in groups.values_mut() {
        // Stable sort: equal priority and sequence keep input order.
        siblings.sort_by_key(|item| (Reverse(item.priority), item.sequence));
        let mut graph: HashMap<ItemId, Vec<ItemId>> = siblings
            .iter()
            .map(|item| (item.id, item.dependencies.clone()))
            .collect();
        for pair in siblings.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            if !current.dependencies.is_empty() {
                continue;
            }
            // An edge the explicit ordering already contradicts would close a cycle.
            if reaches(&graph, previous.id, current.id) {
                debug!(
                    item = %current.id.short(),
                    sibling = %previous.id.short(),
                    "skipping sibling edge against explicit ordering"
                );
                continue;
            }
            graph.entry(current.id).or_default().push(previous.id);
            edges.push((current.id, previous.id));
        }
    }
    edges
}

/// Whether `from` depends on `to`, directly or transitively, within `graph`.
fn reaches(graph: &HashMap<ItemId, Vec<ItemId>>, from: ItemId, to: ItemId) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if id == to {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(deps) = graph.get(&id) {
            stack.extend(deps.iter().copied());
        }
    }
    false
}

/// Add implicit sibling dependencies to `items` in place.
///
/// Returns the number of dependencies added. Items that already have
/// dependencies are left untouched.
pub fn annotate_dependencies(items: &mut [WorkItem]) -> usize {
    let edges = sibling_chain(items.iter());
    let positions: HashMap<ItemId, usize> = items
        .iter()
        .enumerate()
        .map(|(position, item)| (item.id, position))
        .collect();

    for (item, dependency) in &edges {
        if let Some(&position) = positions.get(item) {
            items[position].add_dependency(*dependency);
        }
    }

    debug!(items = items.len(), added = edges.len(), "annotated sibling dependencies");
    edges.len()
}

/// Add implicit sibling dependencies to every item of an arena.
pub fn annotate_arena(arena: &mut ItemArena) -> usize {
    let edges = sibling_chain(arena.iter());
    for (item, dependency) in &edges {
        if let Some(item) = arena.get_mut(item) {
            item.add_dependency(*dependency);
        }
    }

    debug!(items = arena.len(), added = edges.len(), "annotated sibling dependencies");
    edges.len()
}

/// Lower the tree onto its leaves for execution.
///
/// Composite items are containers and never run themselves. Each leaf
/// inherits the dependencies of all of its ancestors, and a dependency on a
/// composite item becomes a dependency on every leaf beneath it. Leaves are
/// returned in creation order.
pub fn actionable_items(arena: &ItemArena) -> Vec<WorkItem> {
    arena
        .leaves()
        .into_iter()
        .map(|leaf| {
            let mut item = leaf.clone();
            let mut direct = leaf.dependencies.clone();
            for ancestor in arena.ancestors(&leaf.id) {
                if let Some(ancestor) = arena.get(&ancestor) {
                    direct.extend(ancestor.dependencies.iter().copied());
                }
            }

            item.dependencies.clear();
            for dependency in direct {
                if arena.contains(&dependency) {
                    for target in arena.leaf_descendants(&dependency) {
                        item.add_dependency(target);
                    }
                } else {
                    // Left dangling for the planner to report.
                    item.add_dependency(dependency);
                }
            }
            item
        })
        .collect()
}
