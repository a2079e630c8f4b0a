//! Dependency graph over a set of work items.
//!
//! The graph is built on demand from the items' dependency lists and is used
//! for validation: dangling references, cycle membership and the exact
//! effort-weighted longest path.

use crate::core::item::{ItemId, WorkItem};
use crate::error::{Error, Result};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Directed graph of item dependencies.
///
/// Nodes are item ids weighted with the item's effort in hours. An edge
/// `a -> b` means `a` must finish before `b` can start.
pub struct DependencyGraph {
    graph: DiGraph<ItemId, ()>,
    index: HashMap<ItemId, NodeIndex>,
    hours: HashMap<ItemId, u32>,
}

impl DependencyGraph {
    /// Build the graph, rejecting dependencies that name unknown items.
    ///
    /// Each node is weighted with `weight(item)` hours.
    pub fn build<'a, I, F>(items: I, weight: F) -> Result<Self>
    where
        I: IntoIterator<Item = &'a WorkItem>,
        F: Fn(&WorkItem) -> u32,
    {
        let items: Vec<&WorkItem> = items.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut hours = HashMap::new();

        for item in &items {
            if index.contains_key(&item.id) {
                continue;
            }
            index.insert(item.id, graph.add_node(item.id));
            hours.insert(item.id, weight(item));
        }

        for item in &items {
            let to = index[&item.id];
            for dep in &item.dependencies {
                let from = index.get(dep).ok_or(Error::UnknownDependency {
                    item: item.id,
                    dependency: *dep,
                })?;
                if graph.find_edge(*from, to).is_none() {
                    graph.add_edge(*from, to, ());
                }
            }
        }

        Ok(Self {
            graph,
            index,
            hours,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    /// Items that directly depend on `id`.
    pub fn dependents(&self, id: &ItemId) -> Vec<ItemId> {
        self.index
            .get(id)
            .map(|&node| {
                self.graph
                    .neighbors_directed(node, Direction::Outgoing)
                    .map(|n| self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of every item that sits on a dependency cycle.
    ///
    /// Members of a strongly connected component with more than one node,
    /// plus items that depend on themselves. Empty for an acyclic graph.
    pub fn cycle_members(&self) -> Vec<ItemId> {
        let mut members: Vec<ItemId> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .map(|&n| self.graph.find_edge(n, n).is_some())
                        .unwrap_or(false)
            })
            .flatten()
            .map(|n| self.graph[n])
            .collect();
        members.sort();
        members
    }

    pub fn is_acyclic(&self) -> bool {
        self.cycle_members().is_empty()
    }

    /// Exact effort-weighted longest path through the graph.
    ///
    /// Returns the path in dependency order and its total hours.
    pub fn longest_path(&self) -> Result<(Vec<ItemId>, u32)> {
        let order = toposort(&self.graph, None).map_err(|_| Error::CycleDetected {
            members: self.cycle_members(),
        })?;

        let mut best: HashMap<NodeIndex, (u32, Option<NodeIndex>)> = HashMap::new();
        for &node in &order {
            let own = self.hours[&self.graph[node]];
            let (prefix, via) = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .filter_map(|pred| best.get(&pred).map(|(cost, _)| (*cost, Some(pred))))
                .max_by_key(|(cost, _)| *cost)
                .unwrap_or((0, None));
            best.insert(node, (prefix + own, via));
        }

        // First node reaching the maximum wins so the result is stable.
        let mut end = None;
        let mut end_cost = 0;
        for &node in &order {
            let cost = best[&node].0;
            if end.is_none() || cost > end_cost {
                end = Some(node);
                end_cost = cost;
            }
        }

        let mut path = Vec::new();
        let mut current = end;
        while let Some(node) = current {
            path.push(self.graph[node]);
            current = best[&node].1;
        }
        path.reverse();
        Ok((path, end_cost))
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("items", &self.node_count())
            .field("dependencies", &self.edge_count())
            .finish()
    }
}
