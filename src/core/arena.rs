//! Run-scoped storage for work items.
//!
//! All items created during one decomposition live in a single `ItemArena`
//! keyed by id. Parent/child and dependency edges are plain ids, so the
//! arena never holds reference cycles and hands ownership of the whole run
//! back to the caller in one piece.

use crate::core::item::{ItemId, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owns every work item of a run.
#[derive(Debug, Clone, Default)]
pub struct ItemArena {
    items: HashMap<ItemId, WorkItem>,
    /// Item ids in creation order.
    order: Vec<ItemId>,
    next_sequence: u64,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from items, keeping their order as creation order.
    pub fn from_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let mut arena = Self::new();
        for item in items {
            arena.insert(item);
        }
        arena
    }

    /// Insert an item, stamping its creation sequence.
    ///
    /// If the item names a parent already in the arena, the item is appended
    /// to that parent's children. Re-inserting an existing id replaces the
    /// stored item but keeps its original position.
    pub fn insert(&mut self, mut item: WorkItem) -> ItemId {
        let id = item.id;
        if let Some(existing) = self.items.get(&id) {
            item.sequence = existing.sequence;
        } else {
            item.sequence = self.next_sequence;
            self.next_sequence += 1;
            self.order.push(id);
        }

        if let Some(parent_id) = item.parent_id {
            if let Some(parent) = self.items.get_mut(&parent_id) {
                if !parent.children.contains(&id) {
                    parent.children.push(id);
                }
            }
        }

        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: &ItemId) -> Option<&WorkItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut WorkItem> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item ids in creation order.
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Items in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Direct children of an item, in creation order.
    pub fn children_of(&self, id: &ItemId) -> Vec<&WorkItem> {
        self.items
            .get(id)
            .map(|item| {
                item.children
                    .iter()
                    .filter_map(|child| self.items.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ancestors of an item, nearest first.
    pub fn ancestors(&self, id: &ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut current = self.items.get(id).and_then(|item| item.parent_id);
        while let Some(parent_id) = current {
            if result.contains(&parent_id) {
                break;
            }
            result.push(parent_id);
            current = self.items.get(&parent_id).and_then(|item| item.parent_id);
        }
        result
    }

    /// Items without children, in creation order.
    pub fn leaves(&self) -> Vec<&WorkItem> {
        self.iter().filter(|item| item.is_leaf()).collect()
    }

    /// Leaf descendants of an item; a leaf is its own only descendant.
    pub fn leaf_descendants(&self, id: &ItemId) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut stack = vec![*id];
        while let Some(current) = stack.pop() {
            let Some(item) = self.items.get(&current) else {
                continue;
            };
            if item.is_leaf() {
                result.push(current);
            } else {
                // Reverse so children come out in creation order.
                stack.extend(item.children.iter().rev().copied());
            }
        }
        result
    }

    /// Own effort plus the total effort of every child, in hours.
    pub fn total_effort(&self, id: &ItemId) -> u32 {
        let Some(item) = self.items.get(id) else {
            return 0;
        };
        item.own_hours()
            + item
                .children
                .iter()
                .map(|child| self.total_effort(child))
                .sum::<u32>()
    }

    /// Build an owned tree view rooted at `id`.
    pub fn tree(&self, id: &ItemId) -> Option<ItemTree> {
        let item = self.items.get(id)?;
        Some(ItemTree {
            item: item.clone(),
            children: item
                .children
                .iter()
                .filter_map(|child| self.tree(child))
                .collect(),
        })
    }

    /// Chain siblings without explicit dependencies in priority order.
    ///
    /// See [`crate::analysis::annotate_arena`]. Returns the number of
    /// dependencies added.
    pub fn annotate_dependencies(&mut self) -> usize {
        crate::analysis::annotate_arena(self)
    }

    /// Clone all items into a map keyed by id.
    pub fn to_map(&self) -> HashMap<ItemId, WorkItem> {
        self.items.clone()
    }

    /// Consume the arena, returning items in creation order.
    pub fn into_items(mut self) -> Vec<WorkItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.remove(id))
            .collect()
    }
}

/// Owned, nested view of a decomposition subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTree {
    pub item: WorkItem,
    pub children: Vec<ItemTree>,
}

impl ItemTree {
    /// Own effort plus the children's total effort, in hours.
    pub fn total_effort(&self) -> u32 {
        self.item.own_hours()
            + self
                .children
                .iter()
                .map(|child| child.total_effort())
                .sum::<u32>()
    }

    /// Number of items in the subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|child| child.count()).sum::<usize>()
    }

    /// Number of levels in the subtree; a lone item has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }
}
