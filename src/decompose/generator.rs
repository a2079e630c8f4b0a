//! Child generator contract.
//!
//! A generator proposes the children of a work item. Backing implementations
//! range from fixed templates to LLM prompting; the decomposer only sees
//! this trait.

use crate::core::item::{Effort, ItemType, WorkItem};
use crate::core::role::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors a generator may report for a single item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator backend error: {0}")]
    Backend(String),

    #[error("invalid generator response: {0}")]
    InvalidResponse(String),

    #[error("generator timed out after {0:?}")]
    Timeout(Duration),
}

/// Specification of one child to create under an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSpec {
    pub title: String,
    pub description: String,
    pub item_type: ItemType,
    pub effort: Effort,
    #[serde(default)]
    pub priority: i32,
    /// Explicit dependencies as indexes into the same spec list.
    #[serde(default)]
    pub depends_on: Vec<usize>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ChildSpec {
    pub fn new(title: &str, item_type: ItemType, effort: Effort) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            item_type,
            effort,
            priority: 0,
            depends_on: Vec::new(),
            role: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Depend on the sibling at `index` in the same spec list.
    pub fn after(mut self, index: usize) -> Self {
        if !self.depends_on.contains(&index) {
            self.depends_on.push(index);
        }
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Produces child specifications for a parent item.
///
/// Returning an empty list is not an error: the parent becomes an effective
/// leaf. Returning an error blocks only that parent.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<ChildSpec>, GeneratorError>;
}
