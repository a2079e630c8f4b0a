//! Work item data model.
//!
//! A work item is one node of the decomposition tree. Items carry their
//! granularity level, category, effort estimate and lifecycle status, and
//! reference their parent, children and dependencies by id only.

use crate::core::role::Role;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a work item within a run.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// Create a new unique item identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Granularity of a work item in the decomposition hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Epic,
    Feature,
    Story,
    Task,
    Subtask,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Epic,
        Level::Feature,
        Level::Story,
        Level::Task,
        Level::Subtask,
    ];

    /// Depth of this level in the hierarchy, Epic being 0.
    pub fn depth(&self) -> u8 {
        match self {
            Level::Epic => 0,
            Level::Feature => 1,
            Level::Story => 2,
            Level::Task => 3,
            Level::Subtask => 4,
        }
    }

    /// The level children of an item at this level are created with.
    ///
    /// Subtask is the finest granularity and has no next level.
    pub fn next(&self) -> Option<Level> {
        match self {
            Level::Epic => Some(Level::Feature),
            Level::Feature => Some(Level::Story),
            Level::Story => Some(Level::Task),
            Level::Task => Some(Level::Subtask),
            Level::Subtask => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Epic => write!(f, "epic"),
            Level::Feature => write!(f, "feature"),
            Level::Story => write!(f, "story"),
            Level::Task => write!(f, "task"),
            Level::Subtask => write!(f, "subtask"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Level::ALL
            .iter()
            .find(|level| level.to_string().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::Validation(format!("unknown level: {}", s)))
    }
}

/// Category of work an item represents.
///
/// The category decides which worker role picks the item up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Planning,
    Research,
    Design,
    Implementation,
    Testing,
    Documentation,
    Review,
    Deployment,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::Planning => write!(f, "planning"),
            ItemType::Research => write!(f, "research"),
            ItemType::Design => write!(f, "design"),
            ItemType::Implementation => write!(f, "implementation"),
            ItemType::Testing => write!(f, "testing"),
            ItemType::Documentation => write!(f, "documentation"),
            ItemType::Review => write!(f, "review"),
            ItemType::Deployment => write!(f, "deployment"),
        }
    }
}

/// T-shirt effort estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Trivial,
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl Effort {
    /// Estimated hours of work.
    pub fn hours(&self) -> u32 {
        match self {
            Effort::Trivial => 1,
            Effort::Small => 2,
            Effort::Medium => 4,
            Effort::Large => 8,
            Effort::ExtraLarge => 16,
        }
    }

    pub fn story_points(&self) -> u32 {
        match self {
            Effort::Trivial => 1,
            Effort::Small => 2,
            Effort::Medium => 3,
            Effort::Large => 5,
            Effort::ExtraLarge => 8,
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::Trivial => write!(f, "trivial"),
            Effort::Small => write!(f, "small"),
            Effort::Medium => write!(f, "medium"),
            Effort::Large => write!(f, "large"),
            Effort::ExtraLarge => write!(f, "extra_large"),
        }
    }
}

/// Work item status in its lifecycle.
///
/// Transitions only move forward. The one exception is `Blocked`, which may
/// return to `Pending` once a re-plan clears the blocking cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Created, not yet expanded or executed.
    #[default]
    Pending,
    /// Expanded into children (or found to have none).
    Decomposed,
    /// A worker is executing the item.
    InProgress,
    Completed,
    Failed,
    /// Cannot proceed: generator failure or an upstream dependency did not complete.
    Blocked,
    /// Never started because the run was cancelled.
    Skipped,
}

impl ItemStatus {
    /// Check whether moving from this status to `next` is allowed.
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        match (self, next) {
            (Pending, Decomposed | InProgress | Completed | Failed | Blocked | Skipped) => true,
            (Decomposed, InProgress | Completed | Failed | Blocked | Skipped) => true,
            (InProgress, Completed | Failed | Blocked | Skipped) => true,
            (Blocked, Pending) => true,
            _ => false,
        }
    }

    /// Terminal states end an item's participation in a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Blocked | ItemStatus::Skipped
        )
    }

    /// True for terminal states that did not produce the item's work.
    pub fn is_unsuccessful(&self) -> bool {
        matches!(
            self,
            ItemStatus::Failed | ItemStatus::Blocked | ItemStatus::Skipped
        )
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Decomposed => write!(f, "decomposed"),
            ItemStatus::InProgress => write!(f, "in_progress"),
            ItemStatus::Completed => write!(f, "completed"),
            ItemStatus::Failed => write!(f, "failed"),
            ItemStatus::Blocked => write!(f, "blocked"),
            ItemStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A single unit of work.
///
/// Parent, children and dependencies are plain id references; the items
/// themselves live in an [`ItemArena`](crate::core::arena::ItemArena) for the
/// duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub level: Level,
    pub item_type: ItemType,
    pub status: ItemStatus,
    /// Why the item ended Failed, Blocked or Skipped.
    pub status_reason: Option<String>,
    /// Effort estimate; `None` for unestimated items such as a freshly stated goal.
    pub effort: Option<Effort>,
    /// Items that must complete before this one starts, in insertion order.
    pub dependencies: Vec<ItemId>,
    pub children: Vec<ItemId>,
    pub parent_id: Option<ItemId>,
    /// Role override; when unset the role follows from `item_type`.
    pub assigned_role: Option<Role>,
    /// Higher runs first among siblings.
    pub priority: i32,
    pub metadata: BTreeMap<String, String>,
    /// Creation order within the owning arena.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// Create a new pending item with a generated id and no estimate.
    pub fn new(title: &str, description: &str, level: Level, item_type: ItemType) -> Self {
        Self {
            id: ItemId::new(),
            title: title.to_string(),
            description: description.to_string(),
            level,
            item_type,
            status: ItemStatus::Pending,
            status_reason: None,
            effort: None,
            dependencies: Vec::new(),
            children: Vec::new(),
            parent_id: None,
            assigned_role: None,
            priority: 0,
            metadata: BTreeMap::new(),
            sequence: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Create an Epic-level planning item for a high-level goal.
    pub fn goal(description: &str) -> Self {
        let title = description.lines().next().unwrap_or(description).trim();
        Self::new(title, description, Level::Epic, ItemType::Planning)
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = Some(effort);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.assigned_role = Some(role);
        self
    }

    pub fn with_dependency(mut self, id: ItemId) -> Self {
        self.add_dependency(id);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Add a dependency, ignoring duplicates.
    pub fn add_dependency(&mut self, id: ItemId) {
        if !self.dependencies.contains(&id) {
            self.dependencies.push(id);
        }
    }

    pub fn depends_on(&self, id: &ItemId) -> bool {
        self.dependencies.contains(id)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Hours contributed by this item alone, excluding children.
    pub fn own_hours(&self) -> u32 {
        self.effort.map(|e| e.hours()).unwrap_or(0)
    }

    /// Role that should execute this item.
    pub fn required_role(&self) -> Role {
        self.assigned_role
            .unwrap_or_else(|| Role::for_type(self.item_type))
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: ItemStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the item as expanded into children.
    pub fn mark_decomposed(&mut self) -> Result<()> {
        self.transition(ItemStatus::Decomposed)
    }

    /// Start execution, recording the start time.
    pub fn start(&mut self) -> Result<()> {
        self.transition(ItemStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(ItemStatus::Completed)?;
        self.status_reason = None;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: &str) -> Result<()> {
        self.transition(ItemStatus::Failed)?;
        self.status_reason = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn block(&mut self, reason: &str) -> Result<()> {
        self.transition(ItemStatus::Blocked)?;
        self.status_reason = Some(reason.to_string());
        Ok(())
    }

    pub fn skip(&mut self, reason: &str) -> Result<()> {
        self.transition(ItemStatus::Skipped)?;
        self.status_reason = Some(reason.to_string());
        Ok(())
    }

    /// Return a blocked item to pending once its cause has been cleared.
    pub fn unblock(&mut self) -> Result<()> {
        self.transition(ItemStatus::Pending)?;
        self.status_reason = None;
        Ok(())
    }
}
