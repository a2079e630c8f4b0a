//! Core domain models for taskweave.
//!
//! This module contains the fundamental data structures used throughout
//! the system: work items, the run-scoped arena that owns them, worker
//! roles and the dependency graph.

pub mod arena;
pub mod dag;
pub mod item;
pub mod role;

pub use arena::{ItemArena, ItemTree};
pub use dag::DependencyGraph;
pub use item::{Effort, ItemId, ItemStatus, ItemType, Level, WorkItem};
pub use role::Role;
