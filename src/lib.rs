//! Hierarchical work decomposition and dependency-aware parallel execution.
//!
//! A goal is broken into a tree of work items ([`decompose`]), sibling
//! dependencies are inferred ([`analysis`]), the leaves are grouped into
//! phases and executed by role-specialized workers ([`orchestration`]).

pub mod analysis;
pub mod config;
pub mod core;
pub mod decompose;
pub mod error;
pub mod log;
pub mod orchestration;

pub use error::{Error, Result};
