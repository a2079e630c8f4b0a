//! Goal decomposition.
//!
//! Turns a high-level goal into a tree of work items by repeatedly asking a
//! [`Generator`] for the children of each item.

mod decomposer;
mod generator;
mod template;

pub use decomposer::{
    Decomposer, DecomposerConfig, Decomposition, BLOCKED_REASON_KEY, DEFAULT_GENERATOR_TIMEOUT_SECS,
    DEFAULT_MAX_DEPTH,
};
pub use generator::{ChildSpec, Generator, GeneratorError};
pub use template::TemplateGenerator;
