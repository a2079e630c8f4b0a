use thiserror::Error;

use crate::core::item::{ItemId, ItemStatus};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dependency cycle detected among items: {}", format_ids(.members))]
    CycleDetected { members: Vec<ItemId> },

    #[error("Item {item} depends on unknown item {dependency}")]
    UnknownDependency { item: ItemId, dependency: ItemId },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: ItemStatus, to: ItemStatus },
}

fn format_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(|id| id.short())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
