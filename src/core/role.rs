//! Worker roles and the item type to role lookup table.

use crate::core::item::ItemType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Categorical tag used to match workers to work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Coder,
    Researcher,
    Qa,
    DocumentWriter,
    Reviewer,
    Coordinator,
    Devops,
    Designer,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Coder,
        Role::Researcher,
        Role::Qa,
        Role::DocumentWriter,
        Role::Reviewer,
        Role::Coordinator,
        Role::Devops,
        Role::Designer,
    ];

    /// The role responsible for items of the given type.
    pub fn for_type(item_type: ItemType) -> Role {
        match item_type {
            ItemType::Implementation => Role::Coder,
            ItemType::Research => Role::Researcher,
            ItemType::Testing => Role::Qa,
            ItemType::Documentation => Role::DocumentWriter,
            ItemType::Review => Role::Reviewer,
            ItemType::Planning => Role::Coordinator,
            ItemType::Deployment => Role::Devops,
            ItemType::Design => Role::Designer,
        }
    }

    /// Capabilities a worker of this role advertises unless it says otherwise.
    pub fn default_capabilities(&self) -> &'static [&'static str] {
        match self {
            Role::Coder => &["implementation", "refactoring", "debugging"],
            Role::Researcher => &["research", "analysis", "summarization"],
            Role::Qa => &["testing", "verification"],
            Role::DocumentWriter => &["documentation", "writing"],
            Role::Reviewer => &["review", "feedback"],
            Role::Coordinator => &["planning", "coordination"],
            Role::Devops => &["deployment", "infrastructure"],
            Role::Designer => &["design", "architecture"],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Coder => write!(f, "coder"),
            Role::Researcher => write!(f, "researcher"),
            Role::Qa => write!(f, "qa"),
            Role::DocumentWriter => write!(f, "documentWriter"),
            Role::Reviewer => write!(f, "reviewer"),
            Role::Coordinator => write!(f, "coordinator"),
            Role::Devops => write!(f, "devops"),
            Role::Designer => write!(f, "designer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', '_'], "");
        Role::ALL
            .iter()
            .find(|role| role.to_string().eq_ignore_ascii_case(&wanted))
            .copied()
            .ok_or_else(|| Error::Validation(format!("unknown role: {}", s)))
    }
}
