//! Heuristic template generator.
//!
//! Expands items with fixed per-level templates. It needs no backend, is
//! fully deterministic and is what the CLI uses for dry runs.

use crate::core::item::{Effort, ItemType, Level, WorkItem};
use crate::decompose::generator::{ChildSpec, Generator, GeneratorError};
use async_trait::async_trait;

/// Generator that expands items using built-in templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Child specs for `item`, without going through the async trait.
    pub fn children_for(&self, item: &WorkItem) -> Vec<ChildSpec> {
        let subject = item.title.as_str();
        match item.level {
            Level::Epic => vec![
                ChildSpec::new(
                    &format!("Research requirements for {}", subject),
                    ItemType::Research,
                    Effort::Medium,
                )
                .with_priority(50),
                ChildSpec::new(
                    &format!("Design architecture for {}", subject),
                    ItemType::Design,
                    Effort::Large,
                )
                .with_priority(40),
                ChildSpec::new(
                    &format!("Build core of {}", subject),
                    ItemType::Implementation,
                    Effort::ExtraLarge,
                )
                .with_priority(30),
                ChildSpec::new(
                    &format!("Document {}", subject),
                    ItemType::Documentation,
                    Effort::Medium,
                )
                .with_priority(20),
                ChildSpec::new(
                    &format!("Release {}", subject),
                    ItemType::Deployment,
                    Effort::Small,
                )
                .with_priority(10),
            ],
            Level::Feature => vec![
                ChildSpec::new(
                    &format!("Plan {}", subject),
                    ItemType::Planning,
                    Effort::Small,
                )
                .with_priority(30),
                ChildSpec::new(
                    &format!("Deliver {}", subject),
                    item.item_type,
                    Effort::Large,
                )
                .with_priority(20),
                ChildSpec::new(
                    &format!("Verify {}", subject),
                    ItemType::Testing,
                    Effort::Medium,
                )
                .with_priority(10),
            ],
            Level::Story => vec![
                ChildSpec::new(
                    &format!("Carry out {}", subject),
                    item.item_type,
                    Effort::Medium,
                )
                .with_priority(20),
                ChildSpec::new(
                    &format!("Review {}", subject),
                    ItemType::Review,
                    Effort::Small,
                )
                .with_priority(10)
                .after(0),
            ],
            Level::Task => vec![
                ChildSpec::new(
                    &format!("Prepare {}", subject),
                    item.item_type,
                    Effort::Small,
                )
                .with_priority(20),
                ChildSpec::new(
                    &format!("Check {}", subject),
                    ItemType::Testing,
                    Effort::Trivial,
                )
                .with_priority(10),
            ],
            Level::Subtask => Vec::new(),
        }
        .into_iter()
        .map(|spec| {
            let description = format!("{} (part of: {})", spec.title, subject);
            spec.with_description(&description)
        })
        .collect()
    }
}

#[async_trait]
impl Generator for TemplateGenerator {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<ChildSpec>, GeneratorError> {
        Ok(self.children_for(item))
    }
}
