//! End-to-end runs: decompose a goal, plan its leaves and execute them.

use std::sync::Arc;
use std::time::Duration;

use taskweave::config::Config;
use taskweave::core::{Effort, ItemStatus, ItemType, Level, Role, WorkItem};
use taskweave::decompose::{ChildSpec, Decomposer, TemplateGenerator};
use taskweave::orchestration::{
    DryRunWorker, Pipeline, TaskError, Worker, WorkerRegistry,
};

use crate::fixtures::{Behavior, MockWorker, ScriptedGenerator};

fn dry_run_team(per_hour: Duration) -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    for worker in DryRunWorker::full_team() {
        registry.register(Arc::new(worker.with_time_per_hour(per_hour)));
    }
    registry
}

fn config(target: Level) -> Config {
    let mut config = Config::default();
    config.decomposition.target_level = target;
    config
}

/// Test: Effort roll-up
/// Given an unestimated goal with Medium, Large and Small children
/// When decomposed one level
/// Then the tree totals 14 hours
#[tokio::test]
async fn test_tree_effort_totals_children() {
    let generator = ScriptedGenerator::new().with_children(
        "Launch beta",
        vec![
            ChildSpec::new("Invite testers", ItemType::Planning, Effort::Medium),
            ChildSpec::new("Fix blockers", ItemType::Implementation, Effort::Large),
            ChildSpec::new("Collect feedback", ItemType::Research, Effort::Small),
        ],
    );

    let decomposition = Decomposer::default()
        .decompose(WorkItem::goal("Launch beta"), Level::Feature, &generator)
        .await;

    assert_eq!(decomposition.arena.len(), 4);
    assert_eq!(decomposition.total_effort(), 14);
    assert_eq!(decomposition.tree().unwrap().total_effort(), 14);
    assert_eq!(decomposition.root_item().unwrap().own_hours(), 0);
}

/// Test: Full pipeline with simulated workers
/// Given the template generator and one dry-run worker per role
/// When a goal is run down to tasks
/// Then all 30 leaves complete, the goal rolls up to completed and the
/// report covers every item of the tree
#[tokio::test(start_paused = true)]
async fn test_goal_runs_to_completion() {
    let pipeline = Pipeline::new(&config(Level::Task), dry_run_team(Duration::from_millis(10)));

    let outcome = pipeline
        .run(WorkItem::goal("Build a recipe sharing site"), &TemplateGenerator::new())
        .await
        .unwrap();

    // 5 features x 3 stories x 2 tasks
    assert_eq!(outcome.plan.item_count(), 30);
    // goal + 5 features + 15 stories + 30 tasks
    assert_eq!(outcome.decomposition.arena.len(), 51);
    assert_eq!(outcome.report.results.len(), outcome.decomposition.arena.len());
    assert_eq!(outcome.report.summary.total, 51);
    assert!(outcome.report.summary.all_succeeded());
    assert!(outcome
        .decomposition
        .arena
        .iter()
        .all(|item| item.status == ItemStatus::Completed));
    assert_eq!(
        outcome.decomposition.root_item().unwrap().status,
        ItemStatus::Completed
    );

    let stats = pipeline.orchestrator().statistics();
    assert_eq!(stats.completed_tasks, 30);
    assert_eq!(stats.total_workers, Role::ALL.len());
}

/// Test: Prepared plans respect the tree
/// Given the template decomposition of a goal
/// When prepared
/// Then every dependency of an actionable leaf is planned in an earlier phase
#[tokio::test]
async fn test_prepared_plan_orders_lowered_dependencies() {
    let pipeline = Pipeline::new(&config(Level::Story), WorkerRegistry::new());
    let prepared = pipeline
        .prepare(WorkItem::goal("Migrate billing"), &TemplateGenerator::new())
        .await
        .unwrap();

    // 5 features x 3 stories
    assert_eq!(prepared.actionable.len(), 15);
    for item in &prepared.actionable {
        assert!(item.is_leaf());
        let own = prepared.plan.phase_of(&item.id).unwrap();
        for dep in &item.dependencies {
            assert!(prepared.plan.phase_of(dep).unwrap() < own);
        }
    }
    assert!(prepared.plan.critical_path_hours > 0);
    assert!(prepared.plan.resource_requirements.contains_key(&Role::Qa));
}

/// Test: Decomposition failure
/// Given a goal whose second feature cannot be expanded
/// When the goal runs
/// Then that feature is reported blocked and the goal rolls up to blocked
#[tokio::test]
async fn test_generator_failure_surfaces_as_blocked() {
    let generator = ScriptedGenerator::new()
        .with_children(
            "Payments",
            vec![
                ChildSpec::new("Card checkout", ItemType::Implementation, Effort::Large).with_priority(2),
                ChildSpec::new("Refunds", ItemType::Implementation, Effort::Medium).with_priority(1),
            ],
        )
        .with_children(
            "Card checkout",
            vec![
                ChildSpec::new("Tokenize cards", ItemType::Implementation, Effort::Medium),
                ChildSpec::new("Charge cards", ItemType::Implementation, Effort::Medium),
            ],
        )
        .failing_on("Refunds");
    let registry = WorkerRegistry::new().with(MockWorker::new("coder-1", Role::Coder));
    let pipeline = Pipeline::new(&config(Level::Story), registry);

    let outcome = pipeline.run(WorkItem::goal("Payments"), &generator).await.unwrap();

    let refunds = outcome
        .decomposition
        .arena
        .iter()
        .find(|item| item.title == "Refunds")
        .unwrap();
    assert_eq!(refunds.status, ItemStatus::Blocked);
    match &outcome.report.get(&refunds.id).unwrap().error {
        Some(TaskError::GeneratorFailed { reason }) => assert!(reason.contains("cannot expand Refunds")),
        other => panic!("expected generator failure, got {other:?}"),
    }
    // two stories and the feature above them
    assert_eq!(outcome.report.summary.completed, 3);
    // Refunds and the goal
    assert_eq!(outcome.report.summary.blocked, 2);
    let root = outcome.decomposition.root;
    assert_eq!(outcome.report.status_of(&root), Some(ItemStatus::Blocked));
    assert_eq!(
        outcome.decomposition.root_item().unwrap().status,
        ItemStatus::Blocked
    );
}

/// Test: Failing role
/// Given a qa worker that fails everything
/// When a goal runs
/// Then testing items fail, their dependents are blocked and the goal fails
#[tokio::test(start_paused = true)]
async fn test_failing_role_fails_goal() {
    let mut registry = WorkerRegistry::new();
    for worker in DryRunWorker::full_team() {
        let worker = if worker.role() == Role::Qa { worker.failing() } else { worker };
        registry.register(Arc::new(worker));
    }
    let pipeline = Pipeline::new(&config(Level::Story), registry);

    let outcome = pipeline
        .run(WorkItem::goal("Search"), &TemplateGenerator::new())
        .await
        .unwrap();

    let summary = outcome.report.summary;
    assert!(summary.failed >= 1);
    assert!(summary.blocked >= 1);
    assert_eq!(summary.skipped, 0);
    // goal + 5 features + 15 stories
    assert_eq!(summary.total, 21);
    assert!(outcome
        .decomposition
        .arena
        .iter()
        .filter(|item| item.item_type == ItemType::Testing && item.is_leaf())
        .all(|item| item.status != ItemStatus::Completed));
    assert_eq!(
        outcome.decomposition.root_item().unwrap().status,
        ItemStatus::Failed
    );
}

/// Test: Cancelling a pipeline run
/// Given slow workers
/// When the run is cancelled early
/// Then unfinished leaves are skipped and the report says so
#[tokio::test(start_paused = true)]
async fn test_cancelled_pipeline_skips_remaining_leaves() {
    let registry = WorkerRegistry::new()
        .with(MockWorker::new("coord", Role::Coordinator).by_default(Behavior::WaitForCancel));
    let pipeline = Pipeline::new(&config(Level::Feature), registry);

    let token = pipeline.orchestrator().cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let outcome = pipeline
        .run(WorkItem::goal("Reorganize docs"), &TemplateGenerator::new())
        .await
        .unwrap();

    assert!(outcome.report.cancelled);
    // 5 features and the goal
    assert_eq!(outcome.report.summary.skipped, 6);
    assert_eq!(
        outcome.decomposition.root_item().unwrap().status,
        ItemStatus::Skipped
    );
}
