//! Planning over realistic item sets: phase layering, implicit sibling
//! ordering and cycle detection.

use taskweave::analysis::{actionable_items, annotate_arena, annotate_dependencies};
use taskweave::core::{Effort, ItemArena, ItemId, ItemStatus, ItemType, Level, WorkItem};
use taskweave::config::Config;
use taskweave::decompose::ChildSpec;
use taskweave::orchestration::{CriticalPathMode, Pipeline, Planner, WorkerRegistry};
use taskweave::Error;

use crate::fixtures::{by_title, diamond, task, ScriptedGenerator};

/// Test: Phase batching
/// Given T1, T2 independent, T3 after both and T4 after T3
/// When planned
/// Then the phases are [T1, T2], [T3], [T4]
#[test]
fn test_diamond_phases() {
    let items = diamond();
    let plan = Planner::default().plan(&items).unwrap();

    let phases: Vec<Vec<&str>> = plan
        .phases
        .iter()
        .map(|phase| {
            phase
                .items
                .iter()
                .map(|id| items.iter().find(|item| item.id == *id).unwrap().title.as_str())
                .collect()
        })
        .collect();
    assert_eq!(phases, vec![vec!["T1", "T2"], vec!["T3"], vec!["T4"]]);
    // max(2, 4) + 8 + 1
    assert_eq!(plan.estimated_hours, 13);
}

/// Test: Topological validity on a wide graph
/// Given 60 items where each depends on up to two earlier items
/// When planned
/// Then every item sits in a later phase than each of its dependencies
#[test]
fn test_every_dependency_precedes_its_dependent() {
    let mut items: Vec<WorkItem> = Vec::new();
    for i in 0..60usize {
        let mut item = task(&format!("item-{i}"), Effort::Small).with_priority((i % 5) as i32);
        if i >= 3 && i % 2 == 0 {
            item.add_dependency(items[i / 2].id);
        }
        if i >= 7 && i % 3 == 0 {
            item.add_dependency(items[i - 7].id);
        }
        items.push(item);
    }

    let plan = Planner::default().plan(&items).unwrap();

    assert_eq!(plan.item_count(), items.len());
    for item in &items {
        let own = plan.phase_of(&item.id).unwrap();
        for dep in &item.dependencies {
            assert!(plan.phase_of(dep).unwrap() < own, "{} ran too early", item.title);
        }
    }
}

/// Test: Planning is deterministic
#[test]
fn test_planning_twice_gives_the_same_plan() {
    let items = diamond();
    let first = Planner::default().plan(&items).unwrap();
    let second = Planner::default().plan(&items).unwrap();
    assert_eq!(first.phases, second.phases);
    assert_eq!(first.critical_path, second.critical_path);
}

/// Test: Cycle detection
/// Given A -> B -> C -> A and an unrelated D
/// When planned
/// Then planning fails naming exactly A, B and C
#[test]
fn test_cycle_names_its_members() {
    let mut a = task("A", Effort::Small);
    let b = task("B", Effort::Small).with_dependency(a.id);
    let c = task("C", Effort::Small).with_dependency(b.id);
    a.add_dependency(c.id);
    let d = task("D", Effort::Small);

    let err = Planner::default()
        .plan(&[a.clone(), b.clone(), c.clone(), d.clone()])
        .unwrap_err();

    let mut expected = vec![a.id, b.id, c.id];
    expected.sort();
    match err {
        Error::CycleDetected { members } => assert_eq!(members, expected),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

/// Test: Implicit sibling ordering
/// Given three siblings without explicit dependencies
/// When annotated and planned
/// Then they run one per phase in priority order
#[test]
fn test_annotated_siblings_run_sequentially() {
    let parent = WorkItem::goal("parent");
    let mut items: Vec<WorkItem> = [("low", 1), ("high", 9), ("mid", 5)]
        .into_iter()
        .map(|(title, priority)| {
            let mut item = task(title, Effort::Small).with_priority(priority);
            item.parent_id = Some(parent.id);
            item
        })
        .collect();

    assert_eq!(annotate_dependencies(&mut items), 2);
    let plan = Planner::default().plan(&items).unwrap();

    assert_eq!(plan.phases.len(), 3);
    assert_eq!(plan.phases[0].items, vec![by_title(&items, "high").id]);
    assert_eq!(plan.phases[1].items, vec![by_title(&items, "mid").id]);
    assert_eq!(plan.phases[2].items, vec![by_title(&items, "low").id]);
}

/// Test: Composite dependencies reach the leaves
/// Given feature F2 depending on feature F1, each with two leaves
/// When the leaves are lowered and planned
/// Then both F2 leaves run after both F1 leaves
#[test]
fn test_leaves_inherit_composite_dependencies() {
    let mut arena = ItemArena::new();
    let mut root = WorkItem::goal("root");
    root.status = ItemStatus::Decomposed;
    let root_id = arena.insert(root);

    let feature = |title: &str, priority: i32| {
        let mut item = WorkItem::new(title, "", Level::Feature, ItemType::Implementation)
            .with_priority(priority);
        item.parent_id = Some(root_id);
        item
    };
    let leaf = |title: &str, parent: ItemId, priority: i32| {
        let mut item = task(title, Effort::Small).with_priority(priority);
        item.parent_id = Some(parent);
        item
    };

    let f1 = arena.insert(feature("F1", 2));
    let f2 = arena.insert(feature("F2", 1));
    arena.insert(leaf("F1a", f1, 2));
    arena.insert(leaf("F1b", f1, 1));
    arena.insert(leaf("F2a", f2, 2));
    arena.insert(leaf("F2b", f2, 1));

    // F2 after F1, F1b after F1a, F2b after F2a.
    assert_eq!(annotate_arena(&mut arena), 3);
    let leaves = actionable_items(&arena);
    let plan = Planner::default().plan(&leaves).unwrap();

    let phase = |title: &str| plan.phase_of(&by_title(&leaves, title).id).unwrap();
    assert!(phase("F1a") < phase("F1b"));
    assert!(phase("F1b") < phase("F2a"));
    assert!(phase("F2a") < phase("F2b"));
    assert_eq!(plan.phases.len(), 4);
}

/// Test: Critical path modes
/// Given a heavy independent item and a light two-item chain
/// When planned in both modes
/// Then the exact mode follows real edges only
#[test]
fn test_critical_path_modes_differ() {
    let heavy = task("heavy", Effort::ExtraLarge);
    let first = task("first", Effort::Medium);
    let second = task("second", Effort::Large).with_dependency(first.id);
    let items = vec![heavy.clone(), first.clone(), second.clone()];

    let heaviest = Planner::default().plan(&items).unwrap();
    assert_eq!(heaviest.critical_path, vec![heavy.id, second.id]);
    assert_eq!(heaviest.critical_path_hours, 24);

    let exact = Planner::with_mode(CriticalPathMode::LongestPath)
        .plan(&items)
        .unwrap();
    assert_eq!(exact.critical_path, vec![heavy.id]);
    assert_eq!(exact.critical_path_hours, 16);
}

/// Test: Explicit sibling edges win over priority
/// Given a high-priority child that explicitly waits on a low-priority sibling
/// When the goal is prepared
/// Then planning succeeds and the low-priority child runs first
#[tokio::test]
async fn test_explicit_edge_against_priority_plans() {
    let generator = ScriptedGenerator::new().with_children(
        "Rewrite importer",
        vec![
            ChildSpec::new("Swap parser", ItemType::Implementation, Effort::Medium)
                .with_priority(2)
                .after(1),
            ChildSpec::new("Freeze format", ItemType::Design, Effort::Small).with_priority(1),
        ],
    );
    let mut config = Config::default();
    config.decomposition.target_level = Level::Feature;
    let pipeline = Pipeline::new(&config, WorkerRegistry::new());

    let prepared = pipeline
        .prepare(WorkItem::goal("Rewrite importer"), &generator)
        .await
        .unwrap();

    let phase = |title: &str| {
        prepared
            .plan
            .phase_of(&by_title(&prepared.actionable, title).id)
            .unwrap()
    };
    assert_eq!(prepared.plan.phases.len(), 2);
    assert!(phase("Freeze format") < phase("Swap parser"));
}
