use std::collections::HashMap;
use std::time::Duration;

use clap::{Parser, Subcommand};

use taskweave::config::Config;
use taskweave::core::{ItemArena, ItemId, ItemTree, Level, Role, WorkItem};
use taskweave::decompose::TemplateGenerator;
use taskweave::orchestration::{
    DryRunWorker, ExecutionPlan, Pipeline, PreparedRun, RunOutcome, Worker, WorkerRegistry,
};
use taskweave::{Error, Result};

/// Taskweave - break goals into work items and run them in dependency order
#[derive(Parser, Debug)]
#[command(name = "taskweave")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    TASKWEAVE_DEBUG=1     Enable debug logging (alternative to --debug)\n    TASKWEAVE_LOG=<dir>   Full log filter directive, e.g. taskweave=trace")]
pub struct Cli {
    /// Enable debug logging (written to stderr)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Level at which decomposition stops (epic, feature, story, task, subtask)
    #[arg(long, global = true)]
    pub target_level: Option<Level>,

    /// Maximum number of tree levels, counting the goal
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Decompose a goal and print its execution plan
    Plan {
        /// The goal in natural language
        goal: String,

        /// Print the tree and plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decompose a goal and execute it with simulated workers
    Run {
        /// The goal in natural language
        goal: String,

        /// Make workers of this role fail (repeatable)
        #[arg(long = "fail-role")]
        fail_roles: Vec<Role>,

        /// Leave out workers of this role (repeatable)
        #[arg(long)]
        without: Vec<Role>,

        /// Simulated milliseconds per estimated hour of work
        #[arg(long, default_value_t = 10)]
        ms_per_hour: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    taskweave::log::init_with_debug(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(level) = cli.target_level {
        config.decomposition.target_level = level;
    }
    if let Some(depth) = cli.max_depth {
        config.decomposition.max_depth = depth;
    }
    config.validate()?;

    match cli.command {
        Command::Plan { goal, json } => run_plan(&config, &goal, json).await,
        Command::Run {
            goal,
            fail_roles,
            without,
            ms_per_hour,
            json,
        } => {
            let registry = dry_run_team(&fail_roles, &without, Duration::from_millis(ms_per_hour));
            run_goal(&config, registry, &goal, json).await
        }
        Command::Config { save } => {
            if save {
                config.save()?;
                println!("Saved to {}", Config::config_path()?.display());
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

fn dry_run_team(fail_roles: &[Role], without: &[Role], per_hour: Duration) -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    for worker in DryRunWorker::full_team() {
        let role = worker.role();
        if without.contains(&role) {
            continue;
        }
        let worker = worker.with_time_per_hour(per_hour);
        let worker = if fail_roles.contains(&role) {
            worker.failing()
        } else {
            worker
        };
        registry = registry.with(worker);
    }
    registry
}

fn goal_item(goal: &str) -> Result<WorkItem> {
    if goal.trim().is_empty() {
        return Err(Error::Validation("goal must not be empty".to_string()));
    }
    Ok(WorkItem::goal(goal))
}

async fn run_plan(config: &Config, goal: &str, json: bool) -> Result<()> {
    let pipeline = Pipeline::new(config, WorkerRegistry::new());
    let prepared = pipeline.prepare(goal_item(goal)?, &TemplateGenerator::new()).await?;

    if json {
        let output = serde_json::json!({
            "tree": prepared.decomposition.tree(),
            "plan": prepared.plan,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(tree) = prepared.decomposition.tree() {
        print_tree(&tree, 0);
    }
    println!();
    print_plan(&prepared);
    Ok(())
}

async fn run_goal(config: &Config, registry: WorkerRegistry, goal: &str, json: bool) -> Result<()> {
    let pipeline = Pipeline::new(config, registry);
    let outcome = pipeline.run(goal_item(goal)?, &TemplateGenerator::new()).await?;

    if json {
        let output = serde_json::json!({
            "tree": outcome.decomposition.tree(),
            "plan": outcome.plan,
            "report": outcome.report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_outcome(&outcome);
    Ok(())
}

fn print_tree(tree: &ItemTree, depth: usize) {
    let item = &tree.item;
    let effort = item
        .effort
        .map(|e| format!("{}h", e.hours()))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}{} [{} {}] {} ({}, total {}h) {}",
        "  ".repeat(depth),
        item.id.short(),
        item.level,
        item.item_type,
        item.title,
        effort,
        tree.total_effort(),
        item.status
    );
    for child in &tree.children {
        print_tree(child, depth + 1);
    }
}

fn titles(arena: &ItemArena) -> HashMap<ItemId, String> {
    arena
        .iter()
        .map(|item| (item.id, item.title.clone()))
        .collect()
}

fn print_phases(plan: &ExecutionPlan, names: &HashMap<ItemId, String>) {
    for phase in &plan.phases {
        println!("Phase {}:", phase.index + 1);
        for id in &phase.items {
            println!(
                "  {} {}",
                id.short(),
                names.get(id).map(String::as_str).unwrap_or("?")
            );
        }
    }
}

fn print_plan(prepared: &PreparedRun) {
    let plan = &prepared.plan;
    let names = titles(&prepared.decomposition.arena);

    print_phases(plan, &names);
    println!();
    let path: Vec<&str> = plan
        .critical_path
        .iter()
        .map(|id| names.get(id).map(String::as_str).unwrap_or("?"))
        .collect();
    println!("Critical path ({}h): {}", plan.critical_path_hours, path.join(" -> "));
    println!("Resources:");
    for (role, count) in &plan.resource_requirements {
        println!("  {role}: {count}");
    }
    println!(
        "Estimated: {}h across {} phases ({} items, {}h total effort)",
        plan.estimated_hours,
        plan.phases.len(),
        plan.item_count(),
        prepared.decomposition.total_effort()
    );
    let blocked = prepared.decomposition.blocked();
    if !blocked.is_empty() {
        println!("Blocked during decomposition: {}", blocked.len());
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let names = titles(&outcome.decomposition.arena);
    for phase in &outcome.plan.phases {
        println!("Phase {}:", phase.index + 1);
        for id in &phase.items {
            let name = names.get(id).map(String::as_str).unwrap_or("?");
            match outcome.report.get(id) {
                Some(result) => {
                    let detail = result
                        .error
                        .as_ref()
                        .map(|e| format!(" ({e})"))
                        .unwrap_or_default();
                    println!(
                        "  {} {:<11} {}{}",
                        id.short(),
                        result.status.to_string(),
                        name,
                        detail
                    );
                }
                None => println!("  {} {:<11} {}", id.short(), "-", name),
            }
        }
    }
    println!();
    if let Some(root) = outcome.decomposition.root_item() {
        println!("Goal: {} ({})", root.title, root.status);
    }
    println!("{}", outcome.report.summary);
    println!("Took {}ms", outcome.report.duration_ms);
}
