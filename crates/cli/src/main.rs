//! seqplan CLI - produce execution plans from task documents.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, Level};

use seqplan_core::{DependencyEdge, ResourceConstraint, Task};
use seqplan_optimizer::{OptimizationResult, OptimizerConfig, SequenceOptimizer, Strategy};

#[derive(Parser)]
#[command(name = "seqplan")]
#[command(about = "Parallel execution sequence planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an execution plan from a JSON plan request
    Plan {
        /// Path to the plan request (tasks, dependencies, resource constraints)
        file: PathBuf,
        /// Scheduling strategy
        #[arg(long, default_value = "priority_weighted")]
        strategy: String,
        /// Max simultaneous tasks per batch
        #[arg(long, default_value = "4")]
        max_parallel: usize,
        /// Disable resource-aware load balancing
        #[arg(long)]
        no_load_balancing: bool,
        /// Emit the full plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the strategies the planner supports
    Strategies,
}

/// On-disk request shape: tasks plus optional dependencies and constraints.
/// Dependency edges accept both `from`/`to` and
/// `dependentTaskId`/`dependsOnTaskId` field conventions.
#[derive(Deserialize)]
struct PlanRequest {
    tasks: Vec<Task>,
    #[serde(default)]
    dependencies: Vec<DependencyEdge>,
    #[serde(default, alias = "resourceConstraints")]
    resource_constraints: Vec<ResourceConstraint>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            file,
            strategy,
            max_parallel,
            no_load_balancing,
            json,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading plan request {}", file.display()))?;
            let request: PlanRequest =
                serde_json::from_str(&raw).context("parsing plan request")?;

            let strategy: Strategy = strategy.parse()?;
            let max_parallel = NonZeroUsize::new(max_parallel)
                .context("--max-parallel must be at least 1")?;

            let mut config = OptimizerConfig::new()
                .with_strategy(strategy)
                .with_max_parallelism(max_parallel)
                .with_load_balancing(!no_load_balancing);
            for constraint in request.resource_constraints {
                config = config.with_resource_constraint(constraint);
            }

            let optimizer = SequenceOptimizer::new(config)?;
            let result = optimizer.optimize(&request.tasks, &request.dependencies);
            info!(batches = result.depth(), "plan ready");

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_plan(&result);
            }
        }
        Commands::Strategies => {
            for s in [
                Strategy::ShortestPath,
                Strategy::CriticalPath,
                Strategy::PriorityWeighted,
                Strategy::ResourceBalanced,
                Strategy::AdaptiveDynamic,
            ] {
                println!("{}", s.as_str());
            }
        }
    }

    Ok(())
}

fn print_plan(result: &OptimizationResult) {
    println!("Execution plan ({} batches)", result.depth());
    for batch in &result.execution_order {
        let ids: Vec<&str> = batch.task_ids.iter().map(|t| t.as_str()).collect();
        println!(
            "  batch {} | {:.1} units | {}",
            batch.index,
            batch.completion_time,
            ids.join(", "),
        );
    }

    if !result.parallel_groups.is_empty() {
        println!("Parallel groups");
        for group in &result.parallel_groups {
            let bottlenecks: Vec<&str> =
                group.bottlenecks.iter().map(|t| t.as_str()).collect();
            println!(
                "  batch {} | {} tasks | bottlenecks: {}",
                group.batch_index,
                group.task_ids.len(),
                bottlenecks.join(", "),
            );
        }
    }

    let cp: Vec<&str> = result.critical_path.iter().map(|t| t.as_str()).collect();
    println!("Critical path: {}", cp.join(" -> "));

    let m = &result.metrics;
    println!("Metrics");
    println!("  total completion time: {:.1}", m.total_completion_time);
    println!("  critical path duration: {:.1}", m.critical_path_duration);
    println!("  resource efficiency: {:.0}%", m.resource_efficiency * 100.0);
    println!("  parallelization: {:.0}%", m.parallelization_ratio * 100.0);
    println!("  optimization score: {:.0}/100", m.optimization_score);

    println!("Recommendations");
    for recommendation in &result.recommendations {
        println!("  - {recommendation}");
    }
}
