//! The public entry point: configuration in, execution plan out.

use std::collections::{HashMap, HashSet};

use seqplan_core::{DependencyEdge, Task, TaskId};
use tracing::{info, warn};

use crate::analysis;
use crate::batcher;
use crate::config::{ConfigError, OptimizerConfig};
use crate::graph::DepGraph;
use crate::result::{ExecutionBatch, OptimizationResult};
use crate::strategy::StrategyDispatch;

/// Produces dependency-respecting, resource-bounded, parallelism-optimized
/// execution plans.
///
/// The optimizer is a pure computation: identical inputs produce identical
/// plans, and `optimize` never fails on imperfect data. Malformed efforts
/// are defaulted, dangling and circular dependencies pruned, and resource
/// over-subscription resolved by deferral. The only fallible surface is
/// configuration validation at construction.
pub struct SequenceOptimizer {
    config: OptimizerConfig,
}

impl SequenceOptimizer {
    /// Create an optimizer, validating the configuration once.
    pub fn new(config: OptimizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an optimizer with the default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: OptimizerConfig::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Produce an execution plan for the given tasks and dependencies.
    pub fn optimize(&self, tasks: &[Task], dependencies: &[DependencyEdge]) -> OptimizationResult {
        if tasks.is_empty() {
            return OptimizationResult::empty();
        }

        let tasks = dedupe_tasks(tasks);
        info!(
            tasks = tasks.len(),
            edges = dependencies.len(),
            strategy = self.config.strategy.as_str(),
            "optimizing execution sequence"
        );

        let graph = DepGraph::build(&tasks, dependencies);
        let critical = analysis::critical_path(&tasks, &graph);
        let critical_set = critical.id_set();

        let ordering = StrategyDispatch::for_strategy(self.config.strategy);
        let batches = batcher::build_batches(&tasks, &graph, &self.config, &ordering, &critical_set);

        let parallel_groups = analysis::parallel_groups(&tasks, &batches, &self.config);
        let (metrics, recommendations) =
            analysis::compute_metrics(&tasks, &batches, &critical, &self.config);

        let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
        let execution_order = batches
            .into_iter()
            .enumerate()
            .map(|(index, task_ids)| {
                let completion_time = task_ids
                    .iter()
                    .filter_map(|id| by_id.get(id))
                    .map(|t| t.effort())
                    .fold(0.0, f64::max);
                ExecutionBatch {
                    index,
                    task_ids,
                    completion_time,
                }
            })
            .collect();

        OptimizationResult {
            execution_order,
            parallel_groups,
            critical_path: critical.ids,
            metrics,
            recommendations,
        }
    }
}

impl Default for SequenceOptimizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Keep the first task for each id; later duplicates are logged and dropped.
fn dedupe_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut seen: HashSet<&TaskId> = HashSet::with_capacity(tasks.len());
    let mut out = Vec::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(&task.id) {
            warn!(task = %task.id, "dropping duplicate task id");
            continue;
        }
        out.push(task.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strategy;
    use seqplan_core::{Priority, ResourceConstraint};
    use std::num::NonZeroUsize;

    fn chain_tasks() -> (Vec<Task>, Vec<DependencyEdge>) {
        let tasks: Vec<Task> =
            ["a", "b", "c", "d", "e"].map(|id| Task::new(id, id).with_effort(1.0)).into();
        let edges = vec![
            DependencyEdge::new("b", "a"),
            DependencyEdge::new("c", "b"),
            DependencyEdge::new("d", "c"),
            DependencyEdge::new("e", "d"),
        ];
        (tasks, edges)
    }

    fn batch_index_of(result: &OptimizationResult, id: &str) -> usize {
        result
            .execution_order
            .iter()
            .position(|b| b.task_ids.iter().any(|t| t.as_str() == id))
            .unwrap()
    }

    #[test]
    fn empty_input_yields_empty_plan() {
        let result = SequenceOptimizer::with_defaults().optimize(&[], &[]);
        assert!(result.execution_order.is_empty());
        assert!(result.parallel_groups.is_empty());
        assert!(result.critical_path.is_empty());
        assert_eq!(result.metrics.total_completion_time, 0.0);
        assert_eq!(result.metrics.optimization_score, 0.0);
    }

    #[test]
    fn linear_chain_scenario() {
        let (tasks, edges) = chain_tasks();
        let result = SequenceOptimizer::with_defaults().optimize(&tasks, &edges);

        assert_eq!(result.depth(), 5);
        assert!(result.execution_order.iter().all(|b| b.task_ids.len() == 1));
        let order: Vec<&str> = result
            .execution_order
            .iter()
            .flat_map(|b| b.task_ids.iter().map(|t| t.as_str()))
            .collect();
        assert_eq!(order, ["a", "b", "c", "d", "e"]);
        let cp: Vec<&str> = result.critical_path.iter().map(|t| t.as_str()).collect();
        assert_eq!(cp, ["a", "b", "c", "d", "e"]);
        assert_eq!(result.metrics.parallelization_ratio, 0.0);
    }

    #[test]
    fn independent_tasks_pack_into_two_batches() {
        let tasks: Vec<Task> = (0..5).map(|i| Task::new(format!("t{i}"), "t")).collect();
        let config =
            OptimizerConfig::default().with_max_parallelism(NonZeroUsize::new(3).unwrap());
        let result = SequenceOptimizer::new(config).unwrap().optimize(&tasks, &[]);

        let sizes: Vec<usize> =
            result.execution_order.iter().map(|b| b.task_ids.len()).collect();
        assert_eq!(sizes, [3, 2]);
        assert_eq!(result.total_tasks(), 5);
        assert!(result.metrics.parallelization_ratio > 0.0);
    }

    #[test]
    fn dependency_soundness_and_coverage() {
        let tasks: Vec<Task> = (0..8).map(|i| Task::new(format!("t{i}"), "t")).collect();
        let edges = vec![
            DependencyEdge::new("t3", "t0"),
            DependencyEdge::new("t3", "t1"),
            DependencyEdge::new("t4", "t2"),
            DependencyEdge::new("t5", "t3"),
            DependencyEdge::new("t6", "t4").with_delay(1.0),
            DependencyEdge::new("t7", "t5"),
            DependencyEdge::new("t7", "t6"),
        ];
        let result = SequenceOptimizer::with_defaults().optimize(&tasks, &edges);

        // Coverage: each task appears exactly once.
        let mut all: Vec<&TaskId> =
            result.execution_order.iter().flat_map(|b| &b.task_ids).collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), tasks.len());

        // Soundness: prerequisites land in strictly earlier batches.
        for edge in &edges {
            assert!(
                batch_index_of(&result, edge.depends_on.as_str())
                    < batch_index_of(&result, edge.dependent.as_str()),
                "{} must precede {}",
                edge.depends_on,
                edge.dependent
            );
        }
    }

    #[test]
    fn circular_dependency_still_terminates() {
        let tasks = vec![Task::new("a", "a"), Task::new("b", "b")];
        let edges = vec![DependencyEdge::new("a", "b"), DependencyEdge::new("b", "a")];
        let result = SequenceOptimizer::with_defaults().optimize(&tasks, &edges);

        assert_eq!(result.total_tasks(), 2);
        assert!(!result.execution_order.is_empty());
    }

    #[test]
    fn dangling_dependencies_are_ignored() {
        let tasks = vec![Task::new("a", "a"), Task::new("b", "b")];
        let edges = vec![
            DependencyEdge::new("b", "a"),
            DependencyEdge::new("b", "missing"),
            DependencyEdge::new("ghost", "a"),
        ];
        let result = SequenceOptimizer::with_defaults().optimize(&tasks, &edges);
        assert_eq!(result.total_tasks(), 2);
    }

    #[test]
    fn resource_bound_is_respected_in_every_batch() {
        let tasks: Vec<Task> = (0..6)
            .map(|i| Task::new(format!("t{i}"), "t").with_capability("backend"))
            .collect();
        let config = OptimizerConfig::default()
            .with_resource_constraint(ResourceConstraint::new("backend", 2));
        let result = SequenceOptimizer::new(config).unwrap().optimize(&tasks, &[]);

        for batch in &result.execution_order {
            assert!(batch.task_ids.len() <= 2);
        }
        assert_eq!(result.total_tasks(), 6);
    }

    #[test]
    fn parallelism_cap_is_respected() {
        let tasks: Vec<Task> = (0..9).map(|i| Task::new(format!("t{i}"), "t")).collect();
        let config =
            OptimizerConfig::default().with_max_parallelism(NonZeroUsize::new(2).unwrap());
        let result = SequenceOptimizer::new(config).unwrap().optimize(&tasks, &[]);
        assert!(result.max_batch_width() <= 2);
    }

    #[test]
    fn priority_strategy_front_loads_heavy_weights() {
        let priorities = [
            Priority::Low,
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Critical,
        ];
        let tasks: Vec<Task> = priorities
            .iter()
            .enumerate()
            .map(|(i, p)| Task::new(format!("t{i}"), "t").with_priority(*p))
            .collect();
        let config = OptimizerConfig::default()
            .with_strategy(Strategy::PriorityWeighted)
            .with_max_parallelism(NonZeroUsize::new(2).unwrap());
        let optimizer = SequenceOptimizer::new(config).unwrap();
        let result = optimizer.optimize(&tasks, &[]);

        // Median weight of {1,1,2,4,8} is 2; the first batch must hold at
        // least one task at or above it.
        let first = &result.execution_order[0];
        let max_first_weight = first
            .task_ids
            .iter()
            .map(|id| {
                let task = tasks.iter().find(|t| &t.id == id).unwrap();
                optimizer.config().priority_weight(task.priority)
            })
            .fold(0.0, f64::max);
        assert!(max_first_weight >= 2.0);
    }

    #[test]
    fn metrics_bounds_hold_for_every_strategy() {
        let (tasks, edges) = chain_tasks();
        for strategy in [
            Strategy::ShortestPath,
            Strategy::CriticalPath,
            Strategy::PriorityWeighted,
            Strategy::ResourceBalanced,
            Strategy::AdaptiveDynamic,
        ] {
            let config = OptimizerConfig::default().with_strategy(strategy);
            let result = SequenceOptimizer::new(config).unwrap().optimize(&tasks, &edges);
            let m = &result.metrics;
            assert!((0.0..=1.0).contains(&m.resource_efficiency), "{strategy:?}");
            assert!((0.0..=1.0).contains(&m.parallelization_ratio), "{strategy:?}");
            assert!((0.0..=100.0).contains(&m.optimization_score), "{strategy:?}");
            assert!(m.total_completion_time >= 1.0, "{strategy:?}");
        }
    }

    #[test]
    fn identical_inputs_produce_identical_plans() {
        let tasks: Vec<Task> = (0..20)
            .map(|i| Task::new(format!("t{i:02}"), "t").with_effort((i % 4 + 1) as f64))
            .collect();
        let edges: Vec<DependencyEdge> = (1..20)
            .step_by(3)
            .map(|i| DependencyEdge::new(format!("t{i:02}"), format!("t{:02}", i - 1)))
            .collect();

        let optimizer = SequenceOptimizer::with_defaults();
        let first = optimizer.optimize(&tasks, &edges);
        let second = optimizer.optimize(&tasks, &edges);
        assert_eq!(first.execution_order, second.execution_order);
        assert_eq!(first.critical_path, second.critical_path);
    }

    #[test]
    fn duplicate_task_ids_keep_the_first() {
        let tasks = vec![
            Task::new("a", "first").with_effort(2.0),
            Task::new("a", "second").with_effort(9.0),
            Task::new("b", "b"),
        ];
        let result = SequenceOptimizer::with_defaults().optimize(&tasks, &[]);
        assert_eq!(result.total_tasks(), 2);
        assert_eq!(result.metrics.total_completion_time, 2.0);
    }

    #[test]
    fn larger_graphs_cover_all_tasks() {
        // 50 tasks in chained clusters, mirroring the scale the source
        // system was exercised at.
        let tasks: Vec<Task> = (0..50)
            .map(|i| {
                Task::new(format!("t{i:02}"), "t")
                    .with_effort((i % 5 + 1) as f64)
                    .with_capability(if i % 2 == 0 { "backend" } else { "frontend" })
            })
            .collect();
        let mut edges = Vec::new();
        for i in 1..50 {
            if i % 7 != 0 {
                edges.push(DependencyEdge::new(
                    format!("t{i:02}"),
                    format!("t{:02}", i - 1),
                ));
            }
        }
        let config = OptimizerConfig::default()
            .with_resource_constraint(ResourceConstraint::new("backend", 3))
            .with_resource_constraint(ResourceConstraint::new("frontend", 3));
        let result = SequenceOptimizer::new(config).unwrap().optimize(&tasks, &edges);

        assert_eq!(result.total_tasks(), 50);
        let ids: HashSet<&str> = result
            .execution_order
            .iter()
            .flat_map(|b| b.task_ids.iter().map(|t| t.as_str()))
            .collect();
        assert_eq!(ids.len(), 50);
    }
}
