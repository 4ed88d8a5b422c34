//! Topological batching - Kahn-style layering with resource packing.
//!
//! Each iteration takes the zero-in-degree ready set, orders it with the
//! configured strategy, and lets the resource scheduler seal one batch.
//! Deferred tasks stay ready and are reconsidered next iteration, so
//! resource pressure produces extra sub-batches instead of violating the
//! dependency layering.

use std::collections::{HashMap, HashSet};

use seqplan_core::{Task, TaskId};
use tracing::{debug, warn};

use crate::config::OptimizerConfig;
use crate::graph::DepGraph;
use crate::scheduler::ResourceScheduler;
use crate::strategy::{PoolOrdering, StrategyContext, StrategyDispatch};

/// Split the task set into dependency-respecting, resource-bounded batches.
///
/// Every input task lands in exactly one batch. If the ready set drains
/// while tasks remain (residual inconsistency; cycles are already broken
/// upstream), the remainder is forced into one final batch in ascending-id
/// order rather than looping forever.
pub fn build_batches(
    tasks: &[Task],
    graph: &DepGraph,
    config: &OptimizerConfig,
    ordering: &StrategyDispatch,
    critical_path: &HashSet<TaskId>,
) -> Vec<Vec<TaskId>> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let mut in_degree = graph.in_degrees(tasks);

    let mut ready: Vec<TaskId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| id.clone())
        .collect();
    ready.sort();

    let scheduler = ResourceScheduler::new(config);
    let mut utilization: HashMap<String, f64> = HashMap::new();
    let mut batches: Vec<Vec<TaskId>> = Vec::new();
    let mut batched: HashSet<TaskId> = HashSet::new();

    while batched.len() < tasks.len() {
        if ready.is_empty() {
            let mut rest: Vec<TaskId> = tasks
                .iter()
                .filter(|t| !batched.contains(&t.id))
                .map(|t| t.id.clone())
                .collect();
            rest.sort();
            warn!(count = rest.len(), "forcing unbatchable tasks into a final batch");
            batches.push(rest);
            break;
        }

        let mut pool: Vec<&Task> = ready.iter().filter_map(|id| by_id.get(id).copied()).collect();
        let ctx = StrategyContext {
            config,
            critical_path,
            utilization: &utilization,
        };
        ordering.order(&mut pool, &ctx);

        let placed = scheduler.pack(&pool);
        debug!(batch = batches.len(), size = placed.len(), "sealed execution batch");

        let placed_set: HashSet<&TaskId> = placed.iter().collect();
        ready.retain(|id| !placed_set.contains(id));

        for id in &placed {
            for dependent in graph.dependents_of(id) {
                if let Some(d) = in_degree.get_mut(dependent) {
                    *d = d.saturating_sub(1);
                    if *d == 0 {
                        ready.push(dependent.clone());
                    }
                }
            }
        }
        ready.sort();

        observe_utilization(&mut utilization, &placed, &by_id, config, batches.len());
        batched.extend(placed.iter().cloned());
        batches.push(placed);
    }

    batches
}

/// Fold one sealed batch into the running per-type utilization average.
fn observe_utilization(
    utilization: &mut HashMap<String, f64>,
    batch: &[TaskId],
    by_id: &HashMap<&TaskId, &Task>,
    config: &OptimizerConfig,
    prior_batches: usize,
) {
    for constraint in &config.resource_constraints {
        let used = batch
            .iter()
            .filter_map(|id| by_id.get(id))
            .filter(|t| t.uses_resource(&constraint.resource_type))
            .count();
        let sample = (used as f64 / f64::from(constraint.max_concurrent)).min(1.0);
        let entry = utilization.entry(constraint.resource_type.clone()).or_insert(0.0);
        *entry = (*entry * prior_batches as f64 + sample) / (prior_batches as f64 + 1.0);
    }
}
