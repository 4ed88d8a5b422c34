//! Critical path analysis, parallel-group analysis, and plan metrics.

use std::collections::{HashMap, HashSet};

use seqplan_core::{Task, TaskId};

use crate::config::OptimizerConfig;
use crate::graph::DepGraph;
use crate::result::{ParallelGroup, PlanMetrics};

/// The longest weighted dependency chain through the DAG.
#[derive(Debug, Clone, Default)]
pub struct CriticalPath {
    /// Path members, earliest first
    pub ids: Vec<TaskId>,
    /// Total weighted duration along the path
    pub duration: f64,
}

impl CriticalPath {
    /// Membership set for strategy lookups.
    pub fn id_set(&self) -> HashSet<TaskId> {
        self.ids.iter().cloned().collect()
    }
}

/// Longest path in the DAG by dynamic programming over topological order.
///
/// A task's chain weight is its own effort plus the best upstream chain,
/// where each hop adds the edge's minimum delay. Ties are broken toward
/// the smaller task id at both the hop and the endpoint, so the path is
/// deterministic.
pub fn critical_path(tasks: &[Task], graph: &DepGraph) -> CriticalPath {
    if tasks.is_empty() {
        return CriticalPath::default();
    }

    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let order = graph.topological_order(tasks);

    let mut dist: HashMap<TaskId, f64> = HashMap::new();
    let mut pred: HashMap<TaskId, TaskId> = HashMap::new();

    for id in &order {
        let effort = by_id.get(id).map(|t| t.effort()).unwrap_or(1.0);
        let mut best = 0.0;
        let mut best_pred: Option<&TaskId> = None;
        // Prerequisites are sorted by id; strict `>` keeps the smallest id on ties.
        for edge in graph.prerequisites_of(id) {
            let upstream = dist.get(&edge.depends_on).copied().unwrap_or(0.0) + edge.delay();
            if upstream > best {
                best = upstream;
                best_pred = Some(&edge.depends_on);
            }
        }
        dist.insert(id.clone(), effort + best);
        if let Some(p) = best_pred {
            pred.insert(id.clone(), p.clone());
        }
    }

    let mut end: Option<(&TaskId, f64)> = None;
    for id in &order {
        let d = dist[id];
        match end {
            Some((best_id, best_d)) if d < best_d || (d == best_d && id >= best_id) => {}
            _ => end = Some((id, d)),
        }
    }

    let (endpoint, duration) = match end {
        Some(e) => e,
        None => return CriticalPath::default(),
    };
    let mut ids = vec![endpoint.clone()];
    let mut cursor = endpoint;
    while let Some(p) = pred.get(cursor) {
        ids.push(p.clone());
        cursor = p;
    }
    ids.reverse();

    CriticalPath { ids, duration }
}

/// Identify beneficially co-schedulable clusters: every batch with two or
/// more members, annotated with per-type utilization and its bottlenecks.
pub fn parallel_groups(
    tasks: &[Task],
    batches: &[Vec<TaskId>],
    config: &OptimizerConfig,
) -> Vec<ParallelGroup> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let mut groups = Vec::new();

    for (batch_index, batch) in batches.iter().enumerate() {
        if batch.len() < 2 {
            continue;
        }
        let members: Vec<&Task> = batch.iter().filter_map(|id| by_id.get(id).copied()).collect();

        let max_effort = members.iter().map(|t| t.effort()).fold(0.0, f64::max);
        let mut bottlenecks: Vec<TaskId> = members
            .iter()
            .filter(|t| t.effort() == max_effort)
            .map(|t| t.id.clone())
            .collect();
        bottlenecks.sort();

        let mut resource_utilization = HashMap::new();
        let mut efficiency = 1.0f64;
        for constraint in &config.resource_constraints {
            let used = members
                .iter()
                .filter(|t| t.uses_resource(&constraint.resource_type))
                .count();
            if used == 0 {
                continue;
            }
            resource_utilization.insert(
                constraint.resource_type.clone(),
                (used as f64 / f64::from(constraint.max_concurrent)).min(1.0),
            );
            // Shared constrained resources stretch the group's wall time.
            if used > 1 {
                efficiency = efficiency.min(constraint.efficiency_factor());
            }
        }

        groups.push(ParallelGroup {
            batch_index,
            task_ids: batch.clone(),
            resource_utilization,
            bottlenecks,
            estimated_completion: max_effort / efficiency,
        });
    }

    groups
}

/// Compute plan metrics and the advisory recommendations derived from them.
pub fn compute_metrics(
    tasks: &[Task],
    batches: &[Vec<TaskId>],
    critical: &CriticalPath,
    config: &OptimizerConfig,
) -> (PlanMetrics, Vec<String>) {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();

    let batch_time = |batch: &Vec<TaskId>| -> f64 {
        batch
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|t| t.effort())
            .fold(0.0, f64::max)
    };
    let total_completion_time: f64 = batches.iter().map(batch_time).sum();

    let resource_efficiency = if config.resource_constraints.is_empty() || batches.is_empty() {
        // Nothing is constrained, so nothing is wasted.
        1.0
    } else {
        let mut sum = 0.0;
        let mut samples = 0u32;
        for batch in batches {
            for constraint in &config.resource_constraints {
                let used = batch
                    .iter()
                    .filter_map(|id| by_id.get(id))
                    .filter(|t| t.uses_resource(&constraint.resource_type))
                    .count();
                sum += (used as f64 / f64::from(constraint.max_concurrent)).min(1.0);
                samples += 1;
            }
        }
        sum / f64::from(samples)
    };

    let parallelization_ratio = if tasks.is_empty() {
        0.0
    } else {
        (tasks.len() - batches.len().min(tasks.len())) as f64 / tasks.len() as f64
    };

    let tightness = if total_completion_time > 0.0 {
        (critical.duration / total_completion_time).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let optimization_score = ((0.4 * resource_efficiency
        + 0.4 * parallelization_ratio
        + 0.2 * tightness)
        * 100.0)
        .clamp(0.0, 100.0);

    let metrics = PlanMetrics {
        total_completion_time,
        critical_path_duration: critical.duration,
        resource_efficiency,
        parallelization_ratio,
        optimization_score,
    };
    let recommendations = recommend(&metrics, tightness, config);
    (metrics, recommendations)
}

/// Threshold-triggered advisory text. Purely informational.
fn recommend(metrics: &PlanMetrics, tightness: f64, config: &OptimizerConfig) -> Vec<String> {
    let mut out = Vec::new();

    if metrics.parallelization_ratio < 0.25 {
        out.push(
            "Low parallelization: most batches run a single task; reduce cross-task \
             dependencies to increase task independence."
                .to_string(),
        );
    }
    if !config.resource_constraints.is_empty() && metrics.resource_efficiency < 0.5 {
        out.push(
            "Low resource efficiency: rebalance resource constraints or raise per-type \
             concurrency limits."
                .to_string(),
        );
    }
    if tightness < 0.6 {
        out.push(
            "Total completion time is well above the critical path; resource limits are \
             the dominant bottleneck."
                .to_string(),
        );
    }
    if out.is_empty() {
        out.push("Plan is well balanced; no adjustments recommended.".to_string());
    }
    out
}
