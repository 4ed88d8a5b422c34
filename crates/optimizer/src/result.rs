//! The optimization result bundle.
//!
//! Read-only output of a single `optimize` call; nothing here is
//! persisted or recomputed after assembly.

use std::collections::HashMap;

use seqplan_core::TaskId;
use serde::{Deserialize, Serialize};

/// One dependency-respecting group of tasks releasable together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionBatch {
    /// Position in the execution order
    pub index: usize,
    /// Member tasks
    pub task_ids: Vec<TaskId>,
    /// Batch completion time: the slowest member's effort
    pub completion_time: f64,
}

/// A cluster of co-schedulable tasks with resource analysis attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelGroup {
    /// The batch this group was identified in
    pub batch_index: usize,
    /// Member tasks
    pub task_ids: Vec<TaskId>,
    /// Utilization per constrained resource type, in [0, 1]
    pub resource_utilization: HashMap<String, f64>,
    /// Members with the highest effort; they determine group completion
    pub bottlenecks: Vec<TaskId>,
    /// Estimated completion time, at least the max member effort
    pub estimated_completion: f64,
}

/// Quantitative plan quality measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    /// Sum of per-batch completion times
    pub total_completion_time: f64,
    /// Weighted length of the longest dependency chain
    pub critical_path_duration: f64,
    /// Average constrained-resource utilization, in [0, 1]
    pub resource_efficiency: f64,
    /// Exploited concurrency versus fully serial execution, in [0, 1]
    pub parallelization_ratio: f64,
    /// Composite score in [0, 100]
    pub optimization_score: f64,
}

/// The plan returned to callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Batches in release order
    pub execution_order: Vec<ExecutionBatch>,
    /// Parallel groups with resource analysis
    pub parallel_groups: Vec<ParallelGroup>,
    /// Task ids forming the longest weighted dependency chain
    pub critical_path: Vec<TaskId>,
    /// Plan quality measures
    pub metrics: PlanMetrics,
    /// Advisory text derived from the metrics
    pub recommendations: Vec<String>,
}

impl OptimizationResult {
    /// The degenerate plan for an empty task set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of sequential steps in the plan.
    pub fn depth(&self) -> usize {
        self.execution_order.len()
    }

    /// Size of the widest batch.
    pub fn max_batch_width(&self) -> usize {
        self.execution_order.iter().map(|b| b.task_ids.len()).max().unwrap_or(0)
    }

    /// Total tasks across all batches.
    pub fn total_tasks(&self) -> usize {
        self.execution_order.iter().map(|b| b.task_ids.len()).sum()
    }
}
