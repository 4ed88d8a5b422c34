//! Resource-constrained batch packing.

use std::collections::HashMap;

use seqplan_core::{Task, TaskId};
use tracing::debug;

use crate::config::OptimizerConfig;

/// Packs a strategy-ordered candidate pool into a single batch without
/// exceeding any resource constraint or the overall parallelism cap.
pub struct ResourceScheduler<'a> {
    config: &'a OptimizerConfig,
}

impl<'a> ResourceScheduler<'a> {
    /// Create a scheduler over the given configuration.
    pub fn new(config: &'a OptimizerConfig) -> Self {
        Self { config }
    }

    /// Select the batch members from an ordered pool of mutually
    /// dependency-free tasks.
    ///
    /// Tasks that would push a matching constraint past `max_concurrent`
    /// are skipped; they stay in the ready pool and are reconsidered next
    /// iteration. The first candidate always fits (constraints allow at
    /// least one concurrent task), so a non-empty pool always yields a
    /// non-empty batch and batching makes progress.
    pub fn pack(&self, pool: &[&Task]) -> Vec<TaskId> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        let mut placed = Vec::new();

        for task in pool {
            if placed.len() >= self.config.max_parallelism.get() {
                break;
            }
            if self.config.load_balancing_enabled && !self.fits(task, &counts) {
                debug!(task = %task.id, "deferring task to a later batch");
                continue;
            }
            for capability in &task.required_capabilities {
                if self.config.constraint_for(capability).is_some() {
                    *counts.entry(capability.as_str()).or_insert(0) += 1;
                }
            }
            placed.push(task.id.clone());
        }

        placed
    }

    fn fits(&self, task: &Task, counts: &HashMap<&str, u32>) -> bool {
        task.required_capabilities.iter().all(|capability| {
            match self.config.constraint_for(capability) {
                Some(constraint) => {
                    counts.get(capability.as_str()).copied().unwrap_or(0)
                        < constraint.max_concurrent
                }
                // No matching constraint: unconstrained
                None => true,
            }
        })
    }
}
