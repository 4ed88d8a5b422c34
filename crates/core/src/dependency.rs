//! Dependency edges between tasks.

use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// How a dependency entered the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Declared by the user
    #[default]
    Explicit,
    /// Derived from task structure
    Inferred,
}

/// A directed dependency: `dependent` cannot start before `depends_on`.
///
/// Call sites use two field conventions for the endpoints (`from`/`to` and
/// `dependentTaskId`/`dependsOnTaskId`); serde aliases fold both into this
/// single shape at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The task that must wait
    #[serde(alias = "from", alias = "dependentTaskId", alias = "dependent_task_id")]
    pub dependent: TaskId,

    /// The task it waits for
    #[serde(alias = "to", alias = "dependsOnTaskId", alias = "depends_on_task_id")]
    pub depends_on: TaskId,

    /// Edge provenance
    #[serde(default)]
    pub kind: DependencyKind,

    /// Minimum delay after the prerequisite completes; invalid values are
    /// clamped to 0 by [`DependencyEdge::delay`]
    #[serde(default, alias = "minDelay")]
    pub min_delay: f64,

    /// Whether the two tasks may overlap. Advisory for downstream
    /// executors; batching still orders the tasks strictly.
    #[serde(default)]
    pub parallelizable: bool,
}

impl DependencyEdge {
    /// Create an explicit edge with no delay.
    pub fn new(dependent: impl Into<TaskId>, depends_on: impl Into<TaskId>) -> Self {
        Self {
            dependent: dependent.into(),
            depends_on: depends_on.into(),
            kind: DependencyKind::Explicit,
            min_delay: 0.0,
            parallelizable: false,
        }
    }

    /// Mark the edge as inferred.
    pub fn inferred(mut self) -> Self {
        self.kind = DependencyKind::Inferred;
        self
    }

    /// Set the minimum delay.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.min_delay = delay;
        self
    }

    /// Mark the edge as overlap-permitting.
    pub fn with_overlap(mut self) -> Self {
        self.parallelizable = true;
        self
    }

    /// Sanitized minimum delay. Non-finite and negative values become 0.
    pub fn delay(&self) -> f64 {
        if self.min_delay.is_finite() && self.min_delay > 0.0 {
            self.min_delay
        } else {
            0.0
        }
    }
}
