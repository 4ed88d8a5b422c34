//! Optimizer configuration.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use seqplan_core::{Priority, ResourceConstraint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheduling strategy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Shortest tasks first, minimizing time-to-first-completion
    ShortestPath,
    /// Critical-path tasks first, so the longest chain is never starved
    CriticalPath,
    /// Highest priority weight first
    #[default]
    PriorityWeighted,
    /// Spread resource-constrained tasks to minimize peak utilization
    ResourceBalanced,
    /// Utilization- and history-driven blend; falls back to
    /// priority-weighted when no history exists
    AdaptiveDynamic,
}

impl Strategy {
    /// Stable label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortestPath => "shortest_path",
            Self::CriticalPath => "critical_path",
            Self::PriorityWeighted => "priority_weighted",
            Self::ResourceBalanced => "resource_balanced",
            Self::AdaptiveDynamic => "adaptive_dynamic",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortest_path" => Ok(Self::ShortestPath),
            "critical_path" => Ok(Self::CriticalPath),
            "priority_weighted" => Ok(Self::PriorityWeighted),
            "resource_balanced" => Ok(Self::ResourceBalanced),
            "adaptive_dynamic" => Ok(Self::AdaptiveDynamic),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Configuration errors. The only fatal error class in the crate:
/// data-quality issues in tasks and edges are always recovered, but a
/// nonsensical configuration is programmer misuse and is rejected once,
/// at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Strategy label not recognized
    #[error("unknown strategy `{0}`")]
    UnknownStrategy(String),

    /// Constraint allows zero concurrent tasks
    #[error("resource constraint `{0}` has max_concurrent of 0")]
    ZeroConcurrency(String),

    /// Efficiency multiplier out of range
    #[error("resource constraint `{0}` has efficiency {1} outside (0, 1]")]
    InvalidEfficiency(String, f64),

    /// Target utilization out of range
    #[error("target resource utilization {0} outside [0, 1]")]
    InvalidTargetUtilization(f64),

    /// Learning rate out of range
    #[error("learning rate {0} outside [0, 1]")]
    InvalidLearningRate(f64),
}

/// A historical execution sample, consumed by the adaptive strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPerformanceRecord {
    /// Task category the sample applies to
    pub category: String,
    /// Effort as estimated before execution
    pub estimated_effort: f64,
    /// Effort actually observed
    pub actual_effort: f64,
}

impl TaskPerformanceRecord {
    /// Observed-over-estimated ratio; 1.0 when the sample is unusable.
    pub fn accuracy_ratio(&self) -> f64 {
        if self.estimated_effort.is_finite()
            && self.estimated_effort > 0.0
            && self.actual_effort.is_finite()
            && self.actual_effort > 0.0
        {
            self.actual_effort / self.estimated_effort
        } else {
            1.0
        }
    }
}

/// Immutable optimizer configuration, captured once at construction.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Ordering/bias policy
    pub strategy: Strategy,
    /// Cap on simultaneous tasks per batch
    pub max_parallelism: NonZeroUsize,
    /// Per-resource-type concurrency limits
    pub resource_constraints: Vec<ResourceConstraint>,
    /// Priority label weights, used by `priority_weighted` and as a
    /// tie-break elsewhere
    pub priority_weights: HashMap<Priority, f64>,
    /// Target utilization for `adaptive_dynamic`, in [0, 1]
    pub target_resource_utilization: f64,
    /// Adaptive knob: bias ordering by live utilization feedback
    pub enable_dynamic_rebalancing: bool,
    /// Adaptive knob: adjust efforts from historical samples
    pub enable_predictive_allocation: bool,
    /// Weight of historical adjustments, in [0, 1]
    pub learning_rate: f64,
    /// When false, resource deferral is skipped and batching follows
    /// dependency order alone (the parallelism cap still applies)
    pub load_balancing_enabled: bool,
    /// Historical samples for `adaptive_dynamic`; no-op for other strategies
    pub history: Vec<TaskPerformanceRecord>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_parallelism: NonZeroUsize::new(4).unwrap(),
            resource_constraints: Vec::new(),
            priority_weights: default_priority_weights(),
            target_resource_utilization: 0.8,
            enable_dynamic_rebalancing: true,
            enable_predictive_allocation: false,
            learning_rate: 0.1,
            load_balancing_enabled: true,
            history: Vec::new(),
        }
    }
}

/// Built-in priority weights: critical=8 > high=4 > normal=2 > low=1.
pub fn default_priority_weights() -> HashMap<Priority, f64> {
    HashMap::from([
        (Priority::Critical, 8.0),
        (Priority::High, 4.0),
        (Priority::Normal, 2.0),
        (Priority::Low, 1.0),
    ])
}

impl OptimizerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scheduling strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the per-batch parallelism cap.
    pub fn with_max_parallelism(mut self, max: NonZeroUsize) -> Self {
        self.max_parallelism = max;
        self
    }

    /// Add a resource constraint.
    pub fn with_resource_constraint(mut self, constraint: ResourceConstraint) -> Self {
        self.resource_constraints.push(constraint);
        self
    }

    /// Replace the priority weight map.
    pub fn with_priority_weights(mut self, weights: HashMap<Priority, f64>) -> Self {
        self.priority_weights = weights;
        self
    }

    /// Set the adaptive target utilization.
    pub fn with_target_utilization(mut self, target: f64) -> Self {
        self.target_resource_utilization = target;
        self
    }

    /// Set the adaptive learning rate.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Enable or disable resource-aware load balancing.
    pub fn with_load_balancing(mut self, enabled: bool) -> Self {
        self.load_balancing_enabled = enabled;
        self
    }

    /// Enable or disable utilization feedback in the adaptive strategy.
    pub fn with_dynamic_rebalancing(mut self, enabled: bool) -> Self {
        self.enable_dynamic_rebalancing = enabled;
        self
    }

    /// Enable or disable history-based effort adjustment.
    pub fn with_predictive_allocation(mut self, enabled: bool) -> Self {
        self.enable_predictive_allocation = enabled;
        self
    }

    /// Supply historical performance samples.
    pub fn with_history(mut self, history: Vec<TaskPerformanceRecord>) -> Self {
        self.history = history;
        self
    }

    /// Weight for a priority, falling back to the built-in defaults.
    pub fn priority_weight(&self, priority: Priority) -> f64 {
        self.priority_weights.get(&priority).copied().unwrap_or(match priority {
            Priority::Critical => 8.0,
            Priority::High => 4.0,
            Priority::Normal => 2.0,
            Priority::Low => 1.0,
        })
    }

    /// The constraint matching a resource type, if any.
    pub fn constraint_for(&self, resource_type: &str) -> Option<&ResourceConstraint> {
        self.resource_constraints
            .iter()
            .find(|c| c.resource_type == resource_type)
    }

    /// Validate the configuration. Called once by the optimizer constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for constraint in &self.resource_constraints {
            if constraint.max_concurrent == 0 {
                return Err(ConfigError::ZeroConcurrency(constraint.resource_type.clone()));
            }
            if !constraint.efficiency.is_finite()
                || constraint.efficiency <= 0.0
                || constraint.efficiency > 1.0
            {
                return Err(ConfigError::InvalidEfficiency(
                    constraint.resource_type.clone(),
                    constraint.efficiency,
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.target_resource_utilization) {
            return Err(ConfigError::InvalidTargetUtilization(
                self.target_resource_utilization,
            ));
        }
        if !(0.0..=1.0).contains(&self.learning_rate) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        Ok(())
    }
}
