//! Resource constraints bounding concurrent execution.

use serde::{Deserialize, Serialize};

/// A named capacity limit, e.g. "backend: 2 concurrent".
///
/// Tasks declare the resource types they consume via capability tags; a
/// task with no matching constraint is resource-unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstraint {
    /// Resource type tag matched against task capabilities
    #[serde(alias = "resourceType")]
    pub resource_type: String,

    /// Maximum tasks of this type per batch
    #[serde(alias = "maxConcurrent")]
    pub max_concurrent: u32,

    /// Efficiency multiplier in (0, 1]; sharing the resource stretches
    /// completion time by 1/efficiency
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
}

fn default_efficiency() -> f64 {
    1.0
}

impl ResourceConstraint {
    /// Create a constraint with full efficiency.
    pub fn new(resource_type: impl Into<String>, max_concurrent: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            max_concurrent,
            efficiency: 1.0,
        }
    }

    /// Set the efficiency multiplier.
    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    /// Sanitized efficiency for time scaling. Values outside (0, 1]
    /// fall back to 1.
    pub fn efficiency_factor(&self) -> f64 {
        if self.efficiency.is_finite() && self.efficiency > 0.0 && self.efficiency <= 1.0 {
            self.efficiency
        } else {
            1.0
        }
    }
}
