//! Task model - the unit of work the optimizer sequences.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::id::TaskId;
use crate::Time;

/// Task priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work
    Low,
    /// Regular work
    #[default]
    Normal,
    /// Important work
    High,
    /// Drop-everything work
    Critical,
}

impl Priority {
    /// Parse a priority label. Unknown labels fall back to `Normal`.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Normal,
        }
    }

    /// Stable label for display and weight lookups.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

// Unknown priority labels are a data-quality issue, not an error; they
// deserialize to Normal.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&label))
    }
}

/// Lifecycle status of a task.
///
/// Informational only: the optimizer reads it for display and never writes it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet scheduled
    #[default]
    Pending,
    /// Queued for execution
    Queued,
    /// Currently being executed
    Active,
    /// Blocked by dependencies
    Blocked,
    /// Completed successfully
    Done,
    /// Abandoned (won't be pursued)
    Abandoned,
}

/// A task to be sequenced.
///
/// Tasks are immutable inputs to the optimizer; malformed fields are
/// sanitized through accessors (`effort`) rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Detailed description (display only)
    #[serde(default)]
    pub description: String,

    /// Free-form category tag
    #[serde(default)]
    pub category: Option<String>,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Estimated effort in abstract units; `None` or invalid values
    /// are treated as 1 by [`Task::effort`]
    #[serde(default)]
    pub estimated_effort: Option<f64>,

    /// Capability tags, matched against resource constraint types
    #[serde(default)]
    pub required_capabilities: Vec<String>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: Time,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: Time,
}

impl Task {
    /// Create a task with defaults for everything but id and title.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
            estimated_effort: None,
            required_capabilities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimated effort.
    pub fn with_effort(mut self, effort: f64) -> Self {
        self.estimated_effort = Some(effort);
        self
    }

    /// Set the category tag.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add a required capability tag.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    /// Sanitized effort estimate.
    ///
    /// Missing, non-finite, and non-positive estimates all default to 1.
    pub fn effort(&self) -> f64 {
        match self.estimated_effort {
            Some(e) if e.is_finite() && e > 0.0 => e,
            _ => 1.0,
        }
    }

    /// Whether this task consumes the given resource type.
    pub fn uses_resource(&self, resource_type: &str) -> bool {
        self.required_capabilities.iter().any(|c| c == resource_type)
    }
}
