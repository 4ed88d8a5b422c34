//! Core data model for the sequence planner.
//!
//! This crate defines the plain task, dependency, and resource records that
//! the optimizer consumes. It performs no scheduling itself.

#![warn(missing_docs)]

mod dependency;
mod id;
mod resource;
mod task;

pub use dependency::{DependencyEdge, DependencyKind};
pub use id::TaskId;
pub use resource::ResourceConstraint;
pub use task::{Priority, Task, TaskStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
