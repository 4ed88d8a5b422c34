//! Parallel execution sequence optimizer.
//!
//! Takes a task set with dependency edges, resource constraints, and
//! priority metadata, and produces a dependency-respecting, resource-
//! bounded, parallelism-optimized execution plan: ordered batches,
//! parallel groups with bottleneck analysis, the critical path, plan
//! metrics, and advisory recommendations.

#![warn(missing_docs)]

pub mod analysis;
pub mod batcher;
pub mod config;
pub mod graph;
pub mod optimizer;
pub mod result;
pub mod scheduler;
pub mod strategy;

pub use analysis::CriticalPath;
pub use config::{ConfigError, OptimizerConfig, Strategy, TaskPerformanceRecord};
pub use optimizer::SequenceOptimizer;
pub use result::{ExecutionBatch, OptimizationResult, ParallelGroup, PlanMetrics};
pub use strategy::{PoolOrdering, StrategyContext, StrategyDispatch};
