//! Ordering strategies for the ready pool.
//!
//! A strategy is a total ordering over the tasks currently ready to run;
//! earlier entries are handed to the resource scheduler first. Strategies
//! only bias composition and tie-breaks: every strategy produces a valid
//! dependency- and resource-respecting plan. All orderings end with an
//! ascending task-id tie-break so plans are deterministic.

use std::collections::{HashMap, HashSet};

use seqplan_core::{Task, TaskId};

use crate::config::{OptimizerConfig, Strategy};

/// Context available to a strategy when ordering a ready pool.
pub struct StrategyContext<'a> {
    /// Active configuration
    pub config: &'a OptimizerConfig,
    /// Tasks on the critical path
    pub critical_path: &'a HashSet<TaskId>,
    /// Per-resource-type utilization averaged over the batches built so far
    pub utilization: &'a HashMap<String, f64>,
}

/// A total ordering over the ready pool.
pub trait PoolOrdering {
    /// Order candidates in place, most preferred first.
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>);
}

/// Ascending estimated effort: minimizes time-to-first-completion.
pub struct ShortestPathOrdering;

impl PoolOrdering for ShortestPathOrdering {
    fn order(&self, pool: &mut Vec<&Task>, _ctx: &StrategyContext<'_>) {
        pool.sort_by(|a, b| a.effort().total_cmp(&b.effort()).then_with(|| a.id.cmp(&b.id)));
    }
}

/// Critical-path tasks first, so the longest chain is never starved.
pub struct CriticalPathOrdering;

impl PoolOrdering for CriticalPathOrdering {
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>) {
        pool.sort_by(|a, b| {
            let a_on = ctx.critical_path.contains(&a.id);
            let b_on = ctx.critical_path.contains(&b.id);
            b_on.cmp(&a_on)
                .then_with(|| {
                    ctx.config
                        .priority_weight(b.priority)
                        .total_cmp(&ctx.config.priority_weight(a.priority))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Descending priority weight.
pub struct PriorityWeightedOrdering;

impl PoolOrdering for PriorityWeightedOrdering {
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>) {
        pool.sort_by(|a, b| {
            ctx.config
                .priority_weight(b.priority)
                .total_cmp(&ctx.config.priority_weight(a.priority))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Spreads resource-constrained tasks so no single type saturates a batch.
///
/// Tasks are keyed by the demand the pool places on their constrained
/// types: a task whose type is heavily demanded sorts later, letting the
/// scheduler fill the batch with lighter types first and deferring the
/// surplus evenly across batches.
pub struct ResourceBalancedOrdering;

impl PoolOrdering for ResourceBalancedOrdering {
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>) {
        // Pool-wide demand per constrained type.
        let mut demand: HashMap<&str, u32> = HashMap::new();
        for task in pool.iter() {
            for capability in &task.required_capabilities {
                if ctx.config.constraint_for(capability).is_some() {
                    *demand.entry(capability.as_str()).or_insert(0) += 1;
                }
            }
        }

        let pressure = |task: &Task| -> f64 {
            task.required_capabilities
                .iter()
                .filter_map(|capability| {
                    let constraint = ctx.config.constraint_for(capability)?;
                    let d = demand.get(capability.as_str()).copied().unwrap_or(0);
                    Some(f64::from(d) / f64::from(constraint.max_concurrent))
                })
                .fold(0.0, f64::max)
        };

        pool.sort_by(|a, b| {
            pressure(a)
                .total_cmp(&pressure(b))
                .then_with(|| {
                    ctx.config
                        .priority_weight(b.priority)
                        .total_cmp(&ctx.config.priority_weight(a.priority))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// Blends priority weight with utilization feedback and historical
/// effort accuracy.
///
/// Without history the strategy cannot learn anything, so it degrades to
/// [`PriorityWeightedOrdering`] through an explicit fallback branch. With
/// history, a task's score starts from its priority weight, is demoted by
/// `learning_rate` times its category's observed effort overrun (when
/// predictive allocation is enabled), and is boosted by the gap between
/// target and observed utilization of its resource types (when dynamic
/// rebalancing is enabled).
pub struct AdaptiveOrdering;

impl PoolOrdering for AdaptiveOrdering {
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>) {
        if ctx.config.history.is_empty() {
            // No history to learn from: deterministic fallback.
            PriorityWeightedOrdering.order(pool, ctx);
            return;
        }

        // Average observed-over-estimated effort ratio per category.
        let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
        for record in &ctx.config.history {
            let entry = sums.entry(record.category.as_str()).or_insert((0.0, 0));
            entry.0 += record.accuracy_ratio();
            entry.1 += 1;
        }
        let ratio_for = |category: Option<&str>| -> Option<f64> {
            let (sum, count) = sums.get(category?)?;
            Some(sum / f64::from(*count))
        };

        let score = |task: &Task| -> f64 {
            let mut score = ctx.config.priority_weight(task.priority);

            if ctx.config.enable_predictive_allocation {
                if let Some(ratio) = ratio_for(task.category.as_deref()) {
                    // Categories that habitually overrun get demoted.
                    score -= ctx.config.learning_rate * task.effort() * (ratio - 1.0);
                }
            }

            if ctx.config.enable_dynamic_rebalancing {
                let gap = task
                    .required_capabilities
                    .iter()
                    .filter(|c| ctx.config.constraint_for(c).is_some())
                    .map(|c| {
                        ctx.config.target_resource_utilization
                            - ctx.utilization.get(c.as_str()).copied().unwrap_or(0.0)
                    })
                    .fold(f64::NEG_INFINITY, f64::max);
                if gap.is_finite() {
                    score += gap;
                }
            }

            score
        };

        pool.sort_by(|a, b| score(b).total_cmp(&score(a)).then_with(|| a.id.cmp(&b.id)));
    }
}

/// Tagged dispatch over the available orderings.
pub enum StrategyDispatch {
    /// Shortest tasks first
    ShortestPath(ShortestPathOrdering),
    /// Critical-path tasks first
    CriticalPath(CriticalPathOrdering),
    /// Highest priority weight first
    PriorityWeighted(PriorityWeightedOrdering),
    /// Minimize peak per-type utilization
    ResourceBalanced(ResourceBalancedOrdering),
    /// Feedback-driven blend with priority fallback
    Adaptive(AdaptiveOrdering),
}

impl StrategyDispatch {
    /// Build the ordering for a configured strategy.
    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::ShortestPath => Self::ShortestPath(ShortestPathOrdering),
            Strategy::CriticalPath => Self::CriticalPath(CriticalPathOrdering),
            Strategy::PriorityWeighted => Self::PriorityWeighted(PriorityWeightedOrdering),
            Strategy::ResourceBalanced => Self::ResourceBalanced(ResourceBalancedOrdering),
            Strategy::AdaptiveDynamic => Self::Adaptive(AdaptiveOrdering),
        }
    }
}

impl PoolOrdering for StrategyDispatch {
    fn order(&self, pool: &mut Vec<&Task>, ctx: &StrategyContext<'_>) {
        match self {
            Self::ShortestPath(s) => s.order(pool, ctx),
            Self::CriticalPath(s) => s.order(pool, ctx),
            Self::PriorityWeighted(s) => s.order(pool, ctx),
            Self::ResourceBalanced(s) => s.order(pool, ctx),
            Self::Adaptive(s) => s.order(pool, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskPerformanceRecord;
    use seqplan_core::Priority;

    fn ids(pool: &[&Task]) -> Vec<String> {
        pool.iter().map(|t| t.id.to_string()).collect()
    }

    fn ctx_parts() -> (OptimizerConfig, HashSet<TaskId>, HashMap<String, f64>) {
        (OptimizerConfig::default(), HashSet::new(), HashMap::new())
    }

    #[test]
    fn shortest_path_orders_by_effort() {
        let (config, cp, util) = ctx_parts();
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        let a = Task::new("a", "a").with_effort(5.0);
        let b = Task::new("b", "b").with_effort(1.0);
        let c = Task::new("c", "c").with_effort(3.0);
        let mut pool = vec![&a, &b, &c];
        ShortestPathOrdering.order(&mut pool, &ctx);
        assert_eq!(ids(&pool), ["b", "c", "a"]);
    }

    #[test]
    fn priority_weighted_orders_by_weight_desc() {
        let (config, cp, util) = ctx_parts();
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        let a = Task::new("a", "a").with_priority(Priority::Low);
        let b = Task::new("b", "b").with_priority(Priority::Critical);
        let c = Task::new("c", "c").with_priority(Priority::High);
        let mut pool = vec![&a, &b, &c];
        PriorityWeightedOrdering.order(&mut pool, &ctx);
        assert_eq!(ids(&pool), ["b", "c", "a"]);
    }

    #[test]
    fn critical_path_tasks_sort_first() {
        let (config, mut cp, util) = ctx_parts();
        cp.insert(TaskId::new("z"));
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        let a = Task::new("a", "a").with_priority(Priority::Critical);
        let z = Task::new("z", "z").with_priority(Priority::Low);
        let mut pool = vec![&a, &z];
        CriticalPathOrdering.order(&mut pool, &ctx);
        assert_eq!(ids(&pool), ["z", "a"]);
    }

    #[test]
    fn resource_balanced_puts_contended_types_last() {
        let (mut config, cp, util) = ctx_parts();
        config = config
            .with_resource_constraint(seqplan_core::ResourceConstraint::new("backend", 1));
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        let a = Task::new("a", "a").with_capability("backend");
        let b = Task::new("b", "b").with_capability("backend");
        let c = Task::new("c", "c");
        let mut pool = vec![&a, &b, &c];
        ResourceBalancedOrdering.order(&mut pool, &ctx);
        assert_eq!(pool[0].id, TaskId::new("c"));
    }

    #[test]
    fn adaptive_without_history_matches_priority_weighted() {
        let (config, cp, util) = ctx_parts();
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        let a = Task::new("a", "a").with_priority(Priority::Low);
        let b = Task::new("b", "b").with_priority(Priority::Critical);

        let mut adaptive_pool = vec![&a, &b];
        AdaptiveOrdering.order(&mut adaptive_pool, &ctx);
        let mut weighted_pool = vec![&a, &b];
        PriorityWeightedOrdering.order(&mut weighted_pool, &ctx);

        assert_eq!(ids(&adaptive_pool), ids(&weighted_pool));
    }

    #[test]
    fn adaptive_boosts_under_utilized_resource_types() {
        let (mut config, cp, mut util) = ctx_parts();
        config = config
            .with_resource_constraint(seqplan_core::ResourceConstraint::new("backend", 2))
            .with_resource_constraint(seqplan_core::ResourceConstraint::new("gpu", 2))
            .with_history(vec![TaskPerformanceRecord {
                category: "etl".to_string(),
                estimated_effort: 1.0,
                actual_effort: 1.0,
            }]);
        util.insert("backend".to_string(), 0.9);
        util.insert("gpu".to_string(), 0.1);
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        // Same priority; only the gap between target and observed
        // utilization differs, so the starved gpu type must sort first.
        let a = Task::new("a", "a").with_capability("backend");
        let b = Task::new("b", "b").with_capability("gpu");
        let mut pool = vec![&a, &b];
        AdaptiveOrdering.order(&mut pool, &ctx);
        assert_eq!(ids(&pool), ["b", "a"]);
    }

    #[test]
    fn adaptive_demotes_overrunning_categories() {
        let (mut config, cp, util) = ctx_parts();
        config = config
            .with_predictive_allocation(true)
            .with_learning_rate(1.0)
            .with_history(vec![TaskPerformanceRecord {
                category: "ml".to_string(),
                estimated_effort: 1.0,
                actual_effort: 10.0,
            }]);
        let ctx = StrategyContext { config: &config, critical_path: &cp, utilization: &util };
        // Same priority; only the history-driven demotion differs.
        let a = Task::new("a", "a").with_category("ml").with_effort(2.0);
        let b = Task::new("b", "b").with_effort(2.0);
        let mut pool = vec![&a, &b];
        AdaptiveOrdering.order(&mut pool, &ctx);
        assert_eq!(ids(&pool), ["b", "a"]);
    }
}
