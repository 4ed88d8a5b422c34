//! Dependency graph construction and cycle pruning.
//!
//! Normalized edges come in mixed explicit/inferred flavors and may
//! reference unknown tasks or form cycles. This module reduces them to a
//! DAG the batcher can rely on: dangling edges are dropped, duplicate
//! edges collapsed, and cycles broken by removing back-edges found during
//! a deterministic DFS.

use std::collections::{HashMap, HashSet};

use seqplan_core::{DependencyEdge, Task, TaskId};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InStack,
    Done,
}

/// A cycle-free dependency graph over a task set.
#[derive(Debug)]
pub struct DepGraph {
    /// dependent -> retained prerequisite edges, sorted by prerequisite id
    prerequisites: HashMap<TaskId, Vec<DependencyEdge>>,
    /// prerequisite -> dependent ids, sorted
    dependents: HashMap<TaskId, Vec<TaskId>>,
    /// Edges removed to break cycles
    removed: Vec<DependencyEdge>,
}

impl DepGraph {
    /// Build the graph from the task set and raw normalized edges.
    ///
    /// Edges with unknown endpoints and self-loops are dropped (treated as
    /// already satisfied), duplicates collapsed. Cycles are broken by
    /// removing the first back-edge encountered while visiting roots in
    /// ascending task-id order; each removal is logged.
    pub fn build(tasks: &[Task], edges: &[DependencyEdge]) -> Self {
        let known: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();

        let mut prerequisites: HashMap<TaskId, Vec<DependencyEdge>> = HashMap::new();
        let mut seen: HashSet<(TaskId, TaskId)> = HashSet::new();

        for edge in edges {
            if !known.contains(&edge.dependent) || !known.contains(&edge.depends_on) {
                debug!(
                    dependent = %edge.dependent,
                    depends_on = %edge.depends_on,
                    "dropping dependency with unknown endpoint"
                );
                continue;
            }
            if edge.dependent == edge.depends_on {
                warn!(task = %edge.dependent, "dropping self-dependency");
                continue;
            }
            if !seen.insert((edge.dependent.clone(), edge.depends_on.clone())) {
                continue;
            }
            prerequisites
                .entry(edge.dependent.clone())
                .or_default()
                .push(edge.clone());
        }

        for deps in prerequisites.values_mut() {
            deps.sort_by(|a, b| a.depends_on.cmp(&b.depends_on));
        }

        let mut graph = Self {
            prerequisites,
            dependents: HashMap::new(),
            removed: Vec::new(),
        };
        graph.break_cycles(tasks);
        graph.rebuild_dependents();
        graph
    }

    /// DFS from every task in ascending-id order, collecting back-edges.
    /// Every cycle contains at least one back-edge of the DFS forest, so
    /// removing all of them leaves a DAG.
    fn break_cycles(&mut self, tasks: &[Task]) {
        let mut roots: Vec<&TaskId> = tasks.iter().map(|t| &t.id).collect();
        roots.sort();

        let mut state: HashMap<TaskId, VisitState> = roots
            .iter()
            .map(|id| ((*id).clone(), VisitState::Unvisited))
            .collect();
        let mut back_edges: Vec<(TaskId, TaskId)> = Vec::new();

        for root in &roots {
            if state.get(*root) == Some(&VisitState::Unvisited) {
                Self::visit(root, &self.prerequisites, &mut state, &mut back_edges);
            }
        }

        for (dependent, depends_on) in back_edges {
            warn!(
                dependent = %dependent,
                depends_on = %depends_on,
                "breaking dependency cycle by removing edge"
            );
            if let Some(deps) = self.prerequisites.get_mut(&dependent) {
                if let Some(pos) = deps.iter().position(|e| e.depends_on == depends_on) {
                    self.removed.push(deps.remove(pos));
                }
            }
        }
    }

    fn visit(
        id: &TaskId,
        prerequisites: &HashMap<TaskId, Vec<DependencyEdge>>,
        state: &mut HashMap<TaskId, VisitState>,
        back_edges: &mut Vec<(TaskId, TaskId)>,
    ) {
        state.insert(id.clone(), VisitState::InStack);

        if let Some(deps) = prerequisites.get(id) {
            for edge in deps {
                match state.get(&edge.depends_on).copied() {
                    Some(VisitState::InStack) => {
                        back_edges.push((edge.dependent.clone(), edge.depends_on.clone()));
                    }
                    Some(VisitState::Unvisited) => {
                        Self::visit(&edge.depends_on, prerequisites, state, back_edges);
                    }
                    // Done, or unknown (edges were filtered, so unreachable)
                    _ => {}
                }
            }
        }

        state.insert(id.clone(), VisitState::Done);
    }

    fn rebuild_dependents(&mut self) {
        self.dependents.clear();
        for deps in self.prerequisites.values() {
            for edge in deps {
                self.dependents
                    .entry(edge.depends_on.clone())
                    .or_default()
                    .push(edge.dependent.clone());
            }
        }
        for list in self.dependents.values_mut() {
            list.sort();
        }
    }

    /// Retained prerequisite edges of a task.
    pub fn prerequisites_of(&self, id: &TaskId) -> &[DependencyEdge] {
        self.prerequisites.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Tasks that depend on the given task.
    pub fn dependents_of(&self, id: &TaskId) -> &[TaskId] {
        self.dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Unresolved-dependency count per task.
    pub fn in_degrees(&self, tasks: &[Task]) -> HashMap<TaskId, usize> {
        tasks
            .iter()
            .map(|t| (t.id.clone(), self.prerequisites_of(&t.id).len()))
            .collect()
    }

    /// Edges that were removed to break cycles.
    pub fn removed_edges(&self) -> &[DependencyEdge] {
        &self.removed
    }

    /// Number of retained edges.
    pub fn edge_count(&self) -> usize {
        self.prerequisites.values().map(|v| v.len()).sum()
    }

    /// Tasks in topological order (prerequisites before dependents),
    /// ascending id among peers. Any residue (impossible once cycles are
    /// broken, kept as a guard) is appended in ascending id order.
    pub fn topological_order(&self, tasks: &[Task]) -> Vec<TaskId> {
        let mut in_degree = self.in_degrees(tasks);
        let mut ready: Vec<TaskId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| id.clone())
            .collect();
        ready.sort();

        let mut order = Vec::with_capacity(tasks.len());
        let mut next = 0;
        while next < ready.len() {
            let id = ready[next].clone();
            next += 1;
            for dependent in self.dependents_of(&id) {
                if let Some(d) = in_degree.get_mut(dependent) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(dependent.clone());
                    }
                }
            }
            order.push(id);
        }

        if order.len() < tasks.len() {
            let placed: HashSet<&TaskId> = order.iter().collect();
            let mut rest: Vec<TaskId> = tasks
                .iter()
                .filter(|t| !placed.contains(&t.id))
                .map(|t| t.id.clone())
                .collect();
            rest.sort();
            order.extend(rest);
        }
        order
    }
}
