//! Decomposition graph and recursive-task detection.
//!
//! Every abstract task points at the tasks used by the steps of its methods.
//! A task is a *loop task* if it is its own direct successor or belongs to a
//! strongly connected component with more than one member.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::index::DomainIndex;

/// Abstract task → subtask adjacency, one edge per plan step.
#[derive(Debug)]
pub struct DecompositionGraph<'d> {
    graph: DiGraph<&'d str, ()>,
    nodes: HashMap<&'d str, NodeIndex>,
}

impl<'d> DecompositionGraph<'d> {
    /// Nodes are added in abstract-task declaration order, so the SCC walk
    /// and therefore loop detection are deterministic for identical input.
    pub fn build(index: &DomainIndex<'d>) -> Self {
        let mut this = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };
        let abstract_tasks = &index.domain().abstract_tasks;
        for task in abstract_tasks {
            this.node(&task.name);
        }
        for task in abstract_tasks {
            let from = this.node(&task.name);
            for method in index.methods_of(&task.name) {
                for step in &method.subtasks {
                    let to = this.node(&step.task);
                    this.graph.add_edge(from, to, ());
                }
            }
        }
        this
    }

    fn node(&mut self, task: &'d str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(task) {
            return idx;
        }
        let idx = self.graph.add_node(task);
        self.nodes.insert(task, idx);
        idx
    }

    /// All loop tasks of the graph.
    pub fn loops(&self) -> LoopSet {
        let mut loops = BTreeSet::new();
        for component in tarjan_scc(&self.graph) {
            if component.len() > 1 {
                loops.extend(component.iter().map(|&n| self.graph[n].to_string()));
            } else if let Some(&n) = component.first() {
                if self.graph.contains_edge(n, n) {
                    loops.insert(self.graph[n].to_string());
                }
            }
        }
        for task in &loops {
            tracing::trace!(task = %task, "loop task");
        }
        LoopSet { loops }
    }
}

/// Names of tasks taking part in a recursive decomposition cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSet {
    loops: BTreeSet<String>,
}

impl LoopSet {
    pub fn contains(&self, task: &str) -> bool {
        self.loops.contains(task)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.loops.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Method, PlanStep, Task};

    fn domain(methods: Vec<Method>, abstract_names: &[&str]) -> Domain {
        Domain {
            primitive_tasks: vec![Task::new("act", vec![])],
            abstract_tasks: abstract_names.iter().map(|n| Task::new(*n, vec![])).collect(),
            methods,
            ..Default::default()
        }
    }

    fn method(name: &str, task: &str, subtasks: &[&str]) -> Method {
        subtasks
            .iter()
            .enumerate()
            .fold(Method::new(name, task, &[]), |m, (i, t)| {
                m.with_step(PlanStep::new(format!("s{i}"), *t, &[]))
            })
    }

    #[test]
    fn self_recursion_is_a_loop() {
        let d = domain(
            vec![
                method("m_rec", "Recurse", &["act", "Recurse"]),
                method("m_base", "Recurse", &["act"]),
            ],
            &["Recurse"],
        );
        let index = DomainIndex::build(&d);
        let loops = DecompositionGraph::build(&index).loops();
        assert!(loops.contains("Recurse"));
        assert!(!loops.contains("act"));
        assert_eq!(loops.len(), 1);
    }

    #[test]
    fn mutual_recursion_marks_whole_component() {
        let d = domain(
            vec![
                method("m_top", "Top", &["A"]),
                method("m_a", "A", &["B"]),
                method("m_b", "B", &["act", "A"]),
            ],
            &["Top", "A", "B"],
        );
        let index = DomainIndex::build(&d);
        let loops = DecompositionGraph::build(&index).loops();
        assert!(loops.contains("A"));
        assert!(loops.contains("B"));
        assert!(!loops.contains("Top"));
    }

    #[test]
    fn acyclic_hierarchy_has_no_loops() {
        let d = domain(
            vec![method("m_top", "Top", &["A", "act"]), method("m_a", "A", &["act"])],
            &["Top", "A"],
        );
        let index = DomainIndex::build(&d);
        assert!(DecompositionGraph::build(&index).loops().is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let d = domain(
            vec![
                method("m_a", "A", &["B"]),
                method("m_b", "B", &["A"]),
                method("m_c", "C", &["C"]),
            ],
            &["A", "B", "C"],
        );
        let index = DomainIndex::build(&d);
        let first = DecompositionGraph::build(&index).loops();
        let second = DecompositionGraph::build(&index).loops();
        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }
}
