//! The declared module dependency graph.

use crate::config::ModuleConfig;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeMeta {
    pub deprecated: bool,
}

/// One declared edge participating in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
    /// Every module in the strongly connected component, in declaration order.
    pub cycle: Vec<String>,
}

/// Directed graph over declared module paths, with one edge per
/// `depends_on` entry. Nodes and edges are inserted in declaration order so
/// cycle reporting is deterministic.
pub struct ModuleDependencyGraph {
    graph: DiGraph<String, EdgeMeta>,
    node_indices: HashMap<String, NodeIndex>,
}

impl ModuleDependencyGraph {
    /// Build the graph from declared modules. Dependency targets that no
    /// module declares become synthetic nodes and are reported as warnings.
    pub fn build(modules: &[ModuleConfig]) -> (Self, Vec<String>) {
        let mut graph = DiGraph::new();
        let mut node_indices: HashMap<String, NodeIndex> = HashMap::new();
        let mut warnings = Vec::new();

        for module in modules {
            let idx = graph.add_node(module.path.clone());
            node_indices.insert(module.path.clone(), idx);
        }
        let declared: HashSet<String> = node_indices.keys().cloned().collect();

        for module in modules {
            let from_idx = node_indices[&module.path];
            for dependency in &module.depends_on {
                if !declared.contains(&dependency.path) {
                    warnings.push(format!(
                        "Module '{}' depends on '{}', which is not a declared module.",
                        module.path, dependency.path
                    ));
                }
                let to_idx = *node_indices
                    .entry(dependency.path.clone())
                    .or_insert_with(|| graph.add_node(dependency.path.clone()));
                graph.add_edge(
                    from_idx,
                    to_idx,
                    EdgeMeta {
                        deprecated: dependency.deprecated,
                    },
                );
            }
        }

        (
            Self {
                graph,
                node_indices,
            },
            warnings,
        )
    }

    /// The declared edge from one module to another, if any.
    pub fn edge(&self, from: &str, to: &str) -> Option<EdgeMeta> {
        let from_idx = *self.node_indices.get(from)?;
        let to_idx = *self.node_indices.get(to)?;
        self.graph
            .find_edge(from_idx, to_idx)
            .map(|edge_idx| self.graph[edge_idx])
    }

    /// Declared dependencies of a module, in declaration order.
    /// (petgraph iterates adjacency newest-first, hence the reverse.)
    pub fn dependencies_of(&self, module: &str) -> Vec<String> {
        match self.node_indices.get(module) {
            Some(idx) => {
                let mut deps: Vec<String> = self
                    .graph
                    .edges_directed(*idx, Direction::Outgoing)
                    .map(|edge| self.graph[edge.target()].clone())
                    .collect();
                deps.reverse();
                deps
            }
            None => Vec::new(),
        }
    }

    /// Modules declaring a dependency on the given module.
    pub fn dependents_of(&self, module: &str) -> Vec<String> {
        match self.node_indices.get(module) {
            Some(idx) => {
                let mut dependents: Vec<String> = self
                    .graph
                    .edges_directed(*idx, Direction::Incoming)
                    .map(|edge| self.graph[edge.source()].clone())
                    .collect();
                dependents.reverse();
                dependents
            }
            None => Vec::new(),
        }
    }

    /// Find every declared edge that participates in a cycle, using Tarjan's
    /// strongly-connected-components algorithm. Edges come back in
    /// declaration order, which makes reporting deterministic.
    pub fn cycle_edges(&self) -> Vec<CycleEdge> {
        let mut result = Vec::new();

        for scc in tarjan_scc(&self.graph) {
            let is_cycle = scc.len() > 1
                || (scc.len() == 1
                    && self
                        .graph
                        .neighbors_directed(scc[0], Direction::Outgoing)
                        .any(|n| n == scc[0]));
            if !is_cycle {
                continue;
            }

            let members: HashSet<NodeIndex> = scc.iter().copied().collect();
            let mut cycle: Vec<NodeIndex> = scc.clone();
            cycle.sort();
            let cycle: Vec<String> = cycle
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect();

            for edge in self.graph.raw_edges() {
                if members.contains(&edge.source()) && members.contains(&edge.target()) {
                    result.push(CycleEdge {
                        from: self.graph[edge.source()].clone(),
                        to: self.graph[edge.target()].clone(),
                        cycle: cycle.clone(),
                    });
                }
            }
        }

        // Tarjan emits components in reverse topological order; reorder by
        // the declared edge order instead.
        result.sort_by_key(|edge| {
            (
                self.node_indices.get(&edge.from).copied(),
                self.node_indices.get(&edge.to).copied(),
            )
        });
        result
    }
}
