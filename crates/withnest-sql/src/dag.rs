//! Component dependency graph and cycle detection

use std::collections::{BTreeSet, HashMap};
use crate::analyze::DependencyMap;

/// Node identifier (component name)
pub type NodeId = String;

/// Directed graph with one edge per dependency-list entry
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Forward edges: node -> nodes it depends on, in text order
    parents: HashMap<NodeId, Vec<NodeId>>,

    /// All nodes touching an edge, sorted for deterministic traversal
    nodes: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

impl DependencyGraph {
    /// Build the graph from a dependency map
    ///
    /// Components without dependencies contribute no edges.
    pub fn from_dependencies(dependencies: &DependencyMap) -> Self {
        let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut nodes = BTreeSet::new();

        for (node_id, deps) in dependencies {
            if deps.is_empty() {
                continue;
            }

            nodes.insert(node_id.clone());
            for dep_id in deps {
                nodes.insert(dep_id.clone());
            }
            parents.insert(node_id.clone(), deps.clone());
        }

        Self { parents, nodes }
    }

    /// Get all nodes in the graph
    pub fn all_nodes(&self) -> Vec<&NodeId> {
        self.nodes.iter().collect()
    }

    /// Get immediate parents (dependencies) of a node
    pub fn parents(&self, node_id: &str) -> Vec<&NodeId> {
        self.parents
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Check whether any cycle exists, self-loops included
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Find one cycle, returned as a path whose first node is repeated at the end
    ///
    /// Depth-first traversal keeping the current path as an explicit stack;
    /// any edge back into the stack closes a cycle.
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();

        for root in &self.nodes {
            if marks.contains_key(root.as_str()) {
                continue;
            }
            if let Some(cycle) = self.visit(root, &mut marks, &mut path) {
                return Some(cycle);
            }
        }

        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<NodeId>> {
        marks.insert(node, Mark::OnStack);
        path.push(node);

        for parent in self.parents(node) {
            match marks.get(parent.as_str()) {
                Some(Mark::OnStack) => {
                    let start = path.iter().position(|n| *n == parent.as_str()).unwrap_or(0);
                    let mut cycle: Vec<NodeId> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(parent.clone());
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(cycle) = self.visit(parent, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        None
    }
}
