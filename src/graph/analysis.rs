//! Declaration Graph Analysis
//!
//! Builds a petgraph view of everything reachable from a session's registries:
//! containment edges from the arena plus reference edges recorded by a
//! [`TypeResolver`]. Used to report recursive declaration groups and to export
//! DOT.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::error::Result;
use crate::node::{DeclarationArena, DeclarationKind, NodeId};
use crate::resolve::TypeResolver;
use crate::session::RegistrySet;

/// Types of edges in the declaration graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
    /// Parent → child in the parsed tree (or a shared/back edge)
    Contains,
    /// Resolved type/ref/base reference
    References,
}

/// Reachable declarations and the edges between them
#[derive(Debug, Clone)]
pub struct DeclarationGraph {
    graph: DiGraph<NodeId, EdgeKind>,
    indices: HashMap<NodeId, NodeIndex>,
}

impl DeclarationGraph {
    /// Build from every registry root in `set`, optionally adding resolved references
    pub fn build(set: &RegistrySet, resolver: Option<&TypeResolver>) -> Result<Self> {
        let mut this = Self {
            graph: DiGraph::new(),
            indices: HashMap::new(),
        };
        let arena = set.arena();

        let mut queue: VecDeque<NodeId> = set
            .registries()
            .flat_map(|r| r.roots().iter().copied())
            .collect();
        for &root in &queue {
            this.index_of(root);
        }

        while let Some(id) = queue.pop_front() {
            let from = this.index_of(id);
            for &child in arena.children(id)? {
                let is_new = !this.indices.contains_key(&child);
                let to = this.index_of(child);
                this.graph.add_edge(from, to, EdgeKind::Contains);
                if is_new {
                    queue.push_back(child);
                }
            }
        }

        if let Some(resolver) = resolver {
            for (node, _, resolution) in resolver.resolutions() {
                if let Some(target) = resolution.node() {
                    let from = this.index_of(node);
                    let to = this.index_of(target);
                    this.graph.add_edge(from, to, EdgeKind::References);
                }
            }
        }

        Ok(this)
    }

    fn index_of(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&idx) = self.indices.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id);
        self.indices.insert(id, idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Strongly connected groups: mutual recursion, or a single self-referencing node
    pub fn recursive_groups(&self) -> Vec<Vec<NodeId>> {
        let mut groups: Vec<Vec<NodeId>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.edges(scc[0]).any(|e| e.target() == scc[0])
            })
            .map(|scc| {
                let mut members: Vec<NodeId> = scc.into_iter().map(|idx| self.graph[idx]).collect();
                members.sort();
                members
            })
            .collect();
        groups.sort();
        groups
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self, arena: &DeclarationArena) -> String {
        let mut output = String::new();

        output.push_str("digraph DeclarationGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8];\n");
        output.push('\n');

        for idx in self.graph.node_indices() {
            let id = self.graph[idx];
            let (label, color) = match arena.get(id) {
                Ok(node) => {
                    let label = match &node.name {
                        Some(name) => format!("{} {}", node.kind, name),
                        None => node.kind.to_string(),
                    };
                    (label, kind_color(&node.kind))
                }
                Err(_) => (id.to_string(), "#9E9E9E"),
            };
            output.push_str(&format!(
                "  n{} [label=\"{}\", fillcolor=\"{}\"];\n",
                id.index(),
                label.replace('"', "\\\""),
                color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = self.graph[edge.source()];
            let target = self.graph[edge.target()];
            let style = match edge.weight() {
                EdgeKind::Contains => "",
                EdgeKind::References => " [style=dashed]",
            };
            output.push_str(&format!("  n{} -> n{}{};\n", source.index(), target.index(), style));
        }

        output.push_str("}\n");
        output
    }
}

fn kind_color(kind: &DeclarationKind) -> &'static str {
    match kind {
        DeclarationKind::Schema => "#607D8B",
        DeclarationKind::ComplexType => "#00BCD4",
        DeclarationKind::SimpleType => "#4CAF50",
        DeclarationKind::Element => "#FF9800",
        DeclarationKind::Group | DeclarationKind::AttributeGroup => "#9C27B0",
        DeclarationKind::Attribute => "#2196F3",
        DeclarationKind::Include | DeclarationKind::Import => "#F44336",
        DeclarationKind::Annotation | DeclarationKind::Other(_) => "#9E9E9E",
    }
}
