//! Domain models for the concept graph pipeline
//!
//! Architecture: Rich Domain Models - ConceptGraph is an aggregate that enforces its own invariants
//! - Node identity is the normalized term string; duplicate inserts reuse the existing node
//! - Edge weights are clamped non-negative at the boundary
//! - Depth is recorded per node so the hop-limit invariant is checkable after assembly

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A salient term extracted from story text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Normalized (lowercased) term
    pub term: String,
    /// Occurrence count across the text
    pub frequency: usize,
    /// Whether the term looks like a proper noun
    pub is_proper_noun: bool,
    /// Salience score used for ranking
    pub score: f64,
}

/// A semantic relation sourced from the external relation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTerm {
    /// The related term itself
    pub term: String,
    /// Kind of relation (e.g. "RelatedTo", "IsA")
    pub relation_kind: String,
    /// Relation strength reported by the collaborator
    pub weight: f64,
}

/// Role a node plays in the concept graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The single root node representing the story itself
    Story,
    /// A concept extracted from the story text
    Concept,
    /// A term reached through the relation collaborator
    Related,
}

/// A node in the concept graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Normalized identity (lowercase, spaces replaced with underscores)
    pub id: String,
    /// Display label preserving the source casing
    pub label: String,
    /// Role of this node
    pub kind: NodeKind,
    /// Hop distance from the story node
    pub depth: u32,
}

/// A weighted, labeled edge between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Relation kind carried on the edge
    pub relation_kind: String,
    /// Non-negative edge weight
    pub weight: f64,
}

/// Aggregate statistics for an assembled graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub story_concepts: usize,
    pub related_concepts: usize,
    pub total_edges: usize,
    /// Deepest hop distance present in the graph
    pub depth: u32,
}

/// Concept graph produced for one analysis call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
    /// Index from node id to position in `nodes`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// Normalize a term into a node identity
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase().replace(' ', "_")
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, reusing an existing one with the same identity.
    ///
    /// When the node already exists its depth is lowered to the smaller of the
    /// two, since a shorter path to the story node has been found. Returns the
    /// node id.
    pub fn add_node(&mut self, label: &str, kind: NodeKind, depth: u32) -> String {
        let id = normalize_term(label);
        match self.index.get(&id) {
            Some(&pos) => {
                let node = &mut self.nodes[pos];
                if depth < node.depth {
                    node.depth = depth;
                }
            }
            None => {
                self.index.insert(id.clone(), self.nodes.len());
                self.nodes.push(GraphNode { id: id.clone(), label: label.trim().to_string(), kind, depth });
            }
        }
        id
    }

    /// Insert an edge between two existing nodes, clamping weight non-negative
    pub fn add_edge(&mut self, source: &str, target: &str, relation_kind: &str, weight: f64) {
        debug_assert!(self.contains_node(source) && self.contains_node(target));
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation_kind: relation_kind.to_string(),
            weight: weight.max(0.0),
        });
    }

    /// Whether a node with this id exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Rebuild the id index after deserialization
    pub fn rebuild_index(&mut self) {
        self.index =
            self.nodes.iter().enumerate().map(|(pos, node)| (node.id.clone(), pos)).collect();
    }

    /// Recompute aggregate statistics from current nodes and edges
    pub fn finalize_stats(&mut self) {
        self.stats = GraphStats {
            total_nodes: self.nodes.len(),
            story_concepts: self.nodes.iter().filter(|n| n.kind == NodeKind::Concept).count(),
            related_concepts: self.nodes.iter().filter(|n| n.kind == NodeKind::Related).count(),
            total_edges: self.edges.len(),
            depth: self.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_identity_is_case_insensitive() {
        let mut graph = ConceptGraph::new();
        let a = graph.add_node("Dragon", NodeKind::Concept, 1);
        let b = graph.add_node("dragon", NodeKind::Related, 2);

        assert_eq!(a, b);
        assert_eq!(graph.nodes.len(), 1);
        // First insert wins on kind/label, shortest path wins on depth
        assert_eq!(graph.node("dragon").unwrap().kind, NodeKind::Concept);
        assert_eq!(graph.node("dragon").unwrap().depth, 1);
    }

    #[test]
    fn test_normalize_term_replaces_spaces() {
        assert_eq!(normalize_term("  Fire Breathing  "), "fire_breathing");
        assert_eq!(normalize_term("Knight"), "knight");
    }

    #[test]
    fn test_edge_weight_clamped_non_negative() {
        let mut graph = ConceptGraph::new();
        graph.add_node("story", NodeKind::Story, 0);
        graph.add_node("knight", NodeKind::Concept, 1);
        graph.add_edge("story", "knight", "mentions", -0.5);

        assert_eq!(graph.edges[0].weight, 0.0);
    }

    #[test]
    fn test_finalize_stats() {
        let mut graph = ConceptGraph::new();
        let story = graph.add_node("story", NodeKind::Story, 0);
        let knight = graph.add_node("knight", NodeKind::Concept, 1);
        let armor = graph.add_node("armor", NodeKind::Related, 2);
        graph.add_edge(&story, &knight, "mentions", 1.0);
        graph.add_edge(&knight, &armor, "RelatedTo", 0.7);
        graph.finalize_stats();

        assert_eq!(graph.stats.total_nodes, 3);
        assert_eq!(graph.stats.story_concepts, 1);
        assert_eq!(graph.stats.related_concepts, 1);
        assert_eq!(graph.stats.total_edges, 2);
        assert_eq!(graph.stats.depth, 2);
    }
}
