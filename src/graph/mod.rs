//! Concept graph assembly
//!
//! Architecture: Service Layer - The assembler turns scored concepts and fetched
//! relations into one ConceptGraph aggregate
//! - The story root sits at depth 0; concepts at 1; related terms at 2
//! - Nodes past the configured hop limit are never materialized
//! - Stopword and empty related terms are filtered before insertion

use crate::concepts::is_stopword;
use crate::config::GraphConfig;
use crate::domain::graph::{Concept, ConceptGraph, NodeKind, RelatedTerm};
use std::collections::HashMap;

const STORY_NODE_LABEL: &str = "Story";
const MENTIONS_RELATION: &str = "mentions";

/// Builds a concept graph from scored concepts and their fetched relations
#[derive(Debug)]
pub struct GraphAssembler {
    max_depth: u32,
}

impl GraphAssembler {
    pub fn new(config: &GraphConfig) -> Self {
        Self { max_depth: config.max_depth }
    }

    /// Assemble the graph. Concepts attach to the story root with "mentions"
    /// edges; related terms attach to their concept when the hop limit allows
    /// a second level.
    pub fn assemble(
        &self,
        concepts: &[Concept],
        relations: &HashMap<String, Vec<RelatedTerm>>,
    ) -> ConceptGraph {
        let mut graph = ConceptGraph::new();
        let story_id = graph.add_node(STORY_NODE_LABEL, NodeKind::Story, 0);

        // All concept nodes go in first so a related term that is also a
        // story concept keeps its Concept kind and depth 1
        let mut concept_ids = Vec::with_capacity(concepts.len());
        for concept in concepts {
            if self.max_depth < 1 {
                break;
            }
            let concept_id = graph.add_node(&concept.term, NodeKind::Concept, 1);
            graph.add_edge(&story_id, &concept_id, MENTIONS_RELATION, 1.0);
            concept_ids.push(concept_id);
        }

        if self.max_depth >= 2 {
            for (concept, concept_id) in concepts.iter().zip(&concept_ids) {
                let Some(related) = relations.get(&concept.term) else {
                    continue;
                };

                for rel in related {
                    let term = rel.term.trim();
                    if term.is_empty() || is_stopword(&term.to_lowercase()) {
                        continue;
                    }

                    let related_id = graph.add_node(term, NodeKind::Related, 2);
                    if &related_id == concept_id {
                        continue;
                    }
                    graph.add_edge(concept_id, &related_id, &rel.relation_kind, rel.weight);
                }
            }
        }

        graph.finalize_stats();
        graph
    }
}
