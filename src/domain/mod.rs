//! Domain layer containing core entities and value objects
//!
//! Architecture: Domain-Driven Design - Pure domain models with no infrastructure dependencies
//! - Violation entities and the report aggregate for the detection pipeline
//! - Concept, relation, and graph models for the extraction pipeline

pub mod graph;
pub mod violations;
