//! Configuration loading and management
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain values with embedded defaults
//! - Tunable policy (risk thresholds, window sizes, limits) lives here, not in logic
//! - Every knob the analysis pipelines consume is declarative and overridable

use crate::domain::violations::{AuditError, AuditResult, FalsePositiveRisk};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the auditor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Violation detection tunables
    pub detection: DetectionConfig,
    /// Concept extraction tunables
    pub concepts: ConceptConfig,
    /// Relation fetching tunables
    pub relations: RelationConfig,
    /// Graph assembly tunables
    pub graph: GraphConfig,
    /// False-positive risk thresholds
    pub risk: RiskPolicy,
}

/// Tunables for the pattern matcher and context extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Characters of surrounding text captured on each side of a match
    pub context_window_chars: usize,
    /// Wall-clock bound for evaluating a single rule, in milliseconds
    pub rule_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { context_window_chars: 50, rule_timeout_ms: 5_000 }
    }
}

impl DetectionConfig {
    pub fn rule_timeout(&self) -> Duration {
        Duration::from_millis(self.rule_timeout_ms)
    }
}

/// Tunables for the concept scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptConfig {
    /// Number of top-ranked concepts to keep
    pub top_k: usize,
    /// Minimum token length considered a candidate concept
    pub min_token_chars: usize,
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self { top_k: 7, min_token_chars: 3 }
    }
}

/// Tunables for the relation fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Base URL of the relation-lookup collaborator
    pub endpoint: String,
    /// Related terms requested per concept
    pub fetch_limit: usize,
    /// Maximum concurrent lookups
    pub max_concurrent_fetches: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://api.conceptnet.io".to_string(),
            fetch_limit: 5,
            max_concurrent_fetches: 5,
            request_timeout_secs: 4,
        }
    }
}

/// Tunables for the graph assembler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum hop distance from the story node
    pub max_depth: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { max_depth: 2 }
    }
}

/// Thresholds driving the false-positive risk heuristic
///
/// The heuristic is coarse by design: many hits, or many hits piling into one
/// category, usually means an over-eager pattern rather than a genuinely
/// lawless story.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// A report stays Low while total violations are at or below this and no
    /// category holds more than one
    pub low_max_total: usize,
    /// Total violations at or above this push the report to High
    pub high_min_total: usize,
    /// A single category holding this many violations pushes the report to High
    pub high_category_min: usize,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self { low_max_total: 2, high_min_total: 6, high_category_min: 3 }
    }
}

impl RiskPolicy {
    /// Assess risk from the violation total and the most-hit category's count
    pub fn assess(&self, total: usize, max_category_concentration: usize) -> FalsePositiveRisk {
        if total >= self.high_min_total || max_category_concentration >= self.high_category_min {
            FalsePositiveRisk::High
        } else if total <= self.low_max_total && max_category_concentration <= 1 {
            FalsePositiveRisk::Low
        } else {
            FalsePositiveRisk::Medium
        }
    }
}

impl AuditConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AuditResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AuditError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::load_from_str(&contents)
    }

    /// Load configuration from YAML content
    pub fn load_from_str(content: &str) -> AuditResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AuditError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for usable values
    pub fn validate(&self) -> AuditResult<()> {
        if self.concepts.top_k == 0 {
            return Err(AuditError::config("concepts.top_k must be at least 1"));
        }
        if self.concepts.min_token_chars == 0 {
            return Err(AuditError::config("concepts.min_token_chars must be at least 1"));
        }
        if self.relations.max_concurrent_fetches == 0 {
            return Err(AuditError::config("relations.max_concurrent_fetches must be at least 1"));
        }
        if self.relations.endpoint.is_empty() {
            return Err(AuditError::config("relations.endpoint must not be empty"));
        }
        if self.graph.max_depth == 0 {
            return Err(AuditError::config("graph.max_depth must be at least 1"));
        }
        if self.risk.high_min_total <= self.risk.low_max_total {
            return Err(AuditError::config(
                "risk.high_min_total must be greater than risk.low_max_total",
            ));
        }
        Ok(())
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: AuditConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: AuditConfig::default() }
    }

    /// Set the context window width
    pub fn context_window_chars(mut self, chars: usize) -> Self {
        self.config.detection.context_window_chars = chars;
        self
    }

    /// Set the per-rule evaluation timeout
    pub fn rule_timeout_ms(mut self, ms: u64) -> Self {
        self.config.detection.rule_timeout_ms = ms;
        self
    }

    /// Set the number of concepts kept after ranking
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.concepts.top_k = k;
        self
    }

    /// Set the relation-lookup endpoint
    pub fn relation_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.relations.endpoint = endpoint.into();
        self
    }

    /// Set the maximum graph depth
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.graph.max_depth = depth;
        self
    }

    /// Set the risk thresholds
    pub fn risk_policy(mut self, policy: RiskPolicy) -> Self {
        self.config.risk = policy;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> AuditResult<AuditConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AuditConfig::default();
        assert_eq!(config.detection.context_window_chars, 50);
        assert_eq!(config.detection.rule_timeout_ms, 5_000);
        assert_eq!(config.concepts.top_k, 7);
        assert_eq!(config.relations.fetch_limit, 5);
        assert_eq!(config.relations.max_concurrent_fetches, 5);
        assert_eq!(config.graph.max_depth, 2);
        config.validate().unwrap();
    }

    #[rstest]
    #[case(0, 0, FalsePositiveRisk::Low)]
    #[case(2, 1, FalsePositiveRisk::Low)]
    #[case(3, 1, FalsePositiveRisk::Medium)]
    #[case(2, 2, FalsePositiveRisk::Medium)]
    #[case(6, 1, FalsePositiveRisk::High)]
    #[case(4, 3, FalsePositiveRisk::High)]
    fn test_risk_assessment(
        #[case] total: usize,
        #[case] concentration: usize,
        #[case] expected: FalsePositiveRisk,
    ) {
        let policy = RiskPolicy::default();
        assert_eq!(policy.assess(total, concentration), expected);
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let config = AuditConfig::load_from_str(
            r#"
concepts:
  top_k: 10
graph:
  max_depth: 3
"#,
        )
        .unwrap();

        assert_eq!(config.concepts.top_k, 10);
        assert_eq!(config.graph.max_depth, 3);
        // Untouched sections keep their defaults
        assert_eq!(config.detection.context_window_chars, 50);
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let result = AuditConfig::load_from_str("concepts:\n  top_k: 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_applies_overrides() {
        let config = ConfigBuilder::new()
            .context_window_chars(30)
            .top_k(5)
            .max_depth(3)
            .relation_endpoint("http://localhost:9999")
            .build()
            .unwrap();

        assert_eq!(config.detection.context_window_chars, 30);
        assert_eq!(config.concepts.top_k, 5);
        assert_eq!(config.graph.max_depth, 3);
        assert_eq!(config.relations.endpoint, "http://localhost:9999");
    }

    #[test]
    fn test_builder_rejects_inconsistent_risk_policy() {
        let result = ConfigBuilder::new()
            .risk_policy(RiskPolicy { low_max_total: 6, high_min_total: 4, high_category_min: 3 })
            .build();
        assert!(result.is_err());
    }
}
