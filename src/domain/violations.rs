//! Core domain models for physics-law violations and analysis results
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - Violations carry their category, severity, and review context
//! - ViolationReport acts as an aggregate root managing collections of violations
//! - Report-level facts (categories affected, risk) are maintained as violations are added

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The ten physics domains that violation rules are grouped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum Category {
    Gravity,
    EnergyConservation,
    MassConservation,
    Thermodynamics,
    Relativity,
    NewtonianMechanics,
    MaterialStrength,
    Biology,
    PlanetaryPhysics,
    QuantumPhysics,
}

impl Category {
    /// Wire-format name for this category
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gravity => "Gravity",
            Self::EnergyConservation => "EnergyConservation",
            Self::MassConservation => "MassConservation",
            Self::Thermodynamics => "Thermodynamics",
            Self::Relativity => "Relativity",
            Self::NewtonianMechanics => "NewtonianMechanics",
            Self::MaterialStrength => "MaterialStrength",
            Self::Biology => "Biology",
            Self::PlanetaryPhysics => "PlanetaryPhysics",
            Self::QuantumPhysics => "QuantumPhysics",
        }
    }

    /// Human-readable display name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gravity => "Gravity Violations",
            Self::EnergyConservation => "Conservation of Energy Violations",
            Self::MassConservation => "Conservation of Mass Violations",
            Self::Thermodynamics => "Thermodynamics Violations",
            Self::Relativity => "Relativity Violations",
            Self::NewtonianMechanics => "Newton's Laws Violations",
            Self::MaterialStrength => "Material Strength Violations",
            Self::Biology => "Biological/Survival Violations",
            Self::PlanetaryPhysics => "Planetary Physics Violations",
            Self::QuantumPhysics => "Quantum Physics Violations",
        }
    }

    /// All categories in catalog evaluation order
    pub fn all() -> &'static [Category] {
        &[
            Self::Gravity,
            Self::EnergyConservation,
            Self::MassConservation,
            Self::Thermodynamics,
            Self::Relativity,
            Self::NewtonianMechanics,
            Self::MaterialStrength,
            Self::Biology,
            Self::PlanetaryPhysics,
            Self::QuantumPhysics,
        ]
    }
}

/// Severity levels for physics violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Stylistic stretches a reader might forgive
    Minor,
    /// Clear breaks of physical law within otherwise grounded narration
    Moderate,
    /// Impossibilities that no reading can reconcile
    Critical,
}

impl Severity {
    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Critical => "critical",
        }
    }
}

/// Coarse estimate of how likely the report is to contain spurious matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FalsePositiveRisk {
    Low,
    Medium,
    High,
}

impl FalsePositiveRisk {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A physics-law violation detected in story text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Physics domain this violation belongs to
    pub category: Category,
    /// Identifier of the rule that detected this violation
    pub rule_id: String,
    /// Human-readable description of the violated pattern
    pub description: String,
    /// The exact text span that triggered the rule
    pub matched_text: String,
    /// Original-case text surrounding the match, for human review
    pub context: String,
    /// Character offset of the match start in the input text
    pub char_offset: usize,
    /// Severity assigned by the rule definition
    pub severity: Severity,
}

impl Violation {
    /// Format violation for display
    pub fn format_display(&self) -> String {
        format!(
            "@{} [{}/{}] {}: \"{}\"",
            self.char_offset,
            self.category.as_str(),
            self.severity.as_str(),
            self.description,
            self.matched_text
        )
    }
}

/// Summary metadata for a violation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Length of the analyzed text in characters
    pub text_chars: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when analysis was performed
    pub analyzed_at: DateTime<Utc>,
}

impl Default for AnalysisSummary {
    fn default() -> Self {
        Self { text_chars: 0, execution_time_ms: 0, analyzed_at: Utc::now() }
    }
}

/// Complete violation report for one analysis call
///
/// Derived entirely from its input text; no state is carried across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationReport {
    /// All violations found, in catalog evaluation order
    pub violations: Vec<Violation>,
    /// Categories with at least one surviving violation
    pub categories_affected: BTreeSet<Category>,
    /// Total number of violations
    pub total_count: usize,
    /// Heuristic estimate of false-positive likelihood
    pub false_positive_risk: FalsePositiveRisk,
    /// Rules skipped because their evaluation deadline expired
    pub skipped_rules: Vec<String>,
    /// Summary metadata
    pub summary: AnalysisSummary,
}

impl ViolationReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            categories_affected: BTreeSet::new(),
            total_count: 0,
            false_positive_risk: FalsePositiveRisk::Low,
            skipped_rules: Vec::new(),
            summary: AnalysisSummary::default(),
        }
    }

    /// Add a violation, keeping derived fields consistent
    pub fn add_violation(&mut self, violation: Violation) {
        self.categories_affected.insert(violation.category);
        self.violations.push(violation);
        self.total_count = self.violations.len();
    }

    /// Record a rule whose pattern evaluation timed out
    pub fn add_skipped_rule(&mut self, rule_id: impl Into<String>) {
        self.skipped_rules.push(rule_id.into());
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations belonging to a specific category
    pub fn violations_in(&self, category: Category) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.category == category)
    }

    /// Number of violations in the most-hit category
    pub fn max_category_concentration(&self) -> usize {
        Category::all()
            .iter()
            .map(|c| self.violations_in(*c).count())
            .max()
            .unwrap_or(0)
    }

    /// Set the false-positive risk assessment
    pub fn set_risk(&mut self, risk: FalsePositiveRisk) {
        self.false_positive_risk = risk;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the analyzed text length
    pub fn set_text_chars(&mut self, chars: usize) {
        self.summary.text_chars = chars;
    }
}

impl Default for ViolationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur during analysis
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Input text was empty or otherwise unusable
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Rule catalog could not be loaded or compiled
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Relation lookup against the external collaborator failed
    #[error("Relation lookup error for '{term}': {message}")]
    Relation { term: String, message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AuditError {
    /// Create an invalid-input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a relation lookup error
    pub fn relation(term: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Relation { term: term.into(), message: message.into() }
    }
}

/// Result type for auditor operations
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(category: Category, rule_id: &str) -> Violation {
        Violation {
            category,
            rule_id: rule_id.to_string(),
            description: "test description".to_string(),
            matched_text: "flew upward".to_string(),
            context: "...knight flew upward without...".to_string(),
            char_offset: 14,
            severity: Severity::Moderate,
        }
    }

    #[test]
    fn test_report_tracks_categories_and_count() {
        let mut report = ViolationReport::new();

        report.add_violation(violation(Category::Gravity, "gravity_unsupported_ascent"));
        report.add_violation(violation(Category::Gravity, "gravity_reversed"));
        report.add_violation(violation(Category::MassConservation, "mass_vanishing"));

        assert!(report.has_violations());
        assert_eq!(report.total_count, 3);
        assert_eq!(report.categories_affected.len(), 2);
        assert!(report.categories_affected.contains(&Category::Gravity));
        assert_eq!(report.violations_in(Category::Gravity).count(), 2);
        assert_eq!(report.max_category_concentration(), 2);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
        assert_eq!(Severity::Critical.as_str(), "critical");
    }

    #[test]
    fn test_category_names_are_stable() {
        assert_eq!(Category::all().len(), 10);
        assert_eq!(Category::Gravity.as_str(), "Gravity");
        assert_eq!(Category::EnergyConservation.as_str(), "EnergyConservation");
        assert_eq!(Category::QuantumPhysics.display_name(), "Quantum Physics Violations");
    }

    #[test]
    fn test_empty_report_defaults() {
        let report = ViolationReport::new();
        assert!(!report.has_violations());
        assert_eq!(report.total_count, 0);
        assert_eq!(report.false_positive_risk, FalsePositiveRisk::Low);
        assert!(report.skipped_rules.is_empty());
    }

    #[test]
    fn test_violation_display_format() {
        let v = violation(Category::Gravity, "gravity_unsupported_ascent");
        let display = v.format_display();
        assert!(display.contains("Gravity"));
        assert!(display.contains("moderate"));
        assert!(display.contains("flew upward"));
    }
}
