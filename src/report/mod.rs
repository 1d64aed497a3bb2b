//! Report building and rendering
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - The Reporter turns raw hits into the ViolationReport aggregate
//! - The JSON formatter emits the fixed wire shape downstream consumers rely on
//! - Human rendering is presentation only and never feeds back into the domain

use crate::config::{DetectionConfig, RiskPolicy};
use crate::domain::violations::{AuditResult, Category, Severity, Violation, ViolationReport};
use crate::matcher::{context, DetectionOutcome};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Builds violation reports from detection outcomes
#[derive(Debug)]
pub struct Reporter {
    window_chars: usize,
    risk: RiskPolicy,
}

impl Reporter {
    pub fn new(detection: &DetectionConfig, risk: RiskPolicy) -> Self {
        Self { window_chars: detection.context_window_chars, risk }
    }

    /// Build a report from raw hits: dedup, context extraction, risk assessment.
    ///
    /// Hits whose `(rule_id, start)` pair collides are overlapping alternatives
    /// within one rule; only the first survives.
    pub fn build(&self, text: &str, outcome: DetectionOutcome) -> ViolationReport {
        let mut report = ViolationReport::new();
        let mut seen: HashSet<(String, usize)> = HashSet::new();

        for hit in &outcome.hits {
            if !seen.insert((hit.rule_id.clone(), hit.start)) {
                tracing::debug!(rule = %hit.rule_id, offset = hit.start, "duplicate hit dropped");
                continue;
            }
            report.add_violation(context::extract(text, hit, self.window_chars));
        }

        for rule_id in outcome.skipped_rules {
            report.add_skipped_rule(rule_id);
        }

        let risk = self.risk.assess(report.total_count, report.max_category_concentration());
        report.set_risk(risk);
        report.set_text_chars(text.chars().count());
        report
    }
}

/// Supported output formats for violation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format with colors and context
    Human,
    /// Fixed wire-shape JSON for programmatic consumption
    Json,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Whether to show context lines around violations
    pub show_context: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, show_context: true }
    }
}

/// Renders violation reports into their output formats
#[derive(Debug, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a violation report in the specified format
    pub fn format_report(
        &self,
        report: &ViolationReport,
        format: OutputFormat,
    ) -> AuditResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
        }
    }

    /// The fixed wire shape: downstream consumers depend on these exact keys
    fn format_json(&self, report: &ViolationReport) -> AuditResult<String> {
        let violations: Vec<JsonValue> = report
            .violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "category": v.category.as_str(),
                    "pattern": v.description,
                    "matched_text": v.matched_text,
                    "context": v.context,
                    "severity": v.severity.as_str(),
                })
            })
            .collect();

        let categories: Vec<&str> =
            report.categories_affected.iter().map(|c| c.as_str()).collect();

        let wire = serde_json::json!({
            "physics_violations": violations,
            "total_violations": report.total_count,
            "categories_affected": categories,
            "false_positive_risk": report.false_positive_risk.as_str(),
        });

        serde_json::to_string_pretty(&wire).map_err(|e| {
            crate::domain::violations::AuditError::config(format!("JSON serialization failed: {e}"))
        })
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ViolationReport) -> String {
        let mut output = String::new();

        if !report.has_violations() {
            if self.options.use_colors {
                output.push_str("\x1b[32mNo physics violations detected\x1b[0m\n");
            } else {
                output.push_str("No physics violations detected\n");
            }
        } else {
            if self.options.use_colors {
                output.push_str(&format!(
                    "\x1b[31mPhysics Violations Found: {}\x1b[0m\n\n",
                    report.total_count
                ));
            } else {
                output.push_str(&format!("Physics Violations Found: {}\n\n", report.total_count));
            }

            for category in Category::all() {
                let in_category: Vec<&Violation> = report.violations_in(*category).collect();
                if in_category.is_empty() {
                    continue;
                }

                output.push_str(&format!(
                    "{} ({} violation{})\n",
                    category.display_name(),
                    in_category.len(),
                    if in_category.len() == 1 { "" } else { "s" }
                ));

                for violation in in_category {
                    let severity_color = match violation.severity {
                        Severity::Critical => "31",
                        Severity::Moderate => "33",
                        Severity::Minor => "36",
                    };

                    if self.options.use_colors {
                        output.push_str(&format!(
                            "  @{} [\x1b[{}m{}\x1b[0m] {}: \"{}\"\n",
                            violation.char_offset,
                            severity_color,
                            violation.severity.as_str(),
                            violation.description,
                            violation.matched_text
                        ));
                    } else {
                        output.push_str(&format!("  {}\n", violation.format_display()));
                    }

                    if self.options.show_context {
                        if self.options.use_colors {
                            output.push_str(&format!("    \x1b[2m| {}\x1b[0m\n", violation.context));
                        } else {
                            output.push_str(&format!("    | {}\n", violation.context));
                        }
                    }
                }
                output.push('\n');
            }
        }

        if !report.skipped_rules.is_empty() {
            output.push_str(&format!(
                "Skipped rules (evaluation deadline exceeded): {}\n",
                report.skipped_rules.join(", ")
            ));
        }

        output.push_str(&format!(
            "Summary: {} violation{} across {} categor{}, false-positive risk {} ({} chars, {}ms)\n",
            report.total_count,
            if report.total_count == 1 { "" } else { "s" },
            report.categories_affected.len(),
            if report.categories_affected.len() == 1 { "y" } else { "ies" },
            report.false_positive_risk.as_str(),
            report.summary.text_chars,
            report.summary.execution_time_ms
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuleCatalog;
    use crate::domain::violations::FalsePositiveRisk;
    use crate::matcher::{Matcher, RawHit};

    fn build_from(text: &str) -> ViolationReport {
        let matcher =
            Matcher::new(&RuleCatalog::with_defaults(), &DetectionConfig::default()).unwrap();
        let reporter = Reporter::new(&DetectionConfig::default(), RiskPolicy::default());
        reporter.build(text, matcher.detect(text))
    }

    #[test]
    fn test_build_assigns_low_risk_to_single_hit() {
        let report = build_from("The knight flew upward without explanation.");

        assert_eq!(report.total_count, 1);
        assert_eq!(report.false_positive_risk, FalsePositiveRisk::Low);
        assert!(report.categories_affected.contains(&Category::Gravity));
    }

    #[test]
    fn test_build_dedups_colliding_hits() {
        let reporter = Reporter::new(&DetectionConfig::default(), RiskPolicy::default());
        let text = "He flew upward over the cliff.";
        let hit = RawHit {
            rule_id: "gravity_unsupported_ascent".to_string(),
            category: Category::Gravity,
            description: "Upward motion without apparent force or mechanism".to_string(),
            severity: Severity::Moderate,
            start: 3,
            end: 14,
            matched_text: "flew upward".to_string(),
        };
        let outcome =
            DetectionOutcome { hits: vec![hit.clone(), hit], skipped_rules: Vec::new() };

        let report = reporter.build(text, outcome);
        assert_eq!(report.total_count, 1);
    }

    #[test]
    fn test_wire_json_shape_is_exact() {
        let formatter = ReportFormatter::default();
        let report = build_from("The knight flew upward without explanation.");
        let output = formatter.format_report(&report, OutputFormat::Json).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert!(object.contains_key("physics_violations"));
        assert!(object.contains_key("total_violations"));
        assert!(object.contains_key("categories_affected"));
        assert!(object.contains_key("false_positive_risk"));

        let violation = &json["physics_violations"][0];
        let fields = violation.as_object().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(violation["category"], "Gravity");
        assert_eq!(violation["severity"], "moderate");
        assert_eq!(violation["matched_text"], "flew upward");
        assert!(violation["context"].as_str().unwrap().contains("flew upward"));

        assert_eq!(json["total_violations"], 1);
        assert_eq!(json["categories_affected"][0], "Gravity");
        assert_eq!(json["false_positive_risk"], "low");
    }

    #[test]
    fn test_human_format_groups_by_category() {
        let formatter = ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() });
        let report = build_from(
            "The knight flew upward without explanation. His shield vanished without a trace.",
        );
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.contains("Physics Violations Found: 2"));
        assert!(output.contains("Gravity Violations"));
        assert!(output.contains("Conservation of Mass Violations"));
        assert!(output.contains("Summary:"));
    }

    #[test]
    fn test_human_format_clean_report() {
        let formatter = ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() });
        let report = build_from("The knight rode to the castle.");
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.contains("No physics violations detected"));
    }

    #[test]
    fn test_skipped_rules_render_in_human_but_not_wire() {
        let mut report = build_from("The knight rode to the castle.");
        report.add_skipped_rule("gravity_unsupported_ascent");

        let formatter = ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() });
        let human = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.contains("Skipped rules"));

        let json = formatter.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: JsonValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), 4);
        assert!(!json.contains("skipped"));
    }
}
