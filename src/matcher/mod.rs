//! Pattern engine for detecting physics-law violations in story text
//!
//! Architecture: Service Layer - The matcher orchestrates rule evaluation over input text
//! - Rules are compiled once from the catalog and evaluated in catalog order
//! - Negative lookaheads suppress hits whose sentence states a mundane cause
//! - Each rule's evaluation is bounded by a cooperative deadline check, never preempted

pub mod context;

use crate::catalog::{compile_pattern, RuleCatalog};
use crate::config::DetectionConfig;
use crate::domain::violations::{AuditError, AuditResult, Category, Severity};
use regex::Regex;
use std::time::{Duration, Instant};

/// A raw, unreported match of one rule against the text
#[derive(Debug, Clone)]
pub struct RawHit {
    pub rule_id: String,
    pub category: Category,
    pub description: String,
    pub severity: Severity,
    /// Byte offset of the match start in the input text
    pub start: usize,
    /// Byte offset one past the match end
    pub end: usize,
    pub matched_text: String,
}

/// Result of one detection pass: surviving hits plus rules that timed out
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub hits: Vec<RawHit>,
    pub skipped_rules: Vec<String>,
}

/// A catalog rule compiled for matching
#[derive(Debug)]
struct CompiledRule {
    id: String,
    category: Category,
    description: String,
    severity: Severity,
    regex: Regex,
    lookaheads: Vec<Regex>,
}

/// Scans text against the compiled rule catalog
#[derive(Debug)]
pub struct Matcher {
    rules: Vec<CompiledRule>,
    rule_timeout: Duration,
}

impl Matcher {
    /// Compile all enabled catalog rules, preserving catalog order
    pub fn new(catalog: &RuleCatalog, detection: &DetectionConfig) -> AuditResult<Self> {
        catalog.validate()?;

        let mut rules = Vec::new();
        for rule in catalog.enabled_rules() {
            let regex = compile_pattern(&rule.pattern).map_err(|e| {
                AuditError::catalog(format!("Invalid pattern in rule '{}': {}", rule.id, e))
            })?;
            let lookaheads = rule
                .negative_lookaheads
                .iter()
                .map(|la| {
                    compile_pattern(la).map_err(|e| {
                        AuditError::catalog(format!(
                            "Invalid lookahead in rule '{}': {}",
                            rule.id, e
                        ))
                    })
                })
                .collect::<AuditResult<Vec<_>>>()?;

            rules.push(CompiledRule {
                id: rule.id.clone(),
                category: rule.category,
                description: rule.description.clone(),
                severity: rule.severity,
                regex,
                lookaheads,
            });
        }

        Ok(Self { rules, rule_timeout: detection.rule_timeout() })
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Scan the text against every rule, in catalog order.
    ///
    /// Rules are independent: the same span may produce hits in several
    /// categories. A rule exceeding its evaluation deadline is recorded as
    /// skipped and contributes no hits.
    pub fn detect(&self, text: &str) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();

        for rule in &self.rules {
            let deadline = Instant::now() + self.rule_timeout;
            let mut matches = rule.regex.find_iter(text);
            let mut timed_out = false;

            loop {
                if Instant::now() >= deadline {
                    timed_out = true;
                    break;
                }
                let Some(m) = matches.next() else { break };

                if self.is_suppressed(rule, text, m.start(), m.end()) {
                    tracing::debug!(
                        rule = %rule.id,
                        matched = m.as_str(),
                        "hit suppressed by negative lookahead"
                    );
                    continue;
                }

                outcome.hits.push(RawHit {
                    rule_id: rule.id.clone(),
                    category: rule.category,
                    description: rule.description.clone(),
                    severity: rule.severity,
                    start: m.start(),
                    end: m.end(),
                    matched_text: m.as_str().to_string(),
                });
            }

            if timed_out {
                tracing::warn!(
                    rule = %rule.id,
                    timeout_ms = self.rule_timeout.as_millis() as u64,
                    "rule evaluation exceeded deadline, skipping"
                );
                outcome.skipped_rules.push(rule.id.clone());
            }
        }

        outcome
    }

    /// Whether any of the rule's lookahead patterns matches the sentence
    /// containing the hit
    fn is_suppressed(&self, rule: &CompiledRule, text: &str, start: usize, end: usize) -> bool {
        if rule.lookaheads.is_empty() {
            return false;
        }
        let (sentence_start, sentence_end) = sentence_bounds(text, start, end);
        let sentence = &text[sentence_start..sentence_end];
        rule.lookaheads.iter().any(|la| la.is_match(sentence))
    }
}

/// Byte range of the sentence containing `[start, end)`
///
/// Sentence boundaries are `.`, `!`, `?`; ranges never split a sentence
/// terminator from its sentence.
fn sentence_bounds(text: &str, start: usize, end: usize) -> (usize, usize) {
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');
    let sentence_start = text[..start].rfind(is_terminator).map(|i| i + 1).unwrap_or(0);
    let sentence_end = text[end..].find(is_terminator).map(|i| end + i + 1).unwrap_or(text.len());
    (sentence_start, sentence_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuleCatalog;

    fn matcher() -> Matcher {
        Matcher::new(&RuleCatalog::with_defaults(), &DetectionConfig::default()).unwrap()
    }

    #[test]
    fn test_detects_unsupported_ascent() {
        let outcome = matcher().detect("The old wizard flew upward without any explanation.");

        assert_eq!(outcome.hits.len(), 1);
        let hit = &outcome.hits[0];
        assert_eq!(hit.rule_id, "gravity_unsupported_ascent");
        assert_eq!(hit.category, Category::Gravity);
        assert_eq!(hit.matched_text, "flew upward");
        assert!(outcome.skipped_rules.is_empty());
    }

    #[test]
    fn test_lookahead_suppresses_within_sentence() {
        // Propulsive cause stated before the hit, same sentence
        let outcome = matcher().detect("The rocket flew upward into the night.");
        assert!(outcome.hits.is_empty());

        // And stated after the hit
        let outcome = matcher().detect("She flew upward because the crane pulled her harness.");
        assert!(outcome.hits.is_empty());
    }

    #[test]
    fn test_lookahead_does_not_cross_sentence_boundary() {
        let outcome = matcher().detect("He flew upward without warning. A rocket sat on the pad.");

        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].rule_id, "gravity_unsupported_ascent");
    }

    #[test]
    fn test_matching_is_case_insensitive_with_original_offsets() {
        let text = "Suddenly the castle FLEW UPWARD over the hills.";
        let outcome = matcher().detect(text);

        assert_eq!(outcome.hits.len(), 1);
        let hit = &outcome.hits[0];
        assert_eq!(hit.matched_text, "FLEW UPWARD");
        assert_eq!(&text[hit.start..hit.end], "FLEW UPWARD");
    }

    #[test]
    fn test_rules_are_independent_per_span() {
        // One sentence triggering both a gravity rule and a mass rule
        let text = "The mountain floated into the sky and then vanished without a trace.";
        let outcome = matcher().detect(text);

        let categories: Vec<_> = outcome.hits.iter().map(|h| h.category).collect();
        assert!(categories.contains(&Category::Gravity));
        assert!(categories.contains(&Category::MassConservation));
    }

    #[test]
    fn test_quantum_tunneling_is_critical() {
        let outcome = matcher().detect("The cow walked through wall after wall.");

        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].rule_id, "quantum_macroscopic_tunneling");
        assert_eq!(outcome.hits[0].severity, Severity::Critical);
    }

    #[test]
    fn test_tunneling_suppressed_by_doorway() {
        let outcome = matcher().detect("She walked through the wall where the old doorway stood.");
        assert!(outcome.hits.is_empty());
    }

    #[test]
    fn test_zero_deadline_skips_every_rule() {
        let catalog = RuleCatalog::with_defaults();
        let detection = DetectionConfig { rule_timeout_ms: 0, ..Default::default() };
        let matcher = Matcher::new(&catalog, &detection).unwrap();

        let outcome = matcher.detect("The knight flew upward without wings.");

        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.skipped_rules.len(), matcher.rule_count());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let m = matcher();
        let text = "The moon drifted away. Ice froze harder in the hot sun and froze again.";

        let first: Vec<_> =
            m.detect(text).hits.iter().map(|h| (h.rule_id.clone(), h.start)).collect();
        let second: Vec<_> =
            m.detect(text).hits.iter().map(|h| (h.rule_id.clone(), h.start)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_sentence_bounds() {
        let text = "First part. Second part here! Third.";
        let (s, e) = sentence_bounds(text, 12, 18);
        assert_eq!(&text[s..e], " Second part here!");

        // Hit in the first sentence extends to text start
        let (s, _) = sentence_bounds(text, 0, 5);
        assert_eq!(s, 0);
    }
}
