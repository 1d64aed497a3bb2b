//! Rule catalog loading and management
//!
//! Architecture: Anti-Corruption Layer - The catalog translates external YAML rule tables
//! - Rules are pure data: category, pattern, suppressors, severity
//! - Built-in defaults cover the ten physics domains and are embedded in the domain
//! - Matching logic never branches on individual rules; adding a rule is a data change

use crate::domain::violations::{AuditError, AuditResult, Category, Severity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A single violation rule: pure data, compiled by the matcher at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsRule {
    /// Unique identifier for this rule
    pub id: String,
    /// Physics domain this rule belongs to
    pub category: Category,
    /// Regex pattern evaluated against the story text
    pub pattern: String,
    /// Human-readable description of what the rule detects
    pub description: String,
    /// Suppressor patterns: a hit is discarded when any of these matches
    /// within the sentence containing the hit
    #[serde(default)]
    pub negative_lookaheads: Vec<String>,
    /// Severity assigned to violations of this rule
    pub severity: Severity,
    /// Whether this rule is evaluated
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Versioned table of violation rules, loaded once at process start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCatalog {
    /// Catalog format version
    pub version: String,
    /// Rules in evaluation order
    pub rules: Vec<PhysicsRule>,
}

fn default_true() -> bool {
    true
}

/// Shorthand for building the default rule table
fn rule(
    id: &str,
    category: Category,
    pattern: &str,
    description: &str,
    lookaheads: &[&str],
    severity: Severity,
) -> PhysicsRule {
    PhysicsRule {
        id: id.to_string(),
        category,
        pattern: pattern.to_string(),
        description: description.to_string(),
        negative_lookaheads: lookaheads.iter().map(|s| s.to_string()).collect(),
        severity,
        enabled: true,
    }
}

impl RuleCatalog {
    /// Load a catalog from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AuditResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            AuditError::catalog(format!(
                "Failed to read catalog file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::load_from_str(&contents)
    }

    /// Load a catalog from YAML content
    pub fn load_from_str(content: &str) -> AuditResult<Self> {
        let catalog: Self = serde_yaml::from_str(content)
            .map_err(|e| AuditError::catalog(format!("Failed to parse catalog: {e}")))?;

        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in catalog covering the ten physics domains
    pub fn with_defaults() -> Self {
        use Category::*;
        use Severity::*;

        Self {
            version: "1.0".to_string(),
            rules: vec![
                // -- Gravity --
                rule(
                    "gravity_unsupported_ascent",
                    Gravity,
                    r"\b(?:flew|floated|rose|lifted|ascended)\s+(?:up(?:ward)?|into\s+(?:the\s+)?(?:sky|air|ceiling))\b",
                    "Upward motion without apparent force or mechanism",
                    &[r"\b(?:pulled|pushed|threw|tossed|jumped|rocket|balloon|bird|plane|helicopter)\b"],
                    Moderate,
                ),
                rule(
                    "gravity_upward_fall",
                    Gravity,
                    r"\b(?:fell|dropped|shot)\s+(?:up(?:ward)?|into\s+(?:the\s+)?(?:sky|air|ceiling))\b",
                    "Objects falling upward instead of down",
                    &[],
                    Critical,
                ),
                rule(
                    "gravity_reversed",
                    Gravity,
                    r"\b(?:gravity|pull)\s+(?:reversed|backwards|upward|inverted)\b",
                    "Reversed gravity direction",
                    &[],
                    Critical,
                ),
                rule(
                    "gravity_selective",
                    Gravity,
                    r"\b(?:only|just)\s+(?:the\s+)?\w+\s+(?:were?\s+)?(?:affected\s+by|felt|experienced)\s+gravity\b",
                    "Selective gravity affecting only certain objects",
                    &[],
                    Moderate,
                ),
                rule(
                    "gravity_moving_terrain",
                    Gravity,
                    r"\b(?:valley|mountain|hill|terrain|land|ground|earth)\s+(?:flew|floated|moved|shifted|rose|lifted)\b",
                    "Impossible movement of large terrain features",
                    &[],
                    Critical,
                ),
                // -- Conservation of energy --
                rule(
                    "energy_from_nothing",
                    EnergyConservation,
                    r"\bwithout\s+(?:any\s+)?(?:fuel|power|battery|batteries|energy|source|electricity|wires)\b.*\b(?:lit\s+up|powered|ran|worked|glowed|shone)\b",
                    "Energy appearing from nowhere",
                    &[],
                    Moderate,
                ),
                rule(
                    "energy_perpetual_motion",
                    EnergyConservation,
                    r"\b(?:running|spinning|moving|working)\s+(?:for\s+)?(?:\d+\s+)?(?:years?|centuries|forever|continuously|endlessly)\s+(?:without|on\s+its\s+own)\b",
                    "Perpetual motion without energy source",
                    &[],
                    Critical,
                ),
                rule(
                    "energy_self_sustaining",
                    EnergyConservation,
                    r"\b(?:ran|worked|operated)\s+on\s+its\s+own\b",
                    "Self-sustaining operation without energy input",
                    &[],
                    Minor,
                ),
                rule(
                    "energy_object_from_nothing",
                    EnergyConservation,
                    r"\b(?:appeared|materialized|conjured)\s+(?:from|out\s+of)\s+(?:nowhere|thin\s+air|nothing)\b",
                    "Object created without any energy or matter source",
                    &[r"\b(?:magic|magical|illusion|trick|dream)\b"],
                    Moderate,
                ),
                // -- Conservation of mass --
                rule(
                    "mass_vanishing",
                    MassConservation,
                    r"\b(?:vanished|disappeared|evaporated)\s+(?:without|into\s+(?:thin\s+)?air)\b",
                    "Matter disappearing without explanation",
                    &[r"\b(?:magic|magical|illusion|trick)\b"],
                    Moderate,
                ),
                rule(
                    "mass_duplication",
                    MassConservation,
                    r"\b(?:duplicate|copy|copies|clone|clones|multiplied)\s+(?:popped|appeared|materialized)\b",
                    "Matter duplicating spontaneously",
                    &[],
                    Moderate,
                ),
                rule(
                    "mass_partial_vanishing",
                    MassConservation,
                    r"\bhalf\s+(?:the\s+)?\w+\s+(?:vanished|disappeared|gone)\b",
                    "Partial matter disappearance",
                    &[],
                    Moderate,
                ),
                // -- Thermodynamics --
                rule(
                    "thermo_heat_flow_reversal",
                    Thermodynamics,
                    r"\b(?:ice|frozen|cold)\b.*\bin\s+(?:the\s+)?(?:sun|heat|fire|hot)\b.*\b(?:froze|colder|freeze|harder)\b",
                    "Heat flowing from cold to hot (2nd law violation)",
                    &[],
                    Critical,
                ),
                rule(
                    "thermo_instant_temperature",
                    Thermodynamics,
                    r"\b(?:instantly|immediately|suddenly|within\s+(?:a\s+)?(?:second|moment))\s+(?:froze|melted|boiled|cooled|heated)\b",
                    "Instantaneous temperature change",
                    &[],
                    Minor,
                ),
                rule(
                    "thermo_contradictory_temperatures",
                    Thermodynamics,
                    r"\b(?:boiled|hot)\b.*\b(?:froze|frozen|ice)\b.*\b(?:flame|fire|burning)\b",
                    "Simultaneous contradictory temperatures",
                    &[],
                    Moderate,
                ),
                // -- Relativity --
                rule(
                    "relativity_superluminal",
                    Relativity,
                    r"\b(?:faster\s+than|overtook|outran)\s+(?:light|a\s+beam|beam)\b",
                    "Faster-than-light travel",
                    &[],
                    Critical,
                ),
                rule(
                    "relativity_time_reversal",
                    Relativity,
                    r"\b(?:clocks?|time)\s+(?:ticked|ran|went|moved)\s+backwards?\b",
                    "Time flowing backwards",
                    &[r"\b(?:daylight\s+saving|reset|rewound)\b"],
                    Critical,
                ),
                rule(
                    "relativity_time_direction",
                    Relativity,
                    r"\bwalked\s+forward\b.*\bbackwards?\b.*\btime\b",
                    "Time direction inconsistency",
                    &[],
                    Moderate,
                ),
                // -- Newtonian mechanics --
                rule(
                    "newton_motion_without_force",
                    NewtonianMechanics,
                    r"\b(?:suddenly|just)\s+(?:darted|moved|shot|accelerated)\b.*\b(?:no\s+one|nothing)\s+(?:touched|pushed|pulled)\b",
                    "Motion without applied force (Newton's 1st law)",
                    &[],
                    Moderate,
                ),
                rule(
                    "newton_no_recoil",
                    NewtonianMechanics,
                    r"\b(?:fired|shot)\s+(?:a\s+)?(?:cannon|gun|rocket)\b.*\b(?:didn't|did\s+not)\s+(?:move|feel|push|recoil)\b",
                    "No recoil from firing projectile (Newton's 3rd law)",
                    &[],
                    Moderate,
                ),
                rule(
                    "newton_no_momentum_transfer",
                    NewtonianMechanics,
                    r"\b(?:hit|struck|crashed\s+into)\b.*\b(?:didn't|did\s+not)\s+move\b",
                    "No momentum transfer in collision",
                    &[],
                    Moderate,
                ),
                // -- Material strength --
                rule(
                    "material_impossible_bending",
                    MaterialStrength,
                    r"\b(?:steel|iron|metal|concrete|stone)\s+(?:bridge|beam|wall|rod)\s+(?:twisted|bent|folded)\b.*\b(?:clay|soft|gently|easily)\b",
                    "Impossible bending of rigid materials",
                    &[],
                    Moderate,
                ),
                rule(
                    "material_overloaded_support",
                    MaterialStrength,
                    r"\b(?:wooden|small|thin)\s+(?:stool|chair|stick|rod)\s+(?:held|supported)\b.*\b(?:building|elephant|train|truck)\b",
                    "Small structure supporting impossibly large load",
                    &[],
                    Moderate,
                ),
                // -- Biology --
                rule(
                    "biology_no_oxygen",
                    Biology,
                    r"\b(?:underwater|submerged)\s+for\s+(?:\d+\s+)?(?:hours?|days?)\b",
                    "Surviving without oxygen for extended period",
                    &[r"\b(?:submarine|scuba|tank|oxygen|gills)\b"],
                    Moderate,
                ),
                rule(
                    "biology_unsurvivable_impact",
                    Biology,
                    r"\b(?:train|truck|car|building)\s+(?:hit|struck|crashed)\b.*\b(?:didn't|did\s+not)\s+(?:move|injure|hurt)\b",
                    "Human surviving unsurvivable impact",
                    &[],
                    Moderate,
                ),
                rule(
                    "biology_no_injury",
                    Biology,
                    r"\b(?:crumpled|fell\s+apart)\b.*\b(?:he|she|they)\s+(?:didn't|did\s+not)\s+move\b",
                    "No injury despite catastrophic collision",
                    &[],
                    Minor,
                ),
                // -- Planetary physics --
                rule(
                    "planetary_orbit_departure",
                    PlanetaryPhysics,
                    r"\b(?:moon|planet|satellite)\s+(?:paused|stopped|drifted|left|departed)\b",
                    "Celestial body leaving stable orbit",
                    &[r"\borbit\b"],
                    Moderate,
                ),
                rule(
                    "planetary_atmosphere_motion",
                    PlanetaryPhysics,
                    r"\batmosphere\b.*\b(?:blew|moved|shifted|drifted)\b",
                    "Entire atmosphere moving independently",
                    &[],
                    Moderate,
                ),
                // -- Quantum physics --
                rule(
                    "quantum_deterministic",
                    QuantumPhysics,
                    r"\b(?:every\s+time|always)\b.*\b(?:electron|particle|quantum)\b.*\b(?:same\s+place|exact|identical)\b",
                    "Deterministic quantum behavior (violates uncertainty principle)",
                    &[],
                    Moderate,
                ),
                rule(
                    "quantum_macroscopic_tunneling",
                    QuantumPhysics,
                    r"\bwalked\s+(?:into|through)\s+(?:a\s+|the\s+)?(?:wall|barrier)\b",
                    "Macroscopic quantum tunneling",
                    &[r"\b(?:door|doorway|gate|hole|opening)\b"],
                    Critical,
                ),
            ],
        }
    }

    /// Validate the catalog for consistency and compilable patterns
    pub fn validate(&self) -> AuditResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(AuditError::catalog(format!(
                "Unsupported catalog version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        for rule in &self.rules {
            let duplicate_count = self.rules.iter().filter(|r| r.id == rule.id).count();
            if duplicate_count > 1 {
                return Err(AuditError::catalog(format!("Duplicate rule ID '{}'", rule.id)));
            }

            compile_pattern(&rule.pattern)
                .map_err(|e| AuditError::catalog(format!("Invalid pattern in rule '{}': {}", rule.id, e)))?;

            for lookahead in &rule.negative_lookaheads {
                compile_pattern(lookahead).map_err(|e| {
                    AuditError::catalog(format!("Invalid lookahead in rule '{}': {}", rule.id, e))
                })?;
            }
        }

        Ok(())
    }

    /// All enabled rules in evaluation order
    pub fn enabled_rules(&self) -> impl Iterator<Item = &PhysicsRule> {
        self.rules.iter().filter(|rule| rule.enabled)
    }

    /// Rules belonging to a specific category
    pub fn rules_in_category(&self, category: Category) -> impl Iterator<Item = &PhysicsRule> {
        self.rules.iter().filter(move |rule| rule.category == category)
    }

    /// Look up a rule by id
    pub fn rule_by_id(&self, id: &str) -> Option<&PhysicsRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Serialize the catalog to YAML
    pub fn to_yaml(&self) -> AuditResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AuditError::catalog(format!("Failed to serialize catalog: {e}")))
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Compile a catalog pattern the way the matcher will (case-insensitive)
pub fn compile_pattern(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = RuleCatalog::with_defaults();
        catalog.validate().unwrap();
        assert!(catalog.rules.len() >= 20);
    }

    #[test]
    fn test_default_catalog_covers_all_categories() {
        let catalog = RuleCatalog::with_defaults();
        for category in Category::all() {
            assert!(
                catalog.rules_in_category(*category).next().is_some(),
                "no rules for {}",
                category.as_str()
            );
        }
    }

    #[test]
    fn test_rules_keep_catalog_order() {
        let catalog = RuleCatalog::with_defaults();
        let ids: Vec<_> = catalog.enabled_rules().map(|r| r.id.as_str()).collect();
        // Gravity rules come first, quantum rules last
        assert_eq!(ids[0], "gravity_unsupported_ascent");
        assert_eq!(*ids.last().unwrap(), "quantum_macroscopic_tunneling");
    }

    #[test]
    fn test_rule_lookup_by_id() {
        let catalog = RuleCatalog::with_defaults();
        let rule = catalog.rule_by_id("mass_vanishing").unwrap();
        assert_eq!(rule.category, Category::MassConservation);
        assert!(!rule.negative_lookaheads.is_empty());
        assert!(catalog.rule_by_id("no_such_rule").is_none());
    }

    #[test]
    fn test_yaml_round_trip() {
        let catalog = RuleCatalog::with_defaults();
        let yaml = catalog.to_yaml().unwrap();
        let rehydrated = RuleCatalog::load_from_str(&yaml).unwrap();
        assert_eq!(rehydrated.rules.len(), catalog.rules.len());
        assert_eq!(rehydrated.rules[0].id, catalog.rules[0].id);
    }

    #[test]
    fn test_rejects_duplicate_rule_ids() {
        let mut catalog = RuleCatalog::with_defaults();
        let dup = catalog.rules[0].clone();
        catalog.rules.push(dup);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let yaml = r#"
version: "1.0"
rules:
  - id: broken
    category: Gravity
    pattern: "(unclosed"
    description: "broken rule"
    severity: minor
"#;
        assert!(RuleCatalog::load_from_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut catalog = RuleCatalog::with_defaults();
        catalog.version = "2.0".to_string();
        assert!(catalog.validate().is_err());
    }
}
