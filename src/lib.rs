//! Story Auditor - physics consistency checking for narrative text
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from infrastructure concerns
//! - Violation detection and concept graphing run as independent pipelines
//! - External relation lookups sit behind injectable trait seams

pub mod catalog;
pub mod concepts;
pub mod config;
pub mod domain;
pub mod graph;
pub mod matcher;
pub mod relations;
pub mod report;

// Re-export main types for convenient access
pub use domain::graph::{Concept, ConceptGraph, GraphStats, RelatedTerm};
pub use domain::violations::{
    AuditError, AuditResult, Category, FalsePositiveRisk, Severity, Violation, ViolationReport,
};

pub use catalog::{PhysicsRule, RuleCatalog};
pub use config::{AuditConfig, ConfigBuilder, RiskPolicy};
pub use relations::{CacheStore, ConceptNetClient, JsonFileStore, MemoryStore, RelationSource};
pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use concepts::ConceptScorer;
use graph::GraphAssembler;
use matcher::Matcher;
use relations::RelationFetcher;
use report::Reporter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Everything one analysis call produces
#[derive(Debug)]
pub struct StoryAnalysis {
    /// Physics violation report for the text
    pub report: ViolationReport,
    /// Ranked concepts extracted from the text
    pub concepts: Vec<Concept>,
    /// Concept graph assembled around those concepts
    pub graph: ConceptGraph,
}

/// Main auditor providing high-level analysis operations
pub struct StoryAuditor {
    matcher: Matcher,
    reporter: Reporter,
    scorer: ConceptScorer,
    assembler: GraphAssembler,
    relation_source: Arc<dyn RelationSource>,
    cache_store: Arc<dyn CacheStore>,
    formatter: ReportFormatter,
    config: AuditConfig,
}

impl StoryAuditor {
    /// Create an auditor with the given configuration and rule catalog
    pub fn new_with_config(config: AuditConfig, catalog: RuleCatalog) -> AuditResult<Self> {
        let matcher = Matcher::new(&catalog, &config.detection)?;
        let reporter = Reporter::new(&config.detection, config.risk.clone());
        let scorer = ConceptScorer::new(&config.concepts);
        let assembler = GraphAssembler::new(&config.graph);
        let relation_source: Arc<dyn RelationSource> =
            Arc::new(ConceptNetClient::new(&config.relations)?);
        let cache_store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());

        Ok(Self {
            matcher,
            reporter,
            scorer,
            assembler,
            relation_source,
            cache_store,
            formatter: ReportFormatter::default(),
            config,
        })
    }

    /// Create an auditor with default configuration and the built-in catalog
    pub fn new() -> AuditResult<Self> {
        Self::new_with_config(AuditConfig::default(), RuleCatalog::with_defaults())
    }

    /// Create an auditor loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> AuditResult<Self> {
        let config = AuditConfig::load_from_file(path)?;
        Self::new_with_config(config, RuleCatalog::with_defaults())
    }

    /// Replace the relation source (e.g. with a stub for tests)
    pub fn with_relation_source(mut self, source: Arc<dyn RelationSource>) -> Self {
        self.relation_source = source;
        self
    }

    /// Replace the relation cache store
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = store;
        self
    }

    /// Switch to a JSON-file-backed relation cache at the given path
    pub fn with_persistent_cache<P: AsRef<Path>>(self, path: P) -> AuditResult<Self> {
        let store = JsonFileStore::load(path)?;
        Ok(self.with_cache_store(Arc::new(store)))
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Run both pipelines over the text and return the combined result.
    ///
    /// Detection and graph assembly are independent; relation lookups that
    /// fail degrade to an empty result set rather than failing the call.
    pub async fn analyze(&self, text: &str) -> AuditResult<StoryAnalysis> {
        Self::validate_input(text)?;

        let (report, (concepts, graph)) =
            tokio::join!(async { self.run_detection(text) }, self.run_graph_pipeline(text));

        Ok(StoryAnalysis { report, concepts, graph })
    }

    /// Run only the violation detection pipeline
    pub fn detect_violations(&self, text: &str) -> AuditResult<ViolationReport> {
        Self::validate_input(text)?;
        Ok(self.run_detection(text))
    }

    /// Run only the concept graph pipeline
    pub async fn build_concept_graph(
        &self,
        text: &str,
    ) -> AuditResult<(Vec<Concept>, ConceptGraph)> {
        Self::validate_input(text)?;
        Ok(self.run_graph_pipeline(text).await)
    }

    /// Format a violation report for output
    pub fn format_report(
        &self,
        report: &ViolationReport,
        format: OutputFormat,
    ) -> AuditResult<String> {
        self.formatter.format_report(report, format)
    }

    /// Number of enabled rules loaded into the matcher
    pub fn rule_count(&self) -> usize {
        self.matcher.rule_count()
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    fn validate_input(text: &str) -> AuditResult<()> {
        if text.trim().is_empty() {
            return Err(AuditError::invalid_input("Story text is empty"));
        }
        Ok(())
    }

    fn run_detection(&self, text: &str) -> ViolationReport {
        let start_time = Instant::now();
        let outcome = self.matcher.detect(text);
        let mut report = self.reporter.build(text, outcome);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report
    }

    async fn run_graph_pipeline(&self, text: &str) -> (Vec<Concept>, ConceptGraph) {
        let concepts = self.scorer.score(text);

        // Depth-1 graphs never need the relation collaborator
        let relations = if self.config.graph.max_depth >= 2 && !concepts.is_empty() {
            let fetcher = RelationFetcher::new(
                Arc::clone(&self.relation_source),
                Arc::clone(&self.cache_store),
                &self.config.relations,
            );
            let terms: Vec<String> = concepts.iter().map(|c| c.term.clone()).collect();
            fetcher.fetch_all(&terms).await
        } else {
            Default::default()
        };

        let graph = self.assembler.assemble(&concepts, &relations);
        (concepts, graph)
    }
}

/// Convenience function to create an auditor with default settings
pub fn create_auditor() -> AuditResult<StoryAuditor> {
    StoryAuditor::new()
}

/// Convenience function to check a story for physics violations with default settings
pub fn check_story(text: &str) -> AuditResult<ViolationReport> {
    let auditor = StoryAuditor::new()?;
    auditor.detect_violations(text)
}
