//! Story Auditor CLI - Command-line interface for narrative physics checking
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like file I/O, process exit codes, and terminal output
//! - Provides clean separation between user interface and business logic

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use story_auditor::{
    AuditConfig, Category, OutputFormat, ReportFormatter, ReportOptions, RuleCatalog, StoryAuditor,
};

/// Story Auditor - physics consistency checking for narrative text
#[derive(Parser)]
#[command(name = "story-auditor")]
#[command(version = "0.1.0")]
#[command(about = "Detects physics-law violations in story text and maps its concepts")]
#[command(
    long_about = "Story Auditor scans narrative text against a catalog of physics-violation \
                  patterns and builds a concept graph around the story's most salient terms. \
                  Designed for writing-assistant pipelines and editorial review workflows."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a story file for physics violations and concepts
    Analyze {
        /// Story text file to analyze ("-" reads stdin)
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Custom rule catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Skip the concept graph pipeline
        #[arg(long)]
        no_graph: bool,

        /// Write the concept graph as JSON to this path
        #[arg(long)]
        graph: Option<PathBuf>,

        /// Persist relation lookups to this cache file
        #[arg(long)]
        relation_cache: Option<PathBuf>,
    },

    /// List available rules in the catalog
    Rules {
        /// Custom rule catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,

        /// Filter by category (e.g. "Gravity")
        #[arg(long)]
        category: Option<String>,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule ID to explain
        rule_id: String,

        /// Custom rule catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Validate configuration and catalog files
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Rule catalog file to validate alongside
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli).await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Analyze { file, format, catalog, no_graph, graph, relation_cache } => {
            run_analyze(
                cli.config,
                file,
                format,
                catalog,
                no_graph,
                graph,
                relation_cache,
                !cli.no_color,
            )
            .await
        }
        Commands::Rules { catalog, enabled_only, category } => {
            run_list_rules(catalog, enabled_only, category)
        }
        Commands::Explain { rule_id, catalog } => run_explain(rule_id, catalog),
        Commands::ValidateConfig { config_file, catalog } => {
            run_validate_config(config_file.or(cli.config), catalog)
        }
    }
}

fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<AuditConfig> {
    if let Some(path) = config_path {
        return AuditConfig::load_from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    // Look for a default config file next to the invocation
    let default_configs = ["story_auditor.yaml", "story_auditor.yml", ".story_auditor.yaml"];
    for config_name in &default_configs {
        if PathBuf::from(config_name).exists() {
            return AuditConfig::load_from_file(config_name)
                .with_context(|| format!("Failed to load config from {}", config_name));
        }
    }

    Ok(AuditConfig::default())
}

fn load_catalog(catalog_path: Option<PathBuf>) -> anyhow::Result<RuleCatalog> {
    match catalog_path {
        Some(path) => RuleCatalog::load_from_file(&path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Ok(RuleCatalog::with_defaults()),
    }
}

fn read_story(file: &PathBuf) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read story text from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(file)
            .with_context(|| format!("Failed to read story file {}", file.display()))
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_analyze(
    config_path: Option<PathBuf>,
    file: PathBuf,
    format: OutputFormatArg,
    catalog_path: Option<PathBuf>,
    no_graph: bool,
    graph_path: Option<PathBuf>,
    relation_cache: Option<PathBuf>,
    use_colors: bool,
) -> anyhow::Result<i32> {
    let config = load_config(config_path)?;
    let catalog = load_catalog(catalog_path)?;
    let text = read_story(&file)?;

    let mut auditor = StoryAuditor::new_with_config(config, catalog)?
        .with_report_formatter(ReportFormatter::new(ReportOptions {
            use_colors,
            ..Default::default()
        }));

    if let Some(cache_path) = relation_cache {
        auditor = auditor.with_persistent_cache(&cache_path)?;
    }

    let report = if no_graph {
        auditor.detect_violations(&text)?
    } else {
        let analysis = auditor.analyze(&text).await?;

        if let Some(path) = &graph_path {
            let json = serde_json::to_string_pretty(&analysis.graph)
                .context("Failed to serialize concept graph")?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write graph to {}", path.display()))?;
            if format == OutputFormatArg::Human {
                eprintln!("Concept graph written to {}", path.display());
            }
        }

        analysis.report
    };

    let formatted = auditor.format_report(&report, format.into())?;
    println!("{}", formatted);

    Ok(if report.has_violations() { 1 } else { 0 })
}

fn run_list_rules(
    catalog_path: Option<PathBuf>,
    enabled_only: bool,
    category_filter: Option<String>,
) -> anyhow::Result<i32> {
    let catalog = load_catalog(catalog_path)?;

    println!("Available Rules\n");

    for &category in Category::all() {
        if let Some(ref filter) = category_filter {
            if !category.as_str().eq_ignore_ascii_case(filter) {
                continue;
            }
        }

        let rules: Vec<_> = catalog
            .rules_in_category(category)
            .filter(|r| !enabled_only || r.enabled)
            .collect();
        if rules.is_empty() {
            continue;
        }

        println!("{}:", category.display_name());
        for rule in rules {
            let status = if rule.enabled { "on " } else { "off" };
            println!("  [{}] {} ({}) - {}", status, rule.id, rule.severity.as_str(), rule.description);
        }
        println!();
    }

    Ok(0)
}

fn run_explain(rule_id: String, catalog_path: Option<PathBuf>) -> anyhow::Result<i32> {
    let catalog = load_catalog(catalog_path)?;

    let Some(rule) = catalog.rule_by_id(&rule_id) else {
        eprintln!("Rule '{}' not found", rule_id);
        println!();
        println!("Available rules:");
        for rule in &catalog.rules {
            println!("  - {}", rule.id);
        }
        return Ok(1);
    };

    println!("Rule: {}", rule.id);
    println!("Category: {}", rule.category.display_name());
    println!("Severity: {}", rule.severity.as_str());
    println!("Enabled: {}", rule.enabled);
    println!();
    println!("Description:");
    println!("   {}", rule.description);
    println!();
    println!("Pattern:");
    println!("   {}", rule.pattern);

    if !rule.negative_lookaheads.is_empty() {
        println!();
        println!("Suppressed when the sentence also matches:");
        for lookahead in &rule.negative_lookaheads {
            println!("   {}", lookahead);
        }
    }

    Ok(0)
}

fn run_validate_config(
    config_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
) -> anyhow::Result<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("story_auditor.yaml"));

    println!("Validating configuration: {}", config_path.display());

    let config = match AuditConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation failed: {}", e);
            return Ok(1);
        }
    };

    println!("Configuration is valid");
    println!("  Context window: {} chars", config.detection.context_window_chars);
    println!("  Rule timeout: {} ms", config.detection.rule_timeout_ms);
    println!("  Concepts: top {} terms", config.concepts.top_k);
    println!("  Graph depth: {}", config.graph.max_depth);
    println!("  Relation endpoint: {}", config.relations.endpoint);

    let catalog = match load_catalog(catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Catalog validation failed: {:#}", e);
            return Ok(1);
        }
    };

    let enabled = catalog.enabled_rules().count();
    println!("Catalog: {} rules, {} enabled", catalog.rules.len(), enabled);

    Ok(0)
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_analyze_clean_story() {
        let temp_dir = TempDir::new().unwrap();
        let story = temp_dir.path().join("story.txt");
        fs::write(&story, "The miller ground wheat into flour every morning.").unwrap();

        let result = run_analyze(
            None,
            story,
            OutputFormatArg::Json,
            None,
            true,
            None,
            None,
            false,
        )
        .await;

        assert_eq!(result.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_analyze_flags_violations() {
        let temp_dir = TempDir::new().unwrap();
        let story = temp_dir.path().join("story.txt");
        fs::write(&story, "The ox flew upward without wings.").unwrap();

        let result = run_analyze(
            None,
            story,
            OutputFormatArg::Json,
            None,
            true,
            None,
            None,
            false,
        )
        .await;

        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.yaml");

        let yaml = serde_yaml::to_string(&AuditConfig::default()).unwrap();
        fs::write(&config_file, yaml).unwrap();

        let result = run_validate_config(Some(config_file), None);
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_explain_rule() {
        let result = run_explain("gravity_unsupported_ascent".to_string(), None);
        assert_eq!(result.unwrap(), 0);

        let result = run_explain("nonexistent_rule".to_string(), None);
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_list_rules() {
        let result = run_list_rules(None, false, None);
        assert_eq!(result.unwrap(), 0);

        let result = run_list_rules(None, true, Some("Gravity".to_string()));
        assert_eq!(result.unwrap(), 0);
    }
}
