//! Related-term lookup against an external knowledge base
//!
//! Architecture: Infrastructure Layer - Remote lookups stay behind trait seams
//! - RelationSource abstracts the knowledge-base HTTP client for testing
//! - CacheStore keeps lookups idempotent; entries never expire
//! - RelationFetcher bounds concurrent lookups and degrades to empty results on failure

use crate::config::RelationConfig;
use crate::domain::graph::RelatedTerm;
use crate::domain::violations::{AuditError, AuditResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A provider of related terms for a single concept
#[async_trait]
pub trait RelationSource: Send + Sync {
    async fn lookup(&self, term: &str, limit: usize) -> AuditResult<Vec<RelatedTerm>>;
}

/// Key-value store for lookup results, keyed by "{term}_{limit}"
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<RelatedTerm>>;
    fn put(&self, key: &str, terms: Vec<RelatedTerm>);
}

/// HTTP client for the ConceptNet query API
#[derive(Debug, Clone)]
pub struct ConceptNetClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    start: EdgeNode,
    end: EdgeNode,
    rel: RelLabel,
    #[serde(default = "default_weight")]
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct EdgeNode {
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct RelLabel {
    #[serde(default)]
    label: String,
}

fn default_weight() -> f64 {
    1.0
}

impl ConceptNetClient {
    pub fn new(config: &RelationConfig) -> AuditResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                AuditError::config(format!("Failed to build relation HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Pick the edge endpoint that is not the queried term itself
    fn other_label(edge: &Edge, term: &str) -> Option<String> {
        for label in [&edge.start.label, &edge.end.label] {
            let trimmed = label.trim();
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(term) {
                return Some(trimmed.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl RelationSource for ConceptNetClient {
    async fn lookup(&self, term: &str, limit: usize) -> AuditResult<Vec<RelatedTerm>> {
        let url = format!(
            "{}/query?node=/c/en/{}&limit={}",
            self.endpoint, term, limit
        );

        tracing::debug!("Querying related terms: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            AuditError::relation(term, format!("Request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AuditError::relation(
                term,
                format!("Unexpected status: {}", response.status()),
            ));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            AuditError::relation(term, format!("Malformed response body: {}", e))
        })?;

        let mut terms = Vec::new();
        for edge in &body.edges {
            if let Some(label) = Self::other_label(edge, term) {
                terms.push(RelatedTerm {
                    term: label,
                    relation_kind: edge.rel.label.clone(),
                    weight: edge.weight,
                });
            }
        }

        Ok(terms)
    }
}

/// In-memory cache, used when no persistent cache path is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<RelatedTerm>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<RelatedTerm>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn put(&self, key: &str, terms: Vec<RelatedTerm>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), terms);
        }
    }
}

/// Serializable cache data structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoreData {
    /// Cache format version for migration support
    version: u32,
    /// Cached lookup results
    entries: HashMap<String, Vec<RelatedTerm>>,
}

/// JSON-file-backed cache with write-through persistence
#[derive(Debug)]
pub struct JsonFileStore {
    store_path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    const CURRENT_VERSION: u32 = 1;

    /// Load the store from disk, starting empty if the file doesn't exist
    pub fn load<P: AsRef<Path>>(store_path: P) -> AuditResult<Self> {
        let store_path = store_path.as_ref().to_path_buf();

        let data = if store_path.exists() {
            let content = fs::read_to_string(&store_path)?;
            let data: StoreData = serde_json::from_str(&content).map_err(|e| {
                AuditError::config(format!("Failed to parse relation cache: {}", e))
            })?;

            if data.version != Self::CURRENT_VERSION {
                return Err(AuditError::config(format!(
                    "Unsupported relation cache version: {}. Please delete the cache file.",
                    data.version
                )));
            }
            data
        } else {
            StoreData {
                version: Self::CURRENT_VERSION,
                entries: HashMap::new(),
            }
        };

        Ok(Self {
            store_path,
            data: Mutex::new(data),
        })
    }

    fn save(&self, data: &StoreData) -> AuditResult<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(data).map_err(|e| {
            AuditError::config(format!("Failed to serialize relation cache: {}", e))
        })?;
        fs::write(&self.store_path, content)?;

        Ok(())
    }
}

impl CacheStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Vec<RelatedTerm>> {
        self.data
            .lock()
            .ok()
            .and_then(|data| data.entries.get(key).cloned())
    }

    fn put(&self, key: &str, terms: Vec<RelatedTerm>) {
        let Ok(mut data) = self.data.lock() else {
            return;
        };
        data.entries.insert(key.to_string(), terms);

        if let Err(e) = self.save(&data) {
            tracing::warn!("Failed to persist relation cache: {}", e);
        }
    }
}

/// Fetches related terms for a batch of concepts with bounded parallelism
pub struct RelationFetcher {
    source: Arc<dyn RelationSource>,
    cache: Arc<dyn CacheStore>,
    fetch_limit: usize,
    max_concurrent: usize,
}

impl RelationFetcher {
    pub fn new(
        source: Arc<dyn RelationSource>,
        cache: Arc<dyn CacheStore>,
        config: &RelationConfig,
    ) -> Self {
        Self {
            source,
            cache,
            fetch_limit: config.fetch_limit,
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    fn cache_key(term: &str, limit: usize) -> String {
        format!("{}_{}", term, limit)
    }

    /// Fetch related terms for one concept. A cache hit skips the source
    /// entirely; a source failure yields an empty result and is not cached,
    /// so the term is retried on the next run.
    pub async fn fetch(&self, term: &str) -> Vec<RelatedTerm> {
        let key = Self::cache_key(term, self.fetch_limit);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Relation cache hit for '{}'", term);
            return cached;
        }

        match self.source.lookup(term, self.fetch_limit).await {
            Ok(terms) => {
                self.cache.put(&key, terms.clone());
                terms
            }
            Err(e) => {
                tracing::warn!("Relation lookup failed for '{}': {}", term, e);
                Vec::new()
            }
        }
    }

    /// Fetch related terms for every concept, at most `max_concurrent`
    /// lookups in flight at once. Terms that fail map to empty result sets.
    pub async fn fetch_all(&self, terms: &[String]) -> HashMap<String, Vec<RelatedTerm>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(String, Vec<RelatedTerm>)> = JoinSet::new();

        for term in terms {
            let term = term.clone();
            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&self.source);
            let cache = Arc::clone(&self.cache);
            let fetch_limit = self.fetch_limit;

            tasks.spawn(async move {
                // Closed semaphore is unreachable; treat it as a failed lookup
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (term, Vec::new());
                };

                let key = Self::cache_key(&term, fetch_limit);
                if let Some(cached) = cache.get(&key) {
                    tracing::debug!("Relation cache hit for '{}'", term);
                    return (term, cached);
                }

                match source.lookup(&term, fetch_limit).await {
                    Ok(related) => {
                        cache.put(&key, related.clone());
                        (term, related)
                    }
                    Err(e) => {
                        tracing::warn!("Relation lookup failed for '{}': {}", term, e);
                        (term, Vec::new())
                    }
                }
            });
        }

        let mut results = HashMap::with_capacity(terms.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((term, related)) => {
                    results.insert(term, related);
                }
                Err(e) => {
                    tracing::warn!("Relation fetch task failed: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StubSource {
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RelationSource for StubSource {
        async fn lookup(&self, term: &str, _limit: usize) -> AuditResult<Vec<RelatedTerm>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RelatedTerm {
                term: format!("{}_kin", term),
                relation_kind: "RelatedTo".to_string(),
                weight: 2.0,
            }])
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RelationSource for FailingSource {
        async fn lookup(&self, term: &str, _limit: usize) -> AuditResult<Vec<RelatedTerm>> {
            Err(AuditError::relation(term, "connection refused"))
        }
    }

    fn fetcher(source: Arc<dyn RelationSource>) -> RelationFetcher {
        RelationFetcher::new(
            source,
            Arc::new(MemoryStore::new()),
            &RelationConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_fetch_caches_results() {
        let source = Arc::new(StubSource::new());
        let fetcher = fetcher(source.clone());

        let first = fetcher.fetch("dragon").await;
        let second = fetcher.fetch("dragon").await;

        assert_eq!(first, second);
        assert_eq!(first[0].term, "dragon_kin");
        // Second fetch must come from cache
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_one_lookup_per_term() {
        let source = Arc::new(StubSource::new());
        let fetcher = fetcher(source.clone());

        let terms = vec!["dragon".to_string(), "castle".to_string()];
        let results = fetcher.fetch_all(&terms).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["dragon"][0].term, "dragon_kin");
        assert_eq!(results["castle"][0].term, "castle_kin");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        // Repeat run hits the cache for every term
        let again = fetcher.fetch_all(&terms).await;
        assert_eq!(again.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_yields_empty_and_is_not_cached() {
        let fetcher = fetcher(Arc::new(FailingSource));

        let results = fetcher.fetch_all(&["dragon".to_string()]).await;
        assert!(results["dragon"].is_empty());

        // Failure is not cached; a direct fetch tries the source again
        // and degrades the same way
        assert!(fetcher.fetch("dragon").await.is_empty());
    }

    #[test]
    fn test_cache_key_includes_limit() {
        assert_eq!(RelationFetcher::cache_key("dragon", 5), "dragon_5");
        assert_ne!(
            RelationFetcher::cache_key("dragon", 5),
            RelationFetcher::cache_key("dragon", 10)
        );
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("relations.json");

        {
            let store = JsonFileStore::load(&store_path).unwrap();
            assert!(store.get("dragon_5").is_none());
            store.put(
                "dragon_5",
                vec![RelatedTerm {
                    term: "wyvern".to_string(),
                    relation_kind: "IsA".to_string(),
                    weight: 1.5,
                }],
            );
        }

        // Entries survive a reload
        let store = JsonFileStore::load(&store_path).unwrap();
        let cached = store.get("dragon_5").unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].term, "wyvern");
        assert_eq!(cached[0].relation_kind, "IsA");
    }

    #[test]
    fn test_json_file_store_rejects_unknown_version() {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("relations.json");
        fs::write(&store_path, r#"{"version": 99, "entries": {}}"#).unwrap();

        assert!(JsonFileStore::load(&store_path).is_err());
    }
}
