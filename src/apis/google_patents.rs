use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::GooglePatentsConfig;
use crate::domain::{DataSource, ExternalPatent, SearchResults};
use crate::error::{ProcessorError, Result};

use super::PatentSearchApi;

/// Google Patents returns at most this many results per request.
const PAGE_SIZE: usize = 10;

/// One organic result as returned by the SerpAPI google_patents engine.
#[derive(Debug, Deserialize)]
struct SerpApiResult {
    patent_id: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
    publication_date: Option<String>,
    filing_date: Option<String>,
    grant_date: Option<String>,
    #[serde(default)]
    inventors: Vec<String>,
    assignee: Option<String>,
    #[serde(rename = "type")]
    patent_type: Option<String>,
    #[serde(rename = "pdf")]
    pdf_link: Option<String>,
    #[serde(rename = "link")]
    google_patents_link: Option<String>,
    priority_date: Option<String>,
    application_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiResult>,
}

/// On-disk cache entry for one search page.
#[derive(Debug, Serialize, Deserialize)]
struct CachedSearch {
    patents: Vec<ExternalPatent>,
    timestamp: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Deterministic cache file name for one (query, offset, count) page.
fn cache_file_name(query: &str, offset: usize, num_results: usize) -> String {
    let cache_key = format!("{}_{}_{}", query, offset, num_results);
    let mut hasher = Sha256::new();
    hasher.update(cache_key.as_bytes());
    format!("{}.json", hex::encode(hasher.finalize()))
}

/// Load a cached page if it is younger than the freshness window.
fn load_cached(path: &Path, max_age_seconds: u64) -> Option<Vec<ExternalPatent>> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    let age = modified.elapsed().ok()?;
    if age > Duration::from_secs(max_age_seconds) {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    let cached: CachedSearch = serde_json::from_str(&content).ok()?;
    Some(cached.patents)
}

/// Count cached search pages under a cache root, for availability manifests.
pub fn cached_search_count(cache_dir: &Path) -> Option<usize> {
    let entries = fs::read_dir(cache_dir).ok()?;
    let count = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .count();
    Some(count)
}

/// SerpAPI-backed Google Patents client with an on-disk response cache.
pub struct GooglePatentsClient {
    client: reqwest::Client,
    config: GooglePatentsConfig,
    api_key: String,
}

impl GooglePatentsClient {
    pub fn new(config: GooglePatentsConfig, api_key: String) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn cache_path(&self, query: &str, offset: usize, num_results: usize) -> PathBuf {
        self.config
            .cache_dir
            .join(cache_file_name(query, offset, num_results))
    }

    fn standardize(result: SerpApiResult, fetched_date: &str) -> ExternalPatent {
        ExternalPatent {
            id: non_empty(result.patent_id),
            title: non_empty(result.title),
            snippet: non_empty(result.snippet),
            publication_date: non_empty(result.publication_date),
            filing_date: non_empty(result.filing_date),
            grant_date: non_empty(result.grant_date),
            inventors: result
                .inventors
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            assignee: non_empty(result.assignee),
            patent_type: non_empty(result.patent_type),
            pdf_link: non_empty(result.pdf_link),
            google_patents_link: non_empty(result.google_patents_link),
            priority_date: non_empty(result.priority_date),
            application_number: non_empty(result.application_number),
            search_category: None,
            data_source: DataSource::GooglePatents,
            fetched_date: fetched_date.to_string(),
        }
    }

    async fn fetch_page(&self, query: &str, offset: usize, num: usize) -> Result<Vec<ExternalPatent>> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("engine", "google_patents"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("start", &offset.to_string()),
                ("num", &num.to_string()),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ProcessorError::Api {
                message: format!("search request for '{}' failed: {}", query, e),
            })?;

        let data: SerpApiResponse = response.json().await?;
        let fetched_date = Utc::now().to_rfc3339();
        Ok(data
            .organic_results
            .into_iter()
            .map(|result| Self::standardize(result, &fetched_date))
            .collect())
    }

    /// Deduplicate one target's accumulated results by patent id,
    /// last-write-wins, preserving first-seen order.
    fn dedupe_by_id(patents: Vec<ExternalPatent>) -> Vec<ExternalPatent> {
        let mut order: Vec<String> = Vec::new();
        let mut by_id: std::collections::HashMap<String, ExternalPatent> =
            std::collections::HashMap::new();
        for patent in patents {
            let key = patent.id.clone().unwrap_or_default();
            if !by_id.contains_key(&key) {
                order.push(key.clone());
            }
            by_id.insert(key, patent);
        }
        order
            .into_iter()
            .filter_map(|key| by_id.remove(&key))
            .collect()
    }
}

#[async_trait]
impl PatentSearchApi for GooglePatentsClient {
    fn api_name(&self) -> &'static str {
        "google_patents"
    }

    #[instrument(skip(self))]
    async fn search_patents(&self, query: &str, num_results: usize) -> Result<Vec<ExternalPatent>> {
        info!("🔍 Searching Google Patents for: {}", query);

        let mut all_results: Vec<ExternalPatent> = Vec::new();
        let mut offset = 0;

        while all_results.len() < num_results {
            let cache_path = self.cache_path(query, offset, num_results);
            if let Some(cached) = load_cached(&cache_path, self.config.cache_max_age_seconds) {
                debug!("Loading from cache (offset={})", offset);
                all_results.extend(cached);
                offset += PAGE_SIZE;
                continue;
            }

            let num = PAGE_SIZE.min(num_results - all_results.len());
            debug!("Fetching results (offset={})", offset);

            let page = match self.fetch_page(query, offset, num).await {
                Ok(page) => page,
                Err(e) => {
                    // Partial collections are acceptable downstream; the
                    // merge simply sees fewer external records.
                    warn!("API request failed for '{}': {}", query, e);
                    break;
                }
            };

            if page.is_empty() {
                debug!("No more results for '{}'", query);
                break;
            }

            let cached = CachedSearch {
                patents: page.clone(),
                timestamp: Utc::now().to_rfc3339(),
            };
            if let Err(e) = fs::write(&cache_path, serde_json::to_string(&cached)?) {
                warn!("Failed to write cache file {}: {}", cache_path.display(), e);
            }

            all_results.extend(page);
            offset += PAGE_SIZE;

            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        all_results.truncate(num_results);
        Ok(all_results)
    }

    #[instrument(skip_all, fields(drugs = drug_names.len(), indications = indications.len()))]
    async fn search_pharmaceutical_patents(
        &self,
        drug_names: &[String],
        indications: &[String],
    ) -> Result<SearchResults> {
        let mut all_patents = SearchResults::new();

        for drug_name in drug_names.iter().take(self.config.max_drugs) {
            info!("🔬 Searching patents for drug: {}", drug_name);

            let queries = [
                format!("\"{}\" pharmaceutical", drug_name),
                format!("\"{}\" formulation", drug_name),
                format!("\"{}\" composition", drug_name),
                format!("\"{}\" method treatment", drug_name),
            ];

            let mut drug_patents = Vec::new();
            for query in &queries {
                let results = self
                    .search_patents(query, self.config.results_per_drug_query)
                    .await?;
                drug_patents.extend(results);
            }

            let unique = Self::dedupe_by_id(drug_patents);
            info!("Found {} unique patents for {}", unique.len(), drug_name);
            all_patents.insert(drug_name.clone(), unique);

            tokio::time::sleep(Duration::from_millis(self.config.target_delay_ms)).await;
        }

        for indication in indications.iter().take(self.config.max_indications) {
            info!("🏥 Searching patents for indication: {}", indication);

            let query = format!("\"{}\" treatment method pharmaceutical", indication);
            let results = self
                .search_patents(&query, self.config.results_per_indication_query)
                .await?;

            info!("Found {} patents for {}", results.len(), indication);
            all_patents.insert(format!("indication_{}", indication), results);

            tokio::time::sleep(Duration::from_millis(self.config.target_delay_ms)).await;
        }

        Ok(all_patents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(id: Option<&str>, title: &str) -> ExternalPatent {
        ExternalPatent {
            id: id.map(|s| s.to_string()),
            title: Some(title.to_string()),
            snippet: None,
            publication_date: None,
            filing_date: None,
            grant_date: None,
            inventors: Vec::new(),
            assignee: None,
            patent_type: None,
            pdf_link: None,
            google_patents_link: None,
            priority_date: None,
            application_number: None,
            search_category: None,
            data_source: DataSource::GooglePatents,
            fetched_date: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_cache_file_name_is_stable() {
        let a = cache_file_name("\"Aspirin\" pharmaceutical", 0, 10);
        let b = cache_file_name("\"Aspirin\" pharmaceutical", 0, 10);
        assert_eq!(a, b);
        assert!(a.ends_with(".json"));
        // Any component change produces a different key
        assert_ne!(a, cache_file_name("\"Aspirin\" pharmaceutical", 10, 10));
        assert_ne!(a, cache_file_name("\"Aspirin\" pharmaceutical", 0, 20));
        assert_ne!(a, cache_file_name("\"Aspirin\" formulation", 0, 10));
    }

    #[test]
    fn test_cache_freshness_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        let cached = CachedSearch {
            patents: vec![external(Some("US1"), "Cached")],
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };
        fs::write(&path, serde_json::to_string(&cached).unwrap()).unwrap();

        // Freshly written file sits inside a generous window
        let fresh = load_cached(&path, 3_600);
        assert_eq!(fresh.unwrap().len(), 1);

        // A zero-second window treats everything as stale
        assert!(load_cached(&path, 0).is_none());

        // Corrupt cache entries are treated as misses
        fs::write(&path, "{not json").unwrap();
        assert!(load_cached(&path, 3_600).is_none());
    }

    #[test]
    fn test_dedupe_by_id_last_write_wins() {
        let patents = vec![
            external(Some("US1"), "first"),
            external(Some("US2"), "second"),
            external(Some("US1"), "updated"),
        ];
        let unique = GooglePatentsClient::dedupe_by_id(patents);
        assert_eq!(unique.len(), 2);
        // First-seen order kept, later payload wins
        assert_eq!(unique[0].id.as_deref(), Some("US1"));
        assert_eq!(unique[0].title.as_deref(), Some("updated"));
        assert_eq!(unique[1].id.as_deref(), Some("US2"));
    }

    #[test]
    fn test_standardize_drops_empty_strings() {
        let result = SerpApiResult {
            patent_id: Some("".to_string()),
            title: Some("  A Title ".to_string()),
            snippet: None,
            publication_date: Some("".to_string()),
            filing_date: None,
            grant_date: None,
            inventors: vec!["  ".to_string(), "Jane Doe".to_string()],
            assignee: None,
            patent_type: None,
            pdf_link: None,
            google_patents_link: None,
            priority_date: None,
            application_number: Some("APP1".to_string()),
        };
        let patent = GooglePatentsClient::standardize(result, "2024-01-01T00:00:00Z");
        assert!(patent.id.is_none());
        assert!(patent.publication_date.is_none());
        assert_eq!(patent.inventors, vec!["Jane Doe"]);
        assert_eq!(patent.application_number.as_deref(), Some("APP1"));
        assert_eq!(patent.data_source, DataSource::GooglePatents);
    }

    #[test]
    fn test_cached_search_count() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cached_search_count(dir.path()), Some(0));
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(cached_search_count(dir.path()), Some(2));
        assert_eq!(cached_search_count(&dir.path().join("missing")), None);
    }
}
