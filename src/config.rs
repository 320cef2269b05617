use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::error::{ProcessorError, Result};

fn default_patents_file() -> PathBuf {
    PathBuf::from("cortellis_patents.csv")
}

fn default_drugs_file() -> PathBuf {
    PathBuf::from("cortellis_drugs.csv")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed_data")
}

fn default_unified_dir() -> PathBuf {
    PathBuf::from("unified_patent_data")
}

fn default_base_url() -> String {
    "https://serpapi.com/search".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/google_patents")
}

fn default_cache_max_age_seconds() -> u64 {
    86_400
}

fn default_request_delay_ms() -> u64 {
    1_000
}

fn default_target_delay_ms() -> u64 {
    2_000
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_drugs() -> usize {
    10
}

fn default_max_indications() -> usize {
    5
}

fn default_results_per_drug_query() -> usize {
    10
}

fn default_results_per_indication_query() -> usize {
    20
}

/// Input file locations for the Cortellis sheet exports.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_patents_file")]
    pub patents_file: PathBuf,
    #[serde(default = "default_drugs_file")]
    pub drugs_file: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            patents_file: default_patents_file(),
            drugs_file: default_drugs_file(),
        }
    }
}

/// Output directories for processed and unified artifacts.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_unified_dir")]
    pub unified_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            unified_dir: default_unified_dir(),
        }
    }
}

/// Google Patents (SerpAPI) client settings. The API credential itself is
/// never stored here; it comes from the SERPAPI_KEY environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct GooglePatentsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Cached responses older than this are treated as stale and refetched.
    #[serde(default = "default_cache_max_age_seconds")]
    pub cache_max_age_seconds: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Pause between search targets (drug or indication sweeps).
    #[serde(default = "default_target_delay_ms")]
    pub target_delay_ms: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_drugs")]
    pub max_drugs: usize,
    #[serde(default = "default_max_indications")]
    pub max_indications: usize,
    #[serde(default = "default_results_per_drug_query")]
    pub results_per_drug_query: usize,
    #[serde(default = "default_results_per_indication_query")]
    pub results_per_indication_query: usize,
}

impl Default for GooglePatentsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_dir: default_cache_dir(),
            cache_max_age_seconds: default_cache_max_age_seconds(),
            request_delay_ms: default_request_delay_ms(),
            target_delay_ms: default_target_delay_ms(),
            timeout_seconds: default_timeout_seconds(),
            max_drugs: default_max_drugs(),
            max_indications: default_max_indications(),
            results_per_drug_query: default_results_per_drug_query(),
            results_per_indication_query: default_results_per_indication_query(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inputs: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub google_patents: GooglePatentsConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ProcessorError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Resolve the SerpAPI credential from the environment (.env supported).
    pub fn serpapi_key(&self) -> Result<String> {
        dotenv::dotenv().ok();
        let key = std::env::var("SERPAPI_KEY")?;
        if key.trim().is_empty() {
            return Err(ProcessorError::MissingField("SERPAPI_KEY".to_string()));
        }
        Ok(key)
    }
}
