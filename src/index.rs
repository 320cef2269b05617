use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::domain::DataSource;
use crate::error::Result;
use crate::merge::MergeSummary;

pub const PATENTS_FILE: &str = "patents_processed.json";
pub const DRUGS_FILE: &str = "drugs_processed.json";
pub const RELATIONSHIPS_FILE: &str = "relationships.json";
pub const PATENT_STATS_FILE: &str = "patent_statistics.json";
pub const DRUG_STATS_FILE: &str = "drug_statistics.json";
pub const MASTER_INDEX_FILE: &str = "master_index.json";
pub const UNIFIED_PATENTS_FILE: &str = "unified_patents.json";
pub const UNIFIED_DRUGS_FILE: &str = "unified_drugs.json";
pub const DATA_REFERENCES_FILE: &str = "data_references.json";

/// Outcome of loading an upstream artifact, consumed by the index builder
/// to populate availability flags instead of ad hoc existence checks.
#[derive(Debug)]
pub enum SourceData<T> {
    Ok(T),
    Unavailable,
    Failed(String),
}

impl<T> SourceData<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceData::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetadata {
    pub source: DataSource,
    pub processed_date: String,
    pub version: String,
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStatistics {
    pub total_patents: usize,
    pub total_drugs: usize,
    pub total_relationships: usize,
}

/// Manifest for the normalized Cortellis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageIndex {
    pub metadata: StageMetadata,
    pub statistics: StageStatistics,
    pub files: BTreeMap<String, String>,
}

impl StageIndex {
    pub fn new(total_patents: usize, total_drugs: usize, total_relationships: usize) -> Self {
        let files = [
            ("patents", PATENTS_FILE),
            ("drugs", DRUGS_FILE),
            ("relationships", RELATIONSHIPS_FILE),
            ("patent_stats", PATENT_STATS_FILE),
            ("drug_stats", DRUG_STATS_FILE),
        ]
        .into_iter()
        .map(|(role, file)| (role.to_string(), file.to_string()))
        .collect();

        Self {
            metadata: StageMetadata {
                source: DataSource::Cortellis,
                processed_date: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                version: "1.0".to_string(),
                run_id: Uuid::new_v4(),
            },
            statistics: StageStatistics {
                total_patents,
                total_drugs,
                total_relationships,
            },
            files,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMetadata {
    pub sources: Vec<DataSource>,
    pub processed_date: String,
    pub version: String,
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub cortellis_only: usize,
    pub google_only: usize,
    pub both: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedStatistics {
    pub total_patents: usize,
    pub total_drugs: usize,
    pub data_sources: SourceBreakdown,
}

/// Manifest for the unified cross-source dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedIndex {
    pub metadata: UnifiedMetadata,
    pub statistics: UnifiedStatistics,
    pub files: BTreeMap<String, String>,
}

impl UnifiedIndex {
    pub fn new(summary: &MergeSummary, total_drugs: usize) -> Self {
        let files = [
            ("patents", UNIFIED_PATENTS_FILE),
            ("drugs", UNIFIED_DRUGS_FILE),
        ]
        .into_iter()
        .map(|(role, file)| (role.to_string(), file.to_string()))
        .collect();

        Self {
            metadata: UnifiedMetadata {
                sources: vec![DataSource::Cortellis, DataSource::GooglePatents],
                processed_date: Utc::now().to_rfc3339(),
                version: "2.0".to_string(),
                run_id: Uuid::new_v4(),
            },
            statistics: UnifiedStatistics {
                total_patents: summary.total,
                total_drugs,
                data_sources: SourceBreakdown {
                    cortellis_only: summary.cortellis_only,
                    google_only: summary.google_only,
                    both: summary.matched,
                },
            },
            files,
        }
    }
}

/// Availability section for the Cortellis processed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortellisAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StageStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability section for the Google Patents cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GooglePatentsAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_searches: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityMetadata {
    pub created: String,
    pub version: String,
    pub data_sources: Vec<DataSource>,
}

/// Cross-source availability manifest: which datasets exist, where, and how
/// much of each. Rebuilt wholesale each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityIndex {
    pub cortellis: CortellisAvailability,
    pub google_patents: GooglePatentsAvailability,
    pub metadata: AvailabilityMetadata,
}

impl AvailabilityIndex {
    pub fn build(
        cortellis: SourceData<StageIndex>,
        google_cache: SourceData<usize>,
        processed_dir: &Path,
        cache_dir: &Path,
    ) -> Self {
        let cortellis_section = match cortellis {
            SourceData::Ok(index) => CortellisAvailability {
                available: true,
                statistics: Some(index.statistics),
                files: Some(index.files),
                path: Some(processed_dir.display().to_string()),
                error: None,
            },
            SourceData::Unavailable => CortellisAvailability {
                available: false,
                statistics: None,
                files: None,
                path: None,
                error: None,
            },
            SourceData::Failed(reason) => CortellisAvailability {
                available: false,
                statistics: None,
                files: None,
                path: None,
                error: Some(reason),
            },
        };

        let google_section = match google_cache {
            SourceData::Ok(cached_searches) => GooglePatentsAvailability {
                available: true,
                cached_searches: Some(cached_searches),
                cache_dir: Some(cache_dir.display().to_string()),
                error: None,
            },
            SourceData::Unavailable => GooglePatentsAvailability {
                available: false,
                cached_searches: None,
                cache_dir: None,
                error: None,
            },
            SourceData::Failed(reason) => GooglePatentsAvailability {
                available: false,
                cached_searches: None,
                cache_dir: None,
                error: Some(reason),
            },
        };

        let mut data_sources = Vec::new();
        if cortellis_section.available {
            data_sources.push(DataSource::Cortellis);
        }
        if google_section.available {
            data_sources.push(DataSource::GooglePatents);
        }

        Self {
            cortellis: cortellis_section,
            google_patents: google_section,
            metadata: AvailabilityMetadata {
                created: Utc::now().to_rfc3339(),
                version: "2.0".to_string(),
                data_sources,
            },
        }
    }
}

/// Serialize a value to pretty JSON under `dir/name`.
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(value)?;
    fs::write(&path, content)?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Serialize a manifest to a temporary sibling first and rename it into
/// place, so a reader never observes a half-written manifest.
pub fn write_json_atomic<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let tmp_path = dir.join(format!("{}.tmp", name));
    let content = serde_json::to_string_pretty(value)?;
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, &path)?;
    debug!("Wrote {} (atomic)", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_index_shape() {
        let index = StageIndex::new(10, 5, 3);
        assert_eq!(index.metadata.version, "1.0");
        assert_eq!(index.statistics.total_relationships, 3);
        assert_eq!(index.files["patents"], PATENTS_FILE);
        assert_eq!(index.files.len(), 5);
    }

    #[test]
    fn test_unified_index_breakdown() {
        let summary = MergeSummary {
            total: 10,
            matched: 4,
            cortellis_only: 5,
            google_only: 1,
        };
        let index = UnifiedIndex::new(&summary, 7);
        assert_eq!(index.metadata.version, "2.0");
        assert_eq!(index.statistics.total_patents, 10);
        assert_eq!(index.statistics.data_sources.both, 4);
        assert_eq!(index.statistics.data_sources.cortellis_only, 5);
        assert_eq!(index.statistics.data_sources.google_only, 1);
    }

    #[test]
    fn test_availability_flags_follow_source_data() {
        let index = AvailabilityIndex::build(
            SourceData::Ok(StageIndex::new(1, 2, 0)),
            SourceData::Unavailable,
            Path::new("processed_data"),
            Path::new("cache/google_patents"),
        );
        assert!(index.cortellis.available);
        assert!(!index.google_patents.available);
        assert_eq!(index.metadata.data_sources, vec![DataSource::Cortellis]);

        let failed = AvailabilityIndex::build(
            SourceData::Failed("bad manifest".to_string()),
            SourceData::Ok(12),
            Path::new("processed_data"),
            Path::new("cache/google_patents"),
        );
        assert!(!failed.cortellis.available);
        assert_eq!(failed.cortellis.error.as_deref(), Some("bad manifest"));
        assert_eq!(failed.google_patents.cached_searches, Some(12));
        assert_eq!(
            failed.metadata.data_sources,
            vec![DataSource::GooglePatents]
        );
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = StageIndex::new(1, 1, 1);
        let path = write_json_atomic(dir.path(), MASTER_INDEX_FILE, &index).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join(format!("{}.tmp", MASTER_INDEX_FILE)).exists());

        let content = fs::read_to_string(&path).unwrap();
        let reloaded: StageIndex = serde_json::from_str(&content).unwrap();
        assert_eq!(reloaded.statistics.total_patents, 1);
    }
}
