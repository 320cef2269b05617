use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::apis::PatentSearchApi;
use crate::config::Config;
use crate::domain::{Drug, Patent, SearchResults};
use crate::error::{ProcessorError, Result};
use crate::index::{
    self, AvailabilityIndex, SourceData, StageIndex, UnifiedIndex, DATA_REFERENCES_FILE,
    DRUGS_FILE, DRUG_STATS_FILE, MASTER_INDEX_FILE, PATENTS_FILE, PATENT_STATS_FILE,
    RELATIONSHIPS_FILE, UNIFIED_DRUGS_FILE, UNIFIED_PATENTS_FILE,
};
use crate::ingest::TabularSource;
use crate::merge::merge_patent_data;
use crate::normalize::{batch_stamp, normalize_drug, normalize_patent};
use crate::relationships::build_relationships;
use crate::stats::{drug_stats, patent_stats, Distribution};

/// Result of executing one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub success: bool,
    pub processed_count: usize,
    pub error_count: usize,
    pub message: String,
}

impl StageResult {
    pub fn success(processed: usize, message: String) -> Self {
        Self {
            success: true,
            processed_count: processed,
            error_count: 0,
            message,
        }
    }
}

/// Load a serialized record list. A missing file is a skippable condition;
/// a file that exists but does not hold a list of records is a structural
/// violation and fails the batch.
fn load_json_list<T: DeserializeOwned>(path: &Path) -> Result<SourceData<Vec<T>>> {
    if !path.exists() {
        return Ok(SourceData::Unavailable);
    }
    let content = fs::read_to_string(path)?;
    let records: Vec<T> = serde_json::from_str(&content).map_err(|e| {
        ProcessorError::InvalidInput(format!(
            "{} is not a valid record list: {}",
            path.display(),
            e
        ))
    })?;
    Ok(SourceData::Ok(records))
}

fn normalize_patents_from(source: &TabularSource, stamp: &str) -> Vec<Patent> {
    let total = source.len();
    let mut patents = Vec::with_capacity(total);
    for (idx, row) in source.rows().enumerate() {
        if idx > 0 && idx % 5_000 == 0 {
            info!("Processing patent {}/{}", idx, total);
            println!("   Processing patent {}/{}...", idx, total);
        }
        patents.push(normalize_patent(row, stamp));
    }
    patents
}

fn normalize_drugs_from(source: &TabularSource, stamp: &str) -> Vec<Drug> {
    let total = source.len();
    let mut drugs = Vec::with_capacity(total);
    for (idx, row) in source.rows().enumerate() {
        if idx > 0 && idx % 1_000 == 0 {
            info!("Processing drug {}/{}", idx, total);
            println!("   Processing drug {}/{}...", idx, total);
        }
        drugs.push(normalize_drug(row, stamp));
    }
    drugs
}

/// Normalize the Cortellis sheet exports into canonical JSON artifacts,
/// derive statistics and drug–patent relationships, and publish the stage
/// manifest.
#[instrument(skip(config))]
pub fn run_process_stage(config: &Config) -> Result<StageResult> {
    let t_stage = std::time::Instant::now();
    let stamp = batch_stamp();
    let output_dir = &config.output.processed_dir;

    counter!("unifier_process_runs_total").increment(1);

    // Patents
    println!("\n🔬 PROCESSING PATENT DATA...");
    let patents = if config.inputs.patents_file.exists() {
        let source = TabularSource::read(&config.inputs.patents_file)?;
        info!("Total patents: {}", source.len());
        println!("Total patents: {}", source.len());
        normalize_patents_from(&source, &stamp)
    } else {
        warn!(
            "Patent source {} not found; skipping patents",
            config.inputs.patents_file.display()
        );
        println!(
            "⚠️  Patent source {} not found",
            config.inputs.patents_file.display()
        );
        Vec::new()
    };
    counter!("unifier_patents_processed_total").increment(patents.len() as u64);

    // Drugs
    println!("\n💊 PROCESSING DRUG DATA...");
    let drugs = if config.inputs.drugs_file.exists() {
        let source = TabularSource::read(&config.inputs.drugs_file)?;
        info!("Total drugs: {}", source.len());
        println!("Total drugs: {}", source.len());
        normalize_drugs_from(&source, &stamp)
    } else {
        warn!(
            "Drug source {} not found; skipping drugs",
            config.inputs.drugs_file.display()
        );
        println!(
            "⚠️  Drug source {} not found",
            config.inputs.drugs_file.display()
        );
        Vec::new()
    };
    counter!("unifier_drugs_processed_total").increment(drugs.len() as u64);

    // Relationships
    println!("\n🔗 CREATING RELATIONSHIPS...");
    let relationships = build_relationships(&patents, &drugs);
    info!("Created {} relationships", relationships.len());
    println!("✅ Created {} relationships", relationships.len());
    counter!("unifier_relationships_total").increment(relationships.len() as u64);

    // Statistics
    let patent_statistics = patent_stats(&patents);
    let drug_statistics = drug_stats(&drugs);
    println!("\n📊 Patent Statistics:");
    println!("   Total Patents: {}", patent_statistics.total_patents);
    println!("   Patents with Drugs: {}", patent_statistics.patents_with_drugs);
    println!("   Unique Compounds: {}", patent_statistics.unique_compounds);
    println!("   Unique Grantees: {}", patent_statistics.unique_grantees);
    println!("\n📊 Drug Statistics:");
    println!("   Total Drugs: {}", drug_statistics.total_drugs);
    println!("   Launched Drugs: {}", drug_statistics.launched_drugs);

    // Persist artifacts; the manifest goes last and atomically, so a failed
    // batch never leaves a manifest pointing at missing files.
    index::write_json(output_dir, PATENTS_FILE, &patents)?;
    index::write_json(output_dir, DRUGS_FILE, &drugs)?;
    index::write_json(output_dir, RELATIONSHIPS_FILE, &relationships)?;
    index::write_json(output_dir, PATENT_STATS_FILE, &patent_statistics)?;
    index::write_json(output_dir, DRUG_STATS_FILE, &drug_statistics)?;

    let stage_index = StageIndex::new(patents.len(), drugs.len(), relationships.len());
    index::write_json_atomic(output_dir, MASTER_INDEX_FILE, &stage_index)?;

    histogram!("unifier_stage_duration_seconds", "stage" => "process")
        .record(t_stage.elapsed().as_secs_f64());

    let message = format!(
        "Processed {} patents, {} drugs, {} relationships -> {}",
        patents.len(),
        drugs.len(),
        relationships.len(),
        output_dir.display()
    );
    info!("✅ {}", message);

    Ok(StageResult::success(patents.len() + drugs.len(), message))
}

/// Pull the externally-sourced patent collection (through the cache-aware
/// search client) and reconcile it against the processed Cortellis data.
#[instrument(skip(config, api))]
pub async fn run_integrate_stage(
    config: &Config,
    api: &dyn PatentSearchApi,
) -> Result<StageResult> {
    let t_stage = std::time::Instant::now();
    let processed_dir = &config.output.processed_dir;
    let unified_dir = &config.output.unified_dir;

    counter!("unifier_integrate_runs_total").increment(1);

    // Load the processed collections; an absent artifact degrades to an
    // empty collection and the manifest will reflect zero matches.
    let patents: Vec<Patent> = match load_json_list(&processed_dir.join(PATENTS_FILE))? {
        SourceData::Ok(patents) => {
            info!("Loaded {} Cortellis patents", patents.len());
            println!("📂 Loaded {} Cortellis patents", patents.len());
            patents
        }
        _ => {
            warn!("No processed patents found; proceeding with empty collection");
            println!("⚠️  No processed patents found");
            Vec::new()
        }
    };
    let drugs: Vec<Drug> = match load_json_list(&processed_dir.join(DRUGS_FILE))? {
        SourceData::Ok(drugs) => {
            info!("Loaded {} Cortellis drugs", drugs.len());
            println!("📂 Loaded {} Cortellis drugs", drugs.len());
            drugs
        }
        _ => {
            warn!("No processed drugs found; proceeding with empty collection");
            println!("⚠️  No processed drugs found");
            Vec::new()
        }
    };

    // Search targets: drug names plus the most common active indications.
    let drug_names: Vec<String> = drugs
        .iter()
        .filter_map(|drug| drug.name.clone())
        .collect();
    let mut indication_counts = Distribution::new();
    for drug in &drugs {
        for indication in &drug.active_indications {
            indication_counts.increment(indication);
        }
    }
    let indications: Vec<String> = indication_counts
        .sorted()
        .into_iter()
        .take(config.google_patents.max_indications)
        .map(|(indication, _)| indication)
        .collect();

    info!(
        "Searching Google Patents for {} drug names and {} indications",
        drug_names.len().min(config.google_patents.max_drugs),
        indications.len()
    );

    // An external fetch failure must not sink the batch; merge proceeds
    // over whatever was collected.
    let search_results: SearchResults = match api
        .search_pharmaceutical_patents(&drug_names, &indications)
        .await
    {
        Ok(results) => results,
        Err(e) => {
            warn!("External patent search failed: {}", e);
            println!("⚠️  External patent search failed: {}", e);
            SearchResults::new()
        }
    };

    println!("\n🔗 MERGING PATENT DATA...");
    let outcome = merge_patent_data(&patents, &search_results);
    let summary = &outcome.summary;
    println!("✅ Merged {} total patents", summary.total);
    println!("   Matched: {}", summary.matched);
    println!("   Cortellis only: {}", summary.cortellis_only);
    println!("   Google only: {}", summary.google_only);

    println!("\n💾 SAVING UNIFIED DATA...");
    index::write_json(unified_dir, UNIFIED_PATENTS_FILE, &outcome.unified)?;
    index::write_json(unified_dir, UNIFIED_DRUGS_FILE, &drugs)?;

    let unified_index = UnifiedIndex::new(summary, drugs.len());
    index::write_json_atomic(unified_dir, MASTER_INDEX_FILE, &unified_index)?;

    histogram!("unifier_stage_duration_seconds", "stage" => "integrate")
        .record(t_stage.elapsed().as_secs_f64());

    let message = format!(
        "Unified {} patents ({} matched) -> {}",
        summary.total,
        summary.matched,
        unified_dir.display()
    );
    info!("✅ {}", message);

    Ok(StageResult::success(summary.total, message))
}

#[derive(Debug, Serialize)]
struct DataReferences {
    patents: String,
    drugs: String,
}

/// Assemble the cross-source availability manifest and gather the small
/// artifacts into the unified output directory.
#[instrument(skip(config))]
pub fn run_index_stage(config: &Config) -> Result<StageResult> {
    let t_stage = std::time::Instant::now();
    let processed_dir = &config.output.processed_dir;
    let unified_dir = &config.output.unified_dir;
    let cache_dir = &config.google_patents.cache_dir;

    counter!("unifier_index_runs_total").increment(1);

    // Cortellis availability comes from the stage manifest. A manifest that
    // exists but cannot be read is reported, not fatal.
    let stage_index_path = processed_dir.join(MASTER_INDEX_FILE);
    let cortellis: SourceData<StageIndex> = if !stage_index_path.exists() {
        println!("⚠️  Cortellis data not found");
        SourceData::Unavailable
    } else {
        match fs::read_to_string(&stage_index_path)
            .map_err(ProcessorError::from)
            .and_then(|content| {
                serde_json::from_str::<StageIndex>(&content).map_err(ProcessorError::from)
            }) {
            Ok(index) => {
                println!("✅ Cortellis data available");
                println!("   Patents: {}", index.statistics.total_patents);
                println!("   Drugs: {}", index.statistics.total_drugs);
                SourceData::Ok(index)
            }
            Err(e) => {
                warn!("Stage manifest unreadable: {}", e);
                SourceData::Failed(e.to_string())
            }
        }
    };

    let google_cache: SourceData<usize> =
        match crate::apis::google_patents::cached_search_count(cache_dir) {
            Some(count) => {
                println!("✅ Google Patents cache available");
                println!("   Cached searches: {}", count);
                SourceData::Ok(count)
            }
            None => {
                println!("⚠️  Google Patents cache not found");
                SourceData::Unavailable
            }
        };

    let cortellis_available = cortellis.is_available();
    let availability = AvailabilityIndex::build(cortellis, google_cache, processed_dir, cache_dir);
    index::write_json_atomic(unified_dir, MASTER_INDEX_FILE, &availability)?;

    // Gather the small artifacts next to the availability manifest and
    // leave references for the large ones. The stage manifest itself is
    // already embedded in the availability index, so it is not copied.
    let mut copied = 0usize;
    if cortellis_available {
        fs::create_dir_all(unified_dir)?;
        for filename in [RELATIONSHIPS_FILE, PATENT_STATS_FILE, DRUG_STATS_FILE] {
            let src = processed_dir.join(filename);
            if src.exists() {
                fs::copy(&src, unified_dir.join(filename))?;
                println!("   Copied: {}", filename);
                copied += 1;
            }
        }

        let references = DataReferences {
            patents: processed_dir.join(PATENTS_FILE).display().to_string(),
            drugs: processed_dir.join(DRUGS_FILE).display().to_string(),
        };
        index::write_json(unified_dir, DATA_REFERENCES_FILE, &references)?;
    }

    histogram!("unifier_stage_duration_seconds", "stage" => "index")
        .record(t_stage.elapsed().as_secs_f64());

    let sources: Vec<String> = availability
        .metadata
        .data_sources
        .iter()
        .map(|source| format!("{:?}", source))
        .collect();
    let message = format!(
        "Availability index written to {} (sources: {}; {} artifacts gathered)",
        unified_dir.display(),
        if sources.is_empty() {
            "none".to_string()
        } else {
            sources.join(", ")
        },
        copied
    );
    info!("✅ {}", message);

    Ok(StageResult::success(copied, message))
}

/// Run the full batch: process, integrate, index.
pub async fn run_full(config: &Config, api: &dyn PatentSearchApi) -> Result<Vec<StageResult>> {
    let mut results = Vec::new();
    results.push(run_process_stage(config)?);
    results.push(run_integrate_stage(config, api).await?);
    results.push(run_index_stage(config)?);
    Ok(results)
}

/// Load unified records back from disk, e.g. for downstream consumers.
pub fn load_unified_summary(config: &Config) -> Result<SourceData<BTreeMap<String, usize>>> {
    let path = config.output.unified_dir.join(UNIFIED_PATENTS_FILE);
    match load_json_list::<crate::domain::UnifiedPatent>(&path)? {
        SourceData::Ok(records) => {
            let mut summary = BTreeMap::new();
            summary.insert("total".to_string(), records.len());
            summary.insert(
                "matched".to_string(),
                records.iter().filter(|r| r.is_matched()).count(),
            );
            summary.insert(
                "cortellis_only".to_string(),
                records.iter().filter(|r| r.is_cortellis_only()).count(),
            );
            summary.insert(
                "google_only".to_string(),
                records.iter().filter(|r| r.is_google_only()).count(),
            );
            Ok(SourceData::Ok(summary))
        }
        SourceData::Unavailable => Ok(SourceData::Unavailable),
        SourceData::Failed(reason) => Ok(SourceData::Failed(reason)),
    }
}
