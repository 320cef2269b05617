use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::domain::{
    CortellisCrossRef, DataSource, ExternalPatent, Patent, SearchResults, UnifiedPatent,
    UnifiedSource,
};

/// Counts reported after a merge pass. The completeness invariant
/// `total == matched + cortellis_only + google_only` holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeSummary {
    pub total: usize,
    pub matched: usize,
    pub cortellis_only: usize,
    pub google_only: usize,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub unified: Vec<UnifiedPatent>,
    pub summary: MergeSummary,
}

/// Reconcile the local Cortellis collection against externally-sourced
/// records into one unified sequence with no duplicate logical patents.
///
/// Pure in-memory transformation: given order-stable inputs the output order
/// and counts are reproducible, and re-running on the same snapshots yields
/// identical results. Inputs are trusted to be deduplicated per source.
#[instrument(skip_all, fields(local = local.len()))]
pub fn merge_patent_data(local: &[Patent], external: &SearchResults) -> MergeOutcome {
    // A patent is reachable through either of its numbers; both keys point
    // at the same record.
    let mut local_lookup: HashMap<&str, usize> = HashMap::new();
    for (position, patent) in local.iter().enumerate() {
        if let Some(number) = patent.patent_number.as_deref() {
            local_lookup.insert(number, position);
        }
        if let Some(number) = patent.application_number.as_deref() {
            local_lookup.insert(number, position);
        }
    }

    let external_records: Vec<ExternalPatent> = external
        .iter()
        .flat_map(|(category, records)| {
            records.iter().map(move |record| {
                let mut record = record.clone();
                record.search_category = Some(category.clone());
                record
            })
        })
        .collect();

    let mut unified = Vec::with_capacity(external_records.len() + local.len());
    let mut matched_locals: HashSet<usize> = HashSet::new();
    let mut matched = 0usize;

    for record in external_records {
        // Patent-id match takes priority over application-number match.
        let local_match = record
            .id
            .as_deref()
            .and_then(|key| local_lookup.get(key))
            .or_else(|| {
                record
                    .application_number
                    .as_deref()
                    .and_then(|key| local_lookup.get(key))
            })
            .copied();

        match local_match {
            Some(position) => {
                let matched_patent = &local[position];
                matched_locals.insert(position);
                matched += 1;
                counter!("unifier_merge_matched_total").increment(1);
                unified.push(UnifiedPatent {
                    record: UnifiedSource::External(record),
                    data_sources: vec![DataSource::Cortellis, DataSource::GooglePatents],
                    cortellis_data: Some(CortellisCrossRef::from_patent(matched_patent)),
                });
            }
            None => {
                counter!("unifier_merge_external_only_total").increment(1);
                unified.push(UnifiedPatent {
                    record: UnifiedSource::External(record),
                    data_sources: vec![DataSource::GooglePatents],
                    cortellis_data: None,
                });
            }
        }
    }

    let google_only = unified.len() - matched;

    // Every local record not consumed by a match is emitted standalone,
    // exactly once, in input order.
    let mut cortellis_only = 0usize;
    for (position, patent) in local.iter().enumerate() {
        if matched_locals.contains(&position) {
            continue;
        }
        cortellis_only += 1;
        counter!("unifier_merge_local_only_total").increment(1);
        unified.push(UnifiedPatent {
            record: UnifiedSource::Local(patent.clone()),
            data_sources: vec![DataSource::Cortellis],
            cortellis_data: None,
        });
    }

    let summary = MergeSummary {
        total: unified.len(),
        matched,
        cortellis_only,
        google_only,
    };

    info!(
        "Merged {} patents ({} matched, {} Cortellis only, {} Google only)",
        summary.total, summary.matched, summary.cortellis_only, summary.google_only
    );
    debug!("Local lookup held {} keys", local_lookup.len());

    MergeOutcome { unified, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResults;

    fn local_patent(number: Option<&str>, application: Option<&str>, compound: Option<&str>) -> Patent {
        Patent {
            id: crate::normalize::generate_id(&[number, application]),
            patent_number: number.map(|s| s.to_string()),
            application_number: application.map(|s| s.to_string()),
            title: None,
            abstract_text: None,
            classifications: Vec::new(),
            advantages: None,
            application_date: None,
            grant_date: None,
            expiry_date: None,
            latest_expiry_date: None,
            inventors: Vec::new(),
            grantees: Vec::new(),
            original_applicants: Vec::new(),
            compound_name: compound.map(|s| s.to_string()),
            drugs: Vec::new(),
            chemistry: None,
            biology: None,
            formulation: None,
            jurisdiction: None,
            medical_uses: Vec::new(),
            targets: Vec::new(),
            mechanisms: Vec::new(),
            pharmacokinetics: None,
            patent_family: None,
            data_source: DataSource::Cortellis,
            processed_date: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn external_patent(id: Option<&str>, application: Option<&str>) -> ExternalPatent {
        ExternalPatent {
            id: id.map(|s| s.to_string()),
            title: Some("External title".to_string()),
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
            application_number: application.map(|s| s.to_string()),
            search_category: None,
            data_source: DataSource::GooglePatents,
            fetched_date: "2024-01-01T00:00:00".to_string(),
        }
    }

    fn search_results(records: Vec<ExternalPatent>) -> SearchResults {
        let mut results = SearchResults::new();
        results.insert("test_category".to_string(), records);
        results
    }

    #[test]
    fn test_matched_patent_embeds_cortellis_fields() {
        let local = vec![local_patent(Some("P1"), None, Some("X"))];
        let external = search_results(vec![external_patent(Some("P1"), None)]);

        let outcome = merge_patent_data(&local, &external);

        assert_eq!(outcome.summary.matched, 1);
        assert_eq!(outcome.unified.len(), 1);
        let record = &outcome.unified[0];
        assert_eq!(
            record.data_sources,
            vec![DataSource::Cortellis, DataSource::GooglePatents]
        );
        let cross_ref = record.cortellis_data.as_ref().unwrap();
        assert_eq!(cross_ref.compound_name.as_deref(), Some("X"));
    }

    #[test]
    fn test_unmatched_local_appears_once_as_cortellis_only() {
        let local = vec![local_patent(Some("P2"), Some("APP2"), None)];
        let external = search_results(vec![]);

        let outcome = merge_patent_data(&local, &external);

        // Reachable under two keys but emitted exactly once
        assert_eq!(outcome.unified.len(), 1);
        assert!(outcome.unified[0].is_cortellis_only());
        assert_eq!(outcome.summary.cortellis_only, 1);
        assert_eq!(outcome.summary.matched, 0);
    }

    #[test]
    fn test_match_by_application_number() {
        let local = vec![local_patent(Some("P1"), Some("APP1"), None)];
        let external = search_results(vec![external_patent(Some("G-999"), Some("APP1"))]);

        let outcome = merge_patent_data(&local, &external);

        assert_eq!(outcome.summary.matched, 1);
        assert_eq!(outcome.summary.cortellis_only, 0);
    }

    #[test]
    fn test_patent_id_match_takes_priority() {
        let by_id = local_patent(Some("P1"), None, Some("ById"));
        let by_app = local_patent(None, Some("APP1"), Some("ByApp"));
        let local = vec![by_id, by_app];
        // Both keys would match different locals; the id match must win.
        let external = search_results(vec![external_patent(Some("P1"), Some("APP1"))]);

        let outcome = merge_patent_data(&local, &external);

        assert_eq!(outcome.summary.matched, 1);
        let cross_ref = outcome.unified[0].cortellis_data.as_ref().unwrap();
        assert_eq!(cross_ref.compound_name.as_deref(), Some("ById"));
        // The application-number local stays unmatched
        assert_eq!(outcome.summary.cortellis_only, 1);
    }

    #[test]
    fn test_unmatched_external_is_google_only() {
        let local = vec![];
        let external = search_results(vec![external_patent(Some("G-1"), None)]);

        let outcome = merge_patent_data(&local, &external);

        assert_eq!(outcome.unified.len(), 1);
        assert!(outcome.unified[0].is_google_only());
        assert!(outcome.unified[0].cortellis_data.is_none());
    }

    #[test]
    fn test_merge_completeness() {
        let local = vec![
            local_patent(Some("P1"), Some("A1"), Some("X")),
            local_patent(Some("P2"), None, None),
            local_patent(None, Some("A3"), None),
        ];
        let external = search_results(vec![
            external_patent(Some("P1"), None),
            external_patent(Some("G-1"), Some("A3")),
            external_patent(Some("G-2"), None),
        ]);

        let outcome = merge_patent_data(&local, &external);
        let summary = &outcome.summary;

        assert_eq!(
            summary.total,
            summary.matched + summary.cortellis_only + summary.google_only
        );
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.cortellis_only, 1);
        assert_eq!(summary.google_only, 1);
        assert_eq!(summary.total, outcome.unified.len());
    }

    #[test]
    fn test_merge_is_deterministic() {
        let local = vec![
            local_patent(Some("P1"), Some("A1"), Some("X")),
            local_patent(Some("P2"), None, None),
        ];
        let mut external = SearchResults::new();
        external.insert(
            "aspirin".to_string(),
            vec![external_patent(Some("P1"), None), external_patent(Some("G-1"), None)],
        );
        external.insert(
            "ibuprofen".to_string(),
            vec![external_patent(Some("G-2"), None)],
        );

        let first = merge_patent_data(&local, &external);
        let second = merge_patent_data(&local, &external);

        assert_eq!(first.summary, second.summary);
        assert_eq!(
            serde_json::to_string(&first.unified).unwrap(),
            serde_json::to_string(&second.unified).unwrap()
        );
    }

    #[test]
    fn test_search_category_is_tagged() {
        let external = search_results(vec![external_patent(Some("G-1"), None)]);
        let outcome = merge_patent_data(&[], &external);
        match &outcome.unified[0].record {
            UnifiedSource::External(record) => {
                assert_eq!(record.search_category.as_deref(), Some("test_category"));
            }
            UnifiedSource::Local(_) => panic!("expected external record"),
        }
    }
}
