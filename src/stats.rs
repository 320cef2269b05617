use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{Drug, Patent};

/// How many entries the truncated distributions keep.
const TOP_DISTRIBUTION_ENTRIES: usize = 20;

/// Frequency counter that remembers first-encounter order so top-N
/// truncation breaks count ties deterministically.
#[derive(Debug, Default)]
pub struct Distribution {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    /// Entries sorted by descending count; a stable sort keeps ties in
    /// first-encountered order.
    pub fn sorted(&self) -> Vec<(String, u64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }

    /// The top `n` entries as a serializable map.
    pub fn top(&self, n: usize) -> BTreeMap<String, u64> {
        self.sorted().into_iter().take(n).collect()
    }

    pub fn into_map(self) -> BTreeMap<String, u64> {
        self.entries.into_iter().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatentStats {
    pub total_patents: usize,
    pub patents_with_drugs: usize,
    pub unique_compounds: usize,
    pub unique_grantees: usize,
    pub classification_distribution: BTreeMap<String, u64>,
    pub year_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugStats {
    pub total_drugs: usize,
    pub launched_drugs: usize,
    pub phase_distribution: BTreeMap<String, u64>,
    pub indication_distribution: BTreeMap<String, u64>,
    pub company_distribution: BTreeMap<String, u64>,
}

/// Distributions over the normalized patent collection. Keys are the raw
/// field values; synonymous variants are deliberately not merged.
pub fn patent_stats(patents: &[Patent]) -> PatentStats {
    let mut classifications = Distribution::new();
    let mut years = Distribution::new();
    let mut compounds = HashSet::new();
    let mut grantees = HashSet::new();

    for patent in patents {
        for classification in &patent.classifications {
            classifications.increment(classification);
        }
        // Filing year is the first four characters of the normalized date;
        // records without an application date are not counted.
        if let Some(date) = &patent.application_date {
            let year = date.get(..4).unwrap_or(date.as_str());
            years.increment(year);
        }
        if let Some(compound) = &patent.compound_name {
            compounds.insert(compound.as_str());
        }
        for grantee in &patent.grantees {
            grantees.insert(grantee.as_str());
        }
    }

    PatentStats {
        total_patents: patents.len(),
        patents_with_drugs: patents.iter().filter(|p| !p.drugs.is_empty()).count(),
        unique_compounds: compounds.len(),
        unique_grantees: grantees.len(),
        classification_distribution: classifications.into_map(),
        year_distribution: years.into_map(),
    }
}

/// Distributions over the normalized drug collection; indication and company
/// distributions are truncated to the top 20.
pub fn drug_stats(drugs: &[Drug]) -> DrugStats {
    let mut phases = Distribution::new();
    let mut indications = Distribution::new();
    let mut companies = Distribution::new();

    for drug in drugs {
        phases.increment(drug.highest_phase.as_deref().unwrap_or("Unknown"));
        for indication in &drug.active_indications {
            indications.increment(indication);
        }
        for company in &drug.active_companies {
            companies.increment(company);
        }
    }

    DrugStats {
        total_drugs: drugs.len(),
        launched_drugs: drugs
            .iter()
            .filter(|d| d.highest_phase.as_deref() == Some("Launched"))
            .count(),
        phase_distribution: phases.into_map(),
        indication_distribution: indications.top(TOP_DISTRIBUTION_ENTRIES),
        company_distribution: companies.top(TOP_DISTRIBUTION_ENTRIES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataSource;

    fn patent(number: &str, classifications: &[&str], date: Option<&str>, drugs: &[&str]) -> Patent {
        Patent {
            id: number.to_string(),
            patent_number: Some(number.to_string()),
            application_number: None,
            title: None,
            abstract_text: None,
            classifications: classifications.iter().map(|s| s.to_string()).collect(),
            advantages: None,
            application_date: date.map(|s| s.to_string()),
            grant_date: None,
            expiry_date: None,
            latest_expiry_date: None,
            inventors: Vec::new(),
            grantees: Vec::new(),
            original_applicants: Vec::new(),
            compound_name: None,
            drugs: drugs.iter().map(|s| s.to_string()).collect(),
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

    fn drug(name: &str, phase: Option<&str>, indications: &[&str]) -> Drug {
        Drug {
            id: Some(format!("id-{}", name)),
            name: Some(name.to_string()),
            synonyms: Vec::new(),
            active_companies: Vec::new(),
            inactive_companies: Vec::new(),
            active_indications: indications.iter().map(|s| s.to_string()).collect(),
            inactive_indications: Vec::new(),
            highest_phase: phase.map(|s| s.to_string()),
            mechanism_of_action: Vec::new(),
            targets: Vec::new(),
            therapeutic_class: Vec::new(),
            ephmra_codes: Vec::new(),
            first_launched_date: None,
            first_launched_country: None,
            first_launched_indication: None,
            last_updated: None,
            added_date: None,
            summary: None,
            phases: None,
            data_source: DataSource::Cortellis,
            processed_date: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_distribution_tie_break_is_first_encountered() {
        let mut distribution = Distribution::new();
        for key in ["beta", "alpha", "beta", "gamma", "alpha", "delta"] {
            distribution.increment(key);
        }
        // beta and alpha tie at 2; beta was seen first
        let sorted = distribution.sorted();
        assert_eq!(sorted[0].0, "beta");
        assert_eq!(sorted[1].0, "alpha");

        // truncation keeps first-encountered among the count-1 ties
        let top3 = distribution.top(3);
        assert!(top3.contains_key("gamma"));
        assert!(!top3.contains_key("delta"));
    }

    #[test]
    fn test_patent_stats_year_extraction() {
        let patents = vec![
            patent("P1", &["C07D"], Some("2020-01-15"), &["Aspirin"]),
            patent("P2", &["C07D", "A61K"], Some("2020-06-30"), &[]),
            patent("P3", &[], Some("not-a-date"), &[]),
            patent("P4", &[], None, &[]),
        ];
        let stats = patent_stats(&patents);

        assert_eq!(stats.total_patents, 4);
        assert_eq!(stats.patents_with_drugs, 1);
        assert_eq!(stats.classification_distribution["C07D"], 2);
        assert_eq!(stats.classification_distribution["A61K"], 1);
        assert_eq!(stats.year_distribution["2020"], 2);
        // Malformed passthrough dates still contribute their prefix
        assert_eq!(stats.year_distribution["not-"], 1);
        // Patents without an application date are not counted at all
        let total_year_counts: u64 = stats.year_distribution.values().sum();
        assert_eq!(total_year_counts, 3);
    }

    #[test]
    fn test_drug_stats_phase_and_launched_counts() {
        let drugs = vec![
            drug("Aspirin", Some("Launched"), &["Pain"]),
            drug("Newdrug", Some("Phase 2"), &["Pain", "Fever"]),
            drug("Mystery", None, &[]),
        ];
        let stats = drug_stats(&drugs);

        assert_eq!(stats.total_drugs, 3);
        assert_eq!(stats.launched_drugs, 1);
        assert_eq!(stats.phase_distribution["Launched"], 1);
        assert_eq!(stats.phase_distribution["Unknown"], 1);
        assert_eq!(stats.indication_distribution["Pain"], 2);
    }
}
