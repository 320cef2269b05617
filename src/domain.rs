use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance tag for a record's originating dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataSource {
    Cortellis,
    #[serde(rename = "Google Patents")]
    GooglePatents,
}

/// A normalized Cortellis patent record. Absent fields stay absent in the
/// serialized output, so every field beyond the derived id is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advantages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grantees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub original_applicants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemistry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_uses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mechanisms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pharmacokinetics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_family: Option<String>,
    pub data_source: DataSource,
    pub processed_date: String,
}

/// Development-phase detail for a drug; only phases with a value are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DrugPhases {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preclinical: Option<String>,
}

impl DrugPhases {
    pub fn is_empty(&self) -> bool {
        self.launched.is_none()
            && self.phase_3.is_none()
            && self.phase_2.is_none()
            && self.phase_1.is_none()
            && self.preclinical.is_none()
    }
}

/// A normalized Cortellis drug record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drug {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_companies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inactive_companies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_indications: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inactive_indications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mechanism_of_action: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub therapeutic_class: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ephmra_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_launched_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_launched_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_launched_indication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<DrugPhases>,
    pub data_source: DataSource,
    pub processed_date: String,
}

/// Typed edge between a drug and a patent that references it by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_id: Option<String>,
    pub drug_name: String,
    pub patent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelationshipType {
    #[serde(rename = "drug_patent")]
    DrugPatent,
}

/// A standardized Google Patents search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalPatent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_patents_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_category: Option<String>,
    pub data_source: DataSource,
    pub fetched_date: String,
}

/// Cortellis-only domain fields embedded into a matched unified record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CortellisCrossRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_uses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mechanisms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advantages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chemistry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulation: Option<String>,
}

impl CortellisCrossRef {
    pub fn from_patent(patent: &Patent) -> Self {
        Self {
            compound_name: patent.compound_name.clone(),
            drugs: patent.drugs.clone(),
            medical_uses: patent.medical_uses.clone(),
            targets: patent.targets.clone(),
            mechanisms: patent.mechanisms.clone(),
            advantages: patent.advantages.clone(),
            biology: patent.biology.clone(),
            chemistry: patent.chemistry.clone(),
            formulation: patent.formulation.clone(),
        }
    }
}

/// Either side of the unified dataset, serialized with its native shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UnifiedSource {
    External(ExternalPatent),
    Local(Patent),
}

/// A reconciled patent record with provenance tags and, when both sources
/// know the patent, the embedded Cortellis cross-reference block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnifiedPatent {
    #[serde(flatten)]
    pub record: UnifiedSource,
    pub data_sources: Vec<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cortellis_data: Option<CortellisCrossRef>,
}

impl UnifiedPatent {
    pub fn is_matched(&self) -> bool {
        self.data_sources.len() > 1
    }

    pub fn is_cortellis_only(&self) -> bool {
        self.data_sources == [DataSource::Cortellis]
    }

    pub fn is_google_only(&self) -> bool {
        self.data_sources == [DataSource::GooglePatents]
    }
}

/// Search results keyed by search category (drug name or indication). The
/// ordered map keeps category iteration, and so merge output, reproducible.
pub type SearchResults = BTreeMap<String, Vec<ExternalPatent>>;
