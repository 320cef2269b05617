use std::collections::HashMap;
use tracing::debug;

use crate::domain::{Drug, Patent, Relationship, RelationshipType};

/// Derive drug–patent edges by exact case-folded name matching. The drug
/// index is built once up front; patents referencing unknown drug names are
/// skipped silently, which is the common case.
pub fn build_relationships(patents: &[Patent], drugs: &[Drug]) -> Vec<Relationship> {
    let drug_index: HashMap<String, &Drug> = drugs
        .iter()
        .filter_map(|drug| drug.name.as_deref().map(|name| (name.to_lowercase(), drug)))
        .collect();

    let mut relationships = Vec::new();
    for patent in patents {
        for drug_name in &patent.drugs {
            if let Some(drug) = drug_index.get(&drug_name.to_lowercase()) {
                relationships.push(Relationship {
                    relationship_type: RelationshipType::DrugPatent,
                    drug_id: drug.id.clone(),
                    drug_name: drug_name.clone(),
                    patent_id: patent.id.clone(),
                    patent_number: patent.patent_number.clone(),
                    relationship_date: patent.application_date.clone(),
                });
            }
        }
    }

    debug!(
        "Built {} relationships from {} patents against {} indexed drugs",
        relationships.len(),
        patents.len(),
        drug_index.len()
    );

    relationships
}
