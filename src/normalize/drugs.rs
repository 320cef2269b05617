use crate::domain::{DataSource, Drug, DrugPhases};
use crate::ingest::Row;

use super::{clean_text, parse_date, parse_list_field};

/// Build a canonical drug record from one sheet row. The drug id comes from
/// the source sheet; only the phase detail map needs assembling here.
pub fn normalize_drug(row: &Row, processed_date: &str) -> Drug {
    let phases = DrugPhases {
        launched: clean_text(row.get("phases_launched")),
        phase_3: clean_text(row.get("phases_phase_3")),
        phase_2: clean_text(row.get("phases_phase_2")),
        phase_1: clean_text(row.get("phases_phase_1")),
        preclinical: clean_text(row.get("phases_preclinical")),
    };

    Drug {
        id: clean_text(row.get("drug_id")),
        name: clean_text(row.get("drug_name")),
        synonyms: parse_list_field(row.get("synonyms")),
        active_companies: parse_list_field(row.get("active_companies")),
        inactive_companies: parse_list_field(row.get("inactive_companies")),
        active_indications: parse_list_field(row.get("active_indications")),
        inactive_indications: parse_list_field(row.get("inactive_indications")),
        highest_phase: clean_text(row.get("highest_phase_overall")),
        mechanism_of_action: parse_list_field(row.get("mechanism")),
        targets: parse_list_field(row.get("target")),
        therapeutic_class: parse_list_field(row.get("therapeutic_class")),
        ephmra_codes: parse_list_field(row.get("ephmra_codes")),
        first_launched_date: parse_date(row.get("first_launched_date")),
        first_launched_country: clean_text(row.get("first_launched_country/territory")),
        first_launched_indication: clean_text(row.get("first_launched_indication")),
        last_updated: parse_date(row.get("last_updated_date")),
        added_date: parse_date(row.get("added_date")),
        summary: clean_text(row.get("first_paragraph_of_summary")),
        phases: if phases.is_empty() { None } else { Some(phases) },
        data_source: DataSource::Cortellis,
        processed_date: processed_date.to_string(),
    }
}
