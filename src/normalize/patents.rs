use crate::domain::{DataSource, Patent};
use crate::ingest::Row;

use super::{clean_text, generate_id, parse_date, parse_list_field};

/// Build a canonical patent record from one sheet row. Absent columns are
/// valid input; the identifier is derived from the raw number fields so it
/// stays stable across runs.
pub fn normalize_patent(row: &Row, processed_date: &str) -> Patent {
    Patent {
        id: generate_id(&[row.get("patent_number"), row.get("application_number")]),
        patent_number: clean_text(row.get("patent_number")),
        application_number: clean_text(row.get("application_number")),
        title: clean_text(row.get("invention_title")),
        abstract_text: clean_text(row.get("annotation")),
        classifications: parse_list_field(row.get("abstract_classification")),
        advantages: clean_text(row.get("advantage")),
        application_date: parse_date(row.get("application_date")),
        grant_date: parse_date(row.get("grant_date")),
        expiry_date: parse_date(row.get("earliest_expiry_date")),
        latest_expiry_date: parse_date(row.get("latest_expiry_date")),
        inventors: parse_list_field(row.get("inventor_name")),
        grantees: parse_list_field(row.get("grantee")),
        original_applicants: parse_list_field(row.get("original_applicant")),
        compound_name: clean_text(row.get("compound_name")),
        drugs: parse_list_field(row.get("drugs")),
        chemistry: clean_text(row.get("chemistry")),
        biology: clean_text(row.get("biology")),
        formulation: clean_text(row.get("formulation")),
        jurisdiction: clean_text(row.get("jurisdiction")),
        medical_uses: parse_list_field(row.get("medical_use")),
        targets: parse_list_field(row.get("target")),
        mechanisms: parse_list_field(row.get("mechanism")),
        pharmacokinetics: clean_text(row.get("pharmacokinetics")),
        patent_family: clean_text(row.get("patent_family")),
        data_source: DataSource::Cortellis,
        processed_date: processed_date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TabularSource;
    use std::io::Write;

    const STAMP: &str = "2024-01-01 00:00:00";

    fn source_from(content: &str) -> TabularSource {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        TabularSource::read(file.path()).unwrap()
    }

    #[test]
    fn test_full_row_normalization() {
        let source = source_from(
            "patent_number,application_number,invention_title,abstract_classification,drugs,application_date\n\
             US123, APP456 ,  A   Title ,C07D; A61K,Aspirin;Ibuprofen,2020-01-15\n",
        );
        let row = source.rows().next().unwrap();
        let patent = normalize_patent(row, STAMP);

        assert_eq!(patent.patent_number.as_deref(), Some("US123"));
        assert_eq!(patent.application_number.as_deref(), Some("APP456"));
        assert_eq!(patent.title.as_deref(), Some("A Title"));
        assert_eq!(patent.classifications, vec!["C07D", "A61K"]);
        assert_eq!(patent.drugs, vec!["Aspirin", "Ibuprofen"]);
        assert_eq!(patent.application_date.as_deref(), Some("2020-01-15"));
        assert_eq!(patent.data_source, DataSource::Cortellis);
        assert_eq!(patent.id.len(), 16);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let source = source_from(
            "patent_number,application_number,invention_title\nUS123,APP456,Some Title\n",
        );
        let row = source.rows().next().unwrap();
        assert_eq!(normalize_patent(row, STAMP), normalize_patent(row, STAMP));
    }

    #[test]
    fn test_missing_columns_are_valid_input() {
        let source = source_from("patent_number\nUS999\n");
        let row = source.rows().next().unwrap();
        let patent = normalize_patent(row, STAMP);

        assert_eq!(patent.patent_number.as_deref(), Some("US999"));
        assert!(patent.application_number.is_none());
        assert!(patent.drugs.is_empty());
        assert!(patent.classifications.is_empty());
    }

    #[test]
    fn test_malformed_date_passes_through() {
        let source = source_from("patent_number,application_date\nUS1,not-a-date\n");
        let row = source.rows().next().unwrap();
        let patent = normalize_patent(row, STAMP);
        assert_eq!(patent.application_date.as_deref(), Some("not-a-date"));
    }

    #[test]
    fn test_serialized_record_has_no_empty_fields() {
        let source = source_from("patent_number,invention_title,drugs\nUS1,,\n");
        let row = source.rows().next().unwrap();
        let patent = normalize_patent(row, STAMP);
        let value = serde_json::to_value(&patent).unwrap();
        let object = value.as_object().unwrap();

        for (key, field) in object {
            assert!(!field.is_null(), "null field: {}", key);
            if let Some(text) = field.as_str() {
                assert!(!text.is_empty(), "empty string field: {}", key);
            }
            if let Some(list) = field.as_array() {
                assert!(!list.is_empty(), "empty list field: {}", key);
            }
        }
    }

    #[test]
    fn test_id_stable_for_equal_number_pairs() {
        let source = source_from(
            "patent_number,application_number,invention_title\n\
             US123,APP456,First Title\n\
             US123,APP456,Second Title\n",
        );
        let ids: Vec<String> = source
            .rows()
            .map(|row| normalize_patent(row, STAMP).id)
            .collect();
        assert_eq!(ids[0], ids[1]);
    }
}
