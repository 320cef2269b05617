use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// One record from a tabular source, addressable by column name.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<HashMap<String, usize>>,
    values: Vec<String>,
}

impl Row {
    /// Raw cell value for a named column. `None` means the column does not
    /// exist in this source; an empty cell comes back as `Some("")` and is
    /// left to the cleaning contracts to discard.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .get(name)
            .and_then(|&idx| self.values.get(idx))
            .map(|s| s.as_str())
    }
}

/// Row-iterable view over a Cortellis sheet export. The upstream sheets are
/// consumed as CSV; ragged rows are tolerated and short rows simply miss
/// their trailing cells.
pub struct TabularSource {
    rows: Vec<Row>,
}

impl TabularSource {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?;
        let mut columns = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            columns.insert(header.trim().to_string(), idx);
        }
        let columns = Arc::new(columns);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(Row {
                columns: Arc::clone(&columns),
                values: record.iter().map(|cell| cell.to_string()).collect(),
            });
        }

        debug!(
            "Read {} rows ({} columns) from {}",
            rows.len(),
            columns.len(),
            path.display()
        );

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}
