use csv::ReaderBuilder;

use crate::descriptor::NOT_AVAILABLE;
use crate::error::Rejection;

pub const REQUIRED_COLUMNS: [&str; 13] = [
    "#SampleID",
    "Instrument",
    "Library",
    "Gene",
    "Region",
    "PrimerF",
    "PrimerR",
    "Latitude",
    "Longitude",
    "Date",
    "Time",
    "SampleType",
    "Country",
];

/// Cell values read as missing, matching what spreadsheet exports and pandas
/// treat as NaN.
const MISSING_MARKERS: [&str; 18] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

/// Sample metadata table: one header row, one record per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MetadataTable {
    pub fn parse(content: &[u8]) -> Result<Self, Rejection> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content);

        let headers = reader
            .headers()
            .map_err(|err| Rejection::MalformedMetadata(err.to_string()))?
            .iter()
            .enumerate()
            .map(|(index, name)| {
                if index == 0 {
                    name.trim_start_matches('\u{feff}').to_string()
                } else {
                    name.to_string()
                }
            })
            .collect::<Vec<_>>();
        if headers.iter().all(|name| name.is_empty()) {
            return Err(Rejection::MalformedMetadata(
                "no header row found".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| Rejection::MalformedMetadata(err.to_string()))?;
            // Whitespace-only lines are blank lines, not samples.
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            if record.len() > headers.len() {
                let line = record.position().map(|pos| pos.line()).unwrap_or(0);
                return Err(Rejection::MalformedMetadata(format!(
                    "line {line} has {} fields, header has {}",
                    record.len(),
                    headers.len()
                )));
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Number of samples.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Required columns absent from the header, in required order.
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|column| self.column_index(column).is_none())
            .map(|column| column.to_string())
            .collect()
    }

    pub fn validate_schema(&self) -> Result<(), Rejection> {
        let missing = self.missing_columns();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Rejection::MissingColumns(missing))
        }
    }

    /// First non-missing value of `column` in row order, trimmed.
    ///
    /// The column is not checked for being constant; a column with mixed
    /// values yields whichever comes first. Absent columns and columns with
    /// no usable value give `"NA"`.
    pub fn first_value(&self, column: &str) -> String {
        let Some(index) = self.column_index(column) else {
            return NOT_AVAILABLE.to_string();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(index))
            .map(|cell| cell.trim())
            .find(|cell| !is_missing(cell))
            .map(str::to_string)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || MISSING_MARKERS.contains(&cell)
}
