//! PHM Milling Dataset Adapter
//!
//! Parses the PHM milling tool wear CSV into [`ToolWearRecord`]s. The header
//! row names the columns; the loader looks up
//!
//! `force_x, force_y, force_z, vibration_x, vibration_y, vibration_z,
//! tool_wear, ACTION_CODE, RUL`
//!
//! by name and ignores anything else (`acoustic_emission_rms`, a leading
//! index column, ...). Rows that fail to parse are skipped with a warning.
//!
//! # Usage
//!
//! ```ignore
//! use milling_tool_env::data::PhmDataset;
//!
//! let dataset = PhmDataset::load("data/phm_c1.csv")?;
//! env.attach(Box::new(dataset));
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::{ToolWearRecord, ToolWearSource};
use crate::error::SourceError;

/// Required column names, in `ToolWearRecord` field order.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "force_x",
    "force_y",
    "force_z",
    "vibration_x",
    "vibration_y",
    "vibration_z",
    "tool_wear",
    "ACTION_CODE",
    "RUL",
];

/// Maximum number of per-row parse warnings logged for one file.
const MAX_ROW_WARNINGS: usize = 10;

// ============================================================================
// CSV Quote-Aware Parsing
// ============================================================================

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Check for escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// Column Mapping
// ============================================================================

/// Index of each required column in the CSV row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    indices: [usize; REQUIRED_COLUMNS.len()],
}

impl ColumnMap {
    fn from_header(header: &str) -> Result<Self, SourceError> {
        let names: Vec<String> = csv_split(header)
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut indices = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, required) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
            match names.iter().position(|n| n == required) {
                Some(i) => *slot = i,
                None => missing.push(required.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(Self { indices })
        } else {
            Err(SourceError::MissingColumns(missing))
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn parse_row(&self, line: &str, line_num: usize) -> Result<ToolWearRecord, SourceError> {
        let fields = csv_split(line);
        let mut values = [0.0f64; REQUIRED_COLUMNS.len()];

        for ((value, &index), name) in values.iter_mut().zip(&self.indices).zip(REQUIRED_COLUMNS) {
            let raw = fields.get(index).map(|s| s.trim()).ok_or_else(|| SourceError::Parse {
                line: line_num,
                message: format!("missing field '{name}'"),
            })?;
            *value = raw.parse::<f64>().map_err(|e| SourceError::Parse {
                line: line_num,
                message: format!("'{name}' = '{raw}': {e}"),
            })?;
            if !value.is_finite() {
                return Err(SourceError::Parse {
                    line: line_num,
                    message: format!("'{name}' is not finite"),
                });
            }
        }

        let [force_x, force_y, force_z, vibration_x, vibration_y, vibration_z, tool_wear, action_code, rul] =
            values;

        // ACTION_CODE is stored as a float in some exports ("1.0")
        if action_code.fract() != 0.0 {
            return Err(SourceError::Parse {
                line: line_num,
                message: format!("'ACTION_CODE' = {action_code} is not an integer"),
            });
        }

        Ok(ToolWearRecord {
            force_x,
            force_y,
            force_z,
            vibration_x,
            vibration_y,
            vibration_z,
            tool_wear,
            action_code: action_code as i64,
            rul,
        })
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// A fully loaded PHM milling dataset.
#[derive(Debug, Clone, Default)]
pub struct PhmDataset {
    records: Vec<ToolWearRecord>,
    /// Rows dropped during loading because they did not parse.
    pub skipped_rows: usize,
}

impl PhmDataset {
    /// Load a CSV file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file, &path.display().to_string())?;
        tracing::info!(
            file = %path.display(),
            records = dataset.records.len(),
            skipped = dataset.skipped_rows,
            "Loaded PHM tool wear dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV text from any reader. `name` only appears in errors and logs.
    pub fn from_reader(reader: impl Read, name: &str) -> Result<Self, SourceError> {
        let reader = BufReader::new(reader);
        let mut lines = reader.lines();

        let header = loop {
            match lines.next() {
                None => return Err(SourceError::Empty(name.to_string())),
                Some(Err(source)) => {
                    return Err(SourceError::Io {
                        path: name.into(),
                        source,
                    })
                }
                Some(Ok(l)) if l.trim().is_empty() => continue,
                Some(Ok(l)) => break l,
            }
        };
        let columns = ColumnMap::from_header(&header)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut line_num = 1usize;

        for line_result in lines {
            line_num += 1;

            let line = match line_result {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(line = line_num, error = %e, "Error reading line");
                    skipped += 1;
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match columns.parse_row(&line, line_num) {
                Ok(record) => records.push(record),
                Err(e) => {
                    if skipped < MAX_ROW_WARNINGS {
                        tracing::warn!(file = name, error = %e, "Skipping row");
                    }
                    skipped += 1;
                }
            }
        }

        if records.is_empty() {
            return Err(SourceError::Empty(name.to_string()));
        }

        Ok(Self {
            records,
            skipped_rows: skipped,
        })
    }

    pub fn records(&self) -> &[ToolWearRecord] {
        &self.records
    }
}

impl ToolWearSource for PhmDataset {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn record(&self, index: usize) -> Option<&ToolWearRecord> {
        self.records.get(index)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "index,force_x,force_y,force_z,vibration_x,vibration_y,vibration_z,acoustic_emission_rms,tool_wear,ACTION_CODE,RUL";

    #[test]
    fn test_csv_split_quoted() {
        let fields = csv_split(r#"a,"b,c",d"#);
        assert_eq!(fields, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_loads_rows_by_column_name() {
        let csv = format!(
            "{HEADER}\n0,0.1,0.2,0.3,0.4,0.5,0.6,0.9,48.0,0,120.0\n1,-0.1,-0.2,-0.3,-0.4,-0.5,-0.6,0.8,49.5,1.0,119.0\n"
        );
        let dataset = PhmDataset::from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped_rows, 0);

        let first = dataset.record(0).unwrap();
        assert_eq!(first.force_x, 0.1);
        assert_eq!(first.vibration_z, 0.6);
        assert_eq!(first.tool_wear, 48.0);
        assert_eq!(first.action_code, 0);
        assert_eq!(first.rul, 120.0);

        let second = dataset.record(1).unwrap();
        assert_eq!(second.action_code, 1);
        assert_eq!(second.rul, 119.0);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "RUL,ACTION_CODE,tool_wear,vibration_z,vibration_y,vibration_x,force_z,force_y,force_x\n5,1,2,0.6,0.5,0.4,0.3,0.2,0.1\n";
        let dataset = PhmDataset::from_reader(csv.as_bytes(), "reordered").unwrap();
        let r = dataset.record(0).unwrap();
        assert_eq!(r.force_x, 0.1);
        assert_eq!(r.rul, 5.0);
        assert_eq!(r.action_code, 1);
    }

    #[test]
    fn test_missing_columns_reported() {
        let csv = "force_x,force_y,force_z,vibration_x,vibration_y,tool_wear\n1,2,3,4,5,6\n";
        match PhmDataset::from_reader(csv.as_bytes(), "short") {
            Err(SourceError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["vibration_z", "ACTION_CODE", "RUL"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = format!(
            "{HEADER}\n0,0.1,0.2,0.3,0.4,0.5,0.6,0.9,48.0,0,120.0\n1,oops,0.2,0.3,0.4,0.5,0.6,0.9,48.0,0,119.0\n2,0.1,0.2\n3,0.1,0.2,0.3,0.4,0.5,0.6,0.9,48.0,0.5,118.0\n4,0.1,0.2,0.3,0.4,0.5,0.6,0.9,48.0,0,117.0\n"
        );
        let dataset = PhmDataset::from_reader(csv.as_bytes(), "dirty").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.skipped_rows, 3);
        assert_eq!(dataset.record(1).unwrap().rul, 117.0);
    }

    #[test]
    fn test_header_only_is_empty() {
        let result = PhmDataset::from_reader(format!("{HEADER}\n").as_bytes(), "empty");
        assert!(matches!(result, Err(SourceError::Empty(_))));
    }
}
