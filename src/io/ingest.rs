//! CSV ingest into a [`Table`].
//!
//! Column types are inferred the way the downstream steps need them: a column
//! is numeric when every non-empty cell parses as a finite number, otherwise
//! it is text. Empty cells (and the usual NA spellings) are null.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::domain::{Table, Value};
use crate::error::AppError;

const NULL_TOKENS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Read a CSV file. A missing file is the one fatal input condition (exit 3);
/// `hint` tells the user which stage produces it.
pub fn read_table(path: &Path, hint: &str) -> Result<Table, AppError> {
    if !path.is_file() {
        return Err(AppError::missing_input(path, hint));
    }
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}'", path.display()), e))?;
    read_table_from(file)
        .map_err(|e| AppError::new(e.exit_code(), format!("{} ({})", e, path.display())))
}

pub fn read_table_from<R: Read>(reader: R) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::io("Failed to read CSV headers", e))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header line, and lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(record) => {
                let mut row: Vec<String> = record.iter().map(str::to_string).collect();
                row.resize(headers.len(), String::new());
                raw.push(row);
            }
            Err(e) => warn!(line, error = %e, "skipping unparsable CSV row"),
        }
    }

    let numeric: Vec<bool> = (0..headers.len())
        .map(|c| raw.iter().all(|r| is_null_token(&r[c]) || parse_number(&r[c]).is_some()))
        .collect();

    let mut table = Table::new(headers);
    for row in raw {
        let values = row
            .iter()
            .zip(&numeric)
            .map(|(cell, is_num)| parse_cell(cell, *is_num))
            .collect();
        table.push_row(values);
    }
    Ok(table)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn is_null_token(s: &str) -> bool {
    NULL_TOKENS.contains(&s)
}

fn parse_number(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_cell(s: &str, numeric: bool) -> Value {
    if is_null_token(s) {
        return Value::Null;
    }
    if numeric {
        Value::from_f64(parse_number(s))
    } else {
        Value::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_numeric_and_text_columns() {
        let csv = "\u{feff}Country,Year,GDP,Currency\nTestland,2023,1.5,TLD\nOther,2023,,\n";
        let t = read_table_from(csv.as_bytes()).unwrap();

        assert_eq!(t.columns(), ["Country", "Year", "GDP", "Currency"]);
        assert_eq!(t.value(0, "GDP"), Some(&Value::Number(1.5)));
        assert_eq!(t.value(1, "GDP"), Some(&Value::Null));
        assert_eq!(t.value(1, "Currency"), Some(&Value::Null));
        assert_eq!(t.value(0, "Year"), Some(&Value::Number(2023.0)));
    }

    #[test]
    fn a_single_word_makes_the_column_text() {
        let csv = "Country,Code\nA,1\nB,x\n";
        let t = read_table_from(csv.as_bytes()).unwrap();
        assert_eq!(t.value(0, "Code"), Some(&Value::Text("1".into())));
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let csv = "a,b,c\n1\n";
        let t = read_table_from(csv.as_bytes()).unwrap();
        assert_eq!(t.rows()[0], vec![Value::Number(1.0), Value::Null, Value::Null]);
    }

    #[test]
    fn empty_input_is_an_empty_table() {
        let t = read_table_from("".as_bytes()).unwrap();
        assert_eq!(t.width(), 0);
        assert!(t.is_empty());
    }

    #[test]
    fn missing_file_is_exit_code_3() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv"), "Run `econ scrape` first.").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("nope.csv"));
    }
}
