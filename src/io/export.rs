//! CSV writers.
//!
//! Every writer emits a header row even when there are no data rows, so a run
//! that produced nothing still leaves a readable file behind.

use std::fs::{File, create_dir_all};
use std::path::Path;

use crate::domain::{SnapshotRecord, Table};
use crate::error::AppError;

fn create(path: &Path) -> Result<File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}'", parent.display()), e))?;
    }
    File::create(path).map_err(|e| AppError::io(format!("Failed to create CSV '{}'", path.display()), e))
}

/// Write scraped snapshot records (`raw_economic_data.csv`).
pub fn write_snapshot_csv(path: &Path, records: &[SnapshotRecord]) -> Result<(), AppError> {
    write_table(path, &SnapshotRecord::to_table(records))
}

/// Write a table with its header row.
pub fn write_table(path: &Path, table: &Table) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    writer
        .write_record(table.columns())
        .map_err(|e| AppError::io(format!("Failed to write CSV header '{}'", path.display()), e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.render()))
            .map_err(|e| AppError::io(format!("Failed to write CSV row '{}'", path.display()), e))?;
    }
    writer.flush().map_err(|e| AppError::io("Failed to flush CSV", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldValue, SnapshotField, Value};
    use crate::io::ingest::read_table;

    #[test]
    fn empty_outputs_still_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/raw.csv");

        write_snapshot_csv(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), SnapshotRecord::COLUMNS.join(","));
    }

    #[test]
    fn snapshot_rows_read_back_with_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let mut r = SnapshotRecord::new("United States", 2023);
        r.set(SnapshotField::GdpGrowth, FieldValue::Number(2.5));
        r.set(SnapshotField::MainSectors, FieldValue::Text("Services, industry".into()));

        write_snapshot_csv(&path, &[r]).unwrap();
        let t = read_table(&path, "").unwrap();

        assert_eq!(t.columns().len(), SnapshotRecord::COLUMNS.len());
        assert_eq!(t.value(0, "Country"), Some(&Value::Text("United States".into())));
        assert_eq!(t.value(0, "GDP_Growth"), Some(&Value::Number(2.5)));
        assert_eq!(t.value(0, "HDI"), Some(&Value::Null));
        assert_eq!(t.value(0, "Main_Sectors"), Some(&Value::Text("Services, industry".into())));
    }

    #[test]
    fn table_output_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = Table::new(["Country", "Year", "x"]);
        t.push_row(vec![Value::Text("A".into()), Value::Number(2023.0), Value::Number(0.1 + 0.2)]);

        write_table(&dir.path().join("a.csv"), &t).unwrap();
        write_table(&dir.path().join("b.csv"), &t).unwrap();

        let a = std::fs::read(dir.path().join("a.csv")).unwrap();
        let b = std::fs::read(dir.path().join("b.csv")).unwrap();
        assert_eq!(a, b);
        assert_eq!(String::from_utf8(a).unwrap(), "Country,Year,x\nA,2023,0.30000000000000004\n");
    }
}
