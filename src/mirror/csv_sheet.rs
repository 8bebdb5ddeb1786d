// src/mirror/csv_sheet.rs - CSV file standing in for the records spreadsheet
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;

use super::{MirrorStore, StoreError};

#[derive(Debug, Clone)]
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Rewrite the whole sheet through a temporary file in the same directory, so a failed
/// write leaves the previous contents in place.
fn write_rows(path: &Path, rows: &[Vec<String>]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_writer(temp.as_file_mut());
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl MirrorStore for CsvSheet {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_rows(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn write_row(&self, index: usize, values: &[String]) -> Result<(), StoreError> {
        if index == 0 {
            return Err(StoreError::InvalidRow(index));
        }
        let path = self.path.clone();
        let values = values.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut rows = read_rows(&path)?;
            if rows.len() < index {
                rows.resize(index, vec![String::new()]);
            }
            rows[index - 1] = values;
            write_rows(&path, &rows)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cells(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::new(dir.path().join("records.csv"));
        assert!(sheet.read_all_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_pads_and_overwrites() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::new(dir.path().join("records.csv"));

        sheet.write_row(3, &cells(&["c", "3"])).await.unwrap();
        sheet.write_row(1, &cells(&["a", "1, with comma"])).await.unwrap();
        let rows = sheet.read_all_rows().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], cells(&["a", "1, with comma"]));
        assert_eq!(rows[2], cells(&["c", "3"]));

        sheet.write_row(3, &cells(&["c", "33", "x"])).await.unwrap();
        let rows = sheet.read_all_rows().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], cells(&["c", "33", "x"]));
    }

    #[tokio::test]
    async fn test_write_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        std::fs::write(&path, "a,1\nb,2\n").unwrap();
        let sheet = CsvSheet::new(&path);

        sheet.write_row(2, &cells(&["b", "22"])).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,1\nb,22\n");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_existing_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        std::fs::write(&path, "a,1\n").unwrap();
        // Renaming a file over a non-empty directory fails
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();
        assert!(write_rows(&blocked, &[cells(&["z"])]).is_err());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,1\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_row_zero_is_rejected() {
        let dir = tempdir().unwrap();
        let sheet = CsvSheet::new(dir.path().join("records.csv"));
        let result = tokio_test::block_on(sheet.write_row(0, &cells(&["a"])));
        assert!(matches!(result, Err(StoreError::InvalidRow(0))));
    }
}
