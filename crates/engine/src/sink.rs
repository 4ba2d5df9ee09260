use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use common::{Error, Result};

use crate::snapshot::Snapshot;

/// Writes each cycle's snapshot to a single CSV file, replacing the previous one.
///
/// The file is written next to the target under a temporary name and then
/// renamed over it, so readers never see a half-written snapshot.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `snapshot` and return the path written.
    pub fn persist(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        let written = write_csv(&tmp, snapshot)
            .and_then(|()| std::fs::rename(&tmp, &self.path).map_err(Error::from));
        if let Err(e) = written {
            if let Err(rm) = std::fs::remove_file(&tmp) {
                debug!(path = %tmp.display(), error = %rm, "No temp file to clean up");
            }
            return Err(e);
        }

        info!(
            path = %self.path.display(),
            rows = snapshot.len(),
            cycle = %snapshot.cycle_id,
            "Snapshot written"
        );
        Ok(self.path.clone())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_csv(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let correlation_columns = snapshot.correlation_columns();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(snapshot.header())?;
    for row in snapshot.rows() {
        writer.write_record(row.record(&correlation_columns))?;
    }
    writer.flush()?;
    Ok(())
}

/// One CSV row keyed by column name. Empty cells are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotRecord {
    cells: BTreeMap<String, String>,
}

impl SnapshotRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column)?.parse().ok()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

/// Read a snapshot file back into keyed records.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<SnapshotRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() != headers.len() {
            return Err(Error::Other(format!(
                "row {} has {} cells, header has {}",
                records.len() + 1,
                record.len(),
                headers.len()
            )));
        }
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        records.push(SnapshotRecord { cells });
    }
    debug!(rows = records.len(), "Snapshot read back");
    Ok(records)
}
