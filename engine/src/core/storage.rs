//! Local persistence for completed session records.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::config::project_dirs;
use super::error::StorageError;
use crate::tasks::nback::ModalitySet;

const HISTORY_FILE: &str = "nback-daily-scores.json";

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

/// Summary of one completed session. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub n_level: u8,
    /// Overall accuracy, rounded, 0..=100.
    pub accuracy: u8,
    #[serde(rename = "types", alias = "modalities")]
    pub modalities: ModalitySet,
}

impl SessionRecord {
    /// The calendar date is taken from `timestamp` in UTC.
    pub fn new(
        timestamp: OffsetDateTime,
        n_level: u8,
        accuracy: u8,
        modalities: ModalitySet,
    ) -> Self {
        let timestamp = timestamp.to_offset(time::UtcOffset::UTC);
        Self {
            date: timestamp.date(),
            timestamp,
            n_level,
            accuracy: accuracy.min(100),
            modalities,
        }
    }
}

/// Append-only score log with bulk clear.
pub trait HistoryStore {
    fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError>;
    /// Records in append order.
    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError>;
    fn clear_all(&mut self) -> Result<(), StorageError>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for &mut T {
    fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        (**self).load_all()
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        (**self).clear_all()
    }
}

impl<T: HistoryStore + ?Sized> HistoryStore for Box<T> {
    fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        (**self).load_all()
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        (**self).clear_all()
    }
}

/// Process-local store; also the fallback when no data directory exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }
}

impl HistoryStore for MemoryStore {
    fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        Ok(self.records.clone())
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.records.clear();
        Ok(())
    }
}

/// One JSON array on disk, rewritten through a temp file on every append.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/nback-daily-scores.json` for the current user.
    pub fn open_default() -> Result<Self, StorageError> {
        let dirs = project_dirs().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join(HISTORY_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_all(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let payload = serde_json::to_vec_pretty(records)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))
    }
}

impl HistoryStore for JsonFileStore {
    fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut records = self.load_all()?;
        records.push(record.clone());
        self.write_all(&records)
    }

    fn load_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::nback::Modality;
    use time::macros::{date, datetime};

    fn record(accuracy: u8) -> SessionRecord {
        SessionRecord::new(
            datetime!(2025-10-14 21:45:12.250 UTC),
            3,
            accuracy,
            ModalitySet::of(&[Modality::Position, Modality::Audio]),
        )
    }

    #[test]
    fn record_date_comes_from_utc_timestamp() {
        let local = datetime!(2025-10-15 01:30:00 +05:00);
        let rec = SessionRecord::new(local, 2, 80, ModalitySet::of(&[Modality::Color]));
        assert_eq!(rec.date, date!(2025-10-14));
        assert_eq!(rec.timestamp.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn record_serializes_with_history_field_names() {
        let json = serde_json::to_value(record(88)).unwrap();
        assert_eq!(json["date"], "2025-10-14");
        assert_eq!(json["nLevel"], 3);
        assert_eq!(json["accuracy"], 88);
        assert_eq!(json["types"], serde_json::json!(["position", "audio"]));
        assert!(json["timestamp"].as_str().unwrap().starts_with("2025-10-14T21:45:12"));
    }

    #[test]
    fn memory_store_round_trip_and_clear() {
        let mut store = MemoryStore::new();
        store.append(&record(90)).unwrap();
        store.append(&record(60)).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![record(90), record(60)]);
        store.clear_all().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(HISTORY_FILE);

        let mut store = JsonFileStore::new(&path);
        assert!(store.load_all().unwrap().is_empty());
        store.append(&record(75)).unwrap();
        store.append(&record(100)).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load_all().unwrap(), vec![record(75), record(100)]);
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join(HISTORY_FILE));
        store.clear_all().unwrap();
        store.append(&record(50)).unwrap();
        store.clear_all().unwrap();
        store.clear_all().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_reports_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load_all(), Err(StorageError::Serde(_))));
    }

    #[test]
    fn reads_records_written_with_modalities_key() {
        let raw = r#"[{"date":"2025-01-02","timestamp":"2025-01-02T08:00:00Z","nLevel":1,"accuracy":70,"modalities":["color"]}]"#;
        let records: Vec<SessionRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].modalities, ModalitySet::of(&[Modality::Color]));
        assert_eq!(records[0].date, date!(2025-01-02));
    }
}
