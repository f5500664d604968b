//! Retired player records and the sinks that store them
//!
//! When a dog retires its final score is pushed to a record sink. Records are
//! keyed by the dog's UUID, so saving the same dog twice replaces the earlier
//! record. Queries return pages ordered by score (highest first), then by
//! play time (shortest first), then by name.

use crate::error::RecordError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::MAX_RECORDS_PAGE;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub uuid: Uuid,
    pub name: String,
    pub score: u64,
    pub play_time_ms: u64,
}

/// Destination for retirement records
pub trait RecordSink: Send {
    /// Inserts the record, replacing any record with the same uuid
    fn save_record(&mut self, record: PlayerRecord) -> Result<(), RecordError>;

    /// Returns at most `max_items` records starting at `start` in ranking order
    fn top_records(&self, start: u32, max_items: u32) -> Result<Vec<PlayerRecord>, RecordError>;
}

/// Resolves the requested page size, rejecting sizes above the limit
pub fn page_size(max_items: Option<u32>) -> Result<u32, RecordError> {
    match max_items {
        None => Ok(MAX_RECORDS_PAGE),
        Some(n) if n > MAX_RECORDS_PAGE => Err(RecordError::LimitExceeded(n, MAX_RECORDS_PAGE)),
        Some(n) => Ok(n),
    }
}

/// In-process record table
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: HashMap<Uuid, PlayerRecord>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ranked(&self) -> Vec<&PlayerRecord> {
        let mut ranked: Vec<&PlayerRecord> = self.records.values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.play_time_ms.cmp(&b.play_time_ms))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked
    }
}

impl RecordSink for MemoryRecordSink {
    fn save_record(&mut self, record: PlayerRecord) -> Result<(), RecordError> {
        debug!("Saving record for {} ({})", record.name, record.uuid);
        self.records.insert(record.uuid, record);
        Ok(())
    }

    fn top_records(&self, start: u32, max_items: u32) -> Result<Vec<PlayerRecord>, RecordError> {
        if max_items > MAX_RECORDS_PAGE {
            return Err(RecordError::LimitExceeded(max_items, MAX_RECORDS_PAGE));
        }
        Ok(self
            .ranked()
            .into_iter()
            .skip(start as usize)
            .take(max_items as usize)
            .cloned()
            .collect())
    }
}

/// Record table mirrored to a JSON file after every save
#[derive(Debug)]
pub struct JsonFileRecordSink {
    path: PathBuf,
    table: MemoryRecordSink,
}

impl JsonFileRecordSink {
    /// Opens the file, starting empty when it does not exist yet
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        let mut table = MemoryRecordSink::new();

        if path.exists() {
            let text =
                fs::read_to_string(path).map_err(|e| RecordError::FileRead(path.to_path_buf(), e))?;
            let records: Vec<PlayerRecord> = serde_json::from_str(&text)
                .map_err(|e| RecordError::Decode(path.to_path_buf(), e))?;
            for record in records {
                table.records.insert(record.uuid, record);
            }
        }

        info!("Loaded {} records from {}", table.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    fn flush(&self) -> Result<(), RecordError> {
        let records: Vec<&PlayerRecord> = self.table.ranked();
        let text = serde_json::to_string_pretty(&records).map_err(RecordError::Encode)?;
        fs::write(&self.path, text).map_err(|e| RecordError::FileWrite(self.path.clone(), e))
    }
}

impl RecordSink for JsonFileRecordSink {
    fn save_record(&mut self, record: PlayerRecord) -> Result<(), RecordError> {
        self.table.save_record(record)?;
        self.flush()
    }

    fn top_records(&self, start: u32, max_items: u32) -> Result<Vec<PlayerRecord>, RecordError> {
        self.table.top_records(start, max_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, score: u64, play_time_ms: u64) -> PlayerRecord {
        PlayerRecord {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            score,
            play_time_ms,
        }
    }

    #[test]
    fn test_ranking_order() {
        let mut sink = MemoryRecordSink::new();
        sink.save_record(record("slow", 10, 5000)).unwrap();
        sink.save_record(record("fast", 10, 1000)).unwrap();
        sink.save_record(record("top", 30, 9000)).unwrap();
        sink.save_record(record("alpha", 10, 1000)).unwrap();

        let names: Vec<String> = sink
            .top_records(0, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["top", "alpha", "fast", "slow"]);
    }

    #[test]
    fn test_upsert_by_uuid() {
        let mut sink = MemoryRecordSink::new();
        let mut first = record("Rex", 5, 100);
        sink.save_record(first.clone()).unwrap();
        first.score = 9;
        sink.save_record(first).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.top_records(0, 1).unwrap()[0].score, 9);
    }

    #[test]
    fn test_pagination() {
        let mut sink = MemoryRecordSink::new();
        for i in 0..5 {
            sink.save_record(record(&format!("dog{}", i), i, 0)).unwrap();
        }

        let page = sink.top_records(1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].score, 3);
        assert_eq!(page[1].score, 2);
        assert!(sink.top_records(10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_page_size_limit() {
        assert_eq!(page_size(None).unwrap(), 100);
        assert_eq!(page_size(Some(100)).unwrap(), 100);
        assert!(matches!(page_size(Some(101)), Err(RecordError::LimitExceeded(101, 100))));

        let sink = MemoryRecordSink::new();
        assert!(sink.top_records(0, 101).is_err());
    }

    #[test]
    fn test_json_file_sink_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        {
            let mut sink = JsonFileRecordSink::open(&path).unwrap();
            sink.save_record(record("Rex", 12, 3000)).unwrap();
            sink.save_record(record("Ace", 7, 1000)).unwrap();
        }

        let reopened = JsonFileRecordSink::open(&path).unwrap();
        let records = reopened.top_records(0, 100).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Rex");
        assert_eq!(records[1].play_time_ms, 1000);
    }
}
