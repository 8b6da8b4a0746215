//! Known uploaded documents, keyed by name.
use serde_json::Value;

use crate::chat::models::FileRecord;
use crate::transport::public::FileListPayload;

#[derive(Debug, Default, Clone)]
pub struct FileRegistry(Vec<FileRecord>);

impl FileRegistry {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Replace every record. Later duplicates of a name replace earlier
    /// ones in place.
    pub fn set_all(&mut self, records: Vec<FileRecord>) {
        let mut deduped: Vec<FileRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.iter_mut().find(|r| r.name == record.name) {
                Some(existing) => *existing = record,
                None => deduped.push(record),
            }
        }
        self.0 = deduped;
    }

    /// Replace the set from a raw backend reply. Returns false and leaves
    /// the registry untouched when the reply isn't a recognized shape.
    pub fn upsert_many_from_backend_shape(&mut self, raw: &Value) -> bool {
        match FileListPayload::parse(raw) {
            Some(records) => {
                self.set_all(records);
                true
            }
            None => {
                tracing::warn!("Ignoring unrecognized file list: {}", raw);
                false
            }
        }
    }

    /// Optimistic local removal. The backend is the source of truth so
    /// callers should re-fetch afterwards.
    pub fn remove_by_name(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|r| r.name != name);
        self.0.len() != before
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.0
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
