//! Wire types for the backend API
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::models::{FileRecord, Message};

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub question: &'a str,
}

#[derive(Serialize)]
pub struct FeedbackRequest<'a> {
    pub msg_id: &'a str,
    pub score: i64,
}

// The backend has answered with both a bare list and a wrapped object
// over time so accept either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HistoryPayload {
    Bare(Vec<Message>),
    Wrapped { history: Vec<Message> },
}

impl HistoryPayload {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            HistoryPayload::Bare(messages) => messages,
            HistoryPayload::Wrapped { history } => history,
        }
    }

    /// Normalize a raw reply. Any other shape is `None`.
    pub fn parse(raw: &Value) -> Option<Vec<Message>> {
        HistoryPayload::deserialize(raw)
            .inspect_err(|e| tracing::debug!("History payload not recognized: {}", e))
            .ok()
            .map(HistoryPayload::into_messages)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FileListPayload {
    Bare(Vec<FileRecord>),
    Files { files: Vec<FileRecord> },
    History { history: Vec<FileRecord> },
}

impl FileListPayload {
    pub fn into_records(self) -> Vec<FileRecord> {
        match self {
            FileListPayload::Bare(records) => records,
            FileListPayload::Files { files } => files,
            FileListPayload::History { history } => history,
        }
    }

    /// Normalize a raw reply. Any other shape is `None`.
    pub fn parse(raw: &Value) -> Option<Vec<FileRecord>> {
        FileListPayload::deserialize(raw)
            .inspect_err(|e| tracing::debug!("File list payload not recognized: {}", e))
            .ok()
            .map(FileListPayload::into_records)
    }
}
