//! Client side of the backend contract.
//!
//! `Transport` is the seam between the session controller and the
//! network. `HttpTransport` talks to the real backend; tests substitute
//! an in-memory implementation.
use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::chat::models::{FileRecord, Message};
use crate::core::ClientError;

pub mod decode;
pub mod http;
pub mod public;

pub use decode::Utf8ChunkDecoder;
pub use http::HttpTransport;

/// Text chunks of one answer, in arrival order. Ends normally when the
/// backend closes the response, or with `Err` if the connection fails
/// mid-stream. Not restartable.
pub type ChunkStream = BoxStream<'static, Result<String, ClientError>>;

pub type BoxedTransport = std::sync::Arc<dyn Transport + 'static>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Recent conversation, oldest first. An unrecognized payload is an
    /// empty history rather than an error.
    async fn fetch_history(&self) -> Result<Vec<Message>, ClientError>;

    /// `None` when the payload matched none of the accepted list shapes.
    async fn fetch_files(&self) -> Result<Option<Vec<FileRecord>>, ClientError>;

    async fn send_chat_stream(&self, question: &str) -> Result<ChunkStream, ClientError>;

    /// Returns the updated list when the reply carries one.
    async fn upload_file(&self, file: &UploadFile)
    -> Result<Option<Vec<FileRecord>>, ClientError>;

    /// Returns the updated list when the reply carries one.
    async fn delete_file(&self, name: &str) -> Result<Option<Vec<FileRecord>>, ClientError>;

    async fn send_feedback(&self, msg_id: &str, score: i64) -> Result<(), ClientError>;
}

/// A document selected for upload.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Upload(format!("Invalid file path: {}", path.display())))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Upload(format!("Unable to read {}: {}", path.display(), e)))?;
        Ok(Self::new(name, bytes))
    }

    /// Only non-empty PDFs within the size limit are accepted.
    pub fn validate(&self, max_bytes: u64) -> Result<(), ClientError> {
        if !self.name.to_lowercase().ends_with(".pdf") {
            return Err(ClientError::Upload(format!(
                "Only PDF files are supported: {}",
                self.name
            )));
        }
        if self.bytes.is_empty() {
            return Err(ClientError::Upload(format!("File is empty: {}", self.name)));
        }
        if self.bytes.len() as u64 > max_bytes {
            return Err(ClientError::Upload(format!(
                "File {} is {} bytes, the limit is {}",
                self.name,
                self.bytes.len(),
                max_bytes
            )));
        }
        Ok(())
    }
}
