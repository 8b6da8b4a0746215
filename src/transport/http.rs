use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::public::{ChatRequest, FeedbackRequest, FileListPayload, HistoryPayload};
use super::{ChunkStream, Transport, UploadFile, Utf8ChunkDecoder};
use crate::chat::models::{FileRecord, Message};
use crate::core::{ClientConfig, ClientError};

/// `Transport` backed by the backend's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches("/"),
            path.trim_start_matches("/")
        )
    }

    /// Read a response body as JSON. A body that isn't JSON is `None`,
    /// a body that can't be read is a network error.
    async fn json_body(response: reqwest::Response) -> Result<Option<Value>, ClientError> {
        let body = response.text().await?;
        Ok(serde_json::from_str::<Value>(&body)
            .inspect_err(|e| tracing::warn!("Response is not JSON: {}", e))
            .ok())
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>, ClientError> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.config.request_timeout)
            .send()
            .await?
            .error_for_status()?;
        Self::json_body(response).await
    }

    /// Turn a non-success status into an error carrying the body.
    async fn check_status(
        response: reqwest::Response,
        to_err: fn(String) -> ClientError,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(to_err(format!("{} {}", status, body.trim())))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_history(&self) -> Result<Vec<Message>, ClientError> {
        let raw = self.get_json("/history").await?;
        match raw.as_ref().and_then(HistoryPayload::parse) {
            Some(messages) => Ok(messages),
            None => {
                let err = ClientError::Format(format!("history {:?}", raw));
                tracing::warn!("{}, treating as empty", err);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_files(&self) -> Result<Option<Vec<FileRecord>>, ClientError> {
        let raw = self.get_json("/upload/list").await?;
        let records = raw.as_ref().and_then(FileListPayload::parse);
        if records.is_none() {
            tracing::warn!("{}", ClientError::Format(format!("file list {:?}", raw)));
        }
        Ok(records)
    }

    async fn send_chat_stream(&self, question: &str) -> Result<ChunkStream, ClientError> {
        let response = self
            .client
            .post(self.url("/chat"))
            .timeout(self.config.stream_timeout)
            .json(&ChatRequest { question })
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("Chat stream opened: {}", response.status());

        let mut bytes = response.bytes_stream();
        let stream: ChunkStream = Box::pin(async_stream::try_stream! {
            let mut decoder = Utf8ChunkDecoder::new();
            while let Some(chunk) = bytes.next().await {
                let text = decoder.decode(&chunk?);
                // A chunk can end mid-character and decode to nothing
                if !text.is_empty() {
                    yield text;
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield tail;
            }
        });

        Ok(stream)
    }

    async fn upload_file(
        &self,
        file: &UploadFile,
    ) -> Result<Option<Vec<FileRecord>>, ClientError> {
        file.validate(self.config.max_upload_bytes)?;

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("application/pdf")
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response, ClientError::Upload).await?;

        tracing::info!("Uploaded {} ({} bytes)", file.name, file.bytes.len());

        let raw = Self::json_body(response).await?;
        Ok(raw.as_ref().and_then(FileListPayload::parse))
    }

    async fn delete_file(&self, name: &str) -> Result<Option<Vec<FileRecord>>, ClientError> {
        let path = format!("/upload/{}", urlencoding::encode(name));
        let response = self
            .client
            .delete(self.url(&path))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = Self::check_status(response, ClientError::Delete).await?;

        tracing::info!("Deleted {}", name);

        let raw = Self::json_body(response).await?;
        Ok(raw.as_ref().and_then(FileListPayload::parse))
    }

    async fn send_feedback(&self, msg_id: &str, score: i64) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/feedback"))
            .timeout(self.config.request_timeout)
            .json(&FeedbackRequest { msg_id, score })
            .send()
            .await?;
        Self::check_status(response, ClientError::Feedback).await?;
        Ok(())
    }
}
