//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use ragchat::chat::{FileRecord, Message, SessionController, SessionEvent};
use ragchat::core::ClientError;
use ragchat::transport::{BoxedTransport, ChunkStream, Transport, UploadFile};

/// In-memory backend with canned replies. Every call is recorded in
/// `calls()` so tests can assert which requests were issued.
pub struct ScriptedTransport {
    history: Mutex<Result<Vec<Message>, ClientError>>,
    files: Mutex<Result<Option<Vec<FileRecord>>, ClientError>>,
    upload: Mutex<Result<Option<Vec<FileRecord>>, ClientError>>,
    delete: Mutex<Result<Option<Vec<FileRecord>>, ClientError>>,
    feedback: Mutex<Result<(), ClientError>>,
    streams: Mutex<VecDeque<Result<ChunkStream, ClientError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            history: Mutex::new(Ok(vec![])),
            files: Mutex::new(Ok(Some(vec![]))),
            upload: Mutex::new(Ok(None)),
            delete: Mutex::new(Ok(None)),
            feedback: Mutex::new(Ok(())),
            streams: Mutex::new(VecDeque::new()),
            calls: Mutex::new(vec![]),
        })
    }

    pub fn set_history(&self, reply: Result<Vec<Message>, ClientError>) {
        *self.history.lock().unwrap() = reply;
    }

    pub fn set_files(&self, reply: Result<Option<Vec<FileRecord>>, ClientError>) {
        *self.files.lock().unwrap() = reply;
    }

    pub fn set_upload(&self, reply: Result<Option<Vec<FileRecord>>, ClientError>) {
        *self.upload.lock().unwrap() = reply;
    }

    pub fn set_delete(&self, reply: Result<Option<Vec<FileRecord>>, ClientError>) {
        *self.delete.lock().unwrap() = reply;
    }

    pub fn set_feedback(&self, reply: Result<(), ClientError>) {
        *self.feedback.lock().unwrap() = reply;
    }

    /// Queue an answer that streams `chunks` and ends normally.
    pub fn push_chunks(&self, chunks: &[&str]) {
        let items: Vec<Result<String, ClientError>> =
            chunks.iter().map(|c| Ok(c.to_string())).collect();
        self.push_stream(Box::pin(stream::iter(items)));
    }

    /// Queue an answer that streams `chunks` and then breaks with `error`.
    pub fn push_failing(&self, chunks: &[&str], error: ClientError) {
        let mut items: Vec<Result<String, ClientError>> =
            chunks.iter().map(|c| Ok(c.to_string())).collect();
        items.push(Err(error));
        self.push_stream(Box::pin(stream::iter(items)));
    }

    /// Queue an answer fed by the returned sender. The stream ends when
    /// the sender is dropped.
    pub fn push_channel(&self) -> mpsc::UnboundedSender<Result<String, ClientError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push_stream(Box::pin(UnboundedReceiverStream::new(rx)));
        tx
    }

    /// Queue a chat request that fails before any chunk arrives.
    pub fn push_request_error(&self, error: ClientError) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    fn push_stream(&self, stream: ChunkStream) {
        self.streams.lock().unwrap().push_back(Ok(stream));
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch_history(&self) -> Result<Vec<Message>, ClientError> {
        self.record("history".to_string());
        self.history.lock().unwrap().clone()
    }

    async fn fetch_files(&self) -> Result<Option<Vec<FileRecord>>, ClientError> {
        self.record("files".to_string());
        self.files.lock().unwrap().clone()
    }

    async fn send_chat_stream(&self, question: &str) -> Result<ChunkStream, ClientError> {
        self.record(format!("chat:{}", question));
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("No scripted answer".to_string())))
    }

    async fn upload_file(
        &self,
        file: &UploadFile,
    ) -> Result<Option<Vec<FileRecord>>, ClientError> {
        self.record(format!("upload:{}", file.name));
        self.upload.lock().unwrap().clone()
    }

    async fn delete_file(&self, name: &str) -> Result<Option<Vec<FileRecord>>, ClientError> {
        self.record(format!("delete:{}", name));
        self.delete.lock().unwrap().clone()
    }

    async fn send_feedback(&self, msg_id: &str, score: i64) -> Result<(), ClientError> {
        self.record(format!("feedback:{}:{}", msg_id, score));
        self.feedback.lock().unwrap().clone()
    }
}

/// Creates a controller wired to `transport` along with its event
/// receiver.
pub fn test_session(
    transport: &Arc<ScriptedTransport>,
) -> (SessionController, mpsc::UnboundedReceiver<SessionEvent>) {
    let boxed: BoxedTransport = transport.clone();
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionController::new(boxed).with_events(tx), rx)
}

/// Waits for the first event matching `pred`, skipping the others.
pub async fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<SessionEvent>, pred: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("Event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Timed out waiting for event")
}

/// Collects every event already sent.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, b"%PDF-1.4".to_vec())
}
