//! Orchestrates a chat session: submitting questions, streaming answers
//! into the conversation log, managing uploaded documents and loading
//! the initial state from the backend.
//!
//! All state lives behind one lock that is never held across an await.
//! Each send takes a generation number and every commit compares it with
//! the current one, so chunks from a stream superseded by `reset()` or by
//! a newer send are dropped instead of landing in the wrong conversation.
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::conversation::ConversationLog;
use super::files::FileRegistry;
use super::models::{FileRecord, Message};
use super::stream::StreamAccumulator;
use crate::core::{ClientError, SendPolicy};
use crate::transport::{BoxedTransport, UploadFile};

/// The user-triggered action currently in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Streaming,
    Uploading,
    Deleting,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Activity::Streaming => "an answer is streaming",
            Activity::Uploading => "an upload is in progress",
            Activity::Deleting => "a delete is in progress",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    SendFailed,
    UploadFailed,
    DeleteFailed,
    FeedbackFailed,
    Rejected,
}

/// A user-visible failure notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    UserAppended(Message),
    /// Id of the new placeholder
    AssistantOpened(String),
    /// Full accumulated text of the open message
    AssistantUpdated(String),
    /// Final text of the message that was closed
    AssistantClosed(String),
    FilesChanged(Vec<FileRecord>),
    HistoryLoaded(usize),
    Reset,
    Notice(Notice),
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Empty input, nothing happened
    Ignored,
    /// Another action is in progress
    Rejected(String),
    Completed { text: String },
    /// The stream broke. The partial answer stays in the log.
    Failed { partial: String, error: ClientError },
    /// A reset or newer send took over before this stream finished
    Superseded,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub history_loaded: bool,
    pub files_loaded: bool,
}

/// Render-ready copy of the session state.
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub streaming: bool,
    pub files: Vec<FileRecord>,
    pub activity: Option<Activity>,
    pub input: String,
    pub file_input: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    log: ConversationLog,
    files: FileRegistry,
    activity: Option<Activity>,
    generation: u64,
    input: String,
    // Name of the file picked for upload, cleared when the upload ends
    file_input: Option<String>,
    user_acted: bool,
}

/// Leaves the busy state, and resets the file picker when it was set, on
/// every exit path of an upload or delete.
struct ActivityGuard {
    state: Arc<Mutex<SessionState>>,
    activity: Activity,
    clears_file_input: bool,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if state.activity == Some(self.activity) {
                state.activity = None;
            }
            if self.clears_file_input {
                state.file_input = None;
            }
        }
    }
}

#[derive(Clone)]
pub struct SessionController {
    transport: BoxedTransport,
    state: Arc<Mutex<SessionState>>,
    policy: SendPolicy,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionController {
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(SessionState::default())),
            policy: SendPolicy::default(),
            events: None,
        }
    }

    pub fn with_send_policy(mut self, policy: SendPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Publish session events to `tx`. Send errors are ignored so a
    /// dropped receiver never affects the session.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("Unable to lock session state")
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn notify(&self, kind: NoticeKind, message: &str) {
        self.emit(SessionEvent::Notice(Notice::new(kind, message)));
    }

    // Reaching this means the controller broke its own discipline
    fn invariant_violated(err: &ClientError) {
        tracing::error!("{}", err);
        debug_assert!(false, "{}", err);
    }

    /// Load history and the file list concurrently. A failure in one
    /// doesn't affect the other and neither is surfaced to the user.
    pub async fn bootstrap(&self) -> BootstrapReport {
        let (history_loaded, files_loaded) = tokio::join!(self.load_history(), self.load_files());
        tracing::debug!(
            "Bootstrap finished: history={} files={}",
            history_loaded,
            files_loaded
        );
        BootstrapReport {
            history_loaded,
            files_loaded,
        }
    }

    async fn load_history(&self) -> bool {
        let messages = match self.transport.fetch_history().await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to load history: {}", e);
                return false;
            }
        };

        let mut state = self.state();
        // Never clobber a conversation the user already started
        if state.user_acted || state.log.has_open() {
            tracing::debug!("Conversation already started, discarding fetched history");
            return false;
        }
        let count = messages.len();
        if let Err(e) = state.log.replace_all(messages) {
            Self::invariant_violated(&e);
            return false;
        }
        self.emit(SessionEvent::HistoryLoaded(count));
        true
    }

    async fn load_files(&self) -> bool {
        match self.transport.fetch_files().await {
            Ok(Some(records)) => {
                self.apply_files(records);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to load file list: {}", e);
                false
            }
        }
    }

    fn apply_files(&self, records: Vec<FileRecord>) {
        let mut state = self.state();
        state.files.set_all(records);
        self.emit(SessionEvent::FilesChanged(state.files.records().to_vec()));
    }

    /// Re-fetch the file list, falling back to the list returned by the
    /// mutating call when the re-fetch doesn't produce one.
    async fn refresh_files(&self, fallback: Option<Vec<FileRecord>>) {
        let records = match self.transport.fetch_files().await {
            Ok(Some(records)) => Some(records),
            Ok(None) => fallback,
            Err(e) => {
                tracing::warn!("Failed to refresh file list: {}", e);
                fallback
            }
        };
        if let Some(records) = records {
            self.apply_files(records);
        }
    }

    /// Send the contents of the input buffer.
    pub async fn submit(&self) -> SendOutcome {
        let input = self.state().input.clone();
        self.send(&input).await
    }

    /// Ask a question and stream the answer into the log. One commit per
    /// received chunk, each carrying the full text so far.
    pub async fn send(&self, question: &str) -> SendOutcome {
        if question.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let generation = {
            let mut state = self.state();
            match state.activity {
                Some(Activity::Streaming) if self.policy == SendPolicy::ClosePrevious => {
                    tracing::debug!("Closing previous answer for new question");
                    let previous = state.log.open_message().map(|m| m.content.clone());
                    state.log.close_assistant();
                    if let Some(text) = previous {
                        self.emit(SessionEvent::AssistantClosed(text));
                    }
                }
                Some(activity) => {
                    let reason = format!("Can't send while {}", activity);
                    self.notify(NoticeKind::Rejected, &reason);
                    return SendOutcome::Rejected(reason);
                }
                None => {}
            }

            state.generation += 1;
            state.user_acted = true;
            state.input.clear();
            let user_msg = state.log.append_user(question).clone();
            self.emit(SessionEvent::UserAppended(user_msg));

            match state.log.open_assistant_placeholder() {
                Ok(msg) => {
                    let id = msg.id.clone();
                    self.emit(SessionEvent::AssistantOpened(id));
                }
                Err(e) => {
                    Self::invariant_violated(&e);
                    return SendOutcome::Rejected(e.to_string());
                }
            }
            state.activity = Some(Activity::Streaming);
            state.generation
        };

        tracing::debug!("Sending question (generation {})", generation);

        let mut accumulator = StreamAccumulator::new();
        accumulator.start();

        let result = match self.transport.send_chat_stream(question).await {
            Ok(mut stream) => {
                let mut result = Ok(());
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(chunk) => {
                            let Some(text) = accumulator.push(&chunk) else {
                                continue;
                            };
                            let mut state = self.state();
                            if state.generation != generation {
                                tracing::debug!(
                                    "Dropping chunk from superseded stream (generation {})",
                                    generation
                                );
                                return SendOutcome::Superseded;
                            }
                            state.log.update_open_assistant(text);
                            self.emit(SessionEvent::AssistantUpdated(text.to_string()));
                        }
                        Err(e) => {
                            result = Err(e);
                            break;
                        }
                    }
                }
                result
            }
            Err(e) => Err(e),
        };

        let text = match &result {
            Ok(()) => accumulator.finish().to_string(),
            Err(_) => accumulator.fail().to_string(),
        };

        let mut state = self.state();
        if state.generation != generation {
            return SendOutcome::Superseded;
        }
        state.log.close_assistant();
        state.activity = None;
        self.emit(SessionEvent::AssistantClosed(text.clone()));

        match result {
            Ok(()) => {
                tracing::debug!(
                    "Answer complete after {} chunk(s)",
                    accumulator.chunk_count()
                );
                SendOutcome::Completed { text }
            }
            Err(error) => {
                tracing::error!("Answer failed: {}", error);
                self.notify(NoticeKind::SendFailed, &error.to_string());
                SendOutcome::Failed {
                    partial: text,
                    error,
                }
            }
        }
    }

    fn begin(
        &self,
        activity: Activity,
        file_input: Option<&str>,
    ) -> Result<ActivityGuard, ClientError> {
        let mut state = self.state();
        if let Some(current) = state.activity {
            let err = ClientError::Busy(current.to_string());
            self.notify(NoticeKind::Rejected, &err.to_string());
            return Err(err);
        }
        state.activity = Some(activity);
        if let Some(name) = file_input {
            state.file_input = Some(name.to_string());
        }
        Ok(ActivityGuard {
            state: Arc::clone(&self.state),
            activity,
            clears_file_input: file_input.is_some(),
        })
    }

    /// Upload a document and refresh the file list. On failure the list
    /// is left exactly as it was.
    pub async fn upload(&self, file: UploadFile) -> Result<(), ClientError> {
        let _guard = self.begin(Activity::Uploading, Some(&file.name))?;

        match self.transport.upload_file(&file).await {
            Ok(listed) => {
                self.refresh_files(listed).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Upload of {} failed: {}", file.name, e);
                self.notify(NoticeKind::UploadFailed, &e.to_string());
                Err(e)
            }
        }
    }

    /// Delete a document once `confirm` approves it, then refresh the
    /// file list.
    pub async fn delete_file<F>(
        &self,
        name: &str,
        confirm: F,
    ) -> Result<DeleteOutcome, ClientError>
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(name) {
            tracing::debug!("Delete of {} cancelled", name);
            return Ok(DeleteOutcome::Cancelled);
        }
        let _guard = self.begin(Activity::Deleting, None)?;

        match self.transport.delete_file(name).await {
            Ok(listed) => {
                self.state().files.remove_by_name(name);
                self.refresh_files(listed).await;
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                tracing::error!("Delete of {} failed: {}", name, e);
                self.notify(NoticeKind::DeleteFailed, &e.to_string());
                Err(e)
            }
        }
    }

    /// Fire-and-forget rating of an answer. Failures only produce a
    /// notice.
    pub fn send_feedback(&self, msg_id: &str, score: i64) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        let msg_id = msg_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = transport.send_feedback(&msg_id, score).await {
                tracing::warn!("Feedback for {} failed: {}", msg_id, e);
                if let Some(tx) = events {
                    let notice = Notice::new(NoticeKind::FeedbackFailed, &e.to_string());
                    let _ = tx.send(SessionEvent::Notice(notice));
                }
            }
        })
    }

    /// Start a new conversation. Any stream still running is abandoned.
    pub fn reset(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.log.reset();
        if state.activity == Some(Activity::Streaming) {
            state.activity = None;
        }
        self.emit(SessionEvent::Reset);
    }

    pub fn set_input(&self, text: &str) {
        text.clone_into(&mut self.state().input);
    }

    pub fn input(&self) -> String {
        self.state().input.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().log.messages().to_vec()
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.state().files.records().to_vec()
    }

    pub fn activity(&self) -> Option<Activity> {
        self.state().activity
    }

    pub fn is_busy(&self) -> bool {
        self.activity().is_some()
    }

    pub fn file_input(&self) -> Option<String> {
        self.state().file_input.clone()
    }

    /// Id of the `n`th assistant message, counting from 1.
    pub fn assistant_message_id(&self, n: usize) -> Option<String> {
        self.state().log.nth_assistant(n).map(|m| m.id.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            messages: state.log.messages().to_vec(),
            streaming: state.log.has_open(),
            files: state.files.records().to_vec(),
            activity: state.activity,
            input: state.input.clone(),
            file_input: state.file_input.clone(),
        }
    }
}
