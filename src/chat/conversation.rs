//! Ordered message log with at most one open (streaming) message.
use crate::chat::models::{Message, Role};
use crate::core::ClientError;

/// Position in the log is the only ordering key. If a message is open
/// it is always the last one, and only its content ever changes.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    messages: Vec<Message>,
    open: bool,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            open: false,
        }
    }

    pub fn append_user(&mut self, content: &str) -> &Message {
        self.messages.push(Message::user(content));
        &self.messages[self.messages.len() - 1]
    }

    /// Append an empty assistant message and mark it open.
    pub fn open_assistant_placeholder(&mut self) -> Result<&Message, ClientError> {
        if self.open {
            return Err(ClientError::InvariantViolation(
                "An assistant message is already open".to_string(),
            ));
        }
        self.messages.push(Message::assistant(""));
        self.open = true;
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Replace the content of the open message. Returns false when no
    /// message is open.
    pub fn update_open_assistant(&mut self, full_text: &str) -> bool {
        if !self.open {
            tracing::warn!("Ignoring update with no open assistant message");
            return false;
        }
        match self.messages.last_mut() {
            Some(msg) => {
                msg.content.clear();
                msg.content.push_str(full_text);
                true
            }
            None => false,
        }
    }

    /// Returns false when nothing was open.
    pub fn close_assistant(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }

    /// Overwrite the whole log, e.g. with fetched history.
    pub fn replace_all(&mut self, messages: Vec<Message>) -> Result<(), ClientError> {
        if self.open {
            return Err(ClientError::InvariantViolation(
                "Cannot replace the conversation while a message is streaming".to_string(),
            ));
        }
        self.messages = messages;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.open = false;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn open_message(&self) -> Option<&Message> {
        if self.open { self.messages.last() } else { None }
    }

    pub fn has_open(&self) -> bool {
        self.open
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn find(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The `n`th assistant message, counting from 1.
    pub fn nth_assistant(&self, n: usize) -> Option<&Message> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .nth(n.checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}
