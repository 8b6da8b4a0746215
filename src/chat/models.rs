//! The core models for a document-augmented chat session.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    // The backend stores answers under the legacy "ai" role
    #[serde(rename = "assistant", alias = "ai")]
    Assistant,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    // History replies carry no id so one is generated locally for
    // feedback correlation
    #[serde(default = "new_message_id", skip_serializing)]
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            id: new_message_id(),
            role,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Accepts `"1.2 MB"`, `1234` or a missing/null size.
fn size_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "size_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<String>,
}

impl FileRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: None,
        }
    }

    pub fn with_size(name: &str, size: &str) -> Self {
        Self {
            name: name.to_string(),
            size: Some(size.to_string()),
        }
    }
}
