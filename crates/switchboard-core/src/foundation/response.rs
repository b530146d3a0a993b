//! Outbound responses.
//!
//! A [`Response`] is produced once per processed event and is immutable from
//! then on. The response dispatcher clones it into every per-adapter delivery,
//! so adapters never observe each other's copies.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a [`Response`].
///
/// Serializes as its wire name, so custom types stay plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseType {
    /// Nothing was produced. Never delivered.
    #[default]
    Empty,
    /// Plain text reply.
    Text,
    /// A failure surfaced to the user (unknown command, handler error).
    Error,
    /// The event was not a command. Never delivered.
    NotHandled,
    /// Adapter-specific response type (e.g. `"image"`).
    Custom(String),
}

impl ResponseType {
    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text => "text",
            Self::Error => "error",
            Self::NotHandled => "not_handled",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ResponseType {
    fn from(s: &str) -> Self {
        match s {
            "" => Self::Empty,
            "text" => Self::Text,
            "error" => Self::Error,
            "not_handled" => Self::NotHandled,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ResponseType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "text" | "error" | "not_handled" => Self::from(s.as_str()),
            _ => Self::Custom(s),
        }
    }
}

impl From<ResponseType> for String {
    fn from(kind: ResponseType) -> Self {
        match kind {
            ResponseType::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// A unified response, fanned out to every registered adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// What kind of response this is.
    pub response_type: ResponseType,
    /// Platform-neutral payload; usually a string.
    pub data: Value,
    /// Free-form metadata for adapters.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Response {
    /// Message carried by the error response for unresolvable commands.
    pub const COMMAND_NOT_FOUND: &'static str = "command not found";

    /// Creates a response of the given type and payload.
    pub fn new(response_type: ResponseType, data: impl Into<Value>) -> Self {
        Self {
            response_type,
            data: data.into(),
            metadata: HashMap::new(),
        }
    }

    /// Creates a `text` response.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResponseType::Text, Value::String(text.into()))
    }

    /// Creates an `error` response carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResponseType::Error, Value::String(message.into()))
    }

    /// Creates the `error` response for an unknown command.
    pub fn command_not_found() -> Self {
        Self::error(Self::COMMAND_NOT_FOUND)
    }

    /// Creates a `not_handled` response with no payload.
    pub fn not_handled() -> Self {
        Self::new(ResponseType::NotHandled, Value::Null)
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the payload as text, if it is a string.
    pub fn as_text(&self) -> Option<&str> {
        self.data.as_str()
    }

    /// Returns `true` if this response should be sent to adapters.
    ///
    /// Empty and `not_handled` responses are dropped by the engine.
    pub fn is_deliverable(&self) -> bool {
        !matches!(
            self.response_type,
            ResponseType::Empty | ResponseType::NotHandled
        )
    }
}
