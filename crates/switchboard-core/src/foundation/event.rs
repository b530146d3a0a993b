//! Normalized inbound events.
//!
//! An [`Event`] is what every adapter produces, whatever the platform it
//! speaks. The core only ever looks at one field of the payload: the free-text
//! field under [`Event::TEXT_KEY`], which carries the candidate command line.
//! Everything else in [`Event::data`] is opaque and handed to command handlers
//! untouched.
//!
//! Events are recycled through a [`Pool`](crate::Pool); see [`Reusable`] for
//! the reset contract.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::foundation::pool::Reusable;
use crate::foundation::session::Session;

/// A normalized event produced by an adapter.
///
/// # Example
///
/// ```rust
/// use switchboard_core::Event;
///
/// let event = Event::message("console").with_text("/ping");
/// assert_eq!(event.text(), Some("/ping"));
/// assert_eq!(event.platform, "console");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Event type, e.g. [`Event::MESSAGE`] or [`Event::NOTICE`].
    pub event_type: String,
    /// Source platform, e.g. `"console"` or `"slack"`.
    pub platform: String,
    /// Raw payload. Opaque to the core except for [`Event::TEXT_KEY`].
    pub data: HashMap<String, Value>,
    /// Conversation state shared with other events of the same context.
    pub session: Option<Arc<Session>>,
}

impl Event {
    /// Event type for chat messages.
    pub const MESSAGE: &'static str = "message";
    /// Event type for platform notices.
    pub const NOTICE: &'static str = "notice";

    /// Payload key holding the free-text command candidate.
    pub const TEXT_KEY: &'static str = "text";
    /// Payload key an adapter may set to group events into one session.
    pub const SESSION_KEY: &'static str = "session_id";

    /// Creates an event of the given type and platform with an empty payload.
    pub fn new(event_type: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            platform: platform.into(),
            data: HashMap::new(),
            session: None,
        }
    }

    /// Creates a [`Event::MESSAGE`] event for `platform`.
    pub fn message(platform: impl Into<String>) -> Self {
        Self::new(Self::MESSAGE, platform)
    }

    /// Sets the free-text field.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Inserts an arbitrary payload entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attaches a session.
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the free-text field in place.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.data
            .insert(Self::TEXT_KEY.to_string(), Value::String(text.into()));
    }

    /// Returns the free-text field, if present and a string.
    pub fn text(&self) -> Option<&str> {
        self.data.get(Self::TEXT_KEY).and_then(Value::as_str)
    }

    /// Returns the adapter-provided session identifier, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.data.get(Self::SESSION_KEY).and_then(Value::as_str)
    }
}

impl Reusable for Event {
    /// Clears every field. The payload map keeps its allocation.
    fn reset(&mut self) {
        self.event_type.clear();
        self.platform.clear();
        self.data.clear();
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_requires_string_value() {
        let event = Event::message("test").with_data(Event::TEXT_KEY, 42);
        assert_eq!(event.text(), None);

        let event = Event::message("test").with_text("/help");
        assert_eq!(event.text(), Some("/help"));
    }

    #[test]
    fn test_reset_clears_all_fields() {
        let mut event = Event::message("test")
            .with_text("/ban bob")
            .with_data("user", "alice")
            .with_session(Arc::new(Session::new("s-1")));

        event.reset();

        assert!(event.event_type.is_empty());
        assert!(event.platform.is_empty());
        assert!(event.data.is_empty());
        assert!(event.session.is_none());
    }

    #[test]
    fn test_session_id() {
        let event = Event::message("test").with_data(Event::SESSION_KEY, "room-7");
        assert_eq!(event.session_id(), Some("room-7"));
        assert_eq!(Event::message("test").session_id(), None);
    }
}
