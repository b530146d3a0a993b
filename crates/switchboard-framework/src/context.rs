//! Per-invocation execution context.
//!
//! One [`CommandContext`] is created for every resolved command invocation and
//! handed through the middleware chain to the handler. It carries:
//!
//! - the cancellation signal of the engine run
//! - the triggering [`Event`] and its [`Session`], if any
//! - the resolved [`Command`]
//! - the **response slot**: the single [`Response`] the processor returns
//!   once the chain completes
//!
//! Handlers and middlewares communicate results only through the response
//! slot; the service's own return value carries failures.

use std::sync::Arc;

use parking_lot::Mutex;
use switchboard_core::{CancellationToken, Event, Response, Session};

use crate::command::Command;

/// Execution context for one command invocation.
pub struct CommandContext {
    cancel: CancellationToken,
    event: Arc<Event>,
    session: Option<Arc<Session>>,
    command: Arc<Command>,
    response: Mutex<Response>,
}

impl CommandContext {
    /// Creates a context with an empty response slot.
    pub fn new(cancel: CancellationToken, event: Arc<Event>, command: Arc<Command>) -> Self {
        let session = event.session.clone();
        Self {
            cancel,
            event,
            session,
            command,
            response: Mutex::new(Response::default()),
        }
    }

    /// The cancellation token of the running engine.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once the engine is shutting down.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The event that triggered this invocation.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The session attached to the event, if any.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// The resolved command.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Replaces the response.
    pub fn set_response(&self, response: Response) {
        *self.response.lock() = response;
    }

    /// Sets a text response.
    pub fn reply_text(&self, text: impl Into<String>) {
        self.set_response(Response::text(text));
    }

    /// Sets an error response.
    pub fn reply_error(&self, message: impl Into<String>) {
        self.set_response(Response::error(message));
    }

    /// Mutates the response in place.
    pub fn update_response<R>(&self, f: impl FnOnce(&mut Response) -> R) -> R {
        f(&mut self.response.lock())
    }

    /// Returns a copy of the current response.
    pub fn response(&self) -> Response {
        self.response.lock().clone()
    }

    /// Moves the response out, leaving an empty one behind.
    pub fn take_response(&self) -> Response {
        std::mem::take(&mut *self.response.lock())
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command.full_path())
            .field("event", &self.event)
            .field("response", &*self.response.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::ResponseType;

    fn context(event: Event) -> CommandContext {
        CommandContext::new(
            CancellationToken::new(),
            Arc::new(event),
            Command::builder("ping").build(),
        )
    }

    #[test]
    fn test_response_slot() {
        let ctx = context(Event::message("test"));
        assert_eq!(ctx.response().response_type, ResponseType::Empty);

        ctx.reply_text("pong");
        assert_eq!(ctx.response().as_text(), Some("pong"));

        ctx.update_response(|r| r.metadata.insert("k".into(), "v".into()));
        let taken = ctx.take_response();
        assert_eq!(taken.metadata.get("k").map(String::as_str), Some("v"));
        assert_eq!(ctx.response().response_type, ResponseType::Empty);
    }

    #[test]
    fn test_session_comes_from_event() {
        let session = Arc::new(Session::new("test:alice"));
        let ctx = context(Event::message("test").with_session(session.clone()));
        assert!(Arc::ptr_eq(ctx.session().unwrap(), &session));

        let ctx = context(Event::message("test"));
        assert!(ctx.session().is_none());
    }

    #[test]
    fn test_cancellation_is_visible() {
        let token = CancellationToken::new();
        let ctx = CommandContext::new(
            token.clone(),
            Arc::new(Event::message("test")),
            Command::builder("ping").build(),
        );
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
