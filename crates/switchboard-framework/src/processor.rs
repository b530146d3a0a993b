//! Turning events into responses.
//!
//! [`EventProcessor::process`] is the boundary where every business-logic
//! failure becomes data: unknown commands, handler errors and handler panics
//! all come back as an `error` [`Response`]. Nothing past this point sees a
//! raised failure.
//!
//! ```text
//! "/admin b bob" ─ strip prefix ─▶ ["admin","b","bob"] ─ find ─▶ (ban, ["bob"])
//!                                                              │
//!        Response ◀── ctx.take_response() ◀── A(B(ban_handler))┘
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use switchboard_core::{CancellationToken, Event, Response};
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::context::CommandContext;
use crate::handler::CommandRequest;
use crate::registry::CommandRegistry;

/// The default command prefix.
pub const DEFAULT_PREFIX: &str = "/";

/// Splits `input` into command tokens.
///
/// Returns `None` if `input` does not start with `prefix` or nothing but
/// whitespace follows it.
pub fn parse_command(input: &str, prefix: &str) -> Option<Vec<String>> {
    let body = input.strip_prefix(prefix)?;
    let tokens: Vec<String> = body.split_whitespace().map(String::from).collect();
    (!tokens.is_empty()).then_some(tokens)
}

/// Resolves and runs commands against a shared registry.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    registry: Arc<CommandRegistry>,
    prefix: String,
}

impl EventProcessor {
    /// Creates a processor using `prefix` to recognise commands.
    pub fn new(registry: Arc<CommandRegistry>, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Processes one event.
    ///
    /// - no prefixed text: `not_handled`
    /// - unknown command: `error` with [`Response::COMMAND_NOT_FOUND`]
    /// - group command: `text` with its help, after the group's middlewares
    /// - handler failure or panic: `error` with the failure message
    /// - otherwise: whatever the handler left in the context
    pub async fn process(&self, cancel: &CancellationToken, event: Arc<Event>) -> Response {
        let Some(args) = event
            .text()
            .and_then(|text| parse_command(text, &self.prefix))
        else {
            return Response::not_handled();
        };

        let Some((command, rest)) = self.registry.find(&args) else {
            info!(tokens = ?args, "Command not found");
            return Response::command_not_found();
        };

        let Some(handler) = command.handler() else {
            debug!(command = %command.full_path(), "Command has no handler, replying with help");
            return Response::text(command.help_text());
        };

        debug!(command = %command.full_path(), args = ?rest, "Invoking command");
        let ctx = Arc::new(CommandContext::new(
            cancel.clone(),
            Arc::clone(&event),
            Arc::clone(&command),
        ));
        let request = CommandRequest::new(Arc::clone(&ctx), rest.to_vec());

        match AssertUnwindSafe(handler.oneshot(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => ctx.take_response(),
            Ok(Err(err)) => {
                debug!(command = %command.full_path(), error = %err, "Command failed");
                Response::error(err.to_string())
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                warn!(command = %command.full_path(), panic = %message, "Command handler panicked");
                Response::error(message)
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::handler::{BoxError, Middleware, Next};
    use parking_lot::Mutex;
    use switchboard_core::ResponseType;

    async fn echo(ctx: Arc<CommandContext>, args: Vec<String>) -> Result<(), BoxError> {
        ctx.reply_text(args.join(" "));
        Ok(())
    }

    async fn fail(_ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
        Err("database unavailable".into())
    }

    async fn explode(_ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
        panic!("boom");
    }

    fn processor() -> EventProcessor {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(Command::builder("echo").handler_fn(echo), &[]);
        registry.register(Command::builder("fail").handler_fn(fail), &[]);
        registry.register(Command::builder("explode").handler_fn(explode), &[]);
        registry.register(
            Command::builder("admin")
                .description("Administration")
                .subcommand(Command::builder("ban").alias("b").handler_fn(echo)),
            &[],
        );
        EventProcessor::new(registry, DEFAULT_PREFIX)
    }

    async fn run(processor: &EventProcessor, text: &str) -> Response {
        let event = Arc::new(Event::message("test").with_text(text));
        processor.process(&CancellationToken::new(), event).await
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/admin  ban\tbob ", "/"),
            Some(vec!["admin".into(), "ban".into(), "bob".into()])
        );
        assert_eq!(parse_command("hello", "/"), None);
        assert_eq!(parse_command("/", "/"), None);
        assert_eq!(parse_command("/   ", "/"), None);
        assert_eq!(parse_command("!ping", "!"), Some(vec!["ping".into()]));
    }

    #[tokio::test]
    async fn test_plain_text_is_not_handled() {
        let response = run(&processor(), "hello").await;
        assert_eq!(response.response_type, ResponseType::NotHandled);

        let response = run(&processor(), "/").await;
        assert_eq!(response.response_type, ResponseType::NotHandled);

        let event = Arc::new(Event::message("test"));
        let response = processor().process(&CancellationToken::new(), event).await;
        assert_eq!(response.response_type, ResponseType::NotHandled);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let response = run(&processor(), "/help").await;
        assert_eq!(response, Response::command_not_found());
        assert_eq!(response.as_text(), Some("command not found"));
    }

    #[tokio::test]
    async fn test_handler_response_is_returned() {
        let response = run(&processor(), "/admin b userX").await;
        assert_eq!(response.response_type, ResponseType::Text);
        assert_eq!(response.as_text(), Some("userX"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_response() {
        let response = run(&processor(), "/fail").await;
        assert_eq!(response.response_type, ResponseType::Error);
        assert_eq!(response.as_text(), Some("database unavailable"));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_response() {
        let processor = processor();
        let response = run(&processor, "/explode").await;
        assert_eq!(response.response_type, ResponseType::Error);
        assert_eq!(response.as_text(), Some("boom"));

        let response = run(&processor, "/echo still alive").await;
        assert_eq!(response.as_text(), Some("still alive"));
    }

    #[tokio::test]
    async fn test_group_command_replies_with_help() {
        let response = run(&processor(), "/admin").await;
        assert_eq!(response.response_type, ResponseType::Text);
        let help = response.as_text().unwrap();
        assert!(help.starts_with("Command: admin"));
        assert!(help.contains("  ban"));
    }

    #[tokio::test]
    async fn test_short_circuit_leaves_empty_response() {
        let registry = Arc::new(CommandRegistry::new());
        let calls = Arc::new(Mutex::new(0));
        let guard = Middleware::from_fn(|_req: CommandRequest, _next: Next| async {
            Ok::<(), BoxError>(())
        });
        let counter = calls.clone();
        registry.register(
            Command::builder("secret").handler_fn(move |_ctx, _args| {
                let counter = counter.clone();
                async move {
                    *counter.lock() += 1;
                    Ok::<(), BoxError>(())
                }
            }),
            &[guard],
        );

        let processor = EventProcessor::new(registry, "/");
        let response = run(&processor, "/secret").await;

        assert_eq!(response.response_type, ResponseType::Empty);
        assert!(!response.is_deliverable());
        assert_eq!(*calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_guard_covers_group_help() {
        let registry = Arc::new(CommandRegistry::new());
        let deny = Middleware::from_fn(|req: CommandRequest, _next: Next| async move {
            req.ctx.reply_error("permission denied");
            Ok::<(), BoxError>(())
        });
        registry.register(
            Command::builder("admin").subcommand(Command::builder("ban").handler_fn(echo)),
            &[deny],
        );
        let processor = EventProcessor::new(registry, "/");

        assert_eq!(
            run(&processor, "/admin ban x").await,
            Response::error("permission denied")
        );
        assert_eq!(
            run(&processor, "/admin").await,
            Response::error("permission denied")
        );
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(Command::builder("echo").handler_fn(echo), &[]);
        let processor = EventProcessor::new(registry, "!");

        assert_eq!(run(&processor, "!echo hi").await.as_text(), Some("hi"));
        assert_eq!(
            run(&processor, "/echo hi").await.response_type,
            ResponseType::NotHandled
        );
    }
}
