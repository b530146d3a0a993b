//! Core handler service for the Switchboard framework.
//!
//! [`HandlerService<F>`] is the fundamental building block: it wraps a single
//! async function and implements `tower::Service<CommandRequest>`. Middleware
//! is expressed as ordinary tower layers stacked *on top* (see
//! [`Middleware`](super::Middleware)).

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service};

use crate::context::CommandContext;

// ============================================================================
// CommandRequest
// ============================================================================

/// The request flowing through a handler's middleware stack.
///
/// Handlers report results by mutating [`CommandContext`]'s response, not
/// through the service's return value.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Execution context for this invocation.
    pub ctx: Arc<CommandContext>,
    /// Tokens left over after command resolution.
    pub args: Vec<String>,
}

impl CommandRequest {
    /// Creates a new request.
    pub fn new(ctx: Arc<CommandContext>, args: Vec<String>) -> Self {
        Self { ctx, args }
    }
}

/// A type-erased, middleware-wrapped command handler.
pub type CommandHandler = BoxCloneSyncService<CommandRequest, (), BoxError>;

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls an async handler function.
///
/// # Example
///
/// ```rust,ignore
/// async fn ping(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
///     ctx.reply_text("pong");
///     Ok(())
/// }
///
/// let handler: CommandHandler = handler_fn(ping);
/// ```
#[derive(Clone)]
pub struct HandlerService<F> {
    handler: F,
}

impl<F> HandlerService<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut> Service<CommandRequest> for HandlerService<F>
where
    F: Fn(Arc<CommandContext>, Vec<String>) -> Fut,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CommandRequest) -> Self::Future {
        (self.handler)(req.ctx, req.args).boxed()
    }
}

/// Builds a [`CommandHandler`] from an async function.
pub fn handler_fn<F, Fut>(handler: F) -> CommandHandler
where
    F: Fn(Arc<CommandContext>, Vec<String>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}
