//! Middleware: handler-to-handler transforms applied at registration time.
//!
//! A [`Middleware`] wraps a [`CommandHandler`] in another one. The registry
//! composes the whole stack once, when a command is registered, so invoking a
//! command costs nothing extra per call.
//!
//! Given `[A, B]` and handler `H`, the composed handler is `A(B(H))`: `A` runs
//! first and may return without calling [`Next::run`], in which case neither
//! `B` nor `H` runs.
//!
//! ```rust,ignore
//! let audit = Middleware::from_fn(|req: CommandRequest, next: Next| async move {
//!     info!(command = %req.ctx.command().full_path(), "invoked");
//!     next.run(req).await
//! });
//!
//! let admin_only = Middleware::from_fn(|req: CommandRequest, next: Next| async move {
//!     if req.ctx.event().data.get("role").and_then(|v| v.as_str()) != Some("admin") {
//!         req.ctx.reply_error("permission denied");
//!         return Ok(());
//!     }
//!     next.run(req).await
//! });
//!
//! registry.register(admin_command, &[audit, admin_only]);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};
use tower_layer::{Layer, layer_fn};

use super::service::{CommandHandler, CommandRequest};

type WrapFn = dyn Fn(CommandHandler) -> CommandHandler + Send + Sync;

/// A type-erased handler transform.
///
/// Cheap to clone; the same middleware list can be shared by many plugins.
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<WrapFn>,
}

impl Middleware {
    /// Wraps any tower [`Layer`] whose service speaks [`CommandRequest`].
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<CommandHandler> + Send + Sync + 'static,
        L::Service: Service<CommandRequest, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<CommandRequest>>::Future: Send + 'static,
    {
        Self {
            wrap: Arc::new(move |inner: CommandHandler| {
                BoxCloneSyncService::new(layer.layer(inner))
            }),
        }
    }

    /// Builds a middleware from an async closure receiving the request and
    /// the rest of the chain.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandRequest, Next) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::from_layer(layer_fn(move |inner: CommandHandler| FnService {
            f: f.clone(),
            inner,
        }))
    }

    /// Wraps `handler` in this middleware.
    pub fn apply(&self, handler: CommandHandler) -> CommandHandler {
        (self.wrap)(handler)
    }
}

impl Layer<CommandHandler> for Middleware {
    type Service = CommandHandler;

    fn layer(&self, inner: CommandHandler) -> CommandHandler {
        self.apply(inner)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Shorthand for [`Middleware::from_fn`].
pub fn middleware_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(CommandRequest, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Middleware::from_fn(f)
}

/// Composes `middlewares` around `handler`; the first one ends up outermost.
pub fn compose(handler: CommandHandler, middlewares: &[Middleware]) -> CommandHandler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |inner, middleware| middleware.apply(inner))
}

// ============================================================================
// Next
// ============================================================================

/// The remainder of the middleware chain, handed to [`Middleware::from_fn`]
/// closures.
pub struct Next {
    inner: CommandHandler,
}

impl Next {
    /// Runs the inner middlewares and the handler.
    pub async fn run(self, req: CommandRequest) -> Result<(), BoxError> {
        self.inner.oneshot(req).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct FnService<F> {
    f: F,
    inner: CommandHandler,
}

impl<F, Fut> Service<CommandRequest> for FnService<F>
where
    F: Fn(CommandRequest, Next) -> Fut,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CommandRequest) -> Self::Future {
        let next = Next {
            inner: self.inner.clone(),
        };
        (self.f)(req, next).boxed()
    }
}
