//! Handlers and middleware for the Switchboard framework.
//!
//! - **Service** ([`service`]) – [`CommandRequest`], the type-erased
//!   [`CommandHandler`] and [`handler_fn`] for turning an async function into one
//! - **Middleware** ([`middleware`]) – [`Middleware`] transforms composed once
//!   at registration time
//!
//! # Architecture
//!
//! Every handler is a `tower::Service<CommandRequest>`. Middleware is a tower
//! layer stacked on top of it, so any existing tower layer speaking
//! [`CommandRequest`] can be reused through [`Middleware::from_layer`].
//!
//! ```text
//! registry.register(cmd, &[A, B])
//!     └─ handler = A(B(H))   ← composed once, invoked per event
//! ```

pub mod middleware;
pub mod service;

pub use middleware::{Middleware, Next, compose, middleware_fn};
pub use service::{CommandHandler, CommandRequest, HandlerService, handler_fn};

pub use tower::{BoxError, Layer};
