//! # Switchboard Core
//!
//! The data model and adapter contract of the Switchboard event-routing engine.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Events**: normalized inbound events ([`Event`])
//! - **Responses**: typed outbound results ([`Response`], [`ResponseType`])
//! - **Sessions**: concurrency-safe conversation state ([`Session`])
//! - **Pools**: reset-on-release free lists ([`Pool`], [`Reusable`])
//!
//! ### Integration Layer
//!
//! - **Adapters**: platform bridges ([`Adapter`])
//! - **Event queue**: the producer end handed to adapters ([`EventSender`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌────────┐     ┌───────────────┐
//! │  Adapter  │────▶│ event queue │────▶│ Engine │────▶│ worker pool   │
//! └───────────┘     └─────────────┘     └────────┘     └───────┬───────┘
//!       ▲                                                      │
//!       └──────────── fan-out ◀──── response queue ◀───────────┘
//! ```

// Architectural layers
pub mod foundation;
pub mod integration;

// Re-export foundation types
pub use foundation::{
    AdapterError, AdapterResult, Event, EventSendError, Pool, Response, ResponseType, Reusable,
    Session,
};

// Re-export integration types
pub use integration::{Adapter, BoxedAdapter, EventSender};

// Re-exported so adapters and handlers share one token type.
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
    pub use tokio_util::sync::CancellationToken;
}
