//! Adapter contract and the producer end of the event queue.
//!
//! Adapters bridge one platform's I/O with the engine. Each adapter:
//! - **Ingests**: [`Adapter::start`] runs until cancelled, pushing normalized
//!   [`Event`]s into an [`EventSender`]
//! - **Delivers**: [`Adapter::send_response`] pushes a [`Response`] back out
//! - **Cleans up**: [`Adapter::close`] releases held resources at shutdown
//!
//! # Architecture
//!
//! ```text
//! Platform ←→ Adapter ──EventSender──▶ event queue ──▶ Engine
//!                ▲                                       │
//!                └──────────── send_response ◀── fan-out ┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! struct LineAdapter;
//!
//! #[async_trait]
//! impl Adapter for LineAdapter {
//!     fn name(&self) -> &str {
//!         "line"
//!     }
//!
//!     async fn start(&self, cancel: CancellationToken, events: EventSender) -> AdapterResult<()> {
//!         let mut event = events.new_event();
//!         event.event_type = Event::MESSAGE.into();
//!         event.platform = "line".into();
//!         event.set_text("/ping");
//!         events.send(event).await?;
//!         cancel.cancelled().await;
//!         Ok(())
//!     }
//!
//!     async fn send_response(&self, _cancel: CancellationToken, response: Response) -> AdapterResult<()> {
//!         println!("{}", response.data);
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::foundation::error::{AdapterResult, EventSendError};
use crate::foundation::event::Event;
use crate::foundation::pool::Pool;
use crate::foundation::response::Response;

// =============================================================================
// Adapter Trait
// =============================================================================

/// The core adapter trait.
///
/// The engine only depends on this narrow contract; concrete platforms are
/// supplied by the application.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name, used in logs and error reports.
    fn name(&self) -> &str;

    /// Runs the ingestion loop until `cancel` fires.
    ///
    /// Events must be pushed in arrival order; the queue preserves it.
    /// Returning an error is reported by the engine and does not affect
    /// other adapters.
    async fn start(&self, cancel: CancellationToken, events: EventSender) -> AdapterResult<()>;

    /// Delivers one response to the platform.
    async fn send_response(&self, cancel: CancellationToken, response: Response)
    -> AdapterResult<()>;

    /// Releases resources held by the adapter.
    ///
    /// Called once during engine shutdown, after the worker pool has drained.
    async fn close(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

// =============================================================================
// Event Sender
// =============================================================================

/// Producer end of the engine's bounded event queue.
///
/// Cloning is cheap; every adapter gets its own clone. Sending waits while the
/// queue is full.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
    pool: Arc<Pool<Event>>,
}

impl EventSender {
    /// Wraps a channel sender and the pool that recycled events come from.
    pub fn new(tx: mpsc::Sender<Event>, pool: Arc<Pool<Event>>) -> Self {
        Self { tx, pool }
    }

    /// Returns a blank event, reusing a recycled one when available.
    pub fn new_event(&self) -> Event {
        self.pool.acquire()
    }

    /// Pushes `event` into the queue, waiting for capacity.
    pub async fn send(&self, event: Event) -> Result<(), EventSendError> {
        self.tx.send(event).await.map_err(|_| EventSendError)
    }

    /// Pushes `event` without waiting. Fails if the queue is full or closed.
    pub fn try_send(&self, event: Event) -> Result<(), EventSendError> {
        self.tx.try_send(event).map_err(|_| EventSendError)
    }

    /// Returns `true` once the engine has closed the queue.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
