//! Foundation layer - the data model shared by every other layer.
//!
//! - [`Event`] / [`Response`]: what flows in and out
//! - [`Session`]: state shared across events of one conversation
//! - [`Pool`]: free-list reuse with a reset-on-release contract

pub mod error;
pub mod event;
pub mod pool;
pub mod response;
pub mod session;

pub use error::{AdapterError, AdapterResult, EventSendError};
pub use event::Event;
pub use pool::{Pool, Reusable};
pub use response::{Response, ResponseType};
pub use session::Session;
