//! Integration layer - the contract external platforms implement.

pub mod adapter;

pub use adapter::{Adapter, BoxedAdapter, EventSender};
