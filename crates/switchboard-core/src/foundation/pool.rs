//! Free-list pools for frequently allocated values.
//!
//! [`Pool`] keeps released values around so their heap allocations (payload
//! maps, strings) can be reused. The reset happens on [`Pool::release`],
//! never on [`Pool::acquire`]: whatever comes out of a pool is already in its
//! zero form.

use parking_lot::Mutex;

/// A value that can be returned to its zero form for reuse.
pub trait Reusable: Default {
    /// Clears every field to its zero/empty form.
    fn reset(&mut self);
}

/// A bounded free list of [`Reusable`] values.
///
/// # Example
///
/// ```rust
/// use switchboard_core::{Event, Pool};
///
/// let pool: Pool<Event> = Pool::new(16);
/// let event = pool.acquire().with_text("/ping");
/// pool.release(event);
///
/// let reused = pool.acquire();
/// assert!(reused.text().is_none());
/// ```
#[derive(Debug)]
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Reusable> Pool<T> {
    /// Creates a pool retaining at most `capacity` idle values.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Takes an idle value, or creates a fresh one if the pool is empty.
    pub fn acquire(&self) -> T {
        self.free.lock().pop().unwrap_or_default()
    }

    /// Resets `value` and keeps it for reuse.
    ///
    /// When the pool is full the value is dropped instead.
    pub fn release(&self, mut value: T) {
        value.reset();
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(value);
        }
    }

    /// Number of idle values currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Maximum number of idle values retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::Event;

    #[test]
    fn test_release_resets_before_reuse() {
        let pool: Pool<Event> = Pool::new(4);
        let event = Event::message("chat")
            .with_text("/admin ban bob")
            .with_data("user", "alice");
        pool.release(event);
        assert_eq!(pool.idle(), 1);

        let reused = pool.acquire();
        assert!(reused.event_type.is_empty());
        assert!(reused.platform.is_empty());
        assert!(reused.data.is_empty());
        assert!(reused.session.is_none());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_capacity_bound() {
        let pool: Pool<Event> = Pool::new(2);
        for _ in 0..5 {
            pool.release(Event::default());
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_acquire_from_empty_pool() {
        let pool: Pool<Event> = Pool::new(0);
        let event = pool.acquire();
        assert!(event.data.is_empty());
        pool.release(event);
        assert_eq!(pool.idle(), 0);
    }
}
