//! Bounded blocking FIFO used as render admission control.
//!
//! A caller does `put(request_id)` before launching the external renderer
//! and `get()` once the process exits, which caps concurrent renders at
//! the queue capacity. Unlike a plain counting semaphore the queue keeps
//! the ids of the requests currently holding a slot, in arrival order, so
//! a stuck render is attributable to a request.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct Slots<T> {
    items: VecDeque<T>,
}

/// Fixed-capacity blocking queue. `put` blocks while full, `get` blocks
/// while empty; items come out in insertion order.
pub struct RenderQueue<T> {
    capacity: usize,
    slots: Mutex<Slots<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> RenderQueue<T> {
    /// Create a queue with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero; a zero-slot queue could never accept
    /// an item.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "render queue needs at least one slot");
        Self {
            capacity,
            slots: Mutex::new(Slots {
                items: VecDeque::with_capacity(capacity),
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Append `item` at the tail, blocking while the queue is full.
    pub fn put(&self, item: T) {
        let mut slots = self.slots.lock();
        while slots.items.len() >= self.capacity {
            self.not_full.wait(&mut slots);
        }
        slots.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Remove and return the head, blocking while the queue is empty.
    pub fn get(&self) -> T {
        let mut slots = self.slots.lock();
        loop {
            if let Some(item) = slots.items.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut slots);
        }
    }

    /// Number of occupied slots right now.
    pub fn len(&self) -> usize {
        self.slots.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
