#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # 🏊 Pool - Bounded Object Recycling
//!
//! A fixed-capacity pool of pre-allocated objects, used to keep [`Event`](kestrel_schema::Event)
//! allocation off the hot path of the book assembler and the publisher. Every slot is created up
//! front by a factory closure; [`Pool::acquire`] blocks (up to a deadline) until a slot is
//! returned, and [`PooledObject::release`] resets and returns it.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod error;
pub use error::PoolError;

/// The deadline [`Pool::acquire`] uses when the caller does not specify one.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

struct State<T> {
    slots: Vec<Option<T>>,
    checked_out: Vec<bool>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
    capacity: usize,
    reset: Box<dyn Fn(&mut T) + Send + Sync>,
}

impl<T> Inner<T> {
    /// Return a slot to the free list. Panics if the slot was not checked out — a programmer
    /// error (the same [`PooledObject`] released twice, or an index fabricated by hand).
    fn return_slot(&self, index: usize, mut value: T) {
        let mut state = self.state.lock();
        if !state.checked_out[index] {
            panic!("kestrel-pool: double release of slot {index}");
        }
        (self.reset)(&mut value);
        state.slots[index] = Some(value);
        state.checked_out[index] = false;
        drop(state);
        self.condvar.notify_one();
    }
}

/// A bounded pool of `T`. Cloning shares the same underlying slots (it is a cheap `Arc` clone).
pub struct Pool<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        let in_use = state.checked_out.iter().filter(|b| **b).count();
        f.debug_struct("Pool")
            .field("capacity", &self.inner.capacity)
            .field("in_use", &in_use)
            .finish()
    }
}

impl<T> Pool<T> {
    /// Build a pool of `capacity` objects, each produced by `factory`. No reset is applied to a
    /// returned object beyond what [`PooledObject::release`] already does (nothing).
    pub fn new(capacity: usize, factory: impl Fn() -> T) -> Self {
        Self::with_reset(capacity, factory, |_| {})
    }

    /// Build a pool of `capacity` objects, applying `reset` to an object every time it is
    /// returned to the pool (before it becomes available to another [`Pool::acquire`] caller).
    pub fn with_reset(
        capacity: usize,
        factory: impl Fn() -> T,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        let slots = (0..capacity).map(|_| Some(factory())).collect();
        let checked_out = vec![false; capacity];
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { slots, checked_out }),
                condvar: Condvar::new(),
                capacity,
                reset: Box::new(reset),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of slots currently checked out.
    pub fn in_use(&self) -> usize {
        self.inner.state.lock().checked_out.iter().filter(|b| **b).count()
    }

    /// Acquire a slot, using [`DEFAULT_ACQUIRE_TIMEOUT`] as the deadline.
    pub fn acquire(&self) -> Result<PooledObject<T>, PoolError> {
        self.acquire_within(DEFAULT_ACQUIRE_TIMEOUT)
    }

    /// Acquire a slot, blocking the calling thread until one is free or `deadline` elapses.
    pub fn acquire_within(&self, deadline: Duration) -> Result<PooledObject<T>, PoolError> {
        let start = Instant::now();
        let mut state = self.inner.state.lock();
        loop {
            if let Some(index) = state.slots.iter().position(Option::is_some) {
                let value = state.slots[index].take().expect("position() guarantees Some");
                state.checked_out[index] = true;
                return Ok(PooledObject {
                    pool: Arc::clone(&self.inner),
                    index,
                    value: Some(value),
                    released: false,
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= deadline {
                return Err(PoolError::AcquireTimeout {
                    waited_ms: elapsed.as_millis(),
                    capacity: self.inner.capacity,
                });
            }
            let remaining = deadline - elapsed;
            self.inner.condvar.wait_for(&mut state, remaining);
        }
    }

    #[cfg(test)]
    fn inner_for_test(&self) -> &Inner<T> {
        &self.inner
    }
}

/// A checked-out slot. Returns to the pool either explicitly via [`PooledObject::release`], or
/// implicitly on drop.
pub struct PooledObject<T> {
    pool: Arc<Inner<T>>,
    index: usize,
    value: Option<T>,
    released: bool,
}

impl<T> PooledObject<T> {
    /// Reset and return this object to the pool. Equivalent to letting it drop, but explicit at
    /// the call site.
    pub fn release(mut self) {
        let value = self.value.take().expect("PooledObject value already taken");
        self.pool.return_slot(self.index, value);
        self.released = true;
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("PooledObject value already taken")
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("PooledObject value already taken")
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("index", &self.index)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if !self.released {
            if let Some(value) = self.value.take() {
                self.pool.return_slot(self.index, value);
            }
        }
    }
}
