//! Owns one [`StreamBuffer`] per `(provider, symbol, type)` stream, creating and tearing them
//! down on demand.

use crate::buffer::StreamBuffer;
use kestrel_schema::{Event, EventType, ProviderId, Symbol};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default lateness tolerance applied to a newly created stream.
pub const DEFAULT_LATENESS_TOLERANCE: Duration = Duration::from_millis(50);

type StreamKey = (ProviderId, Symbol, EventType);

/// Fans events out to per-stream [`StreamBuffer`]s, deleting a stream's state once its buffer
/// empties.
#[derive(Debug)]
pub struct OrderingManager {
    lateness_tolerance: Duration,
    max_buffer_size: usize,
    streams: HashMap<StreamKey, StreamBuffer>,
}

impl OrderingManager {
    pub fn new(lateness_tolerance: Duration, max_buffer_size: usize) -> Self {
        Self {
            lateness_tolerance,
            max_buffer_size,
            streams: HashMap::new(),
        }
    }

    pub fn active_stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Route `event` to its stream's buffer.
    pub fn on_event(&mut self, event: Event) -> (Vec<Event>, bool) {
        let key = (event.provider, event.symbol.clone(), event.event_type);
        let buffer = self
            .streams
            .entry(key.clone())
            .or_insert_with(|| StreamBuffer::new(self.lateness_tolerance, self.max_buffer_size));

        let (ready, buffered) = buffer.on_event(event);
        if buffer.is_empty() {
            self.streams.remove(&key);
        }
        (ready, buffered)
    }

    /// Flush every stream whose head has aged past its lateness tolerance.
    pub fn flush_all(&mut self, now: Instant) -> Vec<Event> {
        let mut released = Vec::new();
        let mut emptied = Vec::new();

        for (key, buffer) in self.streams.iter_mut() {
            released.extend(buffer.flush(now));
            if buffer.is_empty() {
                emptied.push(key.clone());
            }
        }
        for key in emptied {
            self.streams.remove(&key);
        }
        released
    }
}

impl Default for OrderingManager {
    fn default() -> Self {
        Self::new(DEFAULT_LATENESS_TOLERANCE, 0)
    }
}
