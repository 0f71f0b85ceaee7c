//! A single `(provider, symbol, type)` stream's ordering buffer.

use kestrel_schema::Event;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// `0` means unbounded.
const UNBOUNDED: usize = 0;

#[derive(Debug)]
struct Buffered {
    arrival: Instant,
    event: Event,
}

/// Releases events for one stream in strict ascending `seq_provider` order, subject to a bounded
/// lateness tolerance and an optional maximum buffer size.
#[derive(Debug)]
pub struct StreamBuffer {
    lateness_tolerance: Duration,
    max_buffer_size: usize,
    last_emitted: u64,
    entries: BTreeMap<u64, Buffered>,
    arrival_order: VecDeque<u64>,
}

impl StreamBuffer {
    pub fn new(lateness_tolerance: Duration, max_buffer_size: usize) -> Self {
        Self {
            lateness_tolerance,
            max_buffer_size,
            last_emitted: 0,
            entries: BTreeMap::new(),
            arrival_order: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_emitted(&self) -> u64 {
        self.last_emitted
    }

    /// Feed one event. Returns the events that became ready for release (possibly empty) and
    /// whether the event was accepted into the buffer (`false` only for a stale/duplicate
    /// `seq_provider`).
    pub fn on_event(&mut self, event: Event) -> (Vec<Event>, bool) {
        if event.seq_provider <= self.last_emitted || self.entries.contains_key(&event.seq_provider) {
            return (Vec::new(), false);
        }

        let seq = event.seq_provider;
        self.entries.insert(
            seq,
            Buffered {
                arrival: Instant::now(),
                event,
            },
        );
        self.arrival_order.push_back(seq);

        let ready = self.drain_contiguous();
        if !ready.is_empty() {
            return (ready, true);
        }

        if self.max_buffer_size != UNBOUNDED && self.entries.len() > self.max_buffer_size {
            return (self.force_release_overflow(), true);
        }

        (Vec::new(), true)
    }

    /// Release every head entry whose arrival predates `now - lateness_tolerance`, then any
    /// contiguous run that follows.
    pub fn flush(&mut self, now: Instant) -> Vec<Event> {
        let mut released = Vec::new();

        loop {
            let Some((&seq, buffered)) = self.entries.iter().next() else {
                break;
            };
            if now.saturating_duration_since(buffered.arrival) < self.lateness_tolerance {
                break;
            }
            let buffered = self.entries.remove(&seq).expect("just observed via iter().next()");
            self.last_emitted = seq;
            released.push(buffered.event);
        }

        released.append(&mut self.drain_contiguous());
        released
    }

    /// Pop every entry forming a contiguous run starting at `last_emitted + 1`.
    fn drain_contiguous(&mut self) -> Vec<Event> {
        let mut ready = Vec::new();
        loop {
            let next_seq = self.last_emitted + 1;
            match self.entries.remove(&next_seq) {
                Some(buffered) => {
                    self.last_emitted = next_seq;
                    ready.push(buffered.event);
                }
                None => break,
            }
        }
        ready
    }

    /// Forcibly release the oldest-by-arrival entries until the buffer is within
    /// `max_buffer_size`. These releases advance `last_emitted` to the released sequence even
    /// when that skips a gap — an explicit data-loss release under overload.
    fn force_release_overflow(&mut self) -> Vec<Event> {
        let mut released = Vec::new();
        while self.entries.len() > self.max_buffer_size {
            let Some(oldest_seq) = self.arrival_order.pop_front() else {
                break;
            };
            if let Some(buffered) = self.entries.remove(&oldest_seq) {
                self.last_emitted = self.last_emitted.max(buffered.event.seq_provider);
                released.push(buffered.event);
            }
        }
        released.sort_by_key(|e| e.seq_provider);
        released.append(&mut self.drain_contiguous());
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kestrel_schema::{EventType, Payload, ProviderId, Side, Symbol};
    use rust_decimal::Decimal;

    fn event(seq: u64) -> Event {
        let symbol = Symbol::parse("BTC-USDT").unwrap();
        let now = Utc::now();
        Event {
            event_id: kestrel_schema::event::build_event_id(ProviderId::Mock, &symbol, EventType::Trade, seq),
            routing_version: 1,
            provider: ProviderId::Mock,
            symbol,
            event_type: EventType::Trade,
            seq_provider: seq,
            ingest_ts: now,
            emit_ts: now,
            payload: Payload::Trade {
                trade_id: seq.to_string(),
                side: Side::Buy,
                price: Decimal::ONE,
                quantity: Decimal::ONE,
                timestamp: now,
            },
        }
    }

    #[test]
    fn out_of_order_pair_releases_together_on_the_second_event() {
        let mut buffer = StreamBuffer::new(Duration::from_millis(50), 0);

        let (ready, buffered) = buffer.on_event(event(2));
        assert!(ready.is_empty());
        assert!(buffered);

        let (ready, buffered) = buffer.on_event(event(1));
        assert!(buffered);
        let seqs: Vec<u64> = ready.iter().map(|e| e.seq_provider).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(buffer.last_emitted(), 2);
    }

    #[test]
    fn stale_events_are_rejected() {
        let mut buffer = StreamBuffer::new(Duration::from_millis(50), 0);
        buffer.on_event(event(1));
        buffer.on_event(event(2));

        let (ready, buffered) = buffer.on_event(event(1));
        assert!(ready.is_empty());
        assert!(!buffered);
    }

    #[test]
    fn flush_releases_an_aged_head_then_the_contiguous_run() {
        let mut buffer = StreamBuffer::new(Duration::from_millis(50), 0);
        let (ready, _) = buffer.on_event(event(3));
        assert!(ready.is_empty());

        let later = Instant::now() + Duration::from_millis(60);
        let released = buffer.flush(later);

        let seqs: Vec<u64> = released.iter().map(|e| e.seq_provider).collect();
        assert_eq!(seqs, vec![3]);
        assert_eq!(buffer.last_emitted(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn overload_forces_release_by_arrival_order() {
        let mut buffer = StreamBuffer::new(Duration::from_secs(1), 2);

        buffer.on_event(event(5));
        buffer.on_event(event(9));
        let (ready, buffered) = buffer.on_event(event(20));

        assert!(buffered);
        assert!(!ready.is_empty());
        assert_eq!(buffer.last_emitted(), ready.last().unwrap().seq_provider);
    }
}
