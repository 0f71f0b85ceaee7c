//! The order-book assembler: merges a REST snapshot with a stream of sequenced depth diffs.

use crate::checksum::compute_checksum;
use crate::error::BookError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;

/// `0` means unlimited depth.
const UNLIMITED_DEPTH: usize = 0;

/// A raw `(price, quantity)` level as received from the venue, both decimal strings.
pub type RawLevel = (String, String);

/// Input to [`OrderBook::apply_snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotInput {
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
    pub checksum: Option<u32>,
}

/// Input to [`OrderBook::apply_diff`].
#[derive(Debug, Clone)]
pub struct DiffInput {
    pub first_update_id: u64,
    pub final_update_id: u64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
    pub checksum: Option<u32>,
}

/// A depth-truncated view of the book, produced after every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSnapshot {
    /// Highest price first.
    pub bids: Vec<(Decimal, Decimal)>,
    /// Lowest price first.
    pub asks: Vec<(Decimal, Decimal)>,
    pub last_seq: u64,
}

/// Per-`(provider, symbol)` order-book state. The caller owns the `(provider, symbol)` identity
/// and keys a map of these; the assembler itself only knows about a single book.
#[derive(Debug)]
pub struct OrderBook {
    depth: usize,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    last_seq: u64,
    initialized: bool,
    pending: VecDeque<DiffInput>,
    last_update_ts: DateTime<Utc>,
}

impl OrderBook {
    /// `depth` of `0` means unlimited (every level is retained in snapshots).
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_seq: 0,
            initialized: false,
            pending: VecDeque::new(),
            last_update_ts: Utc::now(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn last_update_ts(&self) -> DateTime<Utc> {
        self.last_update_ts
    }

    /// Number of diffs buffered while the book is uninitialized.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Reset the entire state from a REST snapshot. Drains and re-applies any diffs buffered
    /// while uninitialized whose `final_update_id` is newer than the snapshot. If one of those
    /// buffered diffs itself has a gap or a failing checksum, `apply_diff` resets the assembler
    /// back to uninitialized and that error is propagated here rather than masked — the caller
    /// must treat this exactly like a live `OutOfSync`/`ChecksumMismatch` and reseed.
    pub fn apply_snapshot(&mut self, seq: u64, snapshot: SnapshotInput) -> Result<BookSnapshot, BookError> {
        let mut bids = BTreeMap::new();
        let mut asks = BTreeMap::new();
        apply_side(&mut bids, &snapshot.bids)?;
        apply_side(&mut asks, &snapshot.asks)?;

        if let Some(expected) = snapshot.checksum {
            let actual = compute_checksum(&bids, &asks);
            if actual != expected {
                return Err(BookError::ChecksumMismatch { expected, actual });
            }
        }

        self.bids = bids;
        self.asks = asks;
        self.last_seq = seq;
        self.initialized = true;
        self.last_update_ts = Utc::now();

        let mut buffered: Vec<_> = std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|diff| diff.final_update_id > self.last_seq)
            .collect();
        buffered.sort_by_key(|diff| diff.final_update_id);
        for diff in buffered {
            // Applied identically to a live `apply_diff` call: a gap inside the buffered batch
            // still resets the assembler to uninitialized, and that error must surface here
            // rather than be swallowed, or the caller would see a fabricated "successful" empty
            // snapshot instead of the resync it needs to act on.
            self.apply_diff(diff)?;
        }

        Ok(self.top_n())
    }

    /// Apply a single depth diff. Returns `(snapshot, true)` when the diff was applied,
    /// `(snapshot, false)` when it was buffered or discarded as stale.
    pub fn apply_diff(&mut self, diff: DiffInput) -> Result<(BookSnapshot, bool), BookError> {
        if !self.initialized {
            self.pending.push_back(diff);
            return Ok((self.top_n(), false));
        }

        if diff.final_update_id <= self.last_seq {
            return Ok((self.top_n(), false));
        }

        if diff.first_update_id > self.last_seq + 1 {
            self.reset();
            return Err(BookError::OutOfSync);
        }

        apply_side(&mut self.bids, &diff.bids)?;
        apply_side(&mut self.asks, &diff.asks)?;
        self.last_seq = diff.final_update_id;
        self.last_update_ts = Utc::now();

        if let Some(expected) = diff.checksum {
            let actual = compute_checksum(&self.bids, &self.asks);
            if actual != expected {
                let err = BookError::ChecksumMismatch { expected, actual };
                self.reset();
                return Err(err);
            }
        }

        Ok((self.top_n(), true))
    }

    /// Rebuild the depth-truncated view: bids descending, asks ascending, both limited to
    /// `depth` entries (or unlimited when `depth == 0`).
    pub fn top_n(&self) -> BookSnapshot {
        let bids = self.bids.iter().rev().map(|(p, q)| (*p, *q));
        let asks = self.asks.iter().map(|(p, q)| (*p, *q));

        let bids = if self.depth == UNLIMITED_DEPTH {
            bids.collect()
        } else {
            bids.take(self.depth).collect()
        };
        let asks = if self.depth == UNLIMITED_DEPTH {
            asks.collect()
        } else {
            asks.take(self.depth).collect()
        };

        BookSnapshot {
            bids,
            asks,
            last_seq: self.last_seq,
        }
    }

    fn reset(&mut self) {
        self.initialized = false;
        self.last_seq = 0;
        self.bids.clear();
        self.asks.clear();
        self.pending.clear();
    }
}

fn apply_side(map: &mut BTreeMap<Decimal, Decimal>, levels: &[RawLevel]) -> Result<(), BookError> {
    for (price, quantity) in levels {
        let parsed_price = Decimal::from_str(price).map_err(|_| BookError::InvalidLevel {
            price: price.clone(),
            quantity: quantity.clone(),
        })?;
        let parsed_quantity = Decimal::from_str(quantity).map_err(|_| BookError::InvalidLevel {
            price: price.clone(),
            quantity: quantity.clone(),
        })?;

        if parsed_quantity > Decimal::ZERO {
            map.insert(parsed_price, parsed_quantity);
        } else {
            map.remove(&parsed_price);
        }
    }
    Ok(())
}
