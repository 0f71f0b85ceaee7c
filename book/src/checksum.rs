//! Venue order-book checksum: CRC32/IEEE over the top-10 bids then top-10 asks.

use crate::normalise::normalise_decimal;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const CHECKSUM_DEPTH: usize = 10;

/// Compute the canonical checksum over `bids` (highest price first) and `asks` (lowest price
/// first). `bids` and `asks` must already be sorted naturally by `Decimal`'s `Ord` impl; the
/// caller supplies iteration order (descending vs. ascending) by passing the map directly — this
/// function reads `bids` in reverse and `asks` forward, matching the book's own storage order.
pub fn compute_checksum(bids: &BTreeMap<Decimal, Decimal>, asks: &BTreeMap<Decimal, Decimal>) -> u32 {
    let mut parts = Vec::with_capacity(CHECKSUM_DEPTH * 2);

    for (price, quantity) in bids.iter().rev().take(CHECKSUM_DEPTH) {
        parts.push(normalise_decimal(&price.to_string()));
        parts.push(normalise_decimal(&quantity.to_string()));
    }
    for (price, quantity) in asks.iter().take(CHECKSUM_DEPTH) {
        parts.push(normalise_decimal(&price.to_string()));
        parts.push(normalise_decimal(&quantity.to_string()));
    }

    crc32fast::hash(parts.join(":").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn checksum_is_stable_for_the_same_book_state() {
        let mut bids = BTreeMap::new();
        bids.insert(dec!(50000), dec!(1.0));
        let mut asks = BTreeMap::new();
        asks.insert(dec!(50100), dec!(2.0));

        let first = compute_checksum(&bids, &asks);
        let second = compute_checksum(&bids, &asks);
        assert_eq!(first, second);
    }

    #[test]
    fn checksum_changes_when_a_level_changes() {
        let mut bids = BTreeMap::new();
        bids.insert(dec!(50000), dec!(1.0));
        let asks = BTreeMap::new();

        let before = compute_checksum(&bids, &asks);
        bids.insert(dec!(50000), dec!(1.5));
        let after = compute_checksum(&bids, &asks);

        assert_ne!(before, after);
    }

    #[test]
    fn checksum_truncates_to_top_ten_per_side() {
        let mut bids_a = BTreeMap::new();
        let mut bids_b = BTreeMap::new();
        for i in 0..15u32 {
            let price = Decimal::from(50000 - i);
            bids_a.insert(price, dec!(1.0));
            bids_b.insert(price, dec!(1.0));
        }
        // An 11th-best-or-worse level differs between the two books but shouldn't affect the
        // checksum, since only the best 10 are hashed.
        bids_b.insert(Decimal::from(10), dec!(999.0));

        let asks = BTreeMap::new();
        assert_eq!(compute_checksum(&bids_a, &asks), compute_checksum(&bids_b, &asks));
    }
}
