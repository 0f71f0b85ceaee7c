//! Provider identifiers for venues the gateway connects to.
//!
//! Mirrors the donor workspace's `ExchangeId` (see `markets::exchange::ExchangeId`): a small,
//! explicit, non-extensible-at-runtime enum rather than an interned string, so that a typo in a
//! provider name fails at compile time wherever it is matched on.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Identifies a market-data/execution venue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum ProviderId {
    /// Binance spot market.
    BinanceSpot,
    /// Binance USD-margined perpetuals/futures.
    BinanceLinear,
    /// Binance coin-margined perpetuals/futures.
    BinanceInverse,
    /// In-process provider used by tests and local development.
    Mock,
}

impl ProviderId {
    /// Canonical upper-snake-case string used in `event_id`s and route keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinanceSpot => "BINANCE_SPOT",
            Self::BinanceLinear => "BINANCE_LINEAR",
            Self::BinanceInverse => "BINANCE_INVERSE",
            Self::Mock => "MOCK",
        }
    }

    /// True for any Binance family member, used to select the shared signing/REST client.
    pub fn is_binance(&self) -> bool {
        matches!(
            self,
            Self::BinanceSpot | Self::BinanceLinear | Self::BinanceInverse
        )
    }
}

impl FromStr for ProviderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BINANCE_SPOT" | "BINANCE" => Ok(Self::BinanceSpot),
            "BINANCE_LINEAR" | "BINANCE_USDM" => Ok(Self::BinanceLinear),
            "BINANCE_INVERSE" | "BINANCE_COINM" => Ok(Self::BinanceInverse),
            "MOCK" => Ok(Self::Mock),
            _ => Err(()),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
