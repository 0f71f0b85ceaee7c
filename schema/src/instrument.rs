//! Canonical instrument [`Symbol`] parsing and validation.
//!
//! Canonical form is `BASE-QUOTE[-SUFFIX]`, uppercase throughout. `SUFFIX` is absent for spot,
//! `PERP` for perpetuals, `YYYYMMDD` for dated futures, and `YYYYMMDD-STRIKE[-C|P]` for options.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed instrument kind, derived from the trailing segments of a canonical [`Symbol`].
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Spot,
    Perpetual,
    Future { expiry: String },
    Option {
        expiry: String,
        strike: String,
        right: Option<OptionRight>,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

/// A validated canonical instrument symbol, e.g. `BTC-USDT`, `BTC-USDT-PERP`,
/// `BTC-USDT-20241227`, or `BTC-USDT-20241227-50000-C`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Validate and construct a [`Symbol`] from its canonical string form.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SchemaError> {
        let raw = raw.into();
        validate_instrument(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    pub fn quote(&self) -> &str {
        self.segments().nth(1).unwrap_or_default()
    }

    /// Re-derive the [`InstrumentKind`] from the trailing segments.
    ///
    /// Infallible: construction already validated the shape via [`validate_instrument`].
    pub fn kind(&self) -> InstrumentKind {
        let tail: Vec<&str> = self.segments().skip(2).collect();
        match tail.as_slice() {
            [] => InstrumentKind::Spot,
            ["PERP"] => InstrumentKind::Perpetual,
            [expiry] => InstrumentKind::Future {
                expiry: expiry.to_string(),
            },
            [expiry, strike] => InstrumentKind::Option {
                expiry: expiry.to_string(),
                strike: strike.to_string(),
                right: None,
            },
            [expiry, strike, right] => InstrumentKind::Option {
                expiry: expiry.to_string(),
                strike: strike.to_string(),
                right: match *right {
                    "C" => Some(OptionRight::Call),
                    "P" => Some(OptionRight::Put),
                    _ => None,
                },
            },
            _ => InstrumentKind::Spot,
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('-')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a canonical instrument symbol shape without allocating a [`Symbol`].
///
/// See the module docs for the grammar; this is the sole source of truth the rest of the
/// gateway relies on to decide whether a symbol is well formed.
pub fn validate_instrument(raw: &str) -> Result<(), SchemaError> {
    let fail = |reason: &str| SchemaError::InvalidInstrument {
        symbol: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(fail("empty symbol"));
    }
    if raw.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(fail("contains a non-uppercase segment"));
    }

    let segments: Vec<&str> = raw.split('-').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(fail("contains an empty segment"));
    }

    let [base, quote, tail @ ..] = segments.as_slice() else {
        return Err(fail("missing base or quote"));
    };
    if !is_alnum(base) {
        return Err(fail("base must be alphanumeric"));
    }
    if !is_alnum(quote) {
        return Err(fail("quote must be alphanumeric"));
    }

    match tail {
        [] => Ok(()),
        ["PERP"] => Ok(()),
        [expiry] => {
            if is_date(expiry) {
                Ok(())
            } else {
                Err(fail("futures suffix must be PERP or YYYYMMDD"))
            }
        }
        [expiry, strike] => {
            if is_date(expiry) && is_strike(strike) {
                Ok(())
            } else {
                Err(fail("option suffix must be YYYYMMDD-STRIKE"))
            }
        }
        [expiry, strike, right] => {
            if is_date(expiry) && is_strike(strike) && (*right == "C" || *right == "P") {
                Ok(())
            } else {
                Err(fail("option suffix must be YYYYMMDD-STRIKE[-C|P]"))
            }
        }
        _ => Err(fail("too many suffix segments")),
    }
}

fn is_alnum(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_date(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_digit())
}

fn is_strike(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
