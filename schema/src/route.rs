//! Canonical route type validation and the [`Route`] record the dispatch table stores.

use crate::error::SchemaError;
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An uppercase dotted identifier, e.g. `TRADE`, `TICKER`, `ORDERBOOK.SNAPSHOT`,
/// `EXECUTION.REPORT`. Every dot-separated segment must be non-empty and match `[A-Z0-9]+`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CanonicalType(String);

impl CanonicalType {
    pub fn parse(raw: impl Into<String>) -> Result<Self, SchemaError> {
        let raw = raw.into();
        validate_route_type(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a route/canonical type string against the dotted `[A-Z0-9]+` segment grammar.
pub fn validate_route_type(raw: &str) -> Result<(), SchemaError> {
    let fail = |reason: &str| SchemaError::InvalidCanonicalType {
        kind: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(fail("empty canonical type"));
    }

    for segment in raw.split('.') {
        if segment.is_empty() {
            return Err(fail("contains an empty segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(fail("segments must match [A-Z0-9]+"));
        }
    }
    Ok(())
}

/// A single normalised filter rule, e.g. `{ field: "symbol", op: "in", value: ["BTC-USDT"] }`.
///
/// Normalisation per the spec: field trimmed, op lower-cased, in-lists sorted and deduplicated.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub op: String,
    pub values: Vec<String>,
}

impl FilterRule {
    pub fn new(
        field: impl Into<String>,
        op: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Self, SchemaError> {
        let field = field.into().trim().to_string();
        if field.is_empty() {
            return Err(SchemaError::InvalidFilter {
                field,
                reason: "field must not be empty".to_string(),
            });
        }
        let op = op.into().trim().to_lowercase();
        if op.is_empty() {
            return Err(SchemaError::InvalidFilter {
                field,
                reason: "op must not be empty".to_string(),
            });
        }

        let mut values = values;
        values.sort();
        values.dedup();

        Ok(Self { field, op, values })
    }
}

/// A route record: which topics/REST functions to action for a `(provider, type)` pair, and the
/// filters that narrow which instruments it applies to.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub provider: ProviderId,
    pub canonical_type: CanonicalType,
    pub ws_topics: Vec<String>,
    pub rest_fns: Vec<String>,
    pub filters: Vec<FilterRule>,
}

impl Route {
    pub fn new(
        provider: ProviderId,
        canonical_type: CanonicalType,
        ws_topics: Vec<String>,
        rest_fns: Vec<String>,
        filters: Vec<FilterRule>,
    ) -> Self {
        Self {
            provider,
            canonical_type,
            ws_topics,
            rest_fns,
            filters,
        }
    }

    /// Extract every instrument symbol named in an `in`/`eq` filter on the `symbol` field.
    ///
    /// Used by the provider adapter to derive the set of instruments to subscribe to.
    pub fn instrument_filters(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .filter(|rule| rule.field == "symbol")
            .flat_map(|rule| rule.values.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_dotted_segments() {
        assert!(validate_route_type("TRADE").is_ok());
        assert!(validate_route_type("ORDERBOOK.SNAPSHOT").is_ok());
        assert!(validate_route_type("EXECUTION.REPORT").is_ok());
        assert!(validate_route_type("").is_err());
        assert!(validate_route_type("trade").is_err());
        assert!(validate_route_type("TRADE.").is_err());
        assert!(validate_route_type(".TRADE").is_err());
        assert!(validate_route_type("TRADE..SNAPSHOT").is_err());
        assert!(validate_route_type("TRADE-SNAPSHOT").is_err());
    }

    #[test]
    fn filter_rule_normalises_on_construction() {
        let rule = FilterRule::new(
            "  symbol  ",
            "IN",
            vec!["ETH-USDT".to_string(), "BTC-USDT".to_string(), "BTC-USDT".to_string()],
        )
        .unwrap();

        assert_eq!(rule.field, "symbol");
        assert_eq!(rule.op, "in");
        assert_eq!(rule.values, vec!["BTC-USDT".to_string(), "ETH-USDT".to_string()]);
    }

    #[test]
    fn filter_rule_rejects_empty_field() {
        assert!(FilterRule::new("   ", "eq", vec![]).is_err());
    }
}
