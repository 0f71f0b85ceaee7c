//! Venue instrument metadata, refreshed from `/exchangeInfo` and turned into `INSTRUMENT.UPDATE`
//! events. Kept separate from the streaming state machines since it is polled, not pushed.

use crate::error::AdapterError;
use crate::rest::RestClient;
use crate::wire::{ExchangeInfoResponse, SymbolFilter};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub struct InstrumentMetadata {
    pub status: String,
    pub tick_size: Option<Decimal>,
    pub step_size: Option<Decimal>,
    pub min_qty: Option<Decimal>,
    pub max_qty: Option<Decimal>,
    pub min_notional: Option<Decimal>,
}

/// Snapshot of every symbol the venue reports, keyed by its raw (unhyphenated) wire symbol.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalogue {
    by_symbol: HashMap<String, InstrumentMetadata>,
}

impl InstrumentCatalogue {
    pub async fn refresh(rest: &RestClient) -> Result<Self, AdapterError> {
        let info = rest.exchange_info().await?;
        Ok(Self::from_exchange_info(info))
    }

    /// Build a catalogue directly from a parsed `/exchangeInfo` response, admitting only
    /// `status == "TRADING"` symbols. Split out from [`Self::refresh`] so the admission rule is
    /// unit-testable without a REST round trip.
    fn from_exchange_info(info: ExchangeInfoResponse) -> Self {
        let mut by_symbol = HashMap::with_capacity(info.symbols.len());

        for entry in info.symbols {
            if entry.status != "TRADING" {
                continue;
            }
            let mut metadata = InstrumentMetadata {
                status: entry.status,
                ..Default::default()
            };
            for filter in entry.filters {
                match filter {
                    SymbolFilter::PriceFilter { tick_size } => metadata.tick_size = Decimal::from_str(&tick_size).ok(),
                    SymbolFilter::LotSize { step_size, min_qty, max_qty } => {
                        metadata.step_size = Decimal::from_str(&step_size).ok();
                        metadata.min_qty = Decimal::from_str(&min_qty).ok();
                        metadata.max_qty = Decimal::from_str(&max_qty).ok();
                    }
                    SymbolFilter::MinNotional { min_notional } => {
                        metadata.min_notional = Decimal::from_str(&min_notional).ok();
                    }
                    SymbolFilter::Other => {}
                }
            }
            by_symbol.insert(entry.symbol, metadata);
        }

        Self { by_symbol }
    }

    pub fn get(&self, wire_symbol: &str) -> Option<&InstrumentMetadata> {
        self.by_symbol.get(wire_symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::SymbolInfo;

    fn info(symbol: &str, status: &str, filters: Vec<SymbolFilter>) -> SymbolInfo {
        SymbolInfo { symbol: symbol.to_string(), status: status.to_string(), filters }
    }

    #[test]
    fn only_trading_symbols_are_admitted() {
        let catalogue = InstrumentCatalogue::from_exchange_info(ExchangeInfoResponse {
            symbols: vec![
                info("BTCUSDT", "TRADING", vec![]),
                info("ETHUSDT", "BREAK", vec![]),
                info("LUNAUSDT", "HALT", vec![]),
            ],
        });

        assert_eq!(catalogue.len(), 1);
        assert!(catalogue.get("BTCUSDT").is_some());
        assert!(catalogue.get("ETHUSDT").is_none());
        assert!(catalogue.get("LUNAUSDT").is_none());
    }

    #[test]
    fn filter_fields_are_parsed_onto_the_metadata() {
        let catalogue = InstrumentCatalogue::from_exchange_info(ExchangeInfoResponse {
            symbols: vec![info(
                "BTCUSDT",
                "TRADING",
                vec![
                    SymbolFilter::PriceFilter { tick_size: "0.01".to_string() },
                    SymbolFilter::LotSize {
                        step_size: "0.00001".to_string(),
                        min_qty: "0.00001".to_string(),
                        max_qty: "9000".to_string(),
                    },
                    SymbolFilter::MinNotional { min_notional: "10".to_string() },
                ],
            )],
        });

        let metadata = catalogue.get("BTCUSDT").unwrap();
        assert_eq!(metadata.status, "TRADING");
        assert_eq!(metadata.tick_size, Some(Decimal::from_str("0.01").unwrap()));
        assert_eq!(metadata.step_size, Some(Decimal::from_str("0.00001").unwrap()));
        assert_eq!(metadata.min_qty, Some(Decimal::from_str("0.00001").unwrap()));
        assert_eq!(metadata.max_qty, Some(Decimal::from_str("9000").unwrap()));
        assert_eq!(metadata.min_notional, Some(Decimal::from_str("10").unwrap()));
    }

    #[test]
    fn an_unknown_filter_type_is_ignored() {
        let catalogue = InstrumentCatalogue::from_exchange_info(ExchangeInfoResponse {
            symbols: vec![info("BTCUSDT", "TRADING", vec![SymbolFilter::Other])],
        });

        let metadata = catalogue.get("BTCUSDT").unwrap();
        assert_eq!(metadata.tick_size, None);
    }
}
