//! Currency code normalisation.

/// Uppercase, trim, and validate a currency/asset code. Returns an empty string on any invalid
/// input (non-alphanumeric characters, or empty after trimming) — callers treat an empty result
/// as "no currency", matching the spec's `normalize_currency_code` contract.
pub fn normalize_currency_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return String::new();
    }
    trimmed.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_valid_codes() {
        assert_eq!(normalize_currency_code(" usdt "), "USDT");
        assert_eq!(normalize_currency_code("Btc"), "BTC");
    }

    #[test]
    fn rejects_invalid_codes() {
        assert_eq!(normalize_currency_code(""), "");
        assert_eq!(normalize_currency_code("   "), "");
        assert_eq!(normalize_currency_code("US-DT"), "");
        assert_eq!(normalize_currency_code("US DT"), "");
    }
}
