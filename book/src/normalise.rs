//! Decimal-string normalisation, used by the checksum routine to match the venue's canonical
//! textual form regardless of how many trailing zeros our own formatting produced.

/// Strip a leading `+`, trailing zeros past the decimal point, and a trailing bare `.`.
pub fn normalise_decimal(raw: &str) -> String {
    let s = raw.strip_prefix('+').unwrap_or(raw);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCase {
        input: &'static str,
        expected: &'static str,
    }

    #[test]
    fn strips_sign_and_trailing_zeros() {
        let cases = vec![
            TestCase { input: "50000", expected: "50000" },
            TestCase { input: "+50000", expected: "50000" },
            TestCase { input: "50000.10", expected: "50000.1" },
            TestCase { input: "50000.00", expected: "50000" },
            TestCase { input: "0.0", expected: "0" },
            TestCase { input: "1.2300", expected: "1.23" },
            TestCase { input: "+1.5", expected: "1.5" },
        ];

        for (index, case) in cases.into_iter().enumerate() {
            assert_eq!(
                normalise_decimal(case.input),
                case.expected,
                "TC{index} failed for input {:?}",
                case.input
            );
        }
    }
}
