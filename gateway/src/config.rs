//! Typed environment configuration for the gateway binary. One field per environment variable
//! documented in the system's external interfaces, each with a production-shaped default so the
//! process is runnable with no environment at all (trading stays disabled until credentials are
//! supplied).

use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_REST_BASE_URL: &str = "https://api.binance.com";
const DEFAULT_WS_PUBLIC_URL: &str = "wss://stream.binance.com:9443";
const DEFAULT_WS_PRIVATE_URL: &str = "wss://stream.binance.com:9443";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {variable}={value:?}: {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment tag, read from `MELTICA_ENV`. Purely informational here — it is
/// attached to startup logs so operators can tell which environment a given process belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Development,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub rest_base_url: Url,
    pub ws_public_url: Url,
    pub ws_private_url: Url,
    pub http_timeout: Duration,
    pub ws_handshake_timeout: Duration,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub json_logging: bool,
}

impl GatewayConfig {
    /// Read every supported environment variable, falling back to production-shaped defaults.
    /// Parse failures are fatal: this is the one place the ambient stack is allowed to fail
    /// before the async runtime starts.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("MELTICA_ENV")
            .map(|raw| Environment::parse(&raw))
            .unwrap_or(Environment::Development);

        Ok(Self {
            rest_base_url: parse_url("BINANCE_SPOT_BASE_URL", DEFAULT_REST_BASE_URL)?,
            ws_public_url: parse_url("BINANCE_WS_PUBLIC_URL", DEFAULT_WS_PUBLIC_URL)?,
            ws_private_url: parse_url("BINANCE_WS_PRIVATE_URL", DEFAULT_WS_PRIVATE_URL)?,
            http_timeout: parse_duration("BINANCE_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT)?,
            ws_handshake_timeout: parse_duration("BINANCE_WS_HANDSHAKE_TIMEOUT", DEFAULT_WS_HANDSHAKE_TIMEOUT)?,
            api_key: non_empty_env("BINANCE_API_KEY"),
            api_secret: non_empty_env("BINANCE_API_SECRET"),
            json_logging: std::env::var("KESTREL_JSON_LOGS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            environment,
        })
    }

    pub fn to_adapter_config(&self, provider: kestrel_schema::ProviderId) -> kestrel_adapter::AdapterConfig {
        kestrel_adapter::AdapterConfig {
            provider,
            rest_base_url: self.rest_base_url.clone(),
            ws_public_url: self.ws_public_url.clone(),
            ws_private_url: self.ws_private_url.clone(),
            http_timeout: self.http_timeout,
            ws_handshake_timeout: self.ws_handshake_timeout,
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            book_depth: 0,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_url(variable: &'static str, default: &str) -> Result<Url, ConfigError> {
    match std::env::var(variable) {
        Err(_) => Ok(Url::parse(default).expect("static default URL")),
        Ok(raw) => Url::parse(&raw).map_err(|err| ConfigError::Invalid {
            variable,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

/// Accepts a bare integer (seconds) or a `"10s"`/`"500ms"` duration string.
fn parse_duration(variable: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let Ok(raw) = std::env::var(variable) else {
        return Ok(default);
    };
    let invalid = |reason: &str| ConfigError::Invalid {
        variable,
        value: raw.clone(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if let Some(ms) = trimmed.strip_suffix("ms") {
        return ms.parse().map(Duration::from_millis).map_err(|_| invalid("not a valid millisecond count"));
    }
    if let Some(secs) = trimmed.strip_suffix('s') {
        return secs.parse().map(Duration::from_secs).map_err(|_| invalid("not a valid second count"));
    }
    trimmed.parse().map(Duration::from_secs).map_err(|_| invalid("expected a bare integer, \"Ns\", or \"Nms\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_bare_seconds_and_suffixed_forms() {
        assert_eq!(parse_duration("T1", Duration::ZERO).unwrap(), Duration::ZERO);
        std::env::set_var("KESTREL_TEST_DURATION_BARE", "7");
        assert_eq!(parse_duration("KESTREL_TEST_DURATION_BARE", Duration::ZERO).unwrap(), Duration::from_secs(7));
        std::env::set_var("KESTREL_TEST_DURATION_SECS", "10s");
        assert_eq!(parse_duration("KESTREL_TEST_DURATION_SECS", Duration::ZERO).unwrap(), Duration::from_secs(10));
        std::env::set_var("KESTREL_TEST_DURATION_MILLIS", "500ms");
        assert_eq!(parse_duration("KESTREL_TEST_DURATION_MILLIS", Duration::ZERO).unwrap(), Duration::from_millis(500));
        std::env::remove_var("KESTREL_TEST_DURATION_BARE");
        std::env::remove_var("KESTREL_TEST_DURATION_SECS");
        std::env::remove_var("KESTREL_TEST_DURATION_MILLIS");
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        std::env::set_var("KESTREL_TEST_DURATION_BAD", "soon");
        assert!(parse_duration("KESTREL_TEST_DURATION_BAD", Duration::ZERO).is_err());
        std::env::remove_var("KESTREL_TEST_DURATION_BAD");
    }

    #[test]
    fn environment_parse_defaults_to_development() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("Staging"), Environment::Staging);
        assert_eq!(Environment::parse("whatever"), Environment::Development);
    }
}
