//! The venue's REST surface: exchange metadata, depth snapshots, the listen-key lifecycle,
//! account state and order placement/lookup. Authenticated calls are signed per [`crate::signing`].

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::signing::{build_signed_query, API_KEY_HEADER};
use crate::wire::{AccountResponse, DepthSnapshotResponse, ExchangeInfoResponse, ListenKeyResponse, OrderResponse};
use chrono::Utc;
use kestrel_control::SubmitOrderCommand;
use kestrel_schema::Side;
use reqwest::{Client, Method};

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    config: AdapterConfig,
}

impl RestClient {
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(AdapterError::Http)?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.rest_base_url.as_str().trim_end_matches('/'))
    }

    fn require_credentials(&self) -> Result<(&str, &str), AdapterError> {
        match (self.config.api_key.as_deref(), self.config.api_secret.as_deref()) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(AdapterError::invalid("credentials", "api_key/api_secret not configured")),
        }
    }

    pub async fn exchange_info(&self) -> Result<ExchangeInfoResponse, AdapterError> {
        let response = self
            .http
            .get(self.url("/api/v3/exchangeInfo"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn depth_snapshot(&self, symbol: &str, limit: u32) -> Result<DepthSnapshotResponse, AdapterError> {
        let response = self
            .http
            .get(self.url("/api/v3/depth"))
            .query(&[("symbol", symbol), ("limit", &limit.to_string())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn create_listen_key(&self) -> Result<String, AdapterError> {
        let (key, _secret) = self.require_credentials()?;
        let response = self
            .http
            .post(self.url("/api/v3/userDataStream"))
            .header(API_KEY_HEADER, key)
            .send()
            .await?
            .error_for_status()?;
        let parsed: ListenKeyResponse = response.json().await?;
        Ok(parsed.listen_key)
    }

    pub async fn keepalive_listen_key(&self, listen_key: &str) -> Result<(), AdapterError> {
        let (key, _secret) = self.require_credentials()?;
        self.http
            .put(self.url("/api/v3/userDataStream"))
            .header(API_KEY_HEADER, key)
            .query(&[("listenKey", listen_key)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn close_listen_key(&self, listen_key: &str) -> Result<(), AdapterError> {
        let (key, _secret) = self.require_credentials()?;
        self.http
            .delete(self.url("/api/v3/userDataStream"))
            .header(API_KEY_HEADER, key)
            .query(&[("listenKey", listen_key)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn signed_request(&self, method: Method, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response, AdapterError> {
        let (key, secret) = self.require_credentials()?;
        let query = build_signed_query(secret, params, Utc::now().timestamp_millis());
        let request = self
            .http
            .request(method, self.url(path))
            .header(API_KEY_HEADER, key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(query);
        Ok(request.send().await?.error_for_status()?)
    }

    pub async fn account(&self) -> Result<AccountResponse, AdapterError> {
        let response = self.signed_request(Method::GET, "/api/v3/account", &[]).await?;
        Ok(response.json().await?)
    }

    pub async fn submit_order(&self, order: &SubmitOrderCommand) -> Result<OrderResponse, AdapterError> {
        let mut params = vec![
            ("symbol", order.symbol.as_str().replace('-', "")),
            ("side", side_to_binance(order.side).to_string()),
            ("type", order_type_to_binance(order.order_type).to_string()),
            ("quantity", order.quantity.normalize().to_string()),
            ("newClientOrderId", order.client_order_id.clone()),
        ];
        if let Some(price) = order.price {
            params.push(("price", price.normalize().to_string()));
            params.push(("timeInForce", "GTC".to_string()));
        }

        let response = self.signed_request(Method::POST, "/api/v3/order", &params).await?;
        Ok(response.json().await?)
    }

    pub async fn query_order(&self, symbol: &str, client_order_id: &str) -> Result<OrderResponse, AdapterError> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("origClientOrderId", client_order_id.to_string()),
        ];
        let response = self.signed_request(Method::GET, "/api/v3/order", &params).await?;
        Ok(response.json().await?)
    }
}

fn side_to_binance(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn order_type_to_binance(order_type: kestrel_schema::event::OrderType) -> &'static str {
    match order_type {
        kestrel_schema::event::OrderType::Market => "MARKET",
        kestrel_schema::event::OrderType::Limit => "LIMIT",
    }
}
