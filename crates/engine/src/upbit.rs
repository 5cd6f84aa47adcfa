use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Error, FetchError, PriceSource, Result};

/// Public ticker client for Upbit. Only reads prices; never places orders.
pub struct UpbitClient {
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl UpbitClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    fn ticker_url(&self) -> String {
        format!("{}/v1/ticker", self.base_url)
    }
}

#[async_trait]
impl PriceSource for UpbitClient {
    async fn fetch(&self, market: &str) -> Result<f64, FetchError> {
        debug!(%market, "Fetching Upbit ticker");
        let resp = self
            .http
            .get(self.ticker_url())
            .query(&[("markets", market)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_trade_price(&body)
    }
}

impl UpbitClient {
    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Extract `trade_price` from the first element of a ticker response.
pub fn parse_trade_price(body: &str) -> Result<f64, FetchError> {
    let tickers: Vec<Ticker> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let ticker = tickers.into_iter().next().ok_or(FetchError::Empty)?;
    if !ticker.trade_price.is_finite() {
        return Err(FetchError::Decode(format!(
            "non-finite trade_price {}",
            ticker.trade_price
        )));
    }
    Ok(ticker.trade_price)
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Ticker {
    trade_price: f64,
}
