//! Quote sources. Each one turns a ticker into a single current price.
//!
//! All failure modes collapse into [`QuoteError`]; the monitor logs it and
//! skips the tick.

use std::{future::Future, time::Duration};

use reqwest::Client;
use thiserror::Error;

use crate::config::{ProviderKind, QuoteSettings};

pub mod alpha_vantage;
pub mod finnhub;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageClient;
pub use finnhub::FinnhubClient;
pub use yahoo::YahooClient;

const USER_AGENT: &str = concat!("pricewatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("price missing for {0}")]
    MissingPrice(String),
    #[error("invalid price {0:?}")]
    InvalidPrice(String),
    #[error("API key is missing")]
    MissingApiKey,
}

pub trait QuoteSource {
    fn name(&self) -> &'static str;

    fn latest_price(&self, symbol: &str) -> impl Future<Output = Result<f64, QuoteError>> + Send;
}

/// The configured source, picked from `[quote] provider`.
#[derive(Clone)]
pub enum QuoteProvider {
    Yahoo(YahooClient),
    AlphaVantage(AlphaVantageClient),
    Finnhub(FinnhubClient),
}

impl QuoteProvider {
    pub fn from_settings(settings: &QuoteSettings) -> Result<Self, QuoteError> {
        let http = http_client(settings.timeout)?;
        let base_url = settings.base_url.clone();

        Ok(match settings.provider {
            ProviderKind::Yahoo => {
                let mut c = YahooClient::new(http, settings.suffix.clone());
                if let Some(url) = base_url {
                    c = c.with_base_url(url);
                }
                QuoteProvider::Yahoo(c)
            }
            ProviderKind::AlphaVantage => {
                let mut c = AlphaVantageClient::new(http, settings.api_key.clone())
                    .with_suffix(settings.suffix.clone());
                if let Some(url) = base_url {
                    c = c.with_base_url(url);
                }
                QuoteProvider::AlphaVantage(c)
            }
            ProviderKind::Finnhub => {
                let mut c = FinnhubClient::new(http, settings.api_key.clone())
                    .with_suffix(settings.suffix.clone());
                if let Some(url) = base_url {
                    c = c.with_base_url(url);
                }
                QuoteProvider::Finnhub(c)
            }
        })
    }
}

impl QuoteSource for QuoteProvider {
    fn name(&self) -> &'static str {
        match self {
            QuoteProvider::Yahoo(c) => c.name(),
            QuoteProvider::AlphaVantage(c) => c.name(),
            QuoteProvider::Finnhub(c) => c.name(),
        }
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        match self {
            QuoteProvider::Yahoo(c) => c.latest_price(symbol).await,
            QuoteProvider::AlphaVantage(c) => c.latest_price(symbol).await,
            QuoteProvider::Finnhub(c) => c.latest_price(symbol).await,
        }
    }
}

pub fn http_client(timeout: Duration) -> Result<Client, QuoteError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Reject prices that cannot be compared against thresholds.
pub(crate) fn checked_price(symbol: &str, price: f64) -> Result<f64, QuoteError> {
    if !price.is_finite() {
        return Err(QuoteError::InvalidPrice(price.to_string()));
    }
    if price <= 0.0 {
        return Err(QuoteError::MissingPrice(symbol.to_string()));
    }
    Ok(price)
}

/// Turn a non-2xx response into [`QuoteError::Status`], keeping the body.
pub(crate) async fn ensure_success(
    provider: &'static str,
    res: reqwest::Response,
) -> Result<reqwest::Response, QuoteError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(QuoteError::Status {
        provider,
        status,
        body,
    })
}
