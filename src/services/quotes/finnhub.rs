use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{checked_price, ensure_success, QuoteError, QuoteSource};

const DEFAULT_BASE_URL: &str = "https://finnhub.io";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
    suffix: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            suffix: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Exchange suffix appended to every symbol, as configured.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::MissingApiKey);
        }

        let ticker = format!("{symbol}{}", self.suffix);
        let url = format!("{}/api/v1/quote", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("symbol", ticker.as_str()), ("token", self.api_key.as_str())])
            .send()
            .await?;

        let body = ensure_success("finnhub", res).await?.text().await?;
        Ok(serde_json::from_str::<QuoteResponse>(&body)?)
    }
}

impl QuoteSource for FinnhubClient {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let quote = self.quote(symbol).await?;
        // finnhub answers unknown symbols with an all-zero quote
        checked_price(symbol, quote.c)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    pub d: Option<f64>,
    // percent change
    pub dp: Option<f64>,
    // high
    pub h: f64,
    // low
    pub l: f64,
    // open
    pub o: f64,
    // previous close
    pub pc: f64,
    // timestamp
    pub t: i64,
}
