use reqwest::Client;
use serde::Deserialize;

use super::{checked_price, ensure_success, QuoteError, QuoteSource};

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

#[derive(Clone)]
pub struct AlphaVantageClient {
    http: Client,
    api_key: String,
    suffix: String,
    base_url: String,
}

impl AlphaVantageClient {
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
}

impl QuoteSource for AlphaVantageClient {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        if self.api_key.trim().is_empty() {
            return Err(QuoteError::MissingApiKey);
        }

        let ticker = format!("{symbol}{}", self.suffix);
        let url = format!("{}/query", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", ticker.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body = ensure_success("alphavantage", res).await?.text().await?;
        parse_global_quote(&ticker, &body)
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

/// Extract the string at `"Global Quote"."05. price"` as a number.
///
/// Rate limiting and bad keys come back as 200 with a `Note`, `Information`
/// or `Error Message` field instead of a quote.
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<f64, QuoteError> {
    let resp: GlobalQuoteResponse = serde_json::from_str(body)?;

    if let Some(msg) = resp.error_message.or(resp.note).or(resp.information) {
        return Err(QuoteError::Provider(msg));
    }

    let raw = resp
        .global_quote
        .and_then(|q| q.price)
        .ok_or_else(|| QuoteError::MissingPrice(symbol.to_string()))?;

    let price = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| QuoteError::InvalidPrice(raw.clone()))?;

    checked_price(symbol, price)
}
