use reqwest::Client;
use serde::Deserialize;

use super::{checked_price, ensure_success, QuoteError, QuoteSource};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart endpoint. No API key; exchange suffixes such as `.SA`
/// (B3) are appended to every symbol.
#[derive(Clone)]
pub struct YahooClient {
    http: Client,
    suffix: String,
    base_url: String,
}

impl YahooClient {
    pub fn new(http: Client, suffix: String) -> Self {
        Self {
            http,
            suffix,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn ticker(&self, symbol: &str) -> String {
        format!("{symbol}{}", self.suffix)
    }
}

impl QuoteSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let ticker = self.ticker(symbol);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let res = self
            .http
            .get(url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?;

        let body = ensure_success("yahoo", res).await?.text().await?;
        parse_chart(&ticker, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartFailure>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartFailure {
    code: String,
    description: String,
}

/// Extract `chart.result[0].meta.regularMarketPrice`.
pub fn parse_chart(ticker: &str, body: &str) -> Result<f64, QuoteError> {
    let resp: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = resp.chart.error {
        return Err(QuoteError::Provider(format!("{}: {}", err.code, err.description)));
    }

    let price = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .and_then(|r| r.meta.regular_market_price)
        .ok_or_else(|| QuoteError::MissingPrice(ticker.to_string()))?;

    checked_price(ticker, price)
}
