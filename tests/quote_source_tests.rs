use std::{collections::HashMap, time::Duration};

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use pricewatch::config::{ProviderKind, QuoteSettings};
use pricewatch::services::quotes::{
    alpha_vantage::parse_global_quote, http_client, yahoo::parse_chart, AlphaVantageClient,
    FinnhubClient, QuoteError, QuoteProvider, QuoteSource, YahooClient,
};
use serde_json::json;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn chart(Path(ticker): Path<String>) -> impl IntoResponse {
    if ticker == "PETR4.SA" {
        let body = json!({
            "chart": {
                "result": [{ "meta": { "symbol": "PETR4.SA", "regularMarketPrice": 31.25 } }],
                "error": null
            }
        });
        (StatusCode::OK, Json(body))
    } else {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        (StatusCode::NOT_FOUND, Json(body))
    }
}

async fn alpha(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    assert_eq!(q.get("function").map(String::as_str), Some("GLOBAL_QUOTE"));
    if q.get("apikey").map(String::as_str) != Some("secret") {
        return Json(json!({ "Error Message": "the parameter apikey is invalid or missing" }));
    }
    if q.get("symbol").map(String::as_str) != Some("PETR4.SA") {
        return Json(json!({ "Global Quote": {} }));
    }
    Json(json!({
        "Global Quote": {
            "01. symbol": q.get("symbol"),
            "05. price": "27.4100",
            "07. latest trading day": "2026-10-16"
        }
    }))
}

async fn finnhub(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let c = match q.get("symbol").map(String::as_str) {
        Some("AAPL") => 212.5,
        Some("PETR4.SA") => 31.3,
        _ => 0.0,
    };
    Json(json!({ "c": c, "d": null, "dp": null, "h": c, "l": c, "o": c, "pc": c, "t": 0 }))
}

fn stub_router() -> Router {
    Router::new()
        .route("/v8/finance/chart/:ticker", get(chart))
        .route("/query", get(alpha))
        .route("/api/v1/quote", get(finnhub))
}

fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn yahoo_appends_suffix_and_reads_market_price() {
    let base = spawn_stub(stub_router()).await;
    let yahoo = YahooClient::new(client(), ".SA".to_string()).with_base_url(&base);

    let price = yahoo.latest_price("PETR4").await.unwrap();
    assert_eq!(price, 31.25);
}

#[tokio::test]
async fn yahoo_unknown_symbol_is_a_status_error() {
    let base = spawn_stub(stub_router()).await;
    let yahoo = YahooClient::new(client(), String::new()).with_base_url(&base);

    match yahoo.latest_price("NOPE").await {
        Err(QuoteError::Status { status, provider, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(provider, "yahoo");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn alpha_vantage_parses_string_price() {
    let base = spawn_stub(stub_router()).await;
    let av = AlphaVantageClient::new(client(), "secret".to_string()).with_base_url(&base);
    assert_eq!(av.latest_price("PETR4.SA").await.unwrap(), 27.41);

    let bad_key = AlphaVantageClient::new(client(), "wrong".to_string()).with_base_url(&base);
    assert!(matches!(
        bad_key.latest_price("PETR4.SA").await,
        Err(QuoteError::Provider(_))
    ));
}

#[tokio::test]
async fn finnhub_zero_quote_means_missing() {
    let base = spawn_stub(stub_router()).await;
    let fh = FinnhubClient::new(client(), "k".to_string()).with_base_url(&base);

    assert_eq!(fh.latest_price("AAPL").await.unwrap(), 212.5);
    assert!(matches!(
        fh.latest_price("ZZZZ").await,
        Err(QuoteError::MissingPrice(_))
    ));
}

#[tokio::test]
async fn provider_is_built_from_settings() {
    let base = spawn_stub(stub_router()).await;
    let settings = QuoteSettings {
        provider: ProviderKind::Yahoo,
        api_key: String::new(),
        suffix: ".SA".to_string(),
        base_url: Some(base),
        timeout: Duration::from_secs(5),
    };

    let provider = QuoteProvider::from_settings(&settings).unwrap();
    assert_eq!(provider.name(), "yahoo");
    assert_eq!(provider.latest_price("PETR4").await.unwrap(), 31.25);
}

#[tokio::test]
async fn keyed_providers_append_the_configured_suffix() {
    let base = spawn_stub(stub_router()).await;
    let settings = |provider| QuoteSettings {
        provider,
        api_key: "secret".to_string(),
        suffix: ".SA".to_string(),
        base_url: Some(base.clone()),
        timeout: Duration::from_secs(5),
    };

    let av = QuoteProvider::from_settings(&settings(ProviderKind::AlphaVantage)).unwrap();
    assert_eq!(av.name(), "alphavantage");
    assert_eq!(av.latest_price("PETR4").await.unwrap(), 27.41);

    let fh = QuoteProvider::from_settings(&settings(ProviderKind::Finnhub)).unwrap();
    assert_eq!(fh.name(), "finnhub");
    assert_eq!(fh.latest_price("PETR4").await.unwrap(), 31.3);

    // without the suffix the stubs do not know the bare ticker
    let bare = AlphaVantageClient::new(client(), "secret".to_string()).with_base_url(&base);
    assert!(matches!(
        bare.latest_price("PETR4").await,
        Err(QuoteError::MissingPrice(_))
    ));
}

#[tokio::test]
async fn unreachable_host_is_an_http_error() {
    let yahoo = YahooClient::new(client(), String::new()).with_base_url("http://127.0.0.1:1");
    assert!(matches!(
        yahoo.latest_price("PETR4").await,
        Err(QuoteError::Http(_))
    ));
}

#[test]
fn global_quote_edge_cases() {
    assert!(matches!(
        parse_global_quote("X", r#"{"Global Quote": {}}"#),
        Err(QuoteError::MissingPrice(_))
    ));
    assert!(matches!(
        parse_global_quote("X", r#"{"Global Quote": {"05. price": "n/a"}}"#),
        Err(QuoteError::InvalidPrice(_))
    ));
    assert!(matches!(
        parse_global_quote("X", r#"{"Note": "Thank you for using Alpha Vantage! rate limit"}"#),
        Err(QuoteError::Provider(_))
    ));
    assert!(matches!(
        parse_global_quote("X", "<html>"),
        Err(QuoteError::Payload(_))
    ));
    assert_eq!(
        parse_global_quote("X", r#"{"Global Quote": {"05. price": " 10.5000 "}}"#).unwrap(),
        10.5
    );
}

#[test]
fn chart_payload_without_price_is_missing() {
    let body = r#"{"chart": {"result": [{"meta": {"symbol": "X"}}], "error": null}}"#;
    assert!(matches!(parse_chart("X", body), Err(QuoteError::MissingPrice(_))));

    let body = r#"{"chart": {"result": [], "error": null}}"#;
    assert!(matches!(parse_chart("X", body), Err(QuoteError::MissingPrice(_))));

    let body = r#"{"chart": {"result": [{"meta": {"regularMarketPrice": -1.0}}], "error": null}}"#;
    assert!(parse_chart("X", body).is_err());
}
