use chrono::{Duration, TimeZone, Utc};
use pricewatch::models::{PriceSample, Thresholds};
use pricewatch::services::{
    chart::{self, ChartError},
    price_store::PriceStore,
};

fn sample(asset: &str, price: f64, minute: i64) -> PriceSample {
    let base = Utc.with_ymd_and_hms(2026, 10, 19, 13, 0, 0).unwrap();
    PriceSample {
        asset: asset.to_string(),
        price,
        observed_at: base + Duration::minutes(minute),
    }
}

#[tokio::test]
async fn recent_returns_newest_first_for_one_asset() {
    let store = PriceStore::in_memory().await.unwrap();

    let written: Vec<PriceSample> = (0..5).map(|i| sample("PETR4", 28.0 + i as f64, i)).collect();
    for s in &written {
        store.record(s).await.unwrap();
    }
    store.record(&sample("VALE3", 60.0, 2)).await.unwrap();

    let read = store.recent("PETR4", 200).await.unwrap();
    let expected: Vec<PriceSample> = written.into_iter().rev().collect();
    assert_eq!(read, expected);
}

#[tokio::test]
async fn recent_honours_limit_and_ties_keep_insertion_order() {
    let store = PriceStore::in_memory().await.unwrap();

    let first = store.record(&sample("PETR4", 1.0, 0)).await.unwrap();
    let second = store.record(&sample("PETR4", 2.0, 0)).await.unwrap();
    store.record(&sample("PETR4", 3.0, 1)).await.unwrap();
    assert!(second > first);

    let read = store.recent("PETR4", 2).await.unwrap();
    let prices: Vec<f64> = read.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![3.0, 2.0]);
}

#[tokio::test]
async fn unknown_asset_has_no_history() {
    let store = PriceStore::in_memory().await.unwrap();
    assert!(store.recent("NOPE", 10).await.unwrap().is_empty());
}

#[test]
fn chart_is_written_and_removed_with_its_handle() {
    let t = Thresholds::new(30.0, 25.0).unwrap();
    let samples: Vec<PriceSample> = [27.0, 29.5, 31.2, 30.4, 24.1]
        .iter()
        .enumerate()
        .map(|(i, p)| sample("PETR4", *p, i as i64))
        .collect();

    let file = chart::render_to_temp("PETR4", &samples, &t).unwrap();
    let path = file.path().to_path_buf();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));

    drop(file);
    assert!(!path.exists());
}

#[test]
fn single_sample_chart_still_renders() {
    let t = Thresholds::new(30.0, 25.0).unwrap();
    let file = chart::render_to_temp("PETR4", &[sample("PETR4", 31.0, 0)], &t).unwrap();
    assert!(std::fs::metadata(file.path()).unwrap().len() > 0);
}

#[test]
fn empty_history_is_no_data() {
    let t = Thresholds::new(30.0, 25.0).unwrap();
    assert!(matches!(
        chart::render_to_temp("PETR4", &[], &t),
        Err(ChartError::NoData)
    ));
}
