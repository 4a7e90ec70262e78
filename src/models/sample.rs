use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub asset: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceSample {
    pub fn now(asset: &str, price: f64) -> Self {
        Self {
            asset: asset.to_string(),
            price,
            observed_at: Utc::now(),
        }
    }
}
