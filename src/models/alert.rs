use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^?[A-Z0-9][A-Z0-9.\-=]{0,19}$").expect("symbol regex"));

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("asset symbol is required")]
    MissingAsset,
    #[error("invalid asset symbol: {0}")]
    InvalidAsset(String),
    #[error("{0} price must be a non-zero number")]
    InvalidPrice(&'static str),
    #[error("buy price ({buy:.2}) must be lower than sell price ({sell:.2})")]
    Inverted { sell: f64, buy: f64 },
}

/// Sell and buy targets for one instrument. `sell > buy` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    sell: f64,
    buy: f64,
}

impl Thresholds {
    pub fn new(sell: f64, buy: f64) -> Result<Self, SessionError> {
        if !sell.is_finite() || sell == 0.0 {
            return Err(SessionError::InvalidPrice("sell"));
        }
        if !buy.is_finite() || buy == 0.0 {
            return Err(SessionError::InvalidPrice("buy"));
        }
        if buy >= sell {
            return Err(SessionError::Inverted { sell, buy });
        }
        Ok(Self { sell, buy })
    }

    pub fn sell(&self) -> f64 {
        self.sell
    }

    pub fn buy(&self) -> f64 {
        self.buy
    }

    /// True when `price` lies inside `[buy, sell]`.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.buy && price <= self.sell
    }
}

/// Which alert fired last. Repeated breaches in the same direction are muted
/// until the price comes back into the band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Clear,
    SellFired,
    BuyFired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Sell,
    Buy,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Sell => "sell",
            Signal::Buy => "buy",
        }
    }
}

/// One monitoring run: the instrument, its targets and the last alert fired.
#[derive(Debug, Clone)]
pub struct Session {
    pub asset: String,
    pub thresholds: Thresholds,
    pub last_alert: AlertState,
}

impl Session {
    pub fn new(asset: &str, thresholds: Thresholds) -> Result<Self, SessionError> {
        let asset = asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(SessionError::MissingAsset);
        }
        if !SYMBOL_RE.is_match(&asset) {
            return Err(SessionError::InvalidAsset(asset));
        }

        Ok(Self {
            asset,
            thresholds,
            last_alert: AlertState::Clear,
        })
    }
}
