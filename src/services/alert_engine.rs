use crate::models::{AlertState, Session, Signal, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: AlertState,
    pub signal: Option<Signal>,
}

/// Decide what a new price means given the last alert fired.
///
/// - above sell: fire once, then stay quiet until the price is back in band
/// - below buy: same, in the other direction
/// - back in `[buy, sell]`: reset to `Clear` without alerting
pub fn evaluate(last: AlertState, price: f64, thresholds: &Thresholds) -> Transition {
    if price > thresholds.sell() && last != AlertState::SellFired {
        return Transition {
            next: AlertState::SellFired,
            signal: Some(Signal::Sell),
        };
    }

    if price < thresholds.buy() && last != AlertState::BuyFired {
        return Transition {
            next: AlertState::BuyFired,
            signal: Some(Signal::Buy),
        };
    }

    if thresholds.contains(price) && last != AlertState::Clear {
        return Transition {
            next: AlertState::Clear,
            signal: None,
        };
    }

    Transition {
        next: last,
        signal: None,
    }
}

impl Session {
    /// Feed one price through [`evaluate`] and keep the resulting state.
    pub fn observe(&mut self, price: f64) -> Option<Signal> {
        let t = evaluate(self.last_alert, price, &self.thresholds);
        if t.next == AlertState::Clear && self.last_alert != AlertState::Clear {
            tracing::info!(asset = %self.asset, price, "price back in range, alerts reset");
        }
        self.last_alert = t.next;
        t.signal
    }
}
