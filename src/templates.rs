use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::json;
use std::sync::Arc;

use crate::models::{PriceSample, Session, Signal};

pub type Hbs = Arc<Handlebars<'static>>;

pub fn build_handlebars() -> Result<Hbs, TemplateError> {
    let mut hb = Handlebars::new();
    // plain-text mail, nothing to escape
    hb.register_escape_fn(handlebars::no_escape);
    hb.set_strict_mode(true);

    hb.register_template_string("emails/sell", include_str!("../templates/emails/sell.hbs"))?;
    hb.register_template_string("emails/buy", include_str!("../templates/emails/buy.hbs"))?;
    hb.register_template_string(
        "emails/started",
        include_str!("../templates/emails/started.hbs"),
    )?;

    hb.register_template_string("subjects/sell", "SELL ALERT: {{asset}}")?;
    hb.register_template_string("subjects/buy", "BUY ALERT: {{asset}}")?;
    hb.register_template_string("subjects/started", "Price monitoring started: {{asset}}")?;

    Ok(Arc::new(hb))
}

/// Subject and body for outgoing mail.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

/// Renders alert and notice emails with prices formatted to two decimals,
/// prefixed by the configured currency label.
#[derive(Clone)]
pub struct EmailTemplates {
    hbs: Hbs,
    currency: String,
}

impl EmailTemplates {
    pub fn new(hbs: Hbs, currency: impl Into<String>) -> Self {
        Self {
            hbs,
            currency: currency.into(),
        }
    }

    pub fn money(&self, x: f64) -> String {
        if self.currency.is_empty() {
            format!("{:.2}", x)
        } else {
            format!("{} {:.2}", self.currency, x)
        }
    }

    pub fn alert(
        &self,
        session: &Session,
        signal: Signal,
        sample: &PriceSample,
    ) -> Result<Rendered, RenderError> {
        let (target, other) = match signal {
            Signal::Sell => (session.thresholds.sell(), session.thresholds.buy()),
            Signal::Buy => (session.thresholds.buy(), session.thresholds.sell()),
        };

        let ctx = json!({
            "asset": session.asset,
            "target": self.money(target),
            "other_target": self.money(other),
            "price": self.money(sample.price),
            "observed_at": sample.observed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        });

        let kind = signal.as_str();
        Ok(Rendered {
            subject: self.hbs.render(&format!("subjects/{kind}"), &ctx)?,
            body: self.hbs.render(&format!("emails/{kind}"), &ctx)?,
        })
    }

    pub fn started(
        &self,
        session: &Session,
        interval_secs: u64,
        provider: &str,
    ) -> Result<Rendered, RenderError> {
        let ctx = json!({
            "asset": session.asset,
            "sell": self.money(session.thresholds.sell()),
            "buy": self.money(session.thresholds.buy()),
            "interval_secs": interval_secs,
            "provider": provider,
        });

        Ok(Rendered {
            subject: self.hbs.render("subjects/started", &ctx)?,
            body: self.hbs.render("emails/started", &ctx)?,
        })
    }
}
