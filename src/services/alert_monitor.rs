use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    models::{PriceSample, Session, Signal},
    services::{
        chart,
        mailer::{Notification, Notifier},
        price_store::PriceStore,
        quotes::QuoteSource,
    },
    templates::EmailTemplates,
};

/// Optional sample persistence plus chart attachments.
#[derive(Clone)]
pub struct History {
    pub store: PriceStore,
    /// How many recent samples go into the chart.
    pub rows: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The quote could not be fetched; nothing changed.
    Skipped,
    Observed {
        price: f64,
        signal: Option<Signal>,
        notified: bool,
    },
}

pub struct Monitor<Q, N> {
    session: Session,
    quotes: Q,
    notifier: N,
    templates: EmailTemplates,
    history: Option<History>,
}

impl<Q: QuoteSource, N: Notifier> Monitor<Q, N> {
    pub fn new(session: Session, quotes: Q, notifier: N, templates: EmailTemplates) -> Self {
        Self {
            session,
            quotes,
            notifier,
            templates,
            history: None,
        }
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Poll forever. The first sample is taken immediately; a slow tick
    /// pushes the next one back instead of bunching them up.
    pub async fn run(mut self, every: Duration) {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.run_tick().await;
        }
    }

    /// fetch -> persist -> evaluate -> notify
    pub async fn run_tick(&mut self) -> TickOutcome {
        let asset = self.session.asset.clone();

        let price = match self.quotes.latest_price(&asset).await {
            Ok(p) => p,
            Err(e) => {
                warn!(asset = %asset, source = self.quotes.name(), "quote fetch failed: {}", e);
                return TickOutcome::Skipped;
            }
        };
        info!(asset = %asset, "current price {}", self.templates.money(price));

        let sample = PriceSample::now(&asset, price);

        if let Some(h) = &self.history {
            if let Err(e) = h.store.record(&sample).await {
                error!(asset = %asset, "could not persist sample: {}", e);
            }
        }

        let Some(signal) = self.session.observe(price) else {
            return TickOutcome::Observed {
                price,
                signal: None,
                notified: false,
            };
        };

        match signal {
            Signal::Sell => info!(asset = %asset, "!!! SELL TARGET REACHED !!!"),
            Signal::Buy => info!(asset = %asset, "!!! BUY TARGET REACHED !!!"),
        }

        let notified = self.notify_alert(signal, &sample).await;
        TickOutcome::Observed {
            price,
            signal: Some(signal),
            notified,
        }
    }

    async fn notify_alert(&self, signal: Signal, sample: &PriceSample) -> bool {
        let rendered = match self.templates.alert(&self.session, signal, sample) {
            Ok(r) => r,
            Err(e) => {
                error!("could not render {} alert: {}", signal.as_str(), e);
                return false;
            }
        };

        let mut notification = Notification::new(rendered.subject, rendered.body);

        // Held until the mail is out; dropping it removes the file.
        let chart_file = self.chart().await;
        if let Some(file) = &chart_file {
            notification = notification.with_attachment(file.path());
        }

        self.deliver(&notification).await
    }

    async fn chart(&self) -> Option<tempfile::NamedTempFile> {
        let h = self.history.as_ref()?;
        let asset = &self.session.asset;

        let mut samples = match h.store.recent(asset, h.rows).await {
            Ok(s) => s,
            Err(e) => {
                warn!(asset = %asset, "could not load history for chart: {}", e);
                return None;
            }
        };
        samples.reverse();

        match chart::render_to_temp(asset, &samples, &self.session.thresholds) {
            Ok(file) => {
                debug!(path = %file.path().display(), "chart rendered");
                Some(file)
            }
            Err(e) => {
                warn!(asset = %asset, "chart failed, sending without attachment: {}", e);
                None
            }
        }
    }

    /// Send once; failures are logged and reported as `false`.
    pub async fn deliver(&self, notification: &Notification) -> bool {
        match self.notifier.send(notification).await {
            Ok(()) => {
                info!(subject = %notification.subject, "email sent");
                true
            }
            Err(e) => {
                error!(subject = %notification.subject, "failed to send email: {}", e);
                false
            }
        }
    }
}
