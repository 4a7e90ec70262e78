use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pricewatch::{
    config,
    models::{Session, Thresholds},
    services::{
        alert_monitor::{History, Monitor},
        mailer::{Notification, SmtpMailer},
        price_store::PriceStore,
        quotes::{QuoteProvider, QuoteSource},
    },
    templates::{self, EmailTemplates},
    AppError,
};

/// Watch one instrument and email when it crosses a sell or buy target.
#[derive(Parser, Debug)]
#[command(name = "pricewatch", version)]
#[command(about = "Email alerts when a price crosses your sell or buy target", long_about = None)]
struct Args {
    /// Asset to monitor (e.g. PETR4)
    #[arg(short, long)]
    asset: String,

    /// Sell target: alert when the price goes above it
    #[arg(long)]
    sell: f64,

    /// Buy target: alert when the price goes below it
    #[arg(long)]
    buy: f64,

    /// Configuration file path
    #[arg(short, long, default_value = "config.ini")]
    config: PathBuf,

    /// Log level when RUST_LOG is unset: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let thresholds = Thresholds::new(args.sell, args.buy)?;
    let session = Session::new(&args.asset, thresholds)?;

    let settings = config::load(&args.config)?;

    let quotes = QuoteProvider::from_settings(&settings.quote)?;
    let mailer = SmtpMailer::new(&settings.smtp, &settings.email)?;
    let hbs = templates::build_handlebars().map_err(Box::new)?;
    let email_templates = EmailTemplates::new(hbs, settings.email.currency.clone());

    let history = if settings.storage.enabled {
        let store = PriceStore::open(&settings.storage.database).await?;
        info!(database = %settings.storage.database, "price history enabled");
        Some(History {
            store,
            rows: settings.storage.history,
        })
    } else {
        None
    };

    let provider = quotes.name();
    let mut monitor = Monitor::new(session, quotes, mailer, email_templates.clone());
    if let Some(h) = history.clone() {
        monitor = monitor.with_history(h);
    }

    if settings.monitor.startup_notice {
        info!(recipient = %settings.email.recipient, "sending startup notice");
        match email_templates.started(
            monitor.session(),
            settings.monitor.interval.as_secs(),
            provider,
        ) {
            Ok(r) => {
                monitor.deliver(&Notification::new(r.subject, r.body)).await;
            }
            Err(e) => error!("could not render startup notice: {}", e),
        }
    }

    info!("--- Starting monitoring ---");
    info!("Asset: {}", monitor.session().asset);
    info!("Sell target: > {}", email_templates.money(thresholds.sell()));
    info!("Buy target:  < {}", email_templates.money(thresholds.buy()));
    info!("Source: {} every {}s", provider, settings.monitor.interval.as_secs());
    info!("---------------------------");

    tokio::select! {
        _ = monitor.run(settings.monitor.interval) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping");
        }
    }

    if let Some(h) = history {
        h.store.close().await;
    }

    Ok(())
}
