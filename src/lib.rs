//! Library entrypoint for pricewatch.
//!
//! The binary in `main.rs` only wires these pieces together; integration
//! tests under `tests/` drive the same modules with stub quote sources and
//! notifiers.

pub mod config;
pub mod models;
pub mod services;
pub mod templates;

use thiserror::Error;

/// Anything that stops the process before monitoring starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid arguments: {0}")]
    Session(#[from] models::SessionError),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("email templates: {0}")]
    Templates(#[from] Box<handlebars::TemplateError>),
    #[error("email setup: {0}")]
    Mailer(#[from] services::mailer::NotifyError),
    #[error("quote client setup: {0}")]
    Quotes(#[from] services::quotes::QuoteError),
    #[error("price store: {0}")]
    Store(#[from] services::price_store::StoreError),
}
