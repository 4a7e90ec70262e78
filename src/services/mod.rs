pub mod alert_engine;
pub mod alert_monitor;
pub mod chart;
pub mod mailer;
pub mod price_store;
pub mod quotes;
