pub mod alert;
pub mod sample;

pub use alert::{AlertState, Session, SessionError, Signal, Thresholds};
pub use sample::PriceSample;
