//! Shared utilities.

pub mod time;

pub use time::{format_millis, Clock, SystemClock};
