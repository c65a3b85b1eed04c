//! Structured logging with routing context.
//!
//! Provides a logging context that includes engine_id and event name
//! in every log message so routing decisions are easy to correlate.

pub mod context;

pub use context::{init_logging, LogContext};
