//! Routing log context.
//!
//! Provides context-aware logging with engine_id and event name included
//! in every log message.

use std::fmt;

/// Logging context for routing decisions.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub engine_id: String,
    pub event: Option<String>,
}

impl LogContext {
    pub fn new(engine_id: &str) -> Self {
        Self {
            engine_id: engine_id.to_string(),
            event: None,
        }
    }

    pub fn with_event(&self, event_name: &str) -> Self {
        Self {
            engine_id: self.engine_id.clone(),
            event: Some(event_name.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            Some(name) => write!(f, "[engine={}] [event={}]", self.engine_id, name),
            None => write!(f, "[engine={}]", self.engine_id),
        }
    }
}

/// Initialize the crate-level logger.
///
/// Safe to call more than once; later calls are no-ops. Host applications
/// that install their own `log` backend can skip this entirely.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_display() {
        let ctx = LogContext::new("engine-ab12cd34");
        assert_eq!(format!("{}", ctx), "[engine=engine-ab12cd34]");

        let ctx_with_event = ctx.with_event("checkout_completed");
        assert_eq!(
            format!("{}", ctx_with_event),
            "[engine=engine-ab12cd34] [event=checkout_completed]"
        );
    }
}
