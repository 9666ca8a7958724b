//! Progress line sink
//!
//! The poll loop, tracker and controller report human-readable progress
//! lines (startup banner, device deltas, transitions, failures) through an
//! injected [`LogSink`] instead of a global logger, so callers decide where
//! the lines end up.

use std::sync::Arc;

/// Callback receiving one single-line progress message.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink that forwards every line to `tracing` at info level.
pub fn tracing_sink() -> LogSink {
    Arc::new(|message: &str| tracing::info!("{}", message))
}

/// Capturing sink for tests
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CapturedLines {
    lines: Arc<parking_lot::Mutex<Vec<String>>>,
}

#[cfg(test)]
impl CapturedLines {
    pub(crate) fn sink(&self) -> LogSink {
        let lines = Arc::clone(&self.lines);
        Arc::new(move |message: &str| lines.lock().push(message.to_string()))
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}
