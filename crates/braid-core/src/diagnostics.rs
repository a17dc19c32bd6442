//! Optional per-request diagnostic sink.
//!
//! Silent unless a sink is installed with [`Request::set_log_sink`]. Every line
//! handed to the sink starts with [`LOG_PREFIX`] so callers can tell braid's
//! output apart from their own.
//!
//! [`Request::set_log_sink`]: crate::Request::set_log_sink

use std::fmt;
use std::sync::Arc;

/// Prefix of every line sent to a diagnostic sink.
pub const LOG_PREFIX: &str = "braid: ";

type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Cloneable handle to the sink (or to nothing).
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Sink>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Format and emit one line. No formatting happens when no sink is installed.
    pub fn emit(&self, args: fmt::Arguments<'_>) {
        if let Some(sink) = &self.sink {
            sink(&format!("{}{}", LOG_PREFIX, args));
        }
    }
}
