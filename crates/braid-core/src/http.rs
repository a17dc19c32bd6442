//! Shared curl handle setup and response-header helpers.

use std::time::Duration;

use curl::easy::{Easy2, Handler};

/// Transfer options applied to every HEAD and GET handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            max_redirections: 10,
        }
    }
}

/// Configure URL, redirects, timeouts, user agent and the progress callback
/// (used for cancellation) on a fresh handle.
pub(crate) fn configure<H: Handler>(
    easy: &mut Easy2<H>,
    url: &str,
    user_agent: Option<&str>,
    opts: &HttpOptions,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    if let Some(ua) = user_agent {
        easy.useragent(ua)?;
    }
    easy.progress(true)?;
    Ok(())
}

/// Status code from an HTTP status line (`HTTP/1.1 206 Partial Content`).
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Collected header lines of the final response. A new status line (after a
/// redirect or `100 Continue`) starts over.
#[derive(Debug, Default)]
pub(crate) struct ResponseHeaders {
    pub(crate) status: Option<u32>,
    pub(crate) lines: Vec<String>,
}

impl ResponseHeaders {
    pub(crate) fn push_raw(&mut self, data: &[u8]) {
        let Ok(s) = std::str::from_utf8(data) else {
            return;
        };
        let line = s.trim_end();
        if let Some(code) = parse_status_line(line) {
            self.status = Some(code);
            self.lines.clear();
            return;
        }
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }
}
