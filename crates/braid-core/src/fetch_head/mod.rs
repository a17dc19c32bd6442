//! HTTP HEAD probing.
//!
//! Discovers the resource length before planning ranges. Uses the curl crate
//! (libcurl), with the same user agent, timeouts and cancellation as the
//! range workers.

mod parse;

use curl::easy::{Easy2, Handler};

use crate::control::CancelToken;
use crate::error::FetchError;
use crate::http::{self, HttpOptions, ResponseHeaders};

pub use parse::parse_headers;

/// Headers of interest from the HEAD response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes from `Content-Length`.
    pub content_length: u64,
    /// True if the server sent `Accept-Ranges: bytes`. Informational only:
    /// many servers honour `Range` without advertising it.
    pub accept_ranges: bool,
}

struct HeadHandler {
    headers: ResponseHeaders,
    cancel: CancelToken,
}

impl Handler for HeadHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        self.headers.push_raw(data);
        true
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Performs a HEAD request and returns the resource length.
///
/// Follows redirects; the headers of the final response are used. Runs in the
/// current thread; call from `spawn_blocking` if used from async code.
pub fn probe(
    url: &str,
    user_agent: Option<&str>,
    opts: &HttpOptions,
    cancel: &CancelToken,
) -> Result<HeadResult, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let mut easy = Easy2::new(HeadHandler {
        headers: ResponseHeaders::default(),
        cancel: cancel.clone(),
    });
    http::configure(&mut easy, url, user_agent, opts).map_err(FetchError::Head)?;
    easy.nobody(true).map_err(FetchError::Head)?;

    if let Err(e) = easy.perform() {
        if e.is_aborted_by_callback() && cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        return Err(FetchError::Head(e));
    }

    let code = easy.response_code().map_err(FetchError::Head)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::HeadStatus {
            url: url.to_string(),
            code,
        });
    }

    parse_headers(&easy.get_ref().headers.lines)
}
