//! Error types for a fetch and for individual range workers.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::segmenter::ByteRange;

/// Failure of one range worker. Collected by the coordinator; never stops siblings.
#[derive(Debug, Error)]
pub enum RangeError {
    /// Curl reported a transport error (connect, timeout, reset, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Non-2xx response status.
    #[error("HTTP {0}")]
    Http(u32),
    /// 2xx status that is not a partial response for this range (server ignored `Range`).
    #[error("server answered range request with HTTP {0} instead of 206")]
    InvalidRangeResponse(u32),
    /// 206 response whose `Content-Range` does not match the requested range.
    #[error("Content-Range {got:?} does not match requested range {expected}")]
    ContentRangeMismatch { expected: ByteRange, got: String },
    /// Transfer ended before the whole range arrived.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Server sent more bytes than the range holds.
    #[error("range overrun: expected {expected} bytes, server sent more")]
    Overrun { expected: u64 },
    /// Positioned write failed or was short.
    #[error("storage: {0}")]
    Storage(#[source] io::Error),
    #[error("cancelled")]
    Cancelled,
    /// The worker thread could not be started or panicked.
    #[error("worker thread failed: {0}")]
    Panicked(String),
}

/// A worker failure tagged with its worker index and range.
#[derive(Debug)]
pub struct RangeFailure {
    pub index: usize,
    pub range: ByteRange,
    pub error: RangeError,
}

impl fmt::Display for RangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range {} {}: {}", self.index, self.range, self.error)
    }
}

/// All worker failures of one fetch, in the order they were reported.
/// Displays as one message per line.
#[derive(Debug, Default)]
pub struct RangeFailures(Vec<RangeFailure>);

impl RangeFailures {
    pub(crate) fn push(&mut self, failure: RangeFailure) {
        self.0.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RangeFailure> {
        self.0.iter()
    }
}

impl fmt::Display for RangeFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RangeFailures {
    type Item = &'a RangeFailure;
    type IntoIter = std::slice::Iter<'a, RangeFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Error returned by [`Request::fetch_file`](crate::Request::fetch_file).
///
/// Everything except [`FetchError::Partial`] happens before any worker starts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot preallocate {}: {source}", path.display())]
    Preallocate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("error fetching HEAD: {0}")]
    Head(#[source] curl::Error),
    #[error("HEAD {url} returned HTTP {code}")]
    HeadStatus { url: String, code: u32 },
    #[error("HEAD response has no Content-Length header")]
    MissingContentLength,
    #[error("invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),
    #[error("fetch cancelled")]
    Cancelled,
    /// Some workers failed. The (partially written) file is still handed back.
    #[error("{failures}")]
    Partial { file: File, failures: RangeFailures },
}

impl FetchError {
    /// Take the output file out of a partial failure, so the caller can inspect
    /// or remove it.
    pub fn into_file(self) -> Option<File> {
        match self {
            FetchError::Partial { file, .. } => Some(file),
            _ => None,
        }
    }

    pub fn failures(&self) -> Option<&RangeFailures> {
        match self {
            FetchError::Partial { failures, .. } => Some(failures),
            _ => None,
        }
    }
}
