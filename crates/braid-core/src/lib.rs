//! braid: fetch a single HTTP resource using several parallel range requests.
//!
//! The entry point is [`Request`]: configure it, call [`Request::fetch_file`],
//! and poll [`Request::stats`] from another thread while it runs.

pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod fetch_head;
pub mod http;
pub mod logging;
pub mod request;
pub mod segmenter;
pub mod stats;
pub mod storage;
pub mod worker;

pub use control::CancelToken;
pub use error::{FetchError, RangeError, RangeFailure, RangeFailures};
pub use request::{FetchPhase, Request, DEFAULT_JOBS};
pub use stats::Stat;
