//! Range fetch worker: one ranged GET streamed into the shared output file.
//!
//! Each chunk is written at `range.start + bytes_written_so_far`, then the
//! worker's stat slot is updated. Writes within a worker are strictly
//! sequential. The transfer is complete when curl reports end of data; the
//! byte count is then checked against the range length.

mod handler;

use curl::easy::Easy2;

use crate::control::CancelToken;
use crate::error::RangeError;
use crate::http::{self, HttpOptions};
use crate::segmenter::ByteRange;
use crate::stats::StatSlot;
use crate::storage::SharedFile;

use handler::RangeHandler;

/// Everything one worker needs. Borrowed request settings, owned shared handles.
pub struct RangeJob<'a> {
    pub url: &'a str,
    pub user_agent: Option<&'a str>,
    pub http: &'a HttpOptions,
    pub range: ByteRange,
    /// Length of the whole resource; a `200 OK` is acceptable only when the
    /// range covers all of it.
    pub content_length: u64,
    pub file: SharedFile,
    pub stat: StatSlot,
    pub cancel: CancelToken,
}

/// Fetch one range and write it into the shared file. No retry.
///
/// An empty range succeeds immediately without a request.
pub fn fetch_range(job: RangeJob<'_>) -> Result<(), RangeError> {
    let Some(curl_range) = job.range.curl_range() else {
        tracing::debug!(worker = job.stat.index(), "empty range, nothing to fetch");
        return Ok(());
    };
    if job.cancel.is_cancelled() {
        return Err(RangeError::Cancelled);
    }

    let whole_resource = job.range.start == 0 && job.range.end == job.content_length;
    let mut easy = Easy2::new(RangeHandler::new(
        job.range,
        whole_resource,
        job.file,
        job.stat,
        job.cancel,
    ));
    http::configure(&mut easy, job.url, job.user_agent, job.http)?;
    easy.get(true)?;
    easy.range(&curl_range)?;

    tracing::debug!(range = %job.range, "range GET started");
    let performed = easy.perform();
    let code = easy.response_code().unwrap_or(0);
    easy.get_mut().finish(performed, code)
}
