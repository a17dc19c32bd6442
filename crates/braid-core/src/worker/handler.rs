//! curl `Handler` for one range transfer.
//! Validates the response before the first write; writes to storage at the range offset.

use curl::easy::{Handler, WriteError};

use crate::control::CancelToken;
use crate::error::RangeError;
use crate::http::ResponseHeaders;
use crate::segmenter::ByteRange;
use crate::stats::StatSlot;
use crate::storage::SharedFile;

pub(super) struct RangeHandler {
    range: ByteRange,
    whole_resource: bool,
    file: SharedFile,
    stat: StatSlot,
    cancel: CancelToken,
    headers: ResponseHeaders,
    /// None = not yet checked (no body seen); Some(false) = rejected, abort.
    accepted: Option<bool>,
    written: u64,
    /// First failure seen inside a callback; takes precedence over curl's own error.
    failure: Option<RangeError>,
}

impl RangeHandler {
    pub(super) fn new(
        range: ByteRange,
        whole_resource: bool,
        file: SharedFile,
        stat: StatSlot,
        cancel: CancelToken,
    ) -> Self {
        Self {
            range,
            whole_resource,
            file,
            stat,
            cancel,
            headers: ResponseHeaders::default(),
            accepted: None,
            written: 0,
            failure: None,
        }
    }

    fn check_response(&self, status: u32) -> Result<(), RangeError> {
        match status {
            206 => self.check_content_range(),
            200 if self.whole_resource => Ok(()),
            200..=299 => Err(RangeError::InvalidRangeResponse(status)),
            _ => Err(RangeError::Http(status)),
        }
    }

    /// `Content-Range: bytes a-b/total` must name exactly the requested range.
    /// A 206 without the header is accepted.
    fn check_content_range(&self) -> Result<(), RangeError> {
        let Some(value) = self.headers.lines.iter().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-range")
                .then(|| value.trim())
        }) else {
            return Ok(());
        };
        let matches = parse_content_range(value)
            .map(|(start, end_incl)| {
                start == self.range.start && end_incl.checked_add(1) == Some(self.range.end)
            })
            .unwrap_or(false);
        if matches {
            Ok(())
        } else {
            Err(RangeError::ContentRangeMismatch {
                expected: self.range,
                got: value.to_string(),
            })
        }
    }

    fn reject(&mut self, err: RangeError) {
        tracing::debug!(range = %self.range, error = %err, "aborting range transfer");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    /// Called once `perform` has returned (end of data or error).
    pub(super) fn finish(
        &mut self,
        performed: Result<(), curl::Error>,
        code: u32,
    ) -> Result<(), RangeError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        if let Err(e) = performed {
            if e.is_aborted_by_callback() && self.cancel.is_cancelled() {
                return Err(RangeError::Cancelled);
            }
            return Err(RangeError::Curl(e));
        }
        // No body arrived: the status has not been looked at yet.
        if self.accepted.is_none() {
            self.check_response(self.headers.status.unwrap_or(code))?;
        }
        let expected = self.range.len();
        if self.written != expected {
            return Err(RangeError::PartialTransfer {
                expected,
                received: self.written,
            });
        }
        Ok(())
    }
}

impl Handler for RangeHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        self.headers.push_raw(data);
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.accepted.is_none() {
            let checked = match self.headers.status {
                Some(status) => self.check_response(status),
                None => Err(RangeError::Http(0)),
            };
            self.accepted = Some(checked.is_ok());
            if let Err(e) = checked {
                self.reject(e);
            }
        }
        if self.accepted == Some(false) {
            return Ok(0);
        }

        let expected = self.range.len();
        if self.written + data.len() as u64 > expected {
            self.reject(RangeError::Overrun { expected });
            return Ok(0);
        }
        if let Err(e) = self.file.write_at(self.range.start + self.written, data) {
            self.reject(RangeError::Storage(e));
            return Ok(0);
        }
        self.written += data.len() as u64;
        self.stat.set_read(self.written);
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Parses a `Content-Range` value `bytes start-end/total` into `(start, end_inclusive)`.
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let rest = value.strip_prefix("bytes")?.trim_start();
    let (span, _total) = rest.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}
