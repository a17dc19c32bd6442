//! Byte range type and range planning.

use std::fmt;

/// A byte range `[start, end)` (half-open) assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range in the form libcurl expects for `CURLOPT_RANGE` (`start-(end-1)`).
    /// libcurl sends it as `Range: bytes=start-(end-1)`. `None` for an empty
    /// range, which has no valid header form.
    pub fn curl_range(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("{}-{}", self.start, self.end - 1))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Plans one range per job covering `[0, content_length)`.
///
/// Every range but the last is `content_length / jobs` bytes; the last one also
/// takes the remainder. Always returns exactly `max(jobs, 1)` ranges, so a small
/// or empty resource yields empty leading ranges.
pub fn plan_ranges(content_length: u64, jobs: usize) -> Vec<ByteRange> {
    let jobs = jobs.max(1) as u64;
    let chunk = content_length / jobs;
    let remainder = content_length % jobs;

    (0..jobs)
        .map(|i| {
            let start = i * chunk;
            let mut end = (i + 1) * chunk;
            if i == jobs - 1 {
                end += remainder;
            }
            ByteRange { start, end }
        })
        .collect()
}
