//! Parse HTTP response header lines into HeadResult.

use crate::error::FetchError;

use super::HeadResult;

/// Parse collected header lines (status line excluded) into a `HeadResult`.
/// A missing `Content-Length` or one that is not a non-negative integer is an error.
pub fn parse_headers(lines: &[String]) -> Result<HeadResult, FetchError> {
    let mut content_length = None;
    let mut accept_ranges = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = Some(value);
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }

    let raw = content_length.ok_or(FetchError::MissingContentLength)?;
    let content_length = raw
        .parse::<u64>()
        .map_err(|_| FetchError::InvalidContentLength(raw.to_string()))?;

    Ok(HeadResult {
        content_length,
        accept_ranges,
    })
}
