//! HTTP `Range` header parsing against a known blob size.
//!
//! Only the single-range form `bytes=<start>-[<end>]` is accepted. Suffix
//! ranges (`bytes=-500`) and multi-range lists (`bytes=0-10,20-30`) are
//! rejected: a multi-range value is read as one token and fails on the
//! non-numeric end. Every rejection is [`RangeError`], which transports map
//! to 416.

use thiserror::Error;

const BYTES_UNIT: &str = "bytes=";

/// A validated, inclusive byte interval: `start <= end < total_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
    /// Whether the interval came from a `Range` header.
    pub is_partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("malformed range header: {reason}")]
    Malformed { reason: String },

    #[error("range not satisfiable for {total_size} bytes: {reason}")]
    Unsatisfiable { total_size: u64, reason: String },
}

impl RangeError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    fn unsatisfiable(total_size: u64, reason: impl Into<String>) -> Self {
        Self::Unsatisfiable {
            total_size,
            reason: reason.into(),
        }
    }
}

impl RangeSpec {
    /// The whole blob, as served when no `Range` header is sent.
    pub fn full(total_size: u64) -> Result<Self, RangeError> {
        if total_size == 0 {
            return Err(RangeError::unsatisfiable(0, "blob is empty"));
        }
        Ok(Self {
            start: 0,
            end: total_size - 1,
            is_partial: false,
        })
    }

    /// Number of bytes in the interval.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value, e.g. `bytes 500-999/1000`.
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_size)
    }

    pub fn is_full(&self, total_size: u64) -> bool {
        self.start == 0 && self.end + 1 == total_size
    }
}

/// `Content-Range` value sent with a 416 response.
pub fn unsatisfied_content_range(total_size: u64) -> String {
    format!("bytes */{total_size}")
}

/// Parse a `Range` header value into a [`RangeSpec`] for a blob of `total_size` bytes.
///
/// An absent or blank header yields the full blob. An `end` beyond the blob
/// is clamped to the last byte.
pub fn parse_range(header: Option<&str>, total_size: u64) -> Result<RangeSpec, RangeError> {
    let header = match header.map(str::trim) {
        None | Some("") => return RangeSpec::full(total_size),
        Some(h) => h,
    };

    let spec = header
        .strip_prefix(BYTES_UNIT)
        .ok_or_else(|| RangeError::malformed("expected `bytes=` unit"))?
        .trim();

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| RangeError::malformed("missing `-` separator"))?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return Err(RangeError::malformed("suffix ranges are not supported"));
    }
    let start = parse_offset(start).ok_or_else(|| RangeError::malformed("start is not a byte offset"))?;

    if start >= total_size {
        return Err(RangeError::unsatisfiable(total_size, format!("start {start} is past the end")));
    }

    let last = total_size - 1;
    let end = if end.is_empty() {
        last
    } else {
        parse_offset(end)
            .ok_or_else(|| RangeError::malformed("end is not a byte offset"))?
            .min(last)
    };

    if end < start {
        return Err(RangeError::unsatisfiable(total_size, format!("end {end} is before start {start}")));
    }

    Ok(RangeSpec {
        start,
        end,
        is_partial: true,
    })
}

fn parse_offset(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
