//! Range planning.
//!
//! Splits a resource of known length into one contiguous byte range per job
//! and converts ranges to HTTP `Range` header values.

mod range;

pub use range::{plan_ranges, ByteRange};
