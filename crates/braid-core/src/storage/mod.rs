//! Output file lifecycle and positioned writes.
//!
//! Creates (truncating) the destination, optionally preallocates it, and hands
//! out a cloneable [`SharedFile`] whose `write_at` may be called concurrently
//! from every worker thread. Workers write disjoint spans, so no range locking
//! is needed.

mod builder;
mod writer;

pub use builder::OutputFileBuilder;
pub use writer::SharedFile;
