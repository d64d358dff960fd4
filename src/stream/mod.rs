//! Stream module - in-memory byte sinks and sources.
//!
//! - [`OutputBuffer`]: append-only sink grown in fixed-size chunks
//! - [`Snapshot`]: immutable view of an output buffer's contents
//! - [`InputBuffer`]: sequential reader over borrowed memory or a snapshot

mod input;
mod output;

pub use input::{InputBuffer, Mark};
pub use output::{OutputBuffer, Snapshot, DEFAULT_CHUNK_SIZE};
