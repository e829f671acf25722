//! Stream chunk value object: one fragment of an incrementally delivered
//! backend response.

use serde::{Deserialize, Serialize};

/// One ordered fragment of a streamed response.
///
/// # Invariants
///
/// - `index` increases monotonically from 0 within one stream
/// - Exactly one chunk per stream carries `done = true`, and it is the last
/// - Chunks must be consumed in index order; the consumer rejects anything
///   else as a protocol violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Position of this chunk within the stream, starting at 0.
    pub index: u64,
    /// Content fragment; may be empty.
    pub delta: String,
    /// True on the terminal chunk.
    pub done: bool,
}

impl StreamChunk {
    /// Creates a content chunk.
    pub fn content(index: u64, delta: impl Into<String>) -> Self {
        Self {
            index,
            delta: delta.into(),
            done: false,
        }
    }

    /// Creates the terminal chunk.
    pub fn done(index: u64) -> Self {
        Self {
            index,
            delta: String::new(),
            done: true,
        }
    }
}
