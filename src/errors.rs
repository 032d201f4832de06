use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Possible errors that arise from reading a pack file, or from converting a
/// chunk into its decompressed data and vice-versa.
#[derive(Error, Debug)]
pub enum LvError {
    #[error("Invalid pack data: {0}")]
    Format(String),

    #[error("Truncated data: needed {needed} bytes at offset {offset:#x}, but buffer is {len} bytes")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("{token} at source offset {src_offset:#x} would overrun {limit}")]
    DecodeBounds {
        token: &'static str,
        src_offset: usize,
        limit: &'static str,
    },

    #[error("No chunk {index} in pack of {count} chunks")]
    ChunkNotFound { index: usize, count: usize },

    #[error("Could not allocate output buffer: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl LvError {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Self {
        LvError::Format(msg.into())
    }
}
