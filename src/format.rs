//! Information and structures for pack files and their compressed chunks.
//!
//! A pack file is an offset table of little endian `u32` chunk starts,
//! immediately followed by the concatenated chunk data. There are two
//! incompatible dialects of the table, described by [`PackDialect`].
//!
//! ## Primary Dialect
//! | Byte Num        | Description |
//! | :-------------: | ----------- |
//! | 0..4            | number of chunks `N` |
//! | 4..4 + 4N       | start offset of each chunk |
//! | 4 + 4N..        | chunk data |
//!
//! Each chunk begins with a two byte header holding the decompressed size
//! minus one.
//!
//! ## Extended Dialect
//! | Byte Num        | Description |
//! | :-------------: | ----------- |
//! | 0..4N           | start offset of each chunk |
//! | 4N..4N + 4      | end of the chunk data |
//! | 4N + 4..        | chunk data |
//!
//! The number of chunks is not stored. Since the first chunk starts right
//! after the table, it can be recovered from the first offset: `(V / 4) - 1`.
//! Offsets may have [`CHUNK_FLAG`] set, which has to be masked off before use.
//! Each chunk begins with a four byte header holding the decompressed size.
//!
//! ## Compressed Data
//! After the header, chunk data is a stream of groups. Each group is a control
//! byte followed by up to eight tokens. Bit `n` (least significant first) of
//! the control byte selects the kind of token `n`:
//!
//! * `1`: a literal byte
//! * `0`: a little endian word referring back into a 4 KiB rolling dictionary
//!
//! ```text
//!  15   12 11                    0
//! ┌───────┬───────────────────────┐
//! │ len-3 │   dictionary index    │
//! └───────┴───────────────────────┘
//! ```
//!
//! Every byte produced, whether literal or copied, is also written into the
//! dictionary. So, a reference can copy bytes that it is writing itself.

use crate::buffer::ByteCursor;
use crate::errors::LvError;
use std::convert::TryFrom;
use std::fmt;

/// Size of the rolling dictionary
pub const WINDOW_SIZE: usize = 0x1000;
/// Shortest run worth encoding as a back-reference
pub const MIN_MATCH: usize = 3;
/// Longest run that fits into the four length bits of a back-reference
pub const MAX_MATCH: usize = MIN_MATCH + 0xf;
/// Flag bit that some [`PackDialect::Extended`] chunk offsets carry
pub const CHUNK_FLAG: u32 = 0x4000_0000;

pub(crate) const INDEX_MASK: u16 = 0x0fff;

/// The two known layouts for a pack file's offset table and chunk headers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PackDialect {
    /// Explicit chunk count, 16 bit `size - 1` chunk headers
    Primary,
    /// Inferred chunk count, flagged offsets, and 32 bit chunk headers
    Extended,
}

impl PackDialect {
    /// Number of bytes at the start of each chunk that store its decompressed size
    pub const fn header_width(self) -> usize {
        match self {
            Self::Primary => 2,
            Self::Extended => 4,
        }
    }

    /// Largest decompressed size that the chunk header can store
    pub const fn max_decompressed_size(self) -> usize {
        match self {
            Self::Primary => u16::MAX as usize + 1,
            Self::Extended => u32::MAX as usize,
        }
    }

    /// Peek the decompressed size of the chunk whose header starts at `offset`
    pub(crate) fn read_size_header(self, buf: &ByteCursor, offset: usize) -> Result<usize, LvError> {
        let size = match self {
            Self::Primary => buf.peek_le16(offset)? as usize + 1,
            Self::Extended => buf.peek_le32(offset)? as usize,
        };

        if size == 0 {
            return Err(LvError::format(format!(
                "chunk at {:#x} declares a decompressed size of zero",
                offset
            )));
        }

        Ok(size)
    }

    /// Encode `size` as this dialect's chunk header
    pub(crate) fn size_header(self, size: usize) -> Result<Vec<u8>, LvError> {
        if size == 0 || size > self.max_decompressed_size() {
            return Err(LvError::format(format!(
                "{} bytes cannot be stored in a {} chunk",
                size, self
            )));
        }

        let header = match self {
            Self::Primary => u16::try_from(size - 1).map(|v| v.to_le_bytes().to_vec()),
            Self::Extended => u32::try_from(size).map(|v| v.to_le_bytes().to_vec()),
        };

        header.map_err(|_| LvError::format(format!("chunk size {} overflows header", size)))
    }
}

impl fmt::Display for PackDialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary pack"),
            Self::Extended => write!(f, "extended pack"),
        }
    }
}

/// A back-reference into the rolling dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BackRef {
    /// dictionary position to start copying from
    pub index: usize,
    /// number of bytes to copy
    pub length: usize,
}

impl BackRef {
    pub(crate) fn from_word(word: u16) -> Self {
        Self {
            index: (word & INDEX_MASK) as usize,
            length: (word >> 12) as usize + MIN_MATCH,
        }
    }

    pub(crate) fn to_word(self) -> u16 {
        debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&self.length));
        debug_assert!(self.index < WINDOW_SIZE);

        (((self.length - MIN_MATCH) as u16) << 12) | (self.index as u16 & INDEX_MASK)
    }
}
