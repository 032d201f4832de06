//! Read, decompress, and rebuild `DATA.DAT` style pack files.
//!
//! A pack file is a table of chunk offsets followed by the chunks themselves.
//! Most chunks are compressed with a small LZSS variant that copies from a
//! 4 KiB rolling dictionary instead of from the output. See [`format`] for the
//! layout of both.
//!
//! ```
//! # use lvpack::{compress, decompress};
//! let original = b"The dictionary is separate from the output, the output is separate from the dictionary";
//! let compressed = compress(original).unwrap();
//! let decompressed = decompress(&compressed, original.len()).unwrap();
//! assert_eq!(&original[..], decompressed);
//! ```

mod buffer;
mod decode;
mod dict;
mod encode;
mod errors;
pub mod format;
mod pack;

pub use buffer::ByteCursor;
pub use decode::{decompress, Decoder};
pub use encode::{compress, EncoderBuilder, LzssBackend};
pub use errors::LvError;
pub use format::PackDialect;
pub use pack::{Chunk, Pack};
