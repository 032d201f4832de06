//! Loading, inspecting, and rebuilding pack files.
//!
//! A [`Pack`] is created from the raw bytes of a pack file with [`Pack::open`].
//! It holds an owned copy of each [`Chunk`]'s on-disk bytes, so the input can be
//! dropped right after. Chunks can be decompressed independently (and from
//! multiple threads at once), as every decode owns its own dictionary.
//!
//! ```
//! # use lvpack::{Pack, PackDialect, LzssBackend};
//! # fn main() -> Result<(), lvpack::LvError> {
//! let mut pack = Pack::from_chunks(PackDialect::Primary, &[&b"first"[..], &b"second"[..]], LzssBackend::Longest)?;
//! pack.replace_chunk(1, b"a different second chunk", LzssBackend::Longest)?;
//!
//! let rebuilt = Pack::open(&pack.to_vec()?, PackDialect::Primary)?;
//! assert_eq!(rebuilt.decompress_chunk(1)?, b"a different second chunk");
//! # Ok(())
//! # }
//! ```

use crate::{
    buffer::ByteCursor,
    encode::{EncoderBuilder, LzssBackend},
    errors::LvError,
    format::{PackDialect, CHUNK_FLAG, MAX_MATCH},
};
use bitstream_io::{BitWriter, LittleEndian};
use std::{
    convert::TryFrom,
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    mem,
    path::Path,
    slice,
};

/// Most bytes of output a single byte of compressed data can turn into:
/// a two byte back-reference copies at most `MAX_MATCH` bytes.
const MAX_EXPANSION: usize = MAX_MATCH / 2;

/// A single chunk of a pack file, as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    start: u32,
    decompressed_size: usize,
    header_width: usize,
    flagged: bool,
    /// on-disk bytes, including the size header
    data: Vec<u8>,
}

impl Chunk {
    /// Position of the chunk in the pack
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset of the chunk from the start of the pack file
    #[inline]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Size of the chunk on disk, header included
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size declared by the chunk header
    #[inline]
    pub fn decompressed_size(&self) -> usize {
        self.decompressed_size
    }

    /// Number of bytes taken up by the size header
    #[inline]
    pub fn header_width(&self) -> usize {
        self.header_width
    }

    /// Was [`CHUNK_FLAG`] set on this chunk's offset?
    /// Only [`PackDialect::Extended`] packs have flagged chunks.
    #[inline]
    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// The chunk as it appears in the pack file
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// The compressed data after the size header
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[self.header_width..]
    }

    /// Decompress the chunk into a buffer of exactly [`decompressed_size`] bytes
    ///
    /// [`decompressed_size`]: Chunk::decompressed_size
    pub fn decompress(&self) -> Result<Vec<u8>, LvError> {
        let payload = self.payload();
        if self.decompressed_size > payload.len().saturating_mul(MAX_EXPANSION) {
            return Err(LvError::format(format!(
                "chunk {} declares {} bytes, but {} compressed bytes cannot hold that much",
                self.index,
                self.decompressed_size,
                payload.len()
            )));
        }

        crate::decode::decompress(payload, self.decompressed_size)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{:04}] start={:06x}, size={:04x}, decompressed_size={:04x}",
            self.index,
            self.start,
            self.size(),
            self.decompressed_size
        )?;
        if self.flagged {
            write!(f, " (flagged)")?;
        }
        Ok(())
    }
}

/// An opened pack file: an ordered list of chunks in one [`PackDialect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pack {
    dialect: PackDialect,
    chunks: Vec<Chunk>,
    file_len: usize,
}

impl Pack {
    /// Parse the offset table of a pack file in `bytes`, and copy out every chunk
    pub fn open(bytes: &[u8], dialect: PackDialect) -> Result<Self, LvError> {
        let mut buf = ByteCursor::new(bytes);
        let file_len = buf.len();

        let (count, table_start) = match dialect {
            PackDialect::Primary => (buf.read_le32()? as usize, 4),
            PackDialect::Extended => {
                // the first chunk starts right after the table and its end sentinel
                let first = buf.peek_le32(0)? & !CHUNK_FLAG;
                (((first / 4) as usize).saturating_sub(1), 0)
            }
        };

        if count == 0 {
            return Err(LvError::format(format!("{} declares no chunks", dialect)));
        }

        let table_end = count
            .checked_mul(4)
            .and_then(|n| n.checked_add(table_start))
            .filter(|&end| end <= file_len)
            .ok_or_else(|| {
                LvError::format(format!(
                    "{} chunks cannot fit in a {} byte file",
                    count, file_len
                ))
            })?;

        buf.seek(table_start)?;
        let mut starts = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = buf.read_le32()?;
            let entry = match dialect {
                PackDialect::Primary => (offset, false),
                PackDialect::Extended => (offset & !CHUNK_FLAG, offset & CHUNK_FLAG != 0),
            };
            starts.push(entry);
        }

        let width = dialect.header_width();
        let mut chunks = Vec::with_capacity(count);
        for (index, &(start, flagged)) in starts.iter().enumerate() {
            let begin = start as usize;
            if begin < table_end {
                return Err(LvError::format(format!(
                    "chunk {} starts at {:#x}, inside the {} byte offset table",
                    index, start, table_end
                )));
            }

            let end = match starts.get(index + 1) {
                Some(&(next, _)) => next as usize,
                None => file_len,
            };
            if end > file_len {
                return Err(LvError::format(format!(
                    "chunk {} starts at {:#x}, past the end of the file",
                    index + 1,
                    end
                )));
            }

            let size = end.checked_sub(begin).filter(|&s| s > 0).ok_or_else(|| {
                LvError::format(format!(
                    "chunk offsets are not increasing at chunk {} ({:#x} => {:#x})",
                    index, start, end
                ))
            })?;
            if size < width {
                return Err(LvError::format(format!(
                    "chunk {} is {} bytes, too small for its {} byte header",
                    index, size, width
                )));
            }

            let decompressed_size = dialect.read_size_header(&buf, begin)?;
            buf.seek(begin)?;
            let data = buf.read_bytes(size)?.to_vec();

            chunks.push(Chunk {
                index,
                start,
                decompressed_size,
                header_width: width,
                flagged,
                data,
            });
        }

        Ok(Self {
            dialect,
            chunks,
            file_len,
        })
    }

    /// Read the whole file at `p` and open it as a pack file
    pub fn from_file<P: AsRef<Path>>(p: P, dialect: PackDialect) -> Result<Self, LvError> {
        let bytes = fs::read(p)?;
        Self::open(&bytes, dialect)
    }

    /// Build a new pack by compressing each entry of `data` into a chunk
    pub fn from_chunks<D: AsRef<[u8]>>(
        dialect: PackDialect,
        data: &[D],
        backend: LzssBackend,
    ) -> Result<Self, LvError> {
        let chunks = data
            .iter()
            .enumerate()
            .map(|(index, d)| -> Result<Chunk, LvError> {
                let d = d.as_ref();
                Ok(Chunk {
                    index,
                    start: 0,
                    decompressed_size: d.len(),
                    header_width: dialect.header_width(),
                    flagged: false,
                    data: encode_chunk(dialect, d, backend)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if chunks.is_empty() {
            return Err(LvError::format(format!("{} needs at least one chunk", dialect)));
        }

        let mut pack = Self {
            dialect,
            chunks,
            file_len: 0,
        };
        pack.relayout()?;

        Ok(pack)
    }

    #[inline]
    pub fn dialect(&self) -> PackDialect {
        self.dialect
    }

    /// Size of the pack file, in bytes
    #[inline]
    pub fn file_len(&self) -> usize {
        self.file_len
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn chunks(&self) -> slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Get the chunk at `index`
    pub fn get_chunk(&self, index: usize) -> Result<&Chunk, LvError> {
        self.chunks.get(index).ok_or(LvError::ChunkNotFound {
            index,
            count: self.chunks.len(),
        })
    }

    /// Decompress the chunk at `index`
    pub fn decompress_chunk(&self, index: usize) -> Result<Vec<u8>, LvError> {
        self.get_chunk(index)?.decompress()
    }

    /// Compress `data` and store it as the new contents of the chunk at `index`.
    ///
    /// The start offsets of the following chunks move to make room.
    pub fn replace_chunk(
        &mut self,
        index: usize,
        data: &[u8],
        backend: LzssBackend,
    ) -> Result<(), LvError> {
        self.get_chunk(index)?;
        let raw = encode_chunk(self.dialect, data, backend)?;
        self.store(index, raw, data.len())
    }

    /// Store already encoded bytes, starting with the size header, as the
    /// chunk at `index`.
    pub fn replace_raw_chunk(&mut self, index: usize, raw: Vec<u8>) -> Result<(), LvError> {
        self.get_chunk(index)?;
        let decompressed_size = self
            .dialect
            .read_size_header(&ByteCursor::new(&raw), 0)?;
        self.store(index, raw, decompressed_size)
    }

    fn store(&mut self, index: usize, raw: Vec<u8>, decompressed_size: usize) -> Result<(), LvError> {
        let count = self.chunks.len();
        let chunk = self
            .chunks
            .get_mut(index)
            .ok_or(LvError::ChunkNotFound { index, count })?;

        let old_data = mem::replace(&mut chunk.data, raw);
        let old_size = mem::replace(&mut chunk.decompressed_size, decompressed_size);

        // leave the pack untouched if the new data no longer fits the offset table
        if let Err(e) = self.relayout() {
            let chunk = &mut self.chunks[index];
            chunk.data = old_data;
            chunk.decompressed_size = old_size;
            return Err(e);
        }

        Ok(())
    }

    /// Size of the offset table (and anything else before the first chunk)
    fn data_start(&self) -> usize {
        match self.dialect {
            PackDialect::Primary => 4 + 4 * self.chunks.len(),
            // one extra entry for the end sentinel
            PackDialect::Extended => 4 * (self.chunks.len() + 1),
        }
    }

    /// Compute where each chunk starts when the chunks are laid out back to back
    /// after the offset table, and where the data ends.
    fn layout(&self) -> Result<(Vec<u32>, u32), LvError> {
        let limit = match self.dialect {
            PackDialect::Primary => u32::MAX as usize,
            PackDialect::Extended => CHUNK_FLAG as usize - 1,
        };
        let to_offset = |pos: usize| {
            u32::try_from(pos)
                .ok()
                .filter(|&p| p as usize <= limit)
                .ok_or_else(|| {
                    LvError::format(format!(
                        "offset {:#x} does not fit in an {} offset table",
                        pos, self.dialect
                    ))
                })
        };

        let mut pos = self.data_start();
        let mut starts = Vec::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            starts.push(to_offset(pos)?);
            pos += chunk.size();
        }

        Ok((starts, to_offset(pos)?))
    }

    fn relayout(&mut self) -> Result<(), LvError> {
        let (starts, end) = self.layout()?;
        for (chunk, start) in self.chunks.iter_mut().zip(starts) {
            chunk.start = start;
        }
        self.file_len = end as usize;

        Ok(())
    }

    /// Write out a pack file with the offset table rebuilt from the current chunk sizes
    pub fn write_to<W: Write>(&self, wtr: W) -> Result<(), LvError> {
        let (starts, end) = self.layout()?;
        let mut out = BitWriter::endian(wtr, LittleEndian);

        if let PackDialect::Primary = self.dialect {
            out.write(32, self.chunks.len() as u32)?;
        }

        for (chunk, &start) in self.chunks.iter().zip(&starts) {
            let flag = if chunk.flagged { CHUNK_FLAG } else { 0 };
            out.write(32, start | flag)?;
        }

        if let PackDialect::Extended = self.dialect {
            out.write(32, end)?;
        }

        for chunk in &self.chunks {
            out.write_bytes(chunk.raw())?;
        }

        out.byte_align()?;

        Ok(())
    }

    /// Rebuild the pack file into a new `Vec<u8>`
    pub fn to_vec(&self) -> Result<Vec<u8>, LvError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Rebuild the pack file into the newly created `File` `f`
    pub fn write_to_file<P: AsRef<Path>>(&self, f: P) -> Result<(), LvError> {
        let mut wtr = BufWriter::new(File::create(f)?);
        self.write_to(&mut wtr)?;
        wtr.flush().map_err(Into::into)
    }
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} chunks:", self.chunks.len())?;
        for chunk in &self.chunks {
            writeln!(f, "  {}", chunk)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Pack {
    type Item = &'a Chunk;
    type IntoIter = slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Compress `data` behind the dialect's size header
fn encode_chunk(dialect: PackDialect, data: &[u8], backend: LzssBackend) -> Result<Vec<u8>, LvError> {
    let mut raw = dialect.size_header(data.len())?;
    EncoderBuilder::for_bytes(data)
        .lzss_backend(backend)
        .encode_to_writer(&mut raw)?;

    Ok(raw)
}
