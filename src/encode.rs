use crate::errors::LvError;
use bitstream_io::{BitWriter, LittleEndian};
use std::{
    fs::File,
    io::Write,
    io::{BufReader, BufWriter, Cursor, Read},
    path::Path,
};

pub(crate) mod lzss;

use self::lzss::{LzssPass, LzssToken};

type LogWtr<'a> = &'a mut dyn Write;

/// The algorithm used to pick a back-reference when several dictionary
/// positions match the upcoming input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LzssBackend {
    /// Search the whole dictionary for the longest run.
    /// Ties go to the lowest dictionary index.
    Longest,
    /// Take the first usable run found in the dictionary. This matches the
    /// output of the legacy packing tool, except where that tool would emit a
    /// stream that does not decode back to its input.
    FirstFit,
}

impl Default for LzssBackend {
    fn default() -> Self {
        Self::Longest
    }
}

/// Specify the encoding settings, such as match search, logging, input, and output
///
/// To create a new `EncoderBuilder`, use [`for_reader()`], [`for_file()`], or [`for_bytes()`].
/// Then, change any of the encoding settings with `EncoderBuilder`'s helper methods.
/// Finally, encode the input data with [`encode_to_writer()`], [`encode_to_file()`], or [`encode_to_vec()`].
/// ```
/// # use lvpack::{EncoderBuilder, LzssBackend};
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = EncoderBuilder::for_bytes(input)
///     .lzss_backend(LzssBackend::FirstFit)
///     .with_logging(&mut ::std::io::stdout())
///     .encode_to_vec();
/// ```
///
/// The default encoding settings are as follows:
/// * [`Longest`] match searching
/// * No logging
///
/// The window size (4096 bytes) and match lengths (3 to 18 bytes) are fixed
/// by the format.
///
/// [`for_reader()`]: EncoderBuilder::for_reader
/// [`for_file()`]: EncoderBuilder::for_file
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_file()`]: EncoderBuilder::encode_to_file
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
/// [`Longest`]: LzssBackend::Longest
pub struct EncoderBuilder<'a, R> {
    rdr: R,
    backend: LzssBackend,
    log: Option<LogWtr<'a>>,
}

impl<'a, R: Read> EncoderBuilder<'a, R> {
    /// Create a new `EncoderBuilder` for the data in `rdr`.
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            rdr,
            backend: LzssBackend::default(),
            log: None,
        }
    }

    /// Set the algorithm used to search for LZSS matches when encoding
    #[inline]
    pub fn lzss_backend(&mut self, backend: LzssBackend) -> &mut Self {
        self.backend = backend;
        self
    }

    /// Write debugging and diagnostic information to `log` while the input is
    /// being encoded.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        let log = Some(log as &'a mut dyn Write);
        self.log = log;
        self
    }

    /// Start the encoding and write the compressed data out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), LvError> {
        do_encode(self, wtr)
    }

    /// Start the encoding and write the compressed data out to the newly created
    /// `File` `f`
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), LvError> {
        let mut wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(&mut wtr)?;
        wtr.flush().map_err(Into::into)
    }

    /// Start the encoding and return the compressed data in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, LvError> {
        let data = Vec::new();
        let mut csr = Cursor::new(data);
        self.encode_to_writer(&mut csr).map(|_| csr.into_inner())
    }
}

impl<'a> EncoderBuilder<'a, BufReader<File>> {
    /// Create a new `EncoderBuilder` for the file at `p`.
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, LvError> {
        let rdr = BufReader::new(File::open(p)?);
        Ok(Self::for_reader(rdr))
    }
}

impl<'a> EncoderBuilder<'a, Cursor<&'a [u8]>> {
    /// Create a new `EncoderBuilder` for the data the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

/// Compress `src` into a `Vec<u8>`, without any chunk header
///
/// This is a convenience function to encode a byte slice without having to
/// import and set up an [`EncoderBuilder`].
pub fn compress(src: &[u8]) -> Result<Vec<u8>, LvError> {
    EncoderBuilder::for_bytes(src).encode_to_vec()
}

fn do_encode<R: Read, W: Write>(
    opts: &mut EncoderBuilder<'_, R>,
    mut wtr: W,
) -> Result<(), LvError> {
    let EncoderBuilder {
        rdr,
        backend,
        ref mut log,
    } = opts;

    let mut input = Vec::new();
    rdr.read_to_end(&mut input)?;

    let lzss = lzss::compress_bytes(&input, *backend, log)?;

    if let Some(wtr) = log.as_mut() {
        writeln!(
            wtr,
            "# {} bytes => {} bytes ({} literals, {} copies)",
            lzss.decompressed_size,
            lzss.encoded_size(),
            lzss.literals,
            lzss.copies
        )?;
    }

    write_stream(&mut wtr, &lzss)
}

fn write_stream(wtr: &mut dyn Write, encoded_data: &LzssPass) -> Result<(), LvError> {
    let mut out = BitWriter::endian(wtr, LittleEndian);

    for group in &encoded_data.groups {
        out.write(8, group.ctrl)?;

        for token in &group.tokens {
            match *token {
                LzssToken::Literal(byte) => out.write(8, byte)?,
                LzssToken::Copy(r) => out.write(16, r.to_word())?,
            }
        }
    }

    out.byte_align()?;

    Ok(())
}
