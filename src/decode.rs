use crate::buffer::ByteCursor;
use crate::dict::RollingDict;
use crate::errors::LvError;
use crate::format::BackRef;
use std::io::Write;

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as logging and input.
///
/// To create a new `Decoder`, use [`for_bytes()`]. Then, change any of the
/// decoder settings. Finally, decompress the input data with [`decode()`],
/// which needs to know the size of the decompressed data up front.
/// ```
/// # use lvpack::{compress, Decoder};
/// let original = b"ABBACABBACD";
/// let compressed = compress(original).unwrap();
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode(original.len())
///     .unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// [`for_bytes()`]: Decoder::for_bytes
/// [`decode()`]: Decoder::decode
pub struct Decoder<'a> {
    src: ByteCursor<'a>,
    log: Option<LogWtr<'a>>,
}

impl<'a> Decoder<'a> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            src: ByteCursor::new(bytes),
            log: None,
        }
    }

    /// Write every decoded token to `wtr` while decompressing
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Decompress the input into exactly `expected_size` bytes
    #[inline]
    pub fn decode(&mut self, expected_size: usize) -> Result<Vec<u8>, LvError> {
        do_decode(self, expected_size)
    }
}

/// Decompress `src` into a `Vec<u8>` of `expected_size` bytes
///
/// This is a convenience function to decode a byte slice without
/// having to import and set up a [`Decoder`]
pub fn decompress(src: &[u8], expected_size: usize) -> Result<Vec<u8>, LvError> {
    Decoder::for_bytes(src).decode(expected_size)
}

fn do_decode(opt: &mut Decoder, expected_size: usize) -> Result<Vec<u8>, LvError> {
    let Decoder { src, log } = opt;

    if let Some(wtr) = log.as_mut() {
        writeln!(
            wtr,
            "# Decoding {} bytes into {} bytes",
            src.remaining(),
            expected_size
        )?;
    }

    let mut output: Vec<u8> = Vec::new();
    output.try_reserve_exact(expected_size)?;
    let mut dict = RollingDict::new();

    while output.len() < expected_size {
        let ctrl = next_byte(src, "control byte")?;

        for bit in 0..8 {
            if output.len() >= expected_size {
                break;
            }

            if ctrl & (1 << bit) != 0 {
                let byte = next_byte(src, "literal")?;
                output.push(byte);
                dict.push(byte);

                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "{:04x} - Uncoded: {:02x}", output.len() - 1, byte)?;
                }
            } else {
                let at = src.tell();
                let word = src.read_le16().map_err(|_| LvError::DecodeBounds {
                    token: "back-reference",
                    src_offset: at,
                    limit: "source",
                })?;
                let BackRef { index, length } = BackRef::from_word(word);

                if length > expected_size - output.len() {
                    return Err(LvError::DecodeBounds {
                        token: "back-reference",
                        src_offset: at,
                        limit: "destination",
                    });
                }

                let start = output.len();
                dict.copy_back(index, length, |b| output.push(b));

                if let Some(wtr) = log.as_mut() {
                    writeln!(
                        wtr,
                        "{:04x} - Encoded [Copyback]: size: {} index: {:03x} | dict: {:03x}",
                        start,
                        length,
                        index,
                        dict.cursor()
                    )?;
                    writeln!(wtr, "\t{:02x?}", &output[start..])?;
                }
            }
        }
    }

    Ok(output)
}

fn next_byte(src: &mut ByteCursor, token: &'static str) -> Result<u8, LvError> {
    let at = src.tell();
    src.read_u8().map_err(|_| LvError::DecodeBounds {
        token,
        src_offset: at,
        limit: "source",
    })
}
