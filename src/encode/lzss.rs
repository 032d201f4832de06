use std::io::Write;

use smallvec::SmallVec;

use crate::{
    dict::RollingDict,
    errors::LvError,
    format::{BackRef, MAX_MATCH, MIN_MATCH, WINDOW_SIZE},
};

use super::LzssBackend;

/// Number of tokens described by one control byte
pub(super) const GROUP_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LzssToken {
    Literal(u8),
    Copy(BackRef),
}

impl LzssToken {
    // total number of input bytes this token encodes
    fn size(&self) -> usize {
        match self {
            Self::Literal(..) => 1,
            Self::Copy(r) => r.length,
        }
    }
}

/// A control byte and the (up to eight) tokens it describes
#[derive(Debug, Default)]
pub(super) struct Group {
    pub ctrl: u8,
    pub tokens: SmallVec<[LzssToken; GROUP_SIZE]>,
}

impl Group {
    fn is_full(&self) -> bool {
        self.tokens.len() == GROUP_SIZE
    }

    fn push(&mut self, token: LzssToken) {
        if let LzssToken::Literal(..) = token {
            self.ctrl |= 1 << self.tokens.len();
        }
        self.tokens.push(token);
    }
}

#[derive(Debug, Default)]
pub(super) struct LzssPass {
    pub groups: Vec<Group>,
    pub decompressed_size: usize,
    pub literals: usize,
    pub copies: usize,
}

impl LzssPass {
    fn add(&mut self, token: LzssToken) {
        match token {
            LzssToken::Literal(..) => self.literals += 1,
            LzssToken::Copy(..) => self.copies += 1,
        }
        self.decompressed_size += token.size();

        match self.groups.last_mut() {
            Some(group) if !group.is_full() => group.push(token),
            _ => {
                let mut group = Group::default();
                group.push(token);
                self.groups.push(group);
            }
        }
    }

    /// Size in bytes of the encoded stream
    pub fn encoded_size(&self) -> usize {
        self.groups.len() + self.literals + 2 * self.copies
    }
}

/// Compress `input` into groups of literal or back-reference tokens.
/// Debugging information will be printed to `log` if present.
pub(super) fn compress_bytes(
    input: &[u8],
    backend: LzssBackend,
    log: &mut Option<&mut dyn Write>,
) -> Result<LzssPass, LvError> {
    let mut dict = RollingDict::new();
    let mut pass = LzssPass::default();

    let finder = match backend {
        LzssBackend::Longest => &LongestRun as &dyn MatchFinder,
        LzssBackend::FirstFit => &FirstFit as &dyn MatchFinder,
    };

    let mut pos = 0;
    while pos < input.len() {
        let ahead_end = input.len().min(pos + MAX_MATCH);
        let ahead = &input[pos..ahead_end];

        let token = match finder.find(&dict, ahead) {
            Some(m) => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(
                        wtr,
                        "{:04x} - Encoded [Copyback]: size: {} index: {:03x} | dict: {:03x}",
                        pos,
                        m.length,
                        m.index,
                        dict.cursor()
                    )?;
                }
                // mirror the decoder, which writes each copied byte back into the dictionary
                for &byte in &ahead[..m.length] {
                    dict.push(byte);
                }
                LzssToken::Copy(m)
            }
            None => {
                let byte = ahead[0];
                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "{:04x} - Uncoded: {:02x}", pos, byte)?;
                }
                dict.push(byte);
                LzssToken::Literal(byte)
            }
        };

        pos += token.size();
        pass.add(token);
    }

    Ok(pass)
}

trait MatchFinder {
    fn find(&self, dict: &RollingDict, ahead: &[u8]) -> Option<BackRef>;
}

/// Every dictionary position, in ascending order, whose run against `ahead`
/// is long enough to encode and can be copied without reading a byte that the
/// copy itself replaces.
fn candidates<'a>(dict: &'a RollingDict, ahead: &'a [u8]) -> impl Iterator<Item = BackRef> + 'a {
    (0..WINDOW_SIZE)
        .map(move |index| BackRef {
            index,
            length: dict.match_len(index, ahead),
        })
        .filter(move |m| m.length >= MIN_MATCH && !dict.overlaps_write(m.index, m.length))
}

/// The longest run wins, with ties going to the lowest dictionary index
#[derive(Debug, Clone, Copy)]
struct LongestRun;
impl MatchFinder for LongestRun {
    fn find(&self, dict: &RollingDict, ahead: &[u8]) -> Option<BackRef> {
        let mut best: Option<BackRef> = None;

        for m in candidates(dict, ahead) {
            if best.map_or(true, |b| m.length > b.length) {
                best = Some(m);
            }
            if m.length == ahead.len() {
                break;
            }
        }

        best
    }
}

/// The first usable run wins, regardless of its length
#[derive(Debug, Clone, Copy)]
struct FirstFit;
impl MatchFinder for FirstFit {
    fn find(&self, dict: &RollingDict, ahead: &[u8]) -> Option<BackRef> {
        candidates(dict, ahead).next()
    }
}
