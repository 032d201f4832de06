//! A bounds checked cursor over an in-memory byte slice.
//!
//! Every multi-byte value in a pack file is little endian. Reads advance the
//! cursor, while peeks look at an absolute offset and leave it alone. Running
//! off the end of the slice is reported as [`LvError::Truncated`] instead of
//! panicking.

use crate::errors::LvError;
use std::convert::TryInto;

#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Move the cursor to absolute position `pos`. Seeking to one past the
    /// last byte is allowed, as that is where a fully consumed cursor sits.
    pub fn seek(&mut self, pos: usize) -> Result<(), LvError> {
        if pos > self.data.len() {
            return Err(self.truncated(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub fn tell(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `n` bytes and advance past them
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], LvError> {
        let bytes = self.slice_at(self.pos, n)?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, LvError> {
        let val = self.peek_u8(self.pos)?;
        self.pos += 1;
        Ok(val)
    }

    pub fn read_le16(&mut self) -> Result<u16, LvError> {
        let val = self.peek_le16(self.pos)?;
        self.pos += 2;
        Ok(val)
    }

    pub fn read_le32(&mut self) -> Result<u32, LvError> {
        let val = self.peek_le32(self.pos)?;
        self.pos += 4;
        Ok(val)
    }

    pub fn peek_u8(&self, offset: usize) -> Result<u8, LvError> {
        self.slice_at(offset, 1).map(|b| b[0])
    }

    pub fn peek_le16(&self, offset: usize) -> Result<u16, LvError> {
        let bytes = self.array_at::<2>(offset)?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn peek_le32(&self, offset: usize) -> Result<u32, LvError> {
        let bytes = self.array_at::<4>(offset)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N], LvError> {
        let bytes = self.slice_at(offset, N)?;
        bytes.try_into().map_err(|_| self.truncated(offset, N))
    }

    fn slice_at(&self, offset: usize, n: usize) -> Result<&'a [u8], LvError> {
        offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| self.truncated(offset, n))
    }

    fn truncated(&self, offset: usize, needed: usize) -> LvError {
        LvError::Truncated {
            offset,
            needed,
            len: self.data.len(),
        }
    }
}
