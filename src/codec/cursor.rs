//! Bounds-checked cursor over a frame payload.

use crate::error::{FunXmppError, Result};

/// Forward-only reader over a byte slice. Every read checks bounds and
/// fails with [`FunXmppError::UnexpectedEof`] instead of running past the end.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(FunXmppError::UnexpectedEof)
    }

    /// Consume one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    /// Consume a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Consume a big-endian 24-bit integer.
    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.read_bytes(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Consume `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(FunXmppError::UnexpectedEof)?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.peek_u8().unwrap(), 0x01);
        assert_eq!(c.read_u8().unwrap(), 0x01);
        assert_eq!(c.read_u16().unwrap(), 0x0203);
        assert_eq!(c.read_u24().unwrap(), 0x040506);
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.position(), 6);
    }

    #[test]
    fn test_out_of_bounds() {
        let data = [0xAA, 0xBB];
        let mut c = ByteCursor::new(&data);
        assert!(matches!(c.read_u24(), Err(FunXmppError::UnexpectedEof)));
        // A failed read does not move the cursor
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert!(matches!(c.read_u8(), Err(FunXmppError::UnexpectedEof)));
        assert!(matches!(c.read_bytes(usize::MAX), Err(FunXmppError::UnexpectedEof)));
    }
}
