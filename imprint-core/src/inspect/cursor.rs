//! Bounds-checked read-and-advance over a byte slice.
//!
//! Every read returns `None` instead of running past the end, so segment and
//! chunk walkers can bail out with `?` on truncated input.

/// Byte order for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor positioned at `pos` (`None` if past the end).
    pub fn at(data: &'a [u8], pos: usize) -> Option<Self> {
        (pos <= data.len()).then_some(Self { data, pos })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute offset within the slice.
    pub fn seek(&mut self, pos: usize) -> Option<()> {
        if pos > self.data.len() {
            return None;
        }
        self.pos = pos;
        Some(())
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        let end = self.pos.checked_add(n)?;
        self.seek(end)
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Some(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let data = self.data;
        let bytes = data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_bytes(N)?.try_into().ok()
    }

    pub fn read_u16(&mut self, endian: Endian) -> Option<u16> {
        let b = self.read_array::<2>()?;
        Some(match endian {
            Endian::Big => u16::from_be_bytes(b),
            Endian::Little => u16::from_le_bytes(b),
        })
    }

    pub fn read_u32(&mut self, endian: Endian) -> Option<u32> {
        let b = self.read_array::<4>()?;
        Some(match endian {
            Endian::Big => u32::from_be_bytes(b),
            Endian::Little => u32::from_le_bytes(b),
        })
    }

    pub fn read_u16_be(&mut self) -> Option<u16> {
        self.read_u16(Endian::Big)
    }

    pub fn read_u32_be(&mut self) -> Option<u32> {
        self.read_u32(Endian::Big)
    }

    /// Bytes up to (not including) the next NUL; the NUL is consumed.
    pub fn read_until_nul(&mut self) -> Option<&'a [u8]> {
        let data = self.data;
        let rest = &data[self.pos..];
        let len = rest.iter().position(|&b| b == 0)?;
        self.pos += len + 1;
        Some(&rest[..len])
    }

    /// Everything from the cursor to the end.
    pub fn rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let rest = &data[self.pos..];
        self.pos = data.len();
        rest
    }
}
