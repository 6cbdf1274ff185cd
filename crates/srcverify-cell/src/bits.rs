//! Bit strings backing cell data
use crate::error::CellError;
use std::fmt;

/// Maximum number of data bits in a single cell
pub const MAX_CELL_BITS: usize = 1023;

/// Bounded bit string, most significant bit first.
///
/// Bits past `len` in the last byte are always zero, so two bit strings with
/// the same content compare equal byte for byte.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    data: Vec<u8>,
    len: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the first `len` bits of `bytes`.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self, CellError> {
        if len > MAX_CELL_BITS {
            return Err(CellError::BitOverflow(len));
        }
        let byte_len = len.div_ceil(8);
        if bytes.len() < byte_len {
            return Err(CellError::BitUnderflow {
                needed: len,
                remaining: bytes.len() * 8,
            });
        }
        let mut data = bytes[..byte_len].to_vec();
        if len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xffu8 << (8 - len % 8);
            }
        }
        Ok(Self { data, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn available(&self) -> usize {
        MAX_CELL_BITS - self.len
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.data[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    pub fn push(&mut self, bit: bool) -> Result<(), CellError> {
        if self.len >= MAX_CELL_BITS {
            return Err(CellError::BitOverflow(self.len + 1));
        }
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
        Ok(())
    }

    /// Raw bytes, last byte zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes with the completion tag appended when the length is not byte aligned.
    pub fn padded(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.len % 8 != 0 {
            out[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        out
    }

    /// Second descriptor byte: `floor(len / 8) + ceil(len / 8)`.
    pub fn descriptor(&self) -> u8 {
        // len <= 1023, so the sum is at most 255
        (self.len / 8 + self.len.div_ceil(8)) as u8
    }

    /// Recover a bit string from tagged bytes as found in serialized cells.
    pub fn from_padded(bytes: &[u8], aligned: bool) -> Result<Self, CellError> {
        if aligned {
            return Self::from_bytes(bytes, bytes.len() * 8);
        }
        let last = *bytes
            .last()
            .ok_or_else(|| CellError::malformed("empty data with completion tag"))?;
        if last == 0 {
            return Err(CellError::malformed("missing completion tag"));
        }
        let len = bytes.len() * 8 - last.trailing_zeros() as usize - 1;
        Self::from_bytes(bytes, len)
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{{}", hex::encode(&self.data))?;
        if self.len % 8 != 0 {
            write!(f, "/{}", self.len)?;
        }
        write!(f, "}}")
    }
}
