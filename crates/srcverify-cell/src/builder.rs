//! Cell builder
use crate::address::Address;
use crate::bits::BitString;
use crate::cell::{Cell, MAX_REFS};
use crate::error::CellError;
use std::sync::Arc;

/// Appends bits and references, then freezes them into a [`Cell`].
///
/// Every store is all-or-nothing: a store that would overflow the cell fails
/// without writing anything.
#[derive(Debug, Default, Clone)]
pub struct CellBuilder {
    bits: BitString,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available_bits(&self) -> usize {
        self.bits.available()
    }

    pub fn available_refs(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    fn ensure_bits(&self, needed: usize) -> Result<(), CellError> {
        if needed > self.available_bits() {
            return Err(CellError::BitOverflow(self.bits.len() + needed));
        }
        Ok(())
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.bits.push(bit)?;
        Ok(self)
    }

    /// Store `value` as an unsigned big-endian integer of `bits` width (at most 64).
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::IntegerOverflow { value, bits });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.bits.push((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_i8(&mut self, value: i8) -> Result<&mut Self, CellError> {
        self.store_uint(value as u8 as u64, 8)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_bits(bytes.len() * 8)?;
        for byte in bytes {
            for i in (0..8).rev() {
                self.bits.push((byte >> i) & 1 == 1)?;
            }
        }
        Ok(self)
    }

    pub fn store_bits(&mut self, bits: &BitString) -> Result<&mut Self, CellError> {
        self.ensure_bits(bits.len())?;
        for i in 0..bits.len() {
            self.bits.push(bits.get(i).unwrap_or(false))?;
        }
        Ok(self)
    }

    /// `addr_none$00` for `None`, otherwise `addr_std$10` without anycast.
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self, CellError> {
        match address {
            None => self.store_uint(0b00, 2),
            Some(addr) => {
                self.ensure_bits(Address::STD_BITS)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_i8(addr.workchain)?;
                self.store_bytes(&addr.hash)
            }
        }
    }

    pub fn store_reference(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Store bytes as a snake string: whatever does not fit in this cell
    /// continues in a chained child cell.
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        let fits = self.available_bits() / 8;
        if bytes.len() <= fits {
            return self.store_bytes(bytes);
        }
        if self.available_refs() == 0 {
            return Err(CellError::RefOverflow);
        }
        let (head, tail) = bytes.split_at(fits);
        let mut next = CellBuilder::new();
        next.store_snake_bytes(tail)?;
        let next = Arc::new(next.build()?);
        self.store_bytes(head)?;
        self.store_reference(next)
    }

    pub fn build(self) -> Result<Cell, CellError> {
        Cell::new(self.bits, self.refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_uint_layout() {
        let mut b = CellBuilder::new();
        b.store_uint(0x75217758, 32).unwrap().store_uint(1, 4).unwrap();
        let cell = b.build().unwrap();
        assert_eq!(cell.bit_len(), 36);
        assert_eq!(cell.bits().as_bytes(), &[0x75, 0x21, 0x77, 0x58, 0x10]);
    }

    #[test]
    fn test_store_uint_rejects_wide_values() {
        let mut b = CellBuilder::new();
        assert_eq!(
            b.store_uint(256, 8).unwrap_err(),
            CellError::IntegerOverflow { value: 256, bits: 8 }
        );
        assert!(b.store_uint(u64::MAX, 64).is_ok());
    }

    #[test]
    fn test_overflowing_store_writes_nothing() {
        let mut b = CellBuilder::new();
        b.store_bytes(&[0xaa; 127]).unwrap();
        assert!(b.store_uint(0, 8).is_err());
        assert_eq!(b.available_bits(), 7);
    }

    #[test]
    fn test_fifth_reference_rejected() {
        let mut b = CellBuilder::new();
        for _ in 0..MAX_REFS {
            let leaf = Arc::new(CellBuilder::new().build().unwrap());
            b.store_reference(leaf).unwrap();
        }
        let leaf = Arc::new(CellBuilder::new().build().unwrap());
        assert_eq!(b.store_reference(leaf).unwrap_err(), CellError::RefOverflow);
    }

    #[test]
    fn test_snake_spills_into_child() {
        let text = vec![b'x'; 300];
        let mut b = CellBuilder::new();
        b.store_snake_bytes(&text).unwrap();
        let cell = b.build().unwrap();
        assert_eq!(cell.bit_len(), 127 * 8);
        assert_eq!(cell.refs().len(), 1);
        assert_eq!(cell.parse().load_snake_bytes().unwrap(), text);
    }
}
