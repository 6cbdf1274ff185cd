//! Cell slice: sequential reader over a cell
use crate::address::Address;
use crate::cell::Cell;
use crate::error::CellError;
use std::sync::Arc;

/// Reads bits and references from a cell in the order they were stored.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    fn ensure_bits(&self, needed: usize) -> Result<(), CellError> {
        let remaining = self.remaining_bits();
        if needed > remaining {
            return Err(CellError::BitUnderflow { needed, remaining });
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure_bits(1)?;
        let bit = self.cell.bits().get(self.bit_pos).unwrap_or(false);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::IntegerOverflow { value: 0, bits });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.load_bit()?);
        }
        Ok(value)
    }

    pub fn load_i8(&mut self) -> Result<i8, CellError> {
        Ok(self.load_uint(8)? as u8 as i8)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure_bits(len * 8)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    pub fn load_array<const N: usize>(&mut self) -> Result<[u8; N], CellError> {
        self.ensure_bits(N * 8)?;
        let mut out = [0u8; N];
        for byte in out.iter_mut() {
            *byte = self.load_uint(8)? as u8;
        }
        Ok(out)
    }

    /// Inverse of [`CellBuilder::store_address`](crate::CellBuilder::store_address).
    pub fn load_address(&mut self) -> Result<Option<Address>, CellError> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::InvalidAddress("anycast is not supported".into()));
                }
                let workchain = self.load_i8()?;
                let hash = self.load_array::<32>()?;
                Ok(Some(Address::new(workchain, hash)))
            }
            tag => Err(CellError::InvalidAddress(format!(
                "unsupported address tag {tag:02b}"
            ))),
        }
    }

    pub fn load_reference(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        let cell = self
            .cell
            .reference(self.ref_pos)
            .ok_or(CellError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    /// Read the rest of this cell plus its chained children as one byte string.
    pub fn load_snake_bytes(&mut self) -> Result<Vec<u8>, CellError> {
        let mut out = Vec::new();
        let mut current = self.clone();
        loop {
            if current.remaining_bits() % 8 != 0 {
                return Err(CellError::InvalidSnake);
            }
            out.extend(current.load_bytes(current.remaining_bits() / 8)?);
            if current.remaining_refs() == 0 {
                break;
            }
            current = CellSlice::new(current.load_reference()?);
        }
        self.bit_pos = self.cell.bit_len();
        self.ref_pos = self.cell.refs().len().min(self.ref_pos + 1);
        Ok(out)
    }
}
