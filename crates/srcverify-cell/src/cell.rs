//! Cells and their representation hash
use crate::bits::BitString;
use crate::boc::{deserialize_boc, serialize_boc, BocOptions};
use crate::error::CellError;
use crate::slice::CellSlice;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Maximum number of references per cell
pub const MAX_REFS: usize = 4;

/// Maximum tree depth accepted when building or decoding cells
pub const MAX_DEPTH: u16 = 1024;

/// An immutable ordinary cell.
///
/// Children are shared through `Arc`, so rebuilding a parent around an
/// unchanged subtree reuses it instead of copying. Hash and depth are computed
/// once at construction from the children's cached values.
#[derive(Clone)]
pub struct Cell {
    bits: BitString,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    pub fn new(bits: BitString, refs: Vec<Arc<Cell>>) -> Result<Self, CellError> {
        if refs.len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        let depth = refs.iter().map(|r| r.depth + 1).max().unwrap_or(0);
        if depth > MAX_DEPTH {
            return Err(CellError::DepthOverflow(depth));
        }
        let hash = representation_hash(&bits, &refs);
        Ok(Self {
            bits,
            refs,
            hash,
            depth,
        })
    }

    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.refs.get(index)
    }

    /// Representation hash (SHA-256)
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// `[d1, d2]` descriptor bytes of an ordinary level-0 cell
    pub fn descriptors(&self) -> [u8; 2] {
        [self.refs.len() as u8, self.bits.descriptor()]
    }

    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Serialize as a bag of cells with default options (CRC32C, no index).
    pub fn to_boc(&self) -> Vec<u8> {
        serialize_boc(self, BocOptions::default())
    }

    pub fn from_boc(bytes: &[u8]) -> Result<Arc<Cell>, CellError> {
        deserialize_boc(bytes)
    }
}

fn representation_hash(bits: &BitString, refs: &[Arc<Cell>]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([refs.len() as u8, bits.descriptor()]);
    hasher.update(bits.padded());
    for r in refs {
        hasher.update(r.depth.to_be_bytes());
    }
    for r in refs {
        hasher.update(r.hash);
    }
    hasher.finalize().into()
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Cell");
        s.field("bits", &self.bits);
        if !self.refs.is_empty() {
            s.field("refs", &self.refs);
        }
        s.finish()
    }
}
