//! Signature chain: a singly linked list of signature cells
//!
//! ```text
//! head ──► [sig:512 | pubkey:256] ──► [sig:512 | pubkey:256] ──► ... (no ref)
//! ```
//!
//! Each node has exactly 768 data bits and at most one reference, pointing to
//! the next node. The walk is iterative and capped at [`MAX_CHAIN_LENGTH`], so
//! hostile input cannot drive unbounded work.
use crate::error::{VerifierError, VerifierResult};
use srcverify_cell::{Cell, CellBuilder};
use std::sync::Arc;

pub const SIGNATURE_BITS: usize = 512;
pub const PUBLIC_KEY_BITS: usize = 256;
pub const NODE_BITS: usize = SIGNATURE_BITS + PUBLIC_KEY_BITS;

/// Longest chain the walk will follow
pub const MAX_CHAIN_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry {
    pub signature: [u8; 64],
    pub public_key: [u8; 32],
}

impl SignatureEntry {
    pub fn new(signature: [u8; 64], public_key: [u8; 32]) -> Self {
        Self {
            signature,
            public_key,
        }
    }

    /// Decode one node, returning its entry and the next node if any.
    pub fn decode(cell: &Cell) -> VerifierResult<(Self, Option<&Arc<Cell>>)> {
        if cell.bit_len() != NODE_BITS {
            return Err(VerifierError::InvalidSignatureCell(format!(
                "expected {NODE_BITS} bits, got {}",
                cell.bit_len()
            )));
        }
        if cell.refs().len() > 1 {
            return Err(VerifierError::InvalidSignatureCell(format!(
                "expected at most one reference, got {}",
                cell.refs().len()
            )));
        }
        let mut slice = cell.parse();
        let signature = slice
            .load_array::<64>()
            .map_err(|e| VerifierError::InvalidSignatureCell(e.to_string()))?;
        let public_key = slice
            .load_array::<32>()
            .map_err(|e| VerifierError::InvalidSignatureCell(e.to_string()))?;
        Ok((Self::new(signature, public_key), cell.reference(0)))
    }

    /// Build a node pointing at `next`.
    pub fn to_cell(&self, next: Option<Arc<Cell>>) -> VerifierResult<Cell> {
        let mut b = CellBuilder::new();
        b.store_bytes(&self.signature)?;
        b.store_bytes(&self.public_key)?;
        if let Some(next) = next {
            b.store_reference(next)?;
        }
        Ok(b.build()?)
    }
}

/// Lazily walks a chain from its head, yielding decoded entries.
pub struct ChainWalker<'a> {
    next: Option<&'a Arc<Cell>>,
    walked: usize,
}

impl<'a> ChainWalker<'a> {
    pub fn new(head: Option<&'a Arc<Cell>>) -> Self {
        Self {
            next: head,
            walked: 0,
        }
    }
}

impl Iterator for ChainWalker<'_> {
    type Item = VerifierResult<SignatureEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.next.take()?;
        if self.walked >= MAX_CHAIN_LENGTH {
            return Some(Err(VerifierError::InvalidSignatureCell(format!(
                "chain longer than {MAX_CHAIN_LENGTH} nodes"
            ))));
        }
        self.walked += 1;
        match SignatureEntry::decode(cell) {
            Ok((entry, next)) => {
                self.next = next;
                Some(Ok(entry))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Decode a whole chain into a flat list.
pub fn read_chain(head: Option<&Arc<Cell>>) -> VerifierResult<Vec<SignatureEntry>> {
    ChainWalker::new(head).collect()
}

/// Build a chain from a flat list; `None` for an empty list.
pub fn build_chain(entries: &[SignatureEntry]) -> VerifierResult<Option<Arc<Cell>>> {
    let mut next = None;
    for entry in entries.iter().rev() {
        next = Some(Arc::new(entry.to_cell(next)?));
    }
    Ok(next)
}

/// Attach `entry` after the tail of the chain starting at `head`.
///
/// The nodes on the path are rebuilt with their original bits; only the new
/// tail is fresh. A node with more than one reference is not a list and fails
/// with `TooManyReferences`.
pub fn append_signature(
    head: Option<&Arc<Cell>>,
    entry: &SignatureEntry,
) -> VerifierResult<Arc<Cell>> {
    let mut path: Vec<&Arc<Cell>> = Vec::new();
    let mut cursor = head;
    while let Some(node) = cursor {
        if node.refs().len() > 1 {
            return Err(VerifierError::TooManyReferences);
        }
        if path.len() >= MAX_CHAIN_LENGTH {
            return Err(VerifierError::InvalidSignatureCell(format!(
                "chain longer than {MAX_CHAIN_LENGTH} nodes"
            )));
        }
        path.push(node);
        cursor = node.reference(0);
    }

    let mut tail = Arc::new(entry.to_cell(None)?);
    for node in path.into_iter().rev() {
        tail = Arc::new(Cell::new(node.bits().clone(), vec![tail])?);
    }
    Ok(tail)
}
