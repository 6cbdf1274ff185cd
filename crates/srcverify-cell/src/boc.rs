//! Bag-of-cells serialization
//!
//! Layout of the generic `b5ee9c72` format:
//!
//! ```text
//! magic:u32 | has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3 | off_bytes:u8
//! cells:size | roots:size | absent:size | tot_cells_size:off_bytes
//! root_list:[size] | index:[off_bytes]? | cell_data | crc32c:u32 LE?
//! ```

use crate::bits::BitString;
use crate::cell::{Cell, MAX_REFS};
use crate::error::CellError;
use crc::{Crc, CRC_32_ISCSI};
use std::collections::HashSet;
use std::sync::Arc;

const BOC_MAGIC: u32 = 0xb5ee_9c72;
const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BocOptions {
    pub with_index: bool,
    pub with_crc32c: bool,
}

impl Default for BocOptions {
    fn default() -> Self {
        Self {
            with_index: false,
            with_crc32c: true,
        }
    }
}

/// Unique cells, root first, every child after all of its parents.
///
/// Reverse post-order of a depth-first walk that visits children last to
/// first, which is the ordering the chain runtime's reference encoder emits.
fn topological_order(root: &Cell) -> Vec<&Cell> {
    let mut visited: HashSet<[u8; 32]> = HashSet::new();
    let mut postorder: Vec<&Cell> = Vec::new();
    let mut stack: Vec<(&Cell, usize)> = vec![(root, 0)];
    visited.insert(*root.hash());

    while let Some(top) = stack.last_mut() {
        let cell = top.0;
        let refs = cell.refs();
        if top.1 < refs.len() {
            let child: &Cell = &refs[refs.len() - 1 - top.1];
            top.1 += 1;
            if visited.insert(*child.hash()) {
                stack.push((child, 0));
            }
        } else {
            postorder.push(cell);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder
}

fn bytes_for(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
}

pub fn serialize_boc(root: &Cell, options: BocOptions) -> Vec<u8> {
    let cells = topological_order(root);
    let index_of: std::collections::HashMap<[u8; 32], u64> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| (*c.hash(), i as u64))
        .collect();

    let size_bytes = bytes_for(cells.len() as u64);
    let mut offsets = Vec::with_capacity(cells.len());
    let mut total = 0u64;
    for cell in &cells {
        total += (2 + cell.bit_len().div_ceil(8) + cell.refs().len() * size_bytes) as u64;
        offsets.push(total);
    }
    let off_bytes = bytes_for(total);

    let mut out = Vec::new();
    out.extend_from_slice(&BOC_MAGIC.to_be_bytes());
    let mut flags = size_bytes as u8;
    if options.with_index {
        flags |= 0x80;
    }
    if options.with_crc32c {
        flags |= 0x40;
    }
    out.push(flags);
    out.push(off_bytes as u8);
    write_uint(&mut out, cells.len() as u64, size_bytes);
    write_uint(&mut out, 1, size_bytes);
    write_uint(&mut out, 0, size_bytes);
    write_uint(&mut out, total, off_bytes);
    write_uint(&mut out, 0, size_bytes);
    if options.with_index {
        for offset in &offsets {
            write_uint(&mut out, *offset, off_bytes);
        }
    }
    for cell in &cells {
        out.extend_from_slice(&cell.descriptors());
        out.extend(cell.bits().padded());
        for child in cell.refs() {
            // every child was collected by the walk above
            let idx = index_of.get(child.hash()).copied().unwrap_or_default();
            write_uint(&mut out, idx, size_bytes);
        }
    }
    if options.with_crc32c {
        let crc = CRC32C.checksum(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }
    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], CellError> {
        if len > self.remaining() {
            return Err(CellError::malformed("unexpected end of input"));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CellError> {
        Ok(self.bytes(1)?[0])
    }

    fn uint(&mut self, width: usize) -> Result<u64, CellError> {
        Ok(self
            .bytes(width)?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

struct RawCell {
    bits: BitString,
    refs: Vec<usize>,
}

fn read_cell(reader: &mut Reader<'_>, index: usize, count: usize, size_bytes: usize) -> Result<RawCell, CellError> {
    let d1 = reader.u8()?;
    let d2 = reader.u8()?;
    let ref_count = (d1 & 0x07) as usize;
    if ref_count > MAX_REFS {
        return Err(CellError::malformed(format!("cell {index}: ref-count overflow ({ref_count})")));
    }
    if d1 & 0x08 != 0 {
        return Err(CellError::malformed(format!("cell {index}: exotic cells are not supported")));
    }
    if d1 & 0x10 != 0 || d1 >> 5 != 0 {
        return Err(CellError::malformed(format!("cell {index}: levelled or hashed cells are not supported")));
    }

    let data = reader.bytes((d2 as usize).div_ceil(2))?;
    let bits = BitString::from_padded(data, d2 % 2 == 0)
        .map_err(|e| CellError::malformed(format!("cell {index}: {e}")))?;
    // an odd d2 announces a partial last byte
    if d2 % 2 == 1 && bits.len() % 8 == 0 {
        return Err(CellError::malformed(format!(
            "cell {index}: completion tag on byte-aligned data"
        )));
    }

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        let r = reader.uint(size_bytes)? as usize;
        if r <= index || r >= count {
            return Err(CellError::malformed(format!("cell {index}: bad reference index {r}")));
        }
        refs.push(r);
    }
    Ok(RawCell { bits, refs })
}

/// Decode every root of a bag of cells.
pub fn deserialize_boc_roots(bytes: &[u8]) -> Result<Vec<Arc<Cell>>, CellError> {
    if bytes.len() < 6 {
        return Err(CellError::malformed("unexpected end of input"));
    }
    let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != BOC_MAGIC {
        return Err(CellError::malformed(format!("unknown magic {magic:#010x}")));
    }

    let flags = bytes[4];
    let has_index = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    if flags & 0x18 != 0 {
        return Err(CellError::malformed("reserved flags are set"));
    }
    let size_bytes = (flags & 0x07) as usize;
    if !(1..=4).contains(&size_bytes) {
        return Err(CellError::malformed(format!("invalid size bytes {size_bytes}")));
    }

    let body = if has_crc {
        if bytes.len() < 10 {
            return Err(CellError::malformed("unexpected end of input"));
        }
        let (body, tail) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        if CRC32C.checksum(body) != expected {
            return Err(CellError::malformed("crc32c mismatch"));
        }
        body
    } else {
        bytes
    };

    let mut reader = Reader::new(&body[5..]);
    let off_bytes = reader.u8()? as usize;
    if !(1..=8).contains(&off_bytes) {
        return Err(CellError::malformed(format!("invalid offset bytes {off_bytes}")));
    }
    let cell_count = reader.uint(size_bytes)? as usize;
    let root_count = reader.uint(size_bytes)? as usize;
    let absent = reader.uint(size_bytes)?;
    let total = reader.uint(off_bytes)?;

    if cell_count == 0 || root_count == 0 || root_count > cell_count {
        return Err(CellError::malformed(format!(
            "invalid counts: {cell_count} cells, {root_count} roots"
        )));
    }
    if absent != 0 {
        return Err(CellError::malformed("absent cells are not supported"));
    }
    // every cell needs at least its two descriptor bytes
    if cell_count > reader.remaining() / 2 || total > reader.remaining() as u64 {
        return Err(CellError::malformed("declared sizes exceed input"));
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        let r = reader.uint(size_bytes)? as usize;
        if r >= cell_count {
            return Err(CellError::malformed(format!("bad root index {r}")));
        }
        roots.push(r);
    }
    if has_index {
        reader.bytes(cell_count * off_bytes)?;
    }

    let mut data = Reader::new(reader.bytes(total as usize)?);
    if reader.remaining() != 0 {
        return Err(CellError::malformed("trailing bytes after cell data"));
    }
    let mut raw = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        raw.push(read_cell(&mut data, i, cell_count, size_bytes)?);
    }
    if data.remaining() != 0 {
        return Err(CellError::malformed("cell data size mismatch"));
    }

    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (i, cell) in raw.into_iter().enumerate().rev() {
        let refs = cell
            .refs
            .iter()
            .map(|&r| built[r].clone().ok_or_else(|| CellError::malformed("dangling reference")))
            .collect::<Result<Vec<_>, _>>()?;
        let cell = Cell::new(cell.bits, refs).map_err(|e| CellError::malformed(e.to_string()))?;
        built[i] = Some(Arc::new(cell));
    }

    roots
        .into_iter()
        .map(|r| built[r].clone().ok_or_else(|| CellError::malformed("dangling root")))
        .collect()
}

/// Decode the first root of a bag of cells.
pub fn deserialize_boc(bytes: &[u8]) -> Result<Arc<Cell>, CellError> {
    deserialize_boc_roots(bytes)?
        .into_iter()
        .next()
        .ok_or_else(|| CellError::malformed("no roots"))
}
