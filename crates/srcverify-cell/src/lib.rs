//! Cell tree codec used by the verifier wire protocol.
//!
//! A cell holds up to 1023 data bits and up to 4 references to child cells.
//! Every cell has a representation hash computed bottom-up from its bits and
//! the hashes of its children, so two cells with equal hashes are the same
//! tree with cryptographic confidence.
//!
//! # Example
//!
//! ```
//! use srcverify_cell::{Cell, CellBuilder};
//! use std::sync::Arc;
//!
//! let mut child = CellBuilder::new();
//! child.store_uint(7, 8).unwrap();
//! let child = Arc::new(child.build().unwrap());
//!
//! let mut root = CellBuilder::new();
//! root.store_uint(0x75217758, 32).unwrap();
//! root.store_reference(child).unwrap();
//! let root = root.build().unwrap();
//!
//! let boc = root.to_boc();
//! let decoded = Cell::from_boc(&boc).unwrap();
//! assert_eq!(decoded.hash(), root.hash());
//! ```

pub mod address;
pub mod bits;
pub mod boc;
pub mod builder;
pub mod cell;
pub mod error;
pub mod slice;

pub use address::Address;
pub use bits::{BitString, MAX_CELL_BITS};
pub use boc::{deserialize_boc, deserialize_boc_roots, serialize_boc, BocOptions};
pub use builder::CellBuilder;
pub use cell::{Cell, MAX_DEPTH, MAX_REFS};
pub use error::CellError;
pub use slice::CellSlice;
