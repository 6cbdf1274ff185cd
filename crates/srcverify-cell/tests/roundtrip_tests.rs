//! Property tests for the bag-of-cells codec.
//!
//! Random trees are built, serialized, decoded and compared node by node.

use proptest::prelude::*;
use srcverify_cell::{deserialize_boc, serialize_boc, BocOptions, Cell, CellBuilder};
use std::sync::Arc;

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(64);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

#[derive(Debug, Clone)]
struct Node {
    bits: Vec<bool>,
    children: Vec<Node>,
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = prop::collection::vec(any::<bool>(), 0..96).prop_map(|bits| Node {
        bits,
        children: vec![],
    });
    leaf.prop_recursive(4, 48, 4, |inner| {
        (
            prop::collection::vec(any::<bool>(), 0..96),
            prop::collection::vec(inner, 0..=4),
        )
            .prop_map(|(bits, children)| Node { bits, children })
    })
}

fn build(node: &Node) -> Arc<Cell> {
    let mut b = CellBuilder::new();
    for bit in &node.bits {
        b.store_bit(*bit).unwrap();
    }
    for child in &node.children {
        b.store_reference(build(child)).unwrap();
    }
    Arc::new(b.build().unwrap())
}

fn assert_same_tree(node: &Node, cell: &Cell) {
    assert_eq!(cell.bit_len(), node.bits.len());
    for (i, bit) in node.bits.iter().enumerate() {
        assert_eq!(cell.bits().get(i), Some(*bit));
    }
    assert_eq!(cell.refs().len(), node.children.len());
    for (child, cell) in node.children.iter().zip(cell.refs()) {
        assert_same_tree(child, cell);
    }
}

fn arb_options() -> impl Strategy<Value = BocOptions> {
    (any::<bool>(), any::<bool>()).prop_map(|(with_index, with_crc32c)| BocOptions {
        with_index,
        with_crc32c,
    })
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn boc_roundtrip_preserves_structure(node in arb_node(), options in arb_options()) {
        let cell = build(&node);
        let decoded = deserialize_boc(&serialize_boc(&cell, options)).unwrap();
        prop_assert_eq!(decoded.hash(), cell.hash());
        prop_assert_eq!(decoded.depth(), cell.depth());
        assert_same_tree(&node, &decoded);
    }

    #[test]
    fn reserialization_is_byte_stable(node in arb_node()) {
        let cell = build(&node);
        let first = cell.to_boc();
        let second = Cell::from_boc(&first).unwrap().to_boc();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn hash_ignores_sharing(node in arb_node()) {
        // rebuilding the same content yields the same hash without sharing any Arc
        let (a, b) = (build(&node), build(&node));
        prop_assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn single_bit_flip_changes_hash(node in arb_node().prop_filter("needs data", |n| !n.bits.is_empty())) {
        let mut flipped = node.clone();
        flipped.bits[0] = !flipped.bits[0];
        let (a, b) = (build(&node), build(&flipped));
        prop_assert_ne!(a.hash(), b.hash());
    }
}

#[test]
fn test_garbage_never_panics() {
    let samples: [&[u8]; 4] = [
        b"",
        b"not a boc at all",
        &[0xb5, 0xee, 0x9c, 0x72, 0xff, 0xff],
        &[0xb5, 0xee, 0x9c, 0x72, 0x04, 0x08, 0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01],
    ];
    for sample in samples {
        assert!(deserialize_boc(sample).is_err());
    }
}
