//! Huffman Codec
//!
//! Static byte-level Huffman coding.
//!
//! - Tree built from a min-heap keyed on `(frequency, smallest byte in
//!   subtree)`, so equal frequencies always resolve toward the lower byte
//! - Tree stored pre-order: `0` = internal node, `1` + 8 bits = leaf
//! - Left edge = `0`, right edge = `1`
//! - A single distinct byte gets the one-bit code `0`

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{PokedexError, Result};

use super::{read_header, BitReader, BitWriter};

pub const MAGIC: &[u8; 4] = b"HUF1";

#[derive(Debug)]
enum Node {
    Leaf(u8),
    Internal(Box<Node>, Box<Node>),
}

/// Compress `data` into a Huffman container
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 16);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());

    let root = match build_tree(data) {
        Some(root) => root,
        None => return out,
    };

    let mut codes: Vec<Vec<bool>> = vec![Vec::new(); 256];
    match &root {
        Node::Leaf(sym) => codes[*sym as usize] = vec![false],
        Node::Internal(..) => assign_codes(&root, &mut Vec::new(), &mut codes),
    }

    let mut bits = BitWriter::new();
    write_tree(&root, &mut bits);
    for &byte in data {
        for &bit in &codes[byte as usize] {
            bits.write_bit(bit);
        }
    }

    out.extend_from_slice(&bits.finish());
    out
}

/// Restore the bytes of a Huffman container
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let (len, payload) = read_header(data, MAGIC)?;
    let len = usize::try_from(len).map_err(|_| corrupt("length overflows usize"))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    // every symbol costs at least one bit
    if len > payload.len().saturating_mul(8) {
        return Err(corrupt("announced length exceeds the code stream"));
    }

    let mut bits = BitReader::new(payload);
    let mut leaves = 0;
    let root = read_tree(&mut bits, 0, &mut leaves)?;

    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let mut node = &root;
        if let Node::Leaf(sym) = node {
            bits.read_bit().ok_or_else(|| corrupt("code stream ended early"))?;
            out.push(*sym);
            continue;
        }
        while let Node::Internal(left, right) = node {
            let bit = bits
                .read_bit()
                .ok_or_else(|| corrupt("code stream ended early"))?;
            node = if bit { right } else { left };
        }
        if let Node::Leaf(sym) = node {
            out.push(*sym);
        }
    }
    Ok(out)
}

// =============================================================================
// Tree Construction
// =============================================================================

fn build_tree(data: &[u8]) -> Option<Node> {
    let mut freq = [0u64; 256];
    for &b in data {
        freq[b as usize] += 1;
    }

    // (frequency, min symbol) is unique per subtree, so the slot index
    // never decides an ordering
    let mut nodes: Vec<Option<Node>> = Vec::new();
    let mut heap = BinaryHeap::new();
    for (sym, &f) in freq.iter().enumerate() {
        if f > 0 {
            heap.push(Reverse((f, sym as u8, nodes.len())));
            nodes.push(Some(Node::Leaf(sym as u8)));
        }
    }

    while heap.len() > 1 {
        let Reverse((fa, ma, a)) = heap.pop()?;
        let Reverse((fb, mb, b)) = heap.pop()?;
        let left = nodes[a].take()?;
        let right = nodes[b].take()?;
        heap.push(Reverse((fa + fb, ma.min(mb), nodes.len())));
        nodes.push(Some(Node::Internal(Box::new(left), Box::new(right))));
    }

    let Reverse((_, _, root)) = heap.pop()?;
    nodes[root].take()
}

fn assign_codes(node: &Node, prefix: &mut Vec<bool>, codes: &mut [Vec<bool>]) {
    match node {
        Node::Leaf(sym) => codes[*sym as usize] = prefix.clone(),
        Node::Internal(left, right) => {
            prefix.push(false);
            assign_codes(left, prefix, codes);
            prefix.pop();
            prefix.push(true);
            assign_codes(right, prefix, codes);
            prefix.pop();
        }
    }
}

// =============================================================================
// Tree Serialization
// =============================================================================

fn write_tree(node: &Node, bits: &mut BitWriter) {
    match node {
        Node::Leaf(sym) => {
            bits.write_bit(true);
            bits.write_bits(*sym as u32, 8);
        }
        Node::Internal(left, right) => {
            bits.write_bit(false);
            write_tree(left, bits);
            write_tree(right, bits);
        }
    }
}

fn read_tree(bits: &mut BitReader<'_>, depth: usize, leaves: &mut usize) -> Result<Node> {
    // a tree over 256 symbols has at most 255 levels below the root
    if depth > 255 || *leaves >= 256 {
        return Err(corrupt("malformed code tree"));
    }
    let is_leaf = bits.read_bit().ok_or_else(|| corrupt("truncated code tree"))?;
    if is_leaf {
        let sym = bits
            .read_bits(8)
            .ok_or_else(|| corrupt("truncated code tree"))?;
        *leaves += 1;
        return Ok(Node::Leaf(sym as u8));
    }
    let left = read_tree(bits, depth + 1, leaves)?;
    let right = read_tree(bits, depth + 1, leaves)?;
    Ok(Node::Internal(Box::new(left), Box::new(right)))
}

fn corrupt(msg: &str) -> PokedexError {
    PokedexError::CorruptStream(format!("huffman: {}", msg))
}
