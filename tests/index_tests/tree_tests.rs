//! Tests for the key index structures
//!
//! These tests verify:
//! - Structural invariants of the B-tree, B*-tree, B+-tree and extendible
//!   hash through interleaved inserts and deletes
//! - Point lookups, re-addressing and ordered range scans
//! - The B+-tree leaf chain

use std::collections::BTreeMap;

use pokedex::index::{BPlusTree, ExtendibleHash, KeyIndex, MultiwayTree, SequentialIndex, SplitPolicy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// =============================================================================
// Helper Functions
// =============================================================================

fn shuffled_ids(count: u32, seed: u64) -> Vec<u32> {
    let mut ids: Vec<u32> = (1..=count).collect();
    ids.shuffle(&mut StdRng::seed_from_u64(seed));
    ids
}

/// Address derived from the id so lookups can be checked without a store
fn addr_of(id: u32) -> usize {
    id as usize * 3 + 1
}

/// Drive an index and a BTreeMap oracle through the same workload
fn exercise<I: KeyIndex>(index: &mut I, check: impl Fn(&I) -> Result<(), String>) {
    let mut oracle = BTreeMap::new();

    for (n, id) in shuffled_ids(600, 42).into_iter().enumerate() {
        index.insert(id, addr_of(id));
        oracle.insert(id, addr_of(id));
        if n % 50 == 0 {
            check(index).unwrap();
        }
    }
    check(index).unwrap();
    assert_eq!(index.len(), oracle.len());

    for (n, id) in shuffled_ids(600, 43).into_iter().take(450).enumerate() {
        assert_eq!(index.remove(id), oracle.remove(&id));
        if n % 25 == 0 {
            check(index).unwrap();
        }
    }
    check(index).unwrap();
    assert_eq!(index.len(), oracle.len());

    // removing again is a no-op
    let gone = shuffled_ids(600, 43)[0];
    assert_eq!(index.remove(gone), None);

    for id in 1..=600 {
        assert_eq!(index.get(id), oracle.get(&id).copied(), "id {}", id);
    }

    let expected: Vec<(u32, usize)> = oracle.range(100..=300).map(|(&k, &v)| (k, v)).collect();
    assert_eq!(index.range(100, 300), expected);
    assert!(index.range(300, 100).is_empty());

    // refill the holes
    for id in shuffled_ids(600, 44) {
        index.insert(id, addr_of(id));
    }
    check(index).unwrap();
    assert_eq!(index.len(), 600);
}

// =============================================================================
// B-tree / B*-tree Tests
// =============================================================================

#[test]
fn test_btree_invariants_through_workload() {
    for order in [4, 5, 8, 16] {
        let mut tree = MultiwayTree::new(order, SplitPolicy::Classic);
        exercise(&mut tree, |t| t.check_invariants());
    }
}

#[test]
fn test_bstar_invariants_through_workload() {
    for order in [4, 5, 8, 16] {
        let mut tree = MultiwayTree::new(order, SplitPolicy::Star);
        exercise(&mut tree, |t| t.check_invariants());
    }
}

#[test]
fn test_bstar_nodes_fuller_than_btree() {
    let classic = MultiwayTree::new(9, SplitPolicy::Classic);
    let star = MultiwayTree::new(9, SplitPolicy::Star);

    assert_eq!(classic.min_keys(), 4);
    assert!(star.min_keys() > classic.min_keys());
    assert_eq!(star.max_keys(), classic.max_keys());
}

#[test]
fn test_multiway_entries_sorted_and_height_grows() {
    let mut tree = MultiwayTree::new(4, SplitPolicy::Classic);
    assert_eq!(tree.height(), 1);

    for id in shuffled_ids(200, 1) {
        tree.insert(id, addr_of(id));
    }
    let entries = tree.entries();
    assert_eq!(entries.len(), 200);
    assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(tree.height() > 2);
}

#[test]
fn test_multiway_insert_existing_readdresses() {
    let mut tree = MultiwayTree::new(5, SplitPolicy::Star);
    for id in 1..=50 {
        tree.insert(id, addr_of(id));
    }

    tree.insert(25, 9999);

    assert_eq!(tree.len(), 50);
    assert_eq!(tree.get(25), Some(9999));
    tree.check_invariants().unwrap();
}

// =============================================================================
// B+-tree Tests
// =============================================================================

#[test]
fn test_bplus_invariants_through_workload() {
    for order in [4, 5, 8, 16] {
        let mut tree = BPlusTree::new(order);
        exercise(&mut tree, |t| t.check_invariants());
    }
}

#[test]
fn test_bplus_leaf_chain_is_sorted_and_complete() {
    let mut tree = BPlusTree::new(4);
    for id in shuffled_ids(300, 2) {
        tree.insert(id, addr_of(id));
    }
    for id in (1..=300).step_by(3) {
        tree.remove(id);
    }

    let chain = tree.leaf_chain();
    let expected: Vec<u32> = (1..=300).filter(|id| (id - 1) % 3 != 0).collect();
    assert_eq!(chain, expected);
    assert!(tree.height() > 1);
}

#[test]
fn test_bplus_shrinks_to_single_leaf() {
    let mut tree = BPlusTree::new(4);
    for id in 1..=100 {
        tree.insert(id, addr_of(id));
    }
    for id in 1..=100 {
        tree.remove(id);
        tree.check_invariants().unwrap();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    assert!(tree.leaf_chain().is_empty());
}

// =============================================================================
// Extendible Hash Tests
// =============================================================================

#[test]
fn test_hash_invariants_through_workload() {
    for capacity in [1, 2, 4, 8] {
        let mut hash = ExtendibleHash::new(capacity);
        exercise(&mut hash, |h| h.check_invariants());
    }
}

#[test]
fn test_hash_directory_doubles() {
    let mut hash = ExtendibleHash::new(2);
    assert_eq!(hash.global_depth(), 0);
    assert_eq!(hash.directory_len(), 1);

    for id in 1..=64 {
        hash.insert(id, addr_of(id));
    }

    assert!(hash.global_depth() >= 5);
    assert_eq!(hash.directory_len(), 1 << hash.global_depth());
    assert!(hash.bucket_count() >= 32);
}

// =============================================================================
// Sequential Index Tests
// =============================================================================

#[test]
fn test_sequential_matches_oracle() {
    let mut index = SequentialIndex::new();
    exercise(&mut index, |_| Ok(()));
}
