//! Tests for LiveIndex, IndexSet and the inverted index
//!
//! These tests verify:
//! - Every index kind agrees with the sequential index on a real store
//! - Index lifecycle (Absent / Building / Ready) and IndexNotReady
//! - Store mutations flowing into Ready indexes
//! - Inverted index tokenization, postings and query semantics

use std::sync::atomic::AtomicBool;

use pokedex::config::IndexConfig;
use pokedex::error::PokedexError;
use pokedex::index::inverted::tokenize;
use pokedex::index::{IndexKind, IndexSet, IndexState, InvertedIndex, LiveIndex};
use pokedex::record::{release_date_for, NumericField, Record, TextField};
use pokedex::search::{MergeQuery, PatternMethod, SearchMethod};
use pokedex::store::RecordStore;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(id: u32, name: &str, types: (&str, Option<&str>), hp: u32, description: &str) -> Record {
    Record {
        id,
        name: name.to_string(),
        japanese_name: String::new(),
        species: "Test Pokémon".to_string(),
        type_primary: types.0.to_string(),
        type_secondary: types.1.map(str::to_string),
        weight_kg: 10.0,
        height_m: 1.0,
        hp,
        atk: 50,
        def: 50,
        generation: 1,
        release_date: release_date_for(1),
        legendary: false,
        mythical: false,
        description: description.to_string(),
    }
}

fn setup_store(count: u32) -> RecordStore {
    let records = (1..=count)
        .rev()
        .map(|id| record(id, &format!("Mon{}", id), ("Normal", None), 10 + id % 90, ""))
        .collect();
    RecordStore::from_records(records).unwrap()
}

fn setup_dex() -> RecordStore {
    RecordStore::from_records(vec![
        record(1, "Bulbasaur", ("Grass", Some("Poison")), 45, "A strange seed. The seed grows."),
        record(4, "Charmander", ("Fire", None), 39, "The flame on its tail."),
        record(5, "Charmeleon", ("Fire", None), 58, "It slashes with its claws."),
        record(6, "Charizard", ("Fire", Some("Flying")), 78, "It spits fire. Fire melts boulders."),
        record(25, "Pikachu", ("Electric", None), 35, "It stores electricity in its cheeks."),
    ])
    .unwrap()
}

fn config() -> IndexConfig {
    IndexConfig {
        btree_order: 4,
        bplus_order: 4,
        hash_bucket_capacity: 2,
        numeric_bucket_width: 10,
    }
}

fn ids_of(records: &[Record]) -> Vec<u32> {
    records.iter().map(|r| r.id).collect()
}

// =============================================================================
// Agreement Tests
// =============================================================================

#[test]
fn test_every_kind_agrees_with_sequential() {
    let store = setup_store(300);
    let oracle = LiveIndex::build(IndexKind::Sequential, &store, &config());

    for kind in IndexKind::ALL {
        let index = LiveIndex::build(kind, &store, &config());
        assert_eq!(index.kind(), kind);
        assert_eq!(index.len(), 300, "{}", kind);
        for id in 0..=310 {
            assert_eq!(index.get(id), oracle.get(id), "{} id {}", kind, id);
        }
        assert_eq!(index.range(40, 90), oracle.range(40, 90), "{}", kind);
    }
}

#[test]
fn test_index_kind_codes() {
    for (code, kind) in IndexKind::ALL.into_iter().enumerate() {
        assert_eq!(IndexKind::try_from(code as i64).unwrap(), kind);
        assert_eq!(kind.code() as usize, code);
    }
    assert!(matches!(
        IndexKind::try_from(6i64),
        Err(PokedexError::InvalidMethod { what: "index", .. })
    ));
    assert!(IndexKind::try_from(-1i64).is_err());
}

#[test]
fn test_build_cancellable_stops() {
    let store = setup_store(500);
    let cancel = AtomicBool::new(true);

    let result = LiveIndex::build_cancellable(IndexKind::BTree, &store, &config(), &cancel);
    assert!(matches!(result, Err(PokedexError::Cancelled)));

    let go = AtomicBool::new(false);
    let index = LiveIndex::build_cancellable(IndexKind::BTree, &store, &config(), &go).unwrap();
    assert_eq!(index.len(), 500);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_index_set_lifecycle() {
    let store = setup_store(20);
    let mut set = IndexSet::new();

    assert_eq!(set.state(IndexKind::Hash), IndexState::Absent);
    assert!(matches!(
        set.lookup(IndexKind::Hash, &store, &[1]),
        Err(PokedexError::IndexNotReady(IndexKind::Hash))
    ));

    set.set_building(IndexKind::Hash);
    assert_eq!(set.state(IndexKind::Hash), IndexState::Building);
    assert!(set.ready(IndexKind::Hash).is_err());

    set.set_ready(LiveIndex::build(IndexKind::Hash, &store, &config()));
    assert_eq!(set.state(IndexKind::Hash), IndexState::Ready);
    assert_eq!(set.live_kinds(), vec![IndexKind::Hash]);

    set.clear(IndexKind::Hash);
    assert_eq!(set.state(IndexKind::Hash), IndexState::Absent);
    assert!(set.live_kinds().is_empty());
}

#[test]
fn test_lookup_preserves_caller_order() {
    let store = setup_store(200);
    let mut set = IndexSet::new();
    set.set_ready(LiveIndex::build(IndexKind::Hash, &store, &config()));

    let batch = set.lookup(IndexKind::Hash, &store, &[25, 1, 999, 150]).unwrap();
    assert_eq!(ids_of(&batch.records), vec![25, 1, 150]);
    assert_eq!(batch.missing, vec![999]);
}

#[test]
fn test_mutations_reach_ready_indexes() {
    let mut store = setup_store(50);
    let mut set = IndexSet::new();
    for kind in IndexKind::ALL {
        set.set_ready(LiveIndex::build(kind, &store, &config()));
    }

    let (id, addr) = store.insert(record(0, "Mew", ("Psychic", None), 100, "")).unwrap();
    set.apply_insert(store.at(addr).unwrap(), addr);

    let mut moved = store.get(10).unwrap().clone();
    moved.name = "Renamed".to_string();
    let new_addr = store.put(moved).unwrap();
    set.apply_insert(store.at(new_addr).unwrap(), new_addr);

    store.delete(20);
    set.apply_remove(20);

    for kind in IndexKind::ALL {
        let batch = set.lookup(kind, &store, &[id, 10, 20]).unwrap();
        assert_eq!(ids_of(&batch.records), vec![id, 10], "{}", kind);
        assert_eq!(batch.records[1].name, "Renamed", "{}", kind);
        assert_eq!(batch.missing, vec![20], "{}", kind);
    }
}

#[test]
fn test_rebuild_live_follows_new_addresses() {
    let store = setup_store(30);
    let mut set = IndexSet::new();
    set.set_ready(LiveIndex::build(IndexKind::BPlusTree, &store, &config()));

    // same records, opposite order: every address changes
    let mut records: Vec<Record> = store.records().cloned().collect();
    records.reverse();
    let reordered = RecordStore::from_records(records).unwrap();
    set.rebuild_live(&reordered, &config());

    let batch = set.lookup(IndexKind::BPlusTree, &reordered, &[1, 30]).unwrap();
    assert_eq!(ids_of(&batch.records), vec![1, 30]);
    assert_eq!(set.state(IndexKind::Sequential), IndexState::Absent);
}

// =============================================================================
// Inverted Index Tests
// =============================================================================

#[test]
fn test_tokenize_lowercases_words() {
    assert_eq!(tokenize("The Flame, on its TAIL."), vec!["the", "flame", "on", "its", "tail"]);
    assert!(tokenize("  ...  ").is_empty());
}

#[test]
fn test_inverted_postings_count_frequency() {
    let store = setup_dex();
    let mut index = InvertedIndex::new(10);
    for (addr, record) in store.iter() {
        index.insert_record(record, addr);
    }

    assert_eq!(index.postings(TextField::Description, "fire"), vec![(6, 2)]);
    assert_eq!(index.postings(TextField::Type, "FIRE"), vec![(4, 1), (5, 1), (6, 1)]);
    assert!(index.postings(TextField::Name, "mewtwo").is_empty());
    assert!(index.vocabulary(TextField::Type) >= 5);
}

fn inverted_query(store: &RecordStore, query: &MergeQuery) -> Vec<u32> {
    let mut set = IndexSet::new();
    set.set_ready(LiveIndex::build(IndexKind::Inverted, store, &config()));
    set.query(query).unwrap().into_iter().map(|hit| hit.id).collect()
}

#[test]
fn test_inverted_query_ranks_by_frequency() {
    let store = setup_dex();
    let query = MergeQuery::new(SearchMethod::Inverted).filter(TextField::Description, "fire seed");

    // Bulbasaur: "seed" x2; Charizard: "fire" x2; ties break by id
    assert_eq!(inverted_query(&store, &query), vec![1, 6]);
}

#[test]
fn test_inverted_query_ands_filters_and_ranges() {
    let store = setup_dex();

    let query = MergeQuery::new(SearchMethod::Inverted)
        .filter(TextField::Type, "fire")
        .range(NumericField::Hp, 40.0, 60.0);
    assert_eq!(inverted_query(&store, &query), vec![5]);

    let query = MergeQuery::new(SearchMethod::Inverted)
        .filter(TextField::Type, "fire")
        .filter(TextField::Name, "pikachu");
    assert!(inverted_query(&store, &query).is_empty());
}

#[test]
fn test_inverted_query_range_edges() {
    let store = setup_dex();

    // inclusive on both bounds
    let query = MergeQuery::new(SearchMethod::Inverted).range(NumericField::Hp, 35.0, 45.0);
    assert_eq!(inverted_query(&store, &query), vec![1, 4, 25]);

    // min > max matches nothing
    let query = MergeQuery::new(SearchMethod::Inverted).range(NumericField::Hp, 60.0, 30.0);
    assert!(inverted_query(&store, &query).is_empty());
}

#[test]
fn test_inverted_empty_query_matches_everything() {
    let store = setup_dex();
    let query = MergeQuery::new(SearchMethod::Inverted).filter(TextField::Name, "   ");

    assert_eq!(inverted_query(&store, &query), vec![1, 4, 5, 6, 25]);
}

#[test]
fn test_inverted_forgets_removed_records() {
    let store = setup_dex();
    let mut set = IndexSet::new();
    set.set_ready(LiveIndex::build(IndexKind::Inverted, &store, &config()));
    set.apply_remove(6);

    let query = MergeQuery::new(SearchMethod::Inverted).filter(TextField::Type, "fire");
    let ids: Vec<u32> = set.query(&query).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![4, 5]);
}

#[test]
fn test_inverted_agrees_with_pattern_scan_on_whole_words() {
    use pokedex::search::query::scan;

    let store = setup_dex();
    let query = MergeQuery::new(SearchMethod::Pattern(PatternMethod::Kmp))
        .filter(TextField::Type, "fire")
        .range(NumericField::Hp, 0.0, 100.0);
    let scanned: Vec<u32> = scan(&store, &query, PatternMethod::Kmp)
        .into_iter()
        .map(|h| h.id)
        .collect();

    assert_eq!(scanned, inverted_query(&store, &query));
}
