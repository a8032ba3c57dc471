//! Tests for Engine
//!
//! These tests verify:
//! - Config validation and engine open
//! - Record reads/writes and persistence across reopen
//! - Sorting and index lifecycle through the engine
//! - Store modes: compress/decompress, encrypt/decrypt and their gates
//! - Snapshot isolation and concurrent readers
//! - Background tasks and command execution

use std::fs;
use std::sync::Arc;
use std::thread;

use pokedex::compress::CompressionKind;
use pokedex::config::Config;
use pokedex::crypto::CipherMethod;
use pokedex::engine::tasks::{build_index_in_background, sort_in_background};
use pokedex::engine::{Engine, ModeKind};
use pokedex::error::PokedexError;
use pokedex::index::{IndexKind, IndexState};
use pokedex::protocol::{code, Command, Reply};
use pokedex::record::{release_date_for, NumericField, Record, TextField};
use pokedex::search::{MergeQuery, PatternMethod, SearchMethod};
use pokedex::sort::{SortKey, SortStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .run_capacity(16) // small runs so sorts go through the merge phase
        .btree_order(4)
        .build()
        .unwrap();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn reopen(temp_dir: &TempDir) -> Engine {
    let config = Config::builder().data_dir(temp_dir.path()).build().unwrap();
    Engine::open(config).unwrap()
}

fn sample_record(id: u32) -> Record {
    let generation = id % 9 + 1;
    Record {
        id,
        name: format!("Pokemon{:04}", (id * 7919) % 1000),
        japanese_name: "ポケモン".to_string(),
        species: "Test Pokémon".to_string(),
        type_primary: if id % 2 == 0 { "Fire" } else { "Water" }.to_string(),
        type_secondary: None,
        weight_kg: (id % 50) as f32,
        height_m: 1.0,
        hp: id % 100,
        atk: 50,
        def: 50,
        generation,
        release_date: release_date_for(generation),
        legendary: false,
        mythical: false,
        description: format!("Entry number {}.", id),
    }
}

fn load_sample(engine: &Engine, count: u32) {
    let records = (1..=count).map(sample_record).collect();
    assert_eq!(engine.load_records(records).unwrap(), count as usize);
}

fn ids_of(records: &[Record]) -> Vec<u32> {
    records.iter().map(|r| r.id).collect()
}

// =============================================================================
// Config / Open Tests
// =============================================================================

#[test]
fn test_config_builder_rejects_bad_values() {
    assert!(matches!(
        Config::builder().page_size(0).build(),
        Err(PokedexError::Config(_))
    ));
    assert!(Config::builder().fan_in(1).build().is_err());
    assert!(Config::builder().btree_order(3).build().is_err());
    assert!(Config::builder().hash_bucket_capacity(0).build().is_err());
    assert!(Config::builder().btree_order(4).fan_in(3).build().is_ok());
}

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("dex");

    let engine = Engine::open_path(&data_dir).unwrap();

    assert!(data_dir.exists());
    assert_eq!(engine.mode(), ModeKind::Normal);
    assert!(engine.is_empty().unwrap());
    assert_eq!(engine.data_dir(), data_dir.as_path());
}

// =============================================================================
// Record Operation Tests
// =============================================================================

#[test]
fn test_engine_load_and_get() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 20);

    assert_eq!(engine.len().unwrap(), 20);
    assert_eq!(engine.get(7).unwrap(), sample_record(7));
    assert!(matches!(engine.get(21), Err(PokedexError::NotFound(21))));
}

#[test]
fn test_engine_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("pokedex.csv");
    let header = (0..24).map(|i| format!("c{}", i)).collect::<Vec<_>>().join(",");
    let row = |id: u32, name: &str| {
        let mut cols = vec![String::new(); 24];
        cols[1] = id.to_string();
        cols[2] = name.to_string();
        cols[5] = "1".to_string();
        cols[7] = "0".to_string();
        cols[8] = "0".to_string();
        cols[9] = "Seed Pokémon".to_string();
        cols[11] = "Grass".to_string();
        cols[13] = "0.7".to_string();
        cols[14] = "6.9".to_string();
        cols[20] = "45".to_string();
        cols[21] = "49".to_string();
        cols[22] = "49".to_string();
        cols[23] = "A seed.".to_string();
        cols.join(",")
    };
    fs::write(
        &csv_path,
        format!("{}\n{}\n{}\n", header, row(1, "Bulbasaur"), row(2, "Ivysaur")),
    )
    .unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path().join("data"))
        .csv_path(&csv_path)
        .build()
        .unwrap();
    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.load_csv().unwrap(), 2);
    assert_eq!(engine.get(2).unwrap().name, "Ivysaur");
}

#[test]
fn test_engine_paging() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .page_size(8)
        .build()
        .unwrap();
    let engine = Engine::open(config).unwrap();
    load_sample(&engine, 20);

    assert_eq!(engine.page_count().unwrap(), 3);
    assert_eq!(ids_of(&engine.page(2).unwrap()), vec![17, 18, 19, 20]);
    assert!(engine.page(3).unwrap().is_empty());
}

#[test]
fn test_engine_insert_put_delete() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);

    let id = engine.insert(sample_record(0)).unwrap();
    assert_eq!(id, 11);

    let mut changed = sample_record(3);
    changed.name = "Changed".to_string();
    assert_eq!(engine.put(changed).unwrap(), 3);
    assert_eq!(engine.get(3).unwrap().name, "Changed");

    engine.delete(5).unwrap();
    assert!(matches!(engine.delete(5), Err(PokedexError::NotFound(5))));
    assert!(matches!(engine.put(sample_record(5)), Err(PokedexError::NotFound(5))));

    let ids = engine.list_ids().unwrap();
    assert_eq!(ids.len(), 10);
    assert!(!ids.contains(&5));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_engine_invalid_record_rejected() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 3);

    let mut bad = sample_record(0);
    bad.name = String::new();
    assert!(matches!(engine.insert(bad), Err(PokedexError::Validation(_))));
    assert_eq!(engine.len().unwrap(), 3);
}

#[test]
fn test_engine_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = reopen(&temp_dir);
        load_sample(&engine, 15);
        engine.delete(4).unwrap();
        engine.insert(sample_record(0)).unwrap();
    }

    let engine = reopen(&temp_dir);
    assert_eq!(engine.len().unwrap(), 15);
    assert!(engine.get(4).is_err());
    assert_eq!(engine.get(16).unwrap().id, 16);
}

// =============================================================================
// Sort Tests
// =============================================================================

#[test]
fn test_engine_sort_orders_store() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 120);

    for strategy in SortStrategy::ALL {
        engine.sort(strategy, SortKey::Name).unwrap();
        let names: Vec<String> = engine.records().unwrap().into_iter().map(|r| r.name).collect();
        assert!(names.windows(2).all(|w| w[0] <= w[1]), "{}", strategy);
        assert_eq!(engine.sorted_by().unwrap(), Some(SortKey::Name));
    }

    // page 0 follows the sorted order
    let first = engine.page(0).unwrap();
    assert_eq!(first[0], engine.records().unwrap()[0]);
}

#[test]
fn test_engine_sort_leaves_no_runs() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 100);

    engine.sort(SortStrategy::Balanced, SortKey::Hp).unwrap();

    let leftovers = fs::read_dir(engine.tmp_dir())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn test_engine_mutation_clears_sorted_by() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 30);

    engine.sort(SortStrategy::Variable, SortKey::Weight).unwrap();
    assert_eq!(engine.sorted_by().unwrap(), Some(SortKey::Weight));

    engine.insert(sample_record(0)).unwrap();
    assert_eq!(engine.sorted_by().unwrap(), None);

    // a rejected write leaves the order intact
    engine.sort(SortStrategy::Balanced, SortKey::Hp).unwrap();
    assert!(engine.delete(999).is_err());
    assert_eq!(engine.sorted_by().unwrap(), Some(SortKey::Hp));

    engine.put(sample_record(3)).unwrap();
    assert_eq!(engine.sorted_by().unwrap(), None);

    engine.sort(SortStrategy::Balanced, SortKey::Hp).unwrap();
    engine.delete(3).unwrap();
    assert_eq!(engine.sorted_by().unwrap(), None);
}

#[test]
fn test_engine_compacts_sparse_store() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);
    engine.build_index(IndexKind::BPlusTree).unwrap();
    engine.build_index(IndexKind::Hash).unwrap();

    for round in 0..100u32 {
        let mut record = sample_record(round % 10 + 1);
        record.hp = 1000 + round;
        engine.put(record).unwrap();
        // tombstones never pile up past the live records and a small slack
        assert!(engine.tombstones().unwrap() <= 32.max(engine.len().unwrap()));
    }
    assert!(engine.tombstones().unwrap() < 100);

    // indexes follow the renumbered addresses
    for kind in [IndexKind::BPlusTree, IndexKind::Hash] {
        let batch = engine.lookup(kind, &[1, 10, 5]).unwrap().value;
        assert_eq!(ids_of(&batch.records), vec![1, 10, 5]);
        assert_eq!(batch.records[0].hp, 1090);
        assert_eq!(batch.records[1].hp, 1099);
    }
}

#[test]
fn test_engine_insert_id_space_exhausted() {
    let (_temp, engine) = setup_temp_engine();
    engine
        .load_records(vec![sample_record(1), sample_record(u32::MAX)])
        .unwrap();

    assert!(matches!(
        engine.insert(sample_record(0)),
        Err(PokedexError::Validation(_))
    ));
    assert_eq!(engine.len().unwrap(), 2);
}

#[test]
fn test_engine_sort_keeps_indexes_usable() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 60);
    engine.build_index(IndexKind::BTree).unwrap();

    engine.sort(SortStrategy::Replacement, SortKey::Name).unwrap();

    assert_eq!(engine.index_state(IndexKind::BTree).unwrap(), IndexState::Ready);
    let batch = engine.lookup(IndexKind::BTree, &[42, 7]).unwrap().value;
    assert_eq!(ids_of(&batch.records), vec![42, 7]);
}

// =============================================================================
// Index Tests
// =============================================================================

#[test]
fn test_engine_lookup_thousand_records() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 1000);

    assert!(matches!(
        engine.lookup(IndexKind::Hash, &[1]),
        Err(PokedexError::IndexNotReady(IndexKind::Hash))
    ));

    let elapsed = engine.build_index(IndexKind::Hash).unwrap();
    assert!(elapsed >= 0.0);

    let timed = engine.lookup(IndexKind::Hash, &[25, 1, 150]).unwrap();
    assert_eq!(ids_of(&timed.value.records), vec![25, 1, 150]);
    assert!(timed.value.missing.is_empty());
    assert!(timed.elapsed_ms >= 0.0);
}

#[test]
fn test_engine_every_index_kind() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 200);

    for kind in IndexKind::ALL {
        engine.build_index(kind).unwrap();
        let batch = engine.lookup(kind, &[200, 3, 999]).unwrap().value;
        assert_eq!(ids_of(&batch.records), vec![200, 3], "{}", kind);
        assert_eq!(batch.missing, vec![999], "{}", kind);
    }
}

#[test]
fn test_engine_mutations_update_indexes() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 50);
    engine.build_index(IndexKind::BPlusTree).unwrap();

    let id = engine.insert(sample_record(0)).unwrap();
    engine.delete(10).unwrap();
    let mut changed = sample_record(20);
    changed.hp = 999;
    engine.put(changed).unwrap();

    let batch = engine.lookup(IndexKind::BPlusTree, &[id, 10, 20]).unwrap().value;
    assert_eq!(ids_of(&batch.records), vec![id, 20]);
    assert_eq!(batch.records[1].hp, 999);
    assert_eq!(batch.missing, vec![10]);
}

#[test]
fn test_engine_ensure_index_builds_once() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);

    engine.ensure_index(IndexKind::BStarTree).unwrap();
    assert_eq!(engine.index_state(IndexKind::BStarTree).unwrap(), IndexState::Ready);
    let generation = engine.snapshot().number;

    // already Ready: nothing published
    engine.ensure_index(IndexKind::BStarTree).unwrap();
    assert_eq!(engine.snapshot().number, generation);
}

#[test]
fn test_engine_ensure_index_concurrent_builds_once() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 500);
    let engine = Arc::new(engine);
    let generation = engine.snapshot().number;

    let barrier = Arc::new(std::sync::Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                match engine.ensure_index(IndexKind::BPlusTree) {
                    Ok(()) | Err(PokedexError::IndexNotReady(_)) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // one Building generation and one Ready generation, however the
    // callers interleaved
    assert_eq!(engine.snapshot().number, generation + 2);
    assert_eq!(engine.index_state(IndexKind::BPlusTree).unwrap(), IndexState::Ready);
}

#[test]
fn test_engine_load_rebuilds_live_indexes() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);
    engine.build_index(IndexKind::Hash).unwrap();

    load_sample(&engine, 40);

    assert_eq!(engine.index_state(IndexKind::Hash).unwrap(), IndexState::Ready);
    let batch = engine.lookup(IndexKind::Hash, &[40]).unwrap().value;
    assert_eq!(ids_of(&batch.records), vec![40]);
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_engine_merge_search_methods_agree() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 100);
    engine.build_index(IndexKind::Inverted).unwrap();

    let query = |method| {
        MergeQuery::new(method)
            .filter(TextField::Type, "fire")
            .range(NumericField::Hp, 10.0, 30.0)
    };

    let inverted = engine.merge_search(&query(SearchMethod::Inverted)).unwrap().value;
    let mut expected: Vec<u32> = inverted.iter().map(|h| h.id).collect();
    expected.sort_unstable();
    assert_eq!(expected, (10..=30).filter(|id| id % 2 == 0).collect::<Vec<_>>());

    for method in PatternMethod::ALL {
        let hits = engine
            .merge_search(&query(SearchMethod::Pattern(method)))
            .unwrap()
            .value;
        let mut ids: Vec<u32> = hits.iter().map(|h| h.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, expected, "{}", method);
    }
}

#[test]
fn test_engine_inverted_search_needs_index() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 5);

    let query = MergeQuery::new(SearchMethod::Inverted).filter(TextField::Name, "pokemon");
    assert!(matches!(
        engine.merge_search(&query),
        Err(PokedexError::IndexNotReady(IndexKind::Inverted))
    ));
}

// =============================================================================
// Compression Mode Tests
// =============================================================================

#[test]
fn test_engine_zip_gates_and_unzip_restores() {
    let (temp, engine) = setup_temp_engine();
    load_sample(&engine, 80);
    let before = engine.records().unwrap();

    engine.zip(CompressionKind::Huffman).unwrap();
    assert!(temp.path().join("pokedex.huf").exists());
    assert!(!temp.path().join("pokedex.dat").exists());
    assert_eq!(engine.mode(), ModeKind::Compressed(CompressionKind::Huffman));

    assert!(matches!(
        engine.get(1),
        Err(PokedexError::StoreCompressed(CompressionKind::Huffman))
    ));
    assert!(engine.insert(sample_record(0)).is_err());
    assert!(engine.zip(CompressionKind::Lzw).is_err());
    assert!(matches!(
        engine.unzip(CompressionKind::Lzw),
        Err(PokedexError::StoreCompressed(CompressionKind::Huffman))
    ));
    assert!(matches!(
        engine.encrypt(CipherMethod::Aes128),
        Err(PokedexError::StoreCompressed(_))
    ));

    engine.unzip(CompressionKind::Huffman).unwrap();
    assert_eq!(engine.mode(), ModeKind::Normal);
    assert_eq!(engine.records().unwrap(), before);
    assert!(temp.path().join("pokedex.dat").exists());
    assert!(!temp.path().join("pokedex.huf").exists());
}

#[test]
fn test_engine_unzip_when_open() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 3);

    assert!(matches!(
        engine.unzip(CompressionKind::Lzw),
        Err(PokedexError::StoreNotCompressed)
    ));
}

#[test]
fn test_engine_unzip_rebuilds_live_indexes() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 40);
    engine.build_index(IndexKind::BTree).unwrap();

    engine.zip(CompressionKind::Lzw).unwrap();
    engine.unzip(CompressionKind::Lzw).unwrap();

    assert_eq!(engine.index_state(IndexKind::BTree).unwrap(), IndexState::Ready);
    assert_eq!(engine.index_state(IndexKind::Hash).unwrap(), IndexState::Absent);
}

#[test]
fn test_engine_compressed_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = reopen(&temp_dir);
        load_sample(&engine, 25);
        engine.zip(CompressionKind::Lzw).unwrap();
    }

    let engine = reopen(&temp_dir);
    assert_eq!(engine.mode(), ModeKind::Compressed(CompressionKind::Lzw));
    engine.unzip(CompressionKind::Lzw).unwrap();
    assert_eq!(engine.len().unwrap(), 25);
}

// =============================================================================
// Encryption Mode Tests
// =============================================================================

#[test]
fn test_engine_encrypt_decrypt_every_method() {
    let (temp, engine) = setup_temp_engine();
    load_sample(&engine, 30);
    let before = engine.records().unwrap();

    for method in CipherMethod::ALL {
        let key = engine.encrypt(method).unwrap();
        assert_eq!(key.len(), method.key_len() * 2);
        assert!(temp.path().join("pokedex.enc").exists());
        assert!(matches!(engine.get(1), Err(PokedexError::StoreEncrypted(m)) if m == method));

        engine.decrypt(method, &key).unwrap();
        assert_eq!(engine.records().unwrap(), before, "{}", method);
    }
}

#[test]
fn test_engine_decrypt_wrong_key_stays_encrypted() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);

    let key = engine.encrypt(CipherMethod::Aes192).unwrap();
    let mut wrong: Vec<char> = key.chars().collect();
    wrong[0] = if wrong[0] == '0' { '1' } else { '0' };
    let wrong: String = wrong.into_iter().collect();

    assert!(matches!(
        engine.decrypt(CipherMethod::Aes192, &wrong),
        Err(PokedexError::WrongKey)
    ));
    assert!(matches!(
        engine.decrypt(CipherMethod::Aes192, "not hex"),
        Err(PokedexError::WrongKey)
    ));
    assert!(matches!(
        engine.decrypt(CipherMethod::Trivium, &key),
        Err(PokedexError::StoreEncrypted(CipherMethod::Aes192))
    ));
    assert_eq!(engine.mode(), ModeKind::Encrypted(CipherMethod::Aes192));

    engine.decrypt(CipherMethod::Aes192, &key).unwrap();
    assert_eq!(engine.len().unwrap(), 10);
}

#[test]
fn test_engine_decrypt_when_open() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 3);

    assert!(matches!(
        engine.decrypt(CipherMethod::Aes128, "00"),
        Err(PokedexError::StoreNotEncrypted)
    ));
}

#[test]
fn test_engine_encrypted_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let key = {
        let engine = reopen(&temp_dir);
        load_sample(&engine, 12);
        engine.encrypt(CipherMethod::Trivium).unwrap()
    };

    let engine = reopen(&temp_dir);
    assert_eq!(engine.mode(), ModeKind::Encrypted(CipherMethod::Trivium));
    engine.decrypt(CipherMethod::Trivium, &key).unwrap();
    assert_eq!(engine.get(12).unwrap(), sample_record(12));
}

// =============================================================================
// Snapshot / Concurrency Tests
// =============================================================================

#[test]
fn test_engine_snapshot_isolation() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);

    let snapshot = engine.snapshot();
    engine.delete(1).unwrap();
    engine.zip(CompressionKind::Huffman).unwrap();

    // the old generation still sees the open store with record 1
    let dataset = snapshot.dataset().unwrap();
    assert!(dataset.store.get(1).is_ok());
    assert!(engine.snapshot().number > snapshot.number);
}

#[test]
fn test_engine_concurrent_readers_and_writer() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 100);
    let engine = Arc::new(engine);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for id in 1..=100 {
                    // ids 1..=100 are never deleted
                    assert_eq!(engine.get(id).unwrap().id, id);
                }
            })
        })
        .collect();

    let writer = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                engine.insert(sample_record(0)).unwrap();
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();
    assert_eq!(engine.len().unwrap(), 120);
}

// =============================================================================
// Background Task Tests
// =============================================================================

#[test]
fn test_background_index_build() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 300);
    let engine = Arc::new(engine);

    let handle = build_index_in_background(engine.clone(), IndexKind::BPlusTree).unwrap();
    assert_eq!(handle.name(), "index-3");
    handle.wait().unwrap();

    assert_eq!(engine.index_state(IndexKind::BPlusTree).unwrap(), IndexState::Ready);
}

#[test]
fn test_background_sort() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 150);
    let engine = Arc::new(engine);

    let handle = sort_in_background(engine.clone(), SortStrategy::Balanced, SortKey::Hp).unwrap();
    handle.wait().unwrap();

    assert_eq!(engine.sorted_by().unwrap(), Some(SortKey::Hp));
    let hps: Vec<u32> = engine.records().unwrap().iter().map(|r| r.hp).collect();
    assert!(hps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_background_cancel_leaves_engine_consistent() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 2000);
    let engine = Arc::new(engine);

    let handle = build_index_in_background(engine.clone(), IndexKind::BTree).unwrap();
    handle.cancel();

    // the build may finish before the flag is seen
    match handle.wait() {
        Ok(_) => assert_eq!(engine.index_state(IndexKind::BTree).unwrap(), IndexState::Ready),
        Err(PokedexError::Cancelled) => {
            assert_eq!(engine.index_state(IndexKind::BTree).unwrap(), IndexState::Absent)
        }
        Err(e) => panic!("unexpected error: {}", e),
    }

    let handle = sort_in_background(engine.clone(), SortStrategy::Variable, SortKey::Name).unwrap();
    handle.cancel();
    match handle.wait() {
        Ok(_) => assert_eq!(engine.sorted_by().unwrap(), Some(SortKey::Name)),
        Err(PokedexError::Cancelled) => assert_eq!(engine.sorted_by().unwrap(), None),
        Err(e) => panic!("unexpected error: {}", e),
    }
    assert_eq!(engine.len().unwrap(), 2000);
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_get_list_builds_on_demand() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 1000);

    let reply = engine
        .execute(Command::GetList {
            kind: IndexKind::Hash,
            ids: vec![25, 1, 150, 5000],
        })
        .unwrap();

    match reply {
        Reply::Listed {
            pokemons,
            time,
            missing,
        } => {
            let ids: Vec<i64> = pokemons.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![25, 1, 150]);
            assert_eq!(missing, vec![5000]);
            assert!(time >= 0.0);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert_eq!(engine.index_state(IndexKind::Hash).unwrap(), IndexState::Ready);
}

#[test]
fn test_execute_write_commands() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 5);

    match engine.execute(Command::Post { record: sample_record(0) }).unwrap() {
        Reply::Created { id } => assert_eq!(id, 6),
        other => panic!("unexpected reply: {:?}", other),
    }

    match engine.execute(Command::Delete { id: 6 }).unwrap() {
        Reply::Message(response) => {
            assert!(response.success);
            assert_eq!(response.code, code::DELETED);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    match engine
        .execute(Command::Sort {
            strategy: SortStrategy::Balanced,
            key: SortKey::Id,
        })
        .unwrap()
    {
        Reply::Message(response) => {
            assert_eq!(response.code, code::SORTED);
            assert!(response.elapsed_ms.is_some());
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    assert!(matches!(
        engine.execute(Command::Get { id: 6 }),
        Err(PokedexError::NotFound(6))
    ));
}

#[test]
fn test_execute_mode_round_trip() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 20);

    let key = match engine
        .execute(Command::Encrypt {
            method: CipherMethod::Aes256,
        })
        .unwrap()
    {
        Reply::Text(key) => key,
        other => panic!("unexpected reply: {:?}", other),
    };

    assert!(matches!(
        engine.execute(Command::PageCount),
        Err(PokedexError::StoreEncrypted(CipherMethod::Aes256))
    ));

    match engine
        .execute(Command::Decrypt {
            method: CipherMethod::Aes256,
            key,
        })
        .unwrap()
    {
        Reply::Message(response) => assert_eq!(response.code, code::DECRYPTED),
        other => panic!("unexpected reply: {:?}", other),
    }

    match engine.execute(Command::Zip { kind: CompressionKind::Huffman }).unwrap() {
        Reply::Message(response) => assert_eq!(response.code, code::COMPRESSED),
        other => panic!("unexpected reply: {:?}", other),
    }
    match engine.execute(Command::Unzip { kind: CompressionKind::Huffman }).unwrap() {
        Reply::Message(response) => assert_eq!(response.code, code::DECOMPRESSED),
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(matches!(engine.execute(Command::PageCount).unwrap(), Reply::Count(1)));
}

#[test]
fn test_execute_inverted_index_returns_ids() {
    let (_temp, engine) = setup_temp_engine();
    load_sample(&engine, 10);

    let query = MergeQuery::new(SearchMethod::Pattern(PatternMethod::Naive))
        .filter(TextField::Type, "water");
    match engine.execute(Command::InvertedIndex { query }).unwrap() {
        Reply::Ids(mut ids) => {
            ids.sort_unstable();
            assert_eq!(ids, vec![1, 3, 5, 7, 9]);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert_eq!(engine.index_state(IndexKind::Inverted).unwrap(), IndexState::Ready);
}

#[test]
fn test_execute_to_katakana() {
    let (_temp, engine) = setup_temp_engine();

    match engine
        .execute(Command::ToKatakana {
            text: "pikachuu".to_string(),
        })
        .unwrap()
    {
        Reply::Text(text) => assert_eq!(text, "ピカチュウ"),
        other => panic!("unexpected reply: {:?}", other),
    }
}
