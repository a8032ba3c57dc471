//! Tests for Record, the store file codec and CSV import
//!
//! These tests verify:
//! - Field validation rules
//! - Text/numeric field accessors and release dates
//! - Store stream encode/decode and corruption detection
//! - CSV parsing (layout, duplicates, malformed rows)

use chrono::NaiveDate;
use pokedex::error::PokedexError;
use pokedex::record::codec;
use pokedex::record::csv::{read_from, read_path, CsvLayout};
use pokedex::record::{release_date_for, NumericField, Record, TextField, MAX_NAME_LEN};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_record(id: u32, name: &str) -> Record {
    Record {
        id,
        name: name.to_string(),
        japanese_name: "フシギダネ".to_string(),
        species: "Seed Pokémon".to_string(),
        type_primary: "Grass".to_string(),
        type_secondary: Some("Poison".to_string()),
        weight_kg: 6.9,
        height_m: 0.7,
        hp: 45,
        atk: 49,
        def: 49,
        generation: 1,
        release_date: release_date_for(1),
        legendary: false,
        mythical: false,
        description: "A strange seed was planted on its back at birth.".to_string(),
    }
}

/// One CSV row in the default 24-column layout
fn csv_row(id: &str, name: &str, generation: &str, types: (&str, &str), hp: &str) -> String {
    let mut cols = vec![String::new(); 24];
    cols[0] = "0".to_string();
    cols[1] = id.to_string();
    cols[2] = name.to_string();
    cols[4] = format!("{}ダネ Fushigidane", name.chars().next().unwrap_or('X'));
    cols[5] = generation.to_string();
    cols[7] = "0".to_string();
    cols[8] = "False".to_string();
    cols[9] = "Seed Pokémon".to_string();
    cols[11] = types.0.to_string();
    cols[12] = types.1.to_string();
    cols[13] = "0.7".to_string();
    cols[14] = "6.9".to_string();
    cols[20] = hp.to_string();
    cols[21] = "49".to_string();
    cols[22] = "49.0".to_string();
    cols[23] = "A strange seed.".to_string();
    cols.join(",")
}

fn csv_with_rows(rows: &[String]) -> String {
    let header = (0..24).map(|i| format!("c{}", i)).collect::<Vec<_>>().join(",");
    let mut out = header;
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_record_valid() {
    assert!(sample_record(1, "Bulbasaur").validate().is_ok());
}

#[test]
fn test_record_empty_name_rejected() {
    let record = sample_record(1, "   ");
    assert!(matches!(record.validate(), Err(PokedexError::Validation(_))));
}

#[test]
fn test_record_long_name_rejected() {
    let long = "x".repeat(MAX_NAME_LEN + 1);
    let record = sample_record(1, &long);
    assert!(matches!(record.validate(), Err(PokedexError::Validation(_))));

    let exact = "x".repeat(MAX_NAME_LEN);
    assert!(sample_record(1, &exact).validate().is_ok());
}

#[test]
fn test_record_missing_primary_type_rejected() {
    let mut record = sample_record(1, "Bulbasaur");
    record.type_primary = String::new();
    assert!(matches!(record.validate(), Err(PokedexError::Validation(_))));
}

#[test]
fn test_record_generation_zero_rejected() {
    let mut record = sample_record(1, "Bulbasaur");
    record.generation = 0;
    assert!(matches!(record.validate(), Err(PokedexError::Validation(_))));
}

#[test]
fn test_record_negative_or_nan_measurements_rejected() {
    let mut record = sample_record(1, "Bulbasaur");
    record.weight_kg = -1.0;
    assert!(record.validate().is_err());

    let mut record = sample_record(1, "Bulbasaur");
    record.height_m = f32::NAN;
    assert!(record.validate().is_err());
}

// =============================================================================
// Accessor Tests
// =============================================================================

#[test]
fn test_record_text_fields() {
    let record = sample_record(1, "Bulbasaur");

    assert_eq!(record.text(TextField::Name), vec!["Bulbasaur"]);
    assert_eq!(record.text(TextField::Type), vec!["Grass", "Poison"]);

    let mut single = record.clone();
    single.type_secondary = None;
    assert_eq!(single.text(TextField::Type), vec!["Grass"]);
}

#[test]
fn test_record_numeric_fields() {
    let record = sample_record(1, "Bulbasaur");

    assert_eq!(record.numeric(NumericField::Hp), 45.0);
    assert_eq!(record.numeric(NumericField::Generation), 1.0);
    assert!((record.numeric(NumericField::Height) - 0.7).abs() < 1e-6);
}

#[test]
fn test_release_date_table() {
    assert_eq!(release_date_for(1), NaiveDate::from_ymd_opt(1996, 2, 27).unwrap());
    assert_eq!(release_date_for(4), NaiveDate::from_ymd_opt(2006, 9, 28).unwrap());
    assert_eq!(release_date_for(9), NaiveDate::from_ymd_opt(2022, 11, 18).unwrap());

    // generations past the table reuse the last date
    assert_eq!(release_date_for(12), release_date_for(9));
}

// =============================================================================
// Store Codec Tests
// =============================================================================

#[test]
fn test_codec_preserves_records_and_order() {
    let records = vec![
        sample_record(7, "Squirtle"),
        sample_record(1, "Bulbasaur"),
        sample_record(4, "Charmander"),
    ];

    let bytes = codec::encode(&records).unwrap();
    assert_eq!(&bytes[0..4], codec::MAGIC);

    let decoded = codec::decode(&bytes).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn test_codec_empty_store() {
    let bytes = codec::encode(std::iter::empty::<&Record>()).unwrap();
    assert_eq!(bytes.len(), codec::HEADER_SIZE + codec::FOOTER_SIZE);
    assert!(codec::decode(&bytes).unwrap().is_empty());
}

#[test]
fn test_codec_bad_magic() {
    let mut bytes = codec::encode(&[sample_record(1, "Bulbasaur")]).unwrap();
    bytes[0] = b'X';
    assert!(matches!(codec::decode(&bytes), Err(PokedexError::CorruptStream(_))));
}

#[test]
fn test_codec_flipped_byte_detected() {
    let mut bytes = codec::encode(&[sample_record(1, "Bulbasaur")]).unwrap();
    let mid = codec::HEADER_SIZE + 6;
    bytes[mid] ^= 0xFF;
    assert!(matches!(codec::decode(&bytes), Err(PokedexError::CorruptStream(_))));
}

#[test]
fn test_codec_truncated_stream() {
    let bytes = codec::encode(&[sample_record(1, "Bulbasaur")]).unwrap();
    assert!(matches!(
        codec::decode(&bytes[..5]),
        Err(PokedexError::CorruptStream(_))
    ));
}

// =============================================================================
// CSV Tests
// =============================================================================

#[test]
fn test_csv_parses_default_layout() {
    let data = csv_with_rows(&[
        csv_row("1", "Bulbasaur", "1", ("Grass", "Poison"), "45"),
        csv_row("4", "Charmander", "1.0", ("Fire", ""), "39.0"),
    ]);

    let records = read_from(data.as_bytes(), &CsvLayout::default()).unwrap();
    assert_eq!(records.len(), 2);

    let bulbasaur = &records[0];
    assert_eq!(bulbasaur.id, 1);
    assert_eq!(bulbasaur.name, "Bulbasaur");
    assert_eq!(bulbasaur.japanese_name, "Bダネ");
    assert_eq!(bulbasaur.type_secondary.as_deref(), Some("Poison"));
    assert_eq!(bulbasaur.hp, 45);
    assert_eq!(bulbasaur.def, 49);
    assert_eq!(bulbasaur.release_date, release_date_for(1));
    assert_eq!(bulbasaur.description, "A strange seed.");

    let charmander = &records[1];
    assert_eq!(charmander.type_secondary, None);
    assert_eq!(charmander.hp, 39);
}

#[test]
fn test_csv_duplicate_id_keeps_first_row() {
    let data = csv_with_rows(&[
        csv_row("1", "Bulbasaur", "1", ("Grass", ""), "45"),
        csv_row("1", "Impostor", "1", ("Grass", ""), "99"),
    ]);

    let records = read_from(data.as_bytes(), &CsvLayout::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Bulbasaur");
}

#[test]
fn test_csv_malformed_number_fails_import() {
    let data = csv_with_rows(&[
        csv_row("1", "Bulbasaur", "1", ("Grass", ""), "45"),
        csv_row("2", "Ivysaur", "one", ("Grass", ""), "60"),
    ]);

    match read_from(data.as_bytes(), &CsvLayout::default()) {
        Err(PokedexError::Validation(msg)) => assert!(msg.contains("line 3"), "{}", msg),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_csv_invalid_record_fails_import() {
    let data = csv_with_rows(&[csv_row("1", "Bulbasaur", "1", ("", ""), "45")]);
    assert!(read_from(data.as_bytes(), &CsvLayout::default()).is_err());
}

#[test]
fn test_csv_read_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pokedex.csv");
    let data = csv_with_rows(&[csv_row("25", "Pikachu", "1", ("Electric", ""), "35")]);
    std::fs::write(&path, data).unwrap();

    let records = read_path(&path, &CsvLayout::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 25);
}

#[test]
fn test_csv_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = read_path(&temp_dir.path().join("absent.csv"), &CsvLayout::default());
    assert!(matches!(result, Err(PokedexError::Io(_))));
}
