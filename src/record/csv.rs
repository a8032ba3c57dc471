//! CSV Import
//!
//! Reads the Pokédex dataset into records. The first row is a header;
//! column positions are configurable through [`CsvLayout`].

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{PokedexError, Result};

use super::{release_date_for, Record};

/// 0-based column positions of the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    pub id: usize,
    pub name: usize,
    pub japanese_name: usize,
    pub generation: usize,
    pub legendary: usize,
    pub mythical: usize,
    pub species: usize,
    pub type_primary: usize,
    pub type_secondary: usize,
    pub height: usize,
    pub weight: usize,
    pub hp: usize,
    pub atk: usize,
    pub def: usize,
    // the description is always the last column
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            id: 1,
            name: 2,
            japanese_name: 4,
            generation: 5,
            legendary: 7,
            mythical: 8,
            species: 9,
            type_primary: 11,
            type_secondary: 12,
            height: 13,
            weight: 14,
            hp: 20,
            atk: 21,
            def: 22,
        }
    }
}

/// Import every row of the CSV file at `path`
pub fn read_path(path: &Path, layout: &CsvLayout) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)?;
    read_from(file, layout)
}

/// Import every row of a CSV stream
///
/// Repeated ids keep their first row. A malformed row fails the whole
/// import with a `Validation` error naming the line.
pub fn read_from<R: Read>(reader: R, layout: &CsvLayout) -> Result<Vec<Record>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let line = row + 2; // 1-based, after the header
        let row = result?;
        let record = parse_row(&row, layout).map_err(|e| {
            PokedexError::Validation(format!("line {}: {}", line, e))
        })?;

        if !seen.insert(record.id) {
            warn!(id = record.id, line, "Duplicate id in CSV, keeping first row");
            continue;
        }
        records.push(record);
    }

    debug!(count = records.len(), "CSV import parsed");
    Ok(records)
}

fn parse_row(row: &csv::StringRecord, layout: &CsvLayout) -> std::result::Result<Record, String> {
    let col = |idx: usize| -> std::result::Result<&str, String> {
        row.get(idx)
            .map(str::trim)
            .ok_or_else(|| format!("missing column {}", idx))
    };

    let id = parse_num::<u32>(col(layout.id)?, "id")?;
    let generation = parse_num::<u32>(col(layout.generation)?, "generation")?;

    let japanese_name = col(layout.japanese_name)?
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    let type_secondary = col(layout.type_secondary)
        .ok()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let description = row
        .iter()
        .last()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let record = Record {
        id,
        name: col(layout.name)?.to_string(),
        japanese_name,
        species: col(layout.species)?.to_string(),
        type_primary: col(layout.type_primary)?.to_string(),
        type_secondary,
        weight_kg: parse_float(col(layout.weight)?, "weight")?,
        height_m: parse_float(col(layout.height)?, "height")?,
        hp: parse_num::<u32>(col(layout.hp)?, "hp")?,
        atk: parse_num::<u32>(col(layout.atk)?, "atk")?,
        def: parse_num::<u32>(col(layout.def)?, "def")?,
        generation,
        release_date: release_date_for(generation),
        legendary: parse_bool(col(layout.legendary)?, "legendary")?,
        mythical: parse_bool(col(layout.mythical)?, "mythical")?,
        description,
    };

    record.validate().map_err(|e| e.to_string())?;
    Ok(record)
}

fn parse_num<T: std::str::FromStr>(raw: &str, label: &str) -> std::result::Result<T, String> {
    // the dataset writes some integers as "45.0"
    let raw = raw.strip_suffix(".0").unwrap_or(raw);
    raw.parse::<T>()
        .map_err(|_| format!("{} is not a valid number: {:?}", label, raw))
}

/// Empty measurements import as zero
fn parse_float(raw: &str, label: &str) -> std::result::Result<f32, String> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f32>()
        .map_err(|_| format!("{} is not a valid number: {:?}", label, raw))
}

fn parse_bool(raw: &str, label: &str) -> std::result::Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(format!("{} is not a boolean: {:?}", label, other)),
    }
}
