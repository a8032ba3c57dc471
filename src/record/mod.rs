//! Record Module
//!
//! The Pokémon record, its field accessors and validation rules.
//!
//! ## Submodules
//! - `codec`: binary store file (the byte stream compression and
//!   encryption act on)
//! - `csv`: dataset import

pub mod codec;
pub mod csv;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PokedexError, Result};

/// Max byte length of a record name
pub const MAX_NAME_LEN: usize = 40;

/// A single Pokémon entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    pub name: String,
    pub japanese_name: String,
    pub species: String,
    pub type_primary: String,
    pub type_secondary: Option<String>,
    pub weight_kg: f32,
    pub height_m: f32,
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
    pub generation: u32,
    pub release_date: NaiveDate,
    pub legendary: bool,
    pub mythical: bool,
    pub description: String,
}

impl Record {
    /// Check every field rule; the first violation is reported
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PokedexError::Validation("name must not be empty".into()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(PokedexError::Validation(format!(
                "name exceeds {} bytes: {}",
                MAX_NAME_LEN,
                self.name.len()
            )));
        }
        if self.type_primary.trim().is_empty() {
            return Err(PokedexError::Validation("primary type is required".into()));
        }
        if self.generation == 0 {
            return Err(PokedexError::Validation("generation starts at 1".into()));
        }
        for (label, value) in [("weight", self.weight_kg), ("height", self.height_m)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PokedexError::Validation(format!(
                    "{} must be a finite non-negative number, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }

    /// Values of a text field (the type field yields one value per type)
    pub fn text(&self, field: TextField) -> Vec<&str> {
        match field {
            TextField::Name => vec![self.name.as_str()],
            TextField::JapaneseName => vec![self.japanese_name.as_str()],
            TextField::Species => vec![self.species.as_str()],
            TextField::Type => {
                let mut types = vec![self.type_primary.as_str()];
                if let Some(second) = &self.type_secondary {
                    types.push(second.as_str());
                }
                types
            }
            TextField::Description => vec![self.description.as_str()],
        }
    }

    /// Numeric field value widened to f64
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Hp => self.hp as f64,
            NumericField::Atk => self.atk as f64,
            NumericField::Def => self.def as f64,
            NumericField::Generation => self.generation as f64,
            NumericField::Height => self.height_m as f64,
            NumericField::Weight => self.weight_kg as f64,
        }
    }
}

// =============================================================================
// Field Selectors
// =============================================================================

/// Text fields that can be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TextField {
    Name,
    JapaneseName,
    Species,
    Type,
    Description,
}

impl TextField {
    pub const ALL: [TextField; 5] = [
        TextField::Name,
        TextField::JapaneseName,
        TextField::Species,
        TextField::Type,
        TextField::Description,
    ];
}

/// Numeric fields that accept range filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumericField {
    Hp,
    Atk,
    Def,
    Generation,
    Height,
    Weight,
}

impl NumericField {
    pub const ALL: [NumericField; 6] = [
        NumericField::Hp,
        NumericField::Atk,
        NumericField::Def,
        NumericField::Generation,
        NumericField::Height,
        NumericField::Weight,
    ];
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Release Dates
// =============================================================================

/// First release date of each main-series generation
const RELEASE_DATES: [(i32, u32, u32); 9] = [
    (1996, 2, 27),
    (1999, 11, 21),
    (2002, 11, 21),
    (2006, 9, 28),
    (2010, 9, 18),
    (2013, 10, 12),
    (2016, 11, 18),
    (2019, 11, 15),
    (2022, 11, 18),
];

/// Release date of a generation; generations past the table reuse the last date
pub fn release_date_for(generation: u32) -> NaiveDate {
    let idx = (generation.max(1) as usize - 1).min(RELEASE_DATES.len() - 1);
    let (y, m, d) = RELEASE_DATES[idx];
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}
