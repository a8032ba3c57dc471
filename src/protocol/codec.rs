//! JSON wire codec
//!
//! Field names follow the frontend contract:
//!
//! ```text
//! numero  nome  nomeJap  geracao  lancamento  especie  lendario  mitico
//! tipo[2] atk   def      hp       altura      peso     descricao
//! ```
//!
//! `tipo` always carries two entries on the way out; a missing second type
//! is the string `"Null"`. On the way in, `"Null"` and empty entries mean
//! absent, and a missing `lancamento` falls back to the generation's date.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PokedexError, Result};
use crate::record::{release_date_for, NumericField, Record, TextField};
use crate::search::{MergeQuery, SearchMethod};

use super::response::Reply;

/// Placeholder for an absent second type
pub const NULL_TYPE: &str = "Null";

// =============================================================================
// Records
// =============================================================================

/// A record as the frontend sends and receives it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonDto {
    /// Ignored by `post`; the client's sentinel id lands here
    #[serde(rename = "numero", default)]
    pub id: i64,

    #[serde(rename = "nome", default)]
    pub name: String,

    #[serde(rename = "nomeJap", default)]
    pub japanese_name: String,

    #[serde(rename = "geracao", default)]
    pub generation: u32,

    #[serde(rename = "lancamento", default)]
    pub release_date: Option<DateTime<Utc>>,

    #[serde(rename = "especie", default)]
    pub species: String,

    #[serde(rename = "lendario", default)]
    pub legendary: bool,

    #[serde(rename = "mitico", default)]
    pub mythical: bool,

    #[serde(rename = "tipo", default)]
    pub types: Vec<String>,

    #[serde(default)]
    pub atk: u32,

    #[serde(default)]
    pub def: u32,

    #[serde(default)]
    pub hp: u32,

    #[serde(rename = "altura", default)]
    pub height: f32,

    #[serde(rename = "peso", default)]
    pub weight: f32,

    #[serde(rename = "descricao", default)]
    pub description: String,
}

impl From<&Record> for PokemonDto {
    fn from(r: &Record) -> Self {
        Self {
            id: r.id as i64,
            name: r.name.clone(),
            japanese_name: r.japanese_name.clone(),
            generation: r.generation,
            release_date: Some(r.release_date.and_time(NaiveTime::MIN).and_utc()),
            species: r.species.clone(),
            legendary: r.legendary,
            mythical: r.mythical,
            types: vec![
                r.type_primary.clone(),
                r.type_secondary
                    .clone()
                    .unwrap_or_else(|| NULL_TYPE.to_string()),
            ],
            atk: r.atk,
            def: r.def,
            hp: r.hp,
            height: r.height_m,
            weight: r.weight_kg,
            description: r.description.clone(),
        }
    }
}

fn present_type(value: Option<&String>) -> Option<String> {
    value
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(NULL_TYPE))
        .map(str::to_string)
}

impl PokemonDto {
    /// Convert to a record; ids outside `u32` become 0, which no record uses
    pub fn into_record(self) -> Record {
        let release_date = match self.release_date {
            Some(at) => at.date_naive(),
            None => release_date_for(self.generation),
        };
        Record {
            id: u32::try_from(self.id).unwrap_or(0),
            type_primary: present_type(self.types.first()).unwrap_or_default(),
            type_secondary: present_type(self.types.get(1)),
            name: self.name,
            japanese_name: self.japanese_name,
            species: self.species,
            weight_kg: self.weight,
            height_m: self.height,
            hp: self.hp,
            atk: self.atk,
            def: self.def,
            generation: self.generation,
            release_date,
            legendary: self.legendary,
            mythical: self.mythical,
            description: self.description,
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// `mergeSearch` / `invertedIndex` body
///
/// ```json
/// { "nome": "char", "tipo": "fire",
///   "intervalos": { "hp": [30, 80], "geracao": [1, 1] },
///   "metodo": 2 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSearchBody {
    #[serde(default)]
    pub nome: String,

    #[serde(rename = "nomeJap", default)]
    pub nome_jap: String,

    #[serde(default)]
    pub especie: String,

    #[serde(default)]
    pub tipo: String,

    #[serde(default)]
    pub descricao: String,

    /// Inclusive `[min, max]` per numeric field
    #[serde(default)]
    pub intervalos: BTreeMap<String, [f64; 2]>,

    /// 0 inverted index, 1 naive, 2 KMP, 3 Rabin-Karp
    #[serde(default)]
    pub metodo: i64,
}

/// Numeric field behind a wire range name
pub fn numeric_field(name: &str) -> Option<NumericField> {
    match name {
        "hp" => Some(NumericField::Hp),
        "atk" => Some(NumericField::Atk),
        "def" => Some(NumericField::Def),
        "geracao" => Some(NumericField::Generation),
        "altura" => Some(NumericField::Height),
        "peso" => Some(NumericField::Weight),
        _ => None,
    }
}

impl MergeSearchBody {
    /// Typed query; `method` overrides `metodo` when given
    pub fn into_query(self, method: Option<SearchMethod>) -> Result<MergeQuery> {
        let method = match method {
            Some(method) => method,
            None => SearchMethod::try_from(self.metodo)?,
        };
        let mut query = MergeQuery::new(method)
            .filter(TextField::Name, self.nome)
            .filter(TextField::JapaneseName, self.nome_jap)
            .filter(TextField::Species, self.especie)
            .filter(TextField::Type, self.tipo)
            .filter(TextField::Description, self.descricao);
        for (name, [min, max]) in self.intervalos {
            let field = numeric_field(&name)
                .ok_or_else(|| PokedexError::Validation(format!("unknown range field {:?}", name)))?;
            query = query.range(field, min, max);
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
struct KeyBody {
    key: serde_json::Value,
}

// =============================================================================
// Encode / Decode
// =============================================================================

fn parse<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| PokedexError::Validation(format!("malformed {}: {}", what, e)))
}

/// Decode a record body
pub fn decode_record(body: &[u8]) -> Result<Record> {
    parse::<PokemonDto>(body, "record").map(PokemonDto::into_record)
}

/// Decode a JSON array of ids
pub fn decode_ids(body: &[u8]) -> Result<Vec<u32>> {
    parse(body, "id list")
}

/// Decode a `mergeSearch` body
pub fn decode_merge_search(body: &[u8], method: Option<SearchMethod>) -> Result<MergeQuery> {
    parse::<MergeSearchBody>(body, "search")?.into_query(method)
}

/// Decode a `{key}` body; numeric keys are taken by their decimal text
pub fn decode_key(body: &[u8]) -> Result<String> {
    match parse::<KeyBody>(body, "key")?.key {
        serde_json::Value::String(key) => Ok(key),
        other => Ok(other.to_string()),
    }
}

/// Encode a reply as its JSON body
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(reply)?)
}
