//! Response definitions
//!
//! Replies to the frontend, and the status class of every error.

use serde::{Deserialize, Serialize};

use crate::error::PokedexError;

use super::codec::PokemonDto;

/// Success codes carried in `codigo`
pub mod code {
    pub const DELETED: u16 = 5;
    pub const IMPORTED: u16 = 6;
    pub const SORTED: u16 = 7;
    pub const INDEXED: u16 = 8;
    pub const COMPRESSED: u16 = 9;
    pub const DECRYPTED: u16 = 10;
    pub const DECOMPRESSED: u16 = 11;
}

/// Response status classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Invalid,
    Conflict,
    Locked,
    Unauthorized,
    Corrupt,
    Internal,
}

impl Status {
    pub fn of(err: &PokedexError) -> Self {
        match err {
            PokedexError::NotFound(_) => Status::NotFound,
            PokedexError::Validation(_) | PokedexError::InvalidMethod { .. } => Status::Invalid,
            PokedexError::IndexNotReady(_)
            | PokedexError::StoreNotCompressed
            | PokedexError::StoreNotEncrypted => Status::Conflict,
            PokedexError::StoreCompressed(_) | PokedexError::StoreEncrypted(_) => Status::Locked,
            PokedexError::WrongKey => Status::Unauthorized,
            PokedexError::CorruptStream(_) => Status::Corrupt,
            _ => Status::Internal,
        }
    }

    /// HTTP status code of the class
    pub fn http_code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::Invalid => 400,
            Status::Conflict => 409,
            Status::Locked => 423,
            Status::Unauthorized => 401,
            Status::Corrupt => 422,
            Status::Internal => 500,
        }
    }
}

/// `{sucesso, codigo, mensagem}` message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "sucesso")]
    pub success: bool,

    #[serde(rename = "codigo")]
    pub code: u16,

    #[serde(rename = "mensagem")]
    pub message: String,

    /// Elapsed milliseconds, for timed operations
    #[serde(rename = "tempo", default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<f64>,
}

impl Response {
    /// Create a success response for one of the [`code`] values
    pub fn ok(code: u16) -> Self {
        let message = match code {
            code::DELETED => "Pokemon deletado com sucesso!",
            code::IMPORTED => "CSV importado!",
            code::SORTED => "Ordenacao realizada com sucesso!",
            code::INDEXED => "Indice criado com sucesso!",
            code::COMPRESSED => "Base comprimida com sucesso!",
            code::DECRYPTED => "Base descriptografada com sucesso!",
            code::DECOMPRESSED => "Base descomprimida com sucesso!",
            _ => "Mensagem de sucesso desconhecida!",
        };
        Self {
            success: true,
            code,
            message: message.to_string(),
            elapsed_ms: None,
        }
    }

    /// Success response that also reports elapsed time
    pub fn timed(code: u16, elapsed_ms: f64) -> Self {
        Self {
            elapsed_ms: Some(elapsed_ms),
            ..Self::ok(code)
        }
    }

    /// Create an ERROR response; `codigo` is the HTTP status of its class
    pub fn error(err: &PokedexError) -> Self {
        Self {
            success: false,
            code: Status::of(err).http_code(),
            message: err.to_string(),
            elapsed_ms: None,
        }
    }
}

/// Everything a command can answer with
///
/// Serialized untagged: each variant is exactly the JSON body the
/// frontend expects for its route.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Message(Response),
    Record(Box<PokemonDto>),
    Records(Vec<PokemonDto>),
    Count(usize),
    Ids(Vec<u32>),
    Created {
        id: u32,
    },
    Listed {
        pokemons: Vec<PokemonDto>,
        time: f64,
        #[serde(rename = "faltando", skip_serializing_if = "Vec::is_empty")]
        missing: Vec<u32>,
    },
    Searched {
        ids: Vec<u32>,
        time: f64,
    },
    Text(String),
}
