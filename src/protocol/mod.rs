//! Protocol Module
//!
//! The façade contract between the HTTP layer and the engine.
//!
//! ```text
//!  HTTP request ──▶ Command ──▶ Engine::execute ──▶ Reply ──▶ JSON body
//!                                     │
//!                                     └─ PokedexError ──▶ Response{sucesso:false}
//!                                                         + Status (HTTP code)
//! ```
//!
//! ### Success bodies
//! - records: `PokemonDto` objects (Portuguese field names)
//! - messages: `{sucesso, codigo, mensagem[, tempo]}`
//! - `getList`: `{pokemons, time}`; `mergeSearch`: `{ids, time}`
//!
//! ### Status Codes
//! - 404: NotFound
//! - 400: Validation, InvalidMethod
//! - 409: IndexNotReady, StoreNotCompressed, StoreNotEncrypted
//! - 423: StoreCompressed, StoreEncrypted
//! - 401: WrongKey
//! - 422: CorruptStream
//! - 500: everything else

mod codec;
mod command;
mod response;

pub use codec::{
    decode_ids, decode_key, decode_merge_search, decode_record, encode_reply, numeric_field,
    MergeSearchBody, PokemonDto, NULL_TYPE,
};
pub use command::{Command, CommandType};
pub use response::{code, Reply, Response, Status};
