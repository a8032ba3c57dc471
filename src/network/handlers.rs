//! Route handlers
//!
//! Each handler turns query parameters and body into a `Command`, then runs
//! it on the blocking pool. Parse failures and engine errors share one
//! error body: `{sucesso: false, codigo, mensagem}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, warn};

use crate::compress::CompressionKind;
use crate::crypto::CipherMethod;
use crate::engine::Engine;
use crate::error::{PokedexError, Result};
use crate::index::IndexKind;
use crate::protocol::{self, Command, Status};
use crate::search::SearchMethod;
use crate::sort::{SortKey, SortStrategy};

pub type Params = HashMap<String, String>;

/// Engine error rendered as the façade's error body
pub struct ApiError(pub PokedexError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(Status::of(&self.0).http_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        (status, Json(protocol::Response::error(&self.0))).into_response()
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// First of `names` present in the query string, as an integer
fn int_param(params: &Params, names: &[&str]) -> Result<i64> {
    let (name, raw) = names
        .iter()
        .find_map(|n| params.get(*n).map(|v| (*n, v)))
        .ok_or_else(|| PokedexError::Validation(format!("missing parameter {}", names[0])))?;
    raw.trim()
        .parse()
        .map_err(|_| PokedexError::Validation(format!("parameter {} is not a number: {:?}", name, raw)))
}

fn id_param(params: &Params) -> Result<u32> {
    let id = int_param(params, &["id"])?;
    u32::try_from(id).map_err(|_| PokedexError::Validation(format!("invalid id {}", id)))
}

fn metodo(params: &Params) -> Result<i64> {
    int_param(params, &["metodo", "method"])
}

// =============================================================================
// Dispatch
// =============================================================================

async fn dispatch(engine: Arc<Engine>, command: Result<Command>) -> Response {
    let command = match command {
        Ok(command) => command,
        Err(e) => return ApiError(e).into_response(),
    };
    let route = command.command_type().route();
    debug!(route, "Dispatching");

    let result = tokio::task::spawn_blocking(move || engine.execute(command))
        .await
        .map_err(|e| PokedexError::Network(format!("worker failed: {}", e)))
        .and_then(|result| result);

    match result {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// =============================================================================
// CRUD
// =============================================================================

pub async fn load_database(State(engine): State<Arc<Engine>>) -> Response {
    dispatch(engine, Ok(Command::LoadDatabase)).await
}

pub async fn get_all(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = match params.get("page") {
        None => Ok(Command::GetAll { page: 0 }),
        Some(_) => int_param(&params, &["page"]).and_then(|page| {
            usize::try_from(page)
                .map(|page| Command::GetAll { page })
                .map_err(|_| PokedexError::Validation(format!("negative page {}", page)))
        }),
    };
    dispatch(engine, command).await
}

pub async fn get_pages_number(State(engine): State<Arc<Engine>>) -> Response {
    dispatch(engine, Ok(Command::PageCount)).await
}

pub async fn get_id_list(State(engine): State<Arc<Engine>>) -> Response {
    dispatch(engine, Ok(Command::IdList)).await
}

pub async fn get_list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    let command = (|| -> Result<Command> {
        Ok(Command::GetList {
            kind: IndexKind::try_from(metodo(&params)?)?,
            ids: protocol::decode_ids(&body)?,
        })
    })();
    dispatch(engine, command).await
}

pub async fn get(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = id_param(&params).map(|id| Command::Get { id });
    dispatch(engine, command).await
}

pub async fn post(State(engine): State<Arc<Engine>>, body: Bytes) -> Response {
    let command = protocol::decode_record(&body).map(|record| Command::Post { record });
    dispatch(engine, command).await
}

pub async fn put(State(engine): State<Arc<Engine>>, body: Bytes) -> Response {
    let command = protocol::decode_record(&body).map(|record| Command::Put { record });
    dispatch(engine, command).await
}

pub async fn delete(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = id_param(&params).map(|id| Command::Delete { id });
    dispatch(engine, command).await
}

// =============================================================================
// Sort / Index
// =============================================================================

pub async fn ordenacao(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = (|| -> Result<Command> {
        let key = match params.get("chave") {
            Some(raw) => raw.parse::<SortKey>()?,
            None => SortKey::default(),
        };
        Ok(Command::Sort {
            strategy: SortStrategy::try_from(metodo(&params)?)?,
            key,
        })
    })();
    dispatch(engine, command).await
}

pub async fn indexacao(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = metodo(&params)
        .and_then(IndexKind::try_from)
        .map(|kind| Command::BuildIndex { kind });
    dispatch(engine, command).await
}

// =============================================================================
// Compression / Encryption
// =============================================================================

pub async fn zip(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = metodo(&params)
        .and_then(CompressionKind::try_from)
        .map(|kind| Command::Zip { kind });
    dispatch(engine, command).await
}

pub async fn unzip(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = metodo(&params)
        .and_then(CompressionKind::try_from)
        .map(|kind| Command::Unzip { kind });
    dispatch(engine, command).await
}

pub async fn encrypt(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let command = metodo(&params)
        .and_then(CipherMethod::try_from)
        .map(|method| Command::Encrypt { method });
    dispatch(engine, command).await
}

pub async fn decrypt(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    let command = (|| -> Result<Command> {
        Ok(Command::Decrypt {
            method: CipherMethod::try_from(metodo(&params)?)?,
            key: protocol::decode_key(&body)?,
        })
    })();
    dispatch(engine, command).await
}

// =============================================================================
// Search
// =============================================================================

/// A `metodo` in the query string overrides the one in the body
pub async fn merge_search(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<Params>,
    body: Bytes,
) -> Response {
    let command = (|| -> Result<Command> {
        let method = if params.contains_key("metodo") || params.contains_key("method") {
            Some(SearchMethod::try_from(metodo(&params)?)?)
        } else {
            None
        };
        Ok(Command::MergeSearch {
            query: protocol::decode_merge_search(&body, method)?,
        })
    })();
    dispatch(engine, command).await
}

pub async fn inverted_index(State(engine): State<Arc<Engine>>, body: Bytes) -> Response {
    let command = protocol::decode_merge_search(&body, Some(SearchMethod::Inverted))
        .map(|query| Command::InvertedIndex { query });
    dispatch(engine, command).await
}

pub async fn to_katakana(State(engine): State<Arc<Engine>>, Query(params): Query<Params>) -> Response {
    let text = params.get("stringToConvert").cloned().unwrap_or_default();
    dispatch(engine, Ok(Command::ToKatakana { text })).await
}
