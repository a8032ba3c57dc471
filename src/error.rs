//! Error types for the Pokédex engine
//!
//! Provides a unified error type for all operations. Every variant is
//! recoverable and surfaces at the HTTP façade as a message payload.

use thiserror::Error;

use crate::compress::CompressionKind;
use crate::crypto::CipherMethod;
use crate::index::IndexKind;

/// Result type alias using PokedexError
pub type Result<T> = std::result::Result<T, PokedexError>;

/// Unified error type for Pokédex operations
#[derive(Debug, Error)]
pub enum PokedexError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Pokémon {0} not found")]
    NotFound(u32),

    #[error("Invalid record: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index {0} is not ready")]
    IndexNotReady(IndexKind),

    // -------------------------------------------------------------------------
    // Mode Errors
    // -------------------------------------------------------------------------
    #[error("Store is compressed with {0}")]
    StoreCompressed(CompressionKind),

    #[error("Store is encrypted with {0}")]
    StoreEncrypted(CipherMethod),

    #[error("Store is not compressed")]
    StoreNotCompressed,

    #[error("Store is not encrypted")]
    StoreNotEncrypted,

    #[error("Wrong key")]
    WrongKey,

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Invalid {what} code: {code}")]
    InvalidMethod { what: &'static str, code: i64 },

    #[error("Operation cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for PokedexError {
    fn from(e: bincode::Error) -> Self {
        PokedexError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for PokedexError {
    fn from(e: csv::Error) -> Self {
        PokedexError::Validation(format!("csv: {}", e))
    }
}

impl From<serde_json::Error> for PokedexError {
    fn from(e: serde_json::Error) -> Self {
        PokedexError::Serialization(e.to_string())
    }
}
