//! # Pokédex
//!
//! The data engine behind a Pokédex frontend:
//! - Slot-based record store with tombstones
//! - External merge sorting with three run-formation strategies
//! - Sequential, extendible hash, B-tree, B+-tree, B*-tree and inverted indexes
//! - Substring search (naive, KMP, Rabin-Karp) and merged field/range queries
//! - Whole-store Huffman/LZW compression and Trivium/AES encryption
//! - Single-writer/multi-reader snapshots and an HTTP JSON façade
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   HTTP façade (axum)                         │
//! │          /getAll /getList /mergeSearch /zip ...              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Command / Reply
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │     write_lock (single writer) + Arc<Generation> snapshots   │
//! └───────┬──────────────┬──────────────┬───────────────┬───────┘
//!         │              │              │               │
//!         ▼              ▼              ▼               ▼
//!  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────────┐
//!  │   Store    │ │  Indexes   │ │   Search   │ │ Sort (runs)  │
//!  │  (slots)   │ │ (id→addr)  │ │ (matchers) │ │  tmp files   │
//!  └─────┬──────┘ └────────────┘ └────────────┘ └──────────────┘
//!        │ PKDX record stream
//!        ▼
//!  ┌──────────────────────────────────┐
//!  │ pokedex.dat | .huf | .lzw | .enc │
//!  └──────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod store;
pub mod sort;
pub mod index;
pub mod search;
pub mod compress;
pub mod crypto;
pub mod kana;
pub mod engine;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PokedexError, Result};
pub use config::Config;
pub use engine::Engine;
pub use record::Record;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the Pokédex engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
