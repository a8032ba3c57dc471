//! Compression Module
//!
//! Whole-store lossless codecs. Both operate on the serialized store and
//! produce a self-describing container; decoding restores the exact bytes.
//!
//! ## Containers
//! ```text
//! Huffman: "HUF1" | original_len: u64 | tree (pre-order) | code bits
//! LZW:     "LZW1" | original_len: u64 | code_count: u64  | codes (9..=12 bits)
//! ```

mod bits;
pub mod huffman;
pub mod lzw;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PokedexError, Result};

pub use bits::{BitReader, BitWriter};

/// Which codec sealed the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionKind {
    Huffman,
    Lzw,
}

impl CompressionKind {
    pub const ALL: [CompressionKind; 2] = [CompressionKind::Huffman, CompressionKind::Lzw];

    pub fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            CompressionKind::Huffman => huffman::encode(data),
            CompressionKind::Lzw => lzw::encode(data),
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionKind::Huffman => huffman::decode(data),
            CompressionKind::Lzw => lzw::decode(data),
        }
    }

    /// Wire code used by `/zip` and `/unzip`
    pub fn code(self) -> u8 {
        match self {
            CompressionKind::Huffman => 1,
            CompressionKind::Lzw => 2,
        }
    }

    /// Extension of the sealed store file
    pub fn file_extension(self) -> &'static str {
        match self {
            CompressionKind::Huffman => "huf",
            CompressionKind::Lzw => "lzw",
        }
    }
}

impl TryFrom<i64> for CompressionKind {
    type Error = PokedexError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(CompressionKind::Huffman),
            2 => Ok(CompressionKind::Lzw),
            _ => Err(PokedexError::InvalidMethod {
                what: "compression",
                code,
            }),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::Huffman => f.write_str("Huffman"),
            CompressionKind::Lzw => f.write_str("LZW"),
        }
    }
}

/// Split a container into its payload after checking magic and reading the length
pub(crate) fn read_header<'a>(data: &'a [u8], magic: &[u8; 4]) -> Result<(u64, &'a [u8])> {
    if data.len() < 12 || &data[0..4] != magic {
        return Err(PokedexError::CorruptStream(format!(
            "missing {} header",
            String::from_utf8_lossy(magic)
        )));
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&data[4..12]);
    Ok((u64::from_le_bytes(len), &data[12..]))
}
