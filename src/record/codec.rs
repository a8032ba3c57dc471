//! Store File Codec
//!
//! Serializes the live records of a store into one self-checking byte
//! stream. This stream is what gets persisted, compressed and encrypted.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                       │
//! │   Magic: "PKDX" (4) | Version: u16 (2) | Count: u32 (4) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Entries (variable)                                      │
//! │   [Len: u32][bincode(Record)]                           │
//! │   ... repeated for each live record ...                 │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   EntryCRC: u32 (crc32 over every entry byte)           │
//! └─────────────────────────────────────────────────────────┘
//! ```

use crate::error::{PokedexError, Result};

use super::Record;

/// Magic bytes identifying a store file
pub const MAGIC: &[u8; 4] = b"PKDX";

/// Current store format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Count (4)
pub const HEADER_SIZE: usize = 10;

/// Footer size: CRC (4)
pub const FOOTER_SIZE: usize = 4;

/// Encode records (in the given order) into a store byte stream
pub fn encode<'a, I>(records: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out = Vec::with_capacity(4096);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // patched below

    let mut hasher = crc32fast::Hasher::new();
    let mut count: u32 = 0;

    for record in records {
        let body = bincode::serialize(record)?;
        let len = (body.len() as u32).to_le_bytes();
        hasher.update(&len);
        hasher.update(&body);
        out.extend_from_slice(&len);
        out.extend_from_slice(&body);
        count += 1;
    }

    out[6..10].copy_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&hasher.finalize().to_le_bytes());
    Ok(out)
}

/// Decode a store byte stream, validating magic, version, lengths and CRC
pub fn decode(bytes: &[u8]) -> Result<Vec<Record>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(corrupt("store stream shorter than header and footer"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt(format!(
            "invalid store magic: expected PKDX, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(corrupt(format!("unsupported store version: {}", version)));
    }
    let count = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;

    let body_end = bytes.len() - FOOTER_SIZE;
    let stored_crc = u32::from_le_bytes([
        bytes[body_end],
        bytes[body_end + 1],
        bytes[body_end + 2],
        bytes[body_end + 3],
    ]);
    let body = &bytes[HEADER_SIZE..body_end];
    if crc32fast::hash(body) != stored_crc {
        return Err(corrupt("store checksum mismatch"));
    }

    let mut records = Vec::with_capacity(count);
    let mut pos = 0;
    while pos < body.len() {
        if pos + 4 > body.len() {
            return Err(corrupt("truncated entry length"));
        }
        let len = u32::from_le_bytes([body[pos], body[pos + 1], body[pos + 2], body[pos + 3]])
            as usize;
        pos += 4;
        if pos + len > body.len() {
            return Err(corrupt("truncated entry body"));
        }
        let record: Record = bincode::deserialize(&body[pos..pos + len])?;
        records.push(record);
        pos += len;
    }

    if records.len() != count {
        return Err(corrupt(format!(
            "header announces {} records, found {}",
            count,
            records.len()
        )));
    }
    Ok(records)
}

fn corrupt(msg: impl Into<String>) -> PokedexError {
    PokedexError::CorruptStream(msg.into())
}
