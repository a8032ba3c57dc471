//! LZW Codec
//!
//! Dictionary starts with the 256 single bytes and grows to `MAX_CODES`.
//! Once full it is frozen. The k-th code is written with just enough bits
//! (at least 9) to address the dictionary as it stood when the encoder
//! emitted it; the decoder derives the same width from k alone.

use std::collections::HashMap;

use crate::error::{PokedexError, Result};

use super::{read_header, BitReader, BitWriter};

pub const MAGIC: &[u8; 4] = b"LZW1";

/// Dictionary capacity (12-bit codes)
pub const MAX_CODES: usize = 4096;

const MIN_WIDTH: u8 = 9;

/// Compress `data` into an LZW container
pub fn encode(data: &[u8]) -> Vec<u8> {
    let codes = emit_codes(data);

    let mut bits = BitWriter::new();
    for (k, &code) in codes.iter().enumerate() {
        bits.write_bits(code as u32, width_for(k));
    }

    let mut out = Vec::with_capacity(codes.len() * 3 / 2 + 20);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(&(codes.len() as u64).to_le_bytes());
    out.extend_from_slice(&bits.finish());
    out
}

/// Restore the bytes of an LZW container
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let (len, payload) = read_header(data, MAGIC)?;
    if payload.len() < 8 {
        return Err(corrupt("missing code count"));
    }
    let mut count = [0u8; 8];
    count.copy_from_slice(&payload[..8]);
    let count = u64::from_le_bytes(count);
    let len = usize::try_from(len).map_err(|_| corrupt("length overflows usize"))?;
    let count = usize::try_from(count).map_err(|_| corrupt("code count overflows usize"))?;

    // codes are at least 9 bits wide and none expands past MAX_CODES bytes
    let codes = &payload[8..];
    if count > codes.len().saturating_mul(8) / 9 + 1 {
        return Err(corrupt("code count exceeds the code stream"));
    }
    if len > count.saturating_mul(MAX_CODES) {
        return Err(corrupt("announced length exceeds the code stream"));
    }

    let mut bits = BitReader::new(codes);
    let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
    let mut out = Vec::with_capacity(len);
    let mut prev: Option<usize> = None;

    for k in 0..count {
        let code = bits
            .read_bits(width_for(k))
            .ok_or_else(|| corrupt("code stream ended early"))? as usize;

        let entry = if code < table.len() {
            table[code].clone()
        } else if code == table.len() && table.len() < MAX_CODES {
            // KwKwK: the code the encoder created right before using it
            let p = prev.ok_or_else(|| corrupt("first code out of range"))?;
            let mut e = table[p].clone();
            e.push(table[p][0]);
            e
        } else {
            return Err(corrupt(&format!("code {} out of range", code)));
        };

        if let Some(p) = prev {
            if table.len() < MAX_CODES {
                let mut grown = table[p].clone();
                grown.push(entry[0]);
                table.push(grown);
            }
        }

        out.extend_from_slice(&entry);
        if out.len() > len {
            return Err(corrupt("decoded past announced length"));
        }
        prev = Some(code);
    }

    if out.len() != len {
        return Err(corrupt("decoded length mismatch"));
    }
    Ok(out)
}

fn emit_codes(data: &[u8]) -> Vec<u16> {
    let Some((&first, rest)) = data.split_first() else {
        return Vec::new();
    };

    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next = 256usize;
    let mut codes = Vec::new();
    let mut w = first as u16;

    for &b in rest {
        match dict.get(&(w, b)) {
            Some(&code) => w = code,
            None => {
                codes.push(w);
                if next < MAX_CODES {
                    dict.insert((w, b), next as u16);
                    next += 1;
                }
                w = b as u16;
            }
        }
    }
    codes.push(w);
    codes
}

/// Bit width of the k-th emitted code
fn width_for(k: usize) -> u8 {
    let dict_size = 256 + k.min(MAX_CODES - 256);
    let needed = usize::BITS - (dict_size - 1).leading_zeros();
    (needed as u8).max(MIN_WIDTH)
}

fn corrupt(msg: &str) -> PokedexError {
    PokedexError::CorruptStream(format!("lzw: {}", msg))
}
