//! Crypto Module
//!
//! Whole-store symmetric encryption. Keys and IVs come from the OS RNG;
//! keys travel as lowercase hex.
//!
//! ## Sealed Container
//! ```text
//! ┌────────────┬───────────┬──────────────────┬──────────┬───────────────┐
//! │ "PKC1" (4) │ Method(1) │ PlaintextCRC (4) │ IV (var) │ Body (var)    │
//! └────────────┴───────────┴──────────────────┴──────────┴───────────────┘
//! ```
//!
//! The CRC is what tells a wrong stream-cipher key apart from the right
//! one; for AES, padding is checked first.

pub mod aes;
pub mod trivium;

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PokedexError, Result};

use self::aes::Aes;
use self::trivium::Trivium;

pub const MAGIC: &[u8; 4] = b"PKC1";

const HEADER_SIZE: usize = 4 + 1 + 4;

/// Cipher used to seal the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherMethod {
    Trivium,
    Aes128,
    Aes192,
    Aes256,
}

impl CipherMethod {
    pub const ALL: [CipherMethod; 4] = [
        CipherMethod::Trivium,
        CipherMethod::Aes128,
        CipherMethod::Aes192,
        CipherMethod::Aes256,
    ];

    /// Wire code used by `/encrypt` and `/decrypt`
    pub fn code(self) -> u8 {
        match self {
            CipherMethod::Trivium => 1,
            CipherMethod::Aes128 => 2,
            CipherMethod::Aes192 => 3,
            CipherMethod::Aes256 => 4,
        }
    }

    pub fn key_len(self) -> usize {
        match self {
            CipherMethod::Trivium => trivium::KEY_LEN,
            CipherMethod::Aes128 => 16,
            CipherMethod::Aes192 => 24,
            CipherMethod::Aes256 => 32,
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            CipherMethod::Trivium => trivium::IV_LEN,
            _ => aes::BLOCK,
        }
    }
}

impl TryFrom<i64> for CipherMethod {
    type Error = PokedexError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(CipherMethod::Trivium),
            2 => Ok(CipherMethod::Aes128),
            3 => Ok(CipherMethod::Aes192),
            4 => Ok(CipherMethod::Aes256),
            _ => Err(PokedexError::InvalidMethod {
                what: "cipher",
                code,
            }),
        }
    }
}

impl fmt::Display for CipherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CipherMethod::Trivium => "Trivium",
            CipherMethod::Aes128 => "AES-128-CBC",
            CipherMethod::Aes192 => "AES-192-CBC",
            CipherMethod::Aes256 => "AES-256-CBC",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Fresh random key for `method`
pub fn generate_key(method: CipherMethod) -> Vec<u8> {
    let mut key = vec![0u8; method.key_len()];
    OsRng.fill_bytes(&mut key);
    key
}

pub fn encode_key(key: &[u8]) -> String {
    hex::encode(key)
}

/// Parse a hex key; malformed or wrongly sized keys are a `WrongKey`
pub fn decode_key(method: CipherMethod, key: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(key.trim()).map_err(|_| PokedexError::WrongKey)?;
    if bytes.len() != method.key_len() {
        return Err(PokedexError::WrongKey);
    }
    Ok(bytes)
}

// =============================================================================
// Seal / Open
// =============================================================================

/// Encrypt `plaintext` into a sealed container
pub fn seal(method: CipherMethod, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if key.len() != method.key_len() {
        return Err(PokedexError::WrongKey);
    }

    let mut iv = vec![0u8; method.iv_len()];
    OsRng.fill_bytes(&mut iv);

    let body = match method {
        CipherMethod::Trivium => {
            let mut body = plaintext.to_vec();
            trivium_for(key, &iv)?.apply_keystream(&mut body);
            body
        }
        _ => Aes::new(key)?.encrypt_cbc(&block_iv(&iv)?, plaintext),
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + iv.len() + body.len());
    out.extend_from_slice(MAGIC);
    out.push(method.code());
    out.extend_from_slice(&crc32fast::hash(plaintext).to_le_bytes());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);

    debug!(%method, plaintext = plaintext.len(), sealed = out.len(), "Sealed store");
    Ok(out)
}

/// Decrypt a sealed container
///
/// - container sealed with another method → `StoreEncrypted(actual)`
/// - bad key, bad padding, checksum mismatch → `WrongKey`
pub fn open(method: CipherMethod, key: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    let actual = sealed_method(sealed)?;
    if actual != method {
        return Err(PokedexError::StoreEncrypted(actual));
    }
    if key.len() != method.key_len() {
        return Err(PokedexError::WrongKey);
    }

    let crc = u32::from_le_bytes([sealed[5], sealed[6], sealed[7], sealed[8]]);
    let rest = &sealed[HEADER_SIZE..];
    if rest.len() < method.iv_len() {
        return Err(PokedexError::CorruptStream("sealed container misses its IV".into()));
    }
    let (iv, body) = rest.split_at(method.iv_len());

    let plaintext = match method {
        CipherMethod::Trivium => {
            let mut plain = body.to_vec();
            trivium_for(key, iv)?.apply_keystream(&mut plain);
            plain
        }
        _ => Aes::new(key)?.decrypt_cbc(&block_iv(iv)?, body)?,
    };

    if crc32fast::hash(&plaintext) != crc {
        return Err(PokedexError::WrongKey);
    }
    Ok(plaintext)
}

/// Method recorded in a sealed container's header
pub fn sealed_method(sealed: &[u8]) -> Result<CipherMethod> {
    if sealed.len() < HEADER_SIZE || &sealed[0..4] != MAGIC {
        return Err(PokedexError::CorruptStream("missing PKC1 header".into()));
    }
    CipherMethod::try_from(sealed[4] as i64)
        .map_err(|_| PokedexError::CorruptStream(format!("unknown cipher code {}", sealed[4])))
}

fn trivium_for(key: &[u8], iv: &[u8]) -> Result<Trivium> {
    let key: &[u8; trivium::KEY_LEN] = key.try_into().map_err(|_| PokedexError::WrongKey)?;
    let iv: &[u8; trivium::IV_LEN] = iv
        .try_into()
        .map_err(|_| PokedexError::CorruptStream("bad Trivium IV".into()))?;
    Ok(Trivium::new(key, iv))
}

fn block_iv(iv: &[u8]) -> Result<[u8; aes::BLOCK]> {
    iv.try_into()
        .map_err(|_| PokedexError::CorruptStream("bad AES IV".into()))
}
