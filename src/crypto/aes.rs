//! AES block cipher (FIPS-197) and CBC mode with PKCS#7 padding
//!
//! Key sizes: 16, 24 or 32 bytes. The state is kept column-major, which is
//! the byte order of the input block.

use crate::error::{PokedexError, Result};

pub const BLOCK: usize = 16;

const SBOX: [u8; 256] = build_sbox();
const INV_SBOX: [u8; 256] = invert(&SBOX);

const RCON: [u8; 10] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x1b, 0x36];

/// S-box from the multiplicative inverse in GF(2^8) plus the affine map
const fn build_sbox() -> [u8; 256] {
    let mut sbox = [0u8; 256];
    let mut p: u8 = 1;
    let mut q: u8 = 1;
    loop {
        // p *= 3
        p = p ^ (p << 1) ^ if p & 0x80 != 0 { 0x1b } else { 0 };
        // q /= 3
        q ^= q << 1;
        q ^= q << 2;
        q ^= q << 4;
        if q & 0x80 != 0 {
            q ^= 0x09;
        }
        let affine = q ^ q.rotate_left(1) ^ q.rotate_left(2) ^ q.rotate_left(3) ^ q.rotate_left(4);
        sbox[p as usize] = affine ^ 0x63;
        if p == 1 {
            break;
        }
    }
    sbox[0] = 0x63;
    sbox
}

const fn invert(sbox: &[u8; 256]) -> [u8; 256] {
    let mut inv = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        inv[sbox[i] as usize] = i as u8;
        i += 1;
    }
    inv
}

fn xtime(a: u8) -> u8 {
    (a << 1) ^ if a & 0x80 != 0 { 0x1b } else { 0 }
}

fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    product
}

/// Expanded AES key
#[derive(Clone)]
pub struct Aes {
    round_keys: Vec<[u8; BLOCK]>,
}

impl std::fmt::Debug for Aes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes")
            .field("rounds", &(self.round_keys.len() - 1))
            .finish_non_exhaustive()
    }
}

impl Aes {
    /// Expand a 128/192/256-bit key
    pub fn new(key: &[u8]) -> Result<Self> {
        let nk = match key.len() {
            16 | 24 | 32 => key.len() / 4,
            _ => return Err(PokedexError::WrongKey),
        };
        let rounds = nk + 6;
        let total = 4 * (rounds + 1);

        let mut words: Vec<[u8; 4]> = Vec::with_capacity(total);
        for chunk in key.chunks_exact(4) {
            words.push([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        for i in nk..total {
            let mut temp = words[i - 1];
            if i % nk == 0 {
                temp.rotate_left(1);
                temp = temp.map(|b| SBOX[b as usize]);
                temp[0] ^= RCON[i / nk - 1];
            } else if nk > 6 && i % nk == 4 {
                temp = temp.map(|b| SBOX[b as usize]);
            }
            let prev = words[i - nk];
            words.push([
                prev[0] ^ temp[0],
                prev[1] ^ temp[1],
                prev[2] ^ temp[2],
                prev[3] ^ temp[3],
            ]);
        }

        let round_keys = words
            .chunks_exact(4)
            .map(|w| {
                let mut rk = [0u8; BLOCK];
                for (c, word) in w.iter().enumerate() {
                    rk[4 * c..4 * c + 4].copy_from_slice(word);
                }
                rk
            })
            .collect();

        Ok(Self { round_keys })
    }

    fn rounds(&self) -> usize {
        self.round_keys.len() - 1
    }

    pub fn encrypt_block(&self, block: &mut [u8; BLOCK]) {
        let nr = self.rounds();
        add_round_key(block, &self.round_keys[0]);
        for round in 1..nr {
            sub_bytes(block, &SBOX);
            shift_rows(block);
            mix_columns(block);
            add_round_key(block, &self.round_keys[round]);
        }
        sub_bytes(block, &SBOX);
        shift_rows(block);
        add_round_key(block, &self.round_keys[nr]);
    }

    pub fn decrypt_block(&self, block: &mut [u8; BLOCK]) {
        let nr = self.rounds();
        add_round_key(block, &self.round_keys[nr]);
        for round in (1..nr).rev() {
            inv_shift_rows(block);
            sub_bytes(block, &INV_SBOX);
            add_round_key(block, &self.round_keys[round]);
            inv_mix_columns(block);
        }
        inv_shift_rows(block);
        sub_bytes(block, &INV_SBOX);
        add_round_key(block, &self.round_keys[0]);
    }

    // =========================================================================
    // CBC Mode
    // =========================================================================

    /// CBC-encrypt with PKCS#7 padding (always adds 1..=16 bytes)
    pub fn encrypt_cbc(&self, iv: &[u8; BLOCK], plaintext: &[u8]) -> Vec<u8> {
        let pad = BLOCK - plaintext.len() % BLOCK;
        let mut data = Vec::with_capacity(plaintext.len() + pad);
        data.extend_from_slice(plaintext);
        data.resize(plaintext.len() + pad, pad as u8);

        let mut chain = *iv;
        for chunk in data.chunks_exact_mut(BLOCK) {
            let mut block = [0u8; BLOCK];
            for i in 0..BLOCK {
                block[i] = chunk[i] ^ chain[i];
            }
            self.encrypt_block(&mut block);
            chunk.copy_from_slice(&block);
            chain = block;
        }
        data
    }

    /// CBC-decrypt and strip PKCS#7 padding
    ///
    /// Bad padding means the key (or data) is wrong.
    pub fn decrypt_cbc(&self, iv: &[u8; BLOCK], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK != 0 {
            return Err(PokedexError::CorruptStream(format!(
                "ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK
            )));
        }

        let mut out = Vec::with_capacity(ciphertext.len());
        let mut chain = *iv;
        for chunk in ciphertext.chunks_exact(BLOCK) {
            let mut block = [0u8; BLOCK];
            block.copy_from_slice(chunk);
            let saved = block;
            self.decrypt_block(&mut block);
            for i in 0..BLOCK {
                out.push(block[i] ^ chain[i]);
            }
            chain = saved;
        }

        let pad = *out.last().ok_or(PokedexError::WrongKey)? as usize;
        if pad == 0 || pad > BLOCK || out[out.len() - pad..].iter().any(|&b| b as usize != pad) {
            return Err(PokedexError::WrongKey);
        }
        out.truncate(out.len() - pad);
        Ok(out)
    }
}

// =============================================================================
// Round Transformations
// =============================================================================

fn add_round_key(state: &mut [u8; BLOCK], key: &[u8; BLOCK]) {
    for (s, k) in state.iter_mut().zip(key) {
        *s ^= k;
    }
}

fn sub_bytes(state: &mut [u8; BLOCK], table: &[u8; 256]) {
    for s in state.iter_mut() {
        *s = table[*s as usize];
    }
}

fn shift_rows(state: &mut [u8; BLOCK]) {
    let old = *state;
    for r in 1..4 {
        for c in 0..4 {
            state[r + 4 * c] = old[r + 4 * ((c + r) % 4)];
        }
    }
}

fn inv_shift_rows(state: &mut [u8; BLOCK]) {
    let old = *state;
    for r in 1..4 {
        for c in 0..4 {
            state[r + 4 * ((c + r) % 4)] = old[r + 4 * c];
        }
    }
}

fn mix_columns(state: &mut [u8; BLOCK]) {
    for col in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = xtime(a0) ^ (xtime(a1) ^ a1) ^ a2 ^ a3;
        col[1] = a0 ^ xtime(a1) ^ (xtime(a2) ^ a2) ^ a3;
        col[2] = a0 ^ a1 ^ xtime(a2) ^ (xtime(a3) ^ a3);
        col[3] = (xtime(a0) ^ a0) ^ a1 ^ a2 ^ xtime(a3);
    }
}

fn inv_mix_columns(state: &mut [u8; BLOCK]) {
    for col in state.chunks_exact_mut(4) {
        let [a0, a1, a2, a3] = [col[0], col[1], col[2], col[3]];
        col[0] = gmul(a0, 14) ^ gmul(a1, 11) ^ gmul(a2, 13) ^ gmul(a3, 9);
        col[1] = gmul(a0, 9) ^ gmul(a1, 14) ^ gmul(a2, 11) ^ gmul(a3, 13);
        col[2] = gmul(a0, 13) ^ gmul(a1, 9) ^ gmul(a2, 14) ^ gmul(a3, 11);
        col[3] = gmul(a0, 11) ^ gmul(a1, 13) ^ gmul(a2, 9) ^ gmul(a3, 14);
    }
}
