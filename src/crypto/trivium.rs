//! Trivium stream cipher (80-bit key, 80-bit IV)
//!
//! The 288-bit state is split across its three shift registers:
//!
//! ```text
//! A = s1   ..= s93    (93 bits)   bit j = s(1 + j)
//! B = s94  ..= s177   (84 bits)   bit j = s(94 + j)
//! C = s178 ..= s288   (111 bits)  bit j = s(178 + j)
//! ```
//!
//! Key and IV bits are loaded LSB-first per byte; keystream bytes are
//! assembled LSB-first too.

pub const KEY_LEN: usize = 10;
pub const IV_LEN: usize = 10;

const WARMUP_ROUNDS: usize = 4 * 288;

const MASK_A: u128 = (1 << 93) - 1;
const MASK_B: u128 = (1 << 84) - 1;
const MASK_C: u128 = (1 << 111) - 1;

#[derive(Debug, Clone)]
pub struct Trivium {
    a: u128,
    b: u128,
    c: u128,
}

#[inline]
fn bit(reg: u128, idx: u32) -> u8 {
    ((reg >> idx) & 1) as u8
}

impl Trivium {
    /// Load key and IV and run the warm-up rounds
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        let mut a = 0u128;
        let mut b = 0u128;
        for i in 0..80 {
            a |= (((key[i / 8] >> (i % 8)) & 1) as u128) << i;
            b |= (((iv[i / 8] >> (i % 8)) & 1) as u128) << i;
        }
        // s286, s287, s288 = 1
        let c = 0b111u128 << 108;

        let mut cipher = Self { a, b, c };
        for _ in 0..WARMUP_ROUNDS {
            cipher.step();
        }
        cipher
    }

    /// Advance one round, returning the output bit
    fn step(&mut self) -> u8 {
        let mut t1 = bit(self.a, 65) ^ bit(self.a, 92);
        let mut t2 = bit(self.b, 68) ^ bit(self.b, 83);
        let mut t3 = bit(self.c, 65) ^ bit(self.c, 110);
        let z = t1 ^ t2 ^ t3;

        t1 ^= (bit(self.a, 90) & bit(self.a, 91)) ^ bit(self.b, 77);
        t2 ^= (bit(self.b, 81) & bit(self.b, 82)) ^ bit(self.c, 86);
        t3 ^= (bit(self.c, 108) & bit(self.c, 109)) ^ bit(self.a, 68);

        self.a = ((self.a << 1) | t3 as u128) & MASK_A;
        self.b = ((self.b << 1) | t1 as u128) & MASK_B;
        self.c = ((self.c << 1) | t2 as u128) & MASK_C;
        z
    }

    pub fn next_byte(&mut self) -> u8 {
        (0..8).fold(0u8, |byte, i| byte | (self.step() << i))
    }

    /// XOR the keystream into `data` (encryption and decryption are the same)
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}
