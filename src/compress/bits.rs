//! MSB-first bit stream helpers

/// Packs bits into bytes, most significant bit first
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u8,
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | bit as u8;
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.acc);
            self.acc = 0;
            self.used = 0;
        }
    }

    /// Write the low `width` bits of `value`, high bit first
    pub fn write_bits(&mut self, value: u32, width: u8) {
        for shift in (0..width).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    /// Flush the partial byte (zero padded) and return the buffer
    pub fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.bytes.push(self.acc << (8 - self.used));
        }
        self.bytes
    }
}

/// Reads bits written by [`BitWriter`]
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.bytes.get(self.pos / 8)?;
        let bit = (byte >> (7 - (self.pos % 8))) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    pub fn read_bits(&mut self, width: u8) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..width {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Some(value)
    }
}
