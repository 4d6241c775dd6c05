use std::convert::TryInto;

/// Board RAM: a flat little-endian byte array mapped at `base`.
pub struct Memory {
    base: u32,
    mem: Vec<u8>,
}

impl Memory {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            mem: vec![0u8; size],
        }
    }

    fn offset(&self, addr: u32, width: usize) -> usize {
        let offset = addr.wrapping_sub(self.base) as usize;
        if addr < self.base || offset + width > self.mem.len() {
            panic!("memory access out of bounds: addr = 0x{:08x}", addr);
        }
        offset
    }

    pub fn load_u32(&self, addr: u32) -> u32 {
        let offset = self.offset(addr, 4);
        let bytes: [u8; 4] = self.mem[offset..offset + 4]
            .try_into()
            .unwrap_or_else(|_| panic!("short read at 0x{:08x}", addr));
        u32::from_le_bytes(bytes)
    }

    pub fn store_u32(&mut self, addr: u32, val: u32) {
        let offset = self.offset(addr, 4);
        self.mem[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_little_endian_at_base_offset() {
        let mut mem = Memory::new(0x2000_0000, 64);
        mem.store_u32(0x2000_0004, 0x1122_3344);
        assert_eq!(mem.load_u32(0x2000_0004), 0x1122_3344);
        assert_eq!(mem.mem[4], 0x44);
        mem.store_u32(0x2000_003c, 7);
        assert_eq!(mem.load_u32(0x2000_003c), 7);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn access_below_base_panics() {
        let mem = Memory::new(0x2000_0000, 64);
        mem.load_u32(0x1fff_fffc);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn word_straddling_top_panics() {
        let mut mem = Memory::new(0x2000_0000, 64);
        mem.store_u32(0x2000_003e, 1);
    }
}
