use serde::{Deserialize, Serialize};

use crate::cart::Cartridge;

pub const NAMETABLE_SIZE: usize = 0x1000;
pub const PALETTE_SIZE: usize = 0x20;

/// PPU-side memory: pattern tables live on the cart, nametables are
/// routed through the cart's mirror pattern, palette RAM applies the
/// 0x3f10/14/18/1c aliasing on both reads and writes.
pub struct Vram {
    // sized for four-screen carts; standard boards only route into the
    // first 2KB
    nametables: Box<[u8; NAMETABLE_SIZE]>,
    palettes: [u8; PALETTE_SIZE],
}

impl Default for Vram {
    fn default() -> Self {
        Self {
            nametables: Box::new([0u8; NAMETABLE_SIZE]),
            palettes: [0u8; PALETTE_SIZE],
        }
    }
}

impl Vram {
    pub fn read(&self, cart: &Cartridge, addr: u16) -> u8 {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.read_chr(addr),
            0x2000..=0x3eff => self.nametables[cart.nm_offset(addr)],
            _ => self.palettes[palette_index(addr)],
        }
    }

    pub fn write(&mut self, cart: &mut Cartridge, addr: u16, data: u8) {
        let addr = addr & 0x3fff;
        match addr {
            0x0000..=0x1fff => cart.write_chr(addr, data),
            0x2000..=0x3eff => self.nametables[cart.nm_offset(addr)] = data,
            _ => self.palettes[palette_index(addr)] = data & 0x3f,
        }
    }

    /// direct palette RAM access, pre-aliased index 0..32
    pub fn palette(&self, index: usize) -> u8 {
        self.palettes[palette_index(0x3f00 + index as u16)]
    }

    pub fn clear(&mut self) {
        self.nametables.fill(0);
        self.palettes.fill(0);
    }

    pub(crate) fn save_state(&self) -> VramState {
        VramState {
            nametables: self.nametables.to_vec(),
            palettes: self.palettes.to_vec(),
        }
    }

    pub(crate) fn load_state(&mut self, state: &VramState) -> bool {
        if state.nametables.len() != NAMETABLE_SIZE || state.palettes.len() != PALETTE_SIZE {
            return false;
        }
        self.nametables.copy_from_slice(&state.nametables);
        self.palettes.copy_from_slice(&state.palettes);
        true
    }
}

fn palette_index(addr: u16) -> usize {
    let index = (addr & 0x1f) as usize;
    match index {
        0x10 | 0x14 | 0x18 | 0x1c => index - 0x10,
        _ => index,
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct VramState {
    nametables: Vec<u8>,
    palettes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::{build_ines, Rom};

    fn cart() -> Cartridge {
        Cartridge::new(Rom::parse(&build_ines(0, 1, 1, 0)).unwrap())
    }

    #[test]
    fn test_palette_aliasing() {
        let mut cart = cart();
        let mut vram = Vram::default();

        vram.write(&mut cart, 0x3f10, 0x21);
        assert_eq!(vram.read(&cart, 0x3f00), 0x21);
        assert_eq!(vram.read(&cart, 0x3f10), 0x21);

        vram.write(&mut cart, 0x3f04, 0x13);
        assert_eq!(vram.read(&cart, 0x3f14), 0x13);

        // non-mirror entries stay independent
        vram.write(&mut cart, 0x3f01, 0x05);
        vram.write(&mut cart, 0x3f11, 0x06);
        assert_eq!(vram.read(&cart, 0x3f01), 0x05);
        assert_eq!(vram.read(&cart, 0x3f11), 0x06);
    }

    #[test]
    fn test_palette_write_read_law() {
        let mut cart = cart();
        let mut vram = Vram::default();
        for i in 0..PALETTE_SIZE as u16 {
            vram.write(&mut cart, 0x3f00 + i, i as u8);
        }
        for i in 0..PALETTE_SIZE as u16 {
            // the later mirror writes landed on the low entries
            let expect = match i {
                0x00 | 0x04 | 0x08 | 0x0c | 0x10 | 0x14 | 0x18 | 0x1c => (i | 0x10) as u8,
                _ => i as u8,
            };
            assert_eq!(vram.read(&cart, 0x3f00 + i), expect);
        }
    }

    #[test]
    fn test_nametable_mirror_region() {
        let mut cart = cart();
        let mut vram = Vram::default();
        vram.write(&mut cart, 0x2005, 0x77);
        // 0x3000-0x3eff mirrors 0x2000-0x2eff
        assert_eq!(vram.read(&cart, 0x3005), 0x77);
    }
}
