use serde::{Deserialize, Serialize};

use crate::rom::Rom;
use crate::state::StateError;

mod mapper000;
mod mapper001;
mod mapper002;
mod mapper004;

const CHR_RAM_SIZE: usize = 0x2000;

const MIRRORING_MAP: [[usize; 4]; 5] = [
    [0x000, 0x000, 0x400, 0x400], // Horizontal
    [0x000, 0x400, 0x000, 0x400], // Vertical
    [0x000, 0x000, 0x000, 0x000], // SingleScreen0
    [0x400, 0x400, 0x400, 0x400], // SingleScreen1
    [0x000, 0x400, 0x800, 0xc00], // FourScreen
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(usize)]
pub enum Mirroring {
    Horizontal = 0,
    Vertical = 1,
    SingleScreen0 = 2,
    SingleScreen1 = 3,
    FourScreen = 4,
}

impl Mirroring {
    /// nametable routing: underlying offset for each of the four
    /// logical tables at 0x2000/0x2400/0x2800/0x2c00
    pub fn pattern(self) -> [usize; 4] {
        MIRRORING_MAP[self as usize]
    }
}

pub struct Cartridge {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr_rom: Vec<u8>,
    chr_ram: Box<[u8; CHR_RAM_SIZE]>,
    battery: bool,

    mapper: Box<dyn Mapper + Send + Sync>,
}

impl Cartridge {
    pub fn new(rom: Rom) -> Self {
        let prg_banks = rom.prg.len() / 0x4000;
        let mapper: Box<dyn Mapper + Send + Sync> = match rom.mapper {
            0 => Box::new(mapper000::Nrom::new(rom.mirroring, prg_banks)),
            1 => Box::new(mapper001::Mmc1::new(prg_banks)),
            2 => Box::new(mapper002::Uxrom::new(
                rom.mirroring,
                prg_banks,
                rom.bus_conflicts,
            )),
            4 => Box::new(mapper004::Mmc3::new(rom.mirroring, prg_banks)),
            // unreachable in practice: Rom::parse rejects other ids
            n => unreachable!("mapper {} escaped rom validation", n),
        };

        Self {
            prg_rom: rom.prg,
            prg_ram: vec![0u8; rom.prg_ram_size],
            chr_rom: rom.chr,
            chr_ram: Box::new([0u8; CHR_RAM_SIZE]),
            battery: rom.battery,

            mapper,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x4020..=0x5fff => 0x00,
            0x6000..=0x7fff => {
                if self.mapper.prg_ram_enabled() {
                    self.prg_ram[self.mapper.prg_ram_offset(addr) % self.prg_ram.len()]
                } else {
                    0x00
                }
            }
            0x8000..=0xffff => self.mapper.read_prg(&self.prg_rom, addr),
            _ => unreachable!(),
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4020..=0x5fff => {}
            0x6000..=0x7fff => {
                if self.mapper.prg_ram_enabled() {
                    let offset = self.mapper.prg_ram_offset(addr) % self.prg_ram.len();
                    self.prg_ram[offset] = data;
                }
            }
            0x8000..=0xffff => self.mapper.write_prg(&self.prg_rom, addr, data),
            _ => unreachable!(),
        }
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        if !self.chr_rom.is_empty() {
            self.mapper.read_chr(&self.chr_rom, addr)
        } else {
            self.chr_ram[addr as usize & (CHR_RAM_SIZE - 1)]
        }
    }

    pub fn write_chr(&mut self, addr: u16, data: u8) {
        if self.chr_rom.is_empty() {
            self.chr_ram[addr as usize & (CHR_RAM_SIZE - 1)] = data;
        }
    }

    /// route a nametable address (0x2000..0x3eff) to an offset in the
    /// 4KB nametable backing, per the mapper's current mirror pattern
    pub fn nm_offset(&self, addr: u16) -> usize {
        let n = (addr as usize & 0xeff) >> 10;
        self.mapper.mirroring().pattern()[n] + (addr as usize & 0x3ff)
    }

    /// PPU address line 12 went low -> high
    pub fn irq_tick(&mut self) {
        self.mapper.irq_tick();
    }

    pub fn poll_irq(&mut self) -> bool {
        self.mapper.poll_irq()
    }

    pub fn battery(&self) -> bool {
        self.battery
    }

    pub fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    pub(crate) fn save_state(&self) -> CartState {
        CartState {
            prg_ram: self.prg_ram.clone(),
            chr_ram: if self.chr_rom.is_empty() {
                self.chr_ram.to_vec()
            } else {
                Vec::new()
            },
            mapper: self.mapper.save_state(),
        }
    }

    pub(crate) fn load_state(&mut self, state: &CartState) -> Result<(), StateError> {
        if state.prg_ram.len() != self.prg_ram.len() {
            return Err(StateError::Mismatch);
        }
        self.mapper.load_state(&state.mapper)?;
        self.prg_ram.copy_from_slice(&state.prg_ram);
        if self.chr_rom.is_empty() {
            if state.chr_ram.len() != CHR_RAM_SIZE {
                return Err(StateError::Mismatch);
            }
            self.chr_ram.copy_from_slice(&state.chr_ram);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct CartState {
    prg_ram: Vec<u8>,
    chr_ram: Vec<u8>,
    mapper: MapperState,
}

/// serializable mapper registers, one variant per supported mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum MapperState {
    Nrom,
    Mmc1 {
        step: u8,
        shifter: u8,
        ctrl: u8,
        chr0: u8,
        chr1: u8,
        prg: u8,
    },
    Uxrom {
        prg_bank: u8,
    },
    Mmc3 {
        bank_reg: u8,
        bank_regs: [u8; 8],
        prg_swap: bool,
        chr_invert: bool,
        mirroring: Mirroring,
        ram_enable: bool,
        irq_latch: u8,
        irq_counter: u8,
        irq_reload: bool,
        irq_on: bool,
        irq_level: bool,
    },
}

#[allow(unused_variables)]
pub trait Mapper {
    fn read_prg(&self, prg: &[u8], addr: u16) -> u8;
    fn write_prg(&mut self, prg: &[u8], addr: u16, data: u8) {}

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8;

    fn prg_ram_enabled(&self) -> bool {
        true
    }
    fn prg_ram_offset(&self, addr: u16) -> usize {
        addr as usize - 0x6000
    }

    fn irq_tick(&mut self) {}
    fn poll_irq(&mut self) -> bool {
        false
    }

    fn mirroring(&self) -> Mirroring;

    fn save_state(&self) -> MapperState;
    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::build_ines;

    fn cart(mapper: u8, prg_banks: usize, chr_banks: usize) -> Cartridge {
        let data = build_ines(mapper, prg_banks, chr_banks, 0);
        Cartridge::new(Rom::parse(&data).unwrap())
    }

    #[test]
    fn test_prg_ram_roundtrip() {
        let mut c = cart(0, 1, 1);
        c.write(0x6000, 0xaa);
        c.write(0x7fff, 0x55);
        assert_eq!(c.read(0x6000), 0xaa);
        assert_eq!(c.read(0x7fff), 0x55);
    }

    #[test]
    fn test_chr_ram_when_no_chr_rom() {
        let mut c = cart(2, 2, 0);
        c.write_chr(0x1234, 0x77);
        assert_eq!(c.read_chr(0x1234), 0x77);
    }

    #[test]
    fn test_chr_rom_is_readonly() {
        let mut c = cart(0, 1, 1);
        let before = c.read_chr(0x0000);
        c.write_chr(0x0000, before.wrapping_add(1));
        assert_eq!(c.read_chr(0x0000), before);
    }

    #[test]
    fn test_nm_offset_vertical() {
        let data = build_ines(0, 1, 1, 0b0001);
        let c = Cartridge::new(Rom::parse(&data).unwrap());
        assert_eq!(c.nm_offset(0x2000), 0x000);
        assert_eq!(c.nm_offset(0x2400), 0x400);
        assert_eq!(c.nm_offset(0x2800), 0x000);
        assert_eq!(c.nm_offset(0x2c05), 0x405);
    }
}
