use bit_field::BitField;

use super::{Mapper, MapperState, Mirroring};
use crate::state::StateError;

/// 004, MMC3
///
/// Eight bank registers behind a select port, two mode bits (PRG slot
/// swap, CHR A12 inversion), and a scanline IRQ counter clocked by PPU
/// A12 rising edges.
pub struct Mmc3 {
    bank_reg: u8,
    bank_regs: [u8; 8],
    prg_swap: bool,
    chr_invert: bool,

    prg_banks_8k: usize,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_on: bool,
    irq_level: bool,

    ram_enable: bool,
    mirroring: Mirroring,
    four_screen: bool,
}

impl Mmc3 {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        Self {
            bank_reg: 0,
            bank_regs: [0; 8],
            prg_swap: false,
            chr_invert: false,

            prg_banks_8k: prg_banks * 2,

            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_on: false,
            irq_level: false,

            ram_enable: true,
            mirroring,
            four_screen: mirroring == Mirroring::FourScreen,
        }
    }

    /// 8 KB bank for each of the four PRG slots
    fn prg_bank(&self, slot: usize) -> usize {
        let r6 = self.bank_regs[6] as usize & 0x3f;
        let r7 = self.bank_regs[7] as usize & 0x3f;
        let max = self.prg_banks_8k;
        let bank = match (slot, self.prg_swap) {
            (0, false) => r6,
            (0, true) => max - 2,
            (1, _) => r7,
            (2, false) => max - 2,
            (2, true) => r6,
            (3, _) => max - 1,
            _ => unreachable!(),
        };
        bank % max
    }

    /// 1 KB bank for each of the eight CHR slots
    fn chr_bank(&self, slot: usize) -> usize {
        let slot = if self.chr_invert { slot ^ 4 } else { slot };
        match slot {
            0 => self.bank_regs[0] as usize & !1,
            1 => (self.bank_regs[0] as usize & !1) + 1,
            2 => self.bank_regs[1] as usize & !1,
            3 => (self.bank_regs[1] as usize & !1) + 1,
            _ => self.bank_regs[slot - 2] as usize,
        }
    }
}

impl Mapper for Mmc3 {
    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        let slot = (addr as usize >> 13) & 0b11;
        let offset = addr as usize & 0x1fff;
        prg[offset + self.prg_bank(slot) * 0x2000]
    }

    fn write_prg(&mut self, _prg: &[u8], addr: u16, data: u8) {
        let even = addr % 2 == 0;
        match addr {
            0x8000..=0x9fff => {
                if even {
                    self.bank_reg = data.get_bits(0..3);
                    self.prg_swap = data.get_bit(6);
                    self.chr_invert = data.get_bit(7);
                } else {
                    self.bank_regs[self.bank_reg as usize] = data;
                }
            }
            0xa000..=0xbfff => {
                if even {
                    // four-screen boards carry their own VRAM and ignore this
                    if !self.four_screen {
                        self.mirroring = if data.get_bit(0) {
                            Mirroring::Horizontal
                        } else {
                            Mirroring::Vertical
                        };
                    }
                } else {
                    self.ram_enable = data.get_bit(7);
                }
            }
            0xc000..=0xdfff => {
                if even {
                    self.irq_latch = data;
                } else {
                    self.irq_reload = true;
                }
            }
            0xe000..=0xffff => {
                self.irq_on = !even;
                if even {
                    self.irq_level = false;
                }
            }
            _ => unreachable!(),
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        let slot = (addr as usize >> 10) & 0b111;
        let offset = addr as usize & 0x3ff;
        let banks = chr.len() / 0x400;
        chr[offset + (self.chr_bank(slot) % banks) * 0x400]
    }

    fn prg_ram_enabled(&self) -> bool {
        self.ram_enable
    }

    fn irq_tick(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_on {
            self.irq_level = true;
        }
    }

    fn poll_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_level)
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_state(&self) -> MapperState {
        MapperState::Mmc3 {
            bank_reg: self.bank_reg,
            bank_regs: self.bank_regs,
            prg_swap: self.prg_swap,
            chr_invert: self.chr_invert,
            mirroring: self.mirroring,
            ram_enable: self.ram_enable,
            irq_latch: self.irq_latch,
            irq_counter: self.irq_counter,
            irq_reload: self.irq_reload,
            irq_on: self.irq_on,
            irq_level: self.irq_level,
        }
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        match *state {
            MapperState::Mmc3 {
                bank_reg,
                bank_regs,
                prg_swap,
                chr_invert,
                mirroring,
                ram_enable,
                irq_latch,
                irq_counter,
                irq_reload,
                irq_on,
                irq_level,
            } => {
                self.bank_reg = bank_reg;
                self.bank_regs = bank_regs;
                self.prg_swap = prg_swap;
                self.chr_invert = chr_invert;
                self.mirroring = mirroring;
                self.ram_enable = ram_enable;
                self.irq_latch = irq_latch;
                self.irq_counter = irq_counter;
                self.irq_reload = irq_reload;
                self.irq_on = irq_on;
                self.irq_level = irq_level;
                Ok(())
            }
            _ => Err(StateError::Mismatch),
        }
    }
}
