use super::{Mapper, MapperState, Mirroring};
use crate::state::StateError;

/// 000, NROM
///
/// 16 KB or 32 KB PRG (16 KB mirrored),
/// 8 KB CHR, fixed mirroring
pub struct Nrom {
    prg_bank1: usize,
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(mirroring: Mirroring, prg_banks: usize) -> Self {
        Self {
            prg_bank1: prg_banks - 1,
            mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        match addr {
            0x8000..=0xbfff => prg[addr as usize - 0x8000],
            0xc000..=0xffff => prg[addr as usize - 0xc000 + self.prg_bank1 * 0x4000],
            _ => unreachable!(),
        }
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        chr[addr as usize]
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_state(&self) -> MapperState {
        MapperState::Nrom
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        match state {
            MapperState::Nrom => Ok(()),
            _ => Err(StateError::Mismatch),
        }
    }
}
