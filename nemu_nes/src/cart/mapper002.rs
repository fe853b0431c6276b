use super::{Mapper, MapperState, Mirroring};
use crate::state::StateError;

/// 002, UxROM
///
/// 0x8000-0xbfff: 16 KB switchable PRG bank,
/// 0xc000-0xffff: 16 KB PRG bank fixed to the last,
/// 8 KB CHR RAM
pub struct Uxrom {
    prg_bank: usize,
    prg_banks: usize,
    bus_conflicts: bool,

    mirroring: Mirroring,
}

impl Uxrom {
    pub fn new(mirroring: Mirroring, prg_banks: usize, bus_conflicts: bool) -> Self {
        Self {
            prg_bank: 0,
            prg_banks,
            bus_conflicts,

            mirroring,
        }
    }
}

impl Mapper for Uxrom {
    fn read_prg(&self, prg: &[u8], addr: u16) -> u8 {
        match addr {
            0x8000..=0xbfff => prg[addr as usize - 0x8000 + self.prg_bank * 0x4000],
            0xc000..=0xffff => prg[addr as usize - 0xc000 + (self.prg_banks - 1) * 0x4000],
            _ => unreachable!(),
        }
    }

    fn write_prg(&mut self, prg: &[u8], addr: u16, data: u8) {
        // discrete-logic boards drive ROM and CPU onto the bus at once;
        // the effective value is the AND of both
        let data = if self.bus_conflicts {
            data & self.read_prg(prg, addr)
        } else {
            data
        };
        self.prg_bank = data as usize % self.prg_banks;
    }

    fn read_chr(&self, chr: &[u8], addr: u16) -> u8 {
        chr[addr as usize]
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_state(&self) -> MapperState {
        MapperState::Uxrom {
            prg_bank: self.prg_bank as u8,
        }
    }

    fn load_state(&mut self, state: &MapperState) -> Result<(), StateError> {
        match state {
            MapperState::Uxrom { prg_bank } => {
                self.prg_bank = *prg_bank as usize % self.prg_banks;
                Ok(())
            }
            _ => Err(StateError::Mismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_switch() {
        let mut prg = vec![0u8; 4 * 0x4000];
        for (i, chunk) in prg.chunks_mut(0x4000).enumerate() {
            chunk[0] = i as u8;
        }
        let mut m = Uxrom::new(Mirroring::Vertical, 4, false);

        assert_eq!(m.read_prg(&prg, 0x8000), 0);
        assert_eq!(m.read_prg(&prg, 0xc000), 3);

        m.write_prg(&prg, 0x8000, 2);
        assert_eq!(m.read_prg(&prg, 0x8000), 2);
        // the last bank never moves
        assert_eq!(m.read_prg(&prg, 0xc000), 3);
    }

    #[test]
    fn test_bus_conflict_and() {
        let mut prg = vec![0u8; 4 * 0x4000];
        prg[0] = 0b0000_0001; // value on the ROM side at 0x8000
        let mut m = Uxrom::new(Mirroring::Vertical, 4, true);

        m.write_prg(&prg, 0x8000, 0b0000_0011);
        assert_eq!(m.save_state(), MapperState::Uxrom { prg_bank: 1 });
    }

    #[test]
    fn test_no_conflict_without_flag() {
        let mut prg = vec![0u8; 4 * 0x4000];
        prg[0] = 0b0000_0001;
        let mut m = Uxrom::new(Mirroring::Vertical, 4, false);

        m.write_prg(&prg, 0x8000, 0b0000_0011);
        assert_eq!(m.save_state(), MapperState::Uxrom { prg_bank: 3 });
    }
}
