use bit_field::BitField;
use thiserror::Error;

use crate::cart::Mirroring;

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_BANK_SIZE: usize = 0x4000;
const CHR_BANK_SIZE: usize = 0x2000;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("not an iNES image (bad magic)")]
    BadMagic,
    #[error("iNES 2.0 images are not supported")]
    Ines2,
    #[error("image truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unsupported mapper {0:03}")]
    UnsupportedMapper(u8),
    #[error("invalid PRG ROM geometry for mapper {mapper:03}: {banks} * 16KB")]
    InvalidPrgSize { mapper: u8, banks: usize },
    #[error("invalid PRG RAM size: {0} bytes")]
    InvalidPrgRam(usize),
}

/// A parsed and validated iNES v1 image.
///
/// Parsing is all-or-nothing: a `Rom` that exists is one the rest of the
/// system can consume without further size checks.
pub struct Rom {
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub prg_ram_size: usize,
    /// emulate discrete-logic bus conflicts (UxROM). An iNES v1 header
    /// cannot express this, so it starts off; hosts opt in for boards
    /// known to have them.
    pub bus_conflicts: bool,
}

impl Rom {
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_SIZE || data[..4] != [b'N', b'E', b'S', 0x1a] {
            return Err(RomError::BadMagic);
        }
        if data[7] & 0b1100 == 0b1000 {
            return Err(RomError::Ines2);
        }

        let f6 = data[6];
        let battery = f6.get_bit(1);
        let trainer = f6.get_bit(2);
        let mirroring = if f6.get_bit(3) {
            Mirroring::FourScreen
        } else if f6.get_bit(0) {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let mapper = (data[7] & 0xf0) | (f6 >> 4);
        let prg_banks = data[4] as usize;
        let chr_banks = data[5] as usize;
        // byte 8 is the PRG RAM size in 8KB units; zero means one unit
        let prg_ram_size = data[8].max(1) as usize * 0x2000;

        let expected = HEADER_SIZE
            + trainer as usize * TRAINER_SIZE
            + prg_banks * PRG_BANK_SIZE
            + chr_banks * CHR_BANK_SIZE;
        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        check_geometry(mapper, prg_banks)?;
        if prg_ram_size > 0x4000 {
            return Err(RomError::InvalidPrgRam(prg_ram_size));
        }

        let offset = HEADER_SIZE + trainer as usize * TRAINER_SIZE;
        let prg = data[offset..][..prg_banks * PRG_BANK_SIZE].to_vec();
        let chr = data[offset + prg.len()..][..chr_banks * CHR_BANK_SIZE].to_vec();

        log::info!(
            "rom: mapper {:03}, {} * 16KB PRG, {} * 8KB CHR{}, {:?}{}",
            mapper,
            prg_banks,
            chr_banks,
            if chr.is_empty() { " (RAM)" } else { "" },
            mirroring,
            if battery { ", battery" } else { "" },
        );

        Ok(Self {
            prg,
            chr,
            mapper,
            mirroring,
            battery,
            prg_ram_size,
            bus_conflicts: false,
        })
    }

    pub fn chr_is_ram(&self) -> bool {
        self.chr.is_empty()
    }
}

fn check_geometry(mapper: u8, prg_banks: usize) -> Result<(), RomError> {
    let ok = match mapper {
        0 => prg_banks == 1 || prg_banks == 2,
        1 => (1..=16).contains(&prg_banks),
        2 => (1..=16).contains(&prg_banks),
        4 => (1..=32).contains(&prg_banks),
        _ => return Err(RomError::UnsupportedMapper(mapper)),
    };
    if ok {
        Ok(())
    } else {
        Err(RomError::InvalidPrgSize {
            mapper,
            banks: prg_banks,
        })
    }
}

#[cfg(test)]
pub(crate) fn build_ines(mapper: u8, prg_banks: usize, chr_banks: usize, flags6: u8) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_SIZE];
    data[..4].copy_from_slice(b"NES\x1a");
    data[4] = prg_banks as u8;
    data[5] = chr_banks as u8;
    data[6] = flags6 | (mapper << 4);
    data[7] = mapper & 0xf0;
    data.resize(
        HEADER_SIZE + prg_banks * PRG_BANK_SIZE + chr_banks * CHR_BANK_SIZE,
        0,
    );
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_bad_magic() {
        assert!(matches!(Rom::parse(b"NOPE"), Err(RomError::BadMagic)));
        let mut data = build_ines(0, 1, 1, 0);
        data[3] = 0;
        assert!(matches!(Rom::parse(&data), Err(RomError::BadMagic)));
    }

    #[test]
    fn test_reject_truncated() {
        let mut data = build_ines(0, 2, 1, 0);
        data.truncate(data.len() - 1);
        assert!(matches!(Rom::parse(&data), Err(RomError::Truncated { .. })));
    }

    #[test]
    fn test_reject_unsupported_mapper() {
        let data = build_ines(5, 2, 1, 0);
        assert!(matches!(
            Rom::parse(&data),
            Err(RomError::UnsupportedMapper(5))
        ));
    }

    #[test]
    fn test_parse_fields() {
        let data = build_ines(1, 4, 0, 0b0011);
        let rom = Rom::parse(&data).unwrap();
        assert_eq!(rom.mapper, 1);
        assert_eq!(rom.prg.len(), 4 * 0x4000);
        assert!(rom.chr_is_ram());
        assert!(rom.battery);
        assert_eq!(rom.mirroring, Mirroring::Vertical);
        assert_eq!(rom.prg_ram_size, 0x2000);
        assert!(!rom.bus_conflicts);
    }

    #[test]
    fn test_nrom_geometry() {
        let data = build_ines(0, 3, 1, 0);
        assert!(matches!(
            Rom::parse(&data),
            Err(RomError::InvalidPrgSize { mapper: 0, banks: 3 })
        ));
    }
}
