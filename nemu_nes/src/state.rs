use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apu::ApuState;
use crate::cart::CartState;
use crate::cpu::CpuState;
use crate::interrupt::Interrupts;
use crate::ppu::PpuState;

/// bumped whenever any device state layout changes
pub(crate) const STATE_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("save state payload is corrupt")]
    Corrupt,
    #[error("save state version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("save state does not match the loaded cartridge")]
    Mismatch,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct SaveState {
    pub version: u32,
    pub cpu: CpuState,
    pub ram: Vec<u8>,
    pub ppu: PpuState,
    pub apu: ApuState,
    pub cart: CartState,
    pub intr: Interrupts,
}

impl SaveState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        bincode::serialize(self).map_err(|_| StateError::Corrupt)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, StateError> {
        let state: SaveState = bincode::deserialize(data).map_err(|_| StateError::Corrupt)?;
        if state.version != STATE_VERSION {
            return Err(StateError::Version {
                found: state.version,
                expected: STATE_VERSION,
            });
        }
        Ok(state)
    }
}
