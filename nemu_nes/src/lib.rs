#![allow(clippy::identity_op)]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod cpu;
pub mod nes;
pub mod ppu;
pub mod rom;

mod interrupt;
mod state;

pub use apu::Apu;
pub use bus::Bus;
pub use cart::{Cartridge, Mirroring};
pub use cpu::{Cpu, CpuConfig, CpuStatus, Halt};
pub use nes::Nes;
pub use ppu::Ppu;
pub use rom::{Rom, RomError};
pub use state::StateError;

/// NES NTSC
pub const MASTER_CLOCK: f64 = 2147_7272.0;

/// cpu frequency
pub const CPU_FREQUENCY: f64 = MASTER_CLOCK / 12.0;

/// visible screen size
pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
