use crate::bus::Bus;
use crate::cart::Cartridge;
use crate::cpu::{Cpu, CpuConfig, Halt};
use crate::interrupt::DmaKind;
use crate::rom::Rom;
use crate::state::{SaveState, StateError, STATE_VERSION};

/// The console: CPU plus everything hanging off the bus. One call to
/// [`Nes::run_frame`] emulates until the next vblank starts.
pub struct Nes {
    cpu: Cpu,
    bus: Bus,
    audio_buf: Vec<i16>,
}

impl Nes {
    pub fn new(rom: Rom) -> Self {
        Self::with_config(rom, CpuConfig::default())
    }

    pub fn with_config(rom: Rom, config: CpuConfig) -> Self {
        let mut bus = Bus::new(Cartridge::new(rom));
        let mut cpu = Cpu::with_config(config);
        cpu.reset(&mut bus);
        Self {
            cpu,
            bus,
            audio_buf: Vec::new(),
        }
    }

    /// service one interrupt, DMA pause, or instruction, then let the
    /// PPU and APU catch up
    pub fn step(&mut self) {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.cpu.trace(&self.bus));
        }

        let bus = &mut self.bus;
        let (cycles, oam_window) = if bus.intr.nmi {
            bus.intr.nmi = false;
            (self.cpu.trigger_nmi(bus), false)
        } else if bus.intr.irq {
            let cycles = self.cpu.trigger_irq(bus);
            if cycles > 0 {
                bus.intr.irq = false;
                (cycles, false)
            } else {
                // masked; leave the level pending and keep executing
                (self.cpu.step(bus), false)
            }
        } else if let Some((kind, count)) = bus.intr.dma.take() {
            let in_oam = kind == DmaKind::Oam || kind == DmaKind::DmcDuringOam;
            (self.cpu.dma_pause(kind, count), in_oam)
        } else {
            (self.cpu.step(bus), false)
        };

        self.bus.run_devices(cycles, oam_window);
    }

    /// run until vblank starts and hand out the finished frame
    /// (256 * 240 packed 0x00RRGGBB)
    pub fn run_frame(&mut self, controller1: u8, controller2: u8) -> &[u32] {
        self.bus.set_buttons(controller1, controller2);
        loop {
            self.step();
            if self.bus.ppu_mut().take_frame_done() {
                break;
            }
        }
        self.bus.ppu().frame()
    }

    /// drain up to `max_samples` from the audio ring; may return fewer
    pub fn get_audio(&mut self, max_samples: usize) -> &[i16] {
        let want = max_samples.min(self.bus.apu().samples_available());
        self.audio_buf.resize(want, 0);
        let n = self.bus.apu_mut().read_samples(&mut self.audio_buf);
        &self.audio_buf[..n]
    }

    pub fn set_sample_rate(&mut self, rate: u32) {
        self.bus.apu_mut().set_sample_rate(rate);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.bus.apu_mut().set_master_volume(volume);
    }

    pub fn set_channels(&mut self, states: &[bool; 5]) {
        self.bus.apu_mut().set_channels(states);
    }

    /// a fatal CPU condition, if one happened since the last reset
    pub fn halt(&self) -> Option<Halt> {
        self.cpu.halt()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        SaveState {
            version: STATE_VERSION,
            cpu: self.cpu.save_state(),
            ram: self.bus.ram().to_vec(),
            ppu: self.bus.ppu().save_state(),
            apu: self.bus.apu().save_state(),
            cart: self.bus.cart().save_state(),
            intr: self.bus.intr.clone(),
        }
        .to_bytes()
    }

    pub fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        let state = SaveState::from_bytes(data)?;

        self.bus.cart_mut().load_state(&state.cart)?;
        if !self.bus.load_ram(&state.ram) || !self.bus.ppu_mut().load_state(&state.ppu) {
            return Err(StateError::Mismatch);
        }
        self.cpu.load_state(&state.cpu);
        self.bus.apu_mut().load_state(&state.apu);
        self.bus.intr = state.intr;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::build_ines;
    use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

    /// NROM image: `program` at 0xc000 (16KB bank, mirrored at 0x8000),
    /// reset vector 0xc000
    fn nes_with(program: &[u8]) -> Nes {
        let mut data = build_ines(0, 1, 1, 0);
        data[16..16 + program.len()].copy_from_slice(program);
        data[16 + 0x3ffc] = 0x00;
        data[16 + 0x3ffd] = 0xc0;
        Nes::new(Rom::parse(&data).unwrap())
    }

    /// enables rendering, then spins
    fn spinning_nes() -> Nes {
        nes_with(&[
            0xa9, 0x1e, // LDA #$1e
            0x8d, 0x01, 0x20, // STA $2001
            0x4c, 0x05, 0xc0, // JMP self
        ])
    }

    #[test]
    fn test_jmp_loop_holds_pc() {
        let mut nes = nes_with(&[0x4c, 0x00, 0xc0]);
        for _ in 0..16 {
            let before = nes.cpu().cycles();
            nes.step();
            assert_eq!(nes.cpu().status().pc, 0xc000);
            assert_eq!(nes.cpu().cycles() - before, 3);
        }
    }

    #[test]
    fn test_frame_is_fullscreen() {
        let mut nes = spinning_nes();
        let frame = nes.run_frame(0, 0);
        assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    }

    #[test]
    fn test_cycles_between_vblanks() {
        let mut nes = spinning_nes();
        nes.run_frame(0, 0);

        for _ in 0..4 {
            let before = nes.cpu().cycles();
            nes.run_frame(0, 0);
            let delta = nes.cpu().cycles() - before;
            // 341 * 262 / 3 cpu cycles, one dot short every other frame,
            // quantized to instruction boundaries
            assert!(
                (29776..=29785).contains(&delta),
                "frame took {} cycles",
                delta
            );
        }
    }

    #[test]
    fn test_oam_dma_cost_and_copy() {
        // fill 0x0200.. with x, then kick DMA from page 2
        let mut nes = nes_with(&[
            0xa2, 0x00, // LDX #$00
            0x8a, // TXA
            0x9d, 0x00, 0x02, // STA $0200,X
            0xe8, // INX
            0xd0, 0xf9, // BNE loop
            0xa9, 0x02, // LDA #$02
            0x8d, 0x14, 0x40, // STA $4014
            0x4c, 0x0e, 0xc0, // JMP self
        ]);

        // run until the DMA pause has been serviced
        while nes.bus.intr.dma.is_none() {
            nes.step();
        }
        let before = nes.cpu().cycles();
        let parity = before & 1;
        nes.step();
        assert_eq!(nes.cpu().cycles() - before, 513 + parity as u64);

        for i in 0..256u16 {
            nes.bus.write(0x2003, i as u8);
            assert_eq!(nes.bus.read(0x2004), i as u8);
        }
    }

    #[test]
    fn test_save_state_roundtrip_is_bit_identical() {
        let mut nes = spinning_nes();
        for _ in 0..3 {
            nes.run_frame(0, 0);
        }

        let snapshot = nes.save_state().unwrap();

        let mut replay = spinning_nes();
        replay.load_state(&snapshot).unwrap();

        let a: Vec<u32> = nes.run_frame(0, 0).to_vec();
        let b: Vec<u32> = replay.run_frame(0, 0).to_vec();
        assert_eq!(a, b);
        assert_eq!(nes.cpu().cycles(), replay.cpu().cycles());
        assert_eq!(nes.cpu().status().pc, replay.cpu().status().pc);
    }

    #[test]
    fn test_load_state_rejects_garbage() {
        let mut nes = spinning_nes();
        assert!(nes.load_state(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_reset_restores_boot_state() {
        let mut nes = spinning_nes();
        nes.run_frame(0, 0);
        nes.reset();
        assert_eq!(nes.cpu().status().pc, 0xc000);
        assert_eq!(nes.cpu().cycles(), 7);
        assert_eq!(nes.halt(), None);
    }

    #[test]
    fn test_audio_flows_while_running() {
        let mut nes = spinning_nes();
        nes.set_sample_rate(48_000);
        nes.run_frame(0, 0);
        // ~800 samples per frame at 48kHz
        let samples = nes.get_audio(4096);
        assert!((700..=900).contains(&samples.len()), "{}", samples.len());
    }

    #[test]
    fn test_kil_surfaces_and_machine_survives() {
        let mut nes = nes_with(&[0x02]);
        nes.run_frame(0, 0);
        assert_eq!(nes.halt(), Some(Halt::Kil));
    }
}
