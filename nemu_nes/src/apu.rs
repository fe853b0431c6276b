use bit_field::BitField;
use serde::{Deserialize, Serialize};

mod dmc;
mod noise;
mod pulse;
mod ring;
mod triangle;
mod units;

use dmc::Dmc;
use noise::Noise;
use pulse::Pulse;
use ring::{RingState, SampleRing};
use triangle::Triangle;
use units::{FrameCounter, Step};

/// ring occupancy the adaptive rate steers toward
const TARGET_OCCUPANCY: f64 = 2400.0;
/// how often the rate servo runs, in pushed samples
const ADJUST_INTERVAL: u64 = 1024;
/// largest relative rate correction per adjustment
const ADJUST_LIMIT: f64 = 0.005;

const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

lazy_static::lazy_static! {
    /// pulse mix for the 31 possible pulse1 + pulse2 levels
    static ref PULSE_TABLE: [f32; 31] = {
        let mut table = [0.0f32; 31];
        table.iter_mut().enumerate().skip(1).for_each(|(n, t)| {
            *t = 95.88 / (8128.0 / n as f32 + 100.0);
        });
        table
    };
}

trait Channel {
    fn write_reg0(&mut self, data: u8);
    fn write_reg1(&mut self, data: u8);
    fn write_reg2(&mut self, data: u8);
    fn write_reg3(&mut self, data: u8);

    fn tick_quarter(&mut self);
    fn tick_half(&mut self);

    fn set_enable(&mut self, enable: bool);
    fn active(&self) -> bool;
}

pub struct Apu {
    frame: FrameCounter,
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,

    ring: SampleRing,
    base_rate: f64,
    samples_per_cycle: f64,
    samples_required: f64,
    cycles_since_sample: u32,
    pushed: u64,

    master_volume: f32,
    channel_ctrl: [u8; 5],

    cycles: u64,
}

impl Default for Apu {
    fn default() -> Self {
        Self {
            frame: FrameCounter::new(),
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),

            ring: SampleRing::default(),
            base_rate: DEFAULT_SAMPLE_RATE,
            samples_per_cycle: DEFAULT_SAMPLE_RATE / crate::CPU_FREQUENCY,
            samples_required: 0.0,
            cycles_since_sample: 0,
            pushed: 0,

            master_volume: 1.0,
            channel_ctrl: [1u8; 5],

            cycles: 0,
        }
    }
}

impl Apu {
    /// advance `cycles` cpu cycles
    pub fn run(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.cycles += 1;

            let step = self.frame.tick();
            if !step.is_empty() {
                self.frame_tick(step);
            }

            self.dmc.step();

            self.samples_required += self.samples_per_cycle;
            self.cycles_since_sample += 1;
            if self.samples_required >= 1.0 {
                self.samples_required -= 1.0;
                self.generate_sample();
            }
        }
    }

    fn frame_tick(&mut self, step: Step) {
        if step.contains(Step::ENVELOPE) {
            self.pulse1.tick_quarter();
            self.pulse2.tick_quarter();
            self.triangle.tick_quarter();
            self.noise.tick_quarter();
        }
        if step.contains(Step::LENGTH) {
            self.pulse1.tick_half();
            self.pulse2.tick_half();
            self.triangle.tick_half();
            self.noise.tick_half();
        }
    }

    fn generate_sample(&mut self) {
        let dt = self.cycles_since_sample as f64;
        self.cycles_since_sample = 0;

        let p1 = self.pulse1.sample(dt) * self.channel_ctrl[0];
        let p2 = self.pulse2.sample(dt) * self.channel_ctrl[1];
        let t = self.triangle.sample(dt) * self.channel_ctrl[2];
        let n = self.noise.sample(dt) * self.channel_ctrl[3];
        let d = self.dmc.sample() * self.channel_ctrl[4];

        let pulse_out = PULSE_TABLE[(p1 + p2) as usize];
        let tnd = t as f32 / 8227.0 + n as f32 / 12241.0 + d as f32 / 22638.0;
        let tnd_out = if tnd > 0.0 {
            159.79 / (1.0 / tnd + 100.0)
        } else {
            0.0
        };

        let sample = (pulse_out + tnd_out) * self.master_volume * 32768.0;
        self.ring
            .push(sample.clamp(i16::MIN as f32, i16::MAX as f32) as i16);

        self.pushed += 1;
        if self.pushed % ADJUST_INTERVAL == 0 {
            self.adjust_rate();
        }
    }

    /// nudge the effective rate to keep the ring near the target
    fn adjust_rate(&mut self) {
        let error = (TARGET_OCCUPANCY - self.ring.len() as f64) / TARGET_OCCUPANCY;
        let factor = 1.0 + error.clamp(-1.0, 1.0) * ADJUST_LIMIT;
        self.samples_per_cycle = self.base_rate * factor / crate::CPU_FREQUENCY;
    }

    pub fn read_status(&mut self) -> u8 {
        let mut data = 0u8;
        data.set_bit(7, self.dmc.irq());
        data.set_bit(6, self.frame.irq());
        data.set_bit(4, self.dmc.active());
        data.set_bit(3, self.noise.active());
        data.set_bit(2, self.triangle.active());
        data.set_bit(1, self.pulse2.active());
        data.set_bit(0, self.pulse1.active());
        // reading acknowledges the frame interrupt
        self.frame.clear_irq();
        data
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_reg0(data),
            0x4001 => self.pulse1.write_reg1(data),
            0x4002 => self.pulse1.write_reg2(data),
            0x4003 => self.pulse1.write_reg3(data),

            0x4004 => self.pulse2.write_reg0(data),
            0x4005 => self.pulse2.write_reg1(data),
            0x4006 => self.pulse2.write_reg2(data),
            0x4007 => self.pulse2.write_reg3(data),

            0x4008 => self.triangle.write_reg0(data),
            0x4009 => self.triangle.write_reg1(data),
            0x400a => self.triangle.write_reg2(data),
            0x400b => self.triangle.write_reg3(data),

            0x400c => self.noise.write_reg0(data),
            0x400d => self.noise.write_reg1(data),
            0x400e => self.noise.write_reg2(data),
            0x400f => self.noise.write_reg3(data),

            0x4010 => self.dmc.write_reg0(data),
            0x4011 => self.dmc.write_reg1(data),
            0x4012 => self.dmc.write_reg2(data),
            0x4013 => self.dmc.write_reg3(data),

            0x4015 => {
                self.dmc.set_enable(data.get_bit(4));
                self.noise.set_enable(data.get_bit(3));
                self.triangle.set_enable(data.get_bit(2));
                self.pulse2.set_enable(data.get_bit(1));
                self.pulse1.set_enable(data.get_bit(0));
            }
            0x4017 => {
                let delay = 3 + (self.cycles & 1) as u8;
                self.frame.load(data, delay);
            }
            _ => {}
        }
    }

    pub(crate) fn irq(&self) -> bool {
        self.frame.irq() || self.dmc.irq()
    }

    pub(crate) fn dmc_request(&mut self) -> Option<u16> {
        self.dmc.take_request()
    }

    pub(crate) fn dmc_response(&mut self, data: u8) {
        self.dmc.write_sample(data);
    }

    /// drain up to `out.len()` samples from the ring
    pub fn read_samples(&mut self, out: &mut [i16]) -> usize {
        self.ring.pop_into(out)
    }

    pub fn samples_available(&self) -> usize {
        self.ring.len()
    }

    pub fn set_sample_rate(&mut self, rate: u32) {
        self.base_rate = rate as f64;
        self.samples_per_cycle = self.base_rate / crate::CPU_FREQUENCY;
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 2.0);
    }

    /// per-channel mute switches, mixer-side
    pub fn set_channels(&mut self, states: &[bool; 5]) {
        for (ctrl, &on) in self.channel_ctrl.iter_mut().zip(states) {
            *ctrl = on as u8;
        }
    }

    pub fn reset(&mut self) {
        self.write(0x4015, 0x00);
        self.frame = FrameCounter::new();
        self.ring.clear();
        self.samples_required = 0.0;
        self.cycles_since_sample = 0;
    }
}

impl Apu {
    pub(crate) fn save_state(&self) -> ApuState {
        ApuState {
            frame: self.frame.clone(),
            pulse1: self.pulse1.clone(),
            pulse2: self.pulse2.clone(),
            triangle: self.triangle.clone(),
            noise: self.noise.clone(),
            dmc: self.dmc.clone(),
            ring: self.ring.save_state(),
            samples_required: self.samples_required,
            cycles_since_sample: self.cycles_since_sample,
            pushed: self.pushed,
            cycles: self.cycles,
        }
    }

    pub(crate) fn load_state(&mut self, state: &ApuState) {
        self.frame = state.frame.clone();
        self.pulse1 = state.pulse1.clone();
        self.pulse2 = state.pulse2.clone();
        self.triangle = state.triangle.clone();
        self.noise = state.noise.clone();
        self.dmc = state.dmc.clone();
        self.ring.load_state(&state.ring);
        self.samples_required = state.samples_required;
        self.cycles_since_sample = state.cycles_since_sample;
        self.pushed = state.pushed;
        self.cycles = state.cycles;
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ApuState {
    frame: FrameCounter,
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    ring: RingState,
    samples_required: f64,
    cycles_since_sample: u32,
    pushed: u64,
    cycles: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tracks_pulse1_length() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0b0000_0001);
        apu.write(0x4000, 0b0001_1111); // constant volume, no halt
        apu.write(0x4003, 0x18); // length index 3 -> 2

        assert_eq!(apu.read_status() & 1, 1);

        // two half-frame clocks empty the counter
        apu.run(40_000);
        assert_eq!(apu.read_status() & 1, 0);
    }

    #[test]
    fn test_disable_silences_channel() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0b0000_0001);
        apu.write(0x4003, 0x18);
        assert_eq!(apu.read_status() & 1, 1);
        apu.write(0x4015, 0);
        assert_eq!(apu.read_status() & 1, 0);
    }

    #[test]
    fn test_frame_irq_raised_and_acknowledged() {
        let mut apu = Apu::default();
        // 4-step mode, irq enabled is the power-on state; one frame is
        // four quarter periods
        apu.run(30_000);
        assert!(apu.irq());

        let status = apu.read_status();
        assert!(status.get_bit(6));
        assert!(!apu.irq());
    }

    #[test]
    fn test_irq_inhibit() {
        let mut apu = Apu::default();
        apu.write(0x4017, 0x40);
        apu.run(60_000);
        assert!(!apu.irq());
    }

    #[test]
    fn test_sample_generation_rate() {
        let mut apu = Apu::default();
        apu.set_sample_rate(48_000);
        // one video frame's worth of cpu cycles
        apu.run(29_780);
        let expected = 29_780.0 * 48_000.0 / crate::CPU_FREQUENCY;
        let got = apu.samples_available() as f64;
        assert!((got - expected).abs() < 2.0, "{} vs {}", got, expected);
    }

    #[test]
    fn test_silence_mixes_to_zero() {
        let mut apu = Apu::default();
        apu.run(2_000);
        let mut out = [1i16; 16];
        let n = apu.read_samples(&mut out);
        assert!(n > 0);
        assert!(out[..n].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_pulse_produces_signal() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0b0000_0001);
        apu.write(0x4000, 0b1011_1111); // duty 2, halt, constant 15
        apu.write(0x4002, 0xfd); // period 253: audible
        apu.write(0x4003, 0x08);

        apu.run(29_780);
        let mut out = [0i16; 512];
        let n = apu.read_samples(&mut out);
        assert!(out[..n].iter().any(|&s| s > 0));
    }

    #[test]
    fn test_channel_switch_mutes_mixer() {
        let mut apu = Apu::default();
        apu.set_channels(&[false, true, true, true, true]);
        apu.write(0x4015, 0b0000_0001);
        apu.write(0x4000, 0b1011_1111);
        apu.write(0x4002, 0xfd);
        apu.write(0x4003, 0x08);

        apu.run(29_780);
        let mut out = [0i16; 512];
        let n = apu.read_samples(&mut out);
        assert!(out[..n].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_dmc_fetch_request_surfaces() {
        let mut apu = Apu::default();
        apu.write(0x4012, 0x00);
        apu.write(0x4013, 0x01);
        apu.write(0x4015, 0b0001_0000);
        apu.run(1);
        assert_eq!(apu.dmc_request(), Some(0xc000));
        apu.dmc_response(0xaa);
        assert!(apu.read_status().get_bit(4));
    }
}
