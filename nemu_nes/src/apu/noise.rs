use bit_field::BitField;
use serde::{Deserialize, Serialize};

use super::units::{Envelope, LengthCounter};
use super::Channel;

const PERIOD: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Noise {
    len: LengthCounter,
    envelope: Envelope,

    period: u16,
    lfsr: u16,
    feedback_bit: usize,
    acc: f64,
}

impl Noise {
    pub fn new() -> Self {
        Self {
            len: LengthCounter::new(),
            envelope: Envelope::new(),

            period: PERIOD[0],
            lfsr: 1,
            feedback_bit: 1,
            acc: 0.0,
        }
    }

    /// run the LFSR for `dt` cpu cycles and report the current level
    pub fn sample(&mut self, dt: f64) -> u8 {
        self.acc += dt;
        let shifts = (self.acc / self.period as f64) as u32;
        self.acc -= shifts as f64 * self.period as f64;

        for _ in 0..shifts {
            let feed = self.lfsr.get_bit(0) ^ self.lfsr.get_bit(self.feedback_bit);
            self.lfsr >>= 1;
            self.lfsr.set_bit(14, feed);
        }

        if !self.len.active() || self.lfsr.get_bit(0) {
            0
        } else {
            self.envelope.volume()
        }
    }
}

impl Channel for Noise {
    fn write_reg0(&mut self, data: u8) {
        self.len.set_halt(data.get_bit(5));
        self.envelope.load(data.get_bits(0..6));
    }

    fn write_reg1(&mut self, _: u8) {}

    fn write_reg2(&mut self, data: u8) {
        // "mode" taps bit 6 instead of bit 1
        self.feedback_bit = data.get_bit(7) as usize * 5 + 1;
        self.period = PERIOD[data.get_bits(0..4) as usize];
    }

    fn write_reg3(&mut self, data: u8) {
        self.envelope.restart();
        self.len.load(data & 0xf8);
    }

    fn tick_quarter(&mut self) {
        self.envelope.tick();
    }

    fn tick_half(&mut self) {
        self.len.tick();
    }

    fn set_enable(&mut self, enable: bool) {
        self.len.set_enable(enable);
    }

    fn active(&self) -> bool {
        self.len.active()
    }
}
