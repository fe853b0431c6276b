use bit_field::BitField;
use serde::{Deserialize, Serialize};

use super::units::{Envelope, LengthCounter, Sweep};
use super::Channel;

const DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Square channel. The sequencer is a free-running phase accumulator at
/// f_cpu / (16 * (P + 1)); the waveform is evaluated once per output
/// sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    len: LengthCounter,
    envelope: Envelope,
    sweep: Sweep,

    period: u16,
    duty: usize,
    phase: f64,
}

impl Pulse {
    pub fn new(ones_complement: bool) -> Self {
        Self {
            len: LengthCounter::new(),
            envelope: Envelope::new(),
            sweep: Sweep::new(ones_complement),

            period: 0,
            duty: 0,
            phase: 0.0,
        }
    }

    /// waveform level after `dt` cpu cycles
    pub fn sample(&mut self, dt: f64) -> u8 {
        self.phase = (self.phase + dt / (16.0 * (self.period + 1) as f64)).fract();

        if !self.len.active() || self.period < 8 || self.sweep.muting(self.period) {
            return 0;
        }

        let step = (self.phase * 8.0) as usize % 8;
        DUTY[self.duty][step] * self.envelope.volume()
    }
}

impl Channel for Pulse {
    fn write_reg0(&mut self, data: u8) {
        self.duty = data.get_bits(6..8) as usize;
        self.len.set_halt(data.get_bit(5));
        self.envelope.load(data.get_bits(0..6));
    }

    fn write_reg1(&mut self, data: u8) {
        self.sweep.load(data);
    }

    fn write_reg2(&mut self, data: u8) {
        self.period.set_bits(0..8, data as u16);
    }

    fn write_reg3(&mut self, data: u8) {
        self.period.set_bits(8..11, data.get_bits(0..3) as u16);
        self.len.load(data & 0xf8);
        self.envelope.restart();
        self.phase = 0.0;
    }

    fn tick_quarter(&mut self) {
        self.envelope.tick();
    }

    fn tick_half(&mut self) {
        self.len.tick();
        self.sweep.tick(&mut self.period);
    }

    fn set_enable(&mut self, enable: bool) {
        self.len.set_enable(enable);
    }

    fn active(&self) -> bool {
        self.len.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_without_length() {
        let mut p = Pulse::new(true);
        p.write_reg0(0b0001_1111); // constant volume 15
        p.write_reg2(0x80);
        assert_eq!(p.sample(10.0), 0);
    }

    #[test]
    fn test_duty_sequence() {
        let mut p = Pulse::new(true);
        p.set_enable(true);
        p.write_reg0(0b1001_1111); // duty 2, constant volume 15
        p.write_reg2(0x7f); // period 0x7f
        p.write_reg3(0x00); // load length, reset phase

        // duty 2 is high for the first half of the cycle after step 0
        let cycle = 16.0 * 0x80 as f64;
        let mut highs = 0;
        for _ in 0..8 {
            if p.sample(cycle / 8.0) > 0 {
                highs += 1;
            }
        }
        assert_eq!(highs, 4);
    }

    #[test]
    fn test_ultrasonic_mute() {
        let mut p = Pulse::new(true);
        p.set_enable(true);
        p.write_reg0(0b0001_1111);
        p.write_reg2(0x07); // period < 8
        p.write_reg3(0x00);
        assert_eq!(p.sample(100.0), 0);
    }
}
