use bit_field::BitField;
use serde::{Deserialize, Serialize};

use super::units::LengthCounter;
use super::Channel;

const SEQ: [u8; 32] = [
    0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00,
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triangle {
    len: LengthCounter,

    period: u16,
    phase: f64,

    linear_len: u8,
    linear_counter: u8,
    linear_reload: bool,
    linear_control: bool,
}

impl Triangle {
    pub fn new() -> Self {
        Self {
            len: LengthCounter::new(),

            period: 0,
            phase: 0.0,

            linear_len: 0,
            linear_counter: 0,
            linear_reload: false,
            linear_control: false,
        }
    }

    /// waveform level after `dt` cpu cycles; holds its last level when
    /// gated so there is no pop
    pub fn sample(&mut self, dt: f64) -> u8 {
        // period < 2 is the ultrasonic cutoff
        if self.len.active() && self.linear_counter > 0 && self.period >= 2 {
            self.phase = (self.phase + dt / (32.0 * (self.period + 1) as f64)).fract();
        }
        SEQ[(self.phase * 32.0) as usize % 32]
    }
}

impl Channel for Triangle {
    fn write_reg0(&mut self, data: u8) {
        self.len.set_halt(data.get_bit(7));
        self.linear_control = data.get_bit(7);
        self.linear_len = data.get_bits(0..7);
    }

    fn write_reg1(&mut self, _: u8) {}

    fn write_reg2(&mut self, data: u8) {
        self.period.set_bits(0..8, data as u16);
    }

    fn write_reg3(&mut self, data: u8) {
        self.period.set_bits(8..11, data.get_bits(0..3) as u16);
        self.len.load(data & 0xf8);
        self.linear_reload = true;
    }

    fn tick_quarter(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_len;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }

        if !self.linear_control {
            self.linear_reload = false;
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sounding() -> Triangle {
        let mut t = Triangle::new();
        t.set_enable(true);
        t.write_reg0(0x7f); // linear length 127
        t.write_reg2(0x80);
        t.write_reg3(0x00); // length + linear reload
        t.tick_quarter(); // loads the linear counter
        t
    }

    #[test]
    fn test_sequence_advances() {
        let mut t = sounding();
        let step = 32.0 * 0x81 as f64 / 32.0;
        let first = t.sample(step);
        let second = t.sample(step);
        assert_ne!(first, second);
    }

    #[test]
    fn test_holds_level_when_gated() {
        let mut t = sounding();
        let level = t.sample(100.0);
        t.set_enable(false);
        assert_eq!(t.sample(1000.0), level);
    }

    #[test]
    fn test_ultrasonic_cutoff() {
        let mut t = sounding();
        t.write_reg2(0x01); // period 1
        let level = t.sample(10.0);
        assert_eq!(t.sample(10_000.0), level);
    }
}
