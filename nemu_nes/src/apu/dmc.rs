use bit_field::BitField;
use serde::{Deserialize, Serialize};

use super::Channel;

const RATE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// Delta modulation channel. Memory fetches go through the bus: the
/// channel posts an address, the console answers with `write_sample`
/// and stalls the CPU for the DMA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dmc {
    irq_on: bool,
    irq_flag: bool,
    looping: bool,

    sample_start: u16,
    sample_len: u16,
    address: u16,
    remaining: u16,
    request: Option<u16>,

    rate: u16,
    timer: u16,
    shifter: u8,
    bits_remaining: u8,

    output: u8,
}

impl Dmc {
    pub fn new() -> Self {
        Self {
            irq_on: false,
            irq_flag: false,
            looping: false,

            sample_start: 0xc000,
            sample_len: 1,
            address: 0,
            remaining: 0,
            request: None,

            rate: RATE[0],
            timer: RATE[0],
            shifter: 0,
            bits_remaining: 0,

            output: 0,
        }
    }

    /// advance one cpu cycle
    pub fn step(&mut self) {
        if self.remaining > 0 && self.bits_remaining == 0 && self.request.is_none() {
            self.request = Some(self.address);

            self.address = self.address.checked_add(1).unwrap_or(0x8000);
            self.remaining -= 1;

            if self.remaining == 0 {
                if self.looping {
                    self.restart();
                } else if self.irq_on {
                    self.irq_flag = true;
                }
            }
        }

        self.timer -= 1;
        if self.timer == 0 {
            self.timer = self.rate;

            if self.bits_remaining > 0 {
                if self.shifter.get_bit(0) {
                    if self.output <= 125 {
                        self.output += 2;
                    }
                } else if self.output >= 2 {
                    self.output -= 2;
                }

                self.shifter >>= 1;
                self.bits_remaining -= 1;
            }
        }
    }

    pub fn sample(&self) -> u8 {
        self.output
    }

    /// pending memory fetch, if any
    pub fn take_request(&mut self) -> Option<u16> {
        self.request.take()
    }

    /// the fetched byte arrives
    pub fn write_sample(&mut self, data: u8) {
        self.shifter = data;
        self.bits_remaining = 8;
    }

    pub fn irq(&self) -> bool {
        self.irq_flag
    }

    pub fn clear_irq(&mut self) {
        self.irq_flag = false;
    }

    fn restart(&mut self) {
        self.address = self.sample_start;
        self.remaining = self.sample_len;
    }
}

impl Channel for Dmc {
    fn write_reg0(&mut self, data: u8) {
        self.irq_on = data.get_bit(7);
        self.looping = data.get_bit(6);
        self.rate = RATE[data.get_bits(0..4) as usize];

        if !self.irq_on {
            self.irq_flag = false;
        }
    }

    fn write_reg1(&mut self, data: u8) {
        self.output = data & 0x7f;
    }

    fn write_reg2(&mut self, data: u8) {
        self.sample_start = 0xc000 + data as u16 * 64;
    }

    fn write_reg3(&mut self, data: u8) {
        self.sample_len = data as u16 * 16 + 1;
    }

    fn tick_quarter(&mut self) {}

    fn tick_half(&mut self) {}

    fn set_enable(&mut self, enable: bool) {
        if !enable {
            self.remaining = 0;
        } else if self.remaining == 0 {
            self.restart();
        }

        self.irq_flag = false;
    }

    fn active(&self) -> bool {
        self.remaining > 0
    }
}
