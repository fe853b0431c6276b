use bit_field::BitField;
use serde::{Deserialize, Serialize};

const FRAME_FREQUENCY: f64 = 240.0;
const FRAME_PERIOD: f64 = crate::CPU_FREQUENCY / FRAME_FREQUENCY;

// mode 0:    mode 1:       function
// ---------  -----------  -----------------------------
//  - - - f    - - - - -    IRQ (if bit 6 is clear)
//  - l - l    - l - - l    Length counter and sweep
//  e e e e    e e e - e    Envelope and linear counter

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Mode {
    Step4,
    Step5,
}

bitflags::bitflags! {
    pub struct Step: u8 {
        const LENGTH   = 0b01;
        const ENVELOPE = 0b10;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameCounter {
    counter: f64,
    step: usize,
    mode: Mode,
    irq_on: bool,
    irq_flag: bool,
    // a 0x4017 write lands 3-4 cpu cycles later
    pending: Option<(u8, u8)>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self {
            counter: FRAME_PERIOD,
            step: 0,
            mode: Mode::Step4,
            irq_on: true,
            irq_flag: false,
            pending: None,
        }
    }

    /// advance one cpu cycle; returns the units to clock this cycle
    pub fn tick(&mut self) -> Step {
        if let Some((data, delay)) = self.pending {
            if delay == 0 {
                self.pending = None;
                return self.apply(data);
            }
            self.pending = Some((data, delay - 1));
        }

        let mut step = Step::empty();

        self.counter -= 1.0;
        if self.counter < 1.0 {
            match self.mode {
                Mode::Step4 => {
                    self.step = (self.step + 1) % 4;
                    step.set(Step::LENGTH, self.step == 1 || self.step == 3);
                    step.set(Step::ENVELOPE, true);
                    if self.irq_on && self.step == 3 {
                        self.irq_flag = true;
                    }
                }
                Mode::Step5 => {
                    self.step = (self.step + 1) % 5;
                    step.set(Step::LENGTH, self.step == 1 || self.step == 4);
                    step.set(Step::ENVELOPE, self.step != 3);
                }
            }

            self.counter += FRAME_PERIOD;
        }

        step
    }

    /// 0x4017 write; `delay` is 3 or 4 depending on cpu cycle parity
    pub fn load(&mut self, data: u8, delay: u8) {
        self.pending = Some((data, delay));
        if data.get_bit(6) {
            self.irq_flag = false;
        }
    }

    fn apply(&mut self, data: u8) -> Step {
        self.step = 0;
        self.counter = FRAME_PERIOD;

        self.mode = if data.get_bit(7) {
            Mode::Step5
        } else {
            Mode::Step4
        };
        self.irq_on = !data.get_bit(6);

        if self.mode == Mode::Step5 {
            // an immediate quarter + half clock
            Step::LENGTH | Step::ENVELOPE
        } else {
            Step::empty()
        }
    }

    pub fn irq(&self) -> bool {
        self.irq_flag
    }

    pub fn clear_irq(&mut self) {
        self.irq_flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_step_irq() {
        let mut frame = FrameCounter::new();
        let mut steps = 0;
        for _ in 0..(FRAME_PERIOD as usize + 1) * 4 {
            let s = frame.tick();
            if !s.is_empty() {
                steps += 1;
            }
        }
        assert_eq!(steps, 4);
        assert!(frame.irq());
        frame.clear_irq();
        assert!(!frame.irq());
    }

    #[test]
    fn test_write_applies_after_delay() {
        let mut frame = FrameCounter::new();
        frame.load(0x80, 3);
        assert!(frame.tick().is_empty());
        assert!(frame.tick().is_empty());
        assert!(frame.tick().is_empty());
        // 5-step mode clocks everything on apply
        assert_eq!(frame.tick(), Step::LENGTH | Step::ENVELOPE);
    }

    #[test]
    fn test_inhibit_clears_irq() {
        let mut frame = FrameCounter::new();
        for _ in 0..(FRAME_PERIOD as usize + 1) * 4 {
            frame.tick();
        }
        assert!(frame.irq());
        frame.load(0x40, 3);
        assert!(!frame.irq());
    }

    #[test]
    fn test_five_step_has_no_irq() {
        let mut frame = FrameCounter::new();
        frame.load(0x80, 0);
        frame.tick();
        for _ in 0..(FRAME_PERIOD as usize + 1) * 5 {
            frame.tick();
        }
        assert!(!frame.irq());
    }
}
