use super::Divider;
use bit_field::BitField;
use serde::{Deserialize, Serialize};

/// Pulse-channel frequency shifter. Retargets continuously so the mute
/// decision tracks the current period, applies on divider expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sweep {
    divider: Divider,
    enabled: bool,
    negate: bool,
    shift: u8,
    target: u16,
    reload: bool,
    // pulse 1 negates in one's complement: an extra -1
    ones_complement: bool,
    muting: bool,
}

impl Sweep {
    pub fn new(ones_complement: bool) -> Self {
        Self {
            divider: Divider::new(),
            enabled: false,
            negate: false,
            shift: 0,
            target: 0,
            reload: false,
            ones_complement,
            muting: false,
        }
    }

    /// half-frame clock; adjusts the channel period in place
    pub fn tick(&mut self, period: &mut u16) {
        self.retarget(*period);

        if self.divider.count() == 0 && self.enabled && self.shift > 0 && !self.muting {
            *period = self.target;
        }

        if self.divider.count() == 0 || self.reload {
            self.reload = false;
            self.divider.reset();
        } else {
            self.divider.tick();
        }

        self.retarget(*period);
    }

    fn retarget(&mut self, period: u16) {
        let delta = period >> self.shift;
        self.target = if self.negate {
            period.saturating_sub(delta + self.ones_complement as u16)
        } else {
            period + delta
        };

        self.muting = period < 8 || self.target > 0x7ff;
    }

    pub fn load(&mut self, data: u8) {
        self.enabled = data.get_bit(7);
        self.divider.set_period(data.get_bits(4..7) as usize);
        self.negate = data.get_bit(3);
        self.shift = data.get_bits(0..3);

        self.reload = true;
    }

    /// whether the channel is silenced by the sweep rules
    pub fn muting(&mut self, period: u16) -> bool {
        self.retarget(period);
        self.muting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mute_below_8() {
        let mut sweep = Sweep::new(false);
        assert!(sweep.muting(7));
        assert!(!sweep.muting(8));
    }

    #[test]
    fn test_mute_on_target_overflow() {
        let mut sweep = Sweep::new(false);
        sweep.load(0b1000_0001); // enabled, shift 1
        assert!(sweep.muting(0x600)); // target 0x900 > 0x7ff
        assert!(!sweep.muting(0x400));
    }

    #[test]
    fn test_sweep_raises_period() {
        let mut sweep = Sweep::new(false);
        sweep.load(0b1000_0001); // enabled, period 0, shift 1, add
        let mut period = 0x100;
        sweep.tick(&mut period);
        assert_eq!(period, 0x180);
    }

    #[test]
    fn test_pulse1_extra_decrement() {
        let mut sweep1 = Sweep::new(true);
        let mut sweep2 = Sweep::new(false);
        sweep1.load(0b1000_1001); // negate, shift 1
        sweep2.load(0b1000_1001);

        let mut p1 = 0x100;
        let mut p2 = 0x100;
        sweep1.tick(&mut p1);
        sweep2.tick(&mut p2);
        assert_eq!(p2, 0x080);
        assert_eq!(p1, 0x07f);
    }
}
