use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Divider {
    period: usize,
    counter: usize,
}

impl Divider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> bool {
        if self.counter > 0 {
            self.counter -= 1;
            false
        } else {
            self.counter = self.period;
            true
        }
    }

    pub fn reset(&mut self) {
        self.counter = self.period;
    }

    pub fn set_period(&mut self, period: usize) {
        self.period = period;
    }

    pub fn count(&self) -> usize {
        self.counter
    }
}
