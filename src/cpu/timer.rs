/// CPU cycles per timer tick (the timer is clocked from the CPU clock / 1024).
pub const TIMER_PRESCALE: i32 = 1024;
pub const TIMER_CONTROL_START: u8 = 0x01;
const TIMER_RELOAD_MASK: u8 = 0x7F;

/// Free-running 7-bit countdown timer.
///
/// `load` is the period latched from the reload register, `value` the live
/// countdown, both in CPU cycles. The live value is only primed from `load`
/// on a stopped-to-running transition; afterwards every underflow adds one
/// period back and reports an interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Timer {
    pub enabled: bool,
    pub value: i32,
    pub load: i32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            enabled: false,
            value: 0,
            load: TIMER_PRESCALE,
        }
    }

    /// Latch a new period. The running countdown is left alone.
    pub fn write_reload(&mut self, value: u8) {
        self.load = ((value & TIMER_RELOAD_MASK) as i32 + 1) * TIMER_PRESCALE;
    }

    pub fn write_control(&mut self, value: u8) {
        let start = value & TIMER_CONTROL_START != 0;
        if start && !self.enabled {
            self.value = self.load;
        }
        self.enabled = start;
    }

    pub fn read_counter(&self) -> u8 {
        (((self.value - 1).max(0) / TIMER_PRESCALE) as u8) & TIMER_RELOAD_MASK
    }

    pub fn control(&self) -> u8 {
        if self.enabled { TIMER_CONTROL_START } else { 0 }
    }

    /// Advance by `cycles` CPU cycles. Returns the number of underflows.
    pub fn tick(&mut self, cycles: i32) -> u32 {
        if !self.enabled || cycles <= 0 {
            return 0;
        }
        // Widened: a full `i32` budget plus one period does not fit in `i32`.
        let remaining = self.value as i64 - cycles as i64;
        if remaining > 0 {
            self.value = remaining as i32;
            return 0;
        }
        let period = self.load.max(TIMER_PRESCALE) as i64;
        let fired = -remaining / period + 1;
        self.value = (remaining + fired * period) as i32;
        fired as u32
    }
}
