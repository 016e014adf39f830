//! Host clock to timer tick conversion.
//!
//! The timer only understands whole ticks. A [`Prescaler`] divides host clock
//! readings (milliseconds in the frontend) by a fixed period and carries the
//! remainder, the same way a hardware prescaler only lets every Nth input
//! clock through. Readings must be monotonic; a reading earlier than the
//! previous one produces no ticks.

#[derive(Debug, Clone)]
pub struct Prescaler {
    /// Host time units per timer tick; 0 stops the clock
    period: u64,
    /// Host time already converted into ticks
    consumed: u64,
}

impl Prescaler {
    pub fn new(period: u64) -> Self {
        Prescaler { period, consumed: 0 }
    }

    /// Restart at host time `now`.
    pub fn reset(&mut self, now: u64) {
        self.consumed = now;
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Whole ticks elapsed between the last consumed reading and `now`.
    pub fn elapsed_ticks(&mut self, now: u64) -> u64 {
        if self.period == 0 {
            return 0;
        }
        if now < self.consumed {
            log::warn!("clock went backwards: {} < {}", now, self.consumed);
            return 0;
        }
        let ticks = (now - self.consumed) / self.period;
        self.consumed += ticks * self.period;
        ticks
    }
}
