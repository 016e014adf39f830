//! Edge-triggered input capture.
//!
//! Latches a timer counter value on the start edge and on the end edge of an
//! external pulse. The unit never reads the timer itself: whoever delivers
//! the edge also hands over the counter value to latch. Scheduling the end
//! edge (the pulse duration) is the caller's job.
//!
//! ```text
//!              start            end
//!  idle  ───────┐ capturing ─────┐ captured
//!               └────────────────┘
//! ```

/// Result of delivering an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The edge was latched.
    Latched,
    /// The edge arrived in the wrong state and was ignored.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureUnit {
    pulse_start: u16,
    pulse_end: u16,
    capturing: bool,
    captured: bool,
}

impl CaptureUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start edge. Ignored while a capture is already in progress.
    pub fn trigger_start(&mut self, counter: u16) -> Trigger {
        if self.capturing {
            log::debug!("capture start ignored: already capturing since {}", self.pulse_start);
            return Trigger::Ignored;
        }
        self.pulse_start = counter;
        self.capturing = true;
        self.captured = false;
        Trigger::Latched
    }

    /// End edge. Ignored unless a capture is in progress.
    pub fn trigger_end(&mut self, counter: u16) -> Trigger {
        if !self.capturing {
            log::debug!("capture end ignored: no capture in progress");
            return Trigger::Ignored;
        }
        self.pulse_end = counter;
        self.capturing = false;
        self.captured = true;
        Trigger::Latched
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// `pulse_end - pulse_start` in timer ticks, once a capture completed.
    ///
    /// Negative when the counter wrapped or matched between the two edges.
    pub fn pulse_width(&self) -> Option<i64> {
        self.captured.then(|| self.pulse_end as i64 - self.pulse_start as i64)
    }

    /// Counter value latched on the start edge, once a capture completed.
    pub fn captured_value(&self) -> Option<u16> {
        self.captured.then_some(self.pulse_start)
    }

    pub fn pulse_start(&self) -> u16 {
        self.pulse_start
    }

    pub fn pulse_end(&self) -> u16 {
        self.pulse_end
    }
}
