//! Free-running 16-bit match timer.
//!
//! The counter is advanced by whole ticks. When an advance lands exactly on
//! the configured match value the timer raises one match event, bumps
//! `match_count` and clears the counter. An advance that would run past the
//! ceiling (`0xFFFF`) wraps the counter to zero and counts an overflow
//! instead; no match is raised for it.
//!
//! Matching is exact equality. A single advance that jumps over the match
//! value misses it, so callers that need every match should advance one tick
//! at a time.

use crate::TIMER_CEILING;

/// A match ("interrupt") raised by [`Timer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchEvent {
    /// `match_count` after this event
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct Timer {
    counter: u16,
    match_value: u16,
    match_count: u32,
    overflow_count: u32,
    running: bool,
    // set by the advance that matched, cleared by the next advance
    interrupt: bool,
}

impl Timer {
    /// Create a running timer with the given match value.
    pub fn new(match_value: u16) -> Self {
        Timer {
            counter: 0,
            match_value,
            match_count: 0,
            overflow_count: 0,
            running: true,
            interrupt: false,
        }
    }

    /// Clear the counter and event counts. The match value and run state are kept.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.match_count = 0;
        self.overflow_count = 0;
        self.interrupt = false;
    }

    /// Set the match threshold; takes effect on the next advance.
    /// A value of 0 never matches.
    pub fn configure_match(&mut self, value: u16) {
        log::debug!("timer match value {} -> {}", self.match_value, value);
        self.match_value = value;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance the counter by `elapsed` ticks.
    pub fn advance(&mut self, elapsed: u64) -> Option<MatchEvent> {
        if !self.running || elapsed == 0 {
            return None;
        }
        self.interrupt = false;

        let next = (self.counter as u64).saturating_add(elapsed);
        if self.match_value != 0 && next == self.match_value as u64 {
            self.match_count += 1;
            self.counter = 0;
            self.interrupt = true;
            log::debug!("timer match #{} at {}", self.match_count, self.match_value);
            return Some(MatchEvent { count: self.match_count });
        }
        if next > TIMER_CEILING as u64 {
            self.overflow_count += 1;
            self.counter = 0;
            log::trace!("timer overflow #{}", self.overflow_count);
        } else {
            self.counter = next as u16;
        }
        None
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn match_value(&self) -> u16 {
        self.match_value
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn overflow_count(&self) -> u32 {
        self.overflow_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True only right after the advance that raised a match.
    pub fn interrupt_pending(&self) -> bool {
        self.interrupt
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MATCH_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_match_after_two_advances() {
        let mut t = Timer::new(100);
        assert_eq!(t.advance(60), None);
        assert_eq!(t.counter(), 60);
        assert_eq!(t.advance(40), Some(MatchEvent { count: 1 }));
        assert_eq!(t.match_count(), 1);
        assert_eq!(t.counter(), 0);
        assert!(t.interrupt_pending());
        t.advance(1);
        assert!(!t.interrupt_pending());
        assert_eq!(t.match_count(), 1);
    }

    #[test]
    fn test_jump_past_match_is_missed() {
        let mut t = Timer::new(10);
        t.advance(8);
        assert_eq!(t.advance(5), None);
        assert_eq!(t.counter(), 13);
        assert_eq!(t.match_count(), 0);
    }

    #[test]
    fn test_overflow_wraps_without_match() {
        let mut t = Timer::new(0);
        t.advance(TIMER_CEILING as u64);
        assert_eq!(t.counter(), TIMER_CEILING);
        assert_eq!(t.advance(1), None);
        assert_eq!(t.counter(), 0);
        assert_eq!(t.overflow_count(), 1);
        assert_eq!(t.match_count(), 0);
    }

    #[test]
    fn test_match_on_ceiling() {
        let mut t = Timer::new(TIMER_CEILING);
        assert!(t.advance(TIMER_CEILING as u64).is_some());
        assert_eq!(t.overflow_count(), 0);
    }

    #[test]
    fn test_zero_advance_and_stopped() {
        let mut t = Timer::new(5);
        assert_eq!(t.advance(0), None);
        t.stop();
        assert_eq!(t.advance(5), None);
        assert_eq!(t.counter(), 0);
        t.start();
        assert!(t.advance(5).is_some());
    }

    #[test]
    fn test_configure_match_takes_effect_next_advance() {
        let mut t = Timer::new(50);
        t.advance(20);
        t.configure_match(25);
        assert!(t.advance(5).is_some());
        assert_eq!(t.match_value(), 25);
    }

    #[test]
    fn test_reset_keeps_match_value() {
        let mut t = Timer::new(3);
        t.advance(3);
        t.advance(2);
        t.reset();
        assert_eq!(t.counter(), 0);
        assert_eq!(t.match_count(), 0);
        assert_eq!(t.match_value(), 3);
    }

    proptest! {
        #[test]
        fn prop_single_tick_advances_match_once_per_period(
            match_value in 1u16..500,
            periods in 1u32..5,
        ) {
            let mut t = Timer::new(match_value);
            let mut events = 0u32;
            for _ in 0..(match_value as u32 * periods) {
                if t.advance(1).is_some() {
                    events += 1;
                    prop_assert_eq!(t.counter(), 0);
                }
            }
            prop_assert_eq!(events, periods);
            prop_assert_eq!(t.match_count(), periods);
        }

        #[test]
        fn prop_split_advance_matches_once(match_value in 2u16..1000, split in 1u16..1000) {
            prop_assume!(split < match_value);
            let mut t = Timer::new(match_value);
            prop_assert!(t.advance(split as u64).is_none());
            prop_assert!(t.advance((match_value - split) as u64).is_some());
            prop_assert_eq!(t.match_count(), 1);
            prop_assert_eq!(t.counter(), 0);
        }
    }
}
