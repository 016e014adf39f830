//! Read-only state snapshots and the trace ring buffer.
//!
//! Renderers never touch the units directly; they poll a [`BoardSnapshot`]
//! after each mutating call. A [`TraceBuffer`] keeps the most recent
//! snapshots together with the command that produced them, so a session can
//! be written out with [`crate::trace`] when it ends.

use serde::{Deserialize, Serialize};

use crate::stepper::{LoopState, StepStatus};
use crate::REGISTER_COUNT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSnapshot {
    /// W0..W5 in index order
    pub values: [i64; REGISTER_COUNT],
    pub executed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepperSnapshot {
    pub pc: usize,
    pub done: bool,
    pub loop_state: LoopState,
    pub status: StepStatus,
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub counter: u16,
    pub match_value: u16,
    pub match_count: u32,
    pub overflow_count: u32,
    pub running: bool,
    pub interrupt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSnapshot {
    /// Free-running capture clock
    pub clock: u16,
    pub pulse_start: u16,
    pub pulse_end: u16,
    pub capturing: bool,
    pub captured: bool,
}

impl CaptureSnapshot {
    /// Width only once a capture completed.
    pub fn pulse_width(&self) -> Option<i64> {
        self.captured.then(|| self.pulse_end as i64 - self.pulse_start as i64)
    }
}

/// Everything a renderer can show, taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub registers: RegisterSnapshot,
    pub stepper: StepperSnapshot,
    pub timer: TimerSnapshot,
    pub capture: CaptureSnapshot,
}

/// One recorded command and the state right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub seq: u64,
    pub command: String,
    pub snapshot: BoardSnapshot,
}

/// Bounded ring buffer of trace entries. Oldest entries are overwritten.
pub struct TraceBuffer {
    buf: Vec<Option<TraceEntry>>,
    /// Write position (next slot to overwrite)
    write_pos: usize,
    /// Number of valid entries
    count: usize,
    /// Sequence number for the next entry
    next_seq: u64,
}

impl TraceBuffer {
    /// Create a buffer holding up to `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        TraceBuffer { buf: vec![None; capacity], write_pos: 0, count: 0, next_seq: 0 }
    }

    /// Record a command and the snapshot taken after it.
    pub fn record(&mut self, command: &str, snapshot: BoardSnapshot) {
        let entry = TraceEntry { seq: self.next_seq, command: command.to_string(), snapshot };
        self.next_seq += 1;
        self.buf[self.write_pos] = Some(entry);
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        if self.count < self.buf.len() {
            self.count += 1;
        }
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&TraceEntry> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.write_pos + self.buf.len() - 1) % self.buf.len();
        self.buf[idx].as_ref()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<TraceEntry> {
        let cap = self.buf.len();
        let start = (self.write_pos + cap - self.count) % cap;
        (0..self.count)
            .filter_map(|i| self.buf[(start + i) % cap].clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        for slot in self.buf.iter_mut() {
            *slot = None;
        }
        self.count = 0;
        self.write_pos = 0;
    }
}
