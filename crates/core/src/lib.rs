//! # mcu-sim-core
//!
//! Execution core for microcontroller teaching widgets.
//!
//! Models the small amount of real machine behavior the course demos need:
//! a six-register ALU that executes one typed instruction per call, a
//! program-counter stepper with a single conditional branch, a free-running
//! 16-bit timer with an exact-match event, and an input-capture latch.
//!
//! ## Architecture
//!
//! - [`Board`] — Owns one instance of every unit and produces snapshots
//! - [`RegisterMachine`] — `W0`–`W5` register file plus `MOV`/`ADD`/`SUB`/`CLR`
//! - [`ProgramStepper`] — Branch/loop state machine over a [`Program`] table
//! - [`Timer`] — Free-running counter with match events and overflow wrap
//! - [`CaptureUnit`] — Start/end edge latch for pulse-width measurement
//! - [`clock`] — Host clock to timer tick prescaler
//! - [`disasm`] — Instruction, register and listing formatters
//! - [`snapshot`] — Read-only state views and the trace ring buffer
//! - [`trace`] — Compressed trace file output
//!
//! The units never exchange data. Each one is stepped on its own by the
//! caller, which then polls [`Board::snapshot`] to redraw.

pub mod registers;
pub mod opcodes;
pub mod error;
pub mod machine;
pub mod stepper;
pub mod timer;
pub mod capture;
pub mod clock;
pub mod disasm;
pub mod snapshot;
pub mod trace;

pub use capture::{CaptureUnit, Trigger};
pub use clock::Prescaler;
pub use error::{DecodeError, ProgramError, TraceError};
pub use machine::RegisterMachine;
pub use opcodes::{Instruction, Operand};
pub use registers::{Reg, RegisterFile};
pub use stepper::{Program, ProgramStepper, RunStop, StepStatus};
pub use timer::{MatchEvent, Timer};

use snapshot::{BoardSnapshot, CaptureSnapshot, RegisterSnapshot, StepperSnapshot, TimerSnapshot};

/// Number of working registers (W0–W5)
pub const REGISTER_COUNT: usize = 6;
/// Highest timer counter value before it wraps to zero
pub const TIMER_CEILING: u16 = 0xFFFF;
/// Match value a fresh timer starts with
pub const DEFAULT_MATCH_VALUE: u16 = 10;

/// All teaching units side by side.
///
/// The board is only a container: each unit keeps exclusive ownership of its
/// state. The capture unit measures against its own free-running counter
/// (`capture_clock`, never matches, wraps at the ceiling), so pulse widths
/// do not depend on the match timer clearing itself. [`Board::capture_start`]
/// and [`Board::capture_end`] read that counter and pass the value to the
/// capture unit the way an external caller would.
pub struct Board {
    pub machine: RegisterMachine,
    pub stepper: ProgramStepper,
    pub timer: Timer,
    pub capture_clock: Timer,
    pub capture: CaptureUnit,
}

impl Board {
    pub fn new() -> Self {
        Board::with_program(Program::demo())
    }

    pub fn with_program(program: Program) -> Self {
        Board {
            machine: RegisterMachine::new(),
            stepper: ProgramStepper::new(program),
            timer: Timer::default(),
            capture_clock: Timer::new(0),
            capture: CaptureUnit::new(),
        }
    }

    /// Reset every unit. The timer keeps its match value.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.stepper.reset();
        self.timer.reset();
        self.capture_clock.reset();
        self.capture.reset();
    }

    /// Advance both time bases by `elapsed` ticks. Stopping the match timer
    /// does not stop the capture clock.
    pub fn advance(&mut self, elapsed: u64) -> Option<MatchEvent> {
        self.capture_clock.advance(elapsed);
        self.timer.advance(elapsed)
    }

    /// Latch the capture clock as the pulse start edge.
    pub fn capture_start(&mut self) -> Trigger {
        let counter = self.capture_clock.counter();
        self.capture.trigger_start(counter)
    }

    /// Latch the capture clock as the pulse end edge.
    pub fn capture_end(&mut self) -> Trigger {
        let counter = self.capture_clock.counter();
        self.capture.trigger_end(counter)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let ls = self.stepper.loop_state();
        BoardSnapshot {
            registers: RegisterSnapshot {
                values: self.machine.registers().values(),
                executed: self.machine.executed,
            },
            stepper: StepperSnapshot {
                pc: self.stepper.pc(),
                done: self.stepper.is_done(),
                loop_state: ls,
                status: self.stepper.status(),
                steps: self.stepper.steps,
            },
            timer: TimerSnapshot {
                counter: self.timer.counter(),
                match_value: self.timer.match_value(),
                match_count: self.timer.match_count(),
                overflow_count: self.timer.overflow_count(),
                running: self.timer.is_running(),
                interrupt: self.timer.interrupt_pending(),
            },
            capture: CaptureSnapshot {
                clock: self.capture_clock.counter(),
                pulse_start: self.capture.pulse_start(),
                pulse_end: self.capture.pulse_end(),
                capturing: self.capture.is_capturing(),
                captured: self.capture.is_captured(),
            },
        }
    }

    /// Dump every unit as text for the step debugger.
    pub fn dump_regs(&self) -> String {
        let mut s = String::new();
        for (r, v) in self.machine.registers().iter() {
            s.push_str(&format!("{}={:<6} ", r, v));
        }
        let ls = self.stepper.loop_state();
        s.push_str(&format!(
            "\nPC={} {} W0={} loopCount={} Z={}  [{}]",
            self.stepper.pc(),
            if self.stepper.is_done() { "DONE" } else { "RUN" },
            ls.counter,
            ls.iterations,
            ls.zero as u8,
            self.stepper.status_message()
        ));
        s.push_str(&format!(
            "\nTMR={} PR={} matches={} ovf={} {}{}",
            self.timer.counter(),
            self.timer.match_value(),
            self.timer.match_count(),
            self.timer.overflow_count(),
            if self.timer.is_running() { "running" } else { "stopped" },
            if self.timer.interrupt_pending() { "  IRQ" } else { "" }
        ));
        let cap = &self.capture;
        let cap_state = if cap.is_capturing() {
            format!("capturing since {}", cap.pulse_start())
        } else if let Some(width) = cap.pulse_width() {
            format!("start={} end={} width={}", cap.pulse_start(), cap.pulse_end(), width)
        } else {
            "idle".to_string()
        };
        s.push_str(&format!("\nCAP clock={} {}", self.capture_clock.counter(), cap_state));
        s
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_creation() {
        let board = Board::new();
        let snap = board.snapshot();
        assert_eq!(snap.registers.values, [0; REGISTER_COUNT]);
        assert_eq!(snap.stepper.pc, 0);
        assert_eq!(snap.stepper.loop_state.counter, 5);
        assert_eq!(snap.timer.counter, 0);
        assert_eq!(snap.timer.match_value, DEFAULT_MATCH_VALUE);
        assert!(snap.timer.running);
        assert!(!snap.capture.capturing && !snap.capture.captured);
    }

    #[test]
    fn test_units_are_independent() {
        let mut board = Board::new();
        board.machine.execute_line("MOV #9, W0").unwrap();
        assert_eq!(board.stepper.loop_state().counter, 5);
        board.stepper.step();
        board.stepper.step();
        board.stepper.step();
        assert_eq!(board.machine.reg(Reg::W0), 9);
        assert_eq!(board.timer.counter(), 0);
    }

    #[test]
    fn test_scenario_register_mov() {
        let mut board = Board::new();
        board.machine.execute_line("MOV #5, W0").unwrap();
        assert_eq!(board.snapshot().registers.values[0], 5);
    }

    #[test]
    fn test_scenario_timer_match() {
        let mut board = Board::new();
        board.timer.configure_match(100);
        board.timer.advance(60);
        board.timer.advance(40);
        let snap = board.snapshot();
        assert_eq!(snap.timer.match_count, 1);
        assert_eq!(snap.timer.counter, 0);
        assert!(snap.timer.interrupt);
    }

    #[test]
    fn test_capture_through_board() {
        let mut board = Board::new();
        board.advance(30);
        assert_eq!(board.capture_start(), Trigger::Latched);
        assert_eq!(board.capture_start(), Trigger::Ignored);
        board.advance(50);
        assert_eq!(board.capture_end(), Trigger::Latched);
        assert_eq!(board.capture.pulse_width(), Some(50));
        assert_eq!(board.snapshot().capture.pulse_width(), Some(50));
        // capture never moved either counter
        assert_eq!(board.capture_clock.counter(), 80);
        assert_eq!(board.timer.counter(), 80);
    }

    #[test]
    fn test_capture_clock_ignores_matches() {
        let mut board = Board::new();
        board.capture_start();
        let mut events = 0;
        for _ in 0..50 {
            if board.advance(1).is_some() {
                events += 1;
            }
        }
        board.capture_end();
        assert_eq!(events, 5);
        assert_eq!(board.timer.counter(), 0);
        assert_eq!(board.capture.pulse_width(), Some(50));
    }

    #[test]
    fn test_capture_clock_runs_while_timer_stopped() {
        let mut board = Board::new();
        board.timer.stop();
        assert_eq!(board.advance(7), None);
        assert_eq!(board.timer.counter(), 0);
        assert_eq!(board.capture_clock.counter(), 7);
    }

    #[test]
    fn test_reset_all() {
        let mut board = Board::new();
        board.timer.configure_match(7);
        board.machine.execute_line("MOV #1, W3").unwrap();
        board.stepper.run(100, &[]);
        board.advance(3);
        board.capture_start();
        board.reset();
        let snap = board.snapshot();
        assert_eq!(snap.registers.values[3], 0);
        assert_eq!(snap.stepper.pc, 0);
        assert_eq!(snap.timer.counter, 0);
        assert_eq!(snap.timer.match_value, 7);
        assert_eq!(snap.capture.clock, 0);
        assert!(!snap.capture.capturing);
    }

    #[test]
    fn test_dump_regs() {
        let mut board = Board::new();
        board.machine.execute_line("MOV #-2, W1").unwrap();
        let dump = board.dump_regs();
        assert!(dump.contains("W1=-2"));
        assert!(dump.contains("PC=0 RUN"));
        assert!(dump.contains("TMR=0 PR=10"));
        assert!(dump.contains("CAP clock=0 idle"));
    }
}
