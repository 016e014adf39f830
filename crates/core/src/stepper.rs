//! Branch/loop program stepper.
//!
//! A program counter walks a fixed table of source lines, one line per
//! [`ProgramStepper::step`] call. Each line has a declared effect on the
//! [`LoopState`]; exactly one kind of line (`BNE`) can redirect the counter.
//!
//! The default table is the countdown loop used in the branching lesson:
//!
//! ```text
//!  0: MOV #5, W0
//!  1: LOOP:
//!  2: DEC W0
//!  3: CP W0, #0
//!  4: BNE LOOP
//!  5: ; ... more code
//! ```
//!
//! The stepper is in `Running(pc)` while `pc < len` and becomes [`State::Done`]
//! as soon as the counter reaches `len`. Stepping a finished program is a
//! no-op that reports [`StepStatus::EndOfProgram`].

use serde::{Deserialize, Serialize};

use crate::error::ProgramError;
use crate::opcodes::{parse_immediate, tokenize};

/// Source listing of the countdown demo.
pub const DEMO_LISTING: &str = "MOV #5, W0\nLOOP:\nDEC W0\nCP W0, #0\nBNE LOOP\n; ... more code";

/// Declared effect of one program line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// `MOV #n, W0`: load the loop register
    Load { value: i64 },
    /// `NAME:` label, no effect
    Label,
    /// `DEC W0`: decrement the loop register and count one pass
    Decrement,
    /// `CP W0, #n`: set the zero flag from `W0 == n`
    Compare { value: i64 },
    /// `BNE NAME`: jump to `target` while the zero flag is clear
    BranchNotEqual { target: usize },
    /// `; text`, no effect
    Comment,
}

/// One source line of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub kind: StepKind,
}

impl Line {
    pub fn new(text: &str, kind: StepKind) -> Self {
        Line { text: text.to_string(), kind }
    }
}

/// Ordered, validated program table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    lines: Vec<Line>,
}

impl Program {
    /// Build a program, checking every branch target lies inside it.
    pub fn new(lines: Vec<Line>) -> Result<Self, ProgramError> {
        let len = lines.len();
        for (i, line) in lines.iter().enumerate() {
            if let StepKind::BranchNotEqual { target } = line.kind {
                if target >= len {
                    return Err(ProgramError::BranchOutOfRange { line: i, target, len });
                }
            }
        }
        Ok(Program { lines })
    }

    /// The six-line countdown loop.
    pub fn demo() -> Self {
        Program {
            lines: vec![
                Line::new("MOV #5, W0", StepKind::Load { value: 5 }),
                Line::new("LOOP:", StepKind::Label),
                Line::new("DEC W0", StepKind::Decrement),
                Line::new("CP W0, #0", StepKind::Compare { value: 0 }),
                Line::new("BNE LOOP", StepKind::BranchNotEqual { target: 1 }),
                Line::new("; ... more code", StepKind::Comment),
            ],
        }
    }

    /// Parse an assembly listing. Blank lines are dropped; labels resolve to
    /// the index of their own line.
    pub fn parse(listing: &str) -> Result<Self, ProgramError> {
        let texts: Vec<&str> = listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let mut labels: Vec<(String, usize)> = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if text.starts_with(';') {
                continue;
            }
            if let Some(name) = label_name(text) {
                if labels.iter().any(|(l, _)| *l == name) {
                    return Err(ProgramError::DuplicateLabel { line: i, label: name });
                }
                labels.push((name, i));
            }
        }

        let mut lines = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let unsupported = || ProgramError::Unsupported { line: i, text: text.to_string() };
            let kind = if text.starts_with(';') {
                StepKind::Comment
            } else if label_name(text).is_some() {
                StepKind::Label
            } else {
                let toks = tokenize(text);
                let toks: Vec<&str> = toks.iter().map(String::as_str).collect();
                match toks.as_slice() {
                    ["MOV", imm, "W0"] => StepKind::Load { value: immediate(imm).ok_or_else(unsupported)? },
                    ["DEC", "W0"] => StepKind::Decrement,
                    ["CP", "W0", imm] => StepKind::Compare { value: immediate(imm).ok_or_else(unsupported)? },
                    ["BNE", name] => {
                        let target = labels
                            .iter()
                            .find(|(l, _)| l == name)
                            .map(|&(_, idx)| idx)
                            .ok_or_else(|| ProgramError::UnknownLabel { line: i, label: name.to_string() })?;
                        StepKind::BranchNotEqual { target }
                    }
                    _ => return Err(unsupported()),
                }
            };
            lines.push(Line::new(text, kind));
        }
        Program::new(lines)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Loop register value before the first step: the first load's operand.
    pub fn initial_counter(&self) -> i64 {
        self.lines
            .iter()
            .find_map(|l| match l.kind {
                StepKind::Load { value } => Some(value),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Label text for display, falling back to the line number.
    pub fn describe_target(&self, target: usize) -> String {
        match self.lines.get(target) {
            Some(l) if l.kind == StepKind::Label => l.text.trim_end_matches(':').to_string(),
            _ => format!("line {}", target),
        }
    }
}

fn label_name(text: &str) -> Option<String> {
    let name = text.strip_suffix(':')?.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name.to_uppercase())
}

fn immediate(tok: &str) -> Option<i64> {
    parse_immediate(tok.strip_prefix('#')?)
}

/// Counters mutated only by stepping specific lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopState {
    /// Loop register (W0)
    pub counter: i64,
    /// Completed `DEC` passes
    pub iterations: u32,
    /// Result of the last compare
    pub zero: bool,
}

impl LoopState {
    fn initial(program: &Program) -> Self {
        LoopState { counter: program.initial_counter(), iterations: 0, zero: false }
    }
}

/// Outcome of the most recent step, for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Ready,
    Stepped { pc: usize },
    BranchTaken { target: usize },
    LoopComplete,
    EndOfProgram,
}

/// Stepper state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running(usize),
    Done,
}

/// Why [`ProgramStepper::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    Done { steps: usize },
    Breakpoint { pc: usize, steps: usize },
    StepLimit { steps: usize },
}

pub struct ProgramStepper {
    program: Program,
    state: State,
    loop_state: LoopState,
    status: StepStatus,
    /// Total steps taken since reset
    pub steps: u64,
}

impl ProgramStepper {
    pub fn new(program: Program) -> Self {
        let loop_state = LoopState::initial(&program);
        let state = if program.is_empty() { State::Done } else { State::Running(0) };
        ProgramStepper { program, state, loop_state, status: StepStatus::Ready, steps: 0 }
    }

    pub fn reset(&mut self) {
        self.state = if self.program.is_empty() { State::Done } else { State::Running(0) };
        self.loop_state = LoopState::initial(&self.program);
        self.status = StepStatus::Ready;
        self.steps = 0;
    }

    /// Execute the line at the program counter.
    pub fn step(&mut self) -> StepStatus {
        let pc = match self.state {
            State::Done => {
                self.status = StepStatus::EndOfProgram;
                return self.status;
            }
            State::Running(pc) => pc,
        };

        let ls = &mut self.loop_state;
        let mut status = StepStatus::Stepped { pc };
        let next = match self.program.lines[pc].kind {
            StepKind::Load { value } => {
                ls.counter = value;
                pc + 1
            }
            StepKind::Label | StepKind::Comment => pc + 1,
            StepKind::Decrement => {
                ls.counter = ls.counter.saturating_sub(1);
                ls.iterations += 1;
                pc + 1
            }
            StepKind::Compare { value } => {
                ls.zero = ls.counter == value;
                pc + 1
            }
            StepKind::BranchNotEqual { target } => {
                if !ls.zero {
                    log::debug!("branch taken at {} -> {} (W0={})", pc, target, ls.counter);
                    status = StepStatus::BranchTaken { target };
                    target
                } else {
                    log::debug!("loop complete at {} after {} passes", pc, ls.iterations);
                    status = StepStatus::LoopComplete;
                    pc + 1
                }
            }
        };

        self.state = if next >= self.program.len() { State::Done } else { State::Running(next) };
        self.status = status;
        self.steps += 1;
        status
    }

    /// Step until the program finishes, the counter lands on a breakpoint, or
    /// `max_steps` is used up. The line at the starting counter is never
    /// treated as a breakpoint, so a run can resume from one.
    pub fn run(&mut self, max_steps: usize, breakpoints: &[usize]) -> RunStop {
        for n in 0..max_steps {
            if self.is_done() {
                return RunStop::Done { steps: n };
            }
            if n > 0 && breakpoints.contains(&self.pc()) {
                return RunStop::Breakpoint { pc: self.pc(), steps: n };
            }
            self.step();
        }
        if self.is_done() {
            RunStop::Done { steps: max_steps }
        } else {
            RunStop::StepLimit { steps: max_steps }
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Program counter; equals the program length once done.
    pub fn pc(&self) -> usize {
        match self.state {
            State::Running(pc) => pc,
            State::Done => self.program.len(),
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn status_message(&self) -> String {
        match self.status {
            StepStatus::Ready => "Ready".into(),
            StepStatus::Stepped { pc } => format!("Executed: {}", self.program.lines[pc].text),
            StepStatus::BranchTaken { target } => {
                format!("Branch taken → {}", self.program.describe_target(target))
            }
            StepStatus::LoopComplete => "Loop complete".into(),
            StepStatus::EndOfProgram => "End of program.".into(),
        }
    }
}

impl Default for ProgramStepper {
    fn default() -> Self {
        Self::new(Program::demo())
    }
}
