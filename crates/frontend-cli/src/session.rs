//! Command interpreter shared by step mode and headless mode.
//!
//! Every input line is either a debugger command (`step`, `tick`, `pulse`,
//! ...) or an instruction for the register machine. Each command that
//! changes state is recorded in the trace buffer together with a snapshot
//! taken right after it.

use mcu_sim_core::disasm::format_listing;
use mcu_sim_core::snapshot::{TraceBuffer, TraceEntry};
use mcu_sim_core::{Board, MatchEvent, Prescaler, Program, RunStop, Trigger};

use crate::config::Config;

/// Upper bound on timer ticks a single command may advance.
pub const MAX_TICKS_PER_COMMAND: u64 = 1_000_000;
/// Step budget for `run`.
pub const MAX_RUN_STEPS: usize = 100_000;

pub const HELP: &str = "\
Commands:
  <Enter> | s [N]     step the program N lines (default 1)
  run                 run the program to the end or a breakpoint
  break [N]           set a breakpoint on line N (no argument lists them)
  l | list            show the program listing
  tick [N]            advance the timer N ticks (default 1)
  wait MS             let MS host milliseconds pass
  match N             set the timer match value
  start | stop        start or stop the timer
  cap start|end       deliver a capture edge
  pulse               capture one pulse of the configured duration
  reset [regs|prog|timer|capture]
  d | dump            dump all units
  q | quit            quit
Anything else is executed as an instruction, e.g. `MOV #5, W0`.";

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Session {
    pub board: Board,
    pub breakpoints: Vec<usize>,
    trace: TraceBuffer,
    prescaler: Prescaler,
    /// Simulated host time in milliseconds
    clock_ms: u64,
    pulse_ms: u64,
}

impl Session {
    pub fn new(config: &Config, program: Program) -> Self {
        let mut board = Board::with_program(program);
        board.timer.configure_match(config.match_value());
        Session {
            board,
            breakpoints: Vec::new(),
            trace: TraceBuffer::new(config.trace_capacity()),
            prescaler: Prescaler::new(config.tick_ms()),
            clock_ms: 0,
            pulse_ms: config.pulse_ms(),
        }
    }

    pub fn trace_entries(&self) -> Vec<TraceEntry> {
        self.trace.entries()
    }

    /// Interpret one input line.
    pub fn handle(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let cmd = words.next().unwrap_or("").to_lowercase();
        let arg = words.next();

        let (text, record) = match cmd.as_str() {
            "q" | "quit" => return Outcome::Quit,
            "h" | "help" | "?" => (HELP.to_string(), false),
            "d" | "dump" => (self.board.dump_regs(), false),
            "l" | "list" => (format_listing(self.board.stepper.program(), self.board.stepper.pc()).join("\n"), false),
            "" | "s" | "step" => (self.step(arg), true),
            "run" => (self.run(), true),
            "break" => (self.set_breakpoint(arg), false),
            "tick" => (self.tick(arg), true),
            "wait" => (self.wait(arg), true),
            "match" => (self.set_match(arg), true),
            "start" => {
                self.board.timer.start();
                ("Timer started".to_string(), true)
            }
            "stop" => {
                self.board.timer.stop();
                ("Timer stopped".to_string(), true)
            }
            "cap" => (self.capture_edge(arg), true),
            "pulse" => (self.pulse(), true),
            "reset" => (self.reset(arg), true),
            _ => (self.execute(line), true),
        };

        if record {
            self.trace.record(line, self.board.snapshot());
        }
        Outcome::Continue(text)
    }

    fn execute(&mut self, line: &str) -> String {
        match self.board.machine.execute_line(line) {
            Ok(inst) => format!("Executed: {}", inst),
            Err(e) => format!("Error: {}", e),
        }
    }

    fn step(&mut self, arg: Option<&str>) -> String {
        let n = match parse_count(arg, 1) {
            Ok(n) => n,
            Err(msg) => return msg,
        };
        let n = n.min(MAX_RUN_STEPS);
        let mut out = Vec::new();
        for i in 0..n {
            let pc = self.board.stepper.pc();
            self.board.stepper.step();
            let line = format!("  {:2}: {}", pc, self.board.stepper.status_message());
            let last = i == n - 1 || (self.board.stepper.is_done() && n > 1);
            if n <= 20 {
                out.push(line);
            } else if last {
                out.push(format!("  ... {} steps, last:\n{}", i + 1, line));
            }
            if last {
                break;
            }
        }
        out.join("\n")
    }

    fn run(&mut self) -> String {
        match self.board.stepper.run(MAX_RUN_STEPS, &self.breakpoints) {
            RunStop::Done { steps } => format!("Program finished after {} steps", steps),
            RunStop::Breakpoint { pc, steps } => format!("*** Breakpoint: line {} after {} steps ***", pc, steps),
            RunStop::StepLimit { steps } => format!("Stopped after {} steps (limit)", steps),
        }
    }

    fn set_breakpoint(&mut self, arg: Option<&str>) -> String {
        let Some(arg) = arg else {
            return format!("Breakpoints: {:?}", self.breakpoints);
        };
        let len = self.board.stepper.program().len();
        match arg.parse::<usize>() {
            Ok(line) if line < len => {
                if !self.breakpoints.contains(&line) {
                    self.breakpoints.push(line);
                }
                format!("Breakpoint at line {}", line)
            }
            _ => format!("Error: breakpoint must be a line number below {}", len),
        }
    }

    fn tick(&mut self, arg: Option<&str>) -> String {
        match parse_count(arg, 1) {
            Ok(n) => {
                let (applied, events) = self.advance_ticks(n as u64);
                let mut out = describe_events(events, self.board.timer.counter());
                if applied < n as u64 {
                    out.push_str(&format!("\n(limited to {} ticks)", applied));
                }
                out
            }
            Err(msg) => msg,
        }
    }

    fn wait(&mut self, arg: Option<&str>) -> String {
        let Some(ms) = arg.and_then(|a| a.parse::<u64>().ok()) else {
            return "Error: wait needs a duration in milliseconds".to_string();
        };
        let (ms, ticks, events) = self.let_time_pass(ms);
        format!("{} ms -> {} ticks\n{}", ms, ticks, describe_events(events, self.board.timer.counter()))
    }

    fn set_match(&mut self, arg: Option<&str>) -> String {
        match arg.and_then(|a| a.parse::<u16>().ok()) {
            Some(v) => {
                self.board.timer.configure_match(v);
                format!("Match value = {}", v)
            }
            None => "Error: match value must be 0..=65535".to_string(),
        }
    }

    fn capture_edge(&mut self, arg: Option<&str>) -> String {
        let counter = self.board.capture_clock.counter();
        match arg.map(str::to_lowercase).as_deref() {
            Some("start") => match self.board.capture_start() {
                Trigger::Latched => format!("Pulse start latched at {}", counter),
                Trigger::Ignored => "Ignored: capture already in progress".to_string(),
            },
            Some("end") => match self.board.capture_end() {
                Trigger::Latched => self.describe_capture(),
                Trigger::Ignored => "Ignored: no capture in progress".to_string(),
            },
            _ => "Error: expected `cap start` or `cap end`".to_string(),
        }
    }

    /// Start edge now, end edge after the configured pulse duration.
    fn pulse(&mut self) -> String {
        if self.board.capture_start() == Trigger::Ignored {
            return "Ignored: capture already in progress".to_string();
        }
        let (_, _, events) = self.let_time_pass(self.pulse_ms);
        self.board.capture_end();
        let mut out = self.describe_capture();
        if !events.is_empty() {
            out.push('\n');
            out.push_str(&describe_events(events, self.board.timer.counter()));
        }
        out
    }

    fn reset(&mut self, arg: Option<&str>) -> String {
        match arg.map(str::to_lowercase).as_deref() {
            None | Some("all") => {
                self.board.reset();
                self.prescaler.reset(self.clock_ms);
            }
            Some("regs") => self.board.machine.reset(),
            Some("prog") => self.board.stepper.reset(),
            Some("timer") => {
                self.board.timer.reset();
                self.prescaler.reset(self.clock_ms);
            }
            Some("capture") => {
                self.board.capture.reset();
                self.board.capture_clock.reset();
            }
            Some(other) => return format!("Error: unknown reset target `{}`", other),
        }
        "Reset complete".to_string()
    }

    fn describe_capture(&self) -> String {
        let cap = &self.board.capture;
        match (cap.captured_value(), cap.pulse_width()) {
            (Some(value), Some(width)) => {
                format!("Captured Timer Value: {}\nPulse Width: {} timer ticks", value, width)
            }
            _ => "No capture".to_string(),
        }
    }

    /// Advance the simulated host clock, feeding whole ticks to the board.
    ///
    /// A single call covers at most `MAX_TICKS_PER_COMMAND` ticks; longer
    /// spans are cut short. Returns the milliseconds actually elapsed, the
    /// ticks applied and the matches raised.
    fn let_time_pass(&mut self, ms: u64) -> (u64, u64, Vec<MatchEvent>) {
        let period = self.prescaler.period();
        let ms = if period == 0 { ms } else { ms.min(MAX_TICKS_PER_COMMAND.saturating_mul(period)) };
        self.clock_ms = self.clock_ms.saturating_add(ms);
        let ticks = self.prescaler.elapsed_ticks(self.clock_ms);
        let (applied, events) = self.advance_ticks(ticks);
        (ms, applied, events)
    }

    /// Advance one tick at a time so no match is jumped over.
    fn advance_ticks(&mut self, n: u64) -> (u64, Vec<MatchEvent>) {
        let n = n.min(MAX_TICKS_PER_COMMAND);
        (n, (0..n).filter_map(|_| self.board.advance(1)).collect())
    }

    /// Feed script lines through [`Session::handle`]. Blank and comment
    /// lines are skipped. Returns the transcript and whether the script quit.
    pub fn run_script(&mut self, script: &str) -> (Vec<String>, bool) {
        let mut transcript = Vec::new();
        for line in script.lines().map(str::trim) {
            // blank lines would step the program
            if line.is_empty() || line.starts_with(';') || line.starts_with("//") {
                continue;
            }
            match self.handle(line) {
                Outcome::Quit => return (transcript, true),
                Outcome::Continue(out) => {
                    transcript.push(format!("mcu> {}", line));
                    transcript.push(out);
                }
            }
        }
        (transcript, false)
    }

    /// Batch run: program to the end, `ticks` timer ticks, one capture
    /// pulse, then a full dump.
    pub fn run_headless(&mut self, ticks: u64) -> Vec<String> {
        let mut out = Vec::new();

        // breakpoints only report; keep going until the program finishes
        while !self.board.stepper.is_done() {
            let before = self.board.stepper.steps;
            if let Outcome::Continue(msg) = self.handle("run") {
                out.push(msg);
            }
            if self.board.stepper.steps == before || self.board.stepper.steps >= MAX_RUN_STEPS as u64 {
                break;
            }
        }

        let mut remaining = ticks;
        while remaining > 0 {
            let n = remaining.min(MAX_TICKS_PER_COMMAND);
            if let Outcome::Continue(msg) = self.handle(&format!("tick {}", n)) {
                out.extend(msg.lines().filter(|l| l.starts_with('⚡')).map(String::from));
            }
            remaining -= n;
        }

        if let Outcome::Continue(msg) = self.handle("pulse") {
            out.push(msg);
        }

        out.push(String::new());
        out.push(self.board.dump_regs());
        out
    }
}

fn parse_count(arg: Option<&str>, default: usize) -> Result<usize, String> {
    match arg {
        None => Ok(default),
        Some(a) => a
            .parse::<usize>()
            .map_err(|_| format!("Error: `{}` is not a count", a)),
    }
}

fn describe_events(events: Vec<MatchEvent>, counter: u16) -> String {
    let mut out: Vec<String> = events
        .iter()
        .map(|ev| format!("⚡ Interrupt Triggered! Count: {}", ev.count))
        .collect();
    out.push(format!("TMR = {}", counter));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TICK_MS;
    use mcu_sim_core::Reg;

    fn session() -> Session {
        Session::new(&Config::default(), Program::demo())
    }

    fn text(o: Outcome) -> String {
        match o {
            Outcome::Continue(s) => s,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_instruction_lines() {
        let mut s = session();
        assert_eq!(text(s.handle("mov #5, w0")), "Executed: MOV #5, W0");
        assert_eq!(s.board.machine.reg(Reg::W0), 5);
        let err = text(s.handle("MOV #5, W9"));
        assert!(err.starts_with("Error: Invalid operands for MOV"));
        assert!(text(s.handle("JMP W0")).contains("Unknown instruction: JMP"));
    }

    #[test]
    fn test_step_and_run() {
        let mut s = session();
        let out = text(s.handle(""));
        assert!(out.contains("Executed: MOV #5, W0"));
        let out = text(s.handle("s 4"));
        assert!(out.ends_with("Branch taken → LOOP"));
        assert!(text(s.handle("run")).starts_with("Program finished"));
        assert!(s.board.stepper.is_done());
        assert!(text(s.handle("s")).contains("End of program."));
    }

    #[test]
    fn test_breakpoints() {
        let mut s = session();
        assert_eq!(text(s.handle("break 4")), "Breakpoint at line 4");
        assert!(text(s.handle("break 9")).starts_with("Error"));
        assert!(text(s.handle("run")).contains("Breakpoint: line 4"));
        assert_eq!(s.board.stepper.pc(), 4);
    }

    #[test]
    fn test_tick_reports_matches() {
        let mut s = session();
        text(s.handle("match 3"));
        let out = text(s.handle("tick 7"));
        assert_eq!(out.matches("Interrupt Triggered").count(), 2);
        assert!(out.ends_with("TMR = 1"));
        assert_eq!(s.board.timer.match_count(), 2);
    }

    #[test]
    fn test_wait_uses_prescaler() {
        let mut s = session();
        text(s.handle("match 0"));
        let out = text(s.handle("wait 110"));
        assert!(out.starts_with("110 ms -> 5 ticks"));
        text(s.handle("wait 10"));
        assert_eq!(s.board.timer.counter(), 6);
    }

    #[test]
    fn test_pulse_capture() {
        let mut s = session();
        text(s.handle("match 0"));
        text(s.handle("tick 12"));
        let out = text(s.handle("pulse"));
        assert!(out.contains("Captured Timer Value: 12"));
        assert!(out.contains("Pulse Width: 50 timer ticks"));
        assert!(s.board.capture.is_captured());
    }

    #[test]
    fn test_manual_capture_edges() {
        let mut s = session();
        text(s.handle("match 0"));
        assert!(text(s.handle("cap end")).starts_with("Ignored"));
        assert!(text(s.handle("cap start")).starts_with("Pulse start latched at 0"));
        assert!(text(s.handle("cap start")).starts_with("Ignored"));
        assert!(text(s.handle("pulse")).starts_with("Ignored"));
        text(s.handle("tick 9"));
        assert!(text(s.handle("cap end")).contains("Pulse Width: 9"));
    }

    #[test]
    fn test_reset_targets() {
        let mut s = session();
        text(s.handle("MOV #3, W2"));
        text(s.handle("s 3"));
        assert_eq!(text(s.handle("reset regs")), "Reset complete");
        assert_eq!(s.board.machine.reg(Reg::W2), 0);
        assert_eq!(s.board.stepper.pc(), 3);
        text(s.handle("reset"));
        assert_eq!(s.board.stepper.pc(), 0);
        assert!(text(s.handle("reset bogus")).starts_with("Error"));
    }

    #[test]
    fn test_trace_records_mutations_only() {
        let mut s = session();
        text(s.handle("MOV #1, W1"));
        text(s.handle("dump"));
        text(s.handle("help"));
        text(s.handle("tick"));
        let entries = s.trace_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "MOV #1, W1");
        assert_eq!(entries[0].snapshot.registers.values[1], 1);
        assert_eq!(entries[1].snapshot.timer.counter, 1);
    }

    #[test]
    fn test_default_pulse_measures_full_width() {
        let mut s = session();
        let out = text(s.handle("pulse"));
        assert!(out.contains("Captured Timer Value: 0"));
        assert!(out.contains("Pulse Width: 50 timer ticks"));
        // the match timer still fired underneath
        assert_eq!(out.matches("Interrupt Triggered").count(), 5);
        assert_eq!(s.board.timer.match_count(), 5);
        assert_eq!(s.board.capture_clock.counter(), 50);
    }

    #[test]
    fn test_huge_wait_is_bounded() {
        let mut s = session();
        text(s.handle("match 0"));
        let out = text(s.handle(&format!("wait {}", u64::MAX)));
        let ms = MAX_TICKS_PER_COMMAND * DEFAULT_TICK_MS;
        assert!(out.starts_with(&format!("{} ms -> {} ticks", ms, MAX_TICKS_PER_COMMAND)));
        let after_big = s.board.timer.counter();
        assert_eq!(after_big as u64, MAX_TICKS_PER_COMMAND % 65536);
        assert!(text(s.handle("wait 1")).starts_with("1 ms -> 0 ticks"));
        assert!(text(s.handle("wait 19")).starts_with("19 ms -> 1 ticks"));
        assert_eq!(s.board.timer.counter(), after_big + 1);
    }

    #[test]
    fn test_tick_reports_limit() {
        let mut s = session();
        text(s.handle("match 0"));
        let out = text(s.handle(&format!("tick {}", MAX_TICKS_PER_COMMAND + 5)));
        assert!(out.ends_with(&format!("(limited to {} ticks)", MAX_TICKS_PER_COMMAND)));
    }

    #[test]
    fn test_large_step_count_is_capped() {
        let program = Program::parse("TOP:\nBNE TOP").unwrap();
        let mut s = Session::new(&Config::default(), program);
        let out = text(s.handle("s 18446744073709551615"));
        assert!(out.starts_with(&format!("  ... {} steps, last:", MAX_RUN_STEPS)));
        assert_eq!(s.board.stepper.steps, MAX_RUN_STEPS as u64);
        assert!(!s.board.stepper.is_done());
    }

    #[test]
    fn test_step_stops_at_end() {
        let mut s = session();
        let out = text(s.handle("s 50"));
        assert!(out.starts_with("  ... 22 steps, last:"));
        assert!(s.board.stepper.is_done());
    }

    #[test]
    fn test_script_and_headless_run() {
        let mut s = session();
        let script = "MOV #7, W3\n\n; set up the timer\nmatch 5\nbreak 2\nq\nMOV #1, W4";
        let (transcript, quit) = s.run_script(script);
        assert!(quit);
        assert_eq!(transcript[0], "mcu> MOV #7, W3");
        assert_eq!(transcript[1], "Executed: MOV #7, W3");
        assert_eq!(s.board.machine.reg(Reg::W4), 0);
        assert_eq!(s.board.stepper.pc(), 0);

        let out = s.run_headless(12);
        assert!(s.board.stepper.is_done());
        assert_eq!(s.board.stepper.loop_state().iterations, 5);
        assert!(out[0].contains("Breakpoint: line 2"));
        assert!(out.iter().any(|l| l.starts_with("Program finished")));
        assert_eq!(out.iter().filter(|l| l.starts_with("⚡")).count(), 2);
        assert!(out.iter().any(|l| l.contains("Pulse Width: 50 timer ticks")));
        let dump = out.last().unwrap();
        assert!(dump.contains("W3=7"));
        assert!(dump.contains("DONE"));
        assert_eq!(s.board.machine.reg(Reg::W3), 7);
    }

    #[test]
    fn test_quit() {
        let mut s = session();
        assert_eq!(s.handle("q"), Outcome::Quit);
        assert_eq!(s.handle("QUIT"), Outcome::Quit);
    }
}
