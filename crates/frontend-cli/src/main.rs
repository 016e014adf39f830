//! mcu-sim frontend v0.3.0.
//!
//! Provides two execution modes:
//!
//! - **Step mode** (default): Interactive prompt. Each line is a debugger
//!   command or an instruction for the register machine.
//! - **Headless mode** (`--headless`): Runs a script, the program, the timer
//!   and one capture pulse, then prints the final state.
//!
//! Settings come from `mcu-sim.toml` / environment (see [`config`]) and are
//! overridden by command-line flags.

mod config;
mod session;

use config::Config;
use mcu_sim_core::{trace, Program};
use session::{Outcome, Session};
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

fn usage(prog: &str) {
    eprintln!("MCU Simulator v0.3.0 - Rust");
    eprintln!("Usage: {} [script.asm] [options]", prog);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --headless           Run script, program, timer and one pulse, then exit");
    eprintln!("  --program FILE       Program listing for the stepper");
    eprintln!("  --match N            Timer match value (default 10)");
    eprintln!("  --tick-ms N          Host milliseconds per timer tick (default 20)");
    eprintln!("  --pulse-ms N         Capture pulse length 200-2000 (default 1000)");
    eprintln!("  --ticks N            Timer ticks to run (headless, default 0)");
    eprintln!("  --trace FILE         Write the command trace on exit");
    eprintln!("  --break N            Breakpoint on program line N (repeatable)");
    eprintln!("  --debug              Debug logging");
    eprintln!("  --sample-config      Print a sample config file");
}

/// Value following `flag`, parsed.
fn flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let raw = args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1))?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("Warning: ignoring {} {}", flag, raw);
            None
        }
    }
}

const VALUE_FLAGS: &[&str] = &["--program", "--match", "--tick-ms", "--pulse-ms", "--ticks", "--trace", "--break"];

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage(&args[0]);
        return;
    }
    if args.iter().any(|a| a == "--sample-config") {
        print!("{}", Config::sample_config());
        return;
    }

    let headless = args.iter().any(|a| a == "--headless");
    let debug = args.iter().any(|a| a == "--debug");

    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = Config::load();
    config.merge(Config {
        match_value: flag_value(&args, "--match"),
        tick_ms: flag_value(&args, "--tick-ms"),
        pulse_ms: flag_value(&args, "--pulse-ms"),
        trace_capacity: None,
        program: flag_value(&args, "--program"),
    });

    // First bare argument that is not a flag value
    let script_path: Option<&String> = {
        let mut found = None;
        let mut i = 1;
        while i < args.len() {
            if VALUE_FLAGS.contains(&args[i].as_str()) {
                i += 2;
            } else if args[i].starts_with("--") {
                i += 1;
            } else {
                found = Some(&args[i]);
                break;
            }
        }
        found
    };

    let program = match config.program.as_deref() {
        Some(path) => match load_program(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Program::demo(),
    };

    let script = match script_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("Error: {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let mut session = Session::new(&config, program);

    // Parse breakpoints
    {
        let mut i = 0;
        while i < args.len() {
            if args[i] == "--break" {
                if let Some(s) = args.get(i + 1) {
                    if let Outcome::Continue(msg) = session.handle(&format!("break {}", s)) {
                        log::info!("{}", msg);
                    }
                }
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    if headless {
        let ticks: u64 = flag_value(&args, "--ticks").unwrap_or(0);
        run_headless(&mut session, script.as_deref(), ticks);
    } else {
        run_step_mode(&mut session, script.as_deref());
    }

    if let Some(path) = flag_value::<String>(&args, "--trace") {
        if let Err(e) = trace::save_to_file(&session.trace_entries(), Path::new(&path)) {
            eprintln!("Error: trace {}: {}", path, e);
        }
    }
}

fn load_program(path: &str) -> Result<Program, String> {
    let listing = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    Program::parse(&listing).map_err(|e| format!("{}: {}", path, e))
}

// ─── Step Mode ──────────────────────────────────────────────────────────────

fn run_step_mode(session: &mut Session, script: Option<&str>) {
    if let Some(script) = script {
        let (transcript, quit) = session.run_script(script);
        for l in transcript {
            println!("{}", l);
        }
        if quit {
            return;
        }
    }

    println!("Step mode: Enter=step, s N=step N, run, tick N, pulse, d=dump, help, q=quit");
    println!("{}", session.board.dump_regs());

    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        print!("mcu> ");
        let _ = std::io::stdout().flush();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match session.handle(&line) {
            Outcome::Quit => break,
            Outcome::Continue(out) => println!("{}", out),
        }
    }
    let snap = session.board.snapshot();
    println!(
        "Total: {} instructions, {} program steps, {} matches",
        snap.registers.executed, snap.stepper.steps, snap.timer.match_count
    );
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(session: &mut Session, script: Option<&str>, ticks: u64) {
    if let Some(script) = script {
        let (transcript, quit) = session.run_script(script);
        if log::log_enabled!(log::Level::Debug) {
            for l in transcript {
                println!("{}", l);
            }
        }
        if quit {
            return;
        }
    }

    for l in session.run_headless(ticks) {
        println!("{}", l);
    }
}
