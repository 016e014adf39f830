//! Configuration for the mcu-sim frontend.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (`MCU_SIM_MATCH`, `MCU_SIM_TICK_MS`, ...)
//! 2. Project-local config file (`./mcu-sim.toml`)
//! 3. User config file (`~/.config/mcu-sim/config.toml`)
//! 4. Built-in defaults
//!
//! Command-line flags are applied on top by `main`.
//!
//! # Config File Format
//!
//! ```toml
//! # mcu-sim.toml
//! match_value = 10      # timer match threshold (PR1)
//! tick_ms = 20          # host milliseconds per timer tick
//! pulse_ms = 1000       # capture pulse length, 200..=2000
//! trace_capacity = 1024 # trace ring buffer entries
//! program = "loop.asm"  # program listing for the stepper
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TICK_MS: u64 = 20;
pub const DEFAULT_PULSE_MS: u64 = 1000;
pub const MIN_PULSE_MS: u64 = 200;
pub const MAX_PULSE_MS: u64 = 2000;
pub const DEFAULT_TRACE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Timer match threshold.
    pub match_value: Option<u16>,
    /// Host milliseconds per timer tick. 0 stops the wall clock.
    pub tick_ms: Option<u64>,
    /// Pulse duration used by the `pulse` command.
    pub pulse_ms: Option<u64>,
    /// Number of commands kept in the trace buffer.
    pub trace_capacity: Option<usize>,
    /// Path to a program listing. The built-in countdown loop is used otherwise.
    pub program: Option<String>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::user_config_path().and_then(|p| Self::load_from_file(&p)) {
            config.merge(user_config);
        }
        if let Some(local_config) = Self::load_from_file(Path::new("mcu-sim.toml")) {
            config.merge(local_config);
        }
        config.apply_env_overrides(|k| std::env::var(k).ok());

        log::debug!("Loaded configuration: {:?}", config);
        config
    }

    pub fn match_value(&self) -> u16 {
        self.match_value.unwrap_or(mcu_sim_core::DEFAULT_MATCH_VALUE)
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms.unwrap_or(DEFAULT_TICK_MS)
    }

    /// Pulse duration, clamped to the slider range.
    pub fn pulse_ms(&self) -> u64 {
        self.pulse_ms.unwrap_or(DEFAULT_PULSE_MS).clamp(MIN_PULSE_MS, MAX_PULSE_MS)
    }

    pub fn trace_capacity(&self) -> usize {
        self.trace_capacity.unwrap_or(DEFAULT_TRACE_CAPACITY)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    pub fn merge(&mut self, other: Self) {
        if other.match_value.is_some() {
            self.match_value = other.match_value;
        }
        if other.tick_ms.is_some() {
            self.tick_ms = other.tick_ms;
        }
        if other.pulse_ms.is_some() {
            self.pulse_ms = other.pulse_ms;
        }
        if other.trace_capacity.is_some() {
            self.trace_capacity = other.trace_capacity;
        }
        if other.program.is_some() {
            self.program = other.program;
        }
    }

    /// Apply environment overrides read through `var`.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => {
                    log::info!("Using {} from environment: {}", key, raw);
                    Some(v)
                }
                Err(_) => {
                    log::warn!("Ignoring invalid {}={}", key, raw);
                    None
                }
            }
        }

        if let Some(v) = parsed("MCU_SIM_MATCH", var("MCU_SIM_MATCH")) {
            self.match_value = Some(v);
        }
        if let Some(v) = parsed("MCU_SIM_TICK_MS", var("MCU_SIM_TICK_MS")) {
            self.tick_ms = Some(v);
        }
        if let Some(v) = parsed("MCU_SIM_PULSE_MS", var("MCU_SIM_PULSE_MS")) {
            self.pulse_ms = Some(v);
        }
        if let Some(v) = parsed("MCU_SIM_TRACE_CAPACITY", var("MCU_SIM_TRACE_CAPACITY")) {
            self.trace_capacity = Some(v);
        }
        if let Some(path) = var("MCU_SIM_PROGRAM") {
            log::info!("Using MCU_SIM_PROGRAM from environment: {}", path);
            self.program = Some(path);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mcu-sim").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# mcu-sim configuration
# Place this file at ~/.config/mcu-sim/config.toml or ./mcu-sim.toml

# Timer match threshold (PR1)
match_value = 10

# Host milliseconds per timer tick (500 for the interrupt demo, 20 for capture)
tick_ms = 20

# Capture pulse duration in milliseconds (200..=2000)
pulse_ms = 1000

# Commands kept in the trace ring buffer
# trace_capacity = 1024

# Program listing for the stepper (defaults to the countdown loop)
# program = "loop.asm"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.match_value(), mcu_sim_core::DEFAULT_MATCH_VALUE);
        assert_eq!(config.tick_ms(), DEFAULT_TICK_MS);
        assert_eq!(config.pulse_ms(), DEFAULT_PULSE_MS);
        assert_eq!(config.trace_capacity(), DEFAULT_TRACE_CAPACITY);
        assert!(config.program.is_none());
    }

    #[test]
    fn test_pulse_clamped() {
        let short = Config { pulse_ms: Some(5), ..Config::default() };
        assert_eq!(short.pulse_ms(), MIN_PULSE_MS);
        let long = Config { pulse_ms: Some(60_000), ..Config::default() };
        assert_eq!(long.pulse_ms(), MAX_PULSE_MS);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config { match_value: Some(5), tick_ms: Some(500), ..Config::default() };
        let overlay = Config { tick_ms: Some(20), pulse_ms: Some(400), ..Config::default() };
        base.merge(overlay);
        assert_eq!(base.match_value, Some(5));
        assert_eq!(base.tick_ms, Some(20));
        assert_eq!(base.pulse_ms, Some(400));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config { match_value: Some(5), ..Config::default() };
        config.apply_env_overrides(|k| match k {
            "MCU_SIM_MATCH" => Some("100".into()),
            "MCU_SIM_TICK_MS" => Some("not-a-number".into()),
            "MCU_SIM_PROGRAM" => Some("loop.asm".into()),
            _ => None,
        });
        assert_eq!(config.match_value, Some(100));
        assert_eq!(config.tick_ms, None);
        assert_eq!(config.program.as_deref(), Some("loop.asm"));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = Config::sample_config();
        let config: Config = toml::from_str(&sample).expect("Sample config should parse");
        assert_eq!(config.match_value, Some(10));
        assert_eq!(config.tick_ms, Some(20));
    }
}
