//! Command-line argument parsing for Cadence.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Cadence command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "cadence", about = "Fixed-timestep loop demo")]
pub struct CliArgs {
    /// Simulation step size in milliseconds.
    #[arg(long)]
    pub timestep: Option<f64>,

    /// Ceiling on processed frames per second.
    #[arg(long)]
    pub fps_limit: Option<f64>,

    /// Disable fps sampling.
    #[arg(long)]
    pub no_fps_meter: bool,

    /// Run without a window, on a paced clock.
    #[arg(long)]
    pub headless: bool,

    /// Refresh rate of the headless host (Hz).
    #[arg(long)]
    pub refresh_rate: Option<f64>,

    /// Stop after this many seconds (0 = run until closed).
    #[arg(long)]
    pub run_seconds: Option<f64>,

    /// Milliseconds to busy-wait inside every update.
    #[arg(long)]
    pub update_cost: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(timestep) = args.timestep {
            self.r#loop.timestep_ms = timestep;
        }
        if let Some(limit) = args.fps_limit {
            self.r#loop.fps_limit = limit;
        }
        if args.no_fps_meter {
            self.r#loop.fps_meter = false;
        }
        if args.headless {
            self.host.headless = true;
        }
        if let Some(hz) = args.refresh_rate {
            self.host.refresh_rate_hz = hz;
        }
        if let Some(seconds) = args.run_seconds {
            self.host.run_seconds = seconds;
        }
        if let Some(cost) = args.update_cost {
            self.debug.simulated_update_cost_ms = cost;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            fps_limit: Some(144.0),
            no_fps_meter: true,
            headless: true,
            run_seconds: Some(3.0),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert!((config.r#loop.fps_limit - 144.0).abs() < f64::EPSILON);
        assert!(!config.r#loop.fps_meter);
        assert!(config.host.headless);
        assert!((config.host.run_seconds - 3.0).abs() < f64::EPSILON);
        // Non-overridden fields retain defaults
        assert!((config.r#loop.timestep_ms - 1000.0 / 60.0).abs() < 1e-12);
        assert!((config.host.refresh_rate_hz - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cli_no_override() {
        let defaults = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, defaults);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "cadence",
            "--timestep",
            "10",
            "--headless",
            "--refresh-rate",
            "120",
            "--update-cost",
            "2.5",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.timestep, Some(10.0));
        assert!(args.headless);
        assert_eq!(args.refresh_rate, Some(120.0));
        assert_eq!(args.update_cost, Some(2.5));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(!args.no_fps_meter);
    }
}
