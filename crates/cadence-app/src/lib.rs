//! Cadence application framework.
//!
//! Hosts a fixed-timestep [`Loop`](cadence_loop::Loop) either in a winit
//! window, whose redraw cycle is the display-synchronized frame source, or
//! headless on a paced clock.

pub mod demo;
pub mod error;
pub mod headless;
pub mod platform;
pub mod window;

pub use error::AppError;

use cadence_config::Config;
use cadence_loop::LoopOptions;

/// Loop timing options from the `loop` section of the config.
pub fn loop_options(config: &Config) -> LoopOptions {
    LoopOptions {
        timestep_ms: config.r#loop.timestep_ms,
        fps_limit: config.r#loop.fps_limit,
        fps_meter: config.r#loop.fps_meter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_options_follow_config() {
        let mut config = Config::default();
        config.r#loop.timestep_ms = 5.0;
        config.r#loop.fps_limit = 240.0;
        config.r#loop.fps_meter = false;
        let options = loop_options(&config);
        assert!((options.timestep_ms - 5.0).abs() < f64::EPSILON);
        assert!((options.fps_limit - 240.0).abs() < f64::EPSILON);
        assert!(!options.fps_meter);
    }

    #[test]
    fn test_default_config_matches_loop_defaults() {
        assert_eq!(loop_options(&Config::default()), LoopOptions::default());
    }
}
