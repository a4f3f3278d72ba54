//! The binary entry point for the Cadence demo.

use std::process::ExitCode;

use cadence_app::demo::Demo;
use cadence_app::platform::PlatformDirs;
use cadence_app::{AppError, headless, window};
use cadence_config::{CliArgs, Config};
use clap::Parser;
use tracing::info;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cadence: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), AppError> {
    let dirs = PlatformDirs::resolve_and_create()?.with_config_dir(args.config.clone());
    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(args);

    let log_file = cadence_log::init_logging(
        Some(&dirs.log_dir),
        cfg!(debug_assertions),
        Some(&config),
    );
    info!(
        config_dir = %dirs.config_dir.display(),
        log_file = ?log_file,
        "Cadence starting"
    );

    let demo = Demo::new(config.debug.simulated_update_cost_ms);
    let stats = if config.host.headless {
        headless::run_headless(&config, &demo)
    } else {
        window::run_windowed(&config, &demo)?
    };

    let summary = demo.summary();
    info!(
        frames = stats.frames,
        updates = stats.updates,
        dropped_frames = stats.dropped_frames,
        panics = summary.panics,
        last_fps = ?summary.last_fps,
        position = summary.rendered_position,
        "Cadence finished"
    );
    Ok(())
}
