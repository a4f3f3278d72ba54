//! Runs a loop without a window, paced by [`PacedScheduler`].

use std::time::Duration;

use cadence_config::Config;
use cadence_loop::{LoopBuilder, LoopStats, PacedScheduler};
use tracing::info;

use crate::demo::Demo;
use crate::loop_options;

/// Drives `demo` on an emulated display until `run_seconds` elapse (forever
/// if zero) and returns the loop's counters.
pub fn run_headless(config: &Config, demo: &Demo) -> LoopStats {
    let scheduler = PacedScheduler::new(config.host.refresh_rate_hz);
    let game_loop = demo
        .install(LoopBuilder::new().options(loop_options(config)))
        .build(scheduler.clone());

    let limit = Duration::try_from_secs_f64(config.host.run_seconds)
        .ok()
        .filter(|limit| !limit.is_zero());

    info!(
        refresh_interval_ms = scheduler.refresh_interval().as_secs_f64() * 1000.0,
        run_seconds = config.host.run_seconds,
        "running headless"
    );
    game_loop.start();
    let vsyncs = scheduler.run_for(limit);
    game_loop.stop();

    let stats = game_loop.stats();
    info!(vsyncs, frames = stats.frames, updates = stats.updates, "headless run finished");
    stats
}
