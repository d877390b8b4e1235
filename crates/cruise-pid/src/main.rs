use std::io;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cruise_pid::{run, RunOutcome, SimulationConfig};
use log::{error, info, warn};

/// Drives the toy vehicle from standstill to 60 km/h with the default
/// gains and prints the trajectory to stdout. Diagnostics go to stderr.
fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed)) {
        warn!("could not install Ctrl-C handler: {}", e);
    }

    let config = SimulationConfig::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match run(&config, &mut out, &stop) {
        Ok(RunOutcome::Completed(stats)) => {
            info!(
                "max overshoot {:.2} km/h, rise at iteration {:?}, settled from iteration {:?}",
                stats.max_overshoot, stats.rise_iteration, stats.settling_iteration
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Interrupted(_)) => ExitCode::from(130),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
