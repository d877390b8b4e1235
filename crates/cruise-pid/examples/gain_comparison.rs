use cruise_pid::{ControllerConfig, Simulation, SimulationConfig, SimulationStatistics};
use std::time::Duration;

const ITERATIONS: u32 = 200;
const TARGET_SPEED: f64 = 60.0;

/// This example runs the cruise-control loop with several gain sets and
/// compares how each one tracks the 60 km/h target.
///
/// It uses the iterator API directly, so nothing is paced and no progress
/// lines are printed; only a summary table per gain set.
fn main() {
    let candidates = [
        ("default", ControllerConfig::default()),
        (
            "p-only",
            ControllerConfig::new().with_kp(0.6).with_ki(0.0).with_kd(0.0),
        ),
        (
            "soft integral",
            ControllerConfig::new().with_kp(0.8).with_ki(0.02).with_kd(0.1),
        ),
        (
            "aggressive",
            ControllerConfig::new().with_kp(1.5).with_ki(0.3).with_kd(0.2),
        ),
    ];

    println!("Cruise Control Gain Comparison");
    println!("==============================");
    println!("Target speed: {:.1} km/h, {} iterations", TARGET_SPEED, ITERATIONS);
    println!();
    println!("Gains          | Final(km/h) | Overshoot | Rise | Settled | Min speed");
    println!("---------------|-------------|-----------|------|---------|----------");

    for (name, controller) in candidates {
        let config = SimulationConfig::new()
            .with_controller(controller.with_setpoint(TARGET_SPEED))
            .with_iterations(ITERATIONS)
            .with_pause(Duration::ZERO);

        let records: Vec<_> = Simulation::new(&config).collect();
        let stats = SimulationStatistics::from_records(TARGET_SPEED, 0.0, &records);
        let min_speed = records
            .iter()
            .map(|r| r.speed)
            .fold(f64::INFINITY, f64::min);

        println!(
            "{:14} | {:11.2} | {:9.2} | {:>4} | {:>7} | {:9.2}",
            name,
            stats.final_speed,
            stats.max_overshoot,
            fmt_iteration(stats.rise_iteration),
            fmt_iteration(stats.settling_iteration),
            min_speed
        );
    }
}

fn fmt_iteration(iteration: Option<u32>) -> String {
    iteration.map_or_else(|| "-".to_string(), |i| i.to_string())
}
