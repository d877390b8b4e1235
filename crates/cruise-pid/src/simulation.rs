//! The controller-plant feedback loop.
//!
//! [`step`] advances an explicit [`LoopState`] by one iteration and reports
//! what happened as a [`StepRecord`]. [`Simulation`] iterates that step a
//! fixed number of times, and [`run`] drives the iterator against a writer
//! with real-time pacing.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::plant::car_simulation;
use crate::report;
use crate::statistics::{SimulationStatistics, StatisticsTracker};
use crate::{ControllerConfig, PidController, PidState};

/// Number of iterations the cruise-control demo runs.
pub const DEFAULT_ITERATIONS: u32 = 100;

/// Cosmetic delay between iterations of the demo.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(100);

/// Errors that can end a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Writing the trajectory failed; the run is abandoned.
    #[error("failed to write simulation output: {0}")]
    Io(#[from] io::Error),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    controller: ControllerConfig,
    iterations: u32,
    pause: Duration,
    initial_speed: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            controller: ControllerConfig::default(),
            iterations: DEFAULT_ITERATIONS,
            pause: DEFAULT_PAUSE,
            initial_speed: 0.0,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the delay after each iteration. `Duration::ZERO` disables pacing.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Set the speed the vehicle starts from.
    ///
    /// # Panics
    ///
    /// Panics if the speed is NaN or infinity
    pub fn with_initial_speed(mut self, speed: f64) -> Self {
        if !speed.is_finite() {
            panic!("Initial speed must be a finite number, got: {}", speed);
        }
        self.initial_speed = speed;
        self
    }

    pub fn controller(&self) -> &ControllerConfig {
        &self.controller
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn initial_speed(&self) -> f64 {
        self.initial_speed
    }
}

/// Complete state of the loop between two iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopState {
    pub current_speed: f64,
    pub pid: PidState,
}

impl LoopState {
    pub fn new(initial_speed: f64) -> Self {
        LoopState {
            current_speed: initial_speed,
            pid: PidState::default(),
        }
    }
}

/// Outcome of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// 1-based iteration index
    pub iteration: u32,
    /// Speed after the plant applied the control signal
    pub speed: f64,
    /// Error the controller acted on (setpoint minus the speed before the step)
    pub error: f64,
    pub control_signal: f64,
    /// Integral accumulated up to and including this step
    pub integral: f64,
}

/// Run one iteration of the loop.
pub fn step(
    controller: &PidController,
    state: LoopState,
    iteration: u32,
) -> (LoopState, StepRecord) {
    let (terms, pid) = controller.compute(state.pid, state.current_speed);
    let current_speed = car_simulation(terms.output, state.current_speed);

    debug!(
        "iteration {}: error={:.4} p={:.4} i={:.4} d={:.4} u={:.4} speed={:.4}",
        iteration,
        terms.error,
        terms.p_term,
        terms.i_term,
        terms.d_term,
        terms.output,
        current_speed
    );

    let record = StepRecord {
        iteration,
        speed: current_speed,
        error: terms.error,
        control_signal: terms.output,
        integral: pid.integral,
    };
    (LoopState { current_speed, pid }, record)
}

/// Iterator over the trajectory of a run. Yields exactly
/// `config.iterations()` records and performs no I/O or sleeping.
#[derive(Debug, Clone)]
pub struct Simulation {
    controller: PidController,
    state: LoopState,
    iteration: u32,
    iterations: u32,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> Self {
        Simulation {
            controller: PidController::new(config.controller.clone()),
            state: LoopState::new(config.initial_speed),
            iteration: 0,
            iterations: config.iterations,
        }
    }

    /// State after the most recently yielded iteration.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of iterations completed so far.
    pub fn completed(&self) -> u32 {
        self.iteration
    }
}

impl Iterator for Simulation {
    type Item = StepRecord;

    fn next(&mut self) -> Option<StepRecord> {
        if self.iteration >= self.iterations {
            return None;
        }
        self.iteration += 1;
        let (state, record) = step(&self.controller, self.state, self.iteration);
        self.state = state;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.iterations - self.iteration) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Simulation {}

/// How a call to [`run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every iteration ran and the completion line was written.
    Completed(SimulationStatistics),
    /// The stop flag was raised before the run finished.
    Interrupted(SimulationStatistics),
}

impl RunOutcome {
    pub fn statistics(&self) -> &SimulationStatistics {
        match self {
            RunOutcome::Completed(stats) | RunOutcome::Interrupted(stats) => stats,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Run the simulation, writing one line per iteration to `out`.
///
/// `stop` is checked before every iteration; once set, the run returns
/// [`RunOutcome::Interrupted`] without writing the completion line. A flag
/// raised after the last iteration has started no longer interrupts the run.
pub fn run<W: Write>(
    config: &SimulationConfig,
    out: &mut W,
    stop: &AtomicBool,
) -> Result<RunOutcome, SimError> {
    info!(
        "starting simulation: kp={} ki={} kd={} target={} iterations={} pause={:?}",
        config.controller.kp(),
        config.controller.ki(),
        config.controller.kd(),
        config.controller.setpoint(),
        config.iterations,
        config.pause
    );

    let mut simulation = Simulation::new(config);
    let mut tracker = StatisticsTracker::new(config.controller.setpoint(), config.initial_speed);

    while simulation.len() > 0 {
        if stop.load(Ordering::Relaxed) {
            out.flush()?;
            warn!(
                "simulation interrupted after {} of {} iterations",
                simulation.completed(),
                config.iterations
            );
            return Ok(RunOutcome::Interrupted(tracker.finish()));
        }

        let Some(record) = simulation.next() else {
            break;
        };
        tracker.record(&record);
        report::write_step(out, &record)?;

        if !config.pause.is_zero() {
            thread::sleep(config.pause);
        }
    }

    report::write_completion(out)?;
    out.flush()?;

    let stats = tracker.finish();
    info!(
        "simulation finished: final speed {:.2}, average |error| {:.2}",
        stats.final_speed, stats.average_error
    );
    Ok(RunOutcome::Completed(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that raises the stop flag once a given iteration line is written.
    struct StopAfter<'a> {
        buf: Vec<u8>,
        marker: String,
        stop: &'a AtomicBool,
    }

    impl<'a> StopAfter<'a> {
        fn new(iteration: u32, stop: &'a AtomicBool) -> Self {
            StopAfter {
                buf: Vec::new(),
                marker: format!("Iterasi {}:", iteration),
                stop,
            }
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.buf).into_owned()
        }
    }

    impl Write for StopAfter<'_> {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            if self.text().contains(&self.marker) {
                self.stop.store(true, Ordering::Relaxed);
            }
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn instant_config() -> SimulationConfig {
        SimulationConfig::new().with_pause(Duration::ZERO)
    }

    #[test]
    fn test_first_iteration() {
        let controller = PidController::new(ControllerConfig::default());
        let (state, record) = step(&controller, LoopState::default(), 1);

        assert_eq!(record.iteration, 1);
        assert_eq!(record.error, 60.0);
        assert!((record.control_signal - 45.0).abs() < 1e-12);
        assert!((record.speed - 4.48).abs() < 1e-12);
        assert_eq!(state.current_speed, record.speed);
        assert_eq!(state.pid.integral, 60.0);
        assert_eq!(state.pid.previous_error, 60.0);
    }

    #[test]
    fn test_step_does_not_touch_input_state() {
        let controller = PidController::new(ControllerConfig::default());
        let state = LoopState::new(30.0);

        let (a, ra) = step(&controller, state, 7);
        let (b, rb) = step(&controller, state, 7);

        assert_eq!(a, b);
        assert_eq!(ra, rb);
        assert_eq!(state.current_speed, 30.0);
    }

    #[test]
    fn test_iteration_count() {
        let simulation = Simulation::new(&instant_config());
        assert_eq!(simulation.len(), 100);

        let records: Vec<_> = simulation.collect();
        assert_eq!(records.len(), 100);
        assert_eq!(records.first().map(|r| r.iteration), Some(1));
        assert_eq!(records.last().map(|r| r.iteration), Some(100));
    }

    #[test]
    fn test_integral_is_sum_of_errors() {
        let mut simulation = Simulation::new(&instant_config());
        let mut error_sum = 0.0;

        while let Some(record) = simulation.next() {
            error_sum += record.error;
            assert_eq!(simulation.state().pid.integral, error_sum);
            assert_eq!(record.integral, error_sum);
            assert_eq!(simulation.state().pid.previous_error, record.error);
        }
        assert_eq!(simulation.completed(), 100);
    }

    #[test]
    fn test_trajectory_stays_bounded() {
        for record in Simulation::new(&instant_config()) {
            assert!(
                (-50.0..=150.0).contains(&record.speed),
                "speed {} escaped the band at iteration {}",
                record.speed,
                record.iteration
            );
        }
    }

    #[test]
    fn test_zero_gains_coast_below_zero() {
        let config = instant_config()
            .with_controller(ControllerConfig::new().with_kp(0.0).with_ki(0.0).with_kd(0.0))
            .with_iterations(10);

        let last = Simulation::new(&config).last().map(|r| r.speed);
        let speed = last.unwrap_or_default();
        assert!((speed - (-0.2)).abs() < 1e-12, "got {}", speed);
    }

    #[test]
    fn test_run_writes_lines_and_completion() {
        let config = instant_config().with_iterations(3);
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let outcome = run(&config, &mut out, &stop).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(outcome.is_completed());
        assert_eq!(outcome.statistics().iterations, 3);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Iterasi 1: Kecepatan = 4.48 km/jam, Error = 60.00");
        assert_eq!(lines[1], "Iterasi 2: Kecepatan = 8.92 km/jam, Error = 55.52");
        assert_eq!(lines[3], "Simulasi selesai.");
    }

    #[test]
    fn test_run_stops_when_flag_is_set() {
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();

        let outcome = run(&instant_config(), &mut out, &stop).unwrap();

        assert!(!outcome.is_completed());
        assert_eq!(outcome.statistics().iterations, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_stop_during_final_iteration_still_completes() {
        let config = instant_config().with_iterations(3);
        let stop = AtomicBool::new(false);
        let mut out = StopAfter::new(3, &stop);

        let outcome = run(&config, &mut out, &stop).unwrap();
        let text = out.text();
        let lines: Vec<&str> = text.lines().collect();

        assert!(stop.load(Ordering::Relaxed));
        assert!(outcome.is_completed());
        assert_eq!(outcome.statistics().iterations, 3);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "Iterasi 3: Kecepatan = 13.61 km/jam, Error = 51.08");
        assert_eq!(lines[3], report::COMPLETION_MESSAGE);
    }

    #[test]
    fn test_stop_mid_run_ends_after_current_iteration() {
        let config = instant_config().with_iterations(10);
        let stop = AtomicBool::new(false);
        let mut out = StopAfter::new(4, &stop);

        let outcome = run(&config, &mut out, &stop).unwrap();
        let text = out.text();
        let lines: Vec<&str> = text.lines().collect();

        assert!(!outcome.is_completed());
        assert_eq!(outcome.statistics().iterations, 4);
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("Iterasi 4: "));
        assert!(!text.contains(report::COMPLETION_MESSAGE));
    }

    #[test]
    fn test_run_respects_pause() {
        let config = SimulationConfig::new()
            .with_iterations(3)
            .with_pause(Duration::from_millis(5));
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();

        let started = std::time::Instant::now();
        run(&config, &mut out, &stop).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(15));
    }
}
