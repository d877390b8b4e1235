use crate::simulation::StepRecord;

/// Fraction of the setpoint used as the default settle band.
pub const DEFAULT_SETTLE_FRACTION: f64 = 0.05;

/// Statistics about how the loop tracked its setpoint.
///
/// Everything is counted in iterations rather than wall-clock time, so the
/// numbers are identical whether or not the run was paced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStatistics {
    pub iterations: u32,
    pub average_error: f64, // Mean absolute error
    pub max_overshoot: f64, // Largest excursion above the setpoint
    pub rise_iteration: Option<u32>, // First iteration inside the settle band
    pub settling_iteration: Option<u32>, // Start of the final in-band stretch
    pub final_speed: f64,
}

/// Folds step records into [`SimulationStatistics`].
#[derive(Debug, Clone)]
pub struct StatisticsTracker {
    setpoint: f64,
    settled_threshold: f64,
    error_sum: f64,
    error_count: u32,
    max_overshoot: f64,
    rise_iteration: Option<u32>,
    settling_iteration: Option<u32>,
    final_speed: f64,
}

impl StatisticsTracker {
    /// Create a tracker using a band of 5% of the setpoint.
    pub fn new(setpoint: f64, initial_speed: f64) -> Self {
        Self::with_threshold(setpoint, initial_speed, DEFAULT_SETTLE_FRACTION * setpoint.abs())
    }

    pub fn with_threshold(setpoint: f64, initial_speed: f64, settled_threshold: f64) -> Self {
        StatisticsTracker {
            setpoint,
            settled_threshold: settled_threshold.abs(),
            error_sum: 0.0,
            error_count: 0,
            max_overshoot: 0.0,
            rise_iteration: None,
            settling_iteration: None,
            final_speed: initial_speed,
        }
    }

    pub fn record(&mut self, step: &StepRecord) {
        self.error_sum += step.error.abs();
        self.error_count += 1;
        self.final_speed = step.speed;

        let overshoot = step.speed - self.setpoint;
        if overshoot > self.max_overshoot {
            self.max_overshoot = overshoot;
        }

        // Judge the speed the step produced, not the error that drove it
        let residual = (self.setpoint - step.speed).abs();
        if residual <= self.settled_threshold {
            if self.rise_iteration.is_none() {
                self.rise_iteration = Some(step.iteration);
            }
            if self.settling_iteration.is_none() {
                self.settling_iteration = Some(step.iteration);
            }
        } else {
            // Leaving the band after settling restarts the clock
            self.settling_iteration = None;
        }
    }

    pub fn finish(&self) -> SimulationStatistics {
        let average_error = if self.error_count > 0 {
            self.error_sum / self.error_count as f64
        } else {
            0.0
        };

        SimulationStatistics {
            iterations: self.error_count,
            average_error,
            max_overshoot: self.max_overshoot,
            rise_iteration: self.rise_iteration,
            settling_iteration: self.settling_iteration,
            final_speed: self.final_speed,
        }
    }
}

impl SimulationStatistics {
    /// Compute statistics for an already collected trajectory.
    pub fn from_records(setpoint: f64, initial_speed: f64, records: &[StepRecord]) -> Self {
        let mut tracker = StatisticsTracker::new(setpoint, initial_speed);
        for record in records {
            tracker.record(record);
        }
        tracker.finish()
    }
}
