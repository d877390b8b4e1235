// cruise-pid: a discrete PID cruise-control simulation written in Rust
// Copyright (c) 2025 Security Union LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

pub mod plant;
pub mod report;
pub mod simulation;
pub mod statistics;

pub use plant::car_simulation;
pub use simulation::{
    run, step, LoopState, RunOutcome, SimError, Simulation, SimulationConfig, StepRecord,
};
pub use statistics::SimulationStatistics;

/// Proportional gain used by the cruise-control demo.
pub const DEFAULT_KP: f64 = 0.6;
/// Integral gain used by the cruise-control demo.
pub const DEFAULT_KI: f64 = 0.1;
/// Derivative gain used by the cruise-control demo.
pub const DEFAULT_KD: f64 = 0.05;
/// Target speed in km/h.
pub const DEFAULT_TARGET_SPEED: f64 = 60.0;

/// Configuration for a PID controller.
///
/// Uses a builder pattern to configure the controller parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    kp: f64,       // Proportional gain
    ki: f64,       // Integral gain
    kd: f64,       // Derivative gain
    setpoint: f64, // Target value
}

/// Error type for PID controller validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PidError {
    /// Invalid parameter value (NaN or infinity)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
            kd: DEFAULT_KD,
            setpoint: DEFAULT_TARGET_SPEED,
        }
    }
}

impl ControllerConfig {
    /// Create a new configuration holding the cruise-control defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proportional gain (Kp).
    ///
    /// # Panics
    ///
    /// Panics if the value is NaN or infinity
    pub fn with_kp(mut self, kp: f64) -> Self {
        if !kp.is_finite() {
            panic!("Kp must be a finite number, got: {}", kp);
        }
        self.kp = kp;
        self
    }

    /// Set the integral gain (Ki).
    ///
    /// # Panics
    ///
    /// Panics if the value is NaN or infinity
    pub fn with_ki(mut self, ki: f64) -> Self {
        if !ki.is_finite() {
            panic!("Ki must be a finite number, got: {}", ki);
        }
        self.ki = ki;
        self
    }

    /// Set the derivative gain (Kd).
    ///
    /// # Panics
    ///
    /// Panics if the value is NaN or infinity
    pub fn with_kd(mut self, kd: f64) -> Self {
        if !kd.is_finite() {
            panic!("Kd must be a finite number, got: {}", kd);
        }
        self.kd = kd;
        self
    }

    /// Set the setpoint (target value).
    ///
    /// # Panics
    ///
    /// Panics if the setpoint is NaN or infinity
    pub fn with_setpoint(mut self, setpoint: f64) -> Self {
        if !setpoint.is_finite() {
            panic!("Setpoint must be a finite number, got: {}", setpoint);
        }
        self.setpoint = setpoint;
        self
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }
}

/// Memory a PID controller carries from one step to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Sum of every error seen so far. Never decays and is never clamped.
    pub integral: f64,
    /// Error of the previous step, used by the derivative term.
    pub previous_error: f64,
}

/// Breakdown of a single controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidTerms {
    pub error: f64,
    pub p_term: f64,
    pub i_term: f64,
    pub d_term: f64,
    pub output: f64,
}

/// A discrete PID controller with a unit time step.
///
/// The controller holds only its configuration; the accumulated state is
/// passed in and handed back on every call, so `compute` is pure:
///
/// u\[k\] = Kp * e\[k\] + Ki * Σe\[0..=k\] + Kd * (e\[k\] - e\[k-1\])
///
/// Where:
/// - e\[k\] is the error (setpoint - process_value)
/// - Kp, Ki, Kd are the proportional, integral, and derivative gains
#[derive(Debug, Clone)]
pub struct PidController {
    config: ControllerConfig,
}

impl PidController {
    /// Create a new PID controller with the given configuration.
    pub fn new(config: ControllerConfig) -> Self {
        PidController { config }
    }

    /// Compute the control output for the current process value.
    ///
    /// # Arguments
    /// * `state` - Controller memory from the previous step
    /// * `process_value` - The current measured value of the process variable
    ///
    /// # Returns
    /// The evaluated terms and the state to feed into the next call.
    pub fn compute(&self, state: PidState, process_value: f64) -> (PidTerms, PidState) {
        let error = self.config.setpoint - process_value;

        let p_term = self.config.kp * error;

        let integral = state.integral + error;
        let i_term = self.config.ki * integral;

        let d_term = self.config.kd * (error - state.previous_error);

        let output = p_term + i_term + d_term;

        let terms = PidTerms {
            error,
            p_term,
            i_term,
            d_term,
            output,
        };
        let next = PidState {
            integral,
            previous_error: error,
        };
        (terms, next)
    }

    /// Set the proportional gain (Kp).
    ///
    /// Negative values are allowed for specialized applications.
    pub fn set_kp(&mut self, kp: f64) -> Result<(), PidError> {
        if !kp.is_finite() {
            return Err(PidError::InvalidParameter("kp must be a finite number"));
        }
        self.config.kp = kp;
        Ok(())
    }

    /// Set the integral gain (Ki).
    pub fn set_ki(&mut self, ki: f64) -> Result<(), PidError> {
        if !ki.is_finite() {
            return Err(PidError::InvalidParameter("ki must be a finite number"));
        }
        self.config.ki = ki;
        Ok(())
    }

    /// Set the derivative gain (Kd).
    pub fn set_kd(&mut self, kd: f64) -> Result<(), PidError> {
        if !kd.is_finite() {
            return Err(PidError::InvalidParameter("kd must be a finite number"));
        }
        self.config.kd = kd;
        Ok(())
    }

    /// Set the setpoint (target value).
    pub fn set_setpoint(&mut self, setpoint: f64) -> Result<(), PidError> {
        if !setpoint.is_finite() {
            return Err(PidError::InvalidParameter(
                "setpoint must be a finite number",
            ));
        }

        self.config.setpoint = setpoint;
        Ok(())
    }

    /// Get the setpoint (target value).
    pub fn setpoint(&self) -> f64 {
        self.config.setpoint
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
