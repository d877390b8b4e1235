//! Toy vehicle speed model standing in for real longitudinal dynamics.

/// Speed gained per unit of gas input in one step.
pub const ACCELERATION_FACTOR: f64 = 0.1;

/// Constant speed lost to friction every step, regardless of speed or input sign.
pub const FRICTION: f64 = 0.02;

/// Advance the vehicle speed by one step.
///
/// There is no floor and no saturation: a sufficiently negative `gas_input`
/// drives the speed below zero.
pub fn car_simulation(gas_input: f64, speed_in: f64) -> f64 {
    let acceleration = gas_input * ACCELERATION_FACTOR;
    speed_in + acceleration - FRICTION
}
