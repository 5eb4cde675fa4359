#![warn(missing_docs)]

//! Hardware capability traits for the vela drivetrain.
//!
//! The drivetrain core never touches vendor SDK objects directly; it consumes
//! these narrow capability traits instead. Physical backends wrap real motor
//! controllers and sensors, while the [`sim`] module provides simulated
//! implementations so kinematics and odometry are unit-testable without
//! hardware.
//!
//! Every read and write returns a [`HalError`] on failure. A failed read is a
//! degraded condition, not a fatal one: callers reuse the last good value and
//! expose an error flag for higher layers.

pub mod error;
pub mod sim;

pub use error::HalError;

/// Idle behavior of a motor when no output is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleMode {
    /// Short the windings so the motor resists motion.
    Brake,
    /// Let the motor spin freely.
    Coast,
}

/// A relative encoder attached to a motor's rotor.
///
/// Positions and velocities are measured at the motor shaft, before any
/// gearing; the drivetrain applies gear-ratio conversions itself.
pub trait RelativeEncoder {
    /// Cumulative rotor position in rotations (signed).
    fn position(&self) -> Result<f64, HalError>;

    /// Rotor velocity in rotations per second (signed).
    fn velocity(&self) -> Result<f64, HalError>;
}

/// A motor controller with an integrated relative encoder.
pub trait MotorController {
    /// Run the closed-loop velocity controller toward the given rotor
    /// velocity in rotations per second.
    fn set_velocity(&mut self, velocity: f64) -> Result<(), HalError>;

    /// Apply a raw output voltage, bypassing closed-loop control.
    fn set_voltage(&mut self, volts: f64) -> Result<(), HalError>;

    /// The relative encoder integrated into this controller.
    fn encoder(&self) -> &dyn RelativeEncoder;

    /// Set the idle behavior applied when output is zero.
    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), HalError>;
}

/// An absolute angle sensor (e.g. a steering CANcoder).
///
/// Unlike a relative encoder, the reported angle survives power cycles, which
/// is why steering angles come from this sensor and not the steering motor's
/// rotor encoder.
pub trait AbsoluteAngleSensor {
    /// The absolute angle in radians, refreshed on demand.
    fn absolute_angle(&self) -> Result<f64, HalError>;

    /// The angular velocity in radians per second, refreshed on demand.
    fn angular_velocity(&self) -> Result<f64, HalError>;
}

/// A yaw-rate gyro.
pub trait Gyro {
    /// The accumulated yaw angle in radians. Continuous (not wrapped), so
    /// multiple full rotations keep accumulating.
    fn angle(&self) -> Result<f64, HalError>;

    /// Zero the accumulated yaw angle.
    fn reset(&mut self) -> Result<(), HalError>;
}
