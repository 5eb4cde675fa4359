//! Error types for drivetrain construction.
//!
//! Configuration problems are fatal and surface at construction time; runtime
//! hardware failures are degraded conditions reported through per-module
//! error flags instead (see [`crate::SwerveModule::has_error`]).

use thiserror::Error;
use vela_kinematics::KinematicsError;

/// Errors that can occur while constructing the drivetrain.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriveError {
    /// The drive geometry is unusable for kinematics.
    #[error("invalid drive geometry: {0}")]
    Kinematics(#[from] KinematicsError),
    /// A parameter set produced a non-positive speed or acceleration limit.
    #[error("invalid drive parameters: {0}")]
    InvalidParameters(&'static str),
}
