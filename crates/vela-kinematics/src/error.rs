#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines error types that can occur during kinematic calculations
//! and transformations.

use core::fmt;

/// Errors that can occur in kinematic calculations.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for degenerate module geometry.
    /// This variant is returned when the module offsets cannot distinguish
    /// rotation from translation (e.g. all offsets at the robot center).
    DegenerateGeometry(&'static str),
    /// Error for an invalid maximum speed.
    /// This variant is returned when a non-positive maximum wheel speed is
    /// used to desaturate module states.
    InvalidMaxSpeed(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::DegenerateGeometry(msg) => {
                write!(f, "Degenerate module geometry: {}", msg)
            }
            KinematicsError::InvalidMaxSpeed(msg) => write!(f, "Invalid maximum speed: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
