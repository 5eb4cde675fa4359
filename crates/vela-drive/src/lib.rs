#![warn(missing_docs)]

//! Swerve drivetrain core.
//!
//! This crate layers the pieces of a swerve drive on top of the pure
//! kinematics from `vela-kinematics` and the hardware traits from
//! `vela-hal`:
//!
//! - [`SwerveModule`]: control and measurement of one module corner.
//! - [`SwerveDrive`]: chassis-level orchestration of the four modules.
//! - [`SwervePoseEstimator`]: odometry with latency-compensated vision
//!   fusion.
//! - [`Swerve`]: the drive subsystem facade combining all of the above with
//!   gyro orientation management and automatic orientation targets.
//!
//! Hardware parameter sets for the supported robot builds live in
//! [`parameters`].

pub mod drive;
pub mod error;
pub mod estimator;
pub mod module;
pub mod orientation;
pub mod parameters;
pub mod swerve;

pub use drive::SwerveDrive;
pub use error::DriveError;
pub use estimator::SwervePoseEstimator;
pub use module::SwerveModule;
pub use orientation::{OrientationSupplier, OrientationTarget};
pub use parameters::{
    ModuleCanIds, MotorDirection, MotorVariant, RobotIdentity, RotationalConstraints,
    SwerveDriveParameters, SwerveModuleVariant,
};
pub use swerve::{Swerve, SwerveHardware, SwerveModuleHardware};
