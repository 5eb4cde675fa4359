//! Physical hardware parameter sets.
//!
//! Everything here is resolved once at startup from a fixed enumerated set of
//! hardware configurations and never mutated afterward. The robot-identity
//! selector is deserialized from the configuration file and exchanged for an
//! explicit [`SwerveDriveParameters`] value that is handed into the drivetrain
//! constructor; there is no process-global parameter state.
//!
//! The MK4/MK4i gear ratios are taken from the Swerve Drive Specialties
//! product pages. The theoretical maximum speed and acceleration formulas are
//! the standard FRC drivetrain-characterization ones.

use std::f64::consts::PI;

use serde::Deserialize;
use vela_kinematics::{SwerveKinematics, Translation2d};

use crate::error::DriveError;

/// Wheel diameter shared by the MK4 and MK4i module families (4 in), meters.
const WHEEL_DIAMETER: f64 = 0.1016;

/// Direction the steering motor must rotate, as seen from above, for the
/// wheel to rotate counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    /// Positive output turns the wheel counter-clockwise.
    CounterClockwisePositive,
    /// Positive output turns the wheel clockwise.
    ClockwisePositive,
}

impl MotorDirection {
    /// Sign applied to steering commands: `+1.0` for counter-clockwise
    /// positive, `-1.0` for clockwise positive.
    pub const fn sign(self) -> f64 {
        match self {
            MotorDirection::CounterClockwisePositive => 1.0,
            MotorDirection::ClockwisePositive => -1.0,
        }
    }
}

/// Motor models used on the drivetrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorVariant {
    /// CTRE Falcon 500.
    Falcon500,
    /// CTRE Kraken X60.
    KrakenX60,
    /// REV NEO v1.1.
    NeoV1_1,
}

impl MotorVariant {
    /// Free speed of the motor in RPM.
    pub const fn free_speed_rpm(self) -> f64 {
        match self {
            MotorVariant::Falcon500 => 6380.0,
            MotorVariant::KrakenX60 => 6000.0,
            MotorVariant::NeoV1_1 => 5676.0,
        }
    }

    /// Stall torque of the motor in N·m.
    pub const fn stall_torque(self) -> f64 {
        match self {
            MotorVariant::Falcon500 => 4.69,
            MotorVariant::KrakenX60 => 7.09,
            MotorVariant::NeoV1_1 => 2.6,
        }
    }
}

/// A specific swerve module product in a specific gearing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwerveModuleVariant {
    /// An MK4 module in the L1 configuration.
    Mk4L1,
    /// An MK4 module in the L2 configuration.
    Mk4L2,
    /// An MK4 module in the L3 configuration.
    Mk4L3,
    /// An MK4 module in the L4 configuration.
    Mk4L4,
    /// An MK4i module in the L1 configuration.
    Mk4iL1,
    /// An MK4i module in the L2 configuration.
    Mk4iL2,
    /// An MK4i module in the L2+ configuration.
    Mk4iL2Plus,
    /// An MK4i module in the L3 configuration.
    Mk4iL3,
}

impl SwerveModuleVariant {
    /// The wheel diameter in meters.
    pub const fn wheel_diameter(self) -> f64 {
        WHEEL_DIAMETER
    }

    /// The drive gear ratio (motor rotations per wheel rotation).
    pub const fn drive_gear_ratio(self) -> f64 {
        match self {
            SwerveModuleVariant::Mk4L1 | SwerveModuleVariant::Mk4iL1 => 8.14,
            SwerveModuleVariant::Mk4L2 | SwerveModuleVariant::Mk4iL2 => 6.75,
            SwerveModuleVariant::Mk4L3 | SwerveModuleVariant::Mk4iL3 => 6.12,
            SwerveModuleVariant::Mk4L4 => 5.14,
            SwerveModuleVariant::Mk4iL2Plus => 5.9,
        }
    }

    /// The steering gear ratio (motor rotations per wheel steering rotation).
    pub const fn steering_gear_ratio(self) -> f64 {
        match self {
            SwerveModuleVariant::Mk4L1
            | SwerveModuleVariant::Mk4L2
            | SwerveModuleVariant::Mk4L3
            | SwerveModuleVariant::Mk4L4 => 12.8,
            SwerveModuleVariant::Mk4iL1
            | SwerveModuleVariant::Mk4iL2
            | SwerveModuleVariant::Mk4iL2Plus
            | SwerveModuleVariant::Mk4iL3 => 150.0 / 7.0,
        }
    }

    /// The steering polarity of this module family. The MK4i inverts the
    /// steering stage relative to the MK4.
    pub const fn steering_direction(self) -> MotorDirection {
        match self {
            SwerveModuleVariant::Mk4L1
            | SwerveModuleVariant::Mk4L2
            | SwerveModuleVariant::Mk4L3
            | SwerveModuleVariant::Mk4L4 => MotorDirection::CounterClockwisePositive,
            SwerveModuleVariant::Mk4iL1
            | SwerveModuleVariant::Mk4iL2
            | SwerveModuleVariant::Mk4iL2Plus
            | SwerveModuleVariant::Mk4iL3 => MotorDirection::ClockwisePositive,
        }
    }

    /// Theoretical maximum drive speed in m/s with the given motor.
    pub fn max_drive_speed(self, motor: MotorVariant) -> f64 {
        (motor.free_speed_rpm() * self.wheel_diameter() * PI) / (60.0 * self.drive_gear_ratio())
    }

    /// Theoretical maximum drive acceleration in m/s² with the given motor
    /// and total robot mass (kg, including bumpers and battery).
    pub fn max_drive_acceleration(self, motor: MotorVariant, robot_mass: f64) -> f64 {
        (2.0 * 4.0 * motor.stall_torque() * self.drive_gear_ratio())
            / (self.wheel_diameter() * robot_mass)
    }

    /// Theoretical maximum steering speed in rad/s with the given motor.
    pub fn max_steering_speed(self, motor: MotorVariant) -> f64 {
        (motor.free_speed_rpm() * 2.0 * PI) / (60.0 * self.steering_gear_ratio())
    }
}

/// CAN bus device ids for one module corner.
///
/// Consumed by physical backends when binding vendor devices; carried here so
/// the whole hardware description lives in one persisted parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleCanIds {
    /// Drive motor controller id.
    pub drive: u8,
    /// Steering motor controller id.
    pub steering: u8,
    /// Absolute angle encoder id.
    pub encoder: u8,
}

/// Velocity/acceleration limit pair for the external profiled rotation
/// controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationalConstraints {
    /// Maximum angular velocity (rad/s).
    pub max_velocity: f64,
    /// Maximum angular acceleration (rad/s²).
    pub max_acceleration: f64,
}

/// The complete physical description of one drivetrain build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwerveDriveParameters {
    /// Distance between front and back axles (m).
    pub wheel_base: f64,
    /// Distance between left and right wheels (m).
    pub track_width: f64,
    /// Total robot mass including bumpers and battery (kg).
    pub robot_mass: f64,
    /// The swerve module product and gearing.
    pub module: SwerveModuleVariant,
    /// The drive motor model.
    pub drive_motor: MotorVariant,
    /// The steering motor model.
    pub steering_motor: MotorVariant,
    /// CAN ids per corner, FL/FR/BL/BR.
    pub can_ids: [ModuleCanIds; 4],
}

impl SwerveDriveParameters {
    /// Maximum drive speed of a module in m/s.
    pub fn max_drive_speed(&self) -> f64 {
        self.module.max_drive_speed(self.drive_motor)
    }

    /// Maximum drive acceleration of a module in m/s².
    pub fn max_drive_acceleration(&self) -> f64 {
        self.module.max_drive_acceleration(self.drive_motor, self.robot_mass)
    }

    /// Maximum steering speed of a module in rad/s.
    pub fn max_steering_speed(&self) -> f64 {
        self.module.max_steering_speed(self.steering_motor)
    }

    /// Distance from the robot center to a module (m).
    pub fn wheel_base_radius(&self) -> f64 {
        (self.wheel_base / 2.0).hypot(self.track_width / 2.0)
    }

    /// Limits for the external profiled controller that reaches a goal
    /// orientation, derived from the drive limits at the wheel base radius.
    pub fn rotational_constraints(&self) -> RotationalConstraints {
        let radius = self.wheel_base_radius();
        RotationalConstraints {
            max_velocity: self.max_drive_speed() / radius,
            max_acceleration: self.max_drive_acceleration() / radius,
        }
    }

    /// Build the chassis kinematics for this geometry.
    pub fn kinematics(&self) -> Result<SwerveKinematics, DriveError> {
        Ok(SwerveKinematics::from_chassis_dimensions(
            self.wheel_base,
            self.track_width,
        )?)
    }

    /// Module offsets from the robot center, FL/FR/BL/BR.
    pub fn module_offsets(&self) -> [Translation2d; 4] {
        let half_base = self.wheel_base / 2.0;
        let half_track = self.track_width / 2.0;
        [
            Translation2d::new(half_base, half_track),
            Translation2d::new(half_base, -half_track),
            Translation2d::new(-half_base, half_track),
            Translation2d::new(-half_base, -half_track),
        ]
    }
}

/// Which physical robot this software is running on.
///
/// Selected once at startup from the configuration file; each identity maps
/// to a fixed parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RobotIdentity {
    /// The 2025 practice base.
    PracticeBot2025,
    /// The 2025 competition base.
    CompetitionBot2025,
}

impl RobotIdentity {
    /// Resolve the parameter set for this robot.
    pub fn parameters(self) -> SwerveDriveParameters {
        match self {
            RobotIdentity::PracticeBot2025 => SwerveDriveParameters {
                wheel_base: 0.5715,
                track_width: 0.5715,
                robot_mass: 52.0,
                module: SwerveModuleVariant::Mk4iL2,
                drive_motor: MotorVariant::KrakenX60,
                steering_motor: MotorVariant::NeoV1_1,
                can_ids: CAN_IDS,
            },
            RobotIdentity::CompetitionBot2025 => SwerveDriveParameters {
                wheel_base: 0.5715,
                track_width: 0.5715,
                robot_mass: 55.3,
                module: SwerveModuleVariant::Mk4iL3,
                drive_motor: MotorVariant::KrakenX60,
                steering_motor: MotorVariant::NeoV1_1,
                can_ids: CAN_IDS,
            },
        }
    }
}

/// CAN id block shared by both 2025 bases, FL/FR/BL/BR.
const CAN_IDS: [ModuleCanIds; 4] = [
    ModuleCanIds { drive: 1, steering: 2, encoder: 9 },
    ModuleCanIds { drive: 3, steering: 4, encoder: 10 },
    ModuleCanIds { drive: 5, steering: 6, encoder: 11 },
    ModuleCanIds { drive: 7, steering: 8, encoder: 12 },
];
