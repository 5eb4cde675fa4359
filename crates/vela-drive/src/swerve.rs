//! The drive subsystem facade.
//!
//! [`Swerve`] ties the drivetrain, pose estimator, gyro, and orientation
//! targeting together behind the interface the rest of the robot program
//! uses: drive commands in, pose and orientation out, with one `periodic`
//! call per control cycle keeping everything coherent.
//!
//! The gyro is never reset to change the robot's notion of "forward".
//! Instead an additive software offset maps the raw gyro angle to the field
//! orientation, so re-zeroing mid-match cannot glitch the heading source
//! that odometry integrates from.

use tracing::{trace, warn};
use vela_hal::{AbsoluteAngleSensor, Gyro, IdleMode, MotorController};
use vela_kinematics::{
    normalize_angle, ChassisSpeeds, ModulePosition, ModuleState, Pose2d, Translation2d,
    MODULE_COUNT,
};

use crate::drive::SwerveDrive;
use crate::error::DriveError;
use crate::estimator::SwervePoseEstimator;
use crate::module::SwerveModule;
use crate::orientation::{OrientationSupplier, OrientationTarget};
use crate::parameters::{RotationalConstraints, SwerveDriveParameters};

/// Hardware handles for one module corner.
pub struct SwerveModuleHardware {
    /// Corner name used in logs, e.g. `"front-left"`.
    pub name: &'static str,
    /// The drive motor.
    pub drive: Box<dyn MotorController>,
    /// The steering motor.
    pub steering: Box<dyn MotorController>,
    /// The absolute steering angle sensor.
    pub angle_sensor: Box<dyn AbsoluteAngleSensor>,
}

/// The complete hardware set of the drive subsystem.
pub struct SwerveHardware {
    /// Module hardware, FL/FR/BL/BR.
    pub modules: [SwerveModuleHardware; MODULE_COUNT],
    /// The chassis yaw gyro.
    pub gyro: Box<dyn Gyro>,
}

/// The drive subsystem: drivetrain, pose estimation, and orientation
/// management.
pub struct Swerve {
    parameters: SwerveDriveParameters,
    drivetrain: SwerveDrive,
    estimator: SwervePoseEstimator,
    gyro: Box<dyn Gyro>,
    /// Latest raw gyro reading (rad, continuous).
    raw_orientation: f64,
    /// Additive offset from raw gyro angle to field orientation.
    raw_orientation_offset: f64,
    /// Field orientation, normalized to `(-PI, PI]`.
    orientation: f64,
    gyro_error: bool,
    orientation_target: OrientationTarget,
}

impl Swerve {
    /// Build the drive subsystem.
    ///
    /// The gyro is zeroed once here; afterwards orientation changes go
    /// through the software offset only.
    ///
    /// # Errors
    ///
    /// Fails if the chassis geometry or derived limits are invalid.
    pub fn new(
        parameters: SwerveDriveParameters,
        hardware: SwerveHardware,
    ) -> Result<Self, DriveError> {
        let SwerveHardware { modules, mut gyro } = hardware;
        let mut gyro_error = false;
        if let Err(err) = gyro.reset() {
            warn!(error = %err, "gyro reset failed at startup");
            gyro_error = true;
        }

        let modules = modules.map(|corner| {
            SwerveModule::new(
                corner.name,
                &parameters,
                corner.drive,
                corner.steering,
                corner.angle_sensor,
            )
        });
        let mut drivetrain = SwerveDrive::new(&parameters, modules)?;

        let positions = drivetrain.module_positions();
        let estimator = SwervePoseEstimator::new(
            parameters.kinematics()?,
            Pose2d::default(),
            0.0,
            positions,
        );

        Ok(Swerve {
            parameters,
            drivetrain,
            estimator,
            gyro,
            raw_orientation: 0.0,
            raw_orientation_offset: 0.0,
            orientation: 0.0,
            gyro_error,
            orientation_target: OrientationTarget::Disabled,
        })
    }

    /// Run one control cycle: refresh the orientation, let the drivetrain do
    /// its housekeeping, then integrate odometry.
    ///
    /// Call once per cycle with a monotonic timestamp in seconds, before any
    /// drive command for that cycle.
    pub fn periodic(&mut self, now: f64) {
        self.update_sensor_state();
        self.drivetrain.periodic();
        let positions = self.drivetrain.module_positions();
        let pose = self.estimator.update(now, self.orientation, &positions);
        trace!(x = pose.x, y = pose.y, theta = pose.theta, "pose updated");
    }

    /// Drive with the given velocities, using the current field orientation
    /// when `field_relative` is set.
    pub fn drive(&mut self, vx: f64, vy: f64, omega: f64, field_relative: bool) {
        self.drivetrain
            .drive(vx, vy, omega, self.orientation, field_relative);
    }

    /// Drive with robot-relative chassis speeds.
    pub fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) {
        self.drivetrain.set_chassis_speeds(speeds);
    }

    /// The measured chassis speeds, recovered from the module sensors.
    pub fn get_chassis_speeds(&mut self) -> ChassisSpeeds {
        self.drivetrain.get_chassis_speeds()
    }

    /// The measured states of the four modules, FL/FR/BL/BR.
    pub fn module_states(&mut self) -> [ModuleState; MODULE_COUNT] {
        self.drivetrain.module_states()
    }

    /// The odometry measurements of the four modules, FL/FR/BL/BR.
    pub fn module_positions(&mut self) -> [ModulePosition; MODULE_COUNT] {
        self.drivetrain.module_positions()
    }

    /// Stop all modules, holding their steering angles.
    pub fn stop(&mut self) {
        self.drivetrain.stop_motor();
    }

    /// Reset the estimated pose to a known field pose.
    ///
    /// The gyro itself is untouched; the orientation offset is recomputed so
    /// the corrected orientation matches the pose heading.
    pub fn reset_position(&mut self, pose: Pose2d) {
        self.refresh_raw_orientation();
        self.raw_orientation_offset = normalize_angle(pose.theta - self.raw_orientation);
        self.orientation = normalize_angle(self.raw_orientation + self.raw_orientation_offset);
        let positions = self.drivetrain.module_positions();
        self.estimator
            .reset_position(pose, self.orientation, positions);
    }

    /// Redefine the current physical heading as `orientation`, keeping the
    /// estimated translation.
    pub fn reset_orientation(&mut self, orientation: f64) {
        let translation = self.estimator.position().translation();
        self.reset_position(Pose2d::new(translation.x, translation.y, orientation));
    }

    /// Blend in a vision pose measurement with the default confidence.
    pub fn add_vision_measurement(&mut self, measurement: Pose2d, timestamp: f64) {
        self.estimator
            .add_vision_measurement(measurement, timestamp, None);
    }

    /// Blend in a vision pose measurement with explicit per-axis standard
    /// deviations `(x, y, θ)`.
    pub fn add_vision_measurement_with_std_devs(
        &mut self,
        measurement: Pose2d,
        timestamp: f64,
        std_devs: [f64; 3],
    ) {
        self.estimator
            .add_vision_measurement(measurement, timestamp, Some(std_devs));
    }

    /// Keep the robot's back pointed at a field position.
    pub fn enable_auto_orientation_target(&mut self, point: Translation2d) {
        self.orientation_target = OrientationTarget::Point(point);
    }

    /// Take goal headings from an external supplier, polled each cycle.
    pub fn enable_auto_orientation(&mut self, supplier: OrientationSupplier) {
        self.orientation_target = OrientationTarget::Supplier(supplier);
    }

    /// Return rotation to manual control.
    pub fn disable_auto_orientation(&mut self) {
        self.orientation_target = OrientationTarget::Disabled;
    }

    /// The goal heading of the active orientation target for the current
    /// pose, or `None` when rotation is manual.
    pub fn target_orientation(&self) -> Option<f64> {
        self.orientation_target
            .target_orientation(&self.estimator.position())
    }

    /// The current field-frame pose estimate.
    pub fn position(&self) -> Pose2d {
        self.estimator.position()
    }

    /// The current field orientation (rad), normalized to `(-PI, PI]`.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Whether the gyro or any module reports a hardware fault.
    pub fn has_error(&self) -> bool {
        self.gyro_error || self.drivetrain.has_error()
    }

    /// Configure the idle behavior of every module.
    pub fn set_idle_mode(&mut self, mode: IdleMode) {
        self.drivetrain.set_idle_mode(mode);
    }

    /// The per-wheel speed limit (m/s).
    pub fn max_speed(&self) -> f64 {
        self.parameters.max_drive_speed()
    }

    /// The chassis acceleration limit (m/s²).
    pub fn max_acceleration(&self) -> f64 {
        self.parameters.max_drive_acceleration()
    }

    /// Limits for an external profiled rotation controller.
    pub fn rotational_constraints(&self) -> RotationalConstraints {
        self.parameters.rotational_constraints()
    }

    fn update_sensor_state(&mut self) {
        self.refresh_raw_orientation();
        self.orientation = normalize_angle(self.raw_orientation + self.raw_orientation_offset);
    }

    fn refresh_raw_orientation(&mut self) {
        match self.gyro.angle() {
            Ok(angle) => {
                self.raw_orientation = angle;
                self.gyro_error = false;
            }
            Err(err) => {
                if !self.gyro_error {
                    warn!(error = %err, "gyro read failed, holding last orientation");
                }
                self.gyro_error = true;
            }
        }
    }
}
