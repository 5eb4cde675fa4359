//! Control and measurement of a single swerve module corner.
//!
//! A module owns its drive motor, steering motor, and absolute steering
//! sensor through the capability traits, so the same code runs against real
//! hardware and the simulated backends.
//!
//! Sensor reads fall back to the last good measurement on failure. The module
//! keeps commanding motors with degraded data and raises an error flag so the
//! higher layers can surface the fault without stopping the robot.

use std::f64::consts::{PI, TAU};

use tracing::warn;
use vela_hal::{AbsoluteAngleSensor, HalError, IdleMode, MotorController, RelativeEncoder};
use vela_kinematics::{angle_diff, ModulePosition, ModuleState};

use crate::parameters::SwerveDriveParameters;

/// Below this wheel speed (m/s) a command is treated as a stop and the
/// steering angle is held rather than snapped to the command's angle 0.
const SPEED_DEADBAND: f64 = 1e-3;

/// Proportional gain for the steering angle loop, in (rad/s) per rad of
/// wheel-angle error.
const STEERING_KP: f64 = 8.0;

/// One corner of the drivetrain: drive motor, steering motor, and absolute
/// angle sensor, plus the gearing needed to convert between rotor units and
/// wheel units.
pub struct SwerveModule {
    name: &'static str,
    drive_motor: Box<dyn MotorController>,
    steering_motor: Box<dyn MotorController>,
    angle_sensor: Box<dyn AbsoluteAngleSensor>,
    /// Drive rotor rotations per meter of wheel travel.
    drive_rotations_per_meter: f64,
    /// Steering rotor rotations per wheel steering rotation.
    steering_ratio: f64,
    /// Sign relating positive steering output to counter-clockwise wheel
    /// rotation.
    steering_sign: f64,
    /// Steering speed limit at the wheel (rad/s).
    max_steering_speed: f64,
    last_angle: f64,
    last_state: ModuleState,
    last_position: ModulePosition,
    error: bool,
}

impl SwerveModule {
    /// Build a module from its hardware handles and the shared drivetrain
    /// parameters.
    pub fn new(
        name: &'static str,
        parameters: &SwerveDriveParameters,
        drive_motor: Box<dyn MotorController>,
        steering_motor: Box<dyn MotorController>,
        angle_sensor: Box<dyn AbsoluteAngleSensor>,
    ) -> Self {
        let variant = parameters.module;
        SwerveModule {
            name,
            drive_motor,
            steering_motor,
            angle_sensor,
            drive_rotations_per_meter: variant.drive_gear_ratio()
                / (variant.wheel_diameter() * PI),
            steering_ratio: variant.steering_gear_ratio(),
            steering_sign: variant.steering_direction().sign(),
            max_steering_speed: parameters.max_steering_speed(),
            last_angle: 0.0,
            last_state: ModuleState::default(),
            last_position: ModulePosition::default(),
            error: false,
        }
    }

    /// Command the module toward the desired state.
    ///
    /// Near-zero speed commands hold the current steering angle instead of
    /// rotating the wheel back to the command's default angle. Otherwise the
    /// state is optimized against the measured angle so the wheel never turns
    /// more than a quarter rotation.
    pub fn set_desired_state(&mut self, desired: ModuleState) {
        let measured_angle = self.read_angle();

        let target = if desired.speed.abs() < SPEED_DEADBAND {
            ModuleState::new(0.0, self.last_angle)
        } else {
            desired.optimize(measured_angle)
        };
        self.last_angle = target.angle;

        let drive_rps = target.speed * self.drive_rotations_per_meter;
        if let Err(err) = self.drive_motor.set_velocity(drive_rps) {
            self.report(err, "drive command failed");
        }

        // Proportional loop on the wheel angle, commanding steering rotor
        // velocity. The error is the shortest path, so the loop never winds
        // up across the ±180° seam.
        let angle_error = angle_diff(measured_angle, target.angle);
        let wheel_rate = (STEERING_KP * angle_error)
            .clamp(-self.max_steering_speed, self.max_steering_speed);
        let steering_rps = self.steering_sign * wheel_rate * self.steering_ratio / TAU;
        if let Err(err) = self.steering_motor.set_velocity(steering_rps) {
            self.report(err, "steering command failed");
        }
    }

    /// The measured state of the module: wheel speed and steering angle.
    pub fn state(&mut self) -> ModuleState {
        let angle = self.read_angle();
        match self.drive_motor.encoder().velocity() {
            Ok(rotor_rps) => {
                let state = ModuleState::new(rotor_rps / self.drive_rotations_per_meter, angle);
                self.last_state = state;
                state
            }
            Err(err) => {
                self.report(err, "drive velocity read failed");
                self.last_state
            }
        }
    }

    /// The odometry measurement of the module: cumulative wheel distance and
    /// steering angle.
    pub fn position(&mut self) -> ModulePosition {
        let angle = self.read_angle();
        match self.drive_motor.encoder().position() {
            Ok(rotor_rotations) => {
                let position =
                    ModulePosition::new(rotor_rotations / self.drive_rotations_per_meter, angle);
                self.last_position = position;
                position
            }
            Err(err) => {
                self.report(err, "drive position read failed");
                self.last_position
            }
        }
    }

    /// Stop both motors.
    pub fn stop(&mut self) {
        self.last_angle = self.read_angle();
        if let Err(err) = self.drive_motor.set_velocity(0.0) {
            self.report(err, "drive stop failed");
        }
        if let Err(err) = self.steering_motor.set_velocity(0.0) {
            self.report(err, "steering stop failed");
        }
    }

    /// Configure the idle behavior of both motors.
    pub fn set_idle_mode(&mut self, mode: IdleMode) {
        if let Err(err) = self.drive_motor.set_idle_mode(mode) {
            self.report(err, "drive idle mode failed");
        }
        if let Err(err) = self.steering_motor.set_idle_mode(mode) {
            self.report(err, "steering idle mode failed");
        }
    }

    /// Whether any hardware operation has failed since the last fully
    /// successful sensor cycle.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// The last steering angle this module committed to, used when holding
    /// position through a stop.
    pub fn commanded_angle(&self) -> f64 {
        self.last_angle
    }

    /// Read the absolute steering angle, falling back to the last good value
    /// on failure. A successful read clears the error flag.
    fn read_angle(&mut self) -> f64 {
        match self.angle_sensor.absolute_angle() {
            Ok(angle) => {
                self.error = false;
                angle
            }
            Err(err) => {
                self.report(err, "angle read failed");
                self.last_angle
            }
        }
    }

    fn report(&mut self, err: HalError, context: &'static str) {
        if !self.error {
            warn!(module = self.name, error = %err, context);
        }
        self.error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    use vela_hal::sim::{SimAngleSensor, SimMotor};

    use crate::parameters::RobotIdentity;

    struct Rig {
        module: SwerveModule,
        drive: SimMotor,
        steering: SimMotor,
        sensor: SimAngleSensor,
    }

    fn rig() -> Rig {
        let params = RobotIdentity::PracticeBot2025.parameters();
        let drive = SimMotor::new("fl-drive");
        let steering = SimMotor::new("fl-steer");
        let sensor = SimAngleSensor::new("fl-encoder");
        let module = SwerveModule::new(
            "front-left",
            &params,
            Box::new(drive.clone()),
            Box::new(steering.clone()),
            Box::new(sensor.clone()),
        );
        Rig {
            module,
            drive,
            steering,
            sensor,
        }
    }

    #[test]
    fn forward_command_drives_at_gear_ratio() {
        let mut rig = rig();
        // MK4i L2: 6.75:1 on a 4 in wheel. 1 m/s of wheel speed is
        // 6.75 / (0.1016 * PI) ≈ 21.15 rotor rps.
        rig.module.set_desired_state(ModuleState::new(1.0, 0.0));
        let expected = 6.75 / (0.1016 * PI);
        assert_relative_eq!(rig.drive.commanded_velocity(), expected, epsilon = 1e-9);
        // Wheel already at angle 0, so the steering loop commands nothing.
        assert_relative_eq!(rig.steering.commanded_velocity(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn steering_error_produces_clamped_rotor_command() {
        let mut rig = rig();
        rig.sensor.set_angle(0.0);
        rig.module.set_desired_state(ModuleState::new(1.0, FRAC_PI_2));
        // Quarter-turn error, below the steering speed limit: the loop
        // commands kp * error at the wheel, geared up at the rotor.
        let params = RobotIdentity::PracticeBot2025.parameters();
        let wheel_rate = STEERING_KP * FRAC_PI_2;
        assert!(wheel_rate < params.max_steering_speed());
        let expected_rps = wheel_rate * params.module.steering_gear_ratio() / TAU;
        // MK4i steering is clockwise positive, so the rotor command is negative.
        assert_relative_eq!(
            rig.steering.commanded_velocity(),
            -expected_rps,
            epsilon = 1e-9
        );
    }

    #[test]
    fn reversal_optimizes_instead_of_half_turn() {
        let mut rig = rig();
        rig.sensor.set_angle(0.0);
        // Target PI is a half turn away: drive backward at angle 0 instead.
        rig.module.set_desired_state(ModuleState::new(2.0, PI));
        assert!(rig.drive.commanded_velocity() < 0.0);
        assert_relative_eq!(rig.module.commanded_angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn near_zero_speed_holds_last_angle() {
        let mut rig = rig();
        rig.sensor.set_angle(FRAC_PI_2);
        rig.module
            .set_desired_state(ModuleState::new(1.0, FRAC_PI_2));
        assert_relative_eq!(rig.module.commanded_angle(), FRAC_PI_2, epsilon = 1e-9);

        // Stopping must not rotate the wheel back toward zero.
        rig.module.set_desired_state(ModuleState::new(0.0, 0.0));
        assert_relative_eq!(rig.module.commanded_angle(), FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(rig.drive.commanded_velocity(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn position_converts_rotor_rotations_to_meters() {
        let mut rig = rig();
        rig.drive.set_velocity(6.75 / (0.1016 * PI)).unwrap();
        rig.drive.step(2.0);
        rig.sensor.set_angle(0.3);
        let position = rig.module.position();
        // 2 s at exactly 1 m/s of wheel speed.
        assert_relative_eq!(position.distance, 2.0, epsilon = 1e-9);
        assert_relative_eq!(position.angle, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn sensor_fault_falls_back_and_flags() {
        let mut rig = rig();
        rig.sensor.set_angle(0.7);
        let state = rig.module.state();
        assert_relative_eq!(state.angle, 0.7, epsilon = 1e-9);
        assert!(!rig.module.has_error());

        rig.sensor.fail();
        let degraded = rig.module.state();
        assert!(rig.module.has_error());
        // Last good angle is reused (the commanded angle fallback).
        assert_relative_eq!(degraded.speed, state.speed, epsilon = 1e-9);

        rig.sensor.restore();
        rig.module.state();
        assert!(!rig.module.has_error());
    }

    #[test]
    fn idle_mode_propagates_to_both_motors() {
        let mut rig = rig();
        rig.module.set_idle_mode(IdleMode::Brake);
        assert_eq!(rig.drive.idle_mode(), IdleMode::Brake);
        assert_eq!(rig.steering.idle_mode(), IdleMode::Brake);
    }
}
