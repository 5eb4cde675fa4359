//! Simulated robot rig for the demo binary.
//!
//! Wires the drive subsystem to simulated motors and sensors and closes the
//! physics loop: steering rotors move the reported wheel angles, drive rotors
//! accumulate wheel distance, and the gyro integrates the chassis yaw rate
//! recovered from the simulated wheels.

use std::f64::consts::{PI, TAU};

use vela_drive::{Swerve, SwerveDriveParameters, SwerveHardware, SwerveModuleHardware};
use vela_hal::sim::{SimAngleSensor, SimGyro, SimMotor};
use vela_hal::{MotorController, RelativeEncoder};
use vela_kinematics::{ModuleState, SwerveKinematics, MODULE_COUNT};

struct SimCorner {
    drive: SimMotor,
    steering: SimMotor,
    sensor: SimAngleSensor,
}

/// The drive subsystem plus handles to its simulated hardware.
pub struct SimRig {
    pub swerve: Swerve,
    corners: [SimCorner; MODULE_COUNT],
    gyro: SimGyro,
    kinematics: SwerveKinematics,
    drive_rotations_per_meter: f64,
    steering_ratio: f64,
    steering_sign: f64,
    yaw: f64,
}

impl SimRig {
    /// Build the rig for the given parameter set.
    pub fn new(parameters: SwerveDriveParameters) -> Result<Self, vela_drive::DriveError> {
        let names = ["front-left", "front-right", "back-left", "back-right"];
        let mut handles = Vec::with_capacity(MODULE_COUNT);
        let modules = names.map(|name| {
            let drive = SimMotor::new(name);
            let steering = SimMotor::new(name);
            let sensor = SimAngleSensor::new(name);
            handles.push(SimCorner {
                drive: drive.clone(),
                steering: steering.clone(),
                sensor: sensor.clone(),
            });
            SwerveModuleHardware {
                name,
                drive: Box::new(drive) as Box<dyn MotorController>,
                steering: Box::new(steering),
                angle_sensor: Box::new(sensor),
            }
        });
        let gyro = SimGyro::new("gyro");
        let hardware = SwerveHardware {
            modules,
            gyro: Box::new(gyro.clone()),
        };

        let kinematics = parameters.kinematics()?;
        let variant = parameters.module;
        let corners = match <[SimCorner; MODULE_COUNT]>::try_from(handles) {
            Ok(corners) => corners,
            Err(_) => unreachable!("exactly four corners are constructed"),
        };
        Ok(SimRig {
            swerve: Swerve::new(parameters, hardware)?,
            corners,
            gyro,
            kinematics,
            drive_rotations_per_meter: variant.drive_gear_ratio()
                / (variant.wheel_diameter() * PI),
            steering_ratio: variant.steering_gear_ratio(),
            steering_sign: variant.steering_direction().sign(),
            yaw: 0.0,
        })
    }

    /// Advance the simulated hardware by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let mut states = [ModuleState::default(); MODULE_COUNT];
        for (corner, state) in self.corners.iter().zip(states.iter_mut()) {
            corner.drive.step(dt);
            corner.steering.step(dt);

            // The absolute sensor reports the wheel angle implied by the
            // steering rotor position.
            let rotor_rotations = corner
                .steering
                .encoder()
                .position()
                .unwrap_or_default();
            let wheel_angle = self.steering_sign * rotor_rotations * TAU / self.steering_ratio;
            corner.sensor.set_angle(wheel_angle);

            let rotor_rps = corner.drive.encoder().velocity().unwrap_or_default();
            *state = ModuleState::new(rotor_rps / self.drive_rotations_per_meter, wheel_angle);
        }

        // Integrate chassis yaw from the wheels so the gyro stays consistent
        // with what the modules are actually doing.
        let speeds = self.kinematics.to_chassis_speeds(&states);
        self.yaw += speeds.omega * dt;
        self.gyro.set_angle(self.yaw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_drive::RobotIdentity;
    use vela_kinematics::Pose2d;

    #[test]
    fn closed_loop_tracks_forward_command() {
        let mut rig = SimRig::new(RobotIdentity::PracticeBot2025.parameters()).unwrap();
        rig.swerve.reset_position(Pose2d::default());
        let dt = 0.02;
        let mut now = 0.0;
        for _ in 0..100 {
            now += dt;
            rig.step(dt);
            rig.swerve.periodic(now);
            rig.swerve.drive(1.0, 0.0, 0.0, true);
        }
        let pose = rig.swerve.position();
        // Wheels start at angle 0, so the robot tracks close to 2 m of
        // forward travel with negligible sideways drift.
        assert!((pose.x - 2.0).abs() < 0.1, "pose {pose}");
        assert!(pose.y.abs() < 0.05, "pose {pose}");
        assert!(!rig.swerve.has_error());
    }

    #[test]
    fn rotation_command_turns_the_gyro() {
        let mut rig = SimRig::new(RobotIdentity::PracticeBot2025.parameters()).unwrap();
        rig.swerve.reset_position(Pose2d::default());
        let dt = 0.02;
        let mut now = 0.0;
        for _ in 0..200 {
            now += dt;
            rig.step(dt);
            rig.swerve.periodic(now);
            rig.swerve.drive(0.0, 0.0, 0.5, false);
        }
        // The wheels must settle tangential and spin the chassis.
        assert!(rig.swerve.orientation() > 0.5, "orientation {}", rig.swerve.orientation());
    }
}
