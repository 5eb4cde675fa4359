//! Chassis-level orchestration of the four swerve modules.

use tracing::warn;
use vela_hal::IdleMode;
use vela_kinematics::{
    ChassisSpeeds, ModulePosition, ModuleState, SwerveKinematics, MODULE_COUNT,
};

use crate::error::DriveError;
use crate::module::SwerveModule;
use crate::parameters::SwerveDriveParameters;

/// The four-module drivetrain: kinematics plus module dispatch.
///
/// Module arrays are ordered front-left, front-right, back-left, back-right
/// throughout.
pub struct SwerveDrive {
    modules: [SwerveModule; MODULE_COUNT],
    kinematics: SwerveKinematics,
    max_speed: f64,
}

impl SwerveDrive {
    /// Build the drivetrain from its modules and the shared parameters.
    ///
    /// # Errors
    ///
    /// Fails if the chassis geometry is degenerate or the derived speed
    /// limit is not positive.
    pub fn new(
        parameters: &SwerveDriveParameters,
        modules: [SwerveModule; MODULE_COUNT],
    ) -> Result<Self, DriveError> {
        let kinematics = parameters.kinematics()?;
        let max_speed = parameters.max_drive_speed();
        if max_speed <= 0.0 {
            return Err(DriveError::InvalidParameters(
                "maximum drive speed must be positive",
            ));
        }
        Ok(SwerveDrive {
            modules,
            kinematics,
            max_speed,
        })
    }

    /// Drive with the given velocities.
    ///
    /// When `field_relative` is set, `vx` and `vy` are field-frame velocities
    /// and are rotated into the robot frame using `heading`; otherwise they
    /// are robot-frame velocities and `heading` is ignored.
    pub fn drive(&mut self, vx: f64, vy: f64, omega: f64, heading: f64, field_relative: bool) {
        let speeds = if field_relative {
            ChassisSpeeds::from_field_relative(vx, vy, omega, heading)
        } else {
            ChassisSpeeds::new(vx, vy, omega)
        };
        self.set_chassis_speeds(speeds);
    }

    /// Drive with robot-relative chassis speeds.
    pub fn set_chassis_speeds(&mut self, speeds: ChassisSpeeds) {
        let states = self.kinematics.to_module_states(speeds);
        self.set_module_states(states);
    }

    /// Command raw module states, desaturating first so no wheel is asked to
    /// exceed the physical speed limit.
    pub fn set_module_states(&mut self, mut states: [ModuleState; MODULE_COUNT]) {
        if let Err(err) = SwerveKinematics::desaturate(&mut states, self.max_speed) {
            warn!(error = %err, "skipping desaturation");
        }
        for (module, state) in self.modules.iter_mut().zip(states) {
            module.set_desired_state(state);
        }
    }

    /// The measured chassis speeds, recovered from the module sensors.
    pub fn get_chassis_speeds(&mut self) -> ChassisSpeeds {
        let states = self.module_states();
        self.kinematics.to_chassis_speeds(&states)
    }

    /// The measured states of the four modules.
    pub fn module_states(&mut self) -> [ModuleState; MODULE_COUNT] {
        let mut states = [ModuleState::default(); MODULE_COUNT];
        for (state, module) in states.iter_mut().zip(self.modules.iter_mut()) {
            *state = module.state();
        }
        states
    }

    /// The odometry measurements of the four modules.
    pub fn module_positions(&mut self) -> [ModulePosition; MODULE_COUNT] {
        let mut positions = [ModulePosition::default(); MODULE_COUNT];
        for (position, module) in positions.iter_mut().zip(self.modules.iter_mut()) {
            *position = module.position();
        }
        positions
    }

    /// Stop all modules, holding their current steering angles.
    pub fn stop_motor(&mut self) {
        for module in &mut self.modules {
            module.stop();
        }
    }

    /// Per-cycle housekeeping hook, called once per control cycle before
    /// odometry is read.
    pub fn periodic(&mut self) {}

    /// Configure the idle behavior of every module.
    pub fn set_idle_mode(&mut self, mode: IdleMode) {
        for module in &mut self.modules {
            module.set_idle_mode(mode);
        }
    }

    /// Whether any module currently reports a hardware fault.
    pub fn has_error(&self) -> bool {
        self.modules.iter().any(SwerveModule::has_error)
    }

    /// The chassis kinematics.
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    /// The per-wheel speed limit (m/s).
    pub fn max_speed(&self) -> f64 {
        self.max_speed
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
        drive: SwerveDrive,
        drive_motors: Vec<SimMotor>,
        sensors: Vec<SimAngleSensor>,
    }

    fn rig() -> Rig {
        let params = RobotIdentity::PracticeBot2025.parameters();
        let mut drive_motors = Vec::new();
        let mut sensors = Vec::new();
        let names = ["front-left", "front-right", "back-left", "back-right"];
        let modules = names.map(|name| {
            let drive_motor = SimMotor::new(name);
            let steering_motor = SimMotor::new(name);
            let sensor = SimAngleSensor::new(name);
            drive_motors.push(drive_motor.clone());
            sensors.push(sensor.clone());
            SwerveModule::new(
                name,
                &params,
                Box::new(drive_motor),
                Box::new(steering_motor),
                Box::new(sensor),
            )
        });
        Rig {
            drive: SwerveDrive::new(&params, modules).unwrap(),
            drive_motors,
            sensors,
        }
    }

    #[test]
    fn straight_drive_commands_all_wheels_equally() {
        let mut rig = rig();
        rig.drive.drive(1.0, 0.0, 0.0, 0.0, false);
        let first = rig.drive_motors[0].commanded_velocity();
        assert!(first > 0.0);
        for motor in &rig.drive_motors {
            assert_relative_eq!(motor.commanded_velocity(), first, epsilon = 1e-9);
        }
    }

    #[test]
    fn field_relative_uses_heading() {
        let mut rig = rig();
        for sensor in &rig.sensors {
            sensor.set_angle(-FRAC_PI_2);
        }
        // Facing +90°, a field +x command is a robot-frame -y command, so the
        // wheels steer to -90°.
        rig.drive.drive(1.0, 0.0, 0.0, FRAC_PI_2, true);
        for module_angle in rig.drive.module_states().map(|s| s.angle) {
            assert_relative_eq!(module_angle, -FRAC_PI_2, epsilon = 1e-9);
        }
        for motor in &rig.drive_motors {
            assert!(motor.commanded_velocity() > 0.0);
        }
    }

    #[test]
    fn saturating_command_is_rescaled() {
        let mut rig = rig();
        let max = rig.drive.max_speed();
        // Ask for twice the achievable speed; the command lands exactly at
        // the limit instead.
        rig.drive.drive(2.0 * max, 0.0, 0.0, 0.0, false);
        let params = RobotIdentity::PracticeBot2025.parameters();
        let expected_rps = max * params.module.drive_gear_ratio()
            / (params.module.wheel_diameter() * std::f64::consts::PI);
        for motor in &rig.drive_motors {
            assert_relative_eq!(motor.commanded_velocity(), expected_rps, epsilon = 1e-9);
        }
    }

    #[test]
    fn measured_speeds_round_trip() {
        let mut rig = rig();
        rig.drive.set_chassis_speeds(ChassisSpeeds::new(0.8, -0.2, 0.0));
        // Let the simulated rotors reach their commands and point the wheels
        // where they were told to go.
        let states = rig.drive.kinematics().to_module_states(ChassisSpeeds::new(0.8, -0.2, 0.0));
        for ((motor, sensor), state) in
            rig.drive_motors.iter().zip(&rig.sensors).zip(states)
        {
            motor.step(0.02);
            sensor.set_angle(state.angle);
        }
        let recovered = rig.drive.get_chassis_speeds();
        assert_relative_eq!(recovered.vx, 0.8, epsilon = 1e-6);
        assert_relative_eq!(recovered.vy, -0.2, epsilon = 1e-6);
        assert_relative_eq!(recovered.omega, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn fault_in_one_module_flags_drivetrain() {
        let mut rig = rig();
        assert!(!rig.drive.has_error());
        rig.sensors[2].fail();
        rig.drive.module_states();
        assert!(rig.drive.has_error());
        rig.sensors[2].restore();
        rig.drive.module_states();
        assert!(!rig.drive.has_error());
    }

    #[test]
    fn stop_zeroes_drive_commands() {
        let mut rig = rig();
        rig.drive.drive(1.0, 0.0, 0.0, 0.0, false);
        rig.drive.stop_motor();
        for motor in &rig.drive_motors {
            assert_relative_eq!(motor.commanded_velocity(), 0.0, epsilon = 1e-9);
        }
    }
}
