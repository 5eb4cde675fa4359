//! Simulated hardware backends.
//!
//! Each device is a cheap cloneable handle over shared state, so tests and
//! simulation loops can keep a handle for themselves while the drivetrain
//! owns another. The core is single-threaded by design, so the handles use
//! `Rc<RefCell<_>>` rather than locks.
//!
//! All devices support fault injection: a failed device returns
//! [`HalError::Disconnected`] from every read and write until restored.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::{AbsoluteAngleSensor, Gyro, HalError, IdleMode, MotorController, RelativeEncoder};

#[derive(Debug)]
struct MotorInner {
    position: f64,
    velocity: f64,
    commanded_velocity: f64,
    voltage: f64,
    idle_mode: IdleMode,
    failed: bool,
}

/// A simulated motor controller with an ideal closed-loop velocity response.
///
/// The rotor tracks the commanded velocity exactly; [`SimMotor::step`]
/// integrates the rotor position. Cloning yields another handle to the same
/// motor.
#[derive(Debug, Clone)]
pub struct SimMotor {
    name: &'static str,
    inner: Rc<RefCell<MotorInner>>,
    encoder: SimEncoder,
}

/// The relative encoder of a [`SimMotor`].
#[derive(Debug, Clone)]
pub struct SimEncoder {
    name: &'static str,
    inner: Rc<RefCell<MotorInner>>,
}

impl SimMotor {
    /// Create a simulated motor at rest.
    pub fn new(name: &'static str) -> Self {
        let inner = Rc::new(RefCell::new(MotorInner {
            position: 0.0,
            velocity: 0.0,
            commanded_velocity: 0.0,
            voltage: 0.0,
            idle_mode: IdleMode::Coast,
            failed: false,
        }));
        SimMotor {
            name,
            inner: Rc::clone(&inner),
            encoder: SimEncoder { name, inner },
        }
    }

    /// Advance the simulation by `dt` seconds: the rotor snaps to the
    /// commanded velocity and the position integrates.
    pub fn step(&self, dt: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.velocity = inner.commanded_velocity;
        inner.position += inner.velocity * dt;
    }

    /// The most recent closed-loop velocity command (rotations per second).
    pub fn commanded_velocity(&self) -> f64 {
        self.inner.borrow().commanded_velocity
    }

    /// The most recent raw voltage command.
    pub fn commanded_voltage(&self) -> f64 {
        self.inner.borrow().voltage
    }

    /// The currently configured idle mode.
    pub fn idle_mode(&self) -> IdleMode {
        self.inner.borrow().idle_mode
    }

    /// Inject a disconnect fault: subsequent reads and writes fail.
    pub fn fail(&self) {
        debug!(device = self.name, "injecting motor fault");
        self.inner.borrow_mut().failed = true;
    }

    /// Clear an injected fault.
    pub fn restore(&self) {
        debug!(device = self.name, "restoring motor");
        self.inner.borrow_mut().failed = false;
    }
}

impl MotorController for SimMotor {
    fn set_velocity(&mut self, velocity: f64) -> Result<(), HalError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        inner.commanded_velocity = velocity;
        Ok(())
    }

    fn set_voltage(&mut self, volts: f64) -> Result<(), HalError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        inner.voltage = volts;
        Ok(())
    }

    fn encoder(&self) -> &dyn RelativeEncoder {
        &self.encoder
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), HalError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        inner.idle_mode = mode;
        Ok(())
    }
}

impl RelativeEncoder for SimEncoder {
    fn position(&self) -> Result<f64, HalError> {
        let inner = self.inner.borrow();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        Ok(inner.position)
    }

    fn velocity(&self) -> Result<f64, HalError> {
        let inner = self.inner.borrow();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        Ok(inner.velocity)
    }
}

#[derive(Debug)]
struct AngleSensorInner {
    angle: f64,
    velocity: f64,
    failed: bool,
}

/// A simulated absolute angle sensor.
///
/// The simulation (or a test) drives the reported angle directly through
/// [`SimAngleSensor::set_angle`].
#[derive(Debug, Clone)]
pub struct SimAngleSensor {
    name: &'static str,
    inner: Rc<RefCell<AngleSensorInner>>,
}

impl SimAngleSensor {
    /// Create a simulated angle sensor reading zero.
    pub fn new(name: &'static str) -> Self {
        SimAngleSensor {
            name,
            inner: Rc::new(RefCell::new(AngleSensorInner {
                angle: 0.0,
                velocity: 0.0,
                failed: false,
            })),
        }
    }

    /// Set the reported absolute angle (radians).
    pub fn set_angle(&self, angle: f64) {
        self.inner.borrow_mut().angle = angle;
    }

    /// Set the reported angular velocity (radians per second).
    pub fn set_velocity(&self, velocity: f64) {
        self.inner.borrow_mut().velocity = velocity;
    }

    /// Inject a disconnect fault.
    pub fn fail(&self) {
        debug!(device = self.name, "injecting angle sensor fault");
        self.inner.borrow_mut().failed = true;
    }

    /// Clear an injected fault.
    pub fn restore(&self) {
        debug!(device = self.name, "restoring angle sensor");
        self.inner.borrow_mut().failed = false;
    }
}

impl AbsoluteAngleSensor for SimAngleSensor {
    fn absolute_angle(&self) -> Result<f64, HalError> {
        let inner = self.inner.borrow();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        Ok(inner.angle)
    }

    fn angular_velocity(&self) -> Result<f64, HalError> {
        let inner = self.inner.borrow();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        Ok(inner.velocity)
    }
}

#[derive(Debug)]
struct GyroInner {
    angle: f64,
    failed: bool,
}

/// A simulated yaw gyro. The simulation drives the accumulated angle through
/// [`SimGyro::set_angle`].
#[derive(Debug, Clone)]
pub struct SimGyro {
    name: &'static str,
    inner: Rc<RefCell<GyroInner>>,
}

impl SimGyro {
    /// Create a simulated gyro reading zero.
    pub fn new(name: &'static str) -> Self {
        SimGyro {
            name,
            inner: Rc::new(RefCell::new(GyroInner {
                angle: 0.0,
                failed: false,
            })),
        }
    }

    /// Set the accumulated yaw angle (radians, continuous).
    pub fn set_angle(&self, angle: f64) {
        self.inner.borrow_mut().angle = angle;
    }

    /// Inject a disconnect fault.
    pub fn fail(&self) {
        debug!(device = self.name, "injecting gyro fault");
        self.inner.borrow_mut().failed = true;
    }

    /// Clear an injected fault.
    pub fn restore(&self) {
        debug!(device = self.name, "restoring gyro");
        self.inner.borrow_mut().failed = false;
    }
}

impl Gyro for SimGyro {
    fn angle(&self) -> Result<f64, HalError> {
        let inner = self.inner.borrow();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        Ok(inner.angle)
    }

    fn reset(&mut self) -> Result<(), HalError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failed {
            return Err(HalError::Disconnected(self.name));
        }
        inner.angle = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_integrates_commanded_velocity() {
        let mut motor = SimMotor::new("drive");
        motor.set_velocity(10.0).unwrap();
        motor.step(0.5);
        assert_eq!(motor.encoder().position().unwrap(), 5.0);
        assert_eq!(motor.encoder().velocity().unwrap(), 10.0);
    }

    #[test]
    fn failed_motor_rejects_commands_and_reads() {
        let mut motor = SimMotor::new("drive");
        motor.fail();
        assert_eq!(
            motor.set_velocity(1.0),
            Err(HalError::Disconnected("drive"))
        );
        assert_eq!(
            motor.encoder().position(),
            Err(HalError::Disconnected("drive"))
        );
        motor.restore();
        assert!(motor.set_velocity(1.0).is_ok());
    }

    #[test]
    fn gyro_reset_zeroes_angle() {
        let mut gyro = SimGyro::new("gyro");
        gyro.set_angle(3.5);
        assert_eq!(gyro.angle().unwrap(), 3.5);
        gyro.reset().unwrap();
        assert_eq!(gyro.angle().unwrap(), 0.0);
    }

    #[test]
    fn cloned_handles_share_state() {
        let motor = SimMotor::new("steer");
        let mut handle = motor.clone();
        handle.set_velocity(2.0).unwrap();
        motor.step(1.0);
        assert_eq!(motor.encoder().position().unwrap(), 2.0);
    }
}
