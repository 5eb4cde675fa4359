#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for swerve drive kinematics."]
#![doc = ""]
#![doc = "This crate provides structures and functions for converting chassis velocity"]
#![doc = "commands into per-module steering/drive setpoints, recovering chassis motion"]
#![doc = "from measured module states, and integrating module odometry."]

use core::f64::consts::{FRAC_PI_2, PI};
use core::fmt;
use libm::{atan2, cos, fabs, hypot, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Number of swerve modules on the chassis, in the fixed order:
/// front-left, front-right, back-left, back-right.
pub const MODULE_COUNT: usize = 4;

/// Normalize an angle to be within `(-PI, PI]`.
///
/// Angles at `-PI` will be normalized to `PI`.
///
/// # Arguments
///
/// * `angle`: The angle in radians to normalize.
///
/// # Returns
///
/// The normalized angle in radians.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % (2.0 * PI);
    if a > PI {
        a - 2.0 * PI
    } else if a <= -PI {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Shortest signed angular difference from angle `a` to angle `b`.
///
/// Returns the angle to add to `a` to reach `b`, taking the shortest path
/// around the circle. The result is within `(-PI, PI]`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(b - a)
}

/// A point `(x, y)` in the field frame, in meters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Translation2d {
    /// Field-frame x coordinate (m).
    pub x: f64,
    /// Field-frame y coordinate (m).
    pub y: f64,
}

impl Translation2d {
    /// Construct a new translation.
    pub const fn new(x: f64, y: f64) -> Self {
        Translation2d { x, y }
    }

    /// Euclidean distance to another point, in meters.
    pub fn distance(&self, other: &Translation2d) -> f64 {
        hypot(other.x - self.x, other.y - self.y)
    }

    /// Bearing from this point to another point, in radians within `(-PI, PI]`.
    pub fn angle_to(&self, other: &Translation2d) -> f64 {
        normalize_angle(atan2(other.y - self.y, other.x - self.x))
    }
}

impl fmt::Display for Translation2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2} m, y: {:.2} m)", self.x, self.y)
    }
}

/// A 2-D pose `(x, y, θ)` in meters and radians (θ measured counter-clockwise
/// from the x-axis in the field frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2d {
    /// Field-frame x position (m).
    pub x: f64,
    /// Field-frame y position (m).
    pub y: f64,
    /// Heading (rad), normalized to `(-PI, PI]`.
    pub theta: f64,
}

impl Pose2d {
    /// Construct a new pose. The heading is normalized to `(-PI, PI]`.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose2d {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// The translation component of this pose.
    pub const fn translation(&self) -> Translation2d {
        Translation2d {
            x: self.x,
            y: self.y,
        }
    }
}

impl fmt::Display for Pose2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x: {:.2}, y: {:.2}, θ: {:.2} rad)",
            self.x, self.y, self.theta
        )
    }
}

/// Linear and angular chassis velocities in the robot frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisSpeeds {
    /// Linear velocity along the robot's forward axis (m/s).
    pub vx: f64,
    /// Linear velocity along the robot's leftward axis (m/s).
    pub vy: f64,
    /// Angular velocity around the robot's vertical axis (rad/s).
    pub omega: f64,
}

impl ChassisSpeeds {
    /// Construct new chassis speeds.
    pub const fn new(vx: f64, vy: f64, omega: f64) -> Self {
        ChassisSpeeds { vx, vy, omega }
    }

    /// Convert a field-relative velocity command into robot-relative chassis
    /// speeds by rotating the translation by the negative of the heading.
    ///
    /// # Arguments
    ///
    /// * `vx`: Field-frame x velocity (m/s).
    /// * `vy`: Field-frame y velocity (m/s).
    /// * `omega`: Angular velocity (rad/s); unchanged by the rotation.
    /// * `heading`: Current robot heading (rad).
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, heading: f64) -> Self {
        let cos_h = cos(heading);
        let sin_h = sin(heading);
        ChassisSpeeds {
            vx: vx * cos_h + vy * sin_h,
            vy: -vx * sin_h + vy * cos_h,
            omega,
        }
    }
}

impl fmt::Display for ChassisSpeeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(vx: {:.2} m/s, vy: {:.2} m/s, ω: {:.2} rad/s)",
            self.vx, self.vy, self.omega
        )
    }
}

/// A desired or measured state of one swerve module: signed wheel speed and
/// steering angle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModuleState {
    /// Wheel linear speed (m/s, signed).
    pub speed: f64,
    /// Steering angle (rad), normalized to `(-PI, PI]`.
    pub angle: f64,
}

impl ModuleState {
    /// Construct a new module state.
    pub const fn new(speed: f64, angle: f64) -> Self {
        ModuleState { speed, angle }
    }

    /// Minimize the steering rotation needed to reach this state from
    /// `current_angle`.
    ///
    /// If the target angle is more than 90° away from the current angle, the
    /// target is flipped by 180° and the speed negated. A wheel driven
    /// backward at θ+180° produces the same velocity vector as driven forward
    /// at θ, so the command is kinematically equivalent while halving the
    /// maximum rotation.
    ///
    /// The returned angle is always within 90° of `current_angle`.
    pub fn optimize(self, current_angle: f64) -> ModuleState {
        if fabs(angle_diff(current_angle, self.angle)) > FRAC_PI_2 {
            ModuleState {
                speed: -self.speed,
                angle: normalize_angle(self.angle + PI),
            }
        } else {
            ModuleState {
                speed: self.speed,
                angle: normalize_angle(self.angle),
            }
        }
    }

    /// The wheel velocity vector `(vx, vy)` in the robot frame.
    pub fn velocity_vector(&self) -> (f64, f64) {
        (self.speed * cos(self.angle), self.speed * sin(self.angle))
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {:.2} m/s, θ: {:.2} rad)", self.speed, self.angle)
    }
}

/// The odometry state of one swerve module: cumulative wheel distance and
/// current steering angle.
///
/// Odometry consumes distance *deltas* between cycles rather than speeds, so
/// velocity-integration error does not accumulate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModulePosition {
    /// Cumulative wheel distance traveled (m, signed).
    pub distance: f64,
    /// Steering angle (rad).
    pub angle: f64,
}

impl ModulePosition {
    /// Construct a new module position.
    pub const fn new(distance: f64, angle: f64) -> Self {
        ModulePosition { distance, angle }
    }
}

impl fmt::Display for ModulePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(d: {:.2} m, θ: {:.2} rad)", self.distance, self.angle)
    }
}

/// A small robot-frame pose displacement over one control cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist2d {
    /// Displacement along the robot's forward axis (m).
    pub dx: f64,
    /// Displacement along the robot's leftward axis (m).
    pub dy: f64,
    /// Change in heading (rad).
    pub dtheta: f64,
}

impl Twist2d {
    /// Construct a new twist.
    pub const fn new(dx: f64, dy: f64, dtheta: f64) -> Self {
        Twist2d { dx, dy, dtheta }
    }
}

/// Swerve drive kinematics helper.
///
/// This struct encapsulates the placement of the four modules relative to the
/// robot center and provides the chassis↔module conversions. Module arrays
/// are always ordered front-left, front-right, back-left, back-right; the
/// fixed-size array type enforces the module count at compile time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwerveKinematics {
    /// Module offsets from the robot center (m), FL/FR/BL/BR.
    offsets: [Translation2d; MODULE_COUNT],
    /// Σ xᵢ over the module offsets.
    sum_x: f64,
    /// Σ yᵢ over the module offsets.
    sum_y: f64,
    /// Σ (xᵢ² + yᵢ²) over the module offsets.
    sum_r2: f64,
}

impl SwerveKinematics {
    /// Construct a kinematics helper from explicit module offsets.
    ///
    /// # Arguments
    ///
    /// * `offsets`: Module positions relative to the robot center (m), in the
    ///   order front-left, front-right, back-left, back-right. With x
    ///   forward and y leftward, a front-left module has positive x and y.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::DegenerateGeometry)` if the offsets
    /// cannot distinguish rotation from translation (e.g. every module at
    /// the robot center, or all modules at the same point).
    pub fn new(offsets: [Translation2d; MODULE_COUNT]) -> Result<Self, KinematicsError> {
        let n = MODULE_COUNT as f64;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_r2 = 0.0;
        for offset in &offsets {
            sum_x += offset.x;
            sum_y += offset.y;
            sum_r2 += offset.x * offset.x + offset.y * offset.y;
        }

        // Determinant of the normal-equation matrix used by the forward
        // kinematics solve. Zero iff all offsets coincide.
        let det = n * (n * sum_r2 - sum_x * sum_x - sum_y * sum_y);
        if det <= 1e-12 {
            return Err(KinematicsError::DegenerateGeometry(
                "module offsets must not coincide",
            ));
        }

        Ok(SwerveKinematics {
            offsets,
            sum_x,
            sum_y,
            sum_r2,
        })
    }

    /// Construct a kinematics helper for a rectangular chassis.
    ///
    /// # Arguments
    ///
    /// * `wheel_base`: Distance between front and back axles (m).
    /// * `track_width`: Distance between left and right wheels (m).
    pub fn from_chassis_dimensions(
        wheel_base: f64,
        track_width: f64,
    ) -> Result<Self, KinematicsError> {
        let half_base = wheel_base / 2.0;
        let half_track = track_width / 2.0;
        SwerveKinematics::new([
            Translation2d::new(half_base, half_track),   // front left
            Translation2d::new(half_base, -half_track),  // front right
            Translation2d::new(-half_base, half_track),  // back left
            Translation2d::new(-half_base, -half_track), // back right
        ])
    }

    /// Returns the module offsets, FL/FR/BL/BR.
    pub fn offsets(&self) -> &[Translation2d; MODULE_COUNT] {
        &self.offsets
    }

    /// Inverse kinematics: convert robot-relative chassis speeds to the four
    /// module states.
    ///
    /// A module whose velocity vector is (near) zero gets speed 0 and angle 0;
    /// holding the previously commanded steering angle for such modules is the
    /// caller's responsibility, since only the caller knows the last command.
    pub fn to_module_states(&self, speeds: ChassisSpeeds) -> [ModuleState; MODULE_COUNT] {
        let mut states = [ModuleState::default(); MODULE_COUNT];
        for (state, offset) in states.iter_mut().zip(self.offsets.iter()) {
            let vx = speeds.vx - speeds.omega * offset.y;
            let vy = speeds.vy + speeds.omega * offset.x;
            let speed = hypot(vx, vy);
            let angle = if speed < 1e-9 {
                0.0
            } else {
                normalize_angle(atan2(vy, vx))
            };
            *state = ModuleState::new(speed, angle);
        }
        states
    }

    /// Forward kinematics: recover robot-relative chassis speeds from the
    /// four measured module states.
    ///
    /// The module→chassis system is overdetermined (8 equations, 3 unknowns);
    /// this solves the least-squares normal equations in closed form, so the
    /// result is the best-fit chassis motion when wheels disagree (e.g. slip).
    pub fn to_chassis_speeds(&self, states: &[ModuleState; MODULE_COUNT]) -> ChassisSpeeds {
        let mut bx = 0.0;
        let mut by = 0.0;
        let mut bw = 0.0;
        for (state, offset) in states.iter().zip(self.offsets.iter()) {
            let (vx, vy) = state.velocity_vector();
            bx += vx;
            by += vy;
            bw += offset.x * vy - offset.y * vx;
        }
        let (vx, vy, omega) = self.solve_normal_equations(bx, by, bw);
        ChassisSpeeds::new(vx, vy, omega)
    }

    /// Forward kinematics applied to module distance deltas, yielding the
    /// robot-frame pose displacement over one cycle.
    ///
    /// # Arguments
    ///
    /// * `deltas`: Per-module distance traveled since the previous cycle and
    ///   the steering angle over that interval, FL/FR/BL/BR.
    pub fn to_chassis_delta(&self, deltas: &[ModulePosition; MODULE_COUNT]) -> Twist2d {
        let mut bx = 0.0;
        let mut by = 0.0;
        let mut bw = 0.0;
        for (delta, offset) in deltas.iter().zip(self.offsets.iter()) {
            let dx = delta.distance * cos(delta.angle);
            let dy = delta.distance * sin(delta.angle);
            bx += dx;
            by += dy;
            bw += offset.x * dy - offset.y * dx;
        }
        let (dx, dy, dtheta) = self.solve_normal_equations(bx, by, bw);
        Twist2d::new(dx, dy, dtheta)
    }

    /// Rescale module speeds so none exceeds `max_speed`, preserving the
    /// ratios between modules (and therefore the shape of the commanded
    /// motion).
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidMaxSpeed)` if `max_speed` is not
    /// positive.
    pub fn desaturate(
        states: &mut [ModuleState; MODULE_COUNT],
        max_speed: f64,
    ) -> Result<(), KinematicsError> {
        if max_speed <= 0.0 {
            return Err(KinematicsError::InvalidMaxSpeed("must be positive"));
        }

        let mut highest = 0.0;
        for state in states.iter() {
            let speed = fabs(state.speed);
            if speed > highest {
                highest = speed;
            }
        }
        if highest > max_speed {
            let scale = max_speed / highest;
            for state in states.iter_mut() {
                state.speed *= scale;
            }
        }
        Ok(())
    }

    /// Solve the 3×3 normal equations `AᵀA·u = Aᵀb` for the chassis motion
    /// `u = (vx, vy, ω)`, where each module contributes the rows
    /// `[1, 0, -yᵢ]` and `[0, 1, xᵢ]`.
    fn solve_normal_equations(&self, bx: f64, by: f64, bw: f64) -> (f64, f64, f64) {
        let n = MODULE_COUNT as f64;
        let m = [
            [n, 0.0, -self.sum_y],
            [0.0, n, self.sum_x],
            [-self.sum_y, self.sum_x, self.sum_r2],
        ];
        let det = det3(&m);

        // Cramer's rule; the constructor guarantees det > 0.
        let mx = [
            [bx, 0.0, -self.sum_y],
            [by, n, self.sum_x],
            [bw, self.sum_x, self.sum_r2],
        ];
        let my = [
            [n, bx, -self.sum_y],
            [0.0, by, self.sum_x],
            [-self.sum_y, bw, self.sum_r2],
        ];
        let mw = [
            [n, 0.0, bx],
            [0.0, n, by],
            [-self.sum_y, self.sum_x, bw],
        ];
        (det3(&mx) / det, det3(&my) / det, det3(&mw) / det)
    }
}

impl fmt::Display for SwerveKinematics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SwerveKinematics (FL: {}, FR: {}, BL: {}, BR: {})",
            self.offsets[0], self.offsets[1], self.offsets[2], self.offsets[3]
        )
    }
}

/// Determinant of a 3×3 matrix.
fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn square_kinematics() -> SwerveKinematics {
        // 0.6 m square chassis, module radius = hypot(0.3, 0.3).
        SwerveKinematics::from_chassis_dimensions(0.6, 0.6).unwrap()
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.0) - 0.0).abs() < EPSILON);
        assert!((normalize_angle(PI) - PI).abs() < EPSILON); // PI stays PI for (-PI, PI]
        assert!((normalize_angle(-PI) - PI).abs() < EPSILON); // -PI maps to PI
        assert!((normalize_angle(3.0 * PI) - PI).abs() < EPSILON);
        assert!((normalize_angle(2.5 * PI) - 0.5 * PI).abs() < EPSILON);
        assert!((normalize_angle(-2.5 * PI) - -0.5 * PI).abs() < EPSILON);
        assert!((normalize_angle(PI + 0.001) - (-PI + 0.001)).abs() < EPSILON);
    }

    #[test]
    fn test_angle_diff_crossing_boundary() {
        // 170° to -170° is 20° the short way through ±180°.
        let a = 170.0_f64.to_radians();
        let b = -170.0_f64.to_radians();
        assert!((angle_diff(a, b) - 20.0_f64.to_radians()).abs() < EPSILON);
        assert!((angle_diff(b, a) - -20.0_f64.to_radians()).abs() < EPSILON);
    }

    #[test]
    fn test_optimize_within_quarter_turn() {
        // 45° away: no flip.
        let state = ModuleState::new(2.0, PI / 4.0);
        let optimized = state.optimize(0.0);
        assert!((optimized.speed - 2.0).abs() < EPSILON);
        assert!((optimized.angle - PI / 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_optimize_flips_beyond_quarter_turn() {
        // 135° away: flip to -45° and negate the speed.
        let state = ModuleState::new(2.0, 3.0 * PI / 4.0);
        let optimized = state.optimize(0.0);
        assert!((optimized.speed - -2.0).abs() < EPSILON);
        assert!((optimized.angle - -PI / 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_optimize_across_wrap_boundary() {
        // Current 170°, target -170°: 20° apart through ±180°, no flip.
        let current = 170.0_f64.to_radians();
        let state = ModuleState::new(1.0, -170.0_f64.to_radians());
        let optimized = state.optimize(current);
        assert!((optimized.speed - 1.0).abs() < EPSILON);
        assert!(fabs(angle_diff(current, optimized.angle)) <= FRAC_PI_2 + EPSILON);
        assert!((optimized.angle - -170.0_f64.to_radians()).abs() < EPSILON);
    }

    #[test]
    fn test_optimize_stays_within_quarter_turn_everywhere() {
        // Sweep current/target pairs; the optimized angle never requires more
        // than a quarter turn and the velocity vector is unchanged.
        let mut target = -PI;
        while target <= PI {
            let mut current = -PI;
            while current <= PI {
                let state = ModuleState::new(1.5, target);
                let optimized = state.optimize(current);
                assert!(
                    fabs(angle_diff(current, optimized.angle)) <= FRAC_PI_2 + EPSILON,
                    "target {} current {} optimized {}",
                    target,
                    current,
                    optimized.angle
                );

                let (vx, vy) = state.velocity_vector();
                let (ovx, ovy) = optimized.velocity_vector();
                assert!((vx - ovx).abs() < 1e-6 && (vy - ovy).abs() < 1e-6);
                current += 0.1;
            }
            target += 0.1;
        }
    }

    #[test]
    fn test_inverse_kinematics_straight() {
        // drive(1.0, 0, 0): all four modules at angle 0, speed 1.0 m/s.
        let kinematics = square_kinematics();
        let states = kinematics.to_module_states(ChassisSpeeds::new(1.0, 0.0, 0.0));
        for state in &states {
            assert!((state.speed - 1.0).abs() < EPSILON);
            assert!((state.angle - 0.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_inverse_kinematics_strafe() {
        let kinematics = square_kinematics();
        let states = kinematics.to_module_states(ChassisSpeeds::new(0.0, 1.0, 0.0));
        for state in &states {
            assert!((state.speed - 1.0).abs() < EPSILON);
            assert!((state.angle - FRAC_PI_2).abs() < EPSILON);
        }
    }

    #[test]
    fn test_inverse_kinematics_pure_rotation() {
        // ω = 1 rad/s on a square base: each wheel moves tangentially at ω·r.
        let kinematics = square_kinematics();
        let states = kinematics.to_module_states(ChassisSpeeds::new(0.0, 0.0, 1.0));
        let radius = hypot(0.3, 0.3);
        for (state, offset) in states.iter().zip(kinematics.offsets().iter()) {
            assert!((state.speed - radius).abs() < EPSILON);
            // Tangential direction is perpendicular to the module offset.
            let expected = normalize_angle(atan2(offset.x, -offset.y));
            assert!((state.angle - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn test_inverse_kinematics_zero_command() {
        let kinematics = square_kinematics();
        let states = kinematics.to_module_states(ChassisSpeeds::default());
        for state in &states {
            assert!((state.speed - 0.0).abs() < EPSILON);
            assert!((state.angle - 0.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_forward_kinematics_round_trip() {
        let kinematics = square_kinematics();
        let commands = [
            ChassisSpeeds::new(1.0, 0.0, 0.0),
            ChassisSpeeds::new(0.0, -2.0, 0.0),
            ChassisSpeeds::new(1.5, 0.5, 1.0),
            ChassisSpeeds::new(-0.3, 0.7, -2.0),
        ];
        for command in commands {
            let states = kinematics.to_module_states(command);
            let recovered = kinematics.to_chassis_speeds(&states);
            assert!((recovered.vx - command.vx).abs() < 1e-6);
            assert!((recovered.vy - command.vy).abs() < 1e-6);
            assert!((recovered.omega - command.omega).abs() < 1e-6);
        }
    }

    #[test]
    fn test_forward_kinematics_disagreeing_wheels() {
        // Three wheels straight at 1 m/s, one slipping at 2 m/s: best fit is
        // faster than 1 m/s, slower than 2 m/s, with some spurious rotation.
        let kinematics = square_kinematics();
        let states = [
            ModuleState::new(2.0, 0.0),
            ModuleState::new(1.0, 0.0),
            ModuleState::new(1.0, 0.0),
            ModuleState::new(1.0, 0.0),
        ];
        let speeds = kinematics.to_chassis_speeds(&states);
        assert!(speeds.vx > 1.0 && speeds.vx < 2.0);
        assert!(speeds.vy.abs() < EPSILON);
    }

    #[test]
    fn test_chassis_delta_straight() {
        // 0.1 m on every wheel at angle 0 → 0.1 m forward, no rotation.
        let kinematics = square_kinematics();
        let deltas = [ModulePosition::new(0.1, 0.0); MODULE_COUNT];
        let twist = kinematics.to_chassis_delta(&deltas);
        assert!((twist.dx - 0.1).abs() < EPSILON);
        assert!((twist.dy - 0.0).abs() < EPSILON);
        assert!((twist.dtheta - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_chassis_delta_rotation() {
        // Wheels tangential, each traveling ω·r·dt worth of arc.
        let kinematics = square_kinematics();
        let radius = hypot(0.3, 0.3);
        let dtheta = 0.05;
        let mut deltas = [ModulePosition::default(); MODULE_COUNT];
        for (delta, offset) in deltas.iter_mut().zip(kinematics.offsets().iter()) {
            *delta = ModulePosition::new(dtheta * radius, atan2(offset.x, -offset.y));
        }
        let twist = kinematics.to_chassis_delta(&deltas);
        assert!((twist.dx - 0.0).abs() < EPSILON);
        assert!((twist.dy - 0.0).abs() < EPSILON);
        assert!((twist.dtheta - dtheta).abs() < EPSILON);
    }

    #[test]
    fn test_desaturate_scales_proportionally() {
        let mut states = [
            ModuleState::new(8.0, 0.0),
            ModuleState::new(4.0, 0.0),
            ModuleState::new(-2.0, 0.0),
            ModuleState::new(1.0, 0.0),
        ];
        SwerveKinematics::desaturate(&mut states, 4.0).unwrap();
        // Scale = 4.0 / 8.0 = 0.5; ratios preserved, maximum exactly at the limit.
        assert!((states[0].speed - 4.0).abs() < EPSILON);
        assert!((states[1].speed - 2.0).abs() < EPSILON);
        assert!((states[2].speed - -1.0).abs() < EPSILON);
        assert!((states[3].speed - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_desaturate_noop_under_limit() {
        let mut states = [ModuleState::new(1.0, 0.0); MODULE_COUNT];
        SwerveKinematics::desaturate(&mut states, 4.0).unwrap();
        for state in &states {
            assert!((state.speed - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_desaturate_invalid_max_speed() {
        let mut states = [ModuleState::default(); MODULE_COUNT];
        let result = SwerveKinematics::desaturate(&mut states, 0.0);
        assert!(matches!(
            result,
            Err(KinematicsError::InvalidMaxSpeed("must be positive"))
        ));
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        let result = SwerveKinematics::new([Translation2d::default(); MODULE_COUNT]);
        assert!(matches!(
            result,
            Err(KinematicsError::DegenerateGeometry("module offsets must not coincide"))
        ));

        // All modules at the same (nonzero) point is equally unsolvable.
        let result = SwerveKinematics::new([Translation2d::new(0.3, 0.3); MODULE_COUNT]);
        assert!(matches!(result, Err(KinematicsError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_field_relative_rotation() {
        // Facing +90°, a field-frame +x command becomes a robot-frame -y command.
        let speeds = ChassisSpeeds::from_field_relative(1.0, 0.0, 0.0, FRAC_PI_2);
        assert!((speeds.vx - 0.0).abs() < EPSILON);
        assert!((speeds.vy - -1.0).abs() < EPSILON);
        assert!((speeds.omega - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_field_relative_round_trip_all_headings() {
        // drive(vx, vy, 0) field-relative at heading h, recovered through
        // forward kinematics, equals (vx, vy) rotated by -h for all headings.
        let kinematics = square_kinematics();
        let (vx, vy) = (1.2, -0.4);
        let mut heading = -PI + 0.01;
        while heading <= PI {
            let speeds = ChassisSpeeds::from_field_relative(vx, vy, 0.0, heading);
            let states = kinematics.to_module_states(speeds);
            let recovered = kinematics.to_chassis_speeds(&states);

            let expected_vx = vx * cos(heading) + vy * sin(heading);
            let expected_vy = -vx * sin(heading) + vy * cos(heading);
            assert!((recovered.vx - expected_vx).abs() < 1e-6, "heading {}", heading);
            assert!((recovered.vy - expected_vy).abs() < 1e-6, "heading {}", heading);
            assert!(recovered.omega.abs() < 1e-6, "heading {}", heading);
            heading += 0.05;
        }
    }

    #[test]
    fn test_translation_bearing() {
        let origin = Translation2d::default();
        let target = Translation2d::new(1.0, 1.0);
        assert!((origin.angle_to(&target) - PI / 4.0).abs() < EPSILON);
        assert!((origin.distance(&target) - 2.0_f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_pose_constructor_normalizes_heading() {
        let pose = Pose2d::new(1.0, 2.0, 3.0 * PI);
        assert!((pose.theta - PI).abs() < EPSILON);
        let pose = Pose2d::new(0.0, 0.0, -PI);
        assert!((pose.theta - PI).abs() < EPSILON);
    }
}
