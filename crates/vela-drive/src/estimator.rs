//! Field-frame pose estimation from module odometry, gyro heading, and
//! latency-compensated vision measurements.
//!
//! Odometry consumes per-module distance deltas between cycles, so the
//! integration drifts only with wheel slip and gyro error, not with loop
//! timing jitter. Vision corrections are blended through a fixed-lag scheme:
//! a bounded history of recent odometry poses lets a delayed measurement be
//! compared against where the robot actually was at capture time, and the
//! resulting residual is applied with a constant Kalman-style gain.

use std::collections::VecDeque;

use tracing::debug;
use vela_kinematics::{
    angle_diff, normalize_angle, ModulePosition, Pose2d, SwerveKinematics, MODULE_COUNT,
};

/// How far back (seconds) odometry history is kept for latency compensation.
/// Vision measurements older than this are discarded.
const HISTORY_WINDOW: f64 = 1.5;

/// Default standard deviations of the odometry state estimate, per axis
/// `(x, y, θ)` in meters and radians.
const STATE_STD_DEVS: [f64; 3] = [0.1, 0.1, 0.1];

/// Default standard deviations of a vision measurement, per axis `(x, y, θ)`
/// in meters and radians. Used when a measurement arrives without its own.
const VISION_STD_DEVS: [f64; 3] = [0.9, 0.9, 0.9];

/// Fuses module odometry, gyro heading, and vision into a field-frame pose.
pub struct SwervePoseEstimator {
    kinematics: SwerveKinematics,
    pose: Pose2d,
    last_positions: [ModulePosition; MODULE_COUNT],
    last_heading: f64,
    /// Recent `(timestamp, pose)` samples, oldest first.
    history: VecDeque<(f64, Pose2d)>,
}

impl SwervePoseEstimator {
    /// Create an estimator at the given initial pose.
    ///
    /// # Arguments
    ///
    /// * `kinematics`: The chassis kinematics.
    /// * `initial_pose`: The starting field-frame pose.
    /// * `heading`: The current gyro heading (rad, continuous).
    /// * `positions`: The current module odometry measurements, FL/FR/BL/BR.
    pub fn new(
        kinematics: SwerveKinematics,
        initial_pose: Pose2d,
        heading: f64,
        positions: [ModulePosition; MODULE_COUNT],
    ) -> Self {
        SwervePoseEstimator {
            kinematics,
            pose: initial_pose,
            last_positions: positions,
            last_heading: heading,
            history: VecDeque::new(),
        }
    }

    /// Advance the estimate by one control cycle.
    ///
    /// The translation comes from the least-squares chassis delta of the
    /// module distance deltas, rotated into the field frame; the heading
    /// change comes from the gyro rather than wheel odometry, since the gyro
    /// drifts far less than wheels slip.
    pub fn update(
        &mut self,
        timestamp: f64,
        heading: f64,
        positions: &[ModulePosition; MODULE_COUNT],
    ) -> Pose2d {
        let mut deltas = [ModulePosition::default(); MODULE_COUNT];
        for ((delta, current), last) in deltas
            .iter_mut()
            .zip(positions.iter())
            .zip(self.last_positions.iter())
        {
            *delta = ModulePosition::new(current.distance - last.distance, current.angle);
        }
        self.last_positions = *positions;

        let twist = self.kinematics.to_chassis_delta(&deltas);
        let dtheta = angle_diff(self.last_heading, heading);
        self.last_heading = heading;

        let cos_h = self.pose.theta.cos();
        let sin_h = self.pose.theta.sin();
        self.pose = Pose2d::new(
            self.pose.x + twist.dx * cos_h - twist.dy * sin_h,
            self.pose.y + twist.dx * sin_h + twist.dy * cos_h,
            self.pose.theta + dtheta,
        );

        self.history.push_back((timestamp, self.pose));
        while let Some(&(oldest, _)) = self.history.front() {
            if timestamp - oldest > HISTORY_WINDOW {
                self.history.pop_front();
            } else {
                break;
            }
        }
        self.pose
    }

    /// Blend in a vision pose measurement captured at `timestamp`.
    ///
    /// The measurement is compared against the historical odometry pose
    /// nearest to its capture time, and the residual is applied to the
    /// current estimate with a per-axis gain derived from the odometry and
    /// measurement standard deviations. Measurements older than the retained
    /// history are dropped.
    ///
    /// # Arguments
    ///
    /// * `measurement`: The vision-derived field-frame pose.
    /// * `timestamp`: Capture time of the measurement, on the same clock as
    ///   [`SwervePoseEstimator::update`].
    /// * `std_devs`: Per-axis measurement standard deviations `(x, y, θ)`, or
    ///   `None` to use the defaults.
    pub fn add_vision_measurement(
        &mut self,
        measurement: Pose2d,
        timestamp: f64,
        std_devs: Option<[f64; 3]>,
    ) {
        let Some(&(oldest, _)) = self.history.front() else {
            debug!(timestamp, "dropping vision measurement: no odometry history");
            return;
        };
        if timestamp < oldest {
            debug!(
                timestamp,
                oldest, "dropping stale vision measurement outside history window"
            );
            return;
        }

        // The odometry sample nearest the capture time.
        let sample = self
            .history
            .iter()
            .min_by(|(a, _), (b, _)| {
                (timestamp - a)
                    .abs()
                    .total_cmp(&(timestamp - b).abs())
            })
            .map(|&(_, pose)| pose)
            .unwrap_or(self.pose);

        let r = std_devs.unwrap_or(VISION_STD_DEVS);
        let residual = [
            measurement.x - sample.x,
            measurement.y - sample.y,
            angle_diff(sample.theta, measurement.theta),
        ];
        let mut correction = [0.0; 3];
        for axis in 0..3 {
            let q = STATE_STD_DEVS[axis];
            // Constant steady-state gain; zero measurement noise trusts the
            // measurement completely.
            let k = if r[axis] > 0.0 {
                q / (q + (q * r[axis]).sqrt())
            } else {
                1.0
            };
            correction[axis] = k * residual[axis];
        }

        self.pose = Pose2d::new(
            self.pose.x + correction[0],
            self.pose.y + correction[1],
            self.pose.theta + correction[2],
        );

        // Later measurements compare against history that already reflects
        // this correction.
        for (sample_time, pose) in self.history.iter_mut() {
            if *sample_time >= timestamp {
                *pose = Pose2d::new(
                    pose.x + correction[0],
                    pose.y + correction[1],
                    pose.theta + correction[2],
                );
            }
        }
    }

    /// Reset the estimate to a known pose and discard history.
    pub fn reset_position(
        &mut self,
        pose: Pose2d,
        heading: f64,
        positions: [ModulePosition; MODULE_COUNT],
    ) {
        self.pose = Pose2d::new(pose.x, pose.y, normalize_angle(pose.theta));
        self.last_heading = heading;
        self.last_positions = positions;
        self.history.clear();
    }

    /// The current field-frame pose estimate.
    pub fn position(&self) -> Pose2d {
        self.pose
    }
}
