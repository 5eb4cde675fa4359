//! Automatic orientation targets.
//!
//! While an orientation target is active, the rotation axis of the driver's
//! command is replaced by a profiled controller steering the robot toward the
//! target heading. This module only computes the goal heading; the profiled
//! controller itself lives with the command layer that consumes it.

use std::f64::consts::PI;
use std::fmt;

use vela_kinematics::{normalize_angle, Pose2d, Translation2d};

/// A caller-supplied source of goal headings, polled every cycle. Returning
/// `None` leaves rotation under manual control for that cycle.
pub type OrientationSupplier = Box<dyn Fn() -> Option<f64>>;

/// The active automatic orientation mode.
pub enum OrientationTarget {
    /// No automatic orientation; rotation follows the manual command.
    Disabled,
    /// Keep the robot's back pointed at a field position, e.g. a goal the
    /// robot scores over its back side.
    Point(Translation2d),
    /// Poll an external supplier for the goal heading each cycle.
    Supplier(OrientationSupplier),
}

impl OrientationTarget {
    /// The goal heading for the given robot pose, or `None` when rotation
    /// stays manual.
    pub fn target_orientation(&self, pose: &Pose2d) -> Option<f64> {
        match self {
            OrientationTarget::Disabled => None,
            OrientationTarget::Point(point) => {
                let bearing = pose.translation().angle_to(point);
                Some(normalize_angle(bearing + PI))
            }
            OrientationTarget::Supplier(supplier) => supplier(),
        }
    }
}

impl fmt::Debug for OrientationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrientationTarget::Disabled => write!(f, "Disabled"),
            OrientationTarget::Point(point) => write!(f, "Point({point})"),
            OrientationTarget::Supplier(_) => write!(f, "Supplier(..)"),
        }
    }
}
