#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for 2D unicycle robot kinematics."]
#![doc = ""]
#![doc = "This crate provides the pose and twist types shared by the drive model and"]
#![doc = "the single forward-Euler step used to advance a differential-drive robot."]

use core::fmt;
use libm::{cos, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2‑D pose `(x, y, θ)` in world units and radians.
///
/// θ = 0 faces the world +y axis and grows counter‑clockwise, so the robot's
/// forward direction is `(-sin θ, cos θ)`. The heading is never wrapped: a
/// robot that spins for a while reports an accumulated angle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position.
    pub x: f64,
    /// World‑frame y position.
    pub y: f64,
    /// Heading (rad), unbounded.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x position.
    /// * `y`: World-frame y position.
    /// * `theta`: Heading in radians.
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }

    /// Unit vector pointing along the robot's forward axis in the world frame.
    pub fn forward(&self) -> (f64, f64) {
        (-sin(self.theta), cos(self.theta))
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// A velocity command expressed in the robot base frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Linear velocity along the robot's forward axis (units/s).
    pub vx: f64,
    /// Angular velocity around the robot's vertical axis (rad/s).
    pub wz: f64,
}

impl Twist {
    /// Construct a new twist.
    ///
    /// # Arguments
    ///
    /// * `vx`: Linear velocity along the robot's forward axis.
    /// * `wz`: Angular velocity around the robot's vertical axis.
    pub const fn new(vx: f64, wz: f64) -> Self {
        Twist { vx, wz }
    }

    /// `true` when both components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.wz == 0.0
    }
}

impl fmt::Display for Twist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(vx: {:.2}, ωz: {:.2} rad/s)", self.vx, self.wz)
    }
}

/// Scales a tick's step size by the host's speed factor.
///
/// The result is the time span the twist is integrated over; the twist
/// itself is never rescaled.
pub fn effective_dt(step_size: f64, speed_factor: f64) -> f64 {
    step_size * speed_factor
}

/// Advances `pose` by one forward-Euler sub-step of `twist` over `dt`.
///
/// Translation uses the heading at the *start* of the step; the heading is
/// then advanced by `wz * dt`. This is deliberately not an exact-arc
/// integration, so a turning robot accumulates the usual first-order error.
///
/// A `dt` that is zero or negative leaves the pose untouched. Any other
/// value, including non-finite ones, is integrated as given.
///
/// # Arguments
///
/// * `pose`: The pose at the start of the step.
/// * `twist`: The command held constant across the step.
/// * `dt`: The integration span (already scaled by any speed factor).
///
/// # Returns
///
/// The pose at the end of the step.
pub fn integrate(pose: Pose, twist: Twist, dt: f64) -> Pose {
    if dt <= 0.0 {
        return pose;
    }

    let (fx, fy) = pose.forward();
    Pose {
        x: pose.x + twist.vx * fx * dt,
        y: pose.y + twist.vx * fy * dt,
        theta: pose.theta + twist.wz * dt,
    }
}
