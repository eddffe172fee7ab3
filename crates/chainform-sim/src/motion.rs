//! Poses and differential-drive actuation.

use std::fmt;

use chainform_formation::geometry::{angle_deg, rotate_deg, wrap_degrees};
use chainform_formation::DVec2;

/// Fraction of the body radius an agent can travel per tick.
pub const MAX_SPEED_FACTOR: f64 = 0.3;

/// Where an agent is and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: DVec2,
    /// Degrees counter-clockwise from +x, within [-180, 180).
    pub heading: f64,
    /// Total distance travelled.
    pub odometer: f64,
}

impl Pose {
    pub fn new(position: DVec2, heading: f64) -> Self {
        Self {
            position,
            heading: wrap_degrees(heading),
            odometer: 0.0,
        }
    }

    /// `point` expressed in this pose's frame, +x along the heading.
    pub fn relative(&self, point: DVec2) -> DVec2 {
        rotate_deg(point - self.position, -self.heading)
    }

    /// Translate along the heading, then rotate.
    pub fn apply(&mut self, command: VelocityCommand) {
        self.position += rotate_deg(DVec2::new(command.linear, 0.0), self.heading);
        self.heading = wrap_degrees(self.heading + command.angular);
        self.odometer += command.linear.abs();
    }
}

/// Movement for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Distance along the heading; negative reverses.
    pub linear: f64,
    /// Degrees to turn counter-clockwise.
    pub angular: f64,
}

impl VelocityCommand {
    pub const STOP: Self = Self { linear: 0.0, angular: 0.0 };

    pub fn is_stopped(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}

/// Turns an agent's error into a bounded movement command.
pub trait Actuator: fmt::Debug {
    /// `trans_error` is in the agent's own frame; `rot_error` is in degrees.
    fn compute_movement(&self, trans_error: DVec2, rot_error: f64) -> VelocityCommand;
}

/// Two-wheeled body that arcs toward its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    radius: f64,
    max_speed: f64,
    max_angular: f64,
    threshold: f64,
    angular_threshold: f64,
}

impl DifferentialDrive {
    /// Drive for a body of `radius`. Speeds and thresholds all scale with it.
    pub fn for_radius(radius: f64) -> Self {
        let max_speed = MAX_SPEED_FACTOR * radius;
        let max_angular = (max_speed / radius).to_degrees();
        Self {
            radius,
            max_speed,
            max_angular,
            threshold: max_speed,
            angular_threshold: 0.5 * max_angular,
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn max_angular(&self) -> f64 {
        self.max_angular
    }

    /// Translational errors at or below this are left alone.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn angular_threshold(&self) -> f64 {
        self.angular_threshold
    }

    fn arc_toward(&self, target: DVec2) -> VelocityCommand {
        let theta = angle_deg(target);
        let (sin, cos) = theta.to_radians().sin_cos();
        let t = cos * cos * cos.signum();
        let r = sin * sin * sin.signum();
        let (right, left) = if theta.abs() < 90.0 {
            (self.max_speed * (t + r), self.max_speed * (t - r))
        } else {
            (self.max_speed * (t - r), self.max_speed * (t + r))
        };

        let distance = target.length();
        VelocityCommand {
            linear: (0.5 * (right + left)).clamp(-distance, distance),
            angular: ((right - left) / self.radius)
                .to_degrees()
                .clamp(-self.max_angular, self.max_angular),
        }
    }
}

impl Actuator for DifferentialDrive {
    fn compute_movement(&self, trans_error: DVec2, rot_error: f64) -> VelocityCommand {
        if trans_error.length() > self.threshold {
            self.arc_toward(trans_error)
        } else if rot_error.abs() > self.angular_threshold {
            VelocityCommand {
                linear: 0.0,
                angular: (-rot_error).clamp(-self.max_angular, self.max_angular),
            }
        } else {
            VelocityCommand::STOP
        }
    }
}
