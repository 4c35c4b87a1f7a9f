//! Time-parameterized trajectory types

use nalgebra::Vector2;

use crate::common::Point2D;

/// One sample of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
    /// Heading [rad]
    pub theta: f64,
    /// Arc length along the owning trajectory [m]
    pub s: f64,
    /// Curvature [1/m]
    pub kappa: f64,
    /// Curvature rate [1/m^2]
    pub dkappa: f64,
    /// Velocity [m/s]
    pub v: f64,
    /// Acceleration [m/s^2]
    pub a: f64,
    /// Jerk [m/s^3]
    pub jerk: f64,
    /// Steering angle [rad]
    pub steer_angle: f64,
    /// Seconds since the owning trajectory's reference timestamp
    pub relative_time: f64,
}

impl TrajectoryPoint {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Decompose a world position into (longitudinal s, signed lateral offset)
    /// in the Frenet frame anchored at this point.
    ///
    /// Lateral is positive to the left of the heading.
    pub fn frenet_offset(&self, x: f64, y: f64) -> (f64, f64) {
        let offset = Vector2::new(x - self.x, y - self.y);
        let heading = Vector2::new(self.theta.cos(), self.theta.sin());
        let lon = offset.dot(&heading) + self.s;
        let lat = heading.x * offset.y - heading.y * offset.x;
        (lon, lat)
    }
}

/// Outcome tag carried by every published trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryStatus {
    Normal,
    Empty,
    EmergencyStop,
}

/// Ordered trajectory with a wall-clock reference timestamp [s]
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
    pub timestamp: f64,
    pub status: TrajectoryStatus,
}

impl Trajectory {
    pub fn new(points: Vec<TrajectoryPoint>, timestamp: f64, status: TrajectoryStatus) -> Self {
        Self {
            points,
            timestamp,
            status,
        }
    }

    pub fn empty(timestamp: f64) -> Self {
        Self::new(Vec::new(), timestamp, TrajectoryStatus::Empty)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// True when relative_time and s never decrease along the points
    pub fn is_monotonic(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].relative_time >= w[0].relative_time && w[1].s >= w[0].s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frenet_offset_straight() {
        let p = TrajectoryPoint {
            x: 1.0,
            y: 1.0,
            s: 10.0,
            ..Default::default()
        };
        let (s, l) = p.frenet_offset(3.0, 2.0);
        assert!((s - 12.0).abs() < 1e-10);
        assert!((l - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_frenet_offset_rotated_heading() {
        let p = TrajectoryPoint {
            theta: FRAC_PI_2,
            ..Default::default()
        };
        // heading points +y, a point at +x lies to the right
        let (s, l) = p.frenet_offset(1.0, 2.0);
        assert!((s - 2.0).abs() < 1e-10);
        assert!((l + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_monotonic_check() {
        let mut traj = Trajectory::empty(0.0);
        for i in 0..5 {
            traj.points.push(TrajectoryPoint {
                s: i as f64,
                relative_time: i as f64 * 0.1,
                ..Default::default()
            });
        }
        assert!(traj.is_monotonic());
        traj.points[3].s = 0.5;
        assert!(!traj.is_monotonic());
    }
}
