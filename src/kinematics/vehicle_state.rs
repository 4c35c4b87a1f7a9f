//! Kinodynamic vehicle state and its forward propagation
//!
//! The propagation model keeps acceleration and curvature constant over the
//! horizon, which is a bicycle model with a fixed steering angle. Velocity is
//! clamped at zero: a braking vehicle stops, it never reverses.

use crate::common::normalize_angle;
use crate::world::{EgoVehicleStatus, ObjectState};

use super::trajectory::TrajectoryPoint;

const STRAIGHT_KAPPA_EPS: f64 = 1e-6;
const MIN_SPEED_FOR_KAPPA: f64 = 0.1;

/// Best current estimate of the ego vehicle state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinoDynamicState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
    pub v: f64,
    pub a: f64,
    pub kappa: f64,
}

impl KinoDynamicState {
    pub fn new(x: f64, y: f64, z: f64, theta: f64, v: f64, a: f64, kappa: f64) -> Self {
        Self {
            x,
            y,
            z,
            theta,
            v,
            a,
            kappa,
        }
    }

    /// Fuse the ego object pose with the ego status speed and acceleration
    pub fn from_ego(object: &ObjectState, status: &EgoVehicleStatus) -> Self {
        let v = status.velocity;
        let kappa = if v.abs() > MIN_SPEED_FOR_KAPPA {
            object.yaw_rate / v
        } else {
            0.0
        };
        Self {
            x: object.pose.position.x,
            y: object.pose.position.y,
            z: object.pose.position.z,
            theta: object.pose.yaw,
            v,
            a: status.acceleration,
            kappa,
        }
    }

    /// Propagate the state forward by `t` seconds
    pub fn next_state_after_time(&self, t: f64) -> Self {
        let mut move_time = t;
        if self.a < 0.0 && self.v > 0.0 {
            move_time = move_time.min(self.v / -self.a);
        }
        let ds = self.v * move_time + 0.5 * self.a * move_time * move_time;
        let v = if self.a < 0.0 && self.v > 0.0 {
            (self.v + self.a * move_time).max(0.0)
        } else {
            self.v + self.a * move_time
        };

        let (x, y, theta) = if self.kappa.abs() < STRAIGHT_KAPPA_EPS {
            (
                self.x + ds * self.theta.cos(),
                self.y + ds * self.theta.sin(),
                self.theta,
            )
        } else {
            let theta_end = self.theta + self.kappa * ds;
            (
                self.x + (theta_end.sin() - self.theta.sin()) / self.kappa,
                self.y + (self.theta.cos() - theta_end.cos()) / self.kappa,
                normalize_angle(theta_end),
            )
        };

        Self {
            x,
            y,
            z: self.z,
            theta,
            v,
            a: self.a,
            kappa: self.kappa,
        }
    }

    /// Trajectory point at `relative_time` with `s` anchored at zero
    pub fn to_trajectory_point(&self, relative_time: f64, wheelbase: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            x: self.x,
            y: self.y,
            theta: self.theta,
            s: 0.0,
            kappa: self.kappa,
            dkappa: 0.0,
            v: self.v,
            a: self.a,
            jerk: 0.0,
            steer_angle: (wheelbase * self.kappa).atan(),
            relative_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Pose;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_straight_constant_speed() {
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0);
        let next = state.next_state_after_time(0.1);
        assert!((next.x - 0.5).abs() < 1e-10);
        assert!(next.y.abs() < 1e-10);
        assert!((next.v - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_braking_stops_without_reversing() {
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, 2.0, -1.0, 0.0);
        let next = state.next_state_after_time(5.0);
        // stops after 2 s having travelled 2 m
        assert!(next.v.abs() < 1e-10);
        assert!((next.x - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_quarter_circle() {
        let radius = 10.0;
        let arc = FRAC_PI_2 * radius;
        let state = KinoDynamicState::new(0.0, 0.0, 0.0, 0.0, arc, 0.0, 1.0 / radius);
        let next = state.next_state_after_time(1.0);
        assert!((next.x - radius).abs() < 1e-9);
        assert!((next.y - radius).abs() < 1e-9);
        assert!((next.theta - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_from_ego_curvature() {
        let object = ObjectState {
            id: 1,
            pose: Pose::new(1.0, 2.0, 0.3, 0.5),
            yaw_rate: 0.4,
            ..Default::default()
        };
        let status = EgoVehicleStatus {
            velocity: 4.0,
            acceleration: 0.5,
            ..Default::default()
        };
        let state = KinoDynamicState::from_ego(&object, &status);
        assert!((state.kappa - 0.1).abs() < 1e-10);
        assert!((state.z - 0.3).abs() < 1e-10);
        assert!((state.a - 0.5).abs() < 1e-10);

        let stopped = EgoVehicleStatus::default();
        assert_eq!(KinoDynamicState::from_ego(&object, &stopped).kappa, 0.0);
    }
}
