//! Emergency stop profile
//!
//! Closed-form constant-deceleration braking along the origin heading. Used
//! whenever normal planning is unavailable, so it must not fail.

use crate::config::PlanningConfig;
use crate::kinematics::{Trajectory, TrajectoryPoint, TrajectoryStatus};

/// Speeds below this are snapped to rest [m/s]
const STOP_SPEED_EPS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct EmergencyStopGenerator {
    max_horizon: f64,
    time_step: f64,
    max_deceleration: f64,
}

impl EmergencyStopGenerator {
    pub fn new(max_horizon: f64, time_step: f64, max_deceleration: f64) -> Self {
        Self {
            max_horizon,
            time_step,
            max_deceleration,
        }
    }

    pub fn from_config(config: &PlanningConfig) -> Self {
        Self::new(config.max_lookahead_time, config.delta_t, config.max_lon_acc)
    }

    /// Braking trajectory starting at `origin`, stamped with `timestamp`
    pub fn generate(&self, origin: &TrajectoryPoint, timestamp: f64) -> Trajectory {
        let decel = self.max_deceleration.max(0.0);
        let dt = self.time_step;
        let num_steps = if dt > 0.0 {
            (self.max_horizon / dt).floor() as usize
        } else {
            0
        };
        let v0 = origin.v.max(0.0);
        let stop_time = if decel > 0.0 { v0 / decel } else { f64::INFINITY };
        let braking_acc = |t: f64, v: f64| if t < stop_time && v > 0.0 { -decel } else { 0.0 };

        let mut points = Vec::with_capacity(num_steps + 1);
        let mut last = TrajectoryPoint {
            v: v0,
            a: -decel,
            jerk: 0.0,
            ..*origin
        };
        points.push(last);

        for i in 1..=num_steps {
            let t = i as f64 * dt;
            let mut v = last.v + last.a * dt;
            if v < STOP_SPEED_EPS {
                v = 0.0;
            }
            // the vehicle may come to rest inside this step
            let ds = if last.a < 0.0 && v == 0.0 {
                last.v * last.v / (2.0 * -last.a)
            } else {
                last.v * dt + 0.5 * last.a * dt * dt
            };
            let tp = TrajectoryPoint {
                x: last.x + last.theta.cos() * ds,
                y: last.y + last.theta.sin() * ds,
                theta: last.theta,
                s: last.s + ds,
                kappa: 0.0,
                dkappa: 0.0,
                v,
                a: braking_acc(t, v),
                jerk: 0.0,
                steer_angle: origin.steer_angle,
                relative_time: origin.relative_time + t,
            };
            points.push(tp);
            last = tp;
        }

        Trajectory::new(points, timestamp, TrajectoryStatus::EmergencyStop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(v: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            x: 1.0,
            y: 2.0,
            theta: 0.3,
            v,
            a: 1.0,
            relative_time: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_point_is_origin_with_braking() {
        let gen = EmergencyStopGenerator::new(8.0, 0.1, 3.0);
        let traj = gen.generate(&origin(9.0), 12.5);
        assert_eq!(traj.status, TrajectoryStatus::EmergencyStop);
        assert_eq!(traj.len(), 81);
        let first = traj.points[0];
        assert_eq!(first.x, 1.0);
        assert_eq!(first.y, 2.0);
        assert_eq!(first.a, -3.0);
        assert_eq!(first.relative_time, 0.1);
        assert_eq!(traj.timestamp, 12.5);
    }

    #[test]
    fn test_velocity_profile_brakes_to_rest() {
        let gen = EmergencyStopGenerator::new(8.0, 0.1, 3.0);
        let traj = gen.generate(&origin(9.0), 0.0);
        let mut stopped = false;
        for w in traj.points.windows(2) {
            assert!(w[1].v <= w[0].v);
            assert!(w[1].v >= 0.0);
            assert!(w[1].s >= w[0].s);
            if stopped {
                assert_eq!(w[1].v, 0.0);
                assert_eq!(w[1].a, 0.0);
            } else if w[1].v > 0.0 {
                assert!(w[1].v < w[0].v);
            }
            if w[1].v == 0.0 {
                stopped = true;
                assert_eq!(w[1].a, 0.0);
            }
        }
        assert!(stopped);
        // stopping distance v^2 / 2a = 13.5 m along heading 0.3
        let last = traj.last().unwrap();
        assert!((last.s - 13.5).abs() < 1e-6);
        assert!((last.x - (1.0 + 13.5 * 0.3_f64.cos())).abs() < 1e-6);
        assert!(traj.points.iter().all(|p| p.jerk == 0.0 && p.theta == 0.3));
    }

    #[test]
    fn test_stationary_origin() {
        let gen = EmergencyStopGenerator::new(1.0, 0.25, 3.0);
        let traj = gen.generate(&origin(0.0), 0.0);
        assert_eq!(traj.len(), 5);
        assert!(traj.points.iter().all(|p| p.v == 0.0));
        assert!(traj.points[1..].iter().all(|p| p.a == 0.0));
        assert!(traj.points.iter().all(|p| p.x == 1.0));
    }

    #[test]
    fn test_zero_deceleration_does_not_fail() {
        let gen = EmergencyStopGenerator::new(1.0, 0.5, 0.0);
        let traj = gen.generate(&origin(2.0), 0.0);
        assert_eq!(traj.len(), 3);
        assert!(traj.points.iter().all(|p| p.v == 2.0));
    }
}
