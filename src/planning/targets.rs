//! Planning targets: one bounded optimization goal per candidate reference line

use log::warn;

use crate::config::PlanningConfig;
use crate::kinematics::{ReferenceLine, SLPoint, TrajectoryPoint};

/// A reference line annotated with this cycle's bounds
#[derive(Debug, Clone)]
pub struct PlanningTarget {
    pub reference_line: ReferenceLine,
    /// Where the planning origin projects onto the line
    pub origin_sl: SLPoint,
    pub desired_velocity: f64,
    pub has_stop_point: bool,
    /// Stop arc length on the line; +inf without a stop point
    pub stop_s: f64,
    /// Origin lies inside this line's own lane
    pub is_best_behaviour: bool,
}

#[derive(Debug, Clone)]
pub struct PlanningTargetBuilder {
    desired_velocity_cap: f64,
    max_lat_acc: f64,
    stop_safety_margin: f64,
    curvature_epsilon: f64,
}

impl PlanningTargetBuilder {
    pub fn new(
        desired_velocity_cap: f64,
        max_lat_acc: f64,
        stop_safety_margin: f64,
        curvature_epsilon: f64,
    ) -> Self {
        Self {
            desired_velocity_cap,
            max_lat_acc,
            stop_safety_margin,
            curvature_epsilon,
        }
    }

    pub fn from_config(config: &PlanningConfig) -> Self {
        Self::new(
            config.desired_velocity,
            config.max_lat_acc,
            config.stop_safety_margin,
            config.curvature_epsilon,
        )
    }

    /// Targets for every line the origin projects onto; other lines are dropped
    pub fn build(
        &self,
        reference_lines: Vec<ReferenceLine>,
        origin: &TrajectoryPoint,
    ) -> Vec<PlanningTarget> {
        reference_lines
            .into_iter()
            .filter_map(|line| match line.xy_to_sl(origin.x, origin.y) {
                Ok(sl) => Some(self.build_one(line, sl)),
                Err(err) => {
                    warn!("dropping reference line: {}", err);
                    None
                }
            })
            .collect()
    }

    fn build_one(&self, reference_line: ReferenceLine, sl: SLPoint) -> PlanningTarget {
        let length = reference_line.length();
        let has_stop_point = length < sl.s + self.stop_safety_margin;
        let kappa = reference_line.reference_point(sl.s).kappa;
        let curvature_limit = self.max_lat_acc / (kappa.abs() + self.curvature_epsilon);
        PlanningTarget {
            origin_sl: sl,
            desired_velocity: self.desired_velocity_cap.min(curvature_limit),
            has_stop_point,
            stop_s: if has_stop_point { length } else { f64::INFINITY },
            is_best_behaviour: reference_line.is_on_lane(&sl),
            reference_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Point2D;
    use std::f64::consts::PI;

    fn builder() -> PlanningTargetBuilder {
        PlanningTargetBuilder::new(10.0, 3.0, 50.0, 1e-4)
    }

    fn straight(x0: f64, x1: f64, y: f64) -> ReferenceLine {
        ReferenceLine::new(&[Point2D::new(x0, y), Point2D::new(x1, y)], 1.75).unwrap()
    }

    fn origin(x: f64, y: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            x,
            y,
            ..Default::default()
        }
    }

    #[test]
    fn test_stop_point_from_remaining_length() {
        let targets = builder().build(
            vec![straight(0.0, 50.0, 0.0), straight(0.0, 210.0, 3.5)],
            &origin(10.0, 0.0),
        );
        assert_eq!(targets.len(), 2);

        assert!(targets[0].has_stop_point);
        assert!((targets[0].stop_s - 50.0).abs() < 1e-9);
        assert!(targets[0].is_best_behaviour);

        assert!(!targets[1].has_stop_point);
        assert!(targets[1].stop_s.is_infinite());
        assert!(!targets[1].is_best_behaviour);
    }

    #[test]
    fn test_unprojectable_line_is_dropped() {
        let targets = builder().build(
            vec![straight(100.0, 200.0, 0.0), straight(0.0, 200.0, 0.0)],
            &origin(10.0, 0.0),
        );
        assert_eq!(targets.len(), 1);
        assert!((targets[0].origin_sl.s - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_straight_line_speed_is_capped() {
        let targets = builder().build(vec![straight(0.0, 200.0, 0.0)], &origin(5.0, 0.0));
        assert!((targets[0].desired_velocity - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_limits_speed() {
        // arc of radius 1 m: kappa ~ 1, so 3.0 / (1 + eps) < cap
        let waypoints: Vec<Point2D> = (0..=16)
            .map(|i| {
                let a = PI * i as f64 / 16.0;
                Point2D::new(a.cos(), a.sin())
            })
            .collect();
        let line = ReferenceLine::new(&waypoints, 1.75).unwrap();
        let o = line.sl_to_xy(&SLPoint::new(1.5, 0.0));
        let targets = builder().build(vec![line], &origin(o.x, o.y));
        let target = &targets[0];
        let kappa = target
            .reference_line
            .reference_point(target.origin_sl.s)
            .kappa
            .abs();
        assert!(kappa > 0.5);
        assert!(target.desired_velocity <= 10.0);
        assert!(target.desired_velocity <= 3.0 / (kappa + 1e-4) + 1e-9);
        assert!(target.desired_velocity < 6.0);
    }
}
