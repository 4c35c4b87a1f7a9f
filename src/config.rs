//! Planning configuration
//!
//! One `PlanningConfig` is built at startup and handed to every component.

use crate::common::{PlanningError, PlanningResult};

/// Configuration for the planning core
#[derive(Debug, Clone)]
pub struct PlanningConfig {
    /// Planning loop frequency [Hz]
    pub loop_rate: f64,
    /// History points kept behind the matched point when stitching
    pub preserve_history_points: usize,
    /// Lateral drift beyond which stitching reinitializes [m]
    pub max_replan_lat_distance: f64,
    /// Longitudinal drift beyond which stitching reinitializes [m]
    pub max_replan_lon_distance: f64,
    /// Trajectory horizon [s]
    pub max_lookahead_time: f64,
    /// Trajectory time step [s]
    pub delta_t: f64,
    /// Longitudinal acceleration limit, also the emergency deceleration [m/s^2]
    pub max_lon_acc: f64,
    /// Global desired velocity cap [m/s]
    pub desired_velocity: f64,
    /// Lateral acceleration limit [m/s^2]
    pub max_lat_acc: f64,
    /// Maximum curvature the vehicle can follow [1/m]
    pub max_curvature: f64,
    /// Radius around the planning origin in which obstacles are considered [m]
    pub obstacle_radius: f64,
    /// Maximum height difference from the ego for an obstacle to count [m]
    pub obstacle_height_gate: f64,
    /// Remaining reference length below which a stop point is set [m]
    pub stop_safety_margin: f64,
    /// Name of the trajectory optimizer
    pub planner_type: String,
    /// Ego reference line lookahead / lookback [m]
    pub reference_lookahead: f64,
    pub reference_lookback: f64,
    /// Other-agent reference line lookahead / lookback [m]
    pub agent_lookahead: f64,
    pub agent_lookback: f64,
    /// Half width of a lane around its reference line [m]
    pub lane_half_width: f64,
    /// Tolerance for time matching against a history trajectory [s]
    pub time_match_epsilon: f64,
    /// Below these the vehicle counts as stationary on reinit
    pub stationary_velocity_epsilon: f64,
    pub stationary_acceleration_epsilon: f64,
    /// Added to |kappa| when bounding speed by lateral acceleration
    pub curvature_epsilon: f64,
    /// Wheelbase length [m]
    pub wheelbase: f64,
    /// Vehicle collision radius used by the built-in optimizer [m]
    pub collision_radius: f64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            loop_rate: 10.0,
            preserve_history_points: 5,
            max_replan_lat_distance: 0.5,
            max_replan_lon_distance: 2.5,
            max_lookahead_time: 8.0,
            delta_t: 0.1,
            max_lon_acc: 3.0,
            desired_velocity: 10.0,
            max_lat_acc: 3.0,
            max_curvature: 0.3,
            obstacle_radius: 50.0,
            obstacle_height_gate: 1.5,
            stop_safety_margin: 50.0,
            planner_type: "frenet_lattice".to_string(),
            reference_lookahead: 300.0,
            reference_lookback: 30.0,
            agent_lookahead: 100.0,
            agent_lookback: 20.0,
            lane_half_width: 1.75,
            time_match_epsilon: 1.0e-5,
            stationary_velocity_epsilon: 0.1,
            stationary_acceleration_epsilon: 0.4,
            curvature_epsilon: 1.0e-4,
            wheelbase: 2.8,
            collision_radius: 2.0,
        }
    }
}

impl PlanningConfig {
    /// Planning cycle period [s]
    pub fn cycle_period(&self) -> f64 {
        1.0 / self.loop_rate
    }

    pub fn validate(&self) -> PlanningResult<()> {
        let positive = [
            ("loop_rate", self.loop_rate),
            ("max_lookahead_time", self.max_lookahead_time),
            ("delta_t", self.delta_t),
            ("max_lon_acc", self.max_lon_acc),
            ("max_lat_acc", self.max_lat_acc),
            ("max_curvature", self.max_curvature),
            ("obstacle_radius", self.obstacle_radius),
            ("lane_half_width", self.lane_half_width),
            ("curvature_epsilon", self.curvature_epsilon),
            ("wheelbase", self.wheelbase),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(PlanningError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("max_replan_lat_distance", self.max_replan_lat_distance),
            ("max_replan_lon_distance", self.max_replan_lon_distance),
            ("desired_velocity", self.desired_velocity),
            ("obstacle_height_gate", self.obstacle_height_gate),
            ("stop_safety_margin", self.stop_safety_margin),
            ("collision_radius", self.collision_radius),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(PlanningError::InvalidParameter(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }
        if self.delta_t > self.max_lookahead_time {
            return Err(PlanningError::InvalidParameter(
                "delta_t exceeds max_lookahead_time".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PlanningConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.cycle_period() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_deceleration() {
        let config = PlanningConfig {
            max_lon_acc: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlanningError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_negative_margin() {
        let config = PlanningConfig {
            stop_safety_margin: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
