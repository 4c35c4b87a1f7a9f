//! Trajectory stitching
//!
//! Each cycle the new plan starts from a point on the previously committed
//! trajectory rather than from the raw vehicle state, as long as the vehicle
//! is still following that trajectory closely. The reused prefix keeps a few
//! already-driven points behind the vehicle and ends one cycle ahead, at the
//! point that becomes the next planning origin.
//!
//! When continuity cannot be established (no history, history expired, or
//! the vehicle drifted too far from it) the computer "reinitializes" and
//! returns a single point synthesized from the vehicle state.

use itertools::Itertools;
use log::debug;
use ordered_float::OrderedFloat;

use crate::common::Point2D;
use crate::config::PlanningConfig;
use crate::kinematics::{KinoDynamicState, Trajectory, TrajectoryPoint};

/// Why a stitching request fell back to a single reinit point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinitReason {
    NoHistory,
    BeforeHistory,
    HistoryExpired,
    LateralDeviation,
    LongitudinalDeviation,
}

#[derive(Debug, Clone)]
pub struct StitchingTrajectoryComputer {
    max_lat_deviation: f64,
    max_lon_deviation: f64,
    time_match_epsilon: f64,
    stationary_velocity_epsilon: f64,
    stationary_acceleration_epsilon: f64,
    wheelbase: f64,
}

impl StitchingTrajectoryComputer {
    pub fn from_config(config: &PlanningConfig) -> Self {
        Self {
            max_lat_deviation: config.max_replan_lat_distance,
            max_lon_deviation: config.max_replan_lon_distance,
            time_match_epsilon: config.time_match_epsilon,
            stationary_velocity_epsilon: config.stationary_velocity_epsilon,
            stationary_acceleration_epsilon: config.stationary_acceleration_epsilon,
            wheelbase: config.wheelbase,
        }
    }

    /// Prefix the new plan must continue from. Never empty; its last point is
    /// the planning origin.
    pub fn compute(
        &self,
        now: f64,
        cycle_period: f64,
        preserve_count: usize,
        history: Option<&Trajectory>,
        state: &KinoDynamicState,
    ) -> Vec<TrajectoryPoint> {
        match self.try_stitch(now, cycle_period, preserve_count, history, state) {
            Ok(prefix) => prefix,
            Err(reason) => {
                debug!("stitching reinit: {:?}", reason);
                vec![self.reinit_point(cycle_period, state)]
            }
        }
    }

    fn try_stitch(
        &self,
        now: f64,
        cycle_period: f64,
        preserve_count: usize,
        history: Option<&Trajectory>,
        state: &KinoDynamicState,
    ) -> Result<Vec<TrajectoryPoint>, ReinitReason> {
        let history = match history {
            Some(h) if !h.is_empty() => h,
            _ => return Err(ReinitReason::NoHistory),
        };
        let points = &history.points;
        let relative_time = now - history.timestamp;

        let time_matched_index = time_match_index(points, relative_time, self.time_match_epsilon);
        if time_matched_index == 0 && relative_time < points[0].relative_time {
            return Err(ReinitReason::BeforeHistory);
        }
        if time_matched_index >= points.len() - 1 {
            return Err(ReinitReason::HistoryExpired);
        }

        let position_matched_index = position_match_index(points, &Point2D::new(state.x, state.y));
        let (projected_s, lat_diff) =
            points[position_matched_index].frenet_offset(state.x, state.y);
        let lon_diff = points[time_matched_index].s - projected_s;
        if lat_diff.abs() > self.max_lat_deviation {
            return Err(ReinitReason::LateralDeviation);
        }
        if lon_diff.abs() > self.max_lon_deviation {
            return Err(ReinitReason::LongitudinalDeviation);
        }

        let forward_index =
            time_match_index(points, relative_time + cycle_period, self.time_match_epsilon);
        let matched_index = position_matched_index.min(time_matched_index);
        let start = matched_index.saturating_sub(preserve_count);

        let mut prefix = points[start..=forward_index].to_vec();
        let zero_s = prefix[prefix.len() - 1].s;
        let time_shift = history.timestamp - now;
        for tp in prefix.iter_mut() {
            tp.relative_time += time_shift;
            tp.s -= zero_s;
        }
        debug!(
            "stitched {} points (time match {}, position match {})",
            prefix.len(),
            time_matched_index,
            position_matched_index
        );
        Ok(prefix)
    }

    /// Single planning origin synthesized from the vehicle state
    pub fn reinit_point(&self, cycle_period: f64, state: &KinoDynamicState) -> TrajectoryPoint {
        let stationary = state.v.abs() < self.stationary_velocity_epsilon
            && state.a.abs() < self.stationary_acceleration_epsilon;
        let origin_state = if stationary {
            *state
        } else {
            state.next_state_after_time(cycle_period)
        };
        origin_state.to_trajectory_point(cycle_period, self.wheelbase)
    }
}

/// Index of the earliest point with `relative_time + eps >= relative`; the
/// last index when `relative` lies past the end.
pub fn time_match_index(points: &[TrajectoryPoint], relative: f64, eps: f64) -> usize {
    match points.last() {
        None => 0,
        Some(last) if relative > last.relative_time => points.len() - 1,
        Some(_) => points.partition_point(|tp| tp.relative_time + eps < relative),
    }
}

/// Index of the point nearest to `xy`; the earliest one wins ties
pub fn position_match_index(points: &[TrajectoryPoint], xy: &Point2D) -> usize {
    points
        .iter()
        .position_min_by_key(|tp| OrderedFloat(tp.position().distance_squared(xy)))
        .unwrap_or(0)
}
