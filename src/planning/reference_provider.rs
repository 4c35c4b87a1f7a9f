//! Reference lines cut from the lanes of the last route response

use itertools::Itertools;
use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::common::{PlanningError, PlanningResult, Point2D, ReferenceLineProvider};
use crate::config::PlanningConfig;
use crate::kinematics::{KinoDynamicState, ReferenceLine};
use crate::world::{Lane, RouteResponse};

/// Reference-line provider backed by route lanes
#[derive(Debug, Clone)]
pub struct RouteReferenceProvider {
    lanes: Vec<Lane>,
    state: Option<KinoDynamicState>,
    lookahead: f64,
    lookback: f64,
    lane_half_width: f64,
}

impl RouteReferenceProvider {
    pub fn new(lookahead: f64, lookback: f64, lane_half_width: f64) -> Self {
        Self {
            lanes: Vec::new(),
            state: None,
            lookahead,
            lookback,
            lane_half_width,
        }
    }

    pub fn from_config(config: &PlanningConfig) -> Self {
        Self::new(
            config.reference_lookahead,
            config.reference_lookback,
            config.lane_half_width,
        )
    }
}

/// Waypoints within `lookback` behind and `lookahead` ahead of the one
/// nearest to `position`, measured along the polyline
fn crop_waypoints(
    waypoints: &[Point2D],
    position: &Point2D,
    lookahead: f64,
    lookback: f64,
) -> Vec<Point2D> {
    let nearest = match waypoints
        .iter()
        .position_min_by_key(|p| OrderedFloat(p.distance_squared(position)))
    {
        Some(i) => i,
        None => return Vec::new(),
    };

    let mut start = nearest;
    let mut travelled = 0.0;
    while start > 0 && travelled < lookback {
        travelled += waypoints[start].distance(&waypoints[start - 1]);
        start -= 1;
    }

    let mut end = nearest;
    travelled = 0.0;
    while end + 1 < waypoints.len() && travelled < lookahead {
        travelled += waypoints[end].distance(&waypoints[end + 1]);
        end += 1;
    }

    waypoints[start..=end].to_vec()
}

impl ReferenceLineProvider for RouteReferenceProvider {
    fn update_vehicle_state(&mut self, state: &KinoDynamicState) {
        self.state = Some(*state);
    }

    fn reference_lines(&mut self) -> PlanningResult<Vec<ReferenceLine>> {
        let state = self.state.ok_or(PlanningError::NoReferenceLine)?;
        let lines: Vec<ReferenceLine> = self
            .lanes
            .iter()
            .filter_map(|lane| {
                let line = self.retrieve_reference_line(
                    &state,
                    &lane.waypoints,
                    self.lookahead,
                    self.lookback,
                );
                match line {
                    Ok(line) => Some(line),
                    Err(err) => {
                        warn!("lane {}: {}", lane.id, err);
                        None
                    }
                }
            })
            .collect();
        if lines.is_empty() {
            return Err(PlanningError::NoReferenceLine);
        }
        debug!("{} reference lines from {} lanes", lines.len(), self.lanes.len());
        Ok(lines)
    }

    fn update_route_response(&mut self, response: &RouteResponse) -> PlanningResult<()> {
        if response.lanes.is_empty() {
            return Err(PlanningError::RouteUnavailable(
                "route response has no lanes".to_string(),
            ));
        }
        self.lanes = response.lanes.clone();
        Ok(())
    }

    fn retrieve_reference_line(
        &self,
        state: &KinoDynamicState,
        waypoints: &[Point2D],
        lookahead: f64,
        lookback: f64,
    ) -> PlanningResult<ReferenceLine> {
        let position = Point2D::new(state.x, state.y);
        let cropped = crop_waypoints(waypoints, &position, lookahead, lookback);
        ReferenceLine::new(&cropped, self.lane_half_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(id: i32, y: f64, length: f64) -> Lane {
        Lane {
            id,
            waypoints: (0..=(length as usize / 10))
                .map(|i| Point2D::new(i as f64 * 10.0, y))
                .collect(),
        }
    }

    fn state_at(x: f64, y: f64) -> KinoDynamicState {
        KinoDynamicState::new(x, y, 0.0, 0.0, 5.0, 0.0, 0.0)
    }

    #[test]
    fn test_crop_waypoints_around_nearest() {
        let waypoints = lane(0, 0.0, 200.0).waypoints;
        let cropped = crop_waypoints(&waypoints, &Point2D::new(101.0, 0.5), 30.0, 20.0);
        assert_eq!(cropped.first().unwrap().x, 80.0);
        assert_eq!(cropped.last().unwrap().x, 130.0);
    }

    #[test]
    fn test_no_lines_before_route() {
        let mut provider = RouteReferenceProvider::new(100.0, 10.0, 1.75);
        provider.update_vehicle_state(&state_at(0.0, 0.0));
        assert_eq!(provider.reference_lines().unwrap_err(), PlanningError::NoReferenceLine);
    }

    #[test]
    fn test_one_line_per_usable_lane() {
        let mut provider = RouteReferenceProvider::from_config(&PlanningConfig::default());
        let response = RouteResponse {
            lanes: vec![
                lane(1, 0.0, 500.0),
                lane(2, 3.5, 500.0),
                Lane {
                    id: 3,
                    waypoints: vec![Point2D::new(0.0, 7.0)],
                },
            ],
        };
        provider.update_route_response(&response).unwrap();
        provider.update_vehicle_state(&state_at(50.0, 0.0));

        let lines = provider.reference_lines().unwrap();
        assert_eq!(lines.len(), 2);
        // 30 m lookback, 300 m lookahead from x = 50
        assert!((lines[0].length() - 330.0).abs() < 1e-6);
        let sl = lines[0].xy_to_sl(50.0, 0.0).unwrap();
        assert!((sl.s - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_route_is_rejected() {
        let mut provider = RouteReferenceProvider::new(100.0, 10.0, 1.75);
        assert!(provider.update_route_response(&RouteResponse::default()).is_err());
    }
}
