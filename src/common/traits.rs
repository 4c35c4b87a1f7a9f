//! Collaborator interfaces the planning cycle depends on

use crate::common::error::PlanningResult;
use crate::common::types::{Point2D, Pose};
use crate::kinematics::{KinoDynamicState, ReferenceLine, Trajectory, TrajectoryPoint};
use crate::planning::{Obstacle, PlanningTarget};
use crate::world::{Lane, RouteResponse};

/// Supplies candidate reference lines around the ego vehicle
pub trait ReferenceLineProvider {
    /// Feed the latest ego state before asking for lines
    fn update_vehicle_state(&mut self, state: &KinoDynamicState);

    /// Current candidate reference lines; an error or empty list means none
    fn reference_lines(&mut self) -> PlanningResult<Vec<ReferenceLine>>;

    /// Adopt a new route after a goal request
    fn update_route_response(&mut self, response: &RouteResponse) -> PlanningResult<()>;

    /// Build one reference line along `waypoints`, cropped around `state`
    fn retrieve_reference_line(
        &self,
        state: &KinoDynamicState,
        waypoints: &[Point2D],
        lookahead: f64,
        lookback: f64,
    ) -> PlanningResult<ReferenceLine>;
}

/// Searches for the best trajectory given obstacles and targets.
///
/// The first returned point must coincide with `origin`.
pub trait TrajectoryOptimizer {
    fn name(&self) -> &str;

    fn process(
        &mut self,
        obstacles: &[Obstacle],
        origin: &TrajectoryPoint,
        targets: &[PlanningTarget],
    ) -> PlanningResult<Trajectory>;
}

/// Predicts the future path of an obstacle
pub trait ObstaclePredictor {
    fn predict(&self, obstacle: &Obstacle, horizon: f64, time_step: f64) -> Vec<TrajectoryPoint>;
}

/// Downstream consumer of one trajectory per cycle
pub trait TrajectorySink {
    fn publish(&mut self, trajectory: &Trajectory);
}

/// Route planning for the ego and lane lookup for other agents
pub trait RouteService {
    fn plan_route(&mut self, start: &Pose, goal: &Pose) -> PlanningResult<RouteResponse>;

    fn agent_routes(&mut self, agent_id: i32) -> PlanningResult<Vec<Lane>>;
}

impl<F: FnMut(&Trajectory)> TrajectorySink for F {
    fn publish(&mut self, trajectory: &Trajectory) {
        self(trajectory)
    }
}
