//! Planning cycle orchestration
//!
//! `MotionPlanner` runs one planning cycle per tick:
//!
//! 1. take a consistent world snapshot and resolve the ego vehicle
//! 2. stitch onto the previous trajectory to get the planning origin
//! 3. gather reference lines, obstacles and planning targets
//! 4. run the trajectory optimizer
//! 5. splice the stitched prefix in front of the result and publish
//!
//! Any failure after the ego is resolved degrades to an emergency stop and
//! drops the history, so the next cycle starts from a reinit point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};

use crate::common::{
    ObstaclePredictor, PlanningError, PlanningResult, Pose, ReferenceLineProvider, RouteService,
    TrajectoryOptimizer, TrajectorySink,
};
use crate::config::PlanningConfig;
use crate::kinematics::{
    KinoDynamicState, ReferenceLine, Trajectory, TrajectoryPoint, TrajectoryStatus,
};
use crate::world::{WorldSnapshot, WorldState};

use super::emergency_stop::EmergencyStopGenerator;
use super::obstacle::{ConstantVelocityPredictor, ObstacleSelector};
use super::optimizer::OptimizerRegistry;
use super::stitching::StitchingTrajectoryComputer;
use super::targets::PlanningTargetBuilder;

/// What a single cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No ego identity has been received yet
    NoEgo,
    /// Ego identity is known but missing from the snapshot
    EgoUnresolved(i32),
    /// A trajectory with this status was published
    Published(TrajectoryStatus),
}

pub struct MotionPlanner {
    config: PlanningConfig,
    world: Arc<WorldState>,
    provider: Box<dyn ReferenceLineProvider>,
    route_service: Box<dyn RouteService>,
    optimizer: Box<dyn TrajectoryOptimizer>,
    predictor: Box<dyn ObstaclePredictor>,
    sink: Box<dyn TrajectorySink>,
    stitching: StitchingTrajectoryComputer,
    selector: ObstacleSelector,
    target_builder: PlanningTargetBuilder,
    emergency_stop: EmergencyStopGenerator,
    history: Option<Trajectory>,
}

impl MotionPlanner {
    /// Build a planner with the optimizer named by `config.planner_type`.
    ///
    /// Fails on an invalid config or an unregistered optimizer name.
    pub fn new(
        config: PlanningConfig,
        registry: &OptimizerRegistry,
        world: Arc<WorldState>,
        provider: Box<dyn ReferenceLineProvider>,
        route_service: Box<dyn RouteService>,
        sink: Box<dyn TrajectorySink>,
    ) -> PlanningResult<Self> {
        config.validate()?;
        let optimizer = registry.create(&config)?;
        info!("motion planner using optimizer '{}'", optimizer.name());
        Ok(Self {
            stitching: StitchingTrajectoryComputer::from_config(&config),
            selector: ObstacleSelector::from_config(&config),
            target_builder: PlanningTargetBuilder::from_config(&config),
            emergency_stop: EmergencyStopGenerator::from_config(&config),
            config,
            world,
            provider,
            route_service,
            optimizer,
            predictor: Box::new(ConstantVelocityPredictor),
            sink,
            history: None,
        })
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn TrajectoryOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_predictor(mut self, predictor: Box<dyn ObstaclePredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    pub fn history(&self) -> Option<&Trajectory> {
        self.history.as_ref()
    }

    /// Run cycles at `loop_rate` until `running` is cleared.
    ///
    /// An overrunning cycle is never cut short; the next one starts late.
    pub fn launch(&mut self, running: &AtomicBool) {
        let period = Duration::from_secs_f64(self.config.cycle_period());
        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            let outcome = self.run_once();
            let elapsed = start.elapsed();
            info!(
                "planning cycle {:?} took {:.3} ms",
                outcome,
                elapsed.as_secs_f64() * 1e3
            );
            match period.checked_sub(elapsed) {
                Some(remaining) => thread::sleep(remaining),
                None => warn!("planning cycle overran its {:?} period", period),
            }
        }
    }

    /// One cycle stamped with the wall clock
    pub fn run_once(&mut self) -> CycleOutcome {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.run_once_at(now)
    }

    /// One cycle at time `now` [s]
    pub fn run_once_at(&mut self, now: f64) -> CycleOutcome {
        let world = self.world.snapshot();
        let ego_id = match world.ego_id {
            Some(id) => id,
            None => {
                debug!("no ego identity yet, skipping cycle");
                return CycleOutcome::NoEgo;
            }
        };
        let state = match world.ego_object() {
            Some(ego) => KinoDynamicState::from_ego(ego, &world.ego_status),
            None => {
                error!("{}", PlanningError::EgoUnresolved(ego_id));
                return CycleOutcome::EgoUnresolved(ego_id);
            }
        };

        let history = self.history.take();
        let (trajectory, history) = self.plan(now, &world, ego_id, &state, history);
        self.history = history;

        self.sink.publish(&trajectory);
        CycleOutcome::Published(trajectory.status)
    }

    /// Plan one cycle from `history`; returns the trajectory to publish and
    /// the history for the next cycle
    fn plan(
        &mut self,
        now: f64,
        world: &WorldSnapshot,
        ego_id: i32,
        state: &KinoDynamicState,
        history: Option<Trajectory>,
    ) -> (Trajectory, Option<Trajectory>) {
        let cycle_period = self.config.cycle_period();
        let mut prefix = self.stitching.compute(
            now,
            cycle_period,
            self.config.preserve_history_points,
            history.as_ref(),
            state,
        );
        let origin = prefix[prefix.len() - 1];

        self.provider.update_vehicle_state(state);
        let reference_lines = match self.provider.reference_lines() {
            Ok(lines) if !lines.is_empty() => lines,
            Ok(_) => return self.stop(&origin, now, PlanningError::NoReferenceLine),
            Err(err) => return self.stop(&origin, now, err),
        };

        let predictor = self.predictor.as_ref();
        let obstacles = match self.selector.select(world, &origin, ego_id, predictor) {
            Ok(obstacles) => obstacles,
            Err(err) => return self.stop(&origin, now, err),
        };
        let targets = self.target_builder.build(reference_lines, &origin);
        debug!(
            "planning with {} obstacles and {} targets",
            obstacles.len(),
            targets.len()
        );

        let optimized = match self.optimizer.process(&obstacles, &origin, &targets) {
            Ok(trajectory) => trajectory,
            Err(err) => return self.stop(&origin, now, err),
        };

        // the optimizer's first point duplicates the origin
        prefix.pop();
        prefix.extend(optimized.points);
        let status = if prefix.is_empty() {
            TrajectoryStatus::Empty
        } else {
            TrajectoryStatus::Normal
        };
        let trajectory = Trajectory::new(prefix, now, status);
        (trajectory.clone(), Some(trajectory))
    }

    fn stop(
        &self,
        origin: &TrajectoryPoint,
        now: f64,
        reason: PlanningError,
    ) -> (Trajectory, Option<Trajectory>) {
        warn!("emergency stop: {}", reason);
        (self.emergency_stop.generate(origin, now), None)
    }

    fn current_vehicle_state(&self) -> Option<KinoDynamicState> {
        let world = self.world.snapshot();
        world
            .ego_object()
            .map(|ego| KinoDynamicState::from_ego(ego, &world.ego_status))
    }

    /// Request a route from the current ego pose to `goal` and hand it to
    /// the reference-line provider. Failures leave the current route in place.
    pub fn handle_goal_request(&mut self, goal: &Pose) -> PlanningResult<()> {
        let result = self.route_to(goal);
        if let Err(err) = &result {
            warn!("goal request ignored: {}", err);
        }
        result
    }

    fn route_to(&mut self, goal: &Pose) -> PlanningResult<()> {
        let state = self.current_vehicle_state().ok_or_else(|| {
            PlanningError::RouteUnavailable("ego vehicle state unknown".to_string())
        })?;
        let start = Pose::new(state.x, state.y, state.z, state.theta);
        let response = self.route_service.plan_route(&start, goal)?;
        self.provider.update_route_response(&response)?;
        info!("route updated with {} lanes", response.lanes.len());
        Ok(())
    }

    /// Candidate reference lines another agent may follow.
    ///
    /// Lanes that cannot be turned into a line are skipped; a failing route
    /// service is an error.
    pub fn agent_potential_reference_lines(
        &mut self,
        agent_state: &KinoDynamicState,
        agent_id: i32,
    ) -> PlanningResult<Vec<ReferenceLine>> {
        let lanes = self.route_service.agent_routes(agent_id)?;
        let lookahead = self.config.agent_lookahead;
        let lookback = self.config.agent_lookback;
        let lines = lanes
            .iter()
            .filter_map(|lane| {
                match self
                    .provider
                    .retrieve_reference_line(agent_state, &lane.waypoints, lookahead, lookback)
                {
                    Ok(line) => Some(line),
                    Err(err) => {
                        warn!("agent {} lane {} skipped: {}", agent_id, lane.id, err);
                        None
                    }
                }
            })
            .collect();
        Ok(lines)
    }
}
