//! Obstacles and the per-cycle obstacle selection
//!
//! An obstacle is either a tracked dynamic object or a restrictive traffic
//! signal, which the planner treats as a stationary object sitting at the
//! centre of the signal's trigger volume.

use log::debug;

use crate::common::{ObstaclePredictor, PlanningError, PlanningResult, Point2D, Point3D};
use crate::config::PlanningConfig;
use crate::kinematics::TrajectoryPoint;
use crate::world::{ObjectState, TrafficSignalInfo, TrafficSignalStatus, WorldSnapshot};

/// Where an obstacle came from
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleKind {
    DynamicObject(ObjectState),
    TrafficSignal {
        info: TrafficSignalInfo,
        status: TrafficSignalStatus,
    },
}

/// Planner-facing obstacle with its predicted future path
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    kind: ObstacleKind,
    trajectory: Vec<TrajectoryPoint>,
}

impl Obstacle {
    pub fn from_object(object: ObjectState) -> Self {
        Self {
            kind: ObstacleKind::DynamicObject(object),
            trajectory: Vec::new(),
        }
    }

    pub fn from_signal(info: TrafficSignalInfo, status: TrafficSignalStatus) -> Self {
        Self {
            kind: ObstacleKind::TrafficSignal { info, status },
            trajectory: Vec::new(),
        }
    }

    pub fn id(&self) -> i32 {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => object.id,
            ObstacleKind::TrafficSignal { info, .. } => info.id,
        }
    }

    pub fn is_traffic_signal(&self) -> bool {
        matches!(self.kind, ObstacleKind::TrafficSignal { .. })
    }

    pub fn x(&self) -> f64 {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => object.pose.position.x,
            ObstacleKind::TrafficSignal { info, .. } => info.trigger_volume.center.x,
        }
    }

    pub fn y(&self) -> f64 {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => object.pose.position.y,
            ObstacleKind::TrafficSignal { info, .. } => info.trigger_volume.center.y,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x(), self.y())
    }

    pub fn heading(&self) -> f64 {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => object.pose.yaw,
            ObstacleKind::TrafficSignal { info, .. } => info.transform.yaw,
        }
    }

    pub fn speed(&self) -> f64 {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => object.speed,
            ObstacleKind::TrafficSignal { .. } => 0.0,
        }
    }

    /// Footprint (length, width) [m]
    pub fn footprint(&self) -> (f64, f64) {
        match &self.kind {
            ObstacleKind::DynamicObject(object) => (object.length, object.width),
            ObstacleKind::TrafficSignal { info, .. } => {
                (info.trigger_volume.size.x, info.trigger_volume.size.y)
            }
        }
    }

    pub fn predicted_trajectory(&self) -> &[TrajectoryPoint] {
        &self.trajectory
    }

    pub fn predict_trajectory<P: ObstaclePredictor + ?Sized>(
        &mut self,
        predictor: &P,
        horizon: f64,
        time_step: f64,
    ) {
        self.trajectory = predictor.predict(self, horizon, time_step);
    }
}

/// Extrapolates objects at constant speed along their heading and holds
/// traffic signals in place
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantVelocityPredictor;

impl ObstaclePredictor for ConstantVelocityPredictor {
    fn predict(&self, obstacle: &Obstacle, horizon: f64, time_step: f64) -> Vec<TrajectoryPoint> {
        let n = (horizon / time_step).floor() as usize;
        let theta = obstacle.heading();
        let v = obstacle.speed();
        (0..=n)
            .map(|i| {
                let t = i as f64 * time_step;
                let s = v * t;
                TrajectoryPoint {
                    x: obstacle.x() + s * theta.cos(),
                    y: obstacle.y() + s * theta.sin(),
                    theta,
                    s,
                    v,
                    relative_time: t,
                    ..Default::default()
                }
            })
            .collect()
    }
}

/// Spatial gate applied to world entries around the planning origin
#[derive(Debug, Clone)]
pub struct ObstacleSelector {
    radius: f64,
    height_gate: f64,
    horizon: f64,
    time_step: f64,
}

impl ObstacleSelector {
    pub fn new(radius: f64, height_gate: f64, horizon: f64, time_step: f64) -> Self {
        Self {
            radius,
            height_gate,
            horizon,
            time_step,
        }
    }

    pub fn from_config(config: &PlanningConfig) -> Self {
        Self::new(
            config.obstacle_radius,
            config.obstacle_height_gate,
            config.max_lookahead_time,
            config.delta_t,
        )
    }

    fn in_range(&self, origin: &TrajectoryPoint, p: &Point3D, ego_z: f64) -> bool {
        origin.position().distance(&p.xy()) < self.radius && (p.z - ego_z).abs() < self.height_gate
    }

    /// Obstacles relevant to a plan starting at `origin`, sorted by id.
    ///
    /// Fails only when `ego_id` has no entry in the snapshot's object map.
    pub fn select<P: ObstaclePredictor + ?Sized>(
        &self,
        world: &WorldSnapshot,
        origin: &TrajectoryPoint,
        ego_id: i32,
        predictor: &P,
    ) -> PlanningResult<Vec<Obstacle>> {
        let ego = world
            .objects
            .get(&ego_id)
            .ok_or(PlanningError::EgoUnresolved(ego_id))?;
        let ego_z = ego.pose.position.z;

        let mut obstacles: Vec<Obstacle> = world
            .objects
            .values()
            .filter(|object| object.id != ego_id)
            .filter(|object| self.in_range(origin, &object.pose.position, ego_z))
            .map(|object| Obstacle::from_object(*object))
            .collect();

        let mut signals: Vec<Obstacle> = world
            .signal_info
            .iter()
            .filter_map(|(id, info)| world.signal_status.get(id).map(|status| (info, status)))
            .filter(|(_, status)| status.state.is_restrictive())
            .filter(|(info, _)| self.in_range(origin, &info.trigger_volume.center, ego_z))
            .map(|(info, status)| Obstacle::from_signal(*info, *status))
            .collect();

        obstacles.sort_by_key(|o| o.id());
        signals.sort_by_key(|o| o.id());
        obstacles.append(&mut signals);

        for obstacle in obstacles.iter_mut() {
            obstacle.predict_trajectory(predictor, self.horizon, self.time_step);
        }
        debug!("selected {} obstacles", obstacles.len());
        Ok(obstacles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Point3D, Pose};
    use crate::world::{TrafficSignalState, TriggerVolume, WorldState};

    const EGO: i32 = 1;

    fn object(id: i32, x: f64, y: f64, z: f64) -> ObjectState {
        ObjectState {
            id,
            pose: Pose::new(x, y, z, 0.0),
            speed: 2.0,
            length: 4.5,
            width: 2.0,
            ..Default::default()
        }
    }

    fn signal(id: i32, x: f64, y: f64) -> TrafficSignalInfo {
        TrafficSignalInfo {
            id,
            transform: Pose::new(x, y, 0.0, 0.0),
            trigger_volume: TriggerVolume {
                center: Point3D::new(x, y, 0.0),
                size: Point3D::new(2.0, 6.0, 2.0),
            },
        }
    }

    fn status(id: i32, state: TrafficSignalState) -> TrafficSignalStatus {
        TrafficSignalStatus { id, state }
    }

    fn selector() -> ObstacleSelector {
        ObstacleSelector::new(50.0, 1.5, 2.0, 0.5)
    }

    #[test]
    fn test_selects_objects_within_gates() {
        let world = WorldState::new();
        world.update_objects(vec![
            object(EGO, 0.0, 0.0, 0.0),
            object(2, 10.0, 0.0, 0.0),
            object(3, 60.0, 0.0, 0.0),
            object(4, 10.0, 5.0, 3.0),
            object(5, 49.9, 0.0, 1.0),
        ]);
        let origin = TrajectoryPoint::default();
        let obstacles = selector()
            .select(&world.snapshot(), &origin, EGO, &ConstantVelocityPredictor)
            .unwrap();
        let ids: Vec<i32> = obstacles.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![2, 5]);
        for o in &obstacles {
            assert!(o.position().distance(&origin.position()) < 50.0);
            assert_eq!(o.predicted_trajectory().len(), 5);
        }
    }

    #[test]
    fn test_gates_against_origin_not_ego() {
        let world = WorldState::new();
        world.update_objects(vec![object(EGO, 0.0, 0.0, 0.0), object(2, 90.0, 0.0, 0.0)]);
        let origin = TrajectoryPoint {
            x: 45.0,
            ..Default::default()
        };
        let obstacles = selector()
            .select(&world.snapshot(), &origin, EGO, &ConstantVelocityPredictor)
            .unwrap();
        assert_eq!(obstacles.len(), 1);
    }

    #[test]
    fn test_signal_selection() {
        let world = WorldState::new();
        world.update_objects(vec![object(EGO, 0.0, 0.0, 0.0)]);
        world.update_signal_info(vec![
            signal(100, 20.0, 0.0),
            signal(101, 20.0, 3.0),
            signal(102, 25.0, 0.0),
            signal(103, 30.0, 0.0),
            signal(104, 200.0, 0.0),
        ]);
        world.update_signal_status(vec![
            status(100, TrafficSignalState::Red),
            status(101, TrafficSignalState::Green),
            status(102, TrafficSignalState::Unknown),
            // 103 has no status
            status(104, TrafficSignalState::Red),
            // status without geometry
            status(105, TrafficSignalState::Red),
        ]);
        let obstacles = selector()
            .select(
                &world.snapshot(),
                &TrajectoryPoint::default(),
                EGO,
                &ConstantVelocityPredictor,
            )
            .unwrap();
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0].id(), 100);
        assert!(obstacles[0].is_traffic_signal());
        // stationary prediction
        let last = obstacles[0].predicted_trajectory().last().unwrap();
        assert!((last.x - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_signal_height_gate() {
        let world = WorldState::new();
        world.update_objects(vec![object(EGO, 0.0, 0.0, 0.0)]);
        let mut overpass = signal(110, 20.0, 0.0);
        overpass.trigger_volume.center.z = 2.0;
        let mut raised = signal(111, 25.0, 0.0);
        raised.trigger_volume.center.z = 1.0;
        world.update_signal_info(vec![overpass, raised]);
        world.update_signal_status(vec![
            status(110, TrafficSignalState::Red),
            status(111, TrafficSignalState::Red),
        ]);
        let obstacles = selector()
            .select(
                &world.snapshot(),
                &TrajectoryPoint::default(),
                EGO,
                &ConstantVelocityPredictor,
            )
            .unwrap();
        let ids: Vec<i32> = obstacles.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![111]);
    }

    #[test]
    fn test_missing_ego_is_error() {
        let world = WorldState::new();
        world.update_objects(vec![object(2, 0.0, 0.0, 0.0)]);
        let result = selector().select(
            &world.snapshot(),
            &TrajectoryPoint::default(),
            EGO,
            &ConstantVelocityPredictor,
        );
        assert_eq!(result, Err(PlanningError::EgoUnresolved(EGO)));
    }

    #[test]
    fn test_constant_velocity_prediction() {
        let mut obstacle = Obstacle::from_object(object(7, 1.0, 1.0, 0.0));
        obstacle.predict_trajectory(&ConstantVelocityPredictor, 1.0, 0.25);
        let traj = obstacle.predicted_trajectory();
        assert_eq!(traj.len(), 5);
        assert!((traj[4].x - 3.0).abs() < 1e-10);
        assert!((traj[4].relative_time - 1.0).abs() < 1e-10);
    }
}
