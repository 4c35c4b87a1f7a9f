//! motion_planning_core - per-cycle decision core of a vehicle motion planner
//!
//! This crate stitches each new plan onto the previously committed
//! trajectory, selects relevant obstacles, builds planning targets from
//! reference lines, runs a trajectory optimizer and falls back to an
//! emergency stop whenever planning is not possible.

// Core modules
pub mod common;
pub mod config;

// Models and world state
pub mod kinematics;
pub mod world;

// Planning cycle
pub mod planning;

// Re-export common types for convenience
pub use common::{Point2D, Point3D, Pose};
pub use common::{ObstaclePredictor, ReferenceLineProvider, RouteService};
pub use common::{TrajectoryOptimizer, TrajectorySink};
pub use common::{PlanningError, PlanningResult};
pub use config::PlanningConfig;
pub use kinematics::{
    KinoDynamicState, ReferenceLine, Trajectory, TrajectoryPoint, TrajectoryStatus,
};
pub use planning::{CycleOutcome, MotionPlanner};
pub use world::{WorldSnapshot, WorldState};
