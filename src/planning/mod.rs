//! Per-cycle planning: stitching, fallback braking, obstacle and target
//! selection, trajectory optimization and the cycle orchestrator

pub mod emergency_stop;
pub mod motion_planner;
pub mod obstacle;
pub mod optimizer;
pub mod reference_provider;
pub mod stitching;
pub mod targets;

pub use emergency_stop::EmergencyStopGenerator;
pub use motion_planner::{CycleOutcome, MotionPlanner};
pub use obstacle::{ConstantVelocityPredictor, Obstacle, ObstacleKind, ObstacleSelector};
pub use optimizer::{FrenetLatticeConfig, FrenetLatticeOptimizer, OptimizerRegistry};
pub use reference_provider::RouteReferenceProvider;
pub use stitching::{ReinitReason, StitchingTrajectoryComputer};
pub use targets::{PlanningTarget, PlanningTargetBuilder};
