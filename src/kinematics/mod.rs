//! Kinematic models: trajectories, vehicle state propagation and
//! reference-line geometry. Everything here is stateless value types.

pub mod reference_line;
pub mod trajectory;
pub mod vehicle_state;

pub use reference_line::{ReferenceLine, ReferencePoint, SLPoint};
pub use trajectory::{Trajectory, TrajectoryPoint, TrajectoryStatus};
pub use vehicle_state::KinoDynamicState;
