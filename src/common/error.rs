//! Error types for motion_planning_core

use std::fmt;

/// Main error type for the planning core
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// Invalid configuration parameter
    InvalidParameter(String),
    /// Requested optimizer is not registered
    UnknownOptimizer(String),
    /// The trajectory optimizer produced no feasible trajectory
    OptimizationFailed(String),
    /// The reference-line provider had no candidate line
    NoReferenceLine,
    /// A point could not be projected onto a reference line
    ProjectionFailed { x: f64, y: f64 },
    /// Route service call failed or returned nothing usable
    RouteUnavailable(String),
    /// Ego identity is known but absent from the world snapshot
    EgoUnresolved(i32),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlanningError::UnknownOptimizer(name) => {
                write!(f, "Unknown trajectory optimizer: {}", name)
            }
            PlanningError::OptimizationFailed(msg) => write!(f, "Optimization failed: {}", msg),
            PlanningError::NoReferenceLine => write!(f, "No reference line available"),
            PlanningError::ProjectionFailed { x, y } => {
                write!(f, "Projection failed for point ({:.3}, {:.3})", x, y)
            }
            PlanningError::RouteUnavailable(msg) => write!(f, "Route unavailable: {}", msg),
            PlanningError::EgoUnresolved(id) => {
                write!(f, "Ego vehicle {} not present in world snapshot", id)
            }
        }
    }
}

impl std::error::Error for PlanningError {}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlanningError::OptimizationFailed("no candidate".to_string());
        assert_eq!(format!("{}", err), "Optimization failed: no candidate");
    }

    #[test]
    fn test_projection_error_display() {
        let err = PlanningError::ProjectionFailed { x: 1.0, y: -2.5 };
        assert_eq!(format!("{}", err), "Projection failed for point (1.000, -2.500)");
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(PlanningError::EgoUnresolved(7));
        assert!(err.to_string().contains('7'));
    }
}
