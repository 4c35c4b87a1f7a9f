//! Route service messages

use crate::common::Point2D;

/// One drivable lane as a polyline of waypoints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lane {
    pub id: i32,
    pub waypoints: Vec<Point2D>,
}

/// Answer to a route request: candidate lanes from start to goal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteResponse {
    pub lanes: Vec<Lane>,
}
