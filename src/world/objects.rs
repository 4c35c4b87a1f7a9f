//! Inbound world messages: dynamic objects, ego status, traffic signals

use crate::common::{Point3D, Pose};

/// Tracked dynamic object (vehicles, pedestrians, and the ego itself)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectState {
    pub id: i32,
    pub pose: Pose,
    /// Speed along the heading [m/s]
    pub speed: f64,
    /// Yaw rate [rad/s]
    pub yaw_rate: f64,
    pub acceleration: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Ego vehicle status as reported by the vehicle interface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EgoVehicleStatus {
    pub velocity: f64,
    pub acceleration: f64,
    pub steer: f64,
}

/// Static ego vehicle description; delivering it sets the ego identity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EgoVehicleInfo {
    pub id: i32,
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficSignalState {
    Red,
    Yellow,
    Green,
    Off,
    Unknown,
}

impl TrafficSignalState {
    /// Green and unknown signals never constrain the planner
    pub fn is_restrictive(&self) -> bool {
        !matches!(self, TrafficSignalState::Green | TrafficSignalState::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSignalStatus {
    pub id: i32,
    pub state: TrafficSignalState,
}

/// Box in which a signal applies to traffic
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriggerVolume {
    pub center: Point3D,
    /// Extent along x, y and z [m]
    pub size: Point3D,
}

/// Signal geometry, delivered separately from its status
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrafficSignalInfo {
    pub id: i32,
    pub transform: Pose,
    pub trigger_volume: TriggerVolume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrictive_signal_states() {
        assert!(TrafficSignalState::Red.is_restrictive());
        assert!(TrafficSignalState::Yellow.is_restrictive());
        assert!(TrafficSignalState::Off.is_restrictive());
        assert!(!TrafficSignalState::Green.is_restrictive());
        assert!(!TrafficSignalState::Unknown.is_restrictive());
    }
}
