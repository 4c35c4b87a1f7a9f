//! World model fed by the transport layer

pub mod objects;
pub mod route;
pub mod snapshot;

pub use objects::{
    EgoVehicleInfo, EgoVehicleStatus, ObjectState, TrafficSignalInfo, TrafficSignalState,
    TrafficSignalStatus, TriggerVolume,
};
pub use route::{Lane, RouteResponse};
pub use snapshot::{WorldSnapshot, WorldState};
