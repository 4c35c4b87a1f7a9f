//! World snapshot shared between transport handlers and the planning loop.
//!
//! Handlers never mutate a snapshot in place. Each update copies the current
//! snapshot (maps are behind `Arc`, so the copy is shallow), replaces one
//! field, and swaps the result in. The planning loop grabs one `Arc` at the
//! start of a cycle and reads only that for the rest of the cycle.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use super::objects::{
    EgoVehicleInfo, EgoVehicleStatus, ObjectState, TrafficSignalInfo, TrafficSignalStatus,
};

/// Immutable view of everything the planner knows about the world
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    pub ego_id: Option<i32>,
    pub ego_info: Option<EgoVehicleInfo>,
    pub ego_status: EgoVehicleStatus,
    pub objects: Arc<HashMap<i32, ObjectState>>,
    pub signal_status: Arc<HashMap<i32, TrafficSignalStatus>>,
    pub signal_info: Arc<HashMap<i32, TrafficSignalInfo>>,
}

impl WorldSnapshot {
    pub fn ego_object(&self) -> Option<&ObjectState> {
        self.ego_id.and_then(|id| self.objects.get(&id))
    }
}

/// Last-writer-wins world state updated by the transport layer
#[derive(Debug, Default)]
pub struct WorldState {
    current: RwLock<Arc<WorldSnapshot>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot for one planning cycle
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.current.read())
    }

    fn update<F: FnOnce(&mut WorldSnapshot)>(&self, f: F) {
        let mut guard = self.current.write();
        let mut next = WorldSnapshot::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Replace the whole object map
    pub fn update_objects<I: IntoIterator<Item = ObjectState>>(&self, objects: I) {
        let map: HashMap<i32, ObjectState> = objects.into_iter().map(|o| (o.id, o)).collect();
        self.update(|w| w.objects = Arc::new(map));
    }

    pub fn update_signal_status<I: IntoIterator<Item = TrafficSignalStatus>>(&self, statuses: I) {
        let map: HashMap<i32, TrafficSignalStatus> =
            statuses.into_iter().map(|s| (s.id, s)).collect();
        self.update(|w| w.signal_status = Arc::new(map));
    }

    pub fn update_signal_info<I: IntoIterator<Item = TrafficSignalInfo>>(&self, infos: I) {
        let map: HashMap<i32, TrafficSignalInfo> = infos.into_iter().map(|s| (s.id, s)).collect();
        self.update(|w| w.signal_info = Arc::new(map));
    }

    pub fn update_ego_status(&self, status: EgoVehicleStatus) {
        self.update(|w| w.ego_status = status);
    }

    /// Store ego info and adopt its id as the ego identity
    pub fn update_ego_info(&self, ego_info: EgoVehicleInfo) {
        info!("ego vehicle id: {}", ego_info.id);
        self.update(|w| {
            w.ego_id = Some(ego_info.id);
            w.ego_info = Some(ego_info);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{TrafficSignalState, EgoVehicleInfo};

    #[test]
    fn test_snapshot_is_not_torn_by_later_updates() {
        let world = WorldState::new();
        world.update_objects(vec![ObjectState {
            id: 1,
            ..Default::default()
        }]);
        let snapshot = world.snapshot();

        world.update_objects(vec![
            ObjectState {
                id: 2,
                ..Default::default()
            },
            ObjectState {
                id: 3,
                ..Default::default()
            },
        ]);

        assert_eq!(snapshot.objects.len(), 1);
        assert!(snapshot.objects.contains_key(&1));
        assert_eq!(world.snapshot().objects.len(), 2);
    }

    #[test]
    fn test_update_replaces_map_wholesale() {
        let world = WorldState::new();
        world.update_signal_status(vec![
            TrafficSignalStatus {
                id: 10,
                state: TrafficSignalState::Red,
            },
            TrafficSignalStatus {
                id: 11,
                state: TrafficSignalState::Green,
            },
        ]);
        world.update_signal_status(vec![TrafficSignalStatus {
            id: 12,
            state: TrafficSignalState::Yellow,
        }]);
        let snapshot = world.snapshot();
        assert_eq!(snapshot.signal_status.len(), 1);
        assert!(snapshot.signal_status.contains_key(&12));
    }

    #[test]
    fn test_ego_info_sets_identity() {
        let world = WorldState::new();
        assert!(world.snapshot().ego_id.is_none());
        world.update_ego_info(EgoVehicleInfo {
            id: 42,
            type_name: "vehicle.tesla.model3".to_string(),
        });
        world.update_objects(vec![ObjectState {
            id: 42,
            ..Default::default()
        }]);
        let snapshot = world.snapshot();
        assert_eq!(snapshot.ego_id, Some(42));
        assert_eq!(snapshot.ego_object().map(|o| o.id), Some(42));
    }
}
