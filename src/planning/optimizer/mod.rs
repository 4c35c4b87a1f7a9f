//! Trajectory optimizers and the registry that selects one by name
//!
//! # Components
//!
//! - `polynomials`: quintic / quartic boundary-value profiles
//! - `frenet_lattice`: sampling optimizer over Frenet end states

pub mod frenet_lattice;
pub mod polynomials;

use std::collections::BTreeMap;

use crate::common::{PlanningError, PlanningResult, TrajectoryOptimizer};
use crate::config::PlanningConfig;

pub use frenet_lattice::{FrenetLatticeConfig, FrenetLatticeOptimizer};

type OptimizerFactory = Box<dyn Fn(&PlanningConfig) -> Box<dyn TrajectoryOptimizer>>;

/// Maps `planner_type` names to optimizer constructors
pub struct OptimizerRegistry {
    factories: BTreeMap<String, OptimizerFactory>,
}

impl OptimizerRegistry {
    /// Registry without any optimizer
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in optimizers
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(FrenetLatticeOptimizer::NAME, |config| {
            Box::new(FrenetLatticeOptimizer::new(
                FrenetLatticeConfig::from_planning_config(config),
            ))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&PlanningConfig) -> Box<dyn TrajectoryOptimizer> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }

    /// Build the optimizer named by `config.planner_type`
    pub fn create(&self, config: &PlanningConfig) -> PlanningResult<Box<dyn TrajectoryOptimizer>> {
        self.factories
            .get(&config.planner_type)
            .map(|factory| factory(config))
            .ok_or_else(|| PlanningError::UnknownOptimizer(config.planner_type.clone()))
    }
}

impl Default for OptimizerRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
