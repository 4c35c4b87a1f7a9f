//! Common types, traits, and error definitions for motion_planning_core

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
