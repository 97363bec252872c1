//! Cadence foundation
//!
//! Shared types for the simulation engine: typed identifiers, the execution
//! phase enum, shared scalar handles, and the staged-erase dynamic map.

pub mod dynamic_map;
pub mod ids;
pub mod phase;
pub mod var;

pub use dynamic_map::DynamicMap;
pub use ids::{ModuleId, SimId};
pub use phase::Phase;
pub use var::Var;
