//! Cadence runtime
//!
//! The simulator loop, module scheduling, and the K-pass Runge-Kutta
//! integrator protocol.

pub mod error;
pub mod integrator;
pub mod module;
pub mod registry;
pub mod simulator;
pub mod state;
pub mod stepper;
mod track;

pub use cadence_foundation::{DynamicMap, ModuleId, Phase, SimId, Var};
pub use error::SimError;
pub use integrator::{Dopri45, Integrator, Rk4, Rkf78};
pub use module::{Module, ModuleContext, ModuleHandle};
pub use registry::Registry;
pub use simulator::{DeleteQueue, Simulator, Stopper};
pub use state::State;
pub use stepper::Stepper;
