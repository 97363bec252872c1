//! K-pass Runge-Kutta integrators
//!
//! An integrator advances every registered state through the stages of its
//! tableau in lock-step: the simulator runs one `propagate` pass over all
//! states, re-evaluates every module's derivatives, then runs the next pass.
//! `update_clock` moves the shared clock to the node of the next stage and,
//! on the pass that closes the step, to `t1` exactly, wrapping the pass
//! index and re-aligning `t1` to the base step so sampling stays phased.
//!
//! Adaptive integrators report a per-state `optimal_time_step` from their
//! embedded error estimate; FSAL integrators reuse the closing stage of one
//! step as the opening stage of the next, so their estimate is read at the
//! start of the following step once the stepper reports `initialized`.

mod dopri45;
mod rk4;
mod rkf78;

pub use dopri45::Dopri45;
pub use rk4::Rk4;
pub use rkf78::Rkf78;

use crate::state::State;
use crate::stepper::Stepper;

/// Safety factor applied to optimal step estimates.
pub(crate) const STEP_SAFETY: f64 = 0.9;

/// A K-pass Runge-Kutta stepping scheme.
pub trait Integrator {
    /// Number of passes per step.
    fn passes(&self) -> usize;

    /// Whether the step size adapts from an embedded error estimate taken at
    /// the end of a completed step.
    fn adaptive(&self) -> bool {
        false
    }

    /// Whether the error estimate needs the first derivative evaluation of
    /// the *next* step (First-Same-As-Last reuse).
    fn adaptive_fsal(&self) -> bool {
        false
    }

    /// Advance one state through the pass `step.kpass`.
    fn propagate(&self, state: &mut State, step: &Stepper);

    /// Advance the shared clock past the pass that just ran.
    fn update_clock(&mut self, step: &mut Stepper);

    /// The step size that would bring this state's local error estimate to
    /// its tolerance, or `None` when the estimate gives no constraint.
    fn optimal_time_step(&self, state: &State, step: &Stepper) -> Option<f64> {
        let _ = (state, step);
        None
    }
}

/// Shared step-size formula: `safety * dt * (tolerance / err)^(1/(order+1))`.
pub(crate) fn optimal_from_error(dt: f64, tolerance: f64, err: f64, order: u32) -> Option<f64> {
    if !(err > 0.0) || !(tolerance > 0.0) || !err.is_finite() {
        return None;
    }
    Some(STEP_SAFETY * dt.abs() * (tolerance / err).powf(1.0 / (order as f64 + 1.0)))
}
