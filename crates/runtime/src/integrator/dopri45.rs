//! Dormand-Prince 5(4), seven stages driven as six passes, FSAL.
//!
//! The seventh stage of one step is evaluated at the advanced state and time,
//! which is exactly the first derivative evaluation of the next step. The
//! solution itself never needs it, so the pass machine runs six passes and
//! the error estimate picks the missing stage up as the current derivative at
//! the start of the following step.

use super::{optimal_from_error, Integrator};
use crate::state::State;
use crate::stepper::Stepper;

/// Stage nodes.
const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];

/// Fifth-order weights; the zero weight on the FSAL stage is implicit.
const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Difference between the fifth- and fourth-order weights. The last entry
/// multiplies the FSAL stage.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

/// Dormand-Prince 5(4) with First-Same-As-Last stage reuse.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dopri45 {
    t0: f64,
}

impl Dopri45 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Integrator for Dopri45 {
    fn passes(&self) -> usize {
        6
    }

    fn adaptive_fsal(&self) -> bool {
        true
    }

    fn propagate(&self, s: &mut State, step: &Stepper) {
        let dt = step.dt;
        let st = &mut s.stages;
        match step.kpass {
            0 => {
                s.x0 = s.x.get();
                st[0] = s.xd.get();
                s.x.set(s.x0 + dt * (1.0 / 5.0) * st[0]);
            }
            1 => {
                st[1] = s.xd.get();
                s.x.set(s.x0 + dt * (3.0 / 40.0 * st[0] + 9.0 / 40.0 * st[1]));
            }
            2 => {
                st[2] = s.xd.get();
                s.x.set(
                    s.x0 + dt * (44.0 / 45.0 * st[0] - 56.0 / 15.0 * st[1] + 32.0 / 9.0 * st[2]),
                );
            }
            3 => {
                st[3] = s.xd.get();
                s.x.set(
                    s.x0 + dt
                        * (19372.0 / 6561.0 * st[0] - 25360.0 / 2187.0 * st[1]
                            + 64448.0 / 6561.0 * st[2]
                            - 212.0 / 729.0 * st[3]),
                );
            }
            4 => {
                st[4] = s.xd.get();
                s.x.set(
                    s.x0 + dt
                        * (9017.0 / 3168.0 * st[0] - 355.0 / 33.0 * st[1]
                            + 46732.0 / 5247.0 * st[2]
                            + 49.0 / 176.0 * st[3]
                            - 5103.0 / 18656.0 * st[4]),
                );
            }
            5 => {
                st[5] = s.xd.get();
                s.x.set(
                    s.x0 + dt
                        * (B[0] * st[0]
                            + B[2] * st[2]
                            + B[3] * st[3]
                            + B[4] * st[4]
                            + B[5] * st[5]),
                );
            }
            _ => {}
        }
    }

    fn update_clock(&mut self, step: &mut Stepper) {
        match step.kpass {
            0 => {
                self.t0 = step.t;
                step.t = self.t0 + C[1] * step.dt;
            }
            k @ 1..=3 => step.t = self.t0 + C[k + 1] * step.dt,
            // The last two stage nodes both sit at the end of the step.
            _ => step.t = step.t1,
        }

        step.kpass = (step.kpass + 1) % 6;
        if step.kpass == 0 {
            step.align_t1();
            step.initialized = true;
        }
    }

    fn optimal_time_step(&self, state: &State, step: &Stepper) -> Option<f64> {
        let st = &state.stages;
        // The FSAL stage is the derivative just evaluated at the start of the
        // current step.
        let k_last = state.xd.get();
        let err = (step.dt
            * (E[0] * st[0]
                + E[2] * st[2]
                + E[3] * st[3]
                + E[4] * st[4]
                + E[5] * st[5]
                + E[6] * k_last))
            .abs();
        optimal_from_error(step.dt, state.tolerance, err, 4)
    }
}
