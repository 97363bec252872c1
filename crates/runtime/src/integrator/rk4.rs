//! Classical fourth-order Runge-Kutta, four passes, fixed step.

use super::Integrator;
use crate::state::State;
use crate::stepper::Stepper;

/// Fourth-order, four-pass Runge-Kutta.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rk4;

impl Integrator for Rk4 {
    fn passes(&self) -> usize {
        4
    }

    fn propagate(&self, s: &mut State, step: &Stepper) {
        let dt = step.dt;
        match step.kpass {
            0 => {
                s.x0 = s.x.get();
                s.stages[0] = s.xd.get();
                s.x.set(s.x0 + 0.5 * dt * s.stages[0]);
            }
            1 => {
                s.stages[1] = s.xd.get();
                s.x.set(s.x0 + 0.5 * dt * s.stages[1]);
            }
            2 => {
                s.stages[2] = s.xd.get();
                s.x.set(s.x0 + dt * s.stages[2]);
            }
            3 => {
                s.stages[3] = s.xd.get();
                s.x.set(
                    s.x0 + dt / 6.0
                        * (s.stages[0] + 2.0 * s.stages[1] + 2.0 * s.stages[2] + s.stages[3]),
                );
            }
            _ => {}
        }
    }

    fn update_clock(&mut self, step: &mut Stepper) {
        // Both midpoint stages evaluate at t + dt/2, so the clock only moves
        // after passes 0 and 2.
        match step.kpass {
            0 => step.t += 0.5 * step.dt,
            2 => step.t = step.t1,
            _ => {}
        }

        step.kpass = (step.kpass + 1) % 4;
        if step.kpass == 0 {
            step.align_t1();
            step.initialized = true;
        }
    }
}
