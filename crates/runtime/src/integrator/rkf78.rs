//! Runge-Kutta-Fehlberg 7(8), thirteen passes, adaptive.
//!
//! The embedded 7(8) pair from NASA TR R-287. The step advances on the
//! eighth-order weights; the difference against the seventh-order solution
//! collapses to a single combination of four stages, which feeds the
//! optimal-step estimate.

use super::{optimal_from_error, Integrator};
use crate::state::State;
use crate::stepper::Stepper;

/// Stage nodes.
const C: [f64; 13] = [
    0.0,
    2.0 / 27.0,
    1.0 / 9.0,
    1.0 / 6.0,
    5.0 / 12.0,
    1.0 / 2.0,
    5.0 / 6.0,
    1.0 / 6.0,
    2.0 / 3.0,
    1.0 / 3.0,
    1.0,
    0.0,
    1.0,
];

/// Coupling coefficients; row `k` produces the trial state for stage `k + 1`
/// and uses entries `0..=k`.
const A: [[f64; 12]; 12] = [
    [2.0 / 27.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 36.0, 1.0 / 12.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 24.0, 0.0, 1.0 / 8.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [5.0 / 12.0, 0.0, -25.0 / 16.0, 25.0 / 16.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 20.0, 0.0, 0.0, 1.0 / 4.0, 1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [
        -25.0 / 108.0,
        0.0,
        0.0,
        125.0 / 108.0,
        -65.0 / 27.0,
        125.0 / 54.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        31.0 / 300.0,
        0.0,
        0.0,
        0.0,
        61.0 / 225.0,
        -2.0 / 9.0,
        13.0 / 900.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        2.0,
        0.0,
        0.0,
        -53.0 / 6.0,
        704.0 / 45.0,
        -107.0 / 9.0,
        67.0 / 90.0,
        3.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        -91.0 / 108.0,
        0.0,
        0.0,
        23.0 / 108.0,
        -976.0 / 135.0,
        311.0 / 54.0,
        -19.0 / 60.0,
        17.0 / 6.0,
        -1.0 / 12.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        2383.0 / 4100.0,
        0.0,
        0.0,
        -341.0 / 164.0,
        4496.0 / 1025.0,
        -301.0 / 82.0,
        2133.0 / 4100.0,
        45.0 / 82.0,
        45.0 / 164.0,
        18.0 / 41.0,
        0.0,
        0.0,
    ],
    [
        3.0 / 205.0,
        0.0,
        0.0,
        0.0,
        0.0,
        -6.0 / 41.0,
        -3.0 / 205.0,
        -3.0 / 41.0,
        3.0 / 41.0,
        6.0 / 41.0,
        0.0,
        0.0,
    ],
    [
        -1777.0 / 4100.0,
        0.0,
        0.0,
        -341.0 / 164.0,
        4496.0 / 1025.0,
        -289.0 / 82.0,
        2193.0 / 4100.0,
        51.0 / 82.0,
        33.0 / 164.0,
        12.0 / 41.0,
        0.0,
        1.0,
    ],
];

/// Eighth-order weights (local extrapolation).
const B: [f64; 13] = [
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    34.0 / 105.0,
    9.0 / 35.0,
    9.0 / 35.0,
    9.0 / 280.0,
    9.0 / 280.0,
    0.0,
    41.0 / 840.0,
    41.0 / 840.0,
];

/// Weight on the four-stage combination that forms the embedded error.
const ERR_W: f64 = 41.0 / 840.0;

/// Thirteen-pass embedded 7(8) Fehlberg pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rkf78 {
    t0: f64,
}

impl Rkf78 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Integrator for Rkf78 {
    fn passes(&self) -> usize {
        13
    }

    fn adaptive(&self) -> bool {
        true
    }

    fn propagate(&self, s: &mut State, step: &Stepper) {
        let dt = step.dt;
        match step.kpass {
            0 => {
                s.x0 = s.x.get();
                s.stages[0] = s.xd.get();
                s.x.set(s.x0 + dt * A[0][0] * s.stages[0]);
            }
            k @ 1..=11 => {
                s.stages[k] = s.xd.get();
                let mut sum = 0.0;
                for j in 0..=k {
                    sum += A[k][j] * s.stages[j];
                }
                s.x.set(s.x0 + dt * sum);
            }
            12 => {
                s.stages[12] = s.xd.get();
                let mut sum = 0.0;
                for j in 0..13 {
                    sum += B[j] * s.stages[j];
                }
                s.x.set(s.x0 + dt * sum);
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
            // Stage nodes at the end of the step land on t1 exactly.
            9 | 11 | 12 => step.t = step.t1,
            k => step.t = self.t0 + C[k + 1] * step.dt,
        }

        step.kpass = (step.kpass + 1) % 13;
        if step.kpass == 0 {
            step.align_t1();
            step.initialized = true;
        }
    }

    fn optimal_time_step(&self, state: &State, step: &Stepper) -> Option<f64> {
        let st = &state.stages;
        let err = (step.dt * ERR_W * (st[0] + st[10] - st[11] - st[12])).abs();
        optimal_from_error(step.dt, state.tolerance, err, 7)
    }
}
