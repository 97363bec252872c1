//! End-to-end scenarios for the Cadence engine.
//!
//! Each test drives a full simulation through the public surface: modules,
//! integrated states, run-first ordering, stoppers, adaptive stepping, and
//! tracking output.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_runtime::{Dopri45, Module, ModuleContext, Rkf78, SimId, Var};
use cadence_tests::{Harness, HookModule};

/// A point mass dropped from rest: y' = v, v' = -g.
struct FreeFall {
    v: Var,
    yd: Var,
    vd: Var,
}

impl Module for FreeFall {
    fn update(&mut self, _cx: &mut ModuleContext) {
        self.yd.set(self.v.get());
        self.vd.set(-9.81);
    }
}

/// dx/dt = lambda * x.
struct Exponential {
    lambda: f64,
    x: Var,
    xd: Var,
}

impl Module for Exponential {
    fn update(&mut self, _cx: &mut ModuleContext) {
        self.xd.set(self.lambda * self.x.get());
    }
}

#[test]
fn test_free_fall_under_rk4() {
    let mut harness = Harness::new();

    let y = Var::new(0.0);
    let v = Var::new(0.0);
    let yd = Var::new(0.0);
    let vd = Var::new(0.0);

    let id = harness.add(
        "ball",
        FreeFall {
            v: v.clone(),
            yd: yd.clone(),
            vd: vd.clone(),
        },
    );
    let sim = harness.simulator();
    sim.add_integrator(id, &y, &yd, 1e-8);
    sim.add_integrator(id, &v, &vd, 1e-8);

    assert!(harness.run(0.01, 1.0));

    // Polynomial trajectories integrate exactly under RK4.
    assert!((y.get() - (-4.905)).abs() < 1e-6, "y(1) = {}", y.get());
    assert!((v.get() - (-9.81)).abs() < 1e-9, "v(1) = {}", v.get());
    assert!((harness.simulator().t() - 1.0).abs() < 1e-9);
}

#[test]
fn test_exponential_decay_under_rk4() {
    let mut harness = Harness::new();

    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let id = harness.add(
        "decay",
        Exponential {
            lambda: -1.0,
            x: x.clone(),
            xd: xd.clone(),
        },
    );
    harness.simulator().add_integrator(id, &x, &xd, 1e-8);

    assert!(harness.run(0.1, 1.0));
    assert!((x.get() - (-1.0f64).exp()).abs() < 1e-5, "x(1) = {}", x.get());
}

#[test]
fn test_run_first_orders_postcalc() {
    let mut harness = Harness::new();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    // B registered first so insertion order alone would run it first.
    let log_b = Rc::clone(&log);
    let b = harness.add(
        "b",
        HookModule::new().on_postcalc(move |_| log_b.borrow_mut().push("B")),
    );
    let log_a = Rc::clone(&log);
    let a = harness.add(
        "a",
        HookModule::new().on_postcalc(move |_| log_a.borrow_mut().push("A")),
    );
    harness.simulator().run_first(b, a);

    assert!(harness.run(0.1, 0.3));
    assert_eq!(*log.borrow(), vec!["A", "B", "A", "B", "A", "B"]);
}

#[test]
fn test_run_first_orders_update_every_pass() {
    let mut harness = Harness::new();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let log_b = Rc::clone(&log);
    let b = harness.add(
        "b",
        HookModule::new().on_update(move |_| log_b.borrow_mut().push("B")),
    );
    let log_a = Rc::clone(&log);
    let a = harness.add(
        "a",
        HookModule::new().on_update(move |_| log_a.borrow_mut().push("A")),
    );
    harness.simulator().run_first(b, a);

    assert!(harness.run(0.1, 0.3));

    let log = log.borrow();
    // One update per module per pass: 3 steps of 4 passes each.
    assert_eq!(log.len(), 24);
    for pair in log.chunks(2) {
        assert_eq!(pair, ["A", "B"]);
    }
}

#[test]
fn test_mutual_run_first_reports_cycle() {
    let mut harness = Harness::new();

    let a = harness.add("a", HookModule::new());
    let b = harness.add("b", HookModule::new());
    {
        let sim = harness.simulator();
        sim.run_first(a, b);
        sim.run_first(b, a);
    }

    assert!(!harness.run(0.1, 1.0));
    let descriptions: Vec<String> = harness
        .simulator()
        .errors()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert!(
        descriptions
            .iter()
            .any(|d| d == "Circular dependency for update()"),
        "got {descriptions:?}"
    );
}

#[test]
fn test_stopper_ends_run_cleanly() {
    let mut harness = Harness::new();

    let ticks = Rc::new(Cell::new(0usize));
    let ticks_in = Rc::clone(&ticks);
    harness.add(
        "counter",
        HookModule::new().on_postcalc(move |_| ticks_in.set(ticks_in.get() + 1)),
    );
    harness
        .simulator()
        .register_stopper(|step| step.t >= 0.5);

    assert!(harness.run(0.1, 10.0));

    let sim = harness.simulator();
    assert!(sim.ticklast());
    assert!(sim.t() >= 0.5 - 1e-9);
    assert!(sim.t() <= 0.5 + sim.stepper().dtp + 1e-9);
    // The stopping step still ran its post-step phases.
    assert_eq!(ticks.get(), 5);
}

#[test]
fn test_adaptive_growth_clamps_at_twice_base_step() {
    let mut harness = Harness::new();

    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let id = harness.add(
        "decay",
        Exponential {
            lambda: -5.0,
            x: x.clone(),
            xd: xd.clone(),
        },
    );
    {
        let sim = harness.simulator();
        sim.set_integrator(Box::new(Rkf78::new()));
        // An enormous tolerance makes the optimal step far exceed the cap,
        // so every commit is exactly the doubling limit.
        sim.add_integrator(id, &x, &xd, 1e6);
    }

    assert!(harness.run(0.1, 0.5));

    // Steps close at 0.1, 0.3, 0.5: three commits doubling 0.1 -> 0.8.
    let dtp = harness.simulator().stepper().dtp;
    assert!((dtp - 0.8).abs() < 1e-9, "dtp = {dtp}");
}

#[test]
fn test_fsal_adaptive_growth_clamps_at_twice_base_step() {
    let mut harness = Harness::new();

    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let id = harness.add(
        "decay",
        Exponential {
            lambda: -5.0,
            x: x.clone(),
            xd: xd.clone(),
        },
    );
    {
        let sim = harness.simulator();
        sim.set_integrator(Box::new(Dopri45::new()));
        sim.add_integrator(id, &x, &xd, 1e6);
    }

    assert!(harness.run(0.1, 0.5));

    // The first step runs uninformed; the estimate from each completed step
    // then doubles the base step at every boundary: 0.1 -> 0.2 -> 0.4 -> 0.8.
    let dtp = harness.simulator().stepper().dtp;
    assert!((dtp - 0.8).abs() < 1e-9, "dtp = {dtp}");
}

#[test]
fn test_adaptive_dopri45_stays_within_tolerance() {
    let mut harness = Harness::new();

    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let id = harness.add(
        "decay",
        Exponential {
            lambda: -1.0,
            x: x.clone(),
            xd: xd.clone(),
        },
    );
    {
        let sim = harness.simulator();
        sim.set_integrator(Box::new(Dopri45::new()));
        sim.add_integrator(id, &x, &xd, 1e-9);
    }

    assert!(harness.run(0.01, 0.2));
    assert!(
        (x.get() - (-0.2f64).exp()).abs() < 1e-6,
        "x(0.2) = {}",
        x.get()
    );
}

#[test]
fn test_tracking_rows_match_sample_times() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = Harness::new();

    let y = Var::new(0.0);
    let v = Var::new(0.0);
    let yd = Var::new(0.0);
    let vd = Var::new(0.0);
    let id = harness.add(
        "ball",
        FreeFall {
            v: v.clone(),
            yd: yd.clone(),
            vd: vd.clone(),
        },
    );
    {
        let sim = harness.simulator();
        sim.add_integrator(id, &y, &yd, 1e-8);
        sim.add_integrator(id, &v, &vd, 1e-8);
        sim.expose(id, "y", &y);
        sim.track(id, "t");
        sim.track(id, "y");
        sim.set_output_dir(id, dir.path());
    }

    assert!(harness.run(0.01, 0.1));

    let sim = harness.simulator();
    // The initial sample plus one per completed step.
    assert_eq!(sim.t_hist().len(), 11);
    assert_eq!(sim.samples(id).unwrap().len(), sim.t_hist().len());

    let text = std::fs::read_to_string(dir.path().join("ball.txt")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "t, ball y");
    assert_eq!(lines.len(), 1 + 11);
}

#[test]
fn test_tracking_unknown_variable_is_an_error() {
    let mut harness = Harness::new();
    let id = harness.add("m", HookModule::new());
    harness.simulator().track(id, "ghost");

    assert!(!harness.run(0.1, 1.0));
    assert!(harness
        .simulator()
        .errors()
        .iter()
        .any(|e| e.to_string().contains("ghost")));
}

/// A harmonic oscillator split across two modules must integrate exactly as
/// the single-module version: every state advances one pass before any state
/// advances to the next, so cross-module derivatives see the same values.
#[test]
fn test_lockstep_coupling_matches_single_module() {
    // Split system in simulation 0.
    let mut harness = Harness::new();
    let y_split = Var::new(1.0);
    let v_split = Var::new(0.0);
    let yd = Var::new(0.0);
    let vd = Var::new(0.0);

    struct Position {
        v: Var,
        yd: Var,
    }
    impl Module for Position {
        fn update(&mut self, _cx: &mut ModuleContext) {
            self.yd.set(self.v.get());
        }
    }
    struct Velocity {
        y: Var,
        vd: Var,
    }
    impl Module for Velocity {
        fn update(&mut self, _cx: &mut ModuleContext) {
            self.vd.set(-self.y.get());
        }
    }

    let pos = harness.add(
        "position",
        Position {
            v: v_split.clone(),
            yd: yd.clone(),
        },
    );
    let vel = harness.add(
        "velocity",
        Velocity {
            y: y_split.clone(),
            vd: vd.clone(),
        },
    );
    {
        let sim = harness.simulator();
        sim.add_integrator(pos, &y_split, &yd, 1e-8);
        sim.add_integrator(vel, &v_split, &vd, 1e-8);
    }
    assert!(harness.run(0.01, 1.0));

    // Reference system in simulation 1.
    let y_ref = Var::new(1.0);
    let v_ref = Var::new(0.0);
    let yd_ref = Var::new(0.0);
    let vd_ref = Var::new(0.0);

    struct Oscillator {
        y: Var,
        v: Var,
        yd: Var,
        vd: Var,
    }
    impl Module for Oscillator {
        fn update(&mut self, _cx: &mut ModuleContext) {
            self.yd.set(self.v.get());
            self.vd.set(-self.y.get());
        }
    }

    let osc = harness.registry.add_module(
        SimId(1),
        "oscillator",
        Oscillator {
            y: y_ref.clone(),
            v: v_ref.clone(),
            yd: yd_ref.clone(),
            vd: vd_ref.clone(),
        },
    );
    {
        let sim = harness.registry.simulator(SimId(1));
        sim.add_integrator(osc, &y_ref, &yd_ref, 1e-8);
        sim.add_integrator(osc, &v_ref, &vd_ref, 1e-8);
    }
    assert!(harness.registry.run(SimId(1), 0.01, 1.0));

    assert!((y_split.get() - y_ref.get()).abs() < 1e-12);
    assert!((v_split.get() - v_ref.get()).abs() < 1e-12);
    // y(t) = cos(t) for these initial conditions.
    assert!((y_split.get() - 1.0f64.cos()).abs() < 1e-7);
}

#[test]
fn test_freeze_integration_skips_propagation_only() {
    let mut harness = Harness::new();

    let x = Var::new(0.0);
    let xd = Var::new(0.0);
    let updates = Rc::new(Cell::new(0usize));
    let updates_in = Rc::clone(&updates);
    let xd_in = xd.clone();
    let id = harness.add(
        "held",
        HookModule::new().on_update(move |_| {
            xd_in.set(1.0);
            updates_in.set(updates_in.get() + 1);
        }),
    );
    {
        let sim = harness.simulator();
        sim.add_integrator(id, &x, &xd, 1e-8);
        sim.set_freeze_integration(id, true);
    }

    assert!(harness.run(0.1, 0.5));
    assert_eq!(x.get(), 0.0);
    assert!(updates.get() > 0);
}

#[test]
fn test_time_is_non_decreasing_through_updates() {
    let mut harness = Harness::new();

    let times: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let times_in = Rc::clone(&times);
    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let x_in = x.clone();
    let xd_in = xd.clone();
    let id = harness.add(
        "probe",
        HookModule::new().on_update(move |cx| {
            xd_in.set(-x_in.get());
            times_in.borrow_mut().push(cx.t);
        }),
    );
    harness.simulator().add_integrator(id, &x, &xd, 1e-8);

    assert!(harness.run(0.1, 0.5));

    let times = times.borrow();
    assert!(!times.is_empty());
    for pair in times.windows(2) {
        assert!(pair[1] >= pair[0], "clock went backwards: {pair:?}");
    }
    assert!((times[times.len() - 1] - 0.5).abs() < 1e-9);
}

#[test]
fn test_two_runs_continue_the_trajectory() {
    let mut harness = Harness::new();

    let x = Var::new(1.0);
    let xd = Var::new(0.0);
    let id = harness.add(
        "decay",
        Exponential {
            lambda: -1.0,
            x: x.clone(),
            xd: xd.clone(),
        },
    );
    harness.simulator().add_integrator(id, &x, &xd, 1e-8);

    assert!(harness.run(0.1, 0.5));
    assert!((harness.simulator().t() - 0.5).abs() < 1e-9);
    assert!(harness.run(0.1, 1.0));

    assert!((harness.simulator().t() - 1.0).abs() < 1e-9);
    assert!((x.get() - (-1.0f64).exp()).abs() < 1e-5);
}

#[test]
fn test_mid_run_destruction_of_a_peer() {
    let mut harness = Harness::new();

    let victim_updates = Rc::new(Cell::new(0usize));
    let victim_in = Rc::clone(&victim_updates);
    let victim = harness.add(
        "victim",
        HookModule::new().on_update(move |_| victim_in.set(victim_in.get() + 1)),
    );

    let fired = Rc::new(Cell::new(false));
    let fired_in = Rc::clone(&fired);
    harness.add(
        "assassin",
        HookModule::new().on_postcalc(move |cx| {
            if cx.t >= 0.3 - 1e-9 && !fired_in.get() {
                fired_in.set(true);
                cx.destroy(victim);
            }
        }),
    );

    assert!(harness.run(0.1, 0.6));

    let sim = harness.simulator();
    assert!(!sim.contains_module(victim));
    assert_eq!(sim.module_count(), 1);
    // The victim updated through t = 0.3 (3 steps of 4 passes) and no more.
    assert_eq!(victim_updates.get(), 12);
}
