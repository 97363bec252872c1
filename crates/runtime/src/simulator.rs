//! The simulator
//!
//! One `Simulator` owns everything a logical simulation needs: the shared
//! step context, a boxed integrator, the module maps for every lifecycle
//! phase, per-module scheduling records, stoppers, the deletion queue, and
//! the tracked-sample history.
//!
//! A tick is one iteration of the `run` loop: one integrator pass plus the
//! surrounding phases. Sample boundaries (between completed Runge-Kutta
//! steps, when the pass index has wrapped to zero) are where post-step
//! phases, stoppers, tracking, step-size changes, and deferred destruction
//! happen.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error, info, trace};

use cadence_foundation::{DynamicMap, ModuleId, Phase, SimId, Var};

use crate::error::SimError;
use crate::integrator::{Integrator, Rk4};
use crate::module::{Command, Module, ModuleContext, ModuleHandle, ModuleRecord};
use crate::state::State;
use crate::stepper::Stepper;
use crate::track;

/// Stop-condition observer, polled once per completed step. Returning true
/// requests a clean stop at the current sample boundary.
pub type Stopper = Box<dyn FnMut(&Stepper) -> bool>;

/// Deferred-destruction queue. Handles may be cloned into module structs so
/// destructor cascades can enqueue further removals.
pub type DeleteQueue = Rc<RefCell<Vec<ModuleId>>>;

/// One logical simulation.
pub struct Simulator {
    sim: SimId,
    stepper: Stepper,
    integrator: Box<dyn Integrator>,
    tend: f64,
    phase: Phase,

    modules: DynamicMap<ModuleId, ModuleHandle>,
    inits: DynamicMap<ModuleId, ModuleHandle>,
    updates: DynamicMap<ModuleId, ModuleHandle>,
    postcalcs: DynamicMap<ModuleId, ModuleHandle>,
    checks: DynamicMap<ModuleId, ModuleHandle>,
    reports: DynamicMap<ModuleId, ModuleHandle>,
    resets: DynamicMap<ModuleId, ModuleHandle>,
    propagate: DynamicMap<ModuleId, ModuleHandle>,
    trackers: DynamicMap<ModuleId, ModuleHandle>,

    records: IndexMap<ModuleId, ModuleRecord>,

    t_hist: Vec<f64>,
    to_delete: DeleteQueue,
    stoppers: Vec<Stopper>,
    pending: Vec<Command>,

    errors: Vec<SimError>,
    error: bool,
    running: bool,
    tickfirst: bool,
    ticklast: bool,
    tick0: bool,
    stop_simulation: bool,
    time_advanced: bool,
    track_time: bool,
    change_dt: bool,
    dt_change: f64,
}

impl Simulator {
    pub fn new(sim: SimId) -> Self {
        info!(sim = %sim, "simulator created");
        Self {
            sim,
            stepper: Stepper::new(),
            integrator: Box::new(Rk4),
            tend: 0.0,
            phase: Phase::Setup,
            modules: DynamicMap::new(),
            inits: DynamicMap::new(),
            updates: DynamicMap::new(),
            postcalcs: DynamicMap::new(),
            checks: DynamicMap::new(),
            reports: DynamicMap::new(),
            resets: DynamicMap::new(),
            propagate: DynamicMap::new(),
            trackers: DynamicMap::new(),
            records: IndexMap::new(),
            t_hist: Vec::new(),
            to_delete: Rc::new(RefCell::new(Vec::new())),
            stoppers: Vec::new(),
            pending: Vec::new(),
            errors: Vec::new(),
            error: false,
            running: false,
            tickfirst: true,
            ticklast: false,
            tick0: true,
            stop_simulation: false,
            time_advanced: false,
            track_time: false,
            change_dt: false,
            dt_change: 0.0,
        }
    }

    // ---- registration -----------------------------------------------------

    /// Register a module in every phase map. An empty name defaults to
    /// `"<id, sim>"`.
    pub fn add_module(&mut self, name: impl Into<String>, module: impl Module + 'static) -> ModuleId {
        self.add_module_handle(name, Rc::new(RefCell::new(module)))
    }

    /// Register an already shared module handle.
    pub fn add_module_handle(&mut self, name: impl Into<String>, handle: ModuleHandle) -> ModuleId {
        let id = ModuleId::next();
        self.install(id, name.into(), handle);
        id
    }

    fn install(&mut self, id: ModuleId, name: String, handle: ModuleHandle) {
        let name = if name.is_empty() {
            format!("<{}, {}>", id, self.sim)
        } else {
            name
        };
        debug!(sim = %self.sim, module = %id, name = %name, "module registered");
        self.records.insert(id, ModuleRecord::new(name));
        self.modules.insert(id, handle.clone());
        self.inits.insert(id, handle.clone());
        self.updates.insert(id, handle.clone());
        self.postcalcs.insert(id, handle.clone());
        self.checks.insert(id, handle.clone());
        self.reports.insert(id, handle.clone());
        self.resets.insert(id, handle);
    }

    /// Remove a module from every map immediately.
    pub fn remove_module(&mut self, id: ModuleId) {
        if self.records.shift_remove(&id).is_none() {
            return;
        }
        debug!(sim = %self.sim, module = %id, "module removed");
        self.modules.direct_erase_key(&id);
        self.inits.direct_erase_key(&id);
        self.updates.direct_erase_key(&id);
        self.postcalcs.direct_erase_key(&id);
        self.checks.direct_erase_key(&id);
        self.reports.direct_erase_key(&id);
        self.resets.direct_erase_key(&id);
        self.propagate.direct_erase_key(&id);
        self.trackers.direct_erase_key(&id);
    }

    /// Register one integrated state for a module.
    pub fn add_integrator(&mut self, id: ModuleId, x: &Var, xd: &Var, tolerance: f64) {
        let passes = self.integrator.passes();
        let Some(rec) = self.records.get_mut(&id) else {
            return;
        };
        rec.states.push(State::new(x.clone(), xd.clone(), tolerance, passes));
        if !self.propagate.contains(&id) {
            if let Some(handle) = self.modules.get(&id).cloned() {
                self.propagate.insert(id, handle);
            }
        }
    }

    /// Swap the stepping scheme. Existing states get fresh stage storage.
    pub fn set_integrator(&mut self, integrator: Box<dyn Integrator>) {
        let passes = integrator.passes();
        self.integrator = integrator;
        self.stepper.kpass = 0;
        self.stepper.initialized = false;
        for rec in self.records.values_mut() {
            for state in &mut rec.states {
                state.resize(passes);
            }
        }
    }

    /// Expose a named variable so it can be tracked.
    pub fn expose(&mut self, id: ModuleId, name: &str, var: &Var) {
        if let Some(rec) = self.records.get_mut(&id) {
            rec.vars.insert(name.to_string(), var.clone());
        }
    }

    /// Track one of the module's own variables. The name `"t"` records
    /// sample times instead.
    pub fn track(&mut self, id: ModuleId, var: &str) {
        self.track_pair(id, id, var);
    }

    /// Track a peer module's variable.
    pub fn track_remote(&mut self, id: ModuleId, owner: ModuleId, var: &str) {
        self.track_pair(id, owner, var);
    }

    fn track_pair(&mut self, id: ModuleId, owner: ModuleId, var: &str) {
        if var == "t" {
            self.track_time = true;
            return;
        }
        let known = self
            .records
            .get(&owner)
            .map(|r| r.vars.contains_key(var))
            .unwrap_or(false);
        if !known {
            self.record_error(SimError::UnknownVariable {
                module: owner,
                name: var.to_string(),
            });
            return;
        }
        if let Some(rec) = self.records.get_mut(&id) {
            rec.tracking.push((owner, var.to_string()));
        }
        if !self.trackers.contains(&id) {
            if let Some(handle) = self.modules.get(&id).cloned() {
                self.trackers.insert(id, handle);
            }
        }
    }

    /// Declare that `before` must complete update/postcalc before `id`.
    pub fn run_first(&mut self, id: ModuleId, before: ModuleId) {
        if let Some(rec) = self.records.get_mut(&id) {
            if !rec.run_first.contains(&before) {
                rec.run_first.push(before);
            }
        }
    }

    pub fn set_frozen(&mut self, id: ModuleId, on: bool) {
        if let Some(rec) = self.records.get_mut(&id) {
            rec.frozen = on;
        }
    }

    pub fn set_freeze_integration(&mut self, id: ModuleId, on: bool) {
        if let Some(rec) = self.records.get_mut(&id) {
            rec.freeze_integration = on;
        }
    }

    /// Directory the module's tracking file is written into.
    pub fn set_output_dir(&mut self, id: ModuleId, dir: impl Into<std::path::PathBuf>) {
        if let Some(rec) = self.records.get_mut(&id) {
            rec.dir = dir.into();
        }
    }

    /// Install a stop predicate, polled once per completed step.
    pub fn register_stopper(&mut self, stopper: impl FnMut(&Stepper) -> bool + 'static) {
        self.stoppers.push(Box::new(stopper));
    }

    /// Broadcast an error tolerance to every registered state.
    pub fn integration_tolerance(&mut self, tolerance: f64) {
        for rec in self.records.values_mut() {
            for state in &mut rec.states {
                state.tolerance = tolerance;
            }
        }
    }

    /// Handle to the deferred-destruction queue.
    pub fn deletion_queue(&self) -> DeleteQueue {
        Rc::clone(&self.to_delete)
    }

    // ---- accessors --------------------------------------------------------

    pub fn id(&self) -> SimId {
        self.sim
    }

    pub fn t(&self) -> f64 {
        self.stepper.t
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn errors(&self) -> &[SimError] {
        &self.errors
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn ticklast(&self) -> bool {
        self.ticklast
    }

    pub fn time_advanced(&self) -> bool {
        self.time_advanced
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.modules.contains(&id)
    }

    pub fn module_name(&self, id: ModuleId) -> Option<&str> {
        self.records.get(&id).map(|r| r.name.as_str())
    }

    pub fn t_hist(&self) -> &[f64] {
        &self.t_hist
    }

    /// Recorded sample rows for a tracking module.
    pub fn samples(&self, id: ModuleId) -> Option<&[Vec<f64>]> {
        self.records.get(&id).map(|r| r.rows.as_slice())
    }

    /// Record a cooperative runtime error; the run halts at the next check.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.record_error(SimError::Runtime(message.into()));
    }

    pub(crate) fn record_error(&mut self, err: SimError) {
        error!(sim = %self.sim, %err, "simulation error");
        self.error = true;
        self.errors.push(err);
    }

    // ---- the tick loop ----------------------------------------------------

    /// Drive the simulation from the current time to `tmax` with base step
    /// `dt`. Returns false if any error was recorded.
    pub fn run(&mut self, dt: f64, tmax: f64) -> bool {
        self.tend = tmax;
        info!(sim = %self.sim, dt, tmax, "run starting");

        if self.tend <= self.stepper.t {
            self.record_error(SimError::EndTimeNotAfterCurrent {
                tend: self.tend,
                t: self.stepper.t,
            });
        }
        if self.modules.is_empty() {
            self.record_error(SimError::NoModules);
        }

        self.running = true;
        if !self.error {
            self.setup(dt);
            self.drive(Phase::Init);
        }

        while !self.error {
            self.event(self.tend);

            if self.tickfirst {
                // The very first tick records the sample time before the
                // first report; later ticks record after each step. Keeping
                // this order keeps tracked series lengths consistent.
                if self.tick0 && self.track_time {
                    self.t_hist.push(self.stepper.t);
                }
                self.change_time_step();
                self.drive(Phase::Report);
                if self.tick0 {
                    self.tracker();
                    self.tick0 = false;
                }
            }

            self.drive(Phase::Update);
            self.tickfirst = false;

            if self.sample() && self.integrator.adaptive_fsal() && self.stepper.initialized {
                self.adaptive_calc();
            }

            self.propagate_states();
            self.update_clock();

            if self.sample() {
                if self.track_time {
                    self.t_hist.push(self.stepper.t);
                }

                self.drive(Phase::Postcalc);
                self.drive(Phase::Check);
                self.run_stoppers();

                if self.stop_simulation || self.stepper.t + self.stepper.eps >= self.tend {
                    self.ticklast = true;
                }

                self.drive(Phase::Report);
                self.tracker();

                if self.integrator.adaptive() {
                    self.adaptive_calc();
                }
                self.change_time_step();
                self.delete_modules();

                if self.ticklast {
                    self.create_files();
                    break;
                }
            }

            self.drive(Phase::Reset);
        }

        self.running = false;
        self.set_direct_erase(true);
        self.phase = Phase::Setup;

        if self.error {
            error!(sim = %self.sim, errors = self.errors.len(), "run stopped due to an error");
            return false;
        }
        info!(sim = %self.sim, t = self.stepper.t, "run complete");
        true
    }

    fn setup(&mut self, dt: f64) {
        self.phase = Phase::Setup;
        if !self.trackers.is_empty() {
            self.track_time = true;
        }
        self.stepper.dt = dt;
        self.stepper.dtp = dt;
        self.stepper.t1 = self.stepper.t + dt;
        self.stepper.kpass = 0;
        self.ticklast = false;
        self.tickfirst = true;
        self.set_direct_erase(false);
        self.stop_simulation = false;
    }

    fn set_direct_erase(&mut self, on: bool) {
        self.modules.set_direct_erase(on);
        self.inits.set_direct_erase(on);
        self.updates.set_direct_erase(on);
        self.postcalcs.set_direct_erase(on);
        self.checks.set_direct_erase(on);
        self.reports.set_direct_erase(on);
        self.resets.set_direct_erase(on);
        self.propagate.set_direct_erase(on);
        self.trackers.set_direct_erase(on);
    }

    fn phase_map(&self, phase: Phase) -> &DynamicMap<ModuleId, ModuleHandle> {
        match phase {
            Phase::Init => &self.inits,
            Phase::Update => &self.updates,
            Phase::Postcalc => &self.postcalcs,
            Phase::Check => &self.checks,
            Phase::Report => &self.reports,
            Phase::Reset => &self.resets,
            Phase::Tracker => &self.trackers,
            Phase::Setup => &self.modules,
        }
    }

    fn phase_map_mut(&mut self, phase: Phase) -> &mut DynamicMap<ModuleId, ModuleHandle> {
        match phase {
            Phase::Init => &mut self.inits,
            Phase::Update => &mut self.updates,
            Phase::Postcalc => &mut self.postcalcs,
            Phase::Check => &mut self.checks,
            Phase::Report => &mut self.reports,
            Phase::Reset => &mut self.resets,
            Phase::Tracker => &mut self.trackers,
            Phase::Setup => &mut self.modules,
        }
    }

    /// Walk one phase over its module map in insertion order, flush staged
    /// erasures, and rearm the phase's run gates for the next tick. Init
    /// keeps its gates: it runs once per module lifetime.
    fn drive(&mut self, phase: Phase) {
        self.phase = phase;
        trace!(sim = %self.sim, phase = %phase, "phase start");

        for id in self.phase_map(phase).keys() {
            self.call_phase(id, phase);
            if self.error {
                break;
            }
        }

        self.phase_map_mut(phase).erase();

        if phase != Phase::Init {
            for id in self.phase_map(phase).keys() {
                if let Some(rec) = self.records.get_mut(&id) {
                    rec.gate_mut(phase).run = false;
                }
            }
        }
    }

    /// One module's phase call: once-per-tick gating, run-first dependency
    /// resolution, re-entry (cycle) detection, then the user hook.
    fn call_phase(&mut self, id: ModuleId, phase: Phase) {
        let Some(rec) = self.records.get_mut(&id) else {
            return;
        };
        if rec.gate(phase).run {
            return;
        }
        if rec.gate(phase).called {
            // Re-entered while already on the call stack: a run-first cycle.
            // Force the gate closed so the rest of the phase makes progress.
            let gate = rec.gate_mut(phase);
            gate.run = true;
            gate.called = false;
            self.record_error(SimError::CircularDependency { phase });
            return;
        }
        rec.gate_mut(phase).called = true;

        if matches!(phase, Phase::Update | Phase::Postcalc) {
            let deps = rec.run_first.clone();
            let mut dead: Vec<ModuleId> = Vec::new();
            for dep in deps {
                if !self.modules.contains(&dep) {
                    // Dangling edge; the peer is gone.
                    dead.push(dep);
                    continue;
                }
                let pending = self
                    .records
                    .get(&dep)
                    .map(|r| !r.gate(phase).run)
                    .unwrap_or(false);
                if pending {
                    self.call_phase(dep, phase);
                }
            }
            if !dead.is_empty() {
                if let Some(rec) = self.records.get_mut(&id) {
                    rec.run_first.retain(|d| !dead.contains(d));
                }
            }
        }

        let frozen = match self.records.get(&id) {
            Some(rec) => rec.frozen,
            None => return,
        };
        if !frozen {
            if let Some(handle) = self.modules.get(&id).cloned() {
                let mut cx = ModuleContext {
                    t: self.stepper.t,
                    dt: self.stepper.dt,
                    phase,
                    id,
                    sim: self.sim,
                    commands: &mut self.pending,
                };
                let mut module = handle.borrow_mut();
                match phase {
                    Phase::Init => module.init(&mut cx),
                    Phase::Update => module.update(&mut cx),
                    Phase::Postcalc => module.postcalc(&mut cx),
                    Phase::Check => module.check(&mut cx),
                    Phase::Report => module.report(&mut cx),
                    Phase::Reset => module.reset(&mut cx),
                    Phase::Tracker => module.tracker(&mut cx),
                    Phase::Setup => {}
                }
                drop(module);
                self.apply_commands();
            }
        }

        if let Some(rec) = self.records.get_mut(&id) {
            let gate = rec.gate_mut(phase);
            gate.run = true;
            gate.called = false;
        }
        if phase == Phase::Init {
            // Init runs once per module lifetime.
            self.inits.erase_key(&id);
        }
    }

    fn apply_commands(&mut self) {
        while !self.pending.is_empty() {
            let commands = std::mem::take(&mut self.pending);
            for command in commands {
                match command {
                    Command::Error(err) => self.record_error(err),
                    Command::Freeze(id, on) => {
                        if let Some(rec) = self.records.get_mut(&id) {
                            rec.frozen = on;
                        }
                    }
                    Command::FreezeIntegration(id, on) => {
                        if let Some(rec) = self.records.get_mut(&id) {
                            rec.freeze_integration = on;
                        }
                    }
                    Command::Destroy(id) => self.to_delete.borrow_mut().push(id),
                    Command::Spawn { id, name, module } => {
                        self.install(id, name, module);
                        if self.running {
                            self.call_phase(id, Phase::Init);
                        }
                    }
                }
            }
        }
    }

    /// Drive every unfrozen state through the current integrator pass. All
    /// states advance one pass before any advances to the next; derivatives
    /// refresh through module updates between passes.
    fn propagate_states(&mut self) {
        for id in self.propagate.keys() {
            let Some(rec) = self.records.get_mut(&id) else {
                continue;
            };
            if rec.frozen || rec.freeze_integration {
                continue;
            }
            for state in &mut rec.states {
                self.integrator.propagate(state, &self.stepper);
            }
        }
    }

    fn update_clock(&mut self) {
        let t_prev = self.stepper.t;
        self.integrator.update_clock(&mut self.stepper);
        self.time_advanced = self.stepper.t >= t_prev + self.stepper.eps;
    }

    /// Whether we are between completed steps.
    pub fn sample(&self) -> bool {
        self.stepper.kpass == 0
    }

    /// Clamp `t1` so the step also lands on multiples of `sdt`, and report
    /// whether the current time sits on such a boundary.
    pub fn sample_every(&mut self, sdt: f64) -> bool {
        if !self.sample() {
            return false;
        }
        let st = &mut self.stepper;
        let n = ((st.t + st.eps) / sdt + 1.0).floor();
        let ts = n * sdt;
        if ts < st.t1 - st.eps {
            st.t1 = ts;
        }
        st.dt = st.t1 - st.t;
        st.t - ts + sdt < st.eps
    }

    /// Clamp `t1` to an event time that falls inside the step, and report
    /// whether the event time is now.
    pub fn event(&mut self, t_event: f64) -> bool {
        if !self.sample() {
            return false;
        }
        let st = &mut self.stepper;
        if t_event < st.t1 - st.eps && t_event >= st.t + st.eps {
            st.t1 = t_event;
        }
        st.dt = st.t1 - st.t;
        (t_event - st.t).abs() < st.eps
    }

    /// Minimum positive optimal step across all states, clamped to
    /// `[eps, 2*dtp]`, staged for the next `change_time_step`.
    fn adaptive_calc(&mut self) {
        let mut dt_optimal = f64::INFINITY;
        let mut found = false;
        for id in self.propagate.keys() {
            let Some(rec) = self.records.get(&id) else {
                continue;
            };
            if rec.frozen || rec.freeze_integration {
                continue;
            }
            for state in &rec.states {
                if let Some(computed) = self.integrator.optimal_time_step(state, &self.stepper) {
                    if computed > 0.0 && computed < dt_optimal {
                        dt_optimal = computed;
                        found = true;
                    }
                }
            }
        }

        if found {
            let st = &self.stepper;
            self.dt_change = if dt_optimal < st.eps {
                st.eps
            } else if dt_optimal > 2.0 * st.dtp {
                // Growing the step too abruptly degrades the estimate.
                2.0 * st.dtp
            } else {
                dt_optimal
            };
            self.change_dt = true;
            trace!(sim = %self.sim, dt_change = self.dt_change, "optimal step computed");
        }
    }

    /// Commit a pending step-size change.
    fn change_time_step(&mut self) {
        if self.change_dt {
            self.stepper.dt = self.dt_change;
            self.stepper.dtp = self.dt_change;
            self.stepper.t1 = self.stepper.t + self.stepper.dt;
            self.change_dt = false;
            debug!(sim = %self.sim, dt = self.stepper.dt, "time step committed");
        }
    }

    fn run_stoppers(&mut self) {
        for stopper in &mut self.stoppers {
            if stopper(&self.stepper) {
                self.stop_simulation = true;
            }
        }
    }

    /// Drain the deletion queue to a fixed point: releasing a module may
    /// enqueue further removals.
    fn delete_modules(&mut self) {
        loop {
            let batch: Vec<ModuleId> = {
                let mut queue = self.to_delete.borrow_mut();
                if queue.is_empty() {
                    break;
                }
                queue.drain(..).collect()
            };
            for id in batch {
                self.remove_module(id);
            }
        }
    }

    /// Append one row of tracked values per tracking module, then run the
    /// user tracker hooks.
    fn tracker(&mut self) {
        self.phase = Phase::Tracker;
        for id in self.trackers.keys() {
            let row: Option<Vec<f64>> = self.records.get(&id).map(|rec| {
                rec.tracking
                    .iter()
                    .map(|(owner, var)| {
                        self.records
                            .get(owner)
                            .and_then(|o| o.vars.get(var))
                            .map(|v| v.get())
                            .unwrap_or(f64::NAN)
                    })
                    .collect()
            });
            if let Some(row) = row {
                if !row.is_empty() {
                    if let Some(rec) = self.records.get_mut(&id) {
                        rec.rows.push(row);
                    }
                }
            }

            if let Some(handle) = self.trackers.get(&id).cloned() {
                let mut cx = ModuleContext {
                    t: self.stepper.t,
                    dt: self.stepper.dt,
                    phase: Phase::Tracker,
                    id,
                    sim: self.sim,
                    commands: &mut self.pending,
                };
                handle.borrow_mut().tracker(&mut cx);
                self.apply_commands();
            }
        }
    }

    /// Write one tracking file per tracking module.
    fn create_files(&mut self) {
        let mut failures: Vec<SimError> = Vec::new();
        for id in self.trackers.keys() {
            let Some(rec) = self.records.get(&id) else {
                continue;
            };
            if rec.tracking.is_empty() {
                continue;
            }
            let headers: Vec<String> = rec
                .tracking
                .iter()
                .map(|(owner, var)| {
                    let owner_name = self
                        .records
                        .get(owner)
                        .map(|o| o.name.clone())
                        .unwrap_or_else(|| format!("<{owner}>"));
                    format!("{owner_name} {var}")
                })
                .collect();
            let path = rec.dir.join(format!("{}.txt", rec.name));
            let time = if self.track_time {
                Some(self.t_hist.as_slice())
            } else {
                None
            };
            if let Err(source) = track::write_track_file(&path, &headers, time, &rec.rows) {
                failures.push(SimError::TrackFile { path, source });
            }
        }
        for err in failures {
            self.record_error(err);
        }
    }
}
