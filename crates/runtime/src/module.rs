//! Modules
//!
//! A module is the user-extensible unit of a simulation: it overrides any
//! subset of the lifecycle hooks, owns integrated states through the
//! simulator, and may declare that peers must run before it in the update
//! and postcalc phases.
//!
//! Hooks receive a `ModuleContext` with the clock and a deferred command
//! queue; commands are applied by the simulator as soon as the hook returns,
//! so a hook can never observe a half-applied mutation of the module set.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use cadence_foundation::{ModuleId, Phase, SimId, Var};

use crate::error::SimError;
use crate::state::State;

/// Shared handle to a registered module.
pub type ModuleHandle = Rc<RefCell<dyn Module>>;

/// The user-extensible simulation unit. Override any subset of the hooks.
pub trait Module {
    /// Called once per module lifetime, before the first tick.
    fn init(&mut self, _cx: &mut ModuleContext) {}

    /// Derivative evaluation; called once per integrator pass.
    fn update(&mut self, _cx: &mut ModuleContext) {}

    /// Post-step calculation; called once per completed step.
    fn postcalc(&mut self, _cx: &mut ModuleContext) {}

    /// Invariant checks; called once per completed step.
    fn check(&mut self, _cx: &mut ModuleContext) {}

    /// Reporting; called at the first tick and after each completed step.
    fn report(&mut self, _cx: &mut ModuleContext) {}

    /// End-of-tick cleanup.
    fn reset(&mut self, _cx: &mut ModuleContext) {}

    /// Custom sampling, alongside the built-in tracked-variable recording.
    fn tracker(&mut self, _cx: &mut ModuleContext) {}
}

/// Per-hook view of the simulation, with deferred mutations.
pub struct ModuleContext<'a> {
    /// Current simulation time
    pub t: f64,
    /// Active step size
    pub dt: f64,
    /// Phase being executed
    pub phase: Phase,
    /// The module being called
    pub id: ModuleId,
    /// The owning simulator
    pub sim: SimId,
    pub(crate) commands: &'a mut Vec<Command>,
}

impl ModuleContext<'_> {
    /// Record a simulation error; the run halts cooperatively.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.commands
            .push(Command::Error(SimError::Runtime(message.into())));
    }

    /// Suppress or restore this module's lifecycle hooks.
    pub fn freeze(&mut self, on: bool) {
        self.commands.push(Command::Freeze(self.id, on));
    }

    /// Suppress or restore this module's state propagation. Hooks still run.
    pub fn freeze_integration(&mut self, on: bool) {
        self.commands.push(Command::FreezeIntegration(self.id, on));
    }

    /// Request destruction of a module. Applied at the next sample boundary.
    pub fn destroy(&mut self, id: ModuleId) {
        self.commands.push(Command::Destroy(id));
    }

    /// Register a new module mid-simulation. It joins every phase map, and
    /// its `init` runs as soon as the command is applied.
    pub fn spawn(&mut self, name: impl Into<String>, module: impl Module + 'static) -> ModuleId {
        let id = ModuleId::next();
        self.commands.push(Command::Spawn {
            id,
            name: name.into(),
            module: Rc::new(RefCell::new(module)),
        });
        id
    }
}

/// Deferred hook effect, applied after the hook returns.
pub(crate) enum Command {
    Error(SimError),
    Freeze(ModuleId, bool),
    FreezeIntegration(ModuleId, bool),
    Destroy(ModuleId),
    Spawn {
        id: ModuleId,
        name: String,
        module: ModuleHandle,
    },
}

/// Once-per-tick gating for one phase: `called` marks the hook as being on
/// the current call stack, `run` marks it complete for this tick. Observing
/// `called` at entry is the circular-dependency signal.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Gate {
    pub called: bool,
    pub run: bool,
}

/// Simulator-side bookkeeping for one registered module.
pub(crate) struct ModuleRecord {
    pub name: String,
    pub frozen: bool,
    pub freeze_integration: bool,
    pub states: Vec<State>,
    /// Peers whose update/postcalc must complete before ours. Edges whose
    /// target no longer exists are dropped when encountered.
    pub run_first: Vec<ModuleId>,
    pub gates: [Gate; Phase::COUNT],
    /// `(owner, variable)` pairs sampled each tracker phase
    pub tracking: Vec<(ModuleId, String)>,
    /// One row of tracked values per sample
    pub rows: Vec<Vec<f64>>,
    /// Variables this module exposes by name
    pub vars: IndexMap<String, Var>,
    /// Directory the tracking file is written into
    pub dir: PathBuf,
}

impl ModuleRecord {
    pub fn new(name: String) -> Self {
        Self {
            name,
            frozen: false,
            freeze_integration: false,
            states: Vec::new(),
            run_first: Vec::new(),
            gates: [Gate::default(); Phase::COUNT],
            tracking: Vec::new(),
            rows: Vec::new(),
            vars: IndexMap::new(),
            dir: PathBuf::new(),
        }
    }

    pub fn gate(&self, phase: Phase) -> Gate {
        self.gates[phase as usize]
    }

    pub fn gate_mut(&mut self, phase: Phase) -> &mut Gate {
        &mut self.gates[phase as usize]
    }
}
