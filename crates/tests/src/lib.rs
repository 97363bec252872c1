//! Integration test harness for Cadence.
//!
//! Provides a registry-backed harness and a closure-driven module so
//! end-to-end scenarios stay terse.

use cadence_runtime::{Module, ModuleContext, ModuleId, Registry, SimId, Simulator};

/// Registry plus a default simulation id.
pub struct Harness {
    pub registry: Registry,
    pub sim: SimId,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            sim: SimId(0),
        }
    }

    pub fn simulator(&mut self) -> &mut Simulator {
        self.registry.simulator(self.sim)
    }

    pub fn add(&mut self, name: &str, module: impl Module + 'static) -> ModuleId {
        self.registry.add_module(self.sim, name, module)
    }

    pub fn run(&mut self, dt: f64, tmax: f64) -> bool {
        self.registry.run(self.sim, dt, tmax)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

type Hook = Box<dyn FnMut(&mut ModuleContext)>;

/// A module whose hooks are closures.
#[derive(Default)]
pub struct HookModule {
    on_init: Option<Hook>,
    on_update: Option<Hook>,
    on_postcalc: Option<Hook>,
    on_check: Option<Hook>,
    on_report: Option<Hook>,
    on_reset: Option<Hook>,
}

impl HookModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_init = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_postcalc(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_postcalc = Some(Box::new(f));
        self
    }

    pub fn on_check(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_check = Some(Box::new(f));
        self
    }

    pub fn on_report(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_report = Some(Box::new(f));
        self
    }

    pub fn on_reset(mut self, f: impl FnMut(&mut ModuleContext) + 'static) -> Self {
        self.on_reset = Some(Box::new(f));
        self
    }
}

impl Module for HookModule {
    fn init(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_init {
            f(cx);
        }
    }
    fn update(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_update {
            f(cx);
        }
    }
    fn postcalc(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_postcalc {
            f(cx);
        }
    }
    fn check(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_check {
            f(cx);
        }
    }
    fn report(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_report {
            f(cx);
        }
    }
    fn reset(&mut self, cx: &mut ModuleContext) {
        if let Some(f) = &mut self.on_reset {
            f(cx);
        }
    }
}
