//! Simulation registry
//!
//! A `Registry` owns every simulator in an embedding and the lookup tables
//! that span them: module id to owning simulator, and advertised names for
//! cross-module discovery. Simulators are created lazily on first reference
//! to their id and destroyed when their last module is destroyed through the
//! registry.

use indexmap::IndexMap;
use tracing::{debug, info};

use cadence_foundation::{ModuleId, SimId};

use crate::module::Module;
use crate::simulator::Simulator;

/// Lookup tables and owned simulators for one embedding.
#[derive(Default)]
pub struct Registry {
    simulators: IndexMap<SimId, Simulator>,
    accessor: IndexMap<ModuleId, SimId>,
    external: IndexMap<String, ModuleId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The simulator for `sim`, created lazily on first access.
    pub fn simulator(&mut self, sim: SimId) -> &mut Simulator {
        self.simulators
            .entry(sim)
            .or_insert_with(|| Simulator::new(sim))
    }

    pub fn contains_simulator(&self, sim: SimId) -> bool {
        self.simulators.contains_key(&sim)
    }

    pub fn get_simulator(&self, sim: SimId) -> Option<&Simulator> {
        self.simulators.get(&sim)
    }

    /// Register a module with a simulator and record its owner.
    pub fn add_module(
        &mut self,
        sim: SimId,
        name: impl Into<String>,
        module: impl Module + 'static,
    ) -> ModuleId {
        let id = self.simulator(sim).add_module(name, module);
        self.accessor.insert(id, sim);
        id
    }

    /// The simulator a module belongs to.
    pub fn simulator_of(&self, id: ModuleId) -> Option<SimId> {
        self.accessor.get(&id).copied()
    }

    /// Advertise a module under a name for cross-module lookup.
    pub fn advertise(&mut self, name: impl Into<String>, id: ModuleId) {
        let name = name.into();
        debug!(module = %id, name = %name, "module advertised");
        self.external.insert(name, id);
    }

    pub fn lookup(&self, name: &str) -> Option<ModuleId> {
        self.external.get(name).copied()
    }

    /// Destroy a module. Dropping a simulator's last module destroys the
    /// simulator as well; this never happens mid-`run`, because running
    /// simulations defer destruction to their own sample boundaries.
    pub fn destroy_module(&mut self, id: ModuleId) {
        let Some(sim) = self.accessor.shift_remove(&id) else {
            return;
        };
        self.external.retain(|_, v| *v != id);
        if let Some(simulator) = self.simulators.get_mut(&sim) {
            simulator.remove_module(id);
            if simulator.module_count() == 0 {
                info!(sim = %sim, "last module destroyed, dropping simulator");
                self.simulators.shift_remove(&sim);
            }
        }
    }

    /// Run one simulation to `tmax`.
    pub fn run(&mut self, sim: SimId, dt: f64, tmax: f64) -> bool {
        self.simulator(sim).run(dt, tmax)
    }
}
