//! Execution phases
//!
//! One simulator tick walks the module set through a fixed sequence of
//! lifecycle phases. The phase is recorded on the simulator while each
//! section runs so hooks and diagnostics know where they are.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a simulator tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    /// Between runs; also the state restored when a run finishes
    Setup = 0,
    /// One-time module initialization
    Init = 1,
    /// Derivative evaluation, once per integrator pass
    Update = 2,
    /// Post-step calculation at sample boundaries
    Postcalc = 3,
    /// Invariant checks at sample boundaries
    Check = 4,
    /// Reporting
    Report = 5,
    /// Per-tick flag reset
    Reset = 6,
    /// Tracked-variable sampling
    Tracker = 7,
}

impl Phase {
    /// Total number of phases
    pub const COUNT: usize = 8;

    /// All phases in execution order
    pub const ALL: [Phase; Self::COUNT] = [
        Phase::Setup,
        Phase::Init,
        Phase::Update,
        Phase::Postcalc,
        Phase::Check,
        Phase::Report,
        Phase::Reset,
        Phase::Tracker,
    ];

    /// The lower-case hook name, as it appears in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Init => "init",
            Phase::Update => "update",
            Phase::Postcalc => "postcalc",
            Phase::Check => "check",
            Phase::Report => "report",
            Phase::Reset => "reset",
            Phase::Tracker => "tracker",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
