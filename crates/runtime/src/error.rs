//! Simulation errors
//!
//! Errors are sticky per simulator: each one is appended to the simulator's
//! error list and flips a flag that every phase loop polls after each module
//! call. `run()` reports failure when the flag is set at exit.

use std::path::PathBuf;

use thiserror::Error;

use cadence_foundation::{ModuleId, Phase};

/// Anything a simulation can record as a failure.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("there are no modules to run")]
    NoModules,

    #[error("the end time {tend} is not after the current time {t}")]
    EndTimeNotAfterCurrent { tend: f64, t: f64 },

    #[error("Circular dependency for {phase}()")]
    CircularDependency { phase: Phase },

    #[error("variable <{name}> is not exposed by module {module}")]
    UnknownVariable { module: ModuleId, name: String },

    #[error("{0}")]
    Runtime(String),

    #[error("file <{path}> could not be created")]
    TrackFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
