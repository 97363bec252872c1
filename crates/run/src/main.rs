//! Cadence Run - executes a canned scenario and writes tracking files
//!
//! Two scenarios are built in: free fall under gravity with the fixed-step
//! RK4, and exponential decay under the adaptive 7(8) pair.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_runtime::{Module, ModuleContext, Rkf78, SimId, Simulator, Var};

#[derive(Parser, Debug)]
#[command(name = "cadence-run")]
#[command(about = "Run a canned Cadence scenario")]
struct Cli {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: Scenario,

    /// Base time step
    #[arg(long, default_value = "0.01")]
    dt: f64,

    /// End time of the simulation
    #[arg(long, default_value = "1.0")]
    tmax: f64,

    /// Directory for tracking output
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Scenario {
    /// Free fall under gravity, fixed-step RK4
    Freefall,
    /// Exponential decay, adaptive RKF 7(8)
    Decay,
}

/// A point mass dropped from rest.
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

/// dx/dt = -x.
struct Decay {
    x: Var,
    xd: Var,
}

impl Module for Decay {
    fn update(&mut self, _cx: &mut ModuleContext) {
        self.xd.set(-self.x.get());
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_run=info,cadence_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut sim = Simulator::new(SimId(0));

    let watched: Vec<(&str, Var)> = match cli.scenario {
        Scenario::Freefall => {
            let y = Var::new(0.0);
            let v = Var::new(0.0);
            let yd = Var::new(0.0);
            let vd = Var::new(0.0);

            let id = sim.add_module(
                "ball",
                FreeFall {
                    v: v.clone(),
                    yd: yd.clone(),
                    vd: vd.clone(),
                },
            );
            sim.add_integrator(id, &y, &yd, 1e-8);
            sim.add_integrator(id, &v, &vd, 1e-8);
            sim.expose(id, "y", &y);
            sim.expose(id, "v", &v);
            sim.track(id, "t");
            sim.track(id, "y");
            sim.track(id, "v");
            sim.set_output_dir(id, &cli.out_dir);

            vec![("y", y), ("v", v)]
        }
        Scenario::Decay => {
            let x = Var::new(1.0);
            let xd = Var::new(0.0);

            sim.set_integrator(Box::new(Rkf78::new()));
            let id = sim.add_module(
                "decay",
                Decay {
                    x: x.clone(),
                    xd: xd.clone(),
                },
            );
            sim.add_integrator(id, &x, &xd, 1e-10);
            sim.expose(id, "x", &x);
            sim.track(id, "t");
            sim.track(id, "x");
            sim.set_output_dir(id, &cli.out_dir);

            vec![("x", x)]
        }
    };

    info!(scenario = ?cli.scenario, dt = cli.dt, tmax = cli.tmax, "starting");

    if !sim.run(cli.dt, cli.tmax) {
        for err in sim.errors() {
            error!("{err}");
        }
        std::process::exit(1);
    }

    for (name, var) in watched {
        info!("{}({}) = {}", name, sim.t(), var.get());
    }
    info!(out_dir = %cli.out_dir.display(), "tracking files written");
}
