use bevy::prelude::*;

pub mod config;
pub mod contributions;
pub mod control;
pub mod engine;
pub mod grid;
pub mod handoff;
pub mod params;
pub mod property;
pub mod simulation_sets;
pub mod snapshot;
pub mod stabilizer;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use simulation_sets::SimulationSet;

/// Top-level plugin: configures the per-cycle phase chain and wires in the
/// engine and control protocol. The app inserts the handoff receiver
/// ([`engine::FilteredFrames`]) and the control-line channel separately,
/// since both halves are born on other threads.
pub struct SandTablePlugin;

impl Plugin for SandTablePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                SimulationSet::Ingest,
                SimulationSet::Step,
                SimulationSet::Service,
            )
                .chain(),
        );
        app.add_plugins((engine::EnginePlugin, control::ControlPlugin));
    }
}
