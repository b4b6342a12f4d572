//! Deterministic per-cycle ordering via `SystemSet` phases.
//!
//! Every simulation system runs in the `Update` schedule inside one of these
//! sets, configured as a chain: `Ingest` -> `Step` -> `Service`. The chain is
//! the contract that makes each display cycle read like a transaction: inputs
//! land first, the stepping loop runs once over a terrain that no longer
//! changes, and snapshot requests observe the fully stepped state.

use bevy::prelude::*;

/// Ordered phases for systems running in the `Update` schedule.
///
/// * **Ingest** - control-line draining and stabilized-terrain consumption.
///   Anything that mutates parameters or the bathymetry happens here, never
///   during stepping.
/// * **Step** - the budget-throttled update loop plus the continuous-rate
///   effects (evaporation, snow melt).
/// * **Service** - snapshot servicing. Read-only over the grids, so callers
///   always see a consistent post-step state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Ingest,
    Step,
    Service,
}
