//! Engine-owned grids and aggregate state.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::grid::ScalarGrid;
use crate::handoff::FrameReceiver;
use crate::stabilizer::StabilizedFrame;

/// Authoritative terrain height per simulation cell (cm). Rewritten only
/// between cycles, when a newer stabilized frame arrives; read-only while
/// stepping.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct BathymetryGrid(pub ScalarGrid);

impl Default for BathymetryGrid {
    fn default() -> Self {
        Self(ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT))
    }
}

/// Per-cell water depth above the terrain surface (cm). Never negative.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct WaterGrid(pub ScalarGrid);

impl Default for WaterGrid {
    fn default() -> Self {
        Self(ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT))
    }
}

/// Per-cell snow depth (cm). Never negative.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SnowGrid(pub ScalarGrid);

impl Default for SnowGrid {
    fn default() -> Self {
        Self(ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT))
    }
}

/// Optional reference elevation model. When present, incoming bathymetry is
/// clamped to within `max_deviation` of it, so a mis-measured sand surface
/// cannot tear the terrain away from the surveyed model it represents.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceDem {
    pub grid: Option<ScalarGrid>,
    pub max_deviation: f32,
}

/// Consumer half of the stabilizer handoff. Absent until the app wires a
/// sensor; the engine then keeps simulating over the default flat terrain.
#[derive(Resource)]
pub struct FilteredFrames(pub FrameReceiver<StabilizedFrame>);

/// Aggregate statistics updated once per display cycle.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaterSimState {
    /// Total water volume across the grid (cell-depth sum).
    pub total_volume: f64,
    /// Maximum water depth on any cell (cm).
    pub max_depth: f32,
    /// Steps executed during the most recent cycle.
    pub steps_last_cycle: u32,
    /// Size (s) of the last executed step.
    pub last_step_size: f32,
    /// Simulation seconds accumulated since startup.
    pub sim_time: f64,
    /// Version of the stabilized frame currently shaping the bathymetry.
    pub terrain_version: u64,
}

/// Outcome of one per-cycle update loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    pub steps: u32,
    /// Sum of executed step sizes; never exceeds the requested budget.
    pub stepped_time: f32,
    pub last_step_size: f32,
}
