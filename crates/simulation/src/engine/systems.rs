//! Display-cycle systems: terrain consumption, the stepping loop, and
//! snapshot servicing, ordered within [`crate::SimulationSet`].

use bevy::prelude::*;

use crate::contributions::ContributionRegistry;
use crate::params::SimParams;
use crate::property::PropertyGrid;
use crate::snapshot::SnapshotChannel;
use crate::SimulationSet;

use super::types::{
    BathymetryGrid, FilteredFrames, ReferenceDem, SnowGrid, WaterGrid, WaterSimState,
};

/// Copies the newest stabilized frame, if any, into the bathymetry. Runs
/// before stepping so the terrain is never rewritten mid-cycle. With a
/// reference elevation model present, each cell is clamped to within the
/// configured deviation of it.
pub fn consume_filtered_frames(
    frames: Option<ResMut<FilteredFrames>>,
    dem: Res<ReferenceDem>,
    mut bathymetry: ResMut<BathymetryGrid>,
    mut state: ResMut<WaterSimState>,
) {
    let Some(mut frames) = frames else {
        return;
    };
    if !frames.0.try_lock() {
        return;
    }

    {
        let frame = frames.0.locked();
        if frame.elevations.width != bathymetry.0.width
            || frame.elevations.height != bathymetry.0.height
        {
            warn!(
                "stabilized frame is {}x{} but the simulation grid is {}x{}; frame dropped",
                frame.elevations.width,
                frame.elevations.height,
                bathymetry.0.width,
                bathymetry.0.height,
            );
            return;
        }
        bathymetry.0.cells.copy_from_slice(&frame.elevations.cells);
    }
    state.terrain_version = frames.0.locked_version();

    if let Some(reference) = dem.grid.as_ref() {
        if reference.cells.len() == bathymetry.0.cells.len() && dem.max_deviation > 0.0 {
            for (cell, &model) in bathymetry.0.cells.iter_mut().zip(&reference.cells) {
                *cell = cell.clamp(model - dem.max_deviation, model + dem.max_deviation);
            }
        }
    }
}

/// Runs the budget-throttled update loop for this display cycle and
/// refreshes the aggregate statistics.
#[allow(clippy::too_many_arguments)]
pub fn run_simulation(
    time: Res<Time>,
    params: Res<SimParams>,
    registry: Res<ContributionRegistry>,
    property: Res<PropertyGrid>,
    bathymetry: Res<BathymetryGrid>,
    mut water: ResMut<WaterGrid>,
    mut snow: ResMut<SnowGrid>,
    mut state: ResMut<WaterSimState>,
    mut scratch: Local<Vec<f32>>,
) {
    let stats = super::advance_cycle(
        time.delta_secs(),
        &params,
        &registry,
        &property,
        &bathymetry.0,
        &mut water.0,
        &mut snow.0,
        &mut scratch,
    );

    state.steps_last_cycle = stats.steps;
    state.last_step_size = stats.last_step_size;
    state.sim_time += stats.stepped_time as f64;
    state.total_volume = water.0.total();
    state.max_depth = water.0.max_value();
}

/// Services at most one pending snapshot request, after the update loop, by
/// copying the requested grids into the caller's buffers and invoking the
/// completion callback exactly once.
pub fn service_snapshot_requests(
    channel: Res<SnapshotChannel>,
    bathymetry: Res<BathymetryGrid>,
    water: Res<WaterGrid>,
    snow: Res<SnowGrid>,
    state: Res<WaterSimState>,
) {
    let Some(request) = channel.take_and_clear() else {
        return;
    };
    request.complete(state.sim_time, |r| {
        if let Some(buffer) = r.bathymetry.as_mut() {
            buffer.resize(bathymetry.0.cells.len(), 0.0);
            buffer.copy_from_slice(&bathymetry.0.cells);
        }
        if let Some(buffer) = r.water.as_mut() {
            buffer.resize(water.0.cells.len(), 0.0);
            buffer.copy_from_slice(&water.0.cells);
        }
        if let Some(buffer) = r.snow.as_mut() {
            buffer.resize(snow.0.cells.len(), 0.0);
            buffer.copy_from_slice(&snow.0.cells);
        }
    });
}

pub struct EnginePlugin;

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BathymetryGrid>()
            .init_resource::<WaterGrid>()
            .init_resource::<SnowGrid>()
            .init_resource::<ReferenceDem>()
            .init_resource::<WaterSimState>()
            .init_resource::<SimParams>()
            .init_resource::<PropertyGrid>()
            .init_resource::<ContributionRegistry>()
            .init_resource::<SnapshotChannel>()
            .add_systems(
                Update,
                (
                    consume_filtered_frames.in_set(SimulationSet::Ingest),
                    run_simulation.in_set(SimulationSet::Step),
                    service_snapshot_requests.in_set(SimulationSet::Service),
                ),
            );
    }
}
