//! Terrain/water simulation engine.
//!
//! Owns the authoritative grids and advances them once per display cycle
//! through a self-throttled sequence of explicit steps: the cycle's time
//! budget is the actual elapsed display time scaled by the speed parameter,
//! and each step sizes itself from the stability constraint, clamped to the
//! remaining budget. Under heavy load the loop degrades to fewer, larger
//! steps (never below the configured minimum step size) instead of missing
//! the frame.

pub mod schemes;
mod systems;
mod types;


pub use systems::EnginePlugin;
pub use types::{
    BathymetryGrid, CycleStats, FilteredFrames, ReferenceDem, SnowGrid, WaterGrid, WaterSimState,
};

use crate::config::{CELL_SIZE, TIME_EPSILON};
use crate::contributions::{self, ContributionRegistry};
use crate::grid::ScalarGrid;
use crate::params::{SimParams, WaterMode};
use crate::property::PropertyGrid;

/// Advances the simulation by one display cycle of `elapsed` real seconds.
///
/// Pure with respect to ECS so tests and benches drive it directly; the
/// [`EnginePlugin`] system is a thin wrapper. Invariants upheld:
/// - the sum of executed step sizes never exceeds `elapsed * speed`;
/// - at most `max_steps` steps run;
/// - a budget at or below epsilon is a clean no-op (contributions included);
/// - water and snow depths never go negative.
#[allow(clippy::too_many_arguments)]
pub fn advance_cycle(
    elapsed: f32,
    params: &SimParams,
    registry: &ContributionRegistry,
    property: &PropertyGrid,
    bathymetry: &ScalarGrid,
    water: &mut ScalarGrid,
    snow: &mut ScalarGrid,
    scratch: &mut Vec<f32>,
) -> CycleStats {
    let budget = elapsed * params.speed;
    if budget <= TIME_EPSILON {
        return CycleStats::default();
    }

    let mut stats = CycleStats::default();
    let mut remaining = budget;
    while remaining > TIME_EPSILON && stats.steps < params.max_steps {
        let mut dt = schemes::stable_step_size(water, CELL_SIZE);
        if !dt.is_finite() {
            // Dry grid: nothing constrains the step, take the rest at once.
            dt = remaining;
        }
        // A degenerate stability estimate is raised to the configured
        // minimum so the loop always makes progress toward the budget.
        if dt < params.min_step_size {
            dt = params.min_step_size;
        }
        dt = dt.min(remaining);
        if dt <= 0.0 {
            break;
        }

        for (_, contribution) in registry.iter() {
            contributions::apply(contribution, params, bathymetry, water, snow, dt);
        }

        match params.mode {
            WaterMode::Traditional => schemes::traditional_step(
                dt,
                params.attenuation,
                CELL_SIZE,
                bathymetry,
                water,
                scratch,
            ),
            WaterMode::Engineering => schemes::engineering_step(
                dt,
                params.attenuation,
                CELL_SIZE,
                bathymetry,
                property,
                water,
                scratch,
            ),
        }

        remaining -= dt;
        stats.steps += 1;
        stats.stepped_time += dt;
        stats.last_step_size = dt;
    }

    // Continuous-rate effects run on the real elapsed time, independent of
    // how the budget was cut into steps.
    schemes::apply_evaporation(params.evaporation_rate, elapsed, water);
    schemes::apply_snow_melt(params.snow_melt, elapsed, snow, water);

    stats
}
