//! Explicit flow stepping: step-size selection and the two cell-to-cell
//! flow formulations.
//!
//! Both modes spread water from high to low *surface* elevation (terrain +
//! depth) across the four cardinal neighbors. The fraction of a cell's depth
//! allowed to leave per step follows the local gravity-wave speed, so steps
//! sized by [`stable_step_size`] keep every cell's outflow fraction at or
//! under the Courant safety factor. The mode is dispatched once per step in
//! the engine loop: [`traditional_step`] ignores the property grid entirely,
//! [`engineering_step`] divides the transfer by the Manning-style roughness
//! field and then removes infiltration via the absorption field.

use crate::config::{CFL_SAFETY, GRAVITY};
use crate::grid::ScalarGrid;
use crate::property::PropertyGrid;

/// Largest step size (s) the explicit update tolerates for the current
/// water state: `safety * cell / sqrt(g * h_max)`. A dry grid imposes no
/// limit, so the caller clamps the result to its remaining budget.
pub fn stable_step_size(water: &ScalarGrid, cell_size: f32) -> f32 {
    let max_depth = water.max_value();
    if max_depth <= 0.0 {
        return f32::INFINITY;
    }
    let wave_speed = (GRAVITY * max_depth).sqrt();
    CFL_SAFETY * cell_size / wave_speed
}

/// One traditional-mode step: pure gravity-wave spreading, no flow
/// resistance and no infiltration.
pub fn traditional_step(
    dt: f32,
    attenuation: f32,
    cell_size: f32,
    bathymetry: &ScalarGrid,
    water: &mut ScalarGrid,
    previous: &mut Vec<f32>,
) {
    spread(dt, attenuation, cell_size, bathymetry, None, water, previous);
}

/// One engineering-mode step: spreading divided by the per-cell roughness,
/// followed by infiltration at the per-cell absorption rate (cm/s).
pub fn engineering_step(
    dt: f32,
    attenuation: f32,
    cell_size: f32,
    bathymetry: &ScalarGrid,
    property: &PropertyGrid,
    water: &mut ScalarGrid,
    previous: &mut Vec<f32>,
) {
    spread(
        dt,
        attenuation,
        cell_size,
        bathymetry,
        Some(&property.roughness),
        water,
        previous,
    );
    for (depth, &absorption) in water.cells.iter_mut().zip(&property.absorption.cells) {
        if *depth > 0.0 && absorption > 0.0 {
            *depth = (*depth - absorption * dt).max(0.0);
        }
    }
}

/// Shared explicit flow update of size `dt`. Mass-conserving by
/// construction: everything subtracted from a cell is added to its
/// neighbors.
///
/// `attenuation` is the per-step flux retention factor (1.0 = no damping).
/// `previous` is caller-provided scratch that receives a copy of the depth
/// field so all cells step from the same snapshot.
fn spread(
    dt: f32,
    attenuation: f32,
    cell_size: f32,
    bathymetry: &ScalarGrid,
    resistance: Option<&ScalarGrid>,
    water: &mut ScalarGrid,
    previous: &mut Vec<f32>,
) {
    previous.clear();
    previous.extend_from_slice(&water.cells);

    let width = water.width;
    for y in 0..water.height {
        for x in 0..width {
            let idx = y * width + x;
            let depth = previous[idx];
            if depth <= 0.0 {
                continue;
            }

            let surface = bathymetry.cells[idx] + depth;

            // Gather lower neighbors by surface elevation.
            let (neighbors, count) = water.neighbors4(x, y);
            let mut lower: [(usize, f32); 4] = [(0, 0.0); 4];
            let mut lower_count = 0;
            let mut total_diff = 0.0_f32;
            for &(nx, ny) in &neighbors[..count] {
                let n_idx = ny * width + nx;
                let n_surface = bathymetry.cells[n_idx] + previous[n_idx];
                if n_surface < surface {
                    let diff = surface - n_surface;
                    lower[lower_count] = (n_idx, diff);
                    lower_count += 1;
                    total_diff += diff;
                }
            }
            if lower_count == 0 || total_diff <= 0.0 {
                continue;
            }

            // Outflow fraction from the local gravity-wave speed; at the
            // stable step size this stays at or under the Courant factor.
            let wave_speed = (GRAVITY * depth).sqrt();
            let mut fraction = (wave_speed * dt / cell_size).min(1.0);
            if let Some(roughness) = resistance {
                fraction /= roughness.cells[idx].max(f32::MIN_POSITIVE);
                fraction = fraction.min(1.0);
            }
            let transferable = depth * fraction * attenuation;
            if transferable <= 0.0 {
                continue;
            }

            // Distribute proportionally to the surface drops, capping each
            // share at half the drop so an exchange cannot overshoot and
            // invert the gradient within one step.
            let mut moved = 0.0_f32;
            for &(n_idx, diff) in &lower[..lower_count] {
                let share = (transferable * diff / total_diff).min(diff * 0.5);
                water.cells[n_idx] += share;
                moved += share;
            }
            water.cells[idx] -= moved;
        }
    }
}

/// Uniform depth change over the whole grid. Positive rates evaporate,
/// negative rates deposit water everywhere. Scaled by total elapsed real
/// time, not sub-step time.
pub fn apply_evaporation(rate: f32, elapsed: f32, water: &mut ScalarGrid) {
    if rate == 0.0 || elapsed <= 0.0 {
        return;
    }
    let delta = rate * elapsed;
    if delta > 0.0 {
        for depth in water.cells.iter_mut() {
            if *depth > 0.0 {
                *depth = (*depth - delta).max(0.0);
            }
        }
    } else {
        for depth in water.cells.iter_mut() {
            *depth -= delta;
        }
    }
}

/// Melts snow at `melt_rate` (cm/s), transferring the melted depth into the
/// water field. Scaled by total elapsed real time.
pub fn apply_snow_melt(melt_rate: f32, elapsed: f32, snow: &mut ScalarGrid, water: &mut ScalarGrid) {
    if melt_rate <= 0.0 || elapsed <= 0.0 {
        return;
    }
    let budget = melt_rate * elapsed;
    for (snow_depth, water_depth) in snow.cells.iter_mut().zip(water.cells.iter_mut()) {
        if *snow_depth > 0.0 {
            let melted = budget.min(*snow_depth);
            *snow_depth -= melted;
            *water_depth += melted;
        }
    }
}
