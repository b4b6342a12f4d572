//! Per-cell terrain property fields: roughness and absorption.
//!
//! Independent of terrain height; read-only during stepping. Roughness is a
//! Manning-style coefficient that divides flow conductance in engineering
//! mode; absorption is an infiltration rate (cm/s) removed from standing
//! water. The `waterRoughness`/`waterAbsorption` control commands set the
//! whole field to one scalar; callers with per-cell data write cells
//! directly.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::grid::ScalarGrid;

pub const ROUGHNESS_RANGE: (f32, f32) = (0.01, 10.0);
pub const ABSORPTION_RANGE: (f32, f32) = (0.0, 10.0);

pub const DEFAULT_ROUGHNESS: f32 = 1.0;
pub const DEFAULT_ABSORPTION: f32 = 0.0;

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct PropertyGrid {
    pub roughness: ScalarGrid,
    pub absorption: ScalarGrid,
}

impl Default for PropertyGrid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl PropertyGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            roughness: ScalarGrid::filled(width, height, DEFAULT_ROUGHNESS),
            absorption: ScalarGrid::filled(width, height, DEFAULT_ABSORPTION),
        }
    }

    /// Sets every cell's roughness to one clamped scalar.
    pub fn set_uniform_roughness(&mut self, roughness: f32) {
        self.roughness
            .fill(roughness.clamp(ROUGHNESS_RANGE.0, ROUGHNESS_RANGE.1));
    }

    /// Sets every cell's absorption to one clamped scalar.
    pub fn set_uniform_absorption(&mut self, absorption: f32) {
        self.absorption
            .fill(absorption.clamp(ABSORPTION_RANGE.0, ABSORPTION_RANGE.1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PropertyGrid::new(4, 4);
        assert!(p.roughness.cells.iter().all(|&r| r == DEFAULT_ROUGHNESS));
        assert!(p.absorption.cells.iter().all(|&a| a == DEFAULT_ABSORPTION));
    }

    #[test]
    fn test_uniform_setters_clamp() {
        let mut p = PropertyGrid::new(4, 4);
        p.set_uniform_roughness(0.0);
        assert!(p.roughness.cells.iter().all(|&r| r == ROUGHNESS_RANGE.0));
        p.set_uniform_absorption(99.0);
        assert!(p.absorption.cells.iter().all(|&a| a == ABSORPTION_RANGE.1));
    }
}
