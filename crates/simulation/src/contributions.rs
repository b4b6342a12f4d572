//! Registry of externally-contributed water/snow effects.
//!
//! Collaborators (a gesture detector contributing rain disks, a faucet tool,
//! tests) register effects here; the engine applies every entry once per
//! simulation step. Effects are tagged values rather than callbacks so they
//! can be inspected and asserted on. Effects never read simulation state
//! back; that goes through the snapshot channel.

use bevy::prelude::*;

use crate::grid::ScalarGrid;
use crate::params::SimParams;

/// Handle returned by [`ContributionRegistry::add`]; remove with it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContributionId(u64);

/// Fraction of a rain disk's radius that receives full strength; the rest
/// fades linearly to zero at the rim.
const DISK_CORE_FRACTION: f32 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    /// A soft-edged disk of precipitation, centred in cell coordinates.
    /// `strength` is a depth rate (cm/s); `None` uses the shared
    /// `rain_strength` parameter.
    RainDisk {
        center: (f32, f32),
        radius: f32,
        strength: Option<f32>,
    },
    /// Uniform precipitation over the whole grid (cm/s).
    Uniform { rate: f32 },
}

#[derive(Resource, Default)]
pub struct ContributionRegistry {
    entries: Vec<(ContributionId, Contribution)>,
    next_id: u64,
}

impl ContributionRegistry {
    pub fn add(&mut self, contribution: Contribution) -> ContributionId {
        let id = ContributionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, contribution));
        id
    }

    /// Removes a registration; returns whether it was present.
    pub fn remove(&mut self, id: ContributionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ContributionId, Contribution)> {
        self.entries.iter()
    }
}

/// Deposits `depth` at one cell, routed to snow when the terrain there sits
/// above the snow line.
#[inline]
fn deposit(
    idx: usize,
    depth: f32,
    snow_line: f32,
    bathymetry: &ScalarGrid,
    water: &mut ScalarGrid,
    snow: &mut ScalarGrid,
) {
    if bathymetry.cells[idx] > snow_line {
        snow.cells[idx] += depth;
    } else {
        water.cells[idx] += depth;
    }
}

/// Applies one contribution for one step of size `dt`.
pub fn apply(
    contribution: &Contribution,
    params: &SimParams,
    bathymetry: &ScalarGrid,
    water: &mut ScalarGrid,
    snow: &mut ScalarGrid,
    dt: f32,
) {
    match *contribution {
        Contribution::RainDisk {
            center: (cx, cy),
            radius,
            strength,
        } => {
            if radius <= 0.0 {
                return;
            }
            let strength = strength.unwrap_or(params.rain_strength);
            if strength <= 0.0 {
                return;
            }
            let x0 = ((cx - radius).floor().max(0.0)) as usize;
            let y0 = ((cy - radius).floor().max(0.0)) as usize;
            let x1 = (((cx + radius).ceil()) as usize).min(water.width.saturating_sub(1));
            let y1 = (((cy + radius).ceil()) as usize).min(water.height.saturating_sub(1));
            let core = radius * DISK_CORE_FRACTION;
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as f32 - cx;
                    let dy = y as f32 - cy;
                    let dist = (dx * dx + dy * dy).sqrt();
                    if dist > radius {
                        continue;
                    }
                    let falloff = if dist <= core {
                        1.0
                    } else {
                        (radius - dist) / (radius - core)
                    };
                    let idx = water.index(x, y);
                    deposit(
                        idx,
                        strength * falloff * dt,
                        params.snow_line,
                        bathymetry,
                        water,
                        snow,
                    );
                }
            }
        }
        Contribution::Uniform { rate } => {
            if rate <= 0.0 {
                return;
            }
            for idx in 0..water.cells.len() {
                deposit(idx, rate * dt, params.snow_line, bathymetry, water, snow);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(w: usize, h: usize) -> (SimParams, ScalarGrid, ScalarGrid, ScalarGrid) {
        (
            SimParams::default(),
            ScalarGrid::new(w, h),
            ScalarGrid::new(w, h),
            ScalarGrid::new(w, h),
        )
    }

    #[test]
    fn test_add_remove() {
        let mut registry = ContributionRegistry::default();
        assert!(registry.is_empty());
        let a = registry.add(Contribution::Uniform { rate: 0.1 });
        let b = registry.add(Contribution::Uniform { rate: 0.2 });
        assert_eq!(registry.len(), 2);
        assert_ne!(a, b);
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_uniform_rain_scales_with_dt() {
        let (params, bathy, mut water, mut snow) = setup(4, 4);
        apply(
            &Contribution::Uniform { rate: 2.0 },
            &params,
            &bathy,
            &mut water,
            &mut snow,
            0.5,
        );
        assert!(water.cells.iter().all(|&d| (d - 1.0).abs() < 1.0e-6));
        assert!(snow.cells.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_rain_disk_core_and_falloff() {
        let (params, bathy, mut water, mut snow) = setup(16, 16);
        apply(
            &Contribution::RainDisk {
                center: (8.0, 8.0),
                radius: 4.0,
                strength: Some(1.0),
            },
            &params,
            &bathy,
            &mut water,
            &mut snow,
            1.0,
        );
        // Centre gets full strength, the rim fades, outside stays dry.
        assert!((water.get(8, 8) - 1.0).abs() < 1.0e-6);
        assert!(water.get(8, 11) > 0.0 && water.get(8, 11) <= 1.0);
        assert_eq!(water.get(8, 13), 0.0);
        assert_eq!(water.get(0, 0), 0.0);
    }

    #[test]
    fn test_disk_strength_falls_back_to_rain_strength() {
        let (mut params, bathy, mut water, mut snow) = setup(8, 8);
        params.set_rain_strength(2.0);
        apply(
            &Contribution::RainDisk {
                center: (4.0, 4.0),
                radius: 2.0,
                strength: None,
            },
            &params,
            &bathy,
            &mut water,
            &mut snow,
            1.0,
        );
        assert!((water.get(4, 4) - 2.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_snow_line_partition() {
        let (mut params, mut bathy, mut water, mut snow) = setup(2, 1);
        params.snow_line = 10.0;
        bathy.set(0, 0, 20.0); // above the snow line
        bathy.set(1, 0, 0.0); // below
        apply(
            &Contribution::Uniform { rate: 1.0 },
            &params,
            &bathy,
            &mut water,
            &mut snow,
            1.0,
        );
        assert_eq!(water.get(0, 0), 0.0);
        assert!((snow.get(0, 0) - 1.0).abs() < 1.0e-6);
        assert!((water.get(1, 0) - 1.0).abs() < 1.0e-6);
        assert_eq!(snow.get(1, 0), 0.0);
    }

    #[test]
    fn test_disk_clipped_at_grid_edge() {
        let (params, bathy, mut water, mut snow) = setup(4, 4);
        apply(
            &Contribution::RainDisk {
                center: (0.0, 0.0),
                radius: 3.0,
                strength: Some(1.0),
            },
            &params,
            &bathy,
            &mut water,
            &mut snow,
            1.0,
        );
        assert!(water.get(0, 0) > 0.0);
        assert_eq!(water.get(3, 3), 0.0);
    }
}
