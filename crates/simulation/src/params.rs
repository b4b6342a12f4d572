//! Runtime-tunable simulation parameters.
//!
//! External control (UI, control pipe, tests) mutates this resource at any
//! time; the engine reads it at the start of each step. Setters clamp instead
//! of rejecting, so out-of-range control commands degrade gracefully.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ELEVATION_MAX, ELEVATION_MIN};

/// Bounds mirrored by every setter below.
pub const SPEED_RANGE: (f32, f32) = (0.0, 10.0);
pub const MAX_STEPS_RANGE: (u32, u32) = (0, 200);
pub const MIN_STEP_RANGE: (f32, f32) = (0.0, 1.0);
pub const SNOW_MELT_RANGE: (f32, f32) = (0.0, 10.0);
pub const EVAPORATION_RANGE: (f32, f32) = (-10.0, 10.0);
pub const RAIN_STRENGTH_RANGE: (f32, f32) = (0.0, 10.0);

/// Numerical scheme used for cell-to-cell flow. Selected at configuration
/// time; the stepping code dispatches on it once per step, not per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaterMode {
    /// Flow driven purely by surface-height differences.
    #[default]
    Traditional,
    /// Flow resistance modulated by the property grid's roughness field,
    /// with infiltration losses from its absorption field.
    Engineering,
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Relative simulation speed; per-cycle budget = display delta * speed.
    pub speed: f32,
    /// Cap on explicit update steps per display cycle.
    pub max_steps: u32,
    /// Smallest step size (s) the stability loop may be forced down to.
    /// A zero stability estimate is raised to this to guarantee progress.
    pub min_step_size: f32,
    /// Flux retention factor per step; 1.0 = no dissipation. The control
    /// protocol commands the *removed* fraction, stored here as 1 - value.
    pub attenuation: f32,
    /// Elevation (cm) above which precipitation accumulates as snow.
    pub snow_line: f32,
    /// Snow melt rate (cm/s of snow depth converted to water).
    pub snow_melt: f32,
    /// Uniform depth change rate (cm/s). Positive evaporates, negative
    /// deposits water everywhere.
    pub evaporation_rate: f32,
    /// Depth rate (cm/s) used by rain contributions that carry no explicit
    /// strength of their own.
    pub rain_strength: f32,
    /// Selected stepping formulation.
    pub mode: WaterMode,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_steps: 30,
            min_step_size: 0.0,
            attenuation: 1.0,
            snow_line: ELEVATION_MAX,
            snow_melt: 0.0625,
            evaporation_rate: 0.0,
            rain_strength: 0.25,
            mode: WaterMode::Traditional,
        }
    }
}

impl SimParams {
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
    }

    pub fn set_max_steps(&mut self, max_steps: i64) {
        self.max_steps = max_steps.clamp(MAX_STEPS_RANGE.0 as i64, MAX_STEPS_RANGE.1 as i64) as u32;
    }

    pub fn set_min_step_size(&mut self, min_step: f32) {
        self.min_step_size = min_step.clamp(MIN_STEP_RANGE.0, MIN_STEP_RANGE.1);
    }

    /// Takes the commanded dissipation fraction in [0, 1] and stores the
    /// retained fraction.
    pub fn set_attenuation(&mut self, removed_fraction: f32) {
        self.attenuation = 1.0 - removed_fraction.clamp(0.0, 1.0);
    }

    pub fn set_snow_line(&mut self, snow_line: f32) {
        self.snow_line = snow_line.clamp(ELEVATION_MIN, ELEVATION_MAX);
    }

    pub fn set_snow_melt(&mut self, snow_melt: f32) {
        self.snow_melt = snow_melt.clamp(SNOW_MELT_RANGE.0, SNOW_MELT_RANGE.1);
    }

    pub fn set_evaporation_rate(&mut self, rate: f32) {
        self.evaporation_rate = rate.clamp(EVAPORATION_RANGE.0, EVAPORATION_RANGE.1);
    }

    pub fn set_rain_strength(&mut self, strength: f32) {
        self.rain_strength = strength.clamp(RAIN_STRENGTH_RANGE.0, RAIN_STRENGTH_RANGE.1);
    }

    pub fn set_mode(&mut self, mode: WaterMode) {
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SimParams::default();
        assert!((p.speed - 1.0).abs() < f32::EPSILON);
        assert_eq!(p.max_steps, 30);
        assert!((p.attenuation - 1.0).abs() < f32::EPSILON);
        assert_eq!(p.mode, WaterMode::Traditional);
    }

    #[test]
    fn test_setters_clamp() {
        let mut p = SimParams::default();
        p.set_speed(-3.0);
        assert_eq!(p.speed, 0.0);
        p.set_speed(1000.0);
        assert_eq!(p.speed, SPEED_RANGE.1);
        p.set_max_steps(-5);
        assert_eq!(p.max_steps, 0);
        p.set_max_steps(10_000);
        assert_eq!(p.max_steps, MAX_STEPS_RANGE.1);
        p.set_snow_line(1.0e6);
        assert_eq!(p.snow_line, ELEVATION_MAX);
    }

    #[test]
    fn test_attenuation_stored_inverted() {
        let mut p = SimParams::default();
        p.set_attenuation(0.1);
        assert!((p.attenuation - 0.9).abs() < 1.0e-6);
        p.set_attenuation(2.0);
        assert_eq!(p.attenuation, 0.0);
        p.set_attenuation(-1.0);
        assert_eq!(p.attenuation, 1.0);
    }
}
