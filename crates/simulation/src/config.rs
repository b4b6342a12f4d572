//! Grid dimensions and physical constants shared across the core.
//!
//! All lengths are centimetres and all times seconds, matching the physical
//! sand surface the depth camera observes. Systems read dimensions from the
//! grids themselves, so tests are free to build smaller fields; these
//! constants only size the default resources.

/// Default simulation grid width (cells). Half the depth camera's 640 columns.
pub const GRID_WIDTH: usize = 320;
/// Default simulation grid height (cells). Half the depth camera's 480 rows.
pub const GRID_HEIGHT: usize = 240;

/// Cell edge length in cm.
pub const CELL_SIZE: f32 = 1.0;

/// Lowest elevation (cm relative to the base plane) trusted from the sensor.
pub const ELEVATION_MIN: f32 = -100.0;
/// Highest elevation (cm relative to the base plane) trusted from the sensor.
pub const ELEVATION_MAX: f32 = 100.0;

/// Gravitational acceleration in cm/s^2.
pub const GRAVITY: f32 = 981.0;

/// Courant safety factor applied to the gravity-wave step-size limit.
pub const CFL_SAFETY: f32 = 0.5;

/// Budgets and step sizes below this are treated as zero.
pub const TIME_EPSILON: f32 = 1.0e-7;
