//! Row-major scalar field storage shared by every grid in the core.
//!
//! Bathymetry, water depth, snow depth, the terrain property components, and
//! stabilized elevation frames are all `ScalarGrid`s; the owning resources
//! wrap one and add their own semantics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarGrid {
    pub cells: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl ScalarGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            cells: vec![value; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, val: f32) {
        let idx = self.index(x, y);
        self.cells[idx] = val;
    }

    pub fn fill(&mut self, value: f32) {
        self.cells.iter_mut().for_each(|c| *c = value);
    }

    /// Sum of all cell values; per-cell depth sums double as volume because
    /// every cell has the same footprint.
    pub fn total(&self) -> f64 {
        self.cells.iter().map(|&c| c as f64).sum()
    }

    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(0.0_f32, f32::max)
    }

    /// Returns up to 4 cardinal neighbors and the count of valid entries.
    /// Use `&result[..count]` to iterate over valid neighbors.
    pub fn neighbors4(&self, x: usize, y: usize) -> ([(usize, usize); 4], usize) {
        let mut result = [(0, 0); 4];
        let mut count = 0;
        if x > 0 {
            result[count] = (x - 1, y);
            count += 1;
        }
        if x + 1 < self.width {
            result[count] = (x + 1, y);
            count += 1;
        }
        if y > 0 {
            result[count] = (x, y - 1);
            count += 1;
        }
        if y + 1 < self.height {
            result[count] = (x, y + 1);
            count += 1;
        }
        (result, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let g = ScalarGrid::new(8, 4);
        assert_eq!(g.cells.len(), 32);
        assert!(g.cells.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut g = ScalarGrid::new(16, 16);
        g.set(3, 7, 2.5);
        assert!((g.get(3, 7) - 2.5).abs() < f32::EPSILON);
        assert_eq!(g.index(0, 1), 16);
    }

    #[test]
    fn test_out_of_bounds() {
        let g = ScalarGrid::new(10, 20);
        assert!(g.in_bounds(9, 19));
        assert!(!g.in_bounds(10, 0));
        assert!(!g.in_bounds(0, 20));
    }

    #[test]
    fn test_total_and_max() {
        let mut g = ScalarGrid::new(4, 4);
        g.set(0, 0, 1.0);
        g.set(3, 3, 4.0);
        assert!((g.total() - 5.0).abs() < 1e-9);
        assert!((g.max_value() - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_neighbors_corner_and_interior() {
        let g = ScalarGrid::new(8, 8);
        assert_eq!(g.neighbors4(0, 0).1, 2);
        assert_eq!(g.neighbors4(4, 4).1, 4);
        assert_eq!(g.neighbors4(7, 7).1, 2);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut g = ScalarGrid::new(4, 2);
        g.set(1, 1, 9.0);
        let json = serde_json::to_string(&g).expect("serialize");
        let restored: ScalarGrid = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, g);
    }
}
