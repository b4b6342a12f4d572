//! Stabilizer parameter set, per-pixel sample history, and the published
//! frame type.

use serde::{Deserialize, Serialize};

use crate::config::{ELEVATION_MAX, ELEVATION_MIN};
use crate::grid::ScalarGrid;

/// Tuning knobs for the depth stabilizer. All fields may be set per
/// installation; the defaults suit a depth camera at sandbox distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizerParams {
    /// Ring capacity K: how many raw samples each cell remembers.
    pub averaging_depth: usize,
    /// A cell needs at least this many valid samples before it may publish.
    pub min_num_samples: usize,
    /// Sample variance ceiling for convergence.
    pub max_variance: f32,
    /// Dead-band width around the last published value; a candidate must
    /// move more than half of this to replace it.
    pub hysteresis: f32,
    /// Average converged candidates with their immediate neighbors before
    /// the hysteresis test.
    pub spatial_filter: bool,
    /// Candidates outside this closed interval are discarded for the cycle.
    pub elevation_range: (f32, f32),
}

impl Default for StabilizerParams {
    fn default() -> Self {
        Self {
            averaging_depth: 30,
            min_num_samples: 10,
            max_variance: 4.0,
            hysteresis: 0.1,
            spatial_filter: true,
            elevation_range: (ELEVATION_MIN, ELEVATION_MAX),
        }
    }
}

/// Ring of the last K raw samples for one cell, with running sums so the
/// variance check is O(1) per new sample. Invalid samples retire the oldest
/// entry without contributing, so a noisy cell degrades toward "not
/// converged" instead of poisoning the estimate.
#[derive(Debug, Clone)]
pub struct PixelHistory {
    samples: Vec<f32>,
    valid: Vec<bool>,
    head: usize,
    valid_count: usize,
    sum: f64,
    sum_sq: f64,
}

impl PixelHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            valid: vec![false; capacity],
            head: 0,
            valid_count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Pushes one sensor tick's sample; `None` for "no data". The oldest
    /// entry is retired either way.
    pub fn push(&mut self, sample: Option<f32>) {
        if self.valid[self.head] {
            let old = self.samples[self.head] as f64;
            self.sum -= old;
            self.sum_sq -= old * old;
            self.valid_count -= 1;
        }
        match sample {
            Some(value) => {
                self.samples[self.head] = value;
                self.valid[self.head] = true;
                let v = value as f64;
                self.sum += v;
                self.sum_sq += v * v;
                self.valid_count += 1;
            }
            None => {
                self.valid[self.head] = false;
            }
        }
        self.head = (self.head + 1) % self.samples.len();
    }

    pub fn reset(&mut self) {
        self.valid.iter_mut().for_each(|v| *v = false);
        self.valid_count = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
        self.head = 0;
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn mean(&self) -> f32 {
        if self.valid_count == 0 {
            return 0.0;
        }
        (self.sum / self.valid_count as f64) as f32
    }

    /// Unbiased sample variance; zero with fewer than two samples.
    pub fn variance(&self) -> f32 {
        let n = self.valid_count as f64;
        if n < 2.0 {
            return 0.0;
        }
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        var.max(0.0) as f32
    }

    pub fn converged(&self, min_num_samples: usize, max_variance: f32) -> bool {
        self.valid_count >= min_num_samples && self.variance() <= max_variance
    }
}

/// One complete stabilized elevation grid. Immutable once published; the
/// handoff buffer stamps each publication with a monotonic version.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedFrame {
    pub elevations: ScalarGrid,
}

impl StabilizedFrame {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            elevations: ScalarGrid::new(width, height),
        }
    }
}
