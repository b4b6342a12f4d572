//! Depth stabilizer: turns noisy per-frame depth samples into a temporally
//! and spatially stable elevation field.
//!
//! Lives on the sensor thread. Each raw frame is folded into per-cell sample
//! histories; a cell publishes only once its recent history is large and
//! quiet enough (convergence), and even then a hysteresis dead-band around
//! the previously published value suppresses single-frame flicker. When at
//! least one cell's published value changed, the whole elevation grid is
//! posted through the frame handoff buffer for the display-cycle side to
//! pick up. If the sensor stalls, nothing is published and the engine keeps
//! simulating over the last delivered terrain.

mod types;


pub use types::{PixelHistory, StabilizedFrame, StabilizerParams};

use crate::grid::ScalarGrid;
use crate::handoff::FrameSender;

/// Callback invoked after each publication with the running publication count.
pub type FrameListener = Box<dyn FnMut(u64) + Send>;

pub struct DepthStabilizer {
    pub params: StabilizerParams,
    width: usize,
    height: usize,
    histories: Vec<PixelHistory>,
    published: ScalarGrid,
    has_published: Vec<bool>,
    // Scratch buffers reused across frames.
    candidates: ScalarGrid,
    candidate_mask: Vec<bool>,
    smoothed: ScalarGrid,
    frame_scratch: StabilizedFrame,
    sender: FrameSender<StabilizedFrame>,
    listener: Option<FrameListener>,
    frames_published: u64,
}

impl DepthStabilizer {
    pub fn new(
        width: usize,
        height: usize,
        params: StabilizerParams,
        sender: FrameSender<StabilizedFrame>,
    ) -> Self {
        let cells = width * height;
        let capacity = params.averaging_depth.max(1);
        Self {
            params,
            width,
            height,
            histories: vec![PixelHistory::new(capacity); cells],
            published: ScalarGrid::new(width, height),
            has_published: vec![false; cells],
            candidates: ScalarGrid::new(width, height),
            candidate_mask: vec![false; cells],
            smoothed: ScalarGrid::new(width, height),
            frame_scratch: StabilizedFrame::empty(width, height),
            sender,
            listener: None,
            frames_published: 0,
        }
    }

    pub fn set_listener(&mut self, listener: FrameListener) {
        self.listener = Some(listener);
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    /// Single ingestion entry point: one raw depth sample per cell plus a
    /// per-cell validity flag, at the sensor's own rate. Returns whether a
    /// stabilized frame was published this tick.
    pub fn ingest_frame(&mut self, samples: &[f32], validity: &[bool]) -> bool {
        let cells = self.width * self.height;
        assert_eq!(samples.len(), cells, "sample grid size mismatch");
        assert_eq!(validity.len(), cells, "validity grid size mismatch");

        let (range_min, range_max) = self.params.elevation_range;

        // Fold the frame into the per-cell histories and collect converged
        // candidates. Cells without a candidate carry their previous
        // published value so the smoothing pass has a full field to read.
        for i in 0..cells {
            let in_range = samples[i] >= range_min && samples[i] <= range_max;
            let sample = (validity[i] && in_range).then(|| samples[i]);
            let history = &mut self.histories[i];
            history.push(sample);

            if history.converged(self.params.min_num_samples, self.params.max_variance) {
                self.candidates.cells[i] = history.mean();
                self.candidate_mask[i] = true;
            } else {
                self.candidates.cells[i] = self.published.cells[i];
                self.candidate_mask[i] = false;
            }
        }

        if self.params.spatial_filter {
            self.smooth_candidates();
        }

        // Hysteresis test against the previously published field.
        let dead_band = self.params.hysteresis * 0.5;
        let mut changed = false;
        for i in 0..cells {
            if !self.candidate_mask[i] {
                continue;
            }
            let candidate = self.candidates.cells[i];
            if candidate < range_min || candidate > range_max {
                // Smoothing can push a candidate out of range; the cell
                // keeps its previous value this cycle.
                continue;
            }
            if self.has_published[i] {
                if (candidate - self.published.cells[i]).abs() > dead_band {
                    self.published.cells[i] = candidate;
                    changed = true;
                }
            } else {
                self.published.cells[i] = candidate;
                self.has_published[i] = true;
                changed = true;
            }
        }

        if changed {
            self.frame_scratch
                .elevations
                .cells
                .copy_from_slice(&self.published.cells);
            self.sender.post(&self.frame_scratch);
            self.frames_published += 1;
            let count = self.frames_published;
            if let Some(listener) = self.listener.as_mut() {
                listener(count);
            }
        }
        changed
    }

    /// Drops all accumulated history, e.g. after the sensor reconnects.
    /// Published values stay: the engine keeps the last delivered terrain.
    pub fn reset_histories(&mut self) {
        self.histories.iter_mut().for_each(PixelHistory::reset);
    }

    /// Separable 1-2-1 average over cells that carry a defined value
    /// (a fresh candidate or a previously published elevation). Undefined
    /// cells neither contribute nor receive.
    fn smooth_candidates(&mut self) {
        let (w, h) = (self.width, self.height);
        let defined =
            |mask: &[bool], has: &[bool], i: usize| -> bool { mask[i] || has[i] };

        // Horizontal pass: candidates -> smoothed.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                if !defined(&self.candidate_mask, &self.has_published, i) {
                    self.smoothed.cells[i] = self.candidates.cells[i];
                    continue;
                }
                let mut acc = self.candidates.cells[i] * 2.0;
                let mut weight = 2.0;
                if x > 0 && defined(&self.candidate_mask, &self.has_published, i - 1) {
                    acc += self.candidates.cells[i - 1];
                    weight += 1.0;
                }
                if x + 1 < w && defined(&self.candidate_mask, &self.has_published, i + 1) {
                    acc += self.candidates.cells[i + 1];
                    weight += 1.0;
                }
                self.smoothed.cells[i] = acc / weight;
            }
        }

        // Vertical pass: smoothed -> candidates.
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                if !defined(&self.candidate_mask, &self.has_published, i) {
                    self.candidates.cells[i] = self.smoothed.cells[i];
                    continue;
                }
                let mut acc = self.smoothed.cells[i] * 2.0;
                let mut weight = 2.0;
                if y > 0 && defined(&self.candidate_mask, &self.has_published, i - w) {
                    acc += self.smoothed.cells[i - w];
                    weight += 1.0;
                }
                if y + 1 < h && defined(&self.candidate_mask, &self.has_published, i + w) {
                    acc += self.smoothed.cells[i + w];
                    weight += 1.0;
                }
                self.candidates.cells[i] = acc / weight;
            }
        }
    }
}
