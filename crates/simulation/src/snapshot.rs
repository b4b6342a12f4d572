//! One-shot asynchronous grid snapshots.
//!
//! Any thread may submit a request naming which grids it wants; the engine
//! services at most one request per display cycle, after its update loop,
//! copying into the caller-provided buffers and invoking the completion
//! callback exactly once. The channel holds at most one live request; a
//! second `submit` while one is pending fails and the caller retries on a
//! later cycle. Both channel operations are O(1) under the mutex, never
//! proportional to grid size.

use std::sync::{Arc, Mutex, PoisonError};

use bevy::prelude::*;

/// Filled grids handed back through the completion callback. Buffers the
/// request did not ask for come back as `None`; requested buffers are
/// resized to the grid's cell count.
pub struct SnapshotReply {
    pub bathymetry: Option<Vec<f32>>,
    pub water: Option<Vec<f32>>,
    pub snow: Option<Vec<f32>>,
    /// Accumulated simulation time (s) at the moment the copy was taken.
    pub sim_time: f64,
}

pub type SnapshotCallback = Box<dyn FnOnce(SnapshotReply) + Send>;

/// A pending ask for grid copies. Destination buffers are moved in with the
/// request and returned through the callback, so no allocation happens on
/// the engine side.
pub struct SnapshotRequest {
    pub bathymetry: Option<Vec<f32>>,
    pub water: Option<Vec<f32>>,
    pub snow: Option<Vec<f32>>,
    pub callback: SnapshotCallback,
}

impl std::fmt::Debug for SnapshotRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRequest")
            .field("bathymetry", &self.bathymetry)
            .field("water", &self.water)
            .field("snow", &self.snow)
            .finish_non_exhaustive()
    }
}

impl SnapshotRequest {
    pub fn complete(self, sim_time: f64, fill: impl FnOnce(&mut SnapshotRequest)) {
        let mut request = self;
        fill(&mut request);
        let reply = SnapshotReply {
            bathymetry: request.bathymetry.take(),
            water: request.water.take(),
            snow: request.snow.take(),
            sim_time,
        };
        (request.callback)(reply);
    }
}

/// Cloneable handle to the single-request slot. Inserted as a resource so
/// display-cycle systems reach it, and cloned out to whatever thread wants
/// snapshots.
#[derive(Resource, Clone, Default)]
pub struct SnapshotChannel {
    slot: Arc<Mutex<Option<SnapshotRequest>>>,
}

impl SnapshotChannel {
    /// Stores the request if none is pending. Returns `false` (handing the
    /// request back) when one is already outstanding.
    pub fn submit(&self, request: SnapshotRequest) -> Result<(), SnapshotRequest> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            Err(request)
        } else {
            *slot = Some(request);
            Ok(())
        }
    }

    /// Takes the pending request, if any, and clears the slot.
    pub fn take_and_clear(&self) -> Option<SnapshotRequest> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn has_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
