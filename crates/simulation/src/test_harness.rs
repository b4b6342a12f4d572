//! # TestTable — headless integration test harness
//!
//! Wraps `bevy::app::App` + [`SandTablePlugin`](crate::SandTablePlugin) with
//! a deterministic clock: the stock time plugin is disabled and each
//! [`TestTable::advance`] call moves virtual time by exactly the requested
//! delta before running one update. Tests and benches drive display cycles
//! without a window, a sensor, or wall-clock jitter.

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimePlugin;

use crate::config::{GRID_HEIGHT, GRID_WIDTH};
use crate::contributions::{Contribution, ContributionId, ContributionRegistry};
use crate::control;
use crate::engine::{BathymetryGrid, FilteredFrames, SnowGrid, WaterGrid, WaterSimState};
use crate::grid::ScalarGrid;
use crate::handoff::{frame_link, FrameSender};
use crate::params::SimParams;
use crate::snapshot::SnapshotChannel;
use crate::stabilizer::StabilizedFrame;
use crate::SandTablePlugin;

pub struct TestTable {
    app: App,
    terrain: FrameSender<StabilizedFrame>,
    control: std::sync::mpsc::Sender<String>,
}

impl TestTable {
    /// A full-size table with flat terrain, no water, and both input
    /// channels wired the way the app wires them.
    pub fn new() -> Self {
        Self::with_size(GRID_WIDTH, GRID_HEIGHT)
    }

    /// A table with a small grid for tests that inspect individual cells.
    pub fn with_size(width: usize, height: usize) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins.build().disable::<TimePlugin>());
        // Manual clock; advance() moves it explicitly.
        app.init_resource::<Time>();

        let (terrain, receiver) = frame_link(StabilizedFrame::empty(width, height));
        app.insert_resource(FilteredFrames(receiver));

        let (control, lines) = control::control_channel();
        app.insert_resource(lines);

        app.add_plugins(SandTablePlugin);

        // Size the grids before the first update so every system sees
        // consistent dimensions.
        app.insert_resource(BathymetryGrid(ScalarGrid::new(width, height)));
        app.insert_resource(WaterGrid(ScalarGrid::new(width, height)));
        app.insert_resource(SnowGrid(ScalarGrid::new(width, height)));

        app.update();
        Self {
            app,
            terrain,
            control,
        }
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn with_params(mut self, configure: impl FnOnce(&mut SimParams)) -> Self {
        configure(&mut self.app.world_mut().resource_mut::<SimParams>());
        self
    }

    pub fn with_water(mut self, configure: impl FnOnce(&mut ScalarGrid)) -> Self {
        configure(&mut self.app.world_mut().resource_mut::<WaterGrid>().0);
        self
    }

    pub fn with_bathymetry(mut self, configure: impl FnOnce(&mut ScalarGrid)) -> Self {
        configure(&mut self.app.world_mut().resource_mut::<BathymetryGrid>().0);
        self
    }

    pub fn add_contribution(&mut self, contribution: Contribution) -> ContributionId {
        self.app
            .world_mut()
            .resource_mut::<ContributionRegistry>()
            .add(contribution)
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Advances virtual time by `elapsed` seconds and runs one display cycle.
    pub fn advance(&mut self, elapsed: f32) {
        self.app
            .world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(elapsed));
        self.app.update();
    }

    /// Runs `cycles` display cycles of `elapsed` seconds each.
    pub fn advance_cycles(&mut self, cycles: usize, elapsed: f32) {
        for _ in 0..cycles {
            self.advance(elapsed);
        }
    }

    /// Posts a stabilized terrain frame, as the stabilizer thread would.
    pub fn post_terrain(&mut self, elevations: ScalarGrid) {
        self.terrain.post(&StabilizedFrame { elevations });
    }

    /// Queues a control line for the next cycle's ingest phase.
    pub fn send_control(&self, line: &str) {
        // The receiving resource outlives the harness, so send cannot fail.
        let _ = self.control.send(line.to_string());
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn water(&self) -> &ScalarGrid {
        &self.app.world().resource::<WaterGrid>().0
    }

    pub fn snow(&self) -> &ScalarGrid {
        &self.app.world().resource::<SnowGrid>().0
    }

    pub fn bathymetry(&self) -> &ScalarGrid {
        &self.app.world().resource::<BathymetryGrid>().0
    }

    pub fn state(&self) -> &WaterSimState {
        self.app.world().resource::<WaterSimState>()
    }

    pub fn snapshot_channel(&self) -> SnapshotChannel {
        self.app.world().resource::<SnapshotChannel>().clone()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }
}

impl Default for TestTable {
    fn default() -> Self {
        Self::new()
    }
}
