//! End-to-end cycle tests through the full app wiring: terrain handoff,
//! control lines, contributions, stepping, and snapshot servicing all
//! running inside one headless `App`.

use std::sync::mpsc;

use crate::contributions::Contribution;
use crate::engine::ReferenceDem;
use crate::grid::ScalarGrid;
use crate::handoff::frame_link;
use crate::snapshot::{SnapshotReply, SnapshotRequest};
use crate::stabilizer::{DepthStabilizer, StabilizedFrame, StabilizerParams};
use crate::test_harness::TestTable;

const CYCLE: f32 = 1.0 / 30.0;

#[test]
fn test_posted_terrain_reaches_bathymetry() {
    let mut table = TestTable::with_size(8, 8);
    let mut terrain = ScalarGrid::new(8, 8);
    terrain.fill(12.5);
    table.post_terrain(terrain);

    table.advance(CYCLE);
    assert!(table.bathymetry().cells.iter().all(|&e| e == 12.5));
    assert_eq!(table.state().terrain_version, 1);

    // No new frame: the version sticks.
    table.advance(CYCLE);
    assert_eq!(table.state().terrain_version, 1);
}

#[test]
fn test_mismatched_terrain_frame_is_dropped() {
    let mut table = TestTable::with_size(8, 8);
    let mut terrain = ScalarGrid::new(4, 4);
    terrain.fill(99.0);
    table.post_terrain(terrain);

    table.advance(CYCLE);
    assert!(table.bathymetry().cells.iter().all(|&e| e == 0.0));
}

/// Drives the full sensor-side path: raw frames through the stabilizer,
/// across the handoff, into the engine's bathymetry.
#[test]
fn test_stabilizer_to_engine_pipeline() {
    let mut table = TestTable::with_size(6, 6);

    let (sender, receiver) = frame_link(StabilizedFrame::empty(6, 6));
    table
        .world_mut()
        .insert_resource(crate::engine::FilteredFrames(receiver));

    let mut stabilizer = DepthStabilizer::new(6, 6, StabilizerParams::default(), sender);
    let raw = vec![20.0_f32; 36];
    let valid = vec![true; 36];
    for _ in 0..StabilizerParams::default().min_num_samples {
        stabilizer.ingest_frame(&raw, &valid);
    }
    assert_eq!(stabilizer.frames_published(), 1);

    table.advance(CYCLE);
    assert!(table.bathymetry().cells.iter().all(|&e| e == 20.0));
}

#[test]
fn test_reference_model_clamps_ingested_terrain() {
    let mut table = TestTable::with_size(4, 4);
    let mut reference = ScalarGrid::new(4, 4);
    reference.fill(10.0);
    table.world_mut().insert_resource(ReferenceDem {
        grid: Some(reference),
        max_deviation: 5.0,
    });

    let mut terrain = ScalarGrid::new(4, 4);
    terrain.fill(40.0);
    table.post_terrain(terrain);
    table.advance(CYCLE);
    assert!(table.bathymetry().cells.iter().all(|&e| e == 15.0));
}

#[test]
fn test_control_line_applies_before_stepping() {
    let mut table = TestTable::with_size(8, 8).with_water(|w| w.fill(1.0));
    table.send_control("waterSpeed 0");
    table.advance(CYCLE);
    // The speed change landed in the same cycle, so no steps ran.
    assert_eq!(table.state().steps_last_cycle, 0);
    assert_eq!(table.state().sim_time, 0.0);
}

#[test]
fn test_rain_steps_and_snapshot_observes() {
    let mut table = TestTable::with_size(16, 16);
    table.add_contribution(Contribution::RainDisk {
        center: (8.0, 8.0),
        radius: 4.0,
        strength: Some(2.0),
    });
    table.advance_cycles(10, CYCLE);
    assert!(table.state().total_volume > 0.0);
    assert!(table.state().sim_time > 0.0);

    let (tx, rx) = mpsc::channel::<SnapshotReply>();
    let request = SnapshotRequest {
        bathymetry: None,
        water: Some(Vec::new()),
        snow: None,
        callback: Box::new(move |reply| {
            let _ = tx.send(reply);
        }),
    };
    table
        .snapshot_channel()
        .submit(request)
        .expect("no other request pending");

    table.advance(CYCLE);
    let reply = rx.try_recv().expect("snapshot serviced within one cycle");
    let water = reply.water.expect("water buffer was requested");
    assert_eq!(water.len(), 16 * 16);
    assert!(water.iter().sum::<f32>() > 0.0);
    // Unrequested grids stay unfilled.
    assert!(reply.bathymetry.is_none());
    assert!(reply.snow.is_none());
    assert!(reply.sim_time > 0.0);
}

#[test]
fn test_water_settles_into_basin() {
    // A bowl: raised rim, depressed center. Rain everywhere should end up
    // pooled in the middle.
    let mut table = TestTable::with_size(9, 9)
        .with_bathymetry(|b| {
            b.fill(10.0);
            for y in 3..6 {
                for x in 3..6 {
                    b.set(x, y, 0.0);
                }
            }
        })
        .with_params(|p| {
            p.set_evaporation_rate(0.0);
            p.set_snow_melt(0.0);
        });
    table.add_contribution(Contribution::Uniform { rate: 0.5 });
    table.advance_cycles(30, CYCLE);

    let basin: f32 = (3..6)
        .flat_map(|y| (3..6).map(move |x| (x, y)))
        .map(|(x, y)| table.water().get(x, y))
        .sum();
    let rim_corner = table.water().get(0, 0);
    assert!(basin / 9.0 > rim_corner, "basin should hold more than the rim");
}

#[test]
fn test_speed_scales_simulated_time() {
    let run = |speed: f32| -> f64 {
        let mut table = TestTable::with_size(8, 8)
            .with_water(|w| w.fill(0.5))
            .with_params(|p| p.set_speed(speed));
        table.advance_cycles(20, CYCLE);
        table.state().sim_time
    };
    let normal = run(1.0);
    let double = run(2.0);
    assert!((double / normal - 2.0).abs() < 0.05);
}
