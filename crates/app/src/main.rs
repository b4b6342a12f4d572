use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use simulation::config::{GRID_HEIGHT, GRID_WIDTH};
use simulation::control;
use simulation::engine::FilteredFrames;
use simulation::handoff::frame_link;
use simulation::stabilizer::StabilizedFrame;
use simulation::SandTablePlugin;

mod control_pipe;
mod sensor;

const DISPLAY_RATE: f64 = 30.0;

fn main() {
    let config = match sensor::SensorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / DISPLAY_RATE,
        ))),
    );
    app.add_plugins(LogPlugin::default());

    // Sensor side of the terrain handoff: the stabilizer runs on its own
    // thread at the camera's rate and posts frames through the link.
    let (frame_sender, frame_receiver) = frame_link(StabilizedFrame::empty(GRID_WIDTH, GRID_HEIGHT));
    app.insert_resource(FilteredFrames(frame_receiver));
    if let Err(err) = sensor::spawn_sensor_thread(config, frame_sender) {
        eprintln!("failed to start sensor thread: {err}");
        std::process::exit(1);
    }

    // Control lines come in from a named pipe (or stdin when none is given)
    // and are applied at the start of the next display cycle.
    let (line_sender, lines) = control::control_channel();
    app.insert_resource(lines);
    let pipe_path = std::env::var_os("SANDTABLE_CONTROL_PIPE").map(Into::into);
    if let Err(err) = control_pipe::spawn_reader(pipe_path, line_sender) {
        eprintln!("failed to start control reader: {err}");
        std::process::exit(1);
    }

    app.add_plugins(SandTablePlugin);
    app.run();
}
