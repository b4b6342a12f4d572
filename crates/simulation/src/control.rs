//! Line-oriented textual control protocol.
//!
//! Each line is `<command> <arg>...`, whitespace-tokenized, command names
//! case-insensitive. Bad lines are logged and skipped; later lines still
//! run. Out-of-range numbers are clamped by the receiving setter, not
//! rejected. Parsing is pure so it tests without any I/O; the app feeds
//! lines in from a named pipe through an [`ControlLines`] channel drained
//! once per display cycle.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;

use crate::params::{SimParams, WaterMode};
use crate::property::PropertyGrid;
use crate::SimulationSet;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    WaterSpeed(f32),
    WaterMaxSteps(i64),
    WaterMode(WaterMode),
    /// Commanded dissipation fraction; stored inverted by the setter.
    WaterAttenuation(f32),
    SnowLine(f32),
    SnowMelt(f32),
    RainStrength(f32),
    EvaporationRate(f32),
    WaterRoughness(f32),
    WaterAbsorption(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    UnknownCommand(String),
    WrongArgCount { command: &'static str, expected: usize, got: usize },
    BadNumber { command: &'static str, arg: String },
    UnknownMode(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::UnknownCommand(cmd) => write!(f, "unknown command '{cmd}'"),
            ControlError::WrongArgCount { command, expected, got } => write!(
                f,
                "wrong number of arguments for {command}: expected {expected}, got {got}"
            ),
            ControlError::BadNumber { command, arg } => {
                write!(f, "cannot parse '{arg}' as a number for {command}")
            }
            ControlError::UnknownMode(mode) => write!(f, "unknown water mode '{mode}'"),
        }
    }
}

fn parse_one_float(command: &'static str, args: &[&str]) -> Result<f32, ControlError> {
    if args.len() != 1 {
        return Err(ControlError::WrongArgCount { command, expected: 1, got: args.len() });
    }
    args[0].parse::<f32>().map_err(|_| ControlError::BadNumber {
        command,
        arg: args[0].to_string(),
    })
}

/// Parses one control line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ControlCommand>, ControlError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let cmd = if command.eq_ignore_ascii_case("waterSpeed") {
        ControlCommand::WaterSpeed(parse_one_float("waterSpeed", args)?)
    } else if command.eq_ignore_ascii_case("waterMaxSteps") {
        if args.len() != 1 {
            return Err(ControlError::WrongArgCount {
                command: "waterMaxSteps",
                expected: 1,
                got: args.len(),
            });
        }
        let steps = args[0].parse::<i64>().map_err(|_| ControlError::BadNumber {
            command: "waterMaxSteps",
            arg: args[0].to_string(),
        })?;
        ControlCommand::WaterMaxSteps(steps)
    } else if command.eq_ignore_ascii_case("waterMode") {
        if args.len() != 1 {
            return Err(ControlError::WrongArgCount {
                command: "waterMode",
                expected: 1,
                got: args.len(),
            });
        }
        if args[0].eq_ignore_ascii_case("traditional") {
            ControlCommand::WaterMode(WaterMode::Traditional)
        } else if args[0].eq_ignore_ascii_case("engineering") {
            ControlCommand::WaterMode(WaterMode::Engineering)
        } else {
            return Err(ControlError::UnknownMode(args[0].to_string()));
        }
    } else if command.eq_ignore_ascii_case("waterAttenuation") {
        ControlCommand::WaterAttenuation(parse_one_float("waterAttenuation", args)?)
    } else if command.eq_ignore_ascii_case("snowLine") {
        ControlCommand::SnowLine(parse_one_float("snowLine", args)?)
    } else if command.eq_ignore_ascii_case("snowMelt") {
        ControlCommand::SnowMelt(parse_one_float("snowMelt", args)?)
    } else if command.eq_ignore_ascii_case("rainStrength") {
        ControlCommand::RainStrength(parse_one_float("rainStrength", args)?)
    } else if command.eq_ignore_ascii_case("evaporationRate") {
        ControlCommand::EvaporationRate(parse_one_float("evaporationRate", args)?)
    } else if command.eq_ignore_ascii_case("waterRoughness") {
        ControlCommand::WaterRoughness(parse_one_float("waterRoughness", args)?)
    } else if command.eq_ignore_ascii_case("waterAbsorption") {
        ControlCommand::WaterAbsorption(parse_one_float("waterAbsorption", args)?)
    } else {
        return Err(ControlError::UnknownCommand(command.to_string()));
    };
    Ok(Some(cmd))
}

/// Routes a parsed command to its clamping setter.
pub fn apply_command(command: &ControlCommand, params: &mut SimParams, property: &mut PropertyGrid) {
    match *command {
        ControlCommand::WaterSpeed(speed) => params.set_speed(speed),
        ControlCommand::WaterMaxSteps(steps) => params.set_max_steps(steps),
        ControlCommand::WaterMode(mode) => params.set_mode(mode),
        ControlCommand::WaterAttenuation(value) => params.set_attenuation(value),
        ControlCommand::SnowLine(line) => params.set_snow_line(line),
        ControlCommand::SnowMelt(rate) => params.set_snow_melt(rate),
        ControlCommand::RainStrength(strength) => params.set_rain_strength(strength),
        ControlCommand::EvaporationRate(rate) => params.set_evaporation_rate(rate),
        ControlCommand::WaterRoughness(roughness) => property.set_uniform_roughness(roughness),
        ControlCommand::WaterAbsorption(absorption) => property.set_uniform_absorption(absorption),
    }
}

/// Resource end of the control-line channel. The sending half lives on
/// whatever thread reads the pipe.
#[derive(Resource)]
pub struct ControlLines {
    receiver: Mutex<Receiver<String>>,
}

/// Creates the control-line channel; hand the sender to the reader thread
/// and insert the [`ControlLines`] resource into the app.
pub fn control_channel() -> (Sender<String>, ControlLines) {
    let (sender, receiver) = mpsc::channel();
    (
        sender,
        ControlLines {
            receiver: Mutex::new(receiver),
        },
    )
}

/// Drains and applies any control lines received since the last cycle.
pub fn drain_control_lines(
    lines: Option<Res<ControlLines>>,
    mut params: ResMut<SimParams>,
    mut property: ResMut<PropertyGrid>,
) {
    let Some(lines) = lines else {
        return;
    };
    let receiver = lines
        .receiver
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    for line in receiver.try_iter() {
        match parse_line(&line) {
            Ok(Some(command)) => apply_command(&command, &mut params, &mut property),
            Ok(None) => {}
            Err(err) => warn!("control line '{}' skipped: {}", line.trim(), err),
        }
    }
}

pub struct ControlPlugin;

impl Plugin for ControlPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, drain_control_lines.in_set(SimulationSet::Ingest));
    }
}
