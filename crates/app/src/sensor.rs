//! Synthetic depth camera.
//!
//! Stands in for real sensor hardware: a fractal-noise base terrain plus
//! per-frame jitter and random dropouts, fed through the depth stabilizer at
//! the camera's own rate. The stabilizer owns the sending half of the frame
//! link, so the simulation thread only ever sees converged terrain.

use std::fmt;
use std::io;
use std::thread;
use std::time::Duration;

use bevy::log::info;
use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use simulation::config::{GRID_HEIGHT, GRID_WIDTH};
use simulation::handoff::FrameSender;
use simulation::stabilizer::{DepthStabilizer, StabilizedFrame, StabilizerParams};

pub struct SensorConfig {
    pub seed: u64,
    /// Raw frames per second.
    pub frame_rate: f32,
    /// Half-width of the uniform per-sample jitter (cm).
    pub noise_amplitude: f32,
    /// Probability that any one sample comes back invalid.
    pub dropout_chance: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            frame_rate: 30.0,
            noise_amplitude: 0.15,
            dropout_chance: 0.02,
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    variable: &'static str,
    value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}' is not a valid number", self.variable, self.value)
    }
}

fn parse_env<T: std::str::FromStr>(variable: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(variable) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError { variable, value }),
        Err(_) => Ok(None),
    }
}

impl SensorConfig {
    /// Reads overrides from `SANDTABLE_SEED`, `SANDTABLE_SENSOR_RATE`, and
    /// `SANDTABLE_SENSOR_NOISE`. Unparseable values are fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(seed) = parse_env::<u64>("SANDTABLE_SEED")? {
            config.seed = seed;
        }
        if let Some(rate) = parse_env::<f32>("SANDTABLE_SENSOR_RATE")? {
            config.frame_rate = rate.clamp(1.0, 120.0);
        }
        if let Some(amplitude) = parse_env::<f32>("SANDTABLE_SENSOR_NOISE")? {
            config.noise_amplitude = amplitude.max(0.0);
        }
        Ok(config)
    }
}

pub fn spawn_sensor_thread(
    config: SensorConfig,
    sender: FrameSender<StabilizedFrame>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("sensor".to_string())
        .spawn(move || run(config, sender))
}

fn base_terrain(seed: u64) -> Vec<f32> {
    let mut noise = FastNoiseLite::with_seed(seed as i32);
    noise.set_noise_type(Some(NoiseType::Perlin));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(4));
    noise.set_frequency(Some(0.02));

    let mut terrain = Vec::with_capacity(GRID_WIDTH * GRID_HEIGHT);
    for y in 0..GRID_HEIGHT {
        for x in 0..GRID_WIDTH {
            // Noise is in [-1, 1]; scale to a sandbox-plausible relief.
            terrain.push(noise.get_noise_2d(x as f32, y as f32) * 30.0);
        }
    }
    terrain
}

fn run(config: SensorConfig, sender: FrameSender<StabilizedFrame>) {
    info!(
        "sensor thread up: {}x{} at {} Hz, seed {}",
        GRID_WIDTH, GRID_HEIGHT, config.frame_rate, config.seed
    );

    let terrain = base_terrain(config.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut stabilizer =
        DepthStabilizer::new(GRID_WIDTH, GRID_HEIGHT, StabilizerParams::default(), sender);

    let period = Duration::from_secs_f32(1.0 / config.frame_rate);
    let mut samples = vec![0.0_f32; terrain.len()];
    let mut validity = vec![true; terrain.len()];
    loop {
        for (i, &base) in terrain.iter().enumerate() {
            validity[i] = rng.gen::<f32>() >= config.dropout_chance;
            if validity[i] {
                let jitter = if config.noise_amplitude > 0.0 {
                    rng.gen_range(-config.noise_amplitude..=config.noise_amplitude)
                } else {
                    0.0
                };
                samples[i] = base + jitter;
            }
        }
        stabilizer.ingest_frame(&samples, &validity);
        thread::sleep(period);
    }
}
