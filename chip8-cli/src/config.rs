//! Driver configuration, read from a YAML file.
use std::fs::File;

use chip8_vm::prelude::*;
use serde::Deserialize;

use crate::error::AppError;

/// Settings for the headless frame loop.
///
/// ```yaml
/// vm:
///   memory_size: 4096
///   rng_seed: 42
/// cycles_per_frame: 10
/// frames: 600
/// throttle: true
/// held_keys: [5]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConf {
    pub vm: Chip8Conf,
    /// Instructions executed between two timer ticks.
    pub cycles_per_frame: usize,
    /// Number of frames to run before dumping the display.
    pub frames: usize,
    /// Pace frames in real time at 60Hz, instead of running flat out.
    pub throttle: bool,
    /// Keypad keys held down for the whole run.
    pub held_keys: Vec<u8>,
}

impl Default for CliConf {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            cycles_per_frame: 10,
            frames: 600,
            throttle: false,
            held_keys: vec![],
        }
    }
}

impl CliConf {
    pub fn load(filepath: &str) -> Result<Self, AppError> {
        let file = File::open(filepath)?;
        let conf: CliConf = serde_yaml::from_reader(file)?;
        log::debug!("loaded config: {:#?}", conf);
        Ok(conf)
    }

    pub fn keys(&self) -> Result<Vec<KeyCode>, AppError> {
        self.held_keys
            .iter()
            .map(|key_id| KeyCode::try_from(*key_id).map_err(AppError::from))
            .collect()
    }
}
