use anyhow::ensure;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use tracing::{error, info};

use tread_drive::DriveConfig;

use crate::teleop::ScriptedCommand;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physics step size (s).
    pub step_size: f64,
    /// Simulated run length (s).
    pub duration: f64,
    /// Pace steps to the wall clock. When off, the loop runs as fast as it can.
    pub realtime: bool,
    /// Skip the window and log the final pose instead.
    pub headless: bool,
    pub topic_capacity: usize,
    /// Bodies present in the world at start.
    pub bodies: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            step_size: 0.01,
            duration: 10.0,
            realtime: true,
            headless: false,
            topic_capacity: 16,
            bodies: vec!["base".to_string()],
        }
    }
}

impl SimConfig {
    /// Rejects step sizes the clock cannot advance with or turn into a
    /// `Duration`.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.step_size.is_finite() && self.step_size > 0.0,
            "sim.step_size must be finite and positive, got {}",
            self.step_size
        );
        ensure!(!self.duration.is_nan(), "sim.duration must be a number");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    pub commands: Vec<ScriptedCommand>,
}

impl TeleopConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for cmd in &self.commands {
            ensure!(cmd.at.is_finite(), "teleop command time must be finite, got {}", cmd.at);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sim: SimConfig,
    pub drive: DriveConfig,
    pub teleop: TeleopConfig,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.sim.validate()?;
        self.teleop.validate()
    }
}

/// Loads settings from `path` (optional) overlaid with `TREAD__*`
/// environment variables, e.g. `TREAD__DRIVE__SPEED_FACTOR=2`.
pub fn load_config(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let builder = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("TREAD")
                .separator("__")
                .try_parsing(true),
        );

    match build(builder) {
        Ok(settings) => {
            info!(?settings, "Successfully loaded configuration");
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    builder.build()?.try_deserialize()
}
