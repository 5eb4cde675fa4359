use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};
use vela_drive::RobotIdentity;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Runtime settings loaded from `config/default.toml`.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Which physical robot this program is running on.
    pub robot: RobotIdentity,
    /// Control loop period in seconds.
    pub loop_period: f64,
    /// How long the scripted demo drives, in seconds.
    pub run_duration: f64,
}

pub fn load_config() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
