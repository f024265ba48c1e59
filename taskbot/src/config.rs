use anyhow::Context;
use log::{LevelFilter, warn};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Optional settings file, relative to the working directory.
pub const CONFIG_FILE: &str = "taskbot/config";
pub const DEFAULT_PORT: u16 = 8080;
pub const TASKS_FILE: &str = "tasks.json";
pub const GUILD_CONFIGS_FILE: &str = "config.json";

/// Runtime settings of the bot.
///
/// Read from [`CONFIG_FILE`] if present, then from environment variables
/// (`DISCORD_TOKEN`, `PORT`, `DATA_DIR`, `LOG_LEVEL`), which take precedence.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord_token: String,
    #[serde(default = "default_port", deserialize_with = "lenient_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::File::with_name(CONFIG_FILE).required(false))
                .add_source(config::Environment::default()),
        )
    }

    pub(crate) fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        let settings = builder.build()?;
        settings
            .try_deserialize()
            .context("Invalid configuration (is DISCORD_TOKEN set?)")
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    pub fn guild_configs_path(&self) -> PathBuf {
        self.data_dir.join(GUILD_CONFIGS_FILE)
    }

    /// Level for the crate's own log output; unrecognised values mean `info`.
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Accepts a port as a number or a string; anything unusable becomes [`DEFAULT_PORT`].
fn lenient_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(i64),
        Text(String),
    }

    let port = match RawPort::deserialize(deserializer)? {
        RawPort::Number(number) => u16::try_from(number).ok(),
        RawPort::Text(text) => text.trim().parse().ok(),
    };
    Ok(port.unwrap_or_else(|| {
        warn!("Invalid port, falling back to {}", DEFAULT_PORT);
        DEFAULT_PORT
    }))
}
