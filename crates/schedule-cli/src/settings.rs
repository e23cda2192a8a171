use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File};
use schedule_engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Load settings from an optional TOML/JSON file, then `SCHEDULE_*`
    /// environment variables, which take precedence.
    ///
    /// Nested keys use a double underscore:
    /// `SCHEDULE_ENGINE__TIMEZONE=Asia/Kolkata`, `SCHEDULE_LOGGING__LEVEL=debug`.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be read or a value fails to
    /// deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().set_default("logging.level", "warn")?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        Ok(builder
            .add_source(
                Environment::with_prefix("SCHEDULE")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }
}
