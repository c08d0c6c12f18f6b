//! Cleaner configuration

use anyhow::{Context, Result};
use cleaner_lib::EngineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Cleaner configuration, read from unprefixed environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct CleanerConfig {
    /// Node to cordon during eviction (`NODE_NAME`, from the downward API)
    #[serde(default)]
    pub node_name: Option<String>,

    /// Path whose filesystem is monitored (`PATH_TO_CHECK`)
    #[serde(default = "default_path_to_check")]
    pub path_to_check: PathBuf,

    /// Seconds to wait after each removal (`IMAGE_GC_DELAY`)
    #[serde(default = "default_gc_delay")]
    pub image_gc_delay: f64,

    /// Usage percentage below which a pass stops (`IMAGE_GC_THRESHOLD_LOW`)
    #[serde(default = "default_gc_low")]
    pub image_gc_threshold_low: f64,

    /// Usage percentage at which a pass starts (`IMAGE_GC_THRESHOLD_HIGH`)
    #[serde(default = "default_gc_high")]
    pub image_gc_threshold_high: f64,
}

fn default_path_to_check() -> PathBuf {
    PathBuf::from("/var/lib/docker")
}

fn default_gc_delay() -> f64 {
    1.0
}

fn default_gc_low() -> f64 {
    60.0
}

fn default_gc_high() -> f64 {
    80.0
}

impl CleanerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::default())
    }

    fn from_env(source: config::Environment) -> Result<Self> {
        let mut config: CleanerConfig = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        // The downward API yields an empty string when the field is missing
        config.node_name = config
            .node_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        config.engine_config()?;
        Ok(config)
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let delete_delay = Duration::try_from_secs_f64(self.image_gc_delay).with_context(|| {
            format!(
                "IMAGE_GC_DELAY must be a non-negative number of seconds, got {}",
                self.image_gc_delay
            )
        })?;

        let engine = EngineConfig {
            gc_high: self.image_gc_threshold_high,
            gc_low: self.image_gc_threshold_low,
            delete_delay,
            ..EngineConfig::default()
        };
        engine.validate()?;
        Ok(engine)
    }
}
