use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Device configuration for the command-line player.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Serial port the strip is attached to (e.g. /dev/ttyACM0)
    pub port: String,
    /// Number of LEDs on the strip
    pub pixel_count: usize,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        if config.pixel_count == 0 {
            anyhow::bail!("pixel_count must be greater than zero");
        }
        Ok(config)
    }
}
