use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pixel::Pixel;

/// Delay between two frames when an animation has no speed.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(75);

/// One lighting state for the whole strip.
pub type Frame = Vec<Pixel>;

/// Frames in playback order.
pub type Pattern = Vec<Frame>;

/// A pattern played at a given speed for a number of repetitions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Animation {
    pub name: String,
    /// Negative repeats forever, zero plays nothing.
    pub repeat: i64,
    /// Frames per second, zero means [`DEFAULT_DELAY`].
    pub speed: u32,
    pub pattern: Pattern,
}

/// Play-time override of an animation's repeat count and frame delay.
/// Replaces both values, it is not merged with the animation's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationConfig {
    pub repeat: i64,
    pub delay: Duration,
}

impl Animation {
    /// Frame delay derived from the animation speed.
    pub fn delay(&self) -> Duration {
        if self.speed == 0 {
            DEFAULT_DELAY
        } else {
            Duration::from_secs(1) / self.speed
        }
    }

    /// Effective repeat count and delay for a play call.
    pub fn resolve(&self, config: Option<AnimationConfig>) -> AnimationConfig {
        config.unwrap_or(AnimationConfig {
            repeat: self.repeat,
            delay: self.delay(),
        })
    }

    /// Read an animation record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the animation as a JSON record.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_vec(self)?;
        fs::write(path, data).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
