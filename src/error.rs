use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the strip, its playback loop and the data collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A strip was created with zero pixels.
    #[error("number of pixels cannot be zero")]
    NoPixels,

    /// A mutating call was issued while an animation is playing or paused.
    #[error("led strip is busy playing an animation")]
    Busy,

    /// The sequential write cursor already reached the end of the strip.
    #[error("range error: trying to set pixel at position {position}, allowed range is [0-{max}]")]
    Range { position: usize, max: usize },

    /// An explicit position lies outside the strip.
    #[error("position {position} is outside of the strip ({pixel_count} pixels)")]
    OutOfRange { position: usize, pixel_count: usize },

    #[error("nothing to render, the buffer is empty")]
    EmptyBuffer,

    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid animation record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export line {line}: {message}")]
    Export { line: usize, message: String },

    #[error("{}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
