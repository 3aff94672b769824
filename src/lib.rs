//! Control a BlinkyTape LED strip over serial.
//!
//! Pixel writes are buffered and sent to the strip as one frame on
//! [`BlinkyTape::render`]. Multi-frame [`Animation`]s play on a background
//! thread and can be paused, resumed and stopped from the foreground.

pub mod animation;
pub mod countdown;
pub mod error;
pub mod export;
pub mod pixel;
pub mod playback;
pub mod protocol;
pub mod raster;
pub mod render;
pub mod strip;
pub mod transport;

pub use animation::{Animation, AnimationConfig, Frame, Pattern, DEFAULT_DELAY};
pub use error::{Error, Result};
pub use pixel::{Color, Pixel};
pub use playback::{PlaybackController, Status};
pub use render::RenderState;
pub use strip::BlinkyTape;
pub use transport::{SerialTransport, Transport};
