use serde::{Deserialize, Serialize};

use crate::protocol::CONTROL_BYTE;

/// An RGB color as it should appear on the strip.
///
/// Values are trusted as-is (brightness correction is the producer's job);
/// only wire clamping is applied when the color is transmitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

/// One LED of the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub color: Color,
}

impl Pixel {
    pub const fn new(color: Color) -> Self {
        Pixel { color }
    }

    /// RGB triplet with every component clamped to 0-254 so it can never
    /// be mistaken for the control byte.
    pub fn clamped_triplet(&self) -> [u8; 3] {
        [clamp(self.color.r), clamp(self.color.g), clamp(self.color.b)]
    }
}

impl From<Color> for Pixel {
    fn from(color: Color) -> Self {
        Pixel { color }
    }
}

/// Clamp a color component below the control byte.
pub fn clamp(value: u8) -> u8 {
    value.min(CONTROL_BYTE - 1)
}
