//! BlinkyTape wire format.
//!
//! A frame is a run of clamped RGB triplets in strip order followed by a
//! single control byte telling the strip to render what it received.

use crate::pixel::Pixel;

/// Byte sent to the strip to render the preceding pixel data.
pub const CONTROL_BYTE: u8 = 0xFF;

/// Bytes per pixel on the wire.
pub const BYTES_PER_PIXEL: usize = 3;

/// Append the clamped triplet of one pixel to a wire buffer.
pub fn push_pixel(buffer: &mut Vec<u8>, pixel: &Pixel) {
    buffer.extend_from_slice(&pixel.clamped_triplet());
}

/// Encode a full pixel run (without the control byte) into `buffer`.
pub fn encode_pixels(buffer: &mut Vec<u8>, pixels: &[Pixel]) {
    buffer.clear();
    buffer.reserve(pixels.len() * BYTES_PER_PIXEL + 1);
    for pixel in pixels {
        push_pixel(buffer, pixel);
    }
}

/// Hex dump used by trace logging.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
