//! Build a pattern from a raster image.
//!
//! Every image column becomes one frame and every row one pixel, top row
//! first. Images taller than the strip are scaled down to the strip length,
//! keeping their aspect ratio.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use log::debug;

use crate::animation::Pattern;
use crate::error::{Error, Result};
use crate::pixel::{Color, Pixel};

/// Decode an image file (PNG, JPEG, GIF, BMP, ...) into a pattern for a strip
/// of `pixel_count` pixels.
pub fn load(path: impl AsRef<Path>, pixel_count: usize) -> Result<Pattern> {
    if pixel_count == 0 {
        return Err(Error::NoPixels);
    }
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    from_image(&image, pixel_count)
}

/// Turn a decoded image into a pattern. Frames are always `pixel_count` long;
/// pixels below the image stay black.
pub fn from_image(image: &DynamicImage, pixel_count: usize) -> Result<Pattern> {
    if pixel_count == 0 {
        return Err(Error::NoPixels);
    }

    let (width, height) = image.dimensions();
    let scaled;
    let image = if height as usize > pixel_count {
        // height > pixel_count, so pixel_count fits in u32
        let target = pixel_count as u32;
        let columns = (u64::from(width) * u64::from(target) + u64::from(height) / 2)
            / u64::from(height);
        let columns = columns.max(1) as u32;
        debug!("scaling {}x{} image to {}x{}", width, height, columns, target);
        scaled = image.resize_exact(columns, target, FilterType::Triangle);
        &scaled
    } else {
        image
    };

    let rgb = image.to_rgb8();
    let pattern = (0..rgb.width())
        .map(|x| {
            let mut frame = vec![Pixel::default(); pixel_count];
            for (y, slot) in frame.iter_mut().take(rgb.height() as usize).enumerate() {
                let [r, g, b] = rgb.get_pixel(x, y as u32).0;
                *slot = Pixel::new(Color::new(r, g, b));
            }
            frame
        })
        .collect();
    Ok(pattern)
}
