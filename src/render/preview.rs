//! PNG previews of what the printer would receive.

use std::path::Path;

use image::{GrayImage, Luma};

use super::pack::PackedRaster;
use super::rasterize::{Bitmap, INK, PAPER};

/// Grayscale bitmap as an image.
pub fn to_image(bitmap: &Bitmap) -> GrayImage {
    GrayImage::from_fn(bitmap.width as u32, bitmap.height as u32, |x, y| {
        Luma([bitmap.get(x as usize, y as usize).unwrap_or(PAPER)])
    })
}

/// Packed raster as a black and white image, exactly as the print head
/// would burn it.
pub fn raster_to_image(raster: &PackedRaster) -> GrayImage {
    GrayImage::from_fn(raster.width_dots() as u32, raster.height() as u32, |x, y| {
        Luma([if raster.is_ink(x as usize, y as usize) {
            INK
        } else {
            PAPER
        }])
    })
}

pub fn save_png(image: &GrayImage, path: &Path) -> Result<(), image::ImageError> {
    image.save_with_format(path, image::ImageFormat::Png)
}
