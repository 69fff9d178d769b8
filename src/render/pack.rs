//! # Bitmap Packer & Safety Guard
//!
//! Converts a grayscale [`Bitmap`] to the 1-bit layout `GS v 0` expects:
//!
//! - pixels darker than [`THRESHOLD`] are ink (bit = 1)
//! - 8 pixels per byte, most significant bit = leftmost pixel
//! - rows padded to a whole byte, row-major
//!
//! Anything taller than the configured maximum is rejected before a single
//! byte is produced. Once a raster block streams to the printer it cannot be
//! stopped, and a runaway height feeds paper until the roll ends.

use crate::error::OversizedBitmap;

use super::rasterize::Bitmap;

/// Luminance boundary: `< THRESHOLD` is ink.
pub const THRESHOLD: u8 = 128;

/// Packed 1-bit raster. `bits.len() == width_bytes * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRaster {
    width_bytes: u16,
    height: u16,
    bits: Vec<u8>,
}

impl PackedRaster {
    /// Wrap pre-packed data. `None` if the length does not match.
    pub fn from_bits(width_bytes: u16, height: u16, bits: Vec<u8>) -> Option<Self> {
        (bits.len() == width_bytes as usize * height as usize).then_some(Self {
            width_bytes,
            height,
            bits,
        })
    }

    pub fn width_bytes(&self) -> u16 {
        self.width_bytes
    }

    /// Width in dots, including row padding.
    pub fn width_dots(&self) -> usize {
        self.width_bytes as usize * 8
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Whether the dot at (x, y) is ink.
    pub fn is_ink(&self, x: usize, y: usize) -> bool {
        let stride = self.width_bytes as usize;
        self.bits
            .get(y * stride + x / 8)
            .is_some_and(|byte| byte & (0x80 >> (x % 8)) != 0)
    }
}

/// Threshold and pack `bitmap`, rejecting it if taller than `max_height`.
pub fn pack(bitmap: &Bitmap, max_height: usize) -> Result<PackedRaster, OversizedBitmap> {
    if bitmap.height > max_height {
        tracing::warn!(
            height = bitmap.height,
            max_height,
            "raster rejected before transmission: exceeds maximum height"
        );
        return Err(OversizedBitmap::TooTall {
            height: bitmap.height,
            max_height,
        });
    }

    let stride = bitmap.width.div_ceil(8);
    let (Ok(width_bytes), Ok(height)) = (u16::try_from(stride), u16::try_from(bitmap.height))
    else {
        tracing::warn!(
            width = bitmap.width,
            height = bitmap.height,
            "raster rejected before transmission: dimensions exceed header fields"
        );
        return Err(OversizedBitmap::Unrepresentable {
            width: bitmap.width,
            height: bitmap.height,
        });
    };

    let mut bits = vec![0u8; stride * bitmap.height];
    for y in 0..bitmap.height {
        let row = &bitmap.rows[y * bitmap.width..(y + 1) * bitmap.width];
        for (x, &luma) in row.iter().enumerate() {
            if luma < THRESHOLD {
                bits[y * stride + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    Ok(PackedRaster {
        width_bytes,
        height,
        bits,
    })
}
