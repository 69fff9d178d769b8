//! # Rendering Module
//!
//! Turns receipt text into pixels for printers that cannot shape text
//! themselves.
//!
//! ## Modules
//!
//! - [`script`]: Unicode script detection
//! - [`shaping`]: Arabic contextual forms and bidirectional reordering
//! - [`glyphs`]: process-wide glyph engine (Spleen + optional TrueType)
//! - [`rasterize`]: wrapped, shaped text to a grayscale [`Bitmap`]
//! - [`compose`]: a whole receipt laid out on one bitmap
//! - [`pack`]: 1-bit packing and the height guard
//! - [`preview`]: PNG output
//!
//! ## Usage Example
//!
//! ```
//! use rasid::render::{pack, rasterize};
//!
//! // 10 pt on an 80 mm head
//! let bitmap = rasterize("Subtotal 12.50", 576, 10.0);
//! assert_eq!(bitmap.width, 576);
//!
//! let raster = pack(&bitmap, 4000).unwrap();
//! assert_eq!(raster.bits().len(), 72 * bitmap.height);
//! ```

pub mod compose;
pub mod glyphs;
pub mod pack;
pub mod preview;
pub mod rasterize;
pub mod script;
pub mod shaping;

pub use compose::compose_receipt;
pub use pack::{PackedRaster, pack};
pub use rasterize::{Bitmap, rasterize};
pub use script::Script;
