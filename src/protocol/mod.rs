//! # ESC/POS Protocol
//!
//! Low-level command builders for ESC/POS thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Init, alignment, emphasis, code page, feed, cut, raster
//! - [`codepage`]: Unicode to single-byte table transcoding
//! - [`cp437`]: The built-in PC437 table
//! - [`parse`]: Decoder for emitted byte streams
//!
//! ## Usage Example
//!
//! ```
//! use rasid::protocol::codepage::{self, Codepage};
//! use rasid::protocol::commands::{self, Alignment, CutMode};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(commands::codepage(Codepage::PC437.slot()));
//! data.extend(commands::align(Alignment::Center));
//! data.extend(codepage::transcode("RECEIPT", Codepage::PC437).unwrap());
//! data.push(commands::LF);
//! data.extend(commands::cut(CutMode::Full));
//! ```

pub mod codepage;
pub mod commands;
pub mod cp437;
pub mod parse;
