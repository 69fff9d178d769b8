//! # Printer Module
//!
//! - [`config`]: Paper width and resolution profiles

pub mod config;

pub use config::{PaperWidth, PrinterConfig};
