//! # Rasid - Receipt Printing for ESC/POS Thermal Printers
//!
//! Rasid prints retail receipts on ESC/POS thermal printers, including
//! receipts in scripts that a printer's built-in code pages cannot show
//! (Arabic needs joining and right-to-left ordering). It provides:
//!
//! - **Receipt model**: validated receipts with exact decimal amounts
//! - **Render strategies**: direct text, host-rendered raster, the system
//!   spooler and an interactive dialog, tried in order until one prints
//! - **Protocol implementation**: an ESC/POS command IR, optimizer and codegen
//! - **Transport**: serial ports, raw TCP, CUPS queues and print dialogs,
//!   serialized per printer
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rasid::{Pipeline, Receipt, SystemConnector, TransportTarget};
//!
//! # async fn demo() -> Result<(), rasid::PrintError> {
//! let pipeline = Pipeline::new(Arc::new(SystemConnector::default()));
//! let target = TransportTarget::SerialPort {
//!     path: "/dev/ttyUSB0".into(),
//!     baud: 9600,
//! };
//!
//! let outcome = pipeline.print(&Receipt::sample_arabic(), &target).await?;
//! println!("printed with {} ({} bytes)", outcome.strategy, outcome.bytes_sent);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`receipt`] | Receipt model and block layout |
//! | [`strategy`] | Render strategies and selection |
//! | [`pipeline`] | One print attempt with fallback |
//! | [`ir`] | ESC/POS command IR and codegen |
//! | [`protocol`] | Code pages and the wire parser |
//! | [`render`] | Shaping, glyphs, rasterizing and packing |
//! | [`transport`] | Channels to printers |
//! | [`discovery`] | Receipt printer name heuristics |
//! | [`config`] | Layered settings and CLI arguments |
//! | [`error`] | Error types |

pub mod config;
pub mod discovery;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod render;
pub mod strategy;
pub mod telemetry;
pub mod transport;

// Re-exports for convenience
pub use error::{Error, FailureReason, FailureRecord, PrintError, TransportError};
pub use pipeline::{Pipeline, PrintOutcome};
pub use printer::PrinterConfig;
pub use receipt::{LineItem, Receipt, ReceiptBuilder};
pub use strategy::RenderStrategy;
pub use transport::{SystemConnector, TransportTarget};
