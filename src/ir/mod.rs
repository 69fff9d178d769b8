//! # Intermediate Representation (IR)
//!
//! The IR is a "bytecode" between laid-out receipt blocks and raw ESC/POS
//! bytes. Every render strategy that talks to the printer directly builds a
//! [`Program`]; only [`codegen`] knows the wire format.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────┐     ┌──────────┐
//! │   Blocks    │ ──► │     IR      │ ──► │ Optimizer │ ──► │ Codegen  │
//! │  (layout)   │     │  (Program)  │     │           │     │ (bytes)  │
//! └─────────────┘     └─────────────┘     └───────────┘     └──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use rasid::ir::{Alignment, CutMode, Program, ProtocolCommand};
//!
//! let mut program = Program::with_init();
//! program.push(ProtocolCommand::SetCodepage(0));
//! program.push(ProtocolCommand::SetAlign(Alignment::Center));
//! program.push(ProtocolCommand::Text(b"HELLO".to_vec()));
//! program.push(ProtocolCommand::LineFeed);
//! program.push(ProtocolCommand::Cut(CutMode::Full));
//!
//! let bytes = program.optimize().to_bytes();
//! assert!(bytes.starts_with(&[0x1B, 0x40]));
//! assert!(bytes.ends_with(&[0x1D, 0x56, 0x00]));
//! ```

pub mod codegen;
mod ops;
mod optimize;

pub use codegen::{RASTER_CHUNK_ROWS, encode};
pub use ops::*;
