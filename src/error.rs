//! # Error Types
//!
//! Errors are split by pipeline stage. Encoding and transport errors are
//! recoverable: the pipeline records them and moves to the next render
//! strategy. Only [`PrintError`] reaches the caller.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::protocol::codepage::Codepage;
use crate::render::script::Script;
use crate::strategy::RenderStrategy;

/// A character the selected code page has no byte for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{ch:?} (U+{code_point:04X}) at index {index} is not representable in {codepage}")]
pub struct UnsupportedGlyph {
    pub ch: char,
    pub code_point: u32,
    /// Index of the character (not byte) in the transcoded text.
    pub index: usize,
    pub codepage: Codepage,
}

impl UnsupportedGlyph {
    pub fn new(ch: char, index: usize, codepage: Codepage) -> Self {
        Self {
            ch,
            code_point: ch as u32,
            index,
            codepage,
        }
    }
}

/// Raster rejected before transmission.
///
/// Once a raster block starts streaming the printer cannot be told to stop,
/// so anything taller than the configured maximum never leaves the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OversizedBitmap {
    #[error("bitmap height {height} exceeds the configured maximum of {max_height} rows")]
    TooTall { height: usize, max_height: usize },

    #[error("bitmap of {width}x{height} dots does not fit the 16-bit raster header")]
    Unrepresentable { width: usize, height: usize },
}

/// Transport-level failure. Fatal for the channel, recoverable for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Target could not be opened (missing device, unknown queue, refused).
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// Open or send did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Target accepted the connection but refused the payload.
    #[error("transport rejected payload: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Classify an I/O error raised while talking to a device.
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound
            | ErrorKind::PermissionDenied
            | ErrorKind::ConnectionRefused
            | ErrorKind::AddrNotAvailable
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => Self::Unavailable(format!("{context}: {err}")),
            ErrorKind::TimedOut => Self::Timeout {
                operation: "i/o",
                after: Duration::ZERO,
            },
            _ => Self::Rejected(format!("{context}: {err}")),
        }
    }
}

/// Receipt rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error("store name is empty")]
    MissingStoreName,

    #[error("line item {index} has an empty name")]
    BlankItemName { index: usize },

    #[error("line item {index} has negative quantity {quantity}")]
    NegativeQuantity { index: usize, quantity: Decimal },
}

/// Why one strategy did not print.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Text contains a script that a static byte table cannot order or join.
    #[error("text contains {script} script, which needs shaping")]
    ShapingRequired { script: Script },

    #[error(transparent)]
    UnsupportedGlyph(#[from] UnsupportedGlyph),

    #[error(transparent)]
    OversizedBitmap(#[from] OversizedBitmap),

    /// The raster font would draw this character as an empty box.
    #[error("no glyph for {ch:?} (U+{code_point:04X}) in the raster font")]
    MissingGlyph { ch: char, code_point: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No target is configured for the transport this strategy needs.
    #[error("no transport target bound for this strategy: {0}")]
    NoTarget(String),
}

/// One entry of the per-attempt failure history.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub strategy: RenderStrategy,
    pub reason: FailureReason,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Terminal result of a print attempt.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("no render strategy to try")]
    EmptyStrategyList,

    #[error("invalid receipt: {0}")]
    InvalidReceipt(#[from] ReceiptError),

    #[error("every render strategy failed:{}", format_history(.history))]
    ExhaustedStrategies { history: Vec<FailureRecord> },

    #[error("print cancelled before transmission:{}", format_history(.history))]
    Cancelled { history: Vec<FailureRecord> },
}

impl PrintError {
    /// Failures recorded before the attempt ended.
    pub fn history(&self) -> &[FailureRecord] {
        match self {
            Self::EmptyStrategyList | Self::InvalidReceipt(_) => &[],
            Self::ExhaustedStrategies { history } | Self::Cancelled { history } => history,
        }
    }
}

fn format_history(history: &[FailureRecord]) -> String {
    if history.is_empty() {
        return " (none tried)".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, record)| format!("\n  {}. {}", i + 1, record))
        .collect()
}

/// Top-level error for the command-line front end.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid receipt: {0}")]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::LoadError),

    #[error("receipt JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Font(#[from] crate::render::glyphs::FontError),

    #[error(transparent)]
    Oversized(#[from] OversizedBitmap),

    #[error("cannot encode: {0}")]
    Encode(String),

    #[error("printer discovery failed: {0}")]
    Discovery(#[from] TransportError),

    #[error("{0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_display_lists_every_strategy() {
        let err = PrintError::ExhaustedStrategies {
            history: vec![
                FailureRecord {
                    strategy: RenderStrategy::HostCompositor,
                    reason: TransportError::Unavailable("queue missing".into()).into(),
                },
                FailureRecord {
                    strategy: RenderStrategy::InteractiveDialog,
                    reason: FailureReason::NoTarget("no dialog surface".into()),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("1. host-compositor: transport unavailable: queue missing"));
        assert!(text.contains("2. interactive-dialog"));
        assert_eq!(err.history().len(), 2);
    }

    #[test]
    fn test_io_classification() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert!(matches!(
            TransportError::from_io("/dev/ttyUSB9", &missing),
            TransportError::Unavailable(_)
        ));

        let pipe = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(matches!(
            TransportError::from_io("socket", &pipe),
            TransportError::Rejected(_)
        ));
    }

    #[test]
    fn test_unsupported_glyph_message() {
        let err = UnsupportedGlyph::new('店', 6, Codepage::PC437);
        assert_eq!(err.code_point, 0x5E97);
        assert!(err.to_string().contains("U+5E97"));
        assert!(err.to_string().contains("PC437"));
    }
}
