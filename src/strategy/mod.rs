//! # Render Strategies
//!
//! A receipt can reach paper in several ways, each with its own blind spot:
//!
//! | Strategy | Output | Fails when |
//! |----------|--------|------------|
//! | [`RenderStrategy::DirectText`] | ESC/POS text in a code page | a character has no byte, or the script needs shaping |
//! | [`RenderStrategy::RasterBitmap`] | ESC/POS raster of the rendered receipt | the bitmap is taller than allowed |
//! | [`RenderStrategy::HostCompositor`] | Unicode document for the system spooler | no spooler queue |
//! | [`RenderStrategy::InteractiveDialog`] | Unicode document for a print dialog | no dialog surface |
//!
//! Callers give an ordered list; [`select`] walks it one failure at a time.

pub mod build;

use std::fmt;
use std::str::FromStr;

use crate::error::{FailureReason, FailureRecord};
use crate::protocol::codepage::Codepage;
use crate::receipt::Receipt;
use crate::render::script::Script;

pub use build::{BuildOptions, build_payload};

/// Default raster font size.
pub const DEFAULT_FONT_SIZE_PT: f32 = 10.0;

/// Default raster height limit, about 50 cm of paper at 203 dpi.
pub const DEFAULT_MAX_HEIGHT: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderStrategy {
    /// Transcode text into a single-byte code page.
    DirectText(Codepage),
    /// Render on the host and upload a 1-bit image.
    RasterBitmap { font_size_pt: f32, max_height: usize },
    /// Hand a Unicode document to the system spooler.
    HostCompositor,
    /// Show the host's print dialog.
    InteractiveDialog,
}

impl RenderStrategy {
    /// `DirectText(CP437)`, `RasterBitmap`, `HostCompositor`, `InteractiveDialog`.
    pub fn defaults() -> Vec<RenderStrategy> {
        vec![
            RenderStrategy::DirectText(Codepage::PC437),
            RenderStrategy::raster(),
            RenderStrategy::HostCompositor,
            RenderStrategy::InteractiveDialog,
        ]
    }

    /// Raster at the default size and height limit.
    pub fn raster() -> Self {
        RenderStrategy::RasterBitmap {
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RenderStrategy::DirectText(_) => "direct-text",
            RenderStrategy::RasterBitmap { .. } => "raster-bitmap",
            RenderStrategy::HostCompositor => "host-compositor",
            RenderStrategy::InteractiveDialog => "interactive-dialog",
        }
    }
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStrategy::DirectText(codepage) => write!(f, "direct-text[{codepage}]"),
            RenderStrategy::RasterBitmap {
                font_size_pt,
                max_height,
            } => write!(f, "raster-bitmap[{font_size_pt}pt, max {max_height} rows]"),
            other => f.write_str(other.name()),
        }
    }
}

/// Parses strategy names with default parameters: `direct-text`,
/// `raster-bitmap`, `host-compositor`, `interactive-dialog`.
impl FromStr for RenderStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "direct-text" | "text" => Ok(RenderStrategy::DirectText(Codepage::PC437)),
            "raster-bitmap" | "raster" => Ok(RenderStrategy::raster()),
            "host-compositor" | "spooler" => Ok(RenderStrategy::HostCompositor),
            "interactive-dialog" | "dialog" => Ok(RenderStrategy::InteractiveDialog),
            other => Err(format!("unknown render strategy '{other}'")),
        }
    }
}

/// Result of one selection step.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Try(RenderStrategy),
    /// The next strategy cannot work for this receipt; record and move on.
    Skip(FailureRecord),
    Exhausted,
}

/// Pick the next strategy.
///
/// Every tried or skipped strategy leaves exactly one entry in `history`, so
/// the next candidate is `strategies[history.len()]`. `shaping` is the first
/// script in the receipt that needs shaping, if any.
pub fn select(
    strategies: &[RenderStrategy],
    history: &[FailureRecord],
    shaping: Option<Script>,
) -> Selection {
    let Some(&next) = strategies.get(history.len()) else {
        return Selection::Exhausted;
    };
    match (next, shaping) {
        (RenderStrategy::DirectText(_), Some(script)) => Selection::Skip(FailureRecord {
            strategy: next,
            reason: FailureReason::ShapingRequired { script },
        }),
        _ => Selection::Try(next),
    }
}

/// First script on `receipt` that a code page cannot express.
pub fn shaping_required(receipt: &Receipt) -> Option<Script> {
    Script::first_requiring_shaping(receipt.texts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use pretty_assertions::assert_eq;

    fn failed(strategy: RenderStrategy) -> FailureRecord {
        FailureRecord {
            strategy,
            reason: TransportError::Unavailable("x".into()).into(),
        }
    }

    #[test]
    fn test_walks_list_in_order() {
        let list = RenderStrategy::defaults();
        assert_eq!(select(&list, &[], None), Selection::Try(list[0]));
        assert_eq!(select(&list, &[failed(list[0])], None), Selection::Try(list[1]));
        let all: Vec<_> = list.iter().copied().map(failed).collect();
        assert_eq!(select(&list, &all, None), Selection::Exhausted);
    }

    #[test]
    fn test_direct_text_skipped_for_arabic() {
        let list = RenderStrategy::defaults();
        let Selection::Skip(record) = select(&list, &[], Some(Script::Arabic)) else {
            panic!("direct text should be skipped");
        };
        assert_eq!(record.strategy.name(), "direct-text");
        assert_eq!(
            record.reason,
            FailureReason::ShapingRequired {
                script: Script::Arabic
            }
        );
        // raster is still tried
        assert_eq!(
            select(&list, &[record], Some(Script::Arabic)),
            Selection::Try(RenderStrategy::raster())
        );
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(select(&[], &[], None), Selection::Exhausted);
    }

    #[test]
    fn test_shaping_required() {
        assert_eq!(shaping_required(&Receipt::sample_arabic()), Some(Script::Arabic));
        let latin = Receipt::builder("STORE").build().unwrap();
        assert_eq!(shaping_required(&latin), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("raster".parse::<RenderStrategy>().unwrap(), RenderStrategy::raster());
        assert_eq!(
            "host_compositor".parse::<RenderStrategy>().unwrap(),
            RenderStrategy::HostCompositor
        );
        assert!("fax".parse::<RenderStrategy>().is_err());
        assert_eq!(
            RenderStrategy::DirectText(Codepage::WPC1256).to_string(),
            "direct-text[WPC1256]"
        );
        assert_eq!(RenderStrategy::InteractiveDialog.to_string(), "interactive-dialog");
    }
}
