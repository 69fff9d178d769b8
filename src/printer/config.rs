//! # Printer Configuration
//!
//! Hardware profile of the target printer: paper width in dots, font-A
//! character columns, and resolution.
//!
//! ## Supported Paper Widths
//!
//! | Paper | Print width (dots) | Columns (font A) | Resolution |
//! |-------|--------------------|------------------|------------|
//! | 58mm  | 384                | 32               | 203 DPI    |
//! | 80mm  | 576                | 48               | 203 DPI    |
//!
//! ## Usage
//!
//! ```
//! use rasid::printer::PrinterConfig;
//!
//! let config = PrinterConfig::PAPER_80MM;
//! assert_eq!(config.width_bytes(), 72);
//! ```

use serde::{Deserialize, Serialize};

/// Paper roll width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperWidth {
    #[serde(rename = "58mm", alias = "58")]
    Mm58,
    #[default]
    #[serde(rename = "80mm", alias = "80")]
    Mm80,
}

/// # Printer Configuration
///
/// ## Calculations
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// For 80mm paper:
///   dots_per_mm = 203 / 25.4 ≈ 8
///   width_mm = 576 / 8 = 72mm printable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterConfig {
    pub name: &'static str,

    /// Maximum print width in dots (pixels)
    pub width_dots: u16,

    /// Characters per line in the default 12x24 font
    pub columns: usize,

    /// Resolution in dots per inch
    pub dpi: u16,
}

impl PrinterConfig {
    /// ```text
    /// ├─ 3mm ─┼──── 48mm printable ────┼─ 3mm ─┤
    /// │       │        384 dots        │       │
    /// ```
    pub const PAPER_58MM: Self = Self {
        name: "58mm",
        width_dots: 384,
        columns: 32,
        dpi: 203,
    };

    /// ```text
    /// ├── 4mm ──┼────── 72mm printable ──────┼── 4mm ──┤
    /// │ margin  │         576 dots           │ margin  │
    /// ```
    pub const PAPER_80MM: Self = Self {
        name: "80mm",
        width_dots: 576,
        columns: 48,
        dpi: 203,
    };

    pub fn for_paper(paper: PaperWidth) -> Self {
        match paper {
            PaperWidth::Mm58 => Self::PAPER_58MM,
            PaperWidth::Mm80 => Self::PAPER_80MM,
        }
    }

    /// Print width in bytes (8 dots each).
    #[inline]
    pub fn width_bytes(&self) -> u16 {
        self.width_dots.div_ceil(8)
    }

    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Convert a font size in points to pixels at this resolution.
    ///
    /// ```
    /// use rasid::printer::PrinterConfig;
    ///
    /// assert_eq!(PrinterConfig::PAPER_80MM.pt_to_px(10.0), 28);
    /// ```
    #[inline]
    pub fn pt_to_px(&self, pt: f32) -> u32 {
        (pt * self.dpi as f32 / 72.0).round().max(1.0) as u32
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::PAPER_80MM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_widths() {
        assert_eq!(PrinterConfig::for_paper(PaperWidth::Mm58).width_bytes(), 48);
        assert_eq!(PrinterConfig::for_paper(PaperWidth::Mm80).width_bytes(), 72);
        assert_eq!(PrinterConfig::default().columns, 48);
    }

    #[test]
    fn test_dots_per_mm() {
        assert!((PrinterConfig::PAPER_80MM.dots_per_mm() - 8.0).abs() < 0.1);
    }

    #[test]
    fn test_paper_width_serde() {
        let paper: PaperWidth = serde_json::from_str("\"58mm\"").unwrap();
        assert_eq!(paper, PaperWidth::Mm58);
        assert_eq!(serde_json::to_string(&PaperWidth::Mm80).unwrap(), "\"80mm\"");
    }
}
