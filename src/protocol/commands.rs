//! # ESC/POS Command Builders
//!
//! Byte builders for the small subset of ESC/POS this crate relies on.
//! Each function returns the exact bytes for one command so the encoder can
//! stay a flat `match` over [`ProtocolCommand`](crate::ir::ProtocolCommand).
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - With parameters: `ESC a n`, `GS V m`, `GS v 0 m xL xH yL yH d1...dk`
//!
//! ## Byte Order
//!
//! Multi-byte integers are **little-endian**: `u16` 0x1234 is sent as
//! `[0x34, 0x12]`.

use serde::{Deserialize, Serialize};

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix (cutter, raster)
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print buffer and advance one line
pub const LF: u8 = 0x0A;

// ============================================================================
// PARAMETER TYPES
// ============================================================================

/// Horizontal justification set by `ESC a n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// Cutter function selected by `GS V m`.
///
/// The `*Ascii` variants are the same cuts addressed with `'0'`/`'1'`;
/// some firmware only honours one of the two forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutMode {
    #[default]
    Full,
    Partial,
    FullAscii,
    PartialAscii,
}

impl CutMode {
    pub fn code(self) -> u8 {
        match self {
            CutMode::Full => 0,
            CutMode::Partial => 1,
            CutMode::FullAscii => 48,
            CutMode::PartialAscii => 49,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CutMode::Full),
            1 => Some(CutMode::Partial),
            48 => Some(CutMode::FullAscii),
            49 => Some(CutMode::PartialAscii),
            _ => None,
        }
    }
}

// ============================================================================
// PRINTER CONTROL
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// Clears the print buffer and resets alignment, emphasis and the selected
/// code page to their power-on values.
///
/// ```
/// use rasid::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// - `n = 0`: left, `n = 1`: center, `n = 2`: right
///
/// Takes effect at the start of the next line, and also positions raster
/// images printed with `GS v 0`.
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// # Emphasized Mode (ESC E n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 45 00 (off) / 1B 45 01 (on) |
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(enabled)]
}

/// # Select Character Code Table (ESC t n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 74 n |
///
/// `n` is vendor specific; see [`Codepage`](super::codepage::Codepage).
pub fn codepage(slot: u8) -> Vec<u8> {
    vec![ESC, b't', slot]
}

/// # Print and Feed n Lines (ESC d n)
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

/// # Select Cut Mode and Cut Paper (GS V m)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1D 56 m |
///
/// - `m = 0 / 48`: full cut
/// - `m = 1 / 49`: partial cut (leaves a hinge)
///
/// Printers without an auto-cutter ignore the command.
pub fn cut(mode: CutMode) -> Vec<u8> {
    vec![GS, b'V', mode.code()]
}

// ============================================================================
// RASTER GRAPHICS
// ============================================================================

/// # Raster Bit Image Header (GS v 0 m xL xH yL yH)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1D 76 30 00 xL xH yL yH |
///
/// - `x` = width in **bytes** (8 dots each)
/// - `y` = height in dots
/// - followed by exactly `x * y` data bytes, MSB = leftmost dot
///
/// The printer counts the payload from the header. A header that disagrees
/// with the data that follows makes the printer swallow (or print) the next
/// commands as pixels, so only [`raster`] writes this header.
fn raster_header(width_bytes: u16, height: u16) -> [u8; 8] {
    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);
    [GS, b'v', b'0', 0x00, xl, xh, yl, yh]
}

/// Header plus payload for one raster block.
pub fn raster(width_bytes: u16, height: u16, data: &[u8]) -> Vec<u8> {
    debug_assert_eq!(
        data.len(),
        width_bytes as usize * height as usize,
        "raster payload must be width_bytes * height bytes"
    );

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend_from_slice(&raster_header(width_bytes, height));
    cmd.extend_from_slice(data);
    cmd
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Encode a u16 as little-endian bytes.
///
/// ```
/// use rasid::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(72), [72, 0]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold(true), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), vec![0x1B, 0x45, 0x00]);
    }

    #[test]
    fn test_codepage() {
        assert_eq!(codepage(50), vec![0x1B, 0x74, 50]);
    }

    #[test]
    fn test_cut_modes() {
        assert_eq!(cut(CutMode::Full), vec![0x1D, 0x56, 0]);
        assert_eq!(cut(CutMode::Partial), vec![0x1D, 0x56, 1]);
        assert_eq!(cut(CutMode::FullAscii), vec![0x1D, 0x56, 48]);
        assert_eq!(cut(CutMode::PartialAscii), vec![0x1D, 0x56, 49]);
        for mode in [CutMode::Full, CutMode::Partial, CutMode::FullAscii, CutMode::PartialAscii] {
            assert_eq!(CutMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(CutMode::from_code(2), None);
    }

    #[test]
    fn test_raster_layout() {
        let cmd = raster(2, 3, &[0xFF; 6]);
        assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 3, 0]);
        assert_eq!(cmd.len(), 8 + 6);
    }

    #[test]
    fn test_raster_header_little_endian() {
        let cmd = raster(72, 300, &vec![0; 72 * 300]);
        assert_eq!(&cmd[4..8], &[72, 0, 0x2C, 0x01]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0xFF00), [0x00, 0xFF]);
        assert_eq!(u16_le(576), [0x40, 0x02]);
    }
}
