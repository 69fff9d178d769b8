//! # Code Generation
//!
//! Converts IR programs to ESC/POS bytes.

use super::ops::{Program, ProtocolCommand};
use crate::protocol::commands;

/// Tallest raster block sent in one `GS v 0` command.
///
/// Larger images are split so a single header never has to describe more
/// rows than the printer buffers comfortably.
pub const RASTER_CHUNK_ROWS: usize = 256;

/// Serialize commands to device bytes. Deterministic and stateless.
pub fn encode(commands: &[ProtocolCommand]) -> Vec<u8> {
    let mut out = Vec::new();

    for command in commands {
        match command {
            ProtocolCommand::Init => out.extend(commands::init()),
            ProtocolCommand::SetAlign(alignment) => out.extend(commands::align(*alignment)),
            ProtocolCommand::SetBold(enabled) => out.extend(commands::bold(*enabled)),
            ProtocolCommand::SetCodepage(slot) => out.extend(commands::codepage(*slot)),
            ProtocolCommand::Text(bytes) => out.extend_from_slice(bytes),
            ProtocolCommand::LineFeed => out.push(commands::LF),
            ProtocolCommand::Feed(lines) => out.extend(commands::feed_lines(*lines)),
            ProtocolCommand::Cut(mode) => out.extend(commands::cut(*mode)),
            ProtocolCommand::RasterImage(raster) => {
                let width_bytes = raster.width_bytes();
                let stride = width_bytes as usize;
                if stride == 0 {
                    continue;
                }

                // PackedRaster guarantees bits.len() == width_bytes * height,
                // and every chunk below inherits that.
                debug_assert_eq!(raster.bits().len(), stride * raster.height() as usize);

                for chunk in raster.bits().chunks(stride * RASTER_CHUNK_ROWS) {
                    let rows = (chunk.len() / stride) as u16;
                    out.extend(commands::raster(width_bytes, rows, chunk));
                }
            }
        }
    }

    out
}

impl Program {
    /// Compile to ESC/POS bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Alignment, CutMode};
    use crate::protocol::parse::{Parsed, parse};
    use crate::render::pack::PackedRaster;
    use pretty_assertions::assert_eq;

    fn raster(width_bytes: u16, height: u16) -> PackedRaster {
        let bits = (0..width_bytes as usize * height as usize)
            .map(|i| (i % 251) as u8)
            .collect();
        PackedRaster::from_bits(width_bytes, height, bits).unwrap()
    }

    #[test]
    fn test_empty_program() {
        assert!(Program::new().to_bytes().is_empty());
    }

    #[test]
    fn test_init_only() {
        assert_eq!(Program::with_init().to_bytes(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_text_line() {
        let mut program = Program::with_init();
        program.push(ProtocolCommand::SetCodepage(0));
        program.push(ProtocolCommand::Text(b"Hello".to_vec()));
        program.push(ProtocolCommand::LineFeed);

        assert_eq!(
            program.to_bytes(),
            vec![0x1B, 0x40, 0x1B, 0x74, 0x00, b'H', b'e', b'l', b'l', b'o', 0x0A]
        );
    }

    #[test]
    fn test_styles_precede_their_text() {
        let program: Program = [
            ProtocolCommand::SetAlign(Alignment::Center),
            ProtocolCommand::SetBold(true),
            ProtocolCommand::Text(b"HEADER".to_vec()),
            ProtocolCommand::LineFeed,
            ProtocolCommand::SetBold(false),
        ]
        .into_iter()
        .collect();

        let bytes = program.to_bytes();
        assert_eq!(&bytes[..6], &[0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01]);
        assert!(bytes.ends_with(&[0x0A, 0x1B, 0x45, 0x00]));
    }

    #[test]
    fn test_feed_and_cut() {
        let program: Program = [ProtocolCommand::Feed(3), ProtocolCommand::Cut(CutMode::Partial)]
            .into_iter()
            .collect();
        assert_eq!(program.to_bytes(), vec![0x1B, 0x64, 3, 0x1D, 0x56, 1]);
    }

    #[test]
    fn test_small_raster_single_block() {
        let program: Program = [ProtocolCommand::RasterImage(raster(2, 3))]
            .into_iter()
            .collect();
        let bytes = program.to_bytes();
        assert_eq!(&bytes[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 3, 0]);
        assert_eq!(bytes.len(), 8 + 6);
    }

    #[test]
    fn test_tall_raster_is_chunked() {
        let image = raster(72, 600);
        let expected_bits = image.bits().to_vec();
        let program: Program = [ProtocolCommand::RasterImage(image)].into_iter().collect();

        let parsed = parse(&program.to_bytes()).unwrap();
        let heights: Vec<u16> = parsed
            .iter()
            .filter_map(|p| match p {
                Parsed::Raster { height, .. } => Some(*height),
                _ => None,
            })
            .collect();
        assert_eq!(heights, vec![256, 256, 88]);

        let joined: Vec<u8> = parsed
            .iter()
            .filter_map(|p| match p {
                Parsed::Raster { data, .. } => Some(data.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(joined, expected_bits);
    }

    #[test]
    fn test_exact_chunk_multiple() {
        let program: Program = [ProtocolCommand::RasterImage(raster(1, 512))]
            .into_iter()
            .collect();
        let parsed = parse(&program.to_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
