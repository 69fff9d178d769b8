//! Turning laid-out blocks into the payload of one strategy.
//!
//! Byte strategies produce an optimized [`Program`] and encode it; document
//! strategies wrap the blocks in a [`HostDocument`]. Every failure is a
//! [`FailureReason`] so the pipeline can fall back on it directly.

use crate::error::FailureReason;
use crate::ir::{Alignment, CutMode, Program, ProtocolCommand};
use crate::printer::PrinterConfig;
use crate::protocol::codepage::{Codepage, transcode};
use crate::receipt::layout::fit_columns;
use crate::receipt::{Block, TextAlign};
use crate::render::compose::{compose_with, first_uncovered};
use crate::render::glyphs::GlyphEngine;
use crate::render::pack::pack;
use crate::transport::{Capabilities, HostDocument, Payload};

use super::RenderStrategy;

/// Output settings shared by every strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub printer: PrinterConfig,
    pub cut_mode: CutMode,
    /// Lines fed before the cut so the last line clears the cutter.
    pub feed_lines: u8,
    pub title: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            printer: PrinterConfig::default(),
            cut_mode: CutMode::Partial,
            feed_lines: 3,
            title: "receipt".to_string(),
        }
    }
}

/// Build what `strategy` sends for `blocks`.
///
/// `capabilities` are those of the target the payload is bound for; a cut is
/// only emitted when it has a cutter.
pub fn build_payload(
    strategy: &RenderStrategy,
    blocks: &[Block],
    options: &BuildOptions,
    capabilities: Capabilities,
    engine: &GlyphEngine,
) -> Result<Payload, FailureReason> {
    match *strategy {
        RenderStrategy::DirectText(codepage) => {
            let program = direct_text(blocks, codepage, options, capabilities)?;
            Ok(Payload::Raw(program.to_bytes()))
        }
        RenderStrategy::RasterBitmap {
            font_size_pt,
            max_height,
        } => {
            let program = raster(blocks, font_size_pt, max_height, options, capabilities, engine)?;
            Ok(Payload::Raw(program.to_bytes()))
        }
        RenderStrategy::HostCompositor | RenderStrategy::InteractiveDialog => {
            Ok(Payload::Document(HostDocument::new(
                options.title.clone(),
                blocks.to_vec(),
                options.printer.columns,
            )))
        }
    }
}

fn alignment(align: TextAlign) -> Alignment {
    match align {
        TextAlign::Start => Alignment::Left,
        TextAlign::Center => Alignment::Center,
        TextAlign::End => Alignment::Right,
    }
}

fn finish(program: &mut Program, options: &BuildOptions, capabilities: Capabilities) {
    program.push(ProtocolCommand::Feed(options.feed_lines));
    if capabilities.cut {
        program.push(ProtocolCommand::Cut(options.cut_mode));
    }
}

/// Text program in one code page. Fails on the first character the code
/// page cannot represent.
pub fn direct_text(
    blocks: &[Block],
    codepage: Codepage,
    options: &BuildOptions,
    capabilities: Capabilities,
) -> Result<Program, FailureReason> {
    let columns = options.printer.columns;
    let mut program = Program::with_init();
    program.push(ProtocolCommand::SetCodepage(codepage.slot()));

    let line = |program: &mut Program, align: Alignment, bold: bool, text: &str| {
        program.push(ProtocolCommand::SetAlign(align));
        program.push(ProtocolCommand::SetBold(bold));
        let bytes = transcode(text, codepage)?;
        if !bytes.is_empty() {
            program.push(ProtocolCommand::Text(bytes));
        }
        program.push(ProtocolCommand::LineFeed);
        Ok::<(), FailureReason>(())
    };

    for block in blocks {
        match block {
            Block::Line { text, align, bold } => {
                for paragraph in text.split('\n') {
                    line(&mut program, alignment(*align), *bold, paragraph)?;
                }
            }
            Block::Columns { left, right, bold } => {
                line(&mut program, Alignment::Left, *bold, fit_columns(left, right, columns).as_str())?;
            }
            Block::Divider(ch) => {
                line(&mut program, Alignment::Left, false, ch.to_string().repeat(columns).as_str())?;
            }
            Block::Blank => program.push(ProtocolCommand::LineFeed),
        }
    }

    finish(&mut program, options, capabilities);
    Ok(program.optimize())
}

/// Raster program: the whole receipt as one image.
pub fn raster(
    blocks: &[Block],
    font_size_pt: f32,
    max_height: usize,
    options: &BuildOptions,
    capabilities: Capabilities,
    engine: &GlyphEngine,
) -> Result<Program, FailureReason> {
    if let Some(ch) = first_uncovered(engine, blocks, font_size_pt) {
        tracing::warn!(?ch, "raster font lacks a glyph");
        return Err(FailureReason::MissingGlyph {
            ch,
            code_point: ch as u32,
        });
    }

    let width = options.printer.width_dots as usize;
    let bitmap = compose_with(engine, blocks, width, font_size_pt);
    let image = pack(&bitmap, max_height)?;
    tracing::debug!(
        width_bytes = image.width_bytes(),
        height = image.height(),
        "receipt rasterized"
    );

    let mut program = Program::with_init();
    program.push(ProtocolCommand::RasterImage(image));
    finish(&mut program, options, capabilities);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OversizedBitmap;
    use crate::protocol::codepage::decode;
    use crate::receipt::layout::layout;
    use crate::receipt::{LineItem, Receipt};
    use crate::render::rasterize::pt_to_px;
    use crate::render::script::Script;
    use pretty_assertions::assert_eq;

    const CUTTER: Capabilities = Capabilities {
        raw_bytes: true,
        cut: true,
    };

    fn store() -> Receipt {
        Receipt::builder("STORE")
            .item(LineItem::new(
                "Coffee",
                "2".parse().unwrap(),
                "2.50".parse().unwrap(),
                "5.00".parse().unwrap(),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_direct_text_structure() {
        let program =
            direct_text(&layout(&store()), Codepage::PC437, &BuildOptions::default(), CUTTER).unwrap();

        assert_eq!(program.commands[0], ProtocolCommand::Init);
        assert_eq!(
            program.count(|c| matches!(c, ProtocolCommand::SetCodepage(_))),
            1
        );
        assert_eq!(program.last(), Some(&ProtocolCommand::Cut(CutMode::Partial)));

        let text: Vec<String> = program
            .iter()
            .filter_map(|c| match c {
                ProtocolCommand::Text(bytes) => Some(decode(bytes, Codepage::PC437)),
                _ => None,
            })
            .collect();
        assert_eq!(text[0], "STORE");
        assert!(text.iter().any(|t| t.starts_with("2 x 2.50") && t.ends_with("5.00")));
    }

    #[test]
    fn test_no_cut_without_cutter() {
        let caps = Capabilities {
            raw_bytes: true,
            cut: false,
        };
        let program = direct_text(&layout(&store()), Codepage::PC437, &BuildOptions::default(), caps).unwrap();
        assert_eq!(program.last(), Some(&ProtocolCommand::Feed(3)));
    }

    #[test]
    fn test_direct_text_unmappable() {
        let receipt = Receipt::builder("STORE 店").build().unwrap();
        let err = direct_text(&layout(&receipt), Codepage::PC437, &BuildOptions::default(), CUTTER)
            .unwrap_err();
        let FailureReason::UnsupportedGlyph(glyph) = err else {
            panic!("expected an unsupported glyph");
        };
        assert_eq!(glyph.ch, '店');
        assert_eq!(glyph.index, 6);
    }

    #[test]
    fn test_raster_structure() {
        let engine = GlyphEngine::builtin();
        let options = BuildOptions {
            printer: PrinterConfig::PAPER_58MM,
            ..BuildOptions::default()
        };
        let program = raster(&layout(&store()), 10.0, 4000, &options, CUTTER, &engine).unwrap();
        let images: Vec<_> = program.rasters().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].width_bytes(), 48);
        assert!(images[0].height() as usize <= 4000);
    }

    #[test]
    fn test_raster_too_tall() {
        let engine = GlyphEngine::builtin();
        let err = raster(&layout(&store()), 10.0, 50, &BuildOptions::default(), CUTTER, &engine)
            .unwrap_err();
        assert!(matches!(
            err,
            FailureReason::OversizedBitmap(OversizedBitmap::TooTall { max_height: 50, .. })
        ));
    }

    #[test]
    fn test_raster_refuses_glyphs_the_font_lacks() {
        let engine = GlyphEngine::builtin();
        let err = raster(
            &layout(&Receipt::sample_arabic()),
            10.0,
            4000,
            &BuildOptions::default(),
            CUTTER,
            &engine,
        )
        .unwrap_err();
        let FailureReason::MissingGlyph { ch, code_point } = err else {
            panic!("expected a missing glyph, got {err}");
        };
        assert_eq!(code_point, ch as u32);
        assert!(!engine.face(Script::Arabic, pt_to_px(10.0)).covers(ch));
    }

    #[test]
    fn test_document_for_host() {
        let blocks = layout(&Receipt::sample_arabic());
        let payload = build_payload(
            &RenderStrategy::HostCompositor,
            &blocks,
            &BuildOptions::default(),
            Capabilities {
                raw_bytes: true,
                cut: false,
            },
            &GlyphEngine::builtin(),
        )
        .unwrap();
        let Payload::Document(doc) = payload else {
            panic!("expected a document");
        };
        assert_eq!(doc.blocks, blocks);
        assert_eq!(doc.columns, 48);
    }
}
