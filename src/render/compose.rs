//! # Receipt Composer
//!
//! Lays out receipt [`Block`]s on one bitmap the width of the paper. Used by
//! the raster strategy, where the printer receives a picture of the receipt
//! instead of text.
//!
//! Logical alignment resolves per block: `Start` is the right edge for a
//! right-to-left paragraph. Two-column rows swap sides when either column
//! is right-to-left, so labels stay at the reading start.

use std::sync::Arc;

use crate::receipt::{Block, TextAlign};

use super::glyphs::{self, Face, GlyphEngine};
use super::rasterize::{Bitmap, VisualLine, draw_line, layout_text, pt_to_px};
use super::script::Script;
use super::shaping;

/// Gap kept between the two columns of a row.
const COLUMN_GAP: usize = 16;

/// Compose `blocks` into a bitmap `width_px` wide using the process-wide
/// glyph engine.
pub fn compose_receipt(blocks: &[Block], width_px: usize, font_size_pt: f32) -> Bitmap {
    compose_with(glyphs::engine(), blocks, width_px, font_size_pt)
}

/// [`compose_receipt`] with an explicit engine.
pub fn compose_with(
    engine: &GlyphEngine,
    blocks: &[Block],
    width_px: usize,
    font_size_pt: f32,
) -> Bitmap {
    let px = pt_to_px(font_size_pt);
    let face_for = |text: &str| -> Arc<Face> { engine.face(Script::detect(text), px) };
    let base = engine.face(Script::Common, px);

    let mut canvas = Bitmap::new(width_px, 0);
    for block in blocks {
        match block {
            Block::Line { text, align, bold } => {
                let face = face_for(text);
                let paragraph = layout_text(text, &face, width_px);
                for line in &paragraph.lines {
                    let x = place(*align, paragraph.rtl, line.width, width_px);
                    append_line(&mut canvas, &face, line, x, *bold);
                }
            }
            Block::Columns { left, right, bold } => {
                compose_columns(&mut canvas, &face_for, left, right, *bold, width_px);
            }
            Block::Divider(ch) => {
                let height = base.line_height();
                let y = canvas.height;
                canvas.extend_rows(height);
                draw_rule(&mut canvas, *ch, y + height / 2);
            }
            Block::Blank => canvas.extend_rows(base.line_height() / 2),
        }
    }
    canvas
}

/// First character of `blocks` the engine has no glyph for, after shaping.
/// Such a character would print as a hollow box.
pub fn first_uncovered(engine: &GlyphEngine, blocks: &[Block], font_size_pt: f32) -> Option<char> {
    let px = pt_to_px(font_size_pt);
    blocks.iter().flat_map(Block::texts).find_map(|text| {
        let face = engine.face(Script::detect(text), px);
        text.split('\n')
            .flat_map(|line| shaping::shape(line).chars().collect::<Vec<_>>())
            .find(|&ch| !ch.is_control() && !face.covers(ch))
    })
}

/// Left edge for a line of `line_width` inside `width`.
fn place(align: TextAlign, rtl: bool, line_width: usize, width: usize) -> usize {
    let slack = width.saturating_sub(line_width);
    match (align, rtl) {
        (TextAlign::Center, _) => slack / 2,
        (TextAlign::Start, false) | (TextAlign::End, true) => 0,
        (TextAlign::Start, true) | (TextAlign::End, false) => slack,
    }
}

fn append_line(canvas: &mut Bitmap, face: &Face, line: &VisualLine, x: usize, bold: bool) {
    let y = canvas.height;
    canvas.extend_rows(face.line_height());
    draw_line(canvas, face, line, x, y, bold);
}

fn compose_columns(
    canvas: &mut Bitmap,
    face_for: &dyn Fn(&str) -> Arc<Face>,
    left: &str,
    right: &str,
    bold: bool,
    width: usize,
) {
    let (left_face, right_face) = (face_for(left), face_for(right));
    let left_par = layout_text(left, &left_face, width);
    let right_par = layout_text(right, &right_face, width);
    let rtl = left_par.rtl || right_par.rtl;

    let (Some(first), Some(second)) = (left_par.lines.first(), right_par.lines.first()) else {
        return;
    };

    let single_line = left_par.lines.len() == 1
        && right_par.lines.len() == 1
        && first.width + COLUMN_GAP + second.width <= width;

    if single_line {
        let y = canvas.height;
        canvas.extend_rows(left_face.line_height().max(right_face.line_height()));
        let (lx, rx) = if rtl {
            (width - first.width, 0)
        } else {
            (0, width - second.width)
        };
        draw_line(canvas, &left_face, first, lx, y, bold);
        draw_line(canvas, &right_face, second, rx, y, bold);
        return;
    }

    // Label on its own lines, value at the end edge below it.
    let start = if rtl { TextAlign::End } else { TextAlign::Start };
    for line in &left_par.lines {
        let x = place(start, false, line.width, width);
        append_line(canvas, &left_face, line, x, bold);
    }
    let end = if rtl { TextAlign::Start } else { TextAlign::End };
    for line in &right_par.lines {
        let x = place(end, false, line.width, width);
        append_line(canvas, &right_face, line, x, bold);
    }
}

/// Horizontal rule centred on row `y`. `=` is double, `-` is dashed.
fn draw_rule(canvas: &mut Bitmap, ch: char, y: usize) {
    let width = canvas.width;
    match ch {
        '=' => {
            canvas.fill(0, y.saturating_sub(3), width, 2);
            canvas.fill(0, y + 1, width, 2);
        }
        '-' => {
            for x in (0..width).step_by(12) {
                canvas.fill(x, y, 8, 2);
            }
        }
        _ => canvas.fill(0, y, width, 2),
    }
}
