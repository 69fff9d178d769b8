//! # Text Rasterizer
//!
//! Draws text into an 8-bit grayscale [`Bitmap`]: 255 is paper, 0 is ink.
//!
//! Per paragraph: shape (logical order), wrap greedily at the pixel width
//! (logical order), then reorder each wrapped line for display. The output
//! height is always `lines * line_height`, so it depends only on the text,
//! the width and the face.

use std::ops::Range;

use super::glyphs::{self, Face};
use super::script::Script;
use super::shaping::{self, BidiParagraph};

/// Resolution of thermal print heads, dots per inch.
pub const PRINTER_DPI: f32 = 203.0;

pub const PAPER: u8 = 255;
pub const INK: u8 = 0;

/// Grayscale image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub rows: Vec<u8>,
}

impl Bitmap {
    /// A blank sheet.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![PAPER; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < self.width)
            .then(|| self.rows.get(y * self.width + x).copied())
            .flatten()
    }

    /// Grow downwards by `rows` blank rows.
    pub fn extend_rows(&mut self, rows: usize) {
        self.height += rows;
        self.rows.resize(self.width * self.height, PAPER);
    }

    /// Darken the pixel at (x, y) by `coverage`. Out-of-bounds is clipped.
    pub fn ink(&mut self, x: i64, y: i64, coverage: u8) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.rows[idx] = self.rows[idx].min(PAPER - coverage);
    }

    /// Fill a rectangle with ink.
    pub fn fill(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for yy in y..(y + h).min(self.height) {
            for xx in x..(x + w).min(self.width) {
                self.rows[yy * self.width + xx] = INK;
            }
        }
    }
}

/// Points to pixels at the print head resolution.
pub fn pt_to_px(font_size_pt: f32) -> u32 {
    (font_size_pt * PRINTER_DPI / 72.0).round().max(1.0) as u32
}

/// One wrapped line, ready to draw left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualLine {
    pub glyphs: Vec<char>,
    pub width: usize,
}

/// A shaped and wrapped paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<VisualLine>,
    pub rtl: bool,
}

/// Shape, wrap and reorder `text`. Each `\n` starts a new paragraph; the
/// direction of the first one is reported.
pub fn layout_text(text: &str, face: &Face, max_width: usize) -> Paragraph {
    let mut lines = Vec::new();
    let mut rtl = None;

    for logical in text.split('\n') {
        let shaped = shaping::shape(logical);
        let bidi = BidiParagraph::new(&shaped);
        rtl.get_or_insert(bidi.is_rtl());

        for range in wrap(&shaped, face, max_width) {
            let glyphs = bidi.visual_line(range);
            let width = face.measure(glyphs.iter().copied());
            lines.push(VisualLine { glyphs, width });
        }
    }

    Paragraph {
        lines,
        rtl: rtl.unwrap_or(false),
    }
}

/// Greedy word wrap over logical text. Returns byte ranges, one per line.
///
/// Words wider than `max_width` are broken between characters. Spaces at a
/// break are dropped.
fn wrap(text: &str, face: &Face, max_width: usize) -> Vec<Range<usize>> {
    if text.is_empty() {
        return vec![0..0];
    }

    let space = face.advance(' ');
    let mut lines = Vec::new();
    let mut line: Option<Range<usize>> = None;
    let mut line_width = 0;

    let mut offset = 0;
    for word in text.split(' ') {
        let start = offset;
        let end = start + word.len();
        offset = end + 1;
        if word.is_empty() {
            continue;
        }

        let word_width = face.measure(word.chars());
        if let Some(current) = line.as_mut() {
            if line_width + space + word_width <= max_width {
                current.end = end;
                line_width += space + word_width;
                continue;
            }
        }
        lines.extend(line.take());

        if word_width <= max_width {
            line = Some(start..end);
            line_width = word_width;
            continue;
        }

        // Break an overlong word.
        let mut piece_start = start;
        let mut piece_width = 0;
        for (i, ch) in word.char_indices() {
            let advance = face.advance(ch);
            if piece_width + advance > max_width && piece_width > 0 {
                lines.push(piece_start..start + i);
                piece_start = start + i;
                piece_width = 0;
            }
            piece_width += advance;
        }
        line = Some(piece_start..end);
        line_width = piece_width;
    }

    lines.extend(line);
    if lines.is_empty() {
        // Only spaces.
        lines.push(0..0);
    }
    lines
}

/// Draw one visual line with its pen starting at (x, y). Bold is drawn as a
/// second pass one pixel to the right.
pub fn draw_line(canvas: &mut Bitmap, face: &Face, line: &VisualLine, x: usize, y: usize, bold: bool) {
    let mut pen = x as i64;
    for &ch in &line.glyphs {
        let glyph = face.glyph(ch);
        let passes: &[i64] = if bold { &[0, 1] } else { &[0] };
        for &dx in passes {
            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    let coverage = glyph.coverage[gy * glyph.width + gx];
                    if coverage > 0 {
                        canvas.ink(
                            pen + glyph.left as i64 + gx as i64 + dx,
                            y as i64 + glyph.top as i64 + gy as i64,
                            coverage,
                        );
                    }
                }
            }
        }
        pen += glyph.advance as i64;
    }
}

/// Rasterize `text` at `font_size_pt` into a bitmap `max_width_px` wide.
///
/// Lines start at the paragraph's start edge: the left for left-to-right
/// text, the right for right-to-left text.
pub fn rasterize(text: &str, max_width_px: usize, font_size_pt: f32) -> Bitmap {
    let face = glyphs::engine().face(Script::detect(text), pt_to_px(font_size_pt));
    rasterize_with(&face, text, max_width_px)
}

/// [`rasterize`] with an explicit face.
pub fn rasterize_with(face: &Face, text: &str, max_width_px: usize) -> Bitmap {
    let paragraph = layout_text(text, face, max_width_px);
    let line_height = face.line_height();
    let mut canvas = Bitmap::new(max_width_px, paragraph.lines.len() * line_height);

    for (i, line) in paragraph.lines.iter().enumerate() {
        let x = if paragraph.rtl {
            max_width_px.saturating_sub(line.width)
        } else {
            0
        };
        draw_line(&mut canvas, face, line, x, i * line_height, false);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::glyphs::GlyphEngine;
    use pretty_assertions::assert_eq;

    fn face() -> std::sync::Arc<Face> {
        GlyphEngine::builtin().face(Script::Latin, 24)
    }

    fn ranges<'a>(text: &'a str, ranges: &[Range<usize>]) -> Vec<&'a str> {
        ranges.iter().map(|r| &text[r.clone()]).collect()
    }

    #[test]
    fn test_pt_to_px() {
        assert_eq!(pt_to_px(10.0), 28);
        assert_eq!(pt_to_px(8.5), 24);
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        let face = face();
        assert_eq!(ranges("Hello world", &wrap("Hello world", &face, 576)), vec!["Hello world"]);
    }

    #[test]
    fn test_wrap_greedy() {
        let face = face();
        // 12 px per char: 10 chars per line
        let text = "aaaa bbbb cccc dd";
        assert_eq!(ranges(text, &wrap(text, &face, 120)), vec!["aaaa bbbb", "cccc dd"]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let face = face();
        let text = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(
            ranges(text, &wrap(text, &face, 120)),
            vec!["abcdefghij", "klmnopqrst", "uvwxy"]
        );
    }

    #[test]
    fn test_empty_text_is_one_blank_line() {
        let face = face();
        let bitmap = rasterize_with(&face, "", 96);
        assert_eq!(bitmap.height, 24);
        assert!(bitmap.rows.iter().all(|&p| p == PAPER));
    }

    #[test]
    fn test_height_is_lines_times_line_height() {
        let face = face();
        let bitmap = rasterize_with(&face, "aaaa bbbb cccc dd", 120);
        assert_eq!(bitmap.width, 120);
        assert_eq!(bitmap.height, 2 * face.line_height());
        assert_eq!(bitmap.rows.len(), bitmap.width * bitmap.height);
    }

    #[test]
    fn test_deterministic() {
        let text = "متجر عينة 123 شارع الرئيسي (10٪)";
        let a = rasterize(text, 384, 10.0);
        let b = rasterize(text, 384, 10.0);
        assert_eq!(a.height, b.height);
        assert_eq!(a, b);
    }

    #[test]
    fn test_has_ink_and_background() {
        let bitmap = rasterize_with(&face(), "STORE", 200);
        assert!(bitmap.rows.iter().any(|&p| p == INK));
        assert!(bitmap.rows.iter().any(|&p| p == PAPER));
    }

    #[test]
    fn test_rtl_is_right_aligned() {
        let face = face();
        let bitmap = rasterize_with(&face, "ששש", 240);
        // nothing in the left half
        let left_ink = (0..bitmap.height)
            .flat_map(|y| (0..100).map(move |x| (x, y)))
            .any(|(x, y)| bitmap.get(x, y) != Some(PAPER));
        assert!(!left_ink);
    }

    #[test]
    fn test_paragraph_breaks() {
        let face = face();
        let paragraph = layout_text("one\ntwo", &face, 576);
        assert_eq!(paragraph.lines.len(), 2);
        assert!(!paragraph.rtl);
    }
}
