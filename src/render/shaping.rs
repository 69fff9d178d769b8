//! # Text Shaping
//!
//! Two steps turn logical text into the glyph sequence drawn left to right:
//!
//! 1. [`shape`] replaces Arabic letters with their contextual presentation
//!    forms (isolated, final, initial, medial) and forms the mandatory
//!    lam-alef ligatures. Works on logical order.
//! 2. [`BidiParagraph::visual_line`] reorders one wrapped line with the
//!    Unicode Bidirectional Algorithm and mirrors paired brackets inside
//!    right-to-left runs.
//!
//! Presentation forms keep the Arabic bidi class, so reordering after
//! shaping is safe.

use std::ops::Range;

use unicode_bidi::{BidiInfo, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Joins on both sides.
    Dual,
    /// Joins only to the preceding letter.
    Right,
    /// Tatweel: joins both sides, has no forms of its own.
    Causing,
    /// Marks: ignored when looking for neighbours.
    Transparent,
    None,
}

/// Presentation-form base for a letter and how it joins.
///
/// Forms are laid out as isolated, final, initial, medial from the base;
/// right-joining letters only have the first two.
fn arabic_form(ch: char) -> Option<(u32, Joining)> {
    use Joining::{Dual, Right};

    let entry = match ch {
        '\u{0621}' => (0xFE80, Joining::None),
        '\u{0622}' => (0xFE81, Right),
        '\u{0623}' => (0xFE83, Right),
        '\u{0624}' => (0xFE85, Right),
        '\u{0625}' => (0xFE87, Right),
        '\u{0626}' => (0xFE89, Dual),
        '\u{0627}' => (0xFE8D, Right),
        '\u{0628}' => (0xFE8F, Dual),
        '\u{0629}' => (0xFE93, Right),
        '\u{062A}' => (0xFE95, Dual),
        '\u{062B}' => (0xFE99, Dual),
        '\u{062C}' => (0xFE9D, Dual),
        '\u{062D}' => (0xFEA1, Dual),
        '\u{062E}' => (0xFEA5, Dual),
        '\u{062F}' => (0xFEA9, Right),
        '\u{0630}' => (0xFEAB, Right),
        '\u{0631}' => (0xFEAD, Right),
        '\u{0632}' => (0xFEAF, Right),
        '\u{0633}' => (0xFEB1, Dual),
        '\u{0634}' => (0xFEB5, Dual),
        '\u{0635}' => (0xFEB9, Dual),
        '\u{0636}' => (0xFEBD, Dual),
        '\u{0637}' => (0xFEC1, Dual),
        '\u{0638}' => (0xFEC5, Dual),
        '\u{0639}' => (0xFEC9, Dual),
        '\u{063A}' => (0xFECD, Dual),
        '\u{0641}' => (0xFED1, Dual),
        '\u{0642}' => (0xFED5, Dual),
        '\u{0643}' => (0xFED9, Dual),
        '\u{0644}' => (0xFEDD, Dual),
        '\u{0645}' => (0xFEE1, Dual),
        '\u{0646}' => (0xFEE5, Dual),
        '\u{0647}' => (0xFEE9, Dual),
        '\u{0648}' => (0xFEED, Right),
        '\u{0649}' => (0xFEEF, Right),
        '\u{064A}' => (0xFEF1, Dual),
        // Persian and Urdu letters (Presentation Forms-A)
        '\u{067E}' => (0xFB56, Dual),
        '\u{0686}' => (0xFB7A, Dual),
        '\u{0698}' => (0xFB8A, Right),
        '\u{06A9}' => (0xFB8E, Dual),
        '\u{06AF}' => (0xFB92, Dual),
        '\u{06CC}' => (0xFBFC, Dual),
        _ => return None,
    };
    Some(entry)
}

fn joining(ch: char) -> Joining {
    match ch {
        '\u{0640}' => Joining::Causing,
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}' => Joining::Transparent,
        _ => arabic_form(ch).map_or(Joining::None, |(_, joining)| joining),
    }
}

/// Lam-alef ligature base (isolated; final is base + 1).
fn lam_alef(alef: char) -> Option<u32> {
    match alef {
        '\u{0622}' => Some(0xFEF5),
        '\u{0623}' => Some(0xFEF7),
        '\u{0625}' => Some(0xFEF9),
        '\u{0627}' => Some(0xFEFB),
        _ => None,
    }
}

const LAM: char = '\u{0644}';

fn joins_forward(joining: Joining) -> bool {
    matches!(joining, Joining::Dual | Joining::Causing)
}

fn joins_backward(joining: Joining) -> bool {
    matches!(joining, Joining::Dual | Joining::Right | Joining::Causing)
}

/// Replace Arabic letters with contextual presentation forms.
///
/// Text without Arabic letters is returned unchanged.
pub fn shape(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let kinds: Vec<Joining> = chars.iter().map(|&c| joining(c)).collect();

    let neighbour = |from: usize, forward: bool| -> Option<usize> {
        if forward {
            (from + 1..chars.len()).find(|&j| kinds[j] != Joining::Transparent)
        } else {
            (0..from).rev().find(|&j| kinds[j] != Joining::Transparent)
        }
    };

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let Some((base, kind)) = arabic_form(ch) else {
            out.push(ch);
            i += 1;
            continue;
        };

        let joins_prev = kind != Joining::None
            && neighbour(i, false).is_some_and(|p| joins_forward(kinds[p]));

        let ligature = chars
            .get(i + 1)
            .filter(|_| ch == LAM)
            .and_then(|&next| lam_alef(next));
        if let Some(ligature) = ligature {
            out.extend(char::from_u32(ligature + u32::from(joins_prev)));
            i += 2;
            continue;
        }

        let joins_next = kind == Joining::Dual
            && neighbour(i, true).is_some_and(|n| joins_backward(kinds[n]));

        let offset = match (joins_prev, joins_next) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        out.extend(char::from_u32(base + offset));
        i += 1;
    }
    out
}

/// Mirrored counterpart of a paired punctuation character.
pub fn mirror(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '‹' => '›',
        '›' => '‹',
        '≤' => '≥',
        '≥' => '≤',
        _ => ch,
    }
}

/// One paragraph analysed by the bidirectional algorithm.
pub struct BidiParagraph<'a> {
    text: &'a str,
    info: Option<BidiInfo<'a>>,
}

impl<'a> BidiParagraph<'a> {
    /// Analyse `text`. The base direction comes from its first strong
    /// character.
    pub fn new(text: &'a str) -> Self {
        let info = BidiInfo::new(text, None);
        let info = (!info.paragraphs.is_empty()).then_some(info);
        Self { text, info }
    }

    pub fn is_rtl(&self) -> bool {
        self.info
            .as_ref()
            .and_then(|info| info.paragraphs.first())
            .is_some_and(|para| para.level.is_rtl())
    }

    /// Characters of `line` (a byte range of the paragraph) in visual order,
    /// left to right.
    pub fn visual_line(&self, line: Range<usize>) -> Vec<char> {
        if line.is_empty() {
            return Vec::new();
        }
        let Some(info) = &self.info else {
            return self.text[line].chars().collect();
        };
        let para = &info.paragraphs[0];
        let (levels, runs) = info.visual_runs(para, line);

        let mut out = Vec::new();
        for run in runs {
            let rtl = levels
                .get(run.start)
                .copied()
                .is_some_and(|level: Level| level.is_rtl());
            let segment = &self.text[run];
            if rtl {
                out.extend(segment.chars().rev().map(mirror));
            } else {
                out.extend(segment.chars());
            }
        }
        out
    }
}
