//! # Glyph Engine
//!
//! Process-wide source of rendered glyphs, shared read-only by every
//! rasterization call.
//!
//! Two glyph sources are available:
//!
//! - **Spleen** bitmap font (12x24 and 6x12 cells, compiled in), scaled with
//!   nearest neighbour. Always available, Latin-oriented.
//! - **TrueType** font via `ab_glyph`, loaded from a configured path or
//!   found at a well-known system location. Needed for Arabic or Hebrew.
//!
//! Faces are created lazily and cached by `(script, pixel size)`. A glyph
//! missing from the primary source falls back to Spleen, and a glyph missing
//! from both draws as a hollow box.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use ab_glyph::{Font, FontArc, ScaleFont};
use spleen_font::{FONT_12X24, FONT_6X12, PSF2Font};
use thiserror::Error;

use super::script::Script;

/// TrueType fonts looked for when none is configured. All of these carry the
/// Arabic presentation forms.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansArabic-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansArabic-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\tahoma.ttf",
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("cannot read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a usable TrueType/OpenType font")]
    Invalid { path: PathBuf },

    #[error("glyph engine already initialised; configure the font before the first render")]
    AlreadyInitialised,
}

/// One rendered glyph. Coverage is 0 (no ink) to 255 (full ink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub width: usize,
    pub height: usize,
    /// Offset of the coverage box from the pen position.
    pub left: i32,
    /// Offset of the coverage box from the top of the line.
    pub top: i32,
    pub advance: usize,
    pub coverage: Vec<u8>,
}

impl Glyph {
    fn blank(advance: usize) -> Self {
        Self {
            width: 0,
            height: 0,
            left: 0,
            top: 0,
            advance,
            coverage: Vec::new(),
        }
    }
}

/// A font at one pixel size.
pub struct Face {
    outline: Option<FontArc>,
    pixel_size: u32,
    line_height: usize,
    ascent: f32,
    cell: (usize, usize),
    glyphs: RwLock<HashMap<char, Arc<Glyph>>>,
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Face")
            .field("outline", &self.outline.is_some())
            .field("pixel_size", &self.pixel_size)
            .field("line_height", &self.line_height)
            .finish()
    }
}

impl Face {
    fn new(outline: Option<FontArc>, pixel_size: u32) -> Self {
        let px = pixel_size.max(6) as usize;
        // Spleen cells are 1:2
        let cell = (px.div_ceil(2), px);

        let (line_height, ascent) = match &outline {
            Some(font) => {
                let scaled = font.as_scaled(pixel_size as f32);
                let height = (scaled.ascent() - scaled.descent()).ceil() as usize;
                (height.max(cell.1), scaled.ascent())
            }
            None => (cell.1, cell.1 as f32),
        };

        Self {
            outline,
            pixel_size,
            line_height,
            ascent,
            cell,
            glyphs: RwLock::new(HashMap::new()),
        }
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn line_height(&self) -> usize {
        self.line_height
    }

    pub fn has_outline(&self) -> bool {
        self.outline.is_some()
    }

    pub fn advance(&self, ch: char) -> usize {
        self.glyph(ch).advance
    }

    /// Width of `chars` laid out in sequence.
    pub fn measure(&self, chars: impl IntoIterator<Item = char>) -> usize {
        chars.into_iter().map(|ch| self.advance(ch)).sum()
    }

    /// Whether either source has a real glyph for `ch`.
    pub fn covers(&self, ch: char) -> bool {
        ch == ' '
            || self.outline.as_ref().is_some_and(|f| f.glyph_id(ch).0 != 0)
            || spleen_has(ch)
    }

    pub fn glyph(&self, ch: char) -> Arc<Glyph> {
        let cached = self.glyphs.read().ok().and_then(|cache| cache.get(&ch).cloned());
        if let Some(glyph) = cached {
            return glyph;
        }

        let glyph = Arc::new(self.render(ch));
        if let Ok(mut cache) = self.glyphs.write() {
            cache.insert(ch, Arc::clone(&glyph));
        }
        glyph
    }

    fn render(&self, ch: char) -> Glyph {
        if ch == ' ' {
            let advance = match &self.outline {
                Some(font) => font.as_scaled(self.pixel_size as f32).h_advance(font.glyph_id(' ')),
                None => self.cell.0 as f32,
            };
            return Glyph::blank(advance.round() as usize);
        }
        if ch.is_control() {
            return Glyph::blank(0);
        }

        if let Some(glyph) = self
            .outline
            .as_ref()
            .and_then(|font| self.render_outline(font, ch))
        {
            return glyph;
        }

        let (w, h) = self.cell;
        let top = self.line_height.saturating_sub(h) as i32;
        let coverage = spleen_glyph(ch, w, h).unwrap_or_else(|| hollow_box(w, h));
        Glyph {
            width: w,
            height: h,
            left: 0,
            top,
            advance: w,
            coverage,
        }
    }

    fn render_outline(&self, font: &FontArc, ch: char) -> Option<Glyph> {
        let id = font.glyph_id(ch);
        if id.0 == 0 {
            return None;
        }
        let scaled = font.as_scaled(self.pixel_size as f32);
        let advance = scaled.h_advance(id).round().max(0.0) as usize;

        let positioned =
            id.with_scale_and_position(self.pixel_size as f32, ab_glyph::point(0.0, self.ascent));
        let Some(outlined) = font.outline_glyph(positioned) else {
            // No contours (e.g. a zero-width mark with nothing to draw).
            return Some(Glyph::blank(advance));
        };

        let bounds = outlined.px_bounds();
        let width = bounds.width().ceil() as usize;
        let height = bounds.height().ceil() as usize;
        let mut coverage = vec![0u8; width * height];
        outlined.draw(|x, y, c| {
            let idx = y as usize * width + x as usize;
            if let Some(px) = coverage.get_mut(idx) {
                *px = px.saturating_add((c.clamp(0.0, 1.0) * 255.0) as u8);
            }
        });

        Some(Glyph {
            width,
            height,
            left: bounds.min.x.floor() as i32,
            top: bounds.min.y.floor() as i32,
            advance,
            coverage,
        })
    }
}

fn spleen_has(ch: char) -> bool {
    let mut buf = [0u8; 4];
    PSF2Font::new(FONT_12X24)
        .ok()
        .is_some_and(|mut font| font.glyph_for_utf8(ch.encode_utf8(&mut buf).as_bytes()).is_some())
}

/// Spleen glyph scaled to a `w` x `h` cell. Uses the 6x12 master for small
/// cells, 12x24 otherwise.
fn spleen_glyph(ch: char, w: usize, h: usize) -> Option<Vec<u8>> {
    let (data, src_w, src_h) = if h < 18 {
        (FONT_6X12, 6, 12)
    } else {
        (FONT_12X24, 12, 24)
    };

    let mut font = PSF2Font::new(data).ok()?;
    let mut buf = [0u8; 4];
    let rows = font.glyph_for_utf8(ch.encode_utf8(&mut buf).as_bytes())?;

    let mut src = vec![0u8; src_w * src_h];
    for (y, row) in rows.enumerate() {
        for (x, on) in row.enumerate() {
            if x < src_w && y < src_h && on {
                src[y * src_w + x] = 255;
            }
        }
    }

    let mut dst = vec![0u8; w * h];
    scale_nearest(&src, src_w, src_h, &mut dst, w, h);
    Some(dst)
}

fn scale_nearest(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            if let (Some(&v), Some(d)) = (src.get(sy * src_w + sx), dst.get_mut(dy * dst_w + dx)) {
                *d = v;
            }
        }
    }
}

/// Outline box for characters no source can draw.
fn hollow_box(w: usize, h: usize) -> Vec<u8> {
    let mut glyph = vec![0u8; w * h];
    if w < 3 || h < 3 {
        return glyph;
    }
    let (x0, x1, y0, y1) = (1, w - 2, 2, h - 3);
    for x in x0..=x1 {
        glyph[y0 * w + x] = 255;
        glyph[y1 * w + x] = 255;
    }
    for y in y0..=y1 {
        glyph[y * w + x0] = 255;
        glyph[y * w + x1] = 255;
    }
    glyph
}

/// Where the engine gets its TrueType font from.
#[derive(Debug, Clone, Default)]
pub struct FontConfig {
    /// Explicit font, used for every script.
    pub path: Option<PathBuf>,
    /// Look for a system font for scripts Spleen cannot draw.
    pub search_system: bool,
}

/// Lazily initialised cache of faces.
pub struct GlyphEngine {
    configured: Option<FontArc>,
    search_system: bool,
    system: OnceLock<Option<FontArc>>,
    faces: RwLock<HashMap<(Script, u32), Arc<Face>>>,
}

impl GlyphEngine {
    pub fn new(config: &FontConfig) -> Result<Self, FontError> {
        let configured = config.path.as_deref().map(load_font).transpose()?;
        Ok(Self {
            configured,
            search_system: config.search_system,
            system: OnceLock::new(),
            faces: RwLock::new(HashMap::new()),
        })
    }

    /// Spleen only. Deterministic across machines.
    pub fn builtin() -> Self {
        Self {
            configured: None,
            search_system: false,
            system: OnceLock::new(),
            faces: RwLock::new(HashMap::new()),
        }
    }

    fn system_font(&self) -> Option<FontArc> {
        if !self.search_system {
            return None;
        }
        self.system
            .get_or_init(|| {
                SYSTEM_FONTS.iter().map(Path::new).find_map(|path| {
                    let font = load_font(path).ok()?;
                    tracing::debug!(path = %path.display(), "using system font");
                    Some(font)
                })
            })
            .clone()
    }

    /// Face for `script` at `pixel_size`, created on first use.
    pub fn face(&self, script: Script, pixel_size: u32) -> Arc<Face> {
        let key = (script, pixel_size);
        let cached = self.faces.read().ok().and_then(|faces| faces.get(&key).cloned());
        if let Some(face) = cached {
            return face;
        }

        let outline = self.configured.clone().or_else(|| {
            // Spleen draws Latin better than a scaled outline does.
            match script {
                Script::Common | Script::Latin => None,
                _ => self.system_font(),
            }
        });
        let face = Arc::new(Face::new(outline, pixel_size));
        tracing::debug!(%script, pixel_size, outline = face.has_outline(), "created glyph face");

        match self.faces.write() {
            Ok(mut faces) => Arc::clone(faces.entry(key).or_insert(face)),
            Err(_) => face,
        }
    }
}

fn load_font(path: &Path) -> Result<FontArc, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid {
        path: path.to_path_buf(),
    })
}

static ENGINE: OnceLock<GlyphEngine> = OnceLock::new();

/// Install the process-wide engine. Must run before the first render.
pub fn configure(config: &FontConfig) -> Result<(), FontError> {
    let engine = GlyphEngine::new(config)?;
    ENGINE.set(engine).map_err(|_| FontError::AlreadyInitialised)
}

/// The process-wide engine. Defaults to Spleen plus a system font search.
pub fn engine() -> &'static GlyphEngine {
    ENGINE.get_or_init(|| GlyphEngine {
        configured: None,
        search_system: true,
        system: OnceLock::new(),
        faces: RwLock::new(HashMap::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_face_metrics() {
        let engine = GlyphEngine::builtin();
        let face = engine.face(Script::Latin, 24);
        assert_eq!(face.line_height(), 24);
        assert_eq!(face.advance('A'), 12);
        assert_eq!(face.advance(' '), 12);
        assert!(!face.has_outline());
    }

    #[test]
    fn test_glyph_has_ink() {
        let engine = GlyphEngine::builtin();
        let glyph = engine.face(Script::Latin, 24).glyph('A');
        assert_eq!(glyph.coverage.len(), 12 * 24);
        assert!(glyph.coverage.iter().any(|&c| c == 255));
    }

    #[test]
    fn test_scaled_cell() {
        let engine = GlyphEngine::builtin();
        let face = engine.face(Script::Latin, 28);
        let glyph = face.glyph('W');
        assert_eq!((glyph.width, glyph.height), (14, 28));
    }

    #[test]
    fn test_unknown_glyph_is_a_box() {
        let engine = GlyphEngine::builtin();
        let face = engine.face(Script::Arabic, 24);
        let glyph = face.glyph('\u{FEFB}');
        assert_eq!(glyph.coverage, hollow_box(12, 24));
        assert!(!face.covers('\u{FEFB}'));
    }

    #[test]
    fn test_faces_are_cached() {
        let engine = GlyphEngine::builtin();
        let a = engine.face(Script::Latin, 20);
        let b = engine.face(Script::Latin, 20);
        assert!(Arc::ptr_eq(&a, &b));
        let c = engine.face(Script::Latin, 21);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_missing_font_file() {
        let config = FontConfig {
            path: Some("/nonexistent/font.ttf".into()),
            search_system: false,
        };
        assert!(matches!(
            GlyphEngine::new(&config),
            Err(FontError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_font_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        let config = FontConfig {
            path: Some(file.path().to_path_buf()),
            search_system: false,
        };
        assert!(matches!(
            GlyphEngine::new(&config),
            Err(FontError::Invalid { .. })
        ));
    }
}
