//! Script detection.
//!
//! A legacy code page maps one code point to one byte at a fixed position.
//! That is enough for Latin, Greek or Cyrillic, but not for scripts whose
//! visual form depends on neighbouring letters or on right-to-left ordering.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Script {
    /// Digits, punctuation, spaces and symbols shared by every script.
    Common,
    Latin,
    Greek,
    Cyrillic,
    Hebrew,
    Arabic,
    /// Devanagari through Malayalam.
    Indic,
    Thai,
    Cjk,
    Other,
}

impl Script {
    pub fn of(ch: char) -> Script {
        match ch as u32 {
            0x0000..=0x0040 | 0x005B..=0x0060 | 0x007B..=0x00BF | 0x00D7 | 0x00F7 => {
                Script::Common
            }
            0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F | 0x1E00..=0x1EFF => {
                Script::Latin
            }
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            0x0400..=0x052F => Script::Cyrillic,
            0x0590..=0x05FF | 0xFB1D..=0xFB4F => Script::Hebrew,
            0x0600..=0x06FF
            | 0x0750..=0x077F
            | 0x08A0..=0x08FF
            | 0xFB50..=0xFDFF
            | 0xFE70..=0xFEFF => Script::Arabic,
            0x0900..=0x0DFF => Script::Indic,
            0x0E00..=0x0E7F => Script::Thai,
            0x2000..=0x2BFF | 0x3000..=0x303F | 0xFF00..=0xFF0F | 0xFF1A..=0xFF20 => {
                Script::Common
            }
            0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xAC00..=0xD7AF => Script::Cjk,
            _ => Script::Other,
        }
    }

    /// Whether correct output needs contextual glyph selection or
    /// right-to-left ordering.
    pub fn requires_shaping(self) -> bool {
        matches!(
            self,
            Script::Hebrew | Script::Arabic | Script::Indic | Script::Thai
        )
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Script::Hebrew | Script::Arabic)
    }

    /// The script that decides how `text` has to be rendered: the first one
    /// requiring shaping, otherwise the first non-common one.
    pub fn detect(text: &str) -> Script {
        let mut found = Script::Common;
        for script in text.chars().map(Script::of) {
            if script.requires_shaping() {
                return script;
            }
            if found == Script::Common {
                found = script;
            }
        }
        found
    }

    /// First script in `texts` that a code page cannot express.
    pub fn first_requiring_shaping<'a>(texts: impl IntoIterator<Item = &'a str>) -> Option<Script> {
        texts
            .into_iter()
            .flat_map(str::chars)
            .map(Script::of)
            .find(|script| script.requires_shaping())
    }

    pub fn name(self) -> &'static str {
        match self {
            Script::Common => "Common",
            Script::Latin => "Latin",
            Script::Greek => "Greek",
            Script::Cyrillic => "Cyrillic",
            Script::Hebrew => "Hebrew",
            Script::Arabic => "Arabic",
            Script::Indic => "Indic",
            Script::Thai => "Thai",
            Script::Cjk => "CJK",
            Script::Other => "other",
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_of() {
        assert_eq!(Script::of('A'), Script::Latin);
        assert_eq!(Script::of('é'), Script::Latin);
        assert_eq!(Script::of('5'), Script::Common);
        assert_eq!(Script::of('Ж'), Script::Cyrillic);
        assert_eq!(Script::of('ש'), Script::Hebrew);
        assert_eq!(Script::of('م'), Script::Arabic);
        assert_eq!(Script::of('\u{FEDF}'), Script::Arabic);
        assert_eq!(Script::of('店'), Script::Cjk);
        assert_eq!(Script::of('☃'), Script::Common);
    }

    #[test]
    fn test_detect_prefers_shaping_scripts() {
        assert_eq!(Script::detect("123 شارع"), Script::Arabic);
        assert_eq!(Script::detect("Total 5.00"), Script::Latin);
        assert_eq!(Script::detect("5.00"), Script::Common);
        assert_eq!(Script::detect(""), Script::Common);
    }

    #[test]
    fn test_first_requiring_shaping() {
        assert_eq!(
            Script::first_requiring_shaping(["STORE", "Café"]),
            None
        );
        assert_eq!(
            Script::first_requiring_shaping(["STORE", "שלום"]),
            Some(Script::Hebrew)
        );
        assert_eq!(Script::first_requiring_shaping(["店 ☃"]), None);
    }
}
