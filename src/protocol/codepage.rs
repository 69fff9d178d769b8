//! # Codepage Transcoder
//!
//! Converts Unicode text into the single-byte table the printer has selected
//! with `ESC t n`. Transcoding fails on the first character the table
//! cannot represent instead of substituting `?`: a receipt with silently
//! replaced characters looks plausible and is wrong.
//!
//! ## Tables
//!
//! | Table | Source | Default `ESC t` slot |
//! |-------|--------|----------------------|
//! | PC437 | built-in | 0 |
//! | WPC1252 | `encoding_rs` | 16 |
//! | PC866 | `encoding_rs` (IBM866) | 17 |
//! | WPC1251 | `encoding_rs` | 46 |
//! | WPC1253 | `encoding_rs` | 47 |
//! | WPC1255 | `encoding_rs` | 49 |
//! | WPC1256 | `encoding_rs` | 50 |
//!
//! Slot numbers follow the Epson table. Other vendors number their tables
//! differently, so every [`Codepage`] carries an overridable slot.

use std::fmt;

use encoding_rs::{EncoderResult, Encoding};
use serde::{Deserialize, Serialize};

use super::cp437;
use crate::error::UnsupportedGlyph;

/// A legacy single-byte character table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeTable {
    Pc437,
    Pc866,
    Wpc1251,
    Wpc1252,
    Wpc1253,
    Wpc1255,
    Wpc1256,
}

impl CodeTable {
    pub const ALL: [CodeTable; 7] = [
        CodeTable::Pc437,
        CodeTable::Pc866,
        CodeTable::Wpc1251,
        CodeTable::Wpc1252,
        CodeTable::Wpc1253,
        CodeTable::Wpc1255,
        CodeTable::Wpc1256,
    ];

    /// Epson `ESC t` slot for this table.
    pub fn default_slot(self) -> u8 {
        match self {
            CodeTable::Pc437 => 0,
            CodeTable::Wpc1252 => 16,
            CodeTable::Pc866 => 17,
            CodeTable::Wpc1251 => 46,
            CodeTable::Wpc1253 => 47,
            CodeTable::Wpc1255 => 49,
            CodeTable::Wpc1256 => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodeTable::Pc437 => "PC437",
            CodeTable::Pc866 => "PC866",
            CodeTable::Wpc1251 => "WPC1251",
            CodeTable::Wpc1252 => "WPC1252",
            CodeTable::Wpc1253 => "WPC1253",
            CodeTable::Wpc1255 => "WPC1255",
            CodeTable::Wpc1256 => "WPC1256",
        }
    }

    fn encoding(self) -> Option<&'static Encoding> {
        match self {
            CodeTable::Pc437 => None,
            CodeTable::Pc866 => Some(encoding_rs::IBM866),
            CodeTable::Wpc1251 => Some(encoding_rs::WINDOWS_1251),
            CodeTable::Wpc1252 => Some(encoding_rs::WINDOWS_1252),
            CodeTable::Wpc1253 => Some(encoding_rs::WINDOWS_1253),
            CodeTable::Wpc1255 => Some(encoding_rs::WINDOWS_1255),
            CodeTable::Wpc1256 => Some(encoding_rs::WINDOWS_1256),
        }
    }
}

impl std::str::FromStr for CodeTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(['-', '_'], "");
        CodeTable::ALL
            .into_iter()
            .find(|table| table.name() == wanted || table.name().trim_start_matches('W') == wanted)
            .ok_or_else(|| format!("unknown code page '{s}'"))
    }
}

/// A code table bound to the slot the printer selects it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Codepage {
    table: CodeTable,
    slot: u8,
}

impl Codepage {
    pub const PC437: Codepage = Codepage {
        table: CodeTable::Pc437,
        slot: 0,
    };

    pub const WPC1252: Codepage = Codepage {
        table: CodeTable::Wpc1252,
        slot: 16,
    };

    pub const WPC1256: Codepage = Codepage {
        table: CodeTable::Wpc1256,
        slot: 50,
    };

    /// Table at its default Epson slot.
    pub fn new(table: CodeTable) -> Self {
        Self {
            table,
            slot: table.default_slot(),
        }
    }

    /// Use a vendor-specific slot number.
    pub fn with_slot(self, slot: u8) -> Self {
        Self { slot, ..self }
    }

    pub fn table(&self) -> CodeTable {
        self.table
    }

    /// Argument for `ESC t`.
    pub fn slot(&self) -> u8 {
        self.slot
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self::PC437
    }
}

impl fmt::Display for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table.name())
    }
}

/// Characters that would reach the printer as command bytes.
fn is_control(ch: char) -> bool {
    ch.is_control()
}

/// Transcode `text` into `codepage` bytes, failing on the first unmappable
/// character.
pub fn transcode(text: &str, codepage: Codepage) -> Result<Vec<u8>, UnsupportedGlyph> {
    if let Some((index, ch)) = text.chars().enumerate().find(|&(_, ch)| is_control(ch)) {
        return Err(UnsupportedGlyph::new(ch, index, codepage));
    }

    match codepage.table.encoding() {
        None => text
            .chars()
            .enumerate()
            .map(|(index, ch)| {
                cp437::encode_char(ch).ok_or_else(|| UnsupportedGlyph::new(ch, index, codepage))
            })
            .collect(),
        Some(encoding) => encode_strict(encoding, text, codepage),
    }
}

fn encode_strict(
    encoding: &'static Encoding,
    text: &str,
    codepage: Codepage,
) -> Result<Vec<u8>, UnsupportedGlyph> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut consumed = 0;

    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut out, true);
        consumed += read;

        match result {
            EncoderResult::InputEmpty => return Ok(out),
            EncoderResult::OutputFull => out.reserve(text.len() - consumed + 16),
            EncoderResult::Unmappable(ch) => {
                // `read` includes the rejected character.
                let index = text[..consumed].chars().count().saturating_sub(1);
                return Err(UnsupportedGlyph::new(ch, index, codepage));
            }
        }
    }
}

/// Decode `codepage` bytes back into Unicode.
pub fn decode(bytes: &[u8], codepage: Codepage) -> String {
    match codepage.table.encoding() {
        None => bytes.iter().map(|&b| cp437::decode_byte(b)).collect(),
        Some(encoding) => encoding
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_identity_in_every_table() {
        for table in CodeTable::ALL {
            let bytes = transcode("STORE 2 x 2.50", Codepage::new(table)).unwrap();
            assert_eq!(bytes, b"STORE 2 x 2.50");
        }
    }

    #[test]
    fn test_fails_on_first_unmappable() {
        let err = transcode("Café 店 ☃", Codepage::PC437).unwrap_err();
        assert_eq!(err.ch, '店');
        assert_eq!(err.index, 5);
    }

    #[test]
    fn test_encoding_rs_reports_char_index() {
        let err = transcode("ab€ł", Codepage::new(CodeTable::Pc866)).unwrap_err();
        assert_eq!(err.ch, '€');
        assert_eq!(err.index, 2);
    }

    #[test]
    fn test_arabic_in_1256() {
        let bytes = transcode("متجر", Codepage::WPC1256).unwrap();
        assert_eq!(bytes.len(), 4);
        assert!(bytes.iter().all(|&b| b >= 0x80));
        assert_eq!(decode(&bytes, Codepage::WPC1256), "متجر");
    }

    #[test]
    fn test_control_characters_rejected() {
        let err = transcode("A\x1B@", Codepage::WPC1252).unwrap_err();
        assert_eq!(err.ch, '\x1B');
        assert_eq!(err.index, 1);
        assert!(transcode("tab\there", Codepage::PC437).is_err());
    }

    #[test]
    fn test_round_trip_when_covered() {
        let samples = [
            ("Ñandú café ½ °C", CodeTable::Pc437),
            ("Привет, мир", CodeTable::Pc866),
            ("Привет", CodeTable::Wpc1251),
            ("Straße €5", CodeTable::Wpc1252),
            ("Καλημέρα", CodeTable::Wpc1253),
            ("שלום", CodeTable::Wpc1255),
            ("شكراً لك", CodeTable::Wpc1256),
        ];
        for (text, table) in samples {
            let page = Codepage::new(table);
            let bytes = transcode(text, page).unwrap();
            assert_eq!(decode(&bytes, page), text, "round trip through {page}");
        }
    }

    #[test]
    fn test_slot_override() {
        let page = Codepage::WPC1256.with_slot(28);
        assert_eq!(page.slot(), 28);
        assert_eq!(page.table(), CodeTable::Wpc1256);
    }

    #[test]
    fn test_parse_table_names() {
        assert_eq!("pc437".parse::<CodeTable>().unwrap(), CodeTable::Pc437);
        assert_eq!("WPC1256".parse::<CodeTable>().unwrap(), CodeTable::Wpc1256);
        assert_eq!("pc-1256".parse::<CodeTable>().unwrap(), CodeTable::Wpc1256);
        assert!("latin9".parse::<CodeTable>().is_err());
    }
}
