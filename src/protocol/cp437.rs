//! # Code Page 437
//!
//! IBM PC code page 437, the power-on table of most ESC/POS printers
//! (`ESC t 0`). `encoding_rs` only covers WHATWG encodings, so this table is
//! kept here. ASCII (U+0020–U+007E) maps to itself.

/// Unicode code points for bytes 0x80–0xFF, indexed by `byte - 0x80`.
const HIGH_HALF: [char; 128] = [
    // 0x80–0x8F: Accented uppercase/lowercase
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90–0x9F: More accented, currency, ƒ
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0–0xAF: Spanish, fractions, punctuation
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0–0xBF: Shades and box drawing
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0–0xCF
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0–0xDF: Box drawing, block elements
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0–0xEF: Greek letters and math
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0–0xFF: Math symbols, degree, nbsp
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{00A0}',
];

/// Map a printable character to its CP437 byte.
pub fn encode_char(ch: char) -> Option<u8> {
    if (' '..='~').contains(&ch) {
        return Some(ch as u8);
    }
    HIGH_HALF
        .iter()
        .position(|&c| c == ch)
        .map(|i| 0x80 + i as u8)
}

/// Map a CP437 byte back to Unicode. Control bytes decode to themselves.
pub fn decode_byte(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        HIGH_HALF[(byte - 0x80) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> Option<Vec<u8>> {
        s.chars().map(encode_char).collect()
    }

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(encode("Hello, world!").unwrap(), b"Hello, world!");
    }

    #[test]
    fn test_accented_latin() {
        assert_eq!(encode_char('ñ'), Some(0xA4));
        assert_eq!(encode_char('Ñ'), Some(0xA5));
        assert_eq!(encode_char('é'), Some(0x82));
        assert_eq!(encode_char('ü'), Some(0x81));
    }

    #[test]
    fn test_spanish_text() {
        assert_eq!(encode("¿Qué?").unwrap(), vec![0xA8, 0x51, 0x75, 0x82, 0x3F]);
    }

    #[test]
    fn test_box_frame() {
        assert_eq!(encode("┌──┐").unwrap(), vec![0xDA, 0xC4, 0xC4, 0xBF]);
        assert_eq!(encode("╔═╗").unwrap(), vec![0xC9, 0xCD, 0xBB]);
    }

    #[test]
    fn test_unmapped_char() {
        assert_eq!(encode_char('★'), None);
        assert_eq!(encode_char('م'), None);
    }

    #[test]
    fn test_control_chars_are_not_mapped() {
        assert_eq!(encode_char('\x1B'), None);
        assert_eq!(encode_char('\n'), None);
    }

    #[test]
    fn test_every_high_byte_round_trips() {
        for byte in 0x80..=0xFFu8 {
            assert_eq!(encode_char(decode_byte(byte)), Some(byte));
        }
    }
}
