//! # Byte Stream Decoder
//!
//! Walks an ESC/POS byte stream back into commands. Only the commands this
//! crate emits are recognised; anything else is an error. Used to check wire
//! structure (raster headers against their payloads in particular) without
//! hard-coding offsets.

use thiserror::Error;

use super::commands::{Alignment, CutMode, ESC, GS, LF};

/// One decoded command. Printable runs are collected into [`Parsed::Text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Init,
    Align(Alignment),
    Bold(bool),
    Codepage(u8),
    Feed(u8),
    Cut(CutMode),
    LineFeed,
    Text(Vec<u8>),
    Raster {
        width_bytes: u16,
        height: u16,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("stream ends inside a command at offset {0}")]
    Truncated(usize),

    #[error("unknown command {0:02X?} at offset {1}")]
    Unknown(Vec<u8>, usize),

    #[error("invalid parameter {value} for {command} at offset {offset}")]
    InvalidParameter {
        command: &'static str,
        value: u8,
        offset: usize,
    },
}

/// Decode `bytes` into commands.
pub fn parse(bytes: &[u8]) -> Result<Vec<Parsed>, ParseError> {
    let mut out = Vec::new();
    let mut i = 0;

    let param = |at: usize| bytes.get(at).copied().ok_or(ParseError::Truncated(at));

    while i < bytes.len() {
        match bytes[i] {
            LF => {
                out.push(Parsed::LineFeed);
                i += 1;
            }
            ESC => {
                let op = param(i + 1)?;
                match op {
                    b'@' => {
                        out.push(Parsed::Init);
                        i += 2;
                    }
                    b'a' => {
                        let alignment = match param(i + 2)? {
                            0 => Alignment::Left,
                            1 => Alignment::Center,
                            2 => Alignment::Right,
                            value => {
                                return Err(ParseError::InvalidParameter {
                                    command: "ESC a",
                                    value,
                                    offset: i,
                                });
                            }
                        };
                        out.push(Parsed::Align(alignment));
                        i += 3;
                    }
                    b'E' => {
                        out.push(Parsed::Bold(param(i + 2)? & 1 == 1));
                        i += 3;
                    }
                    b't' => {
                        out.push(Parsed::Codepage(param(i + 2)?));
                        i += 3;
                    }
                    b'd' => {
                        out.push(Parsed::Feed(param(i + 2)?));
                        i += 3;
                    }
                    _ => return Err(ParseError::Unknown(vec![ESC, op], i)),
                }
            }
            GS => {
                let op = param(i + 1)?;
                match op {
                    b'V' => {
                        let value = param(i + 2)?;
                        let mode = CutMode::from_code(value).ok_or(
                            ParseError::InvalidParameter {
                                command: "GS V",
                                value,
                                offset: i,
                            },
                        )?;
                        out.push(Parsed::Cut(mode));
                        i += 3;
                    }
                    b'v' => {
                        if param(i + 2)? != b'0' {
                            return Err(ParseError::Unknown(vec![GS, op, bytes[i + 2]], i));
                        }
                        let width_bytes = u16::from_le_bytes([param(i + 4)?, param(i + 5)?]);
                        let height = u16::from_le_bytes([param(i + 6)?, param(i + 7)?]);
                        let start = i + 8;
                        let end = start + width_bytes as usize * height as usize;
                        let data = bytes.get(start..end).ok_or(ParseError::Truncated(start))?;
                        out.push(Parsed::Raster {
                            width_bytes,
                            height,
                            data: data.to_vec(),
                        });
                        i = end;
                    }
                    _ => return Err(ParseError::Unknown(vec![GS, op], i)),
                }
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], LF | ESC | GS) {
                    i += 1;
                }
                out.push(Parsed::Text(bytes[start..i].to_vec()));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::commands;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_text_receipt() {
        let mut bytes = commands::init();
        bytes.extend(commands::codepage(16));
        bytes.extend(commands::align(Alignment::Center));
        bytes.extend(commands::bold(true));
        bytes.extend(b"STORE");
        bytes.push(LF);
        bytes.extend(commands::feed_lines(3));
        bytes.extend(commands::cut(CutMode::Partial));

        assert_eq!(
            parse(&bytes).unwrap(),
            vec![
                Parsed::Init,
                Parsed::Codepage(16),
                Parsed::Align(Alignment::Center),
                Parsed::Bold(true),
                Parsed::Text(b"STORE".to_vec()),
                Parsed::LineFeed,
                Parsed::Feed(3),
                Parsed::Cut(CutMode::Partial),
            ]
        );
    }

    #[test]
    fn test_raster_payload_may_contain_command_bytes() {
        let data = vec![ESC, b'@', GS, LF];
        let bytes = commands::raster(2, 2, &data);
        assert_eq!(
            parse(&bytes).unwrap(),
            vec![Parsed::Raster {
                width_bytes: 2,
                height: 2,
                data,
            }]
        );
    }

    #[test]
    fn test_truncated_raster() {
        let mut bytes = commands::raster(2, 2, &[0; 4]);
        bytes.truncate(10);
        assert_eq!(parse(&bytes), Err(ParseError::Truncated(8)));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse(&[ESC, b'Z']),
            Err(ParseError::Unknown(_, 0))
        ));
        assert_eq!(parse(&[ESC]), Err(ParseError::Truncated(1)));
    }
}
