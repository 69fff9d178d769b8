//! Receipt handed to a host-side renderer instead of raw device bytes.
//!
//! The host (print spooler driver, or a dialog) shapes and orders text
//! itself, so a document carries logical Unicode text and layout hints only.

use crate::receipt::layout::fit_columns;
use crate::receipt::{Block, TextAlign};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDocument {
    pub title: String,
    pub blocks: Vec<Block>,
    /// Character cells per line used by [`HostDocument::to_text`].
    pub columns: usize,
}

impl HostDocument {
    pub fn new(title: impl Into<String>, blocks: Vec<Block>, columns: usize) -> Self {
        Self {
            title: title.into(),
            blocks,
            columns,
        }
    }

    /// Plain UTF-8 rendering, one line per row, in logical order.
    pub fn to_text(&self) -> String {
        let width = self.columns.max(1);
        let mut out = String::new();
        for block in &self.blocks {
            let line = match block {
                Block::Line { text, align, .. } => pad(text, *align, width),
                Block::Columns { left, right, .. } => fit_columns(left, right, width),
                Block::Divider(ch) => ch.to_string().repeat(width),
                Block::Blank => String::new(),
            };
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, align: TextAlign, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let slack = width - len;
    match align {
        TextAlign::Start => text.to_string(),
        TextAlign::Center => format!("{}{text}", " ".repeat(slack / 2)),
        TextAlign::End => format!("{}{text}", " ".repeat(slack)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_text() {
        let doc = HostDocument::new(
            "receipt",
            vec![
                Block::line("SHOP", TextAlign::Center).bold(),
                Block::Divider('-'),
                Block::columns("Tax", "0.50"),
                Block::Blank,
                Block::line("1", TextAlign::End),
            ],
            10,
        );
        assert_eq!(doc.to_text(), "   SHOP\n----------\nTax   0.50\n\n         1\n");
    }

    #[test]
    fn test_arabic_stays_logical() {
        let doc = HostDocument::new("r", vec![Block::line("تفاح", TextAlign::Start)], 32);
        assert_eq!(doc.to_text(), "تفاح\n");
    }
}
