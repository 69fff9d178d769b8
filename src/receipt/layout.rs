//! # Receipt Layout
//!
//! Turns a [`Receipt`] into a flat list of logical [`Block`]s. Every render
//! strategy prints from the same blocks, so a fallback never changes what
//! is on the paper, only how it gets there.
//!
//! Alignment is logical: [`TextAlign::Start`] is the left edge for
//! left-to-right text and the right edge for right-to-left text.

use rust_decimal::Decimal;

use super::Receipt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// One paragraph; wraps when wider than the paper.
    Line {
        text: String,
        align: TextAlign,
        bold: bool,
    },
    /// Label at the start edge, value at the end edge.
    Columns {
        left: String,
        right: String,
        bold: bool,
    },
    /// A rule drawn across the full width.
    Divider(char),
    Blank,
}

impl Block {
    pub fn line(text: impl Into<String>, align: TextAlign) -> Self {
        Block::Line {
            text: text.into(),
            align,
            bold: false,
        }
    }

    pub fn columns(left: impl Into<String>, right: impl Into<String>) -> Self {
        Block::Columns {
            left: left.into(),
            right: right.into(),
            bold: false,
        }
    }

    pub fn bold(self) -> Self {
        match self {
            Block::Line { text, align, .. } => Block::Line {
                text,
                align,
                bold: true,
            },
            Block::Columns { left, right, .. } => Block::Columns {
                left,
                right,
                bold: true,
            },
            other => other,
        }
    }

    /// Text content of this block, if any.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Block::Line { text, .. } => vec![text.as_str()],
            Block::Columns { left, right, .. } => vec![left.as_str(), right.as_str()],
            Block::Divider(_) | Block::Blank => Vec::new(),
        }
    }
}

fn amount(value: &Decimal, currency: Option<&str>) -> String {
    match currency {
        Some(label) => format!("{value} {label}"),
        None => value.to_string(),
    }
}

/// Lay out `receipt` as blocks, header first.
pub fn layout(receipt: &Receipt) -> Vec<Block> {
    let currency = receipt.currency();
    let labels = receipt.labels();
    let totals = receipt.totals();

    let mut blocks = vec![Block::line(&receipt.header().store_name, TextAlign::Center).bold()];
    blocks.extend(
        receipt
            .header()
            .address
            .iter()
            .map(|line| Block::line(line, TextAlign::Center)),
    );
    if let Some(timestamp) = receipt.timestamp() {
        blocks.push(Block::line(timestamp, TextAlign::Center));
    }

    blocks.push(Block::Blank);
    blocks.push(Block::Divider('='));
    blocks.push(Block::line(&labels.items, TextAlign::Center).bold());
    blocks.push(Block::Divider('='));

    for item in receipt.items() {
        blocks.push(Block::line(&item.name, TextAlign::Start));
        blocks.push(Block::columns(
            format!("{} x {}", item.quantity, item.unit_price),
            amount(&item.line_total, currency),
        ));
    }

    blocks.push(Block::Divider('-'));
    blocks.push(Block::columns(&labels.subtotal, amount(&totals.subtotal, currency)));
    blocks.push(Block::columns(&labels.tax, amount(&totals.tax, currency)));
    if let Some(discount) = &totals.discount {
        blocks.push(Block::columns(&labels.discount, amount(discount, currency)));
    }
    blocks.push(Block::Divider('='));
    blocks.push(Block::columns(&labels.total, amount(&totals.total, currency)).bold());
    blocks.push(Block::Divider('='));

    if !receipt.footer().is_empty() {
        blocks.push(Block::Blank);
        blocks.extend(
            receipt
                .footer()
                .iter()
                .map(|line| Block::line(line, TextAlign::Center)),
        );
    }

    blocks
}

/// Fit `left` and `right` into one line of `width` character cells.
///
/// When both do not fit, they are separated by a single space and the
/// printer wraps the remainder.
pub fn fit_columns(left: &str, right: &str, width: usize) -> String {
    let lw = left.chars().count();
    let rw = right.chars().count();

    if lw + rw >= width {
        format!("{left} {right}")
    } else {
        format!("{left}{}{right}", " ".repeat(width - lw - rw))
    }
}
