//! # IR Commands
//!
//! The intermediate representation between a laid-out receipt and raw
//! ESC/POS bytes. Each [`ProtocolCommand`] is one atomic printer operation,
//! so tests can assert on structure instead of byte offsets:
//!
//! ```text
//! Blocks → Program (inspectable) → Optimizer → Codegen → Bytes
//! ```

use crate::render::pack::PackedRaster;

pub use crate::protocol::commands::{Alignment, CutMode};

/// Printer state tracked by the optimizer.
///
/// `codepage` is `None` after `Init`: the power-on table is set by DIP
/// switch or NV memory, so the first explicit selection is never redundant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleState {
    pub alignment: Alignment,
    pub bold: bool,
    pub codepage: Option<u8>,
}

/// One printer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCommand {
    /// Reset to power-on state (ESC @).
    Init,

    /// Justification for the following lines and raster blocks.
    SetAlign(Alignment),

    SetBold(bool),

    /// Select a character table by its `ESC t` slot.
    SetCodepage(u8),

    /// Bytes already transcoded into the selected code page. Never contains
    /// control bytes.
    Text(Vec<u8>),

    /// Print the line buffer and advance one line.
    LineFeed,

    /// Monochrome raster upload.
    RasterImage(PackedRaster),

    /// Feed `n` lines (ESC d n).
    Feed(u8),

    Cut(CutMode),
}

/// An ordered command sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub commands: Vec<ProtocolCommand>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program starting with `Init`.
    pub fn with_init() -> Self {
        Self {
            commands: vec![ProtocolCommand::Init],
        }
    }

    pub fn push(&mut self, command: ProtocolCommand) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, commands: impl IntoIterator<Item = ProtocolCommand>) {
        self.commands.extend(commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolCommand> {
        self.commands.iter()
    }

    pub fn last(&self) -> Option<&ProtocolCommand> {
        self.commands.last()
    }

    /// Number of commands matching `pred`.
    pub fn count(&self, pred: impl Fn(&ProtocolCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    /// Raster blocks in program order.
    pub fn rasters(&self) -> impl Iterator<Item = &PackedRaster> {
        self.commands.iter().filter_map(|c| match c {
            ProtocolCommand::RasterImage(raster) => Some(raster),
            _ => None,
        })
    }
}

impl FromIterator<ProtocolCommand> for Program {
    fn from_iter<T: IntoIterator<Item = ProtocolCommand>>(iter: T) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Program {
    type Item = ProtocolCommand;
    type IntoIter = std::vec::IntoIter<ProtocolCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a ProtocolCommand;
    type IntoIter = std::slice::Iter<'a, ProtocolCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_with_init() {
        let program = Program::with_init();
        assert_eq!(program.len(), 1);
        assert_eq!(program.commands[0], ProtocolCommand::Init);
    }

    #[test]
    fn test_program_count_and_last() {
        let mut program = Program::with_init();
        program.push(ProtocolCommand::SetCodepage(0));
        program.push(ProtocolCommand::Text(b"STORE".to_vec()));
        program.push(ProtocolCommand::LineFeed);
        program.push(ProtocolCommand::Cut(CutMode::Full));

        assert_eq!(
            program.count(|c| matches!(c, ProtocolCommand::SetCodepage(_))),
            1
        );
        assert_eq!(program.last(), Some(&ProtocolCommand::Cut(CutMode::Full)));
        assert_eq!(program.rasters().count(), 0);
    }

    #[test]
    fn test_style_state_default() {
        let state = StyleState::default();
        assert_eq!(state.alignment, Alignment::Left);
        assert!(!state.bold);
        assert_eq!(state.codepage, None);
    }
}
