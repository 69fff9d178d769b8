//! # IR Optimizer
//!
//! Passes that drop commands which cannot change printer state.
//!
//! 1. **Remove redundant init**: only the first `Init` is kept
//! 2. **Remove redundant styles**: `SetAlign`/`SetBold`/`SetCodepage` that
//!    repeat the current state are dropped
//! 3. **Merge adjacent text**: consecutive `Text` runs become one

use super::ops::{Program, ProtocolCommand, StyleState};

impl Program {
    /// Apply all optimization passes.
    pub fn optimize(self) -> Self {
        let commands = self.commands;
        let commands = remove_redundant_init(commands);
        let commands = remove_redundant_styles(commands);
        let commands = merge_adjacent_text(commands);
        Program { commands }
    }
}

fn remove_redundant_init(commands: Vec<ProtocolCommand>) -> Vec<ProtocolCommand> {
    let mut seen_init = false;
    commands
        .into_iter()
        .filter(|command| {
            if matches!(command, ProtocolCommand::Init) {
                if seen_init {
                    return false;
                }
                seen_init = true;
            }
            true
        })
        .collect()
}

fn remove_redundant_styles(commands: Vec<ProtocolCommand>) -> Vec<ProtocolCommand> {
    let mut result = Vec::with_capacity(commands.len());
    let mut state = StyleState::default();

    for command in commands {
        match &command {
            ProtocolCommand::Init => {
                state = StyleState::default();
                result.push(command);
            }
            ProtocolCommand::SetAlign(alignment) => {
                if *alignment != state.alignment {
                    state.alignment = *alignment;
                    result.push(command);
                }
            }
            ProtocolCommand::SetBold(bold) => {
                if *bold != state.bold {
                    state.bold = *bold;
                    result.push(command);
                }
            }
            ProtocolCommand::SetCodepage(slot) => {
                if state.codepage != Some(*slot) {
                    state.codepage = Some(*slot);
                    result.push(command);
                }
            }
            _ => result.push(command),
        }
    }

    result
}

fn merge_adjacent_text(commands: Vec<ProtocolCommand>) -> Vec<ProtocolCommand> {
    let mut result = Vec::with_capacity(commands.len());
    let mut pending: Option<Vec<u8>> = None;

    for command in commands {
        match command {
            ProtocolCommand::Text(bytes) => match pending {
                Some(ref mut run) => run.extend(bytes),
                None => pending = Some(bytes),
            },
            other => {
                if let Some(run) = pending.take() {
                    result.push(ProtocolCommand::Text(run));
                }
                result.push(other);
            }
        }
    }

    if let Some(run) = pending {
        result.push(ProtocolCommand::Text(run));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Alignment;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> ProtocolCommand {
        ProtocolCommand::Text(s.as_bytes().to_vec())
    }

    #[test]
    fn test_remove_redundant_init() {
        let result = remove_redundant_init(vec![
            ProtocolCommand::Init,
            text("a"),
            ProtocolCommand::Init,
            text("b"),
        ]);
        assert_eq!(result, vec![ProtocolCommand::Init, text("a"), text("b")]);
    }

    #[test]
    fn test_defaults_after_init_are_dropped() {
        let result = remove_redundant_styles(vec![
            ProtocolCommand::Init,
            ProtocolCommand::SetAlign(Alignment::Left),
            ProtocolCommand::SetBold(false),
            text("text"),
        ]);
        assert_eq!(result, vec![ProtocolCommand::Init, text("text")]);
    }

    #[test]
    fn test_first_codepage_is_always_kept() {
        let result = remove_redundant_styles(vec![
            ProtocolCommand::Init,
            ProtocolCommand::SetCodepage(0),
            text("a"),
            ProtocolCommand::SetCodepage(0),
            text("b"),
            ProtocolCommand::SetCodepage(16),
        ]);
        assert_eq!(
            result,
            vec![
                ProtocolCommand::Init,
                ProtocolCommand::SetCodepage(0),
                text("a"),
                text("b"),
                ProtocolCommand::SetCodepage(16),
            ]
        );
    }

    #[test]
    fn test_alignment_changes_survive() {
        let result = remove_redundant_styles(vec![
            ProtocolCommand::Init,
            ProtocolCommand::SetAlign(Alignment::Center),
            ProtocolCommand::SetAlign(Alignment::Center),
            text("centered"),
            ProtocolCommand::SetAlign(Alignment::Left),
            ProtocolCommand::SetAlign(Alignment::Left),
        ]);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_merge_text_interrupted_by_line_feed() {
        let result = merge_adjacent_text(vec![
            text("Line "),
            text("1"),
            ProtocolCommand::LineFeed,
            text("Line 2"),
        ]);
        assert_eq!(
            result,
            vec![text("Line 1"), ProtocolCommand::LineFeed, text("Line 2")]
        );
    }

    #[test]
    fn test_full_optimization() {
        let program: Program = [
            ProtocolCommand::Init,
            ProtocolCommand::Init,
            ProtocolCommand::SetCodepage(16),
            ProtocolCommand::SetBold(false),
            ProtocolCommand::SetAlign(Alignment::Center),
            ProtocolCommand::SetAlign(Alignment::Center),
            text("Hello"),
            text(" World"),
            ProtocolCommand::LineFeed,
            ProtocolCommand::SetCodepage(16),
            ProtocolCommand::SetBold(true),
            text("Bold"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            program.optimize().commands,
            vec![
                ProtocolCommand::Init,
                ProtocolCommand::SetCodepage(16),
                ProtocolCommand::SetAlign(Alignment::Center),
                text("Hello World"),
                ProtocolCommand::LineFeed,
                ProtocolCommand::SetBold(true),
                text("Bold"),
            ]
        );
    }
}
