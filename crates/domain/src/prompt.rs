//! Compiled prompts.

use serde::{Deserialize, Serialize};

use crate::station::{CommandKind, ContentCategory};

/// A command compiled against the current world state: three text blocks in
/// fixed order, ready to be shipped to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub category: ContentCategory,
    pub kind: CommandKind,
    /// General/game/station context and the cast.
    pub system: String,
    /// Objective, format constraints, avoid-list.
    pub command: String,
    /// Output-parameter instructions; empty when the command declares none.
    pub output_params: String,
}

impl Prompt {
    pub fn new(
        category: ContentCategory,
        kind: CommandKind,
        system: String,
        command: String,
        output_params: String,
    ) -> Self {
        Self {
            category,
            kind,
            system,
            command,
            output_params,
        }
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[[{}]]", self.kind.as_str().to_uppercase())?;
        if !self.system.trim().is_empty() {
            writeln!(f, "[SYSTEM]")?;
            writeln!(f, "{}", self.system)?;
        }
        if !self.command.trim().is_empty() {
            writeln!(f, "\n[COMMAND]")?;
            writeln!(f, "{}", self.command)?;
        }
        if !self.output_params.trim().is_empty() {
            writeln!(f, "\n[OUTPUTPARAMS]")?;
            writeln!(f, "{}", self.output_params)?;
        }
        Ok(())
    }
}
