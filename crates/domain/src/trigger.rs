//! Probabilistic command triggers.
//!
//! Each content category owns a set of trigger rules; resolving the category
//! draws one rule proportionally to its probability. Probabilities are
//! weights, not normalized values, so `AlwaysHundred` simply dwarfs
//! `AlwaysOne` when both are present.

use serde::{Deserialize, Serialize};

use crate::game_state::GameContext;
use crate::station::CommandKind;

/// How a rule computes its probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Weight 0 - the rule never fires.
    Never,
    /// Constant weight 1.
    AlwaysOne,
    /// Constant weight 100.
    AlwaysHundred,
    /// Constant weight read from the single parameter.
    Static,
    /// Four-tier weight table indexed by the player reputation.
    ReputationAscend,
}

impl TriggerKind {
    /// Exact parameter arity this kind requires.
    pub fn param_count(&self) -> usize {
        match self {
            TriggerKind::Never | TriggerKind::AlwaysOne | TriggerKind::AlwaysHundred => 0,
            TriggerKind::Static => 1,
            TriggerKind::ReputationAscend => 4,
        }
    }
}

/// A single weighted trigger for one command kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub command: CommandKind,
    pub kind: TriggerKind,
    params: Vec<String>,
}

impl TriggerRule {
    pub fn new(command: CommandKind, kind: TriggerKind, params: Vec<String>) -> Self {
        Self {
            command,
            kind,
            params,
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Validate (and correct) the parameter count for the rule's kind.
    /// Surplus parameters are truncated, missing ones padded with empty
    /// strings. Returns true when the count was already correct.
    pub fn validate_params(&mut self) -> bool {
        let expected = self.kind.param_count();
        if self.params.len() == expected {
            return true;
        }
        self.params.resize(expected, String::new());
        false
    }

    /// The rule's selection weight. Malformed rules (wrong arity,
    /// unparseable numbers) contribute 0 and log a warning instead of
    /// failing resolution.
    pub fn probability(&self, ctx: &GameContext) -> f32 {
        if self.params.len() != self.kind.param_count() {
            tracing::warn!(
                command = ?self.command,
                kind = ?self.kind,
                expected = self.kind.param_count(),
                actual = self.params.len(),
                "trigger rule has wrong parameter count"
            );
            return 0.0;
        }

        match self.kind {
            TriggerKind::Never => 0.0,
            TriggerKind::AlwaysOne => 1.0,
            TriggerKind::AlwaysHundred => 100.0,
            TriggerKind::Static => self.parse_param(0),
            TriggerKind::ReputationAscend => self.parse_param(ctx.reputation().tier()),
        }
    }

    fn parse_param(&self, index: usize) -> f32 {
        match self.params[index].trim().parse::<f32>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    command = ?self.command,
                    kind = ?self.kind,
                    param = %self.params[index],
                    "trigger parameter is not a number"
                );
                0.0
            }
        }
    }
}
