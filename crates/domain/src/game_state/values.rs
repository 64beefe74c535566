//! Game state values.
//!
//! A closed set of continuously recomputed state values. Registration order
//! matters: values later in the registry may read values already updated in
//! the same tick (reputation derives from progression).

use serde::{Deserialize, Serialize};

/// Identifies a state value kind inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    PlayerProgression,
    PlayerReputation,
    Intensity,
}

/// How widely known the player has become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Reputation {
    #[default]
    Unknown,
    Noticed,
    Named,
    Famous,
}

impl Reputation {
    pub fn all() -> [Reputation; 4] {
        [
            Reputation::Unknown,
            Reputation::Noticed,
            Reputation::Named,
            Reputation::Famous,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reputation::Unknown => "Unknown",
            Reputation::Noticed => "Noticed",
            Reputation::Named => "Named",
            Reputation::Famous => "Famous",
        }
    }

    /// Index into four-tier trigger/mood parameter tables.
    pub fn tier(&self) -> usize {
        match self {
            Reputation::Unknown => 0,
            Reputation::Noticed => 1,
            Reputation::Named => 2,
            Reputation::Famous => 3,
        }
    }

    /// How broadcasts refer to the player at this reputation.
    pub fn player_alias(&self) -> &'static str {
        match self {
            Reputation::Unknown => "unknown person",
            Reputation::Noticed => "a random name (make up a mysterious name)",
            Reputation::Named | Reputation::Famous => "The Phantom",
        }
    }
}

/// Broad audio intensity level, set by the world simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Intensity {
    #[default]
    MenuLow,
    MenuHigh,
    OverworldLow,
    OverworldHigh,
    Instance,
}

/// Inputs the world simulation feeds into each update tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldInputs {
    pub progress_points: u32,
    pub total_progress_points: u32,
}

/// The current payload of a state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateData {
    Progression { percent: u8 },
    Reputation { level: Reputation },
    Intensity { level: Intensity },
}

/// A registered state value: payload plus a freeze flag for debugging and
/// offline cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateValue {
    pub frozen: bool,
    pub data: StateData,
}

impl StateValue {
    pub fn progression() -> Self {
        Self {
            frozen: false,
            data: StateData::Progression { percent: 0 },
        }
    }

    pub fn reputation(level: Reputation) -> Self {
        Self {
            frozen: false,
            data: StateData::Reputation { level },
        }
    }

    pub fn intensity(level: Intensity) -> Self {
        Self {
            frozen: false,
            data: StateData::Intensity { level },
        }
    }

    pub fn kind(&self) -> StateKind {
        match self.data {
            StateData::Progression { .. } => StateKind::PlayerProgression,
            StateData::Reputation { .. } => StateKind::PlayerReputation,
            StateData::Intensity { .. } => StateKind::Intensity,
        }
    }

    /// Recompute from the world inputs and the values already updated this
    /// tick. Frozen values are left untouched. Returns true when the payload
    /// changed.
    pub fn update(&mut self, inputs: &WorldInputs, earlier: &[StateValue]) -> bool {
        if self.frozen {
            return false;
        }

        let next = match self.data {
            StateData::Progression { .. } => {
                let percent = if inputs.total_progress_points == 0 {
                    0
                } else {
                    let ratio =
                        inputs.progress_points as f32 / inputs.total_progress_points as f32;
                    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
                };
                StateData::Progression { percent }
            }
            StateData::Reputation { level } => {
                let percent = earlier.iter().find_map(|v| match v.data {
                    StateData::Progression { percent } => Some(percent),
                    _ => None,
                });
                let level = match percent {
                    Some(p) if p <= 15 => Reputation::Unknown,
                    Some(p) if p <= 50 => Reputation::Noticed,
                    Some(p) if p <= 75 => Reputation::Named,
                    Some(_) => Reputation::Famous,
                    None => level,
                };
                StateData::Reputation { level }
            }
            // Intensity is pushed from the world, not derived.
            StateData::Intensity { level } => StateData::Intensity { level },
        };

        let changed = next != self.data;
        self.data = next;
        changed
    }

    /// Textual description for prompt context. Only reputation is worth
    /// telling the generation service about.
    pub fn render_text(&self) -> Option<String> {
        match self.data {
            StateData::Reputation { level } => {
                Some(format!("Player reputation: {}", level.as_str()))
            }
            _ => None,
        }
    }

    /// Route fragment for the offline cache key. Only reputation
    /// participates in cache routing.
    pub fn route_fragment(&self) -> Option<String> {
        match self.data {
            StateData::Reputation { level } => {
                Some(format!("/reputation${}", level.as_str().to_lowercase()))
            }
            _ => None,
        }
    }

    /// All what-if variants of this value, for pre-rendering offline cache
    /// content against every state the live game could be in. Only
    /// reputation enumerates variants.
    pub fn offline_states(&self) -> Vec<StateValue> {
        match self.data {
            StateData::Reputation { .. } => Reputation::all()
                .into_iter()
                .map(StateValue::reputation)
                .collect(),
            _ => Vec::new(),
        }
    }
}
