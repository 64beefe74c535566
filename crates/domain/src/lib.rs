//! Skywave Domain library.
//!
//! Pure domain types for the dynamic radio broadcast engine:
//!
//! - `game_state/` - Game state values, the event log, and text/route rendering
//! - `station` - Radio stations with their speaker, trigger and command pools
//! - `command` - Prompt templates (objective, format, avoid-list, output params)
//! - `trigger` - Probabilistic command selection rules
//! - `speaker` - Radio speakers, moods and voice settings
//! - `content` - The content result aggregate consumed by playback
//! - `error` - The failure taxonomy carried as data on results
//!
//! No IO lives here. Randomness is injected (`&mut impl Rng`) so that every
//! selection is deterministic under a seeded RNG in tests.

pub mod command;
pub mod content;
pub mod error;
pub mod game_state;
pub mod prompt;
pub mod speaker;
pub mod station;
pub mod trigger;
pub mod weighted;

pub use command::{Avoid, Command, ContextSlice, Format, Objective, PromptInputs, OUTPUT_PARAMS_SEPARATOR, SECTION_PATTERN};
pub use content::RadioContent;
pub use error::ContentError;
pub use game_state::{
    BillboardInfo, BillboardKind, ChaseCause, District, GameContext, GameEvent, Importance,
    Intensity, Reputation, StateChange, StateData, StateKind, StateValue, WorldInputs,
};
pub use prompt::Prompt;
pub use speaker::{DynamicMood, DynamicMoodKind, Speaker, SpeakerRole, VoiceSettings};
pub use station::{ContentCategory, CommandKind, Station, StationKind};
pub use trigger::{TriggerKind, TriggerRule};
pub use weighted::{weighted_pick, weighted_pick_by, Weighted};
