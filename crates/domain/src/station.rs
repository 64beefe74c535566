//! Radio stations.
//!
//! A station bundles its speaker pool, the per-category trigger rules and
//! the weighted command pool. All lookups are weighted-random draws so the
//! same station produces varied casts and commands over time.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::game_state::GameContext;
use crate::speaker::{Speaker, SpeakerRole};
use crate::trigger::TriggerRule;
use crate::weighted::{weighted_pick_by, Weighted};

/// Broad station archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationKind {
    Commercial,
    PublicService,
    Pirate,
}

/// Content category requested by the playback layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentCategory {
    News,
    Story,
    Interview,
    Ads,
}

impl ContentCategory {
    /// How many cached audio sections an offline answer needs. Ads always
    /// come in pairs (spot plus host tagline).
    pub fn offline_sections(&self) -> usize {
        match self {
            ContentCategory::Ads => 2,
            _ => 1,
        }
    }
}

/// Concrete command template kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    RandomNews,
    PlayerNews,
    Story,
    Interview,
    InterviewAboutPlayer,
    Ad,
    BreakingNews,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::RandomNews => "RandomNews",
            CommandKind::PlayerNews => "PlayerNews",
            CommandKind::Story => "Story",
            CommandKind::Interview => "Interview",
            CommandKind::InterviewAboutPlayer => "InterviewAboutPlayer",
            CommandKind::Ad => "Ad",
            CommandKind::BreakingNews => "BreakingNews",
        }
    }

    /// Lowercase form used inside cache routes.
    pub fn as_route(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default command weight when a command is absent from the pool.
pub(crate) const DEFAULT_COMMAND_WEIGHT: f32 = 100.0;

/// A radio station and everything it can put on air.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub kind: StationKind,
    name: String,
    station_context: String,
    speakers: Vec<Weighted<(SpeakerRole, Speaker)>>,
    triggers: Vec<(ContentCategory, Vec<TriggerRule>)>,
    commands: Vec<Weighted<Command>>,
}

impl Station {
    pub fn new(
        kind: StationKind,
        name: impl Into<String>,
        station_context: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            station_context: station_context.into(),
            speakers: Vec::new(),
            triggers: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn station_context(&self) -> &str {
        &self.station_context
    }

    pub fn with_speaker(mut self, role: SpeakerRole, speaker: Speaker, weight: f32) -> Self {
        self.speakers.push(Weighted::new((role, speaker), weight));
        self
    }

    pub fn with_trigger_rules(
        mut self,
        category: ContentCategory,
        rules: Vec<TriggerRule>,
    ) -> Self {
        self.triggers.push((category, rules));
        self
    }

    pub fn with_command(mut self, command: Command, weight: f32) -> Self {
        self.commands.push(Weighted::new(command, weight));
        self
    }

    /// Weighted draw among the speakers filling `role`.
    pub fn speaker_for_role(&self, role: SpeakerRole, rng: &mut impl Rng) -> Option<&Speaker> {
        weighted_pick_by(&self.speakers, |(r, _)| *r == role, rng).map(|(_, speaker)| speaker)
    }

    /// Weighted draw among the commands of `kind`.
    pub fn command_for_kind(&self, kind: CommandKind, rng: &mut impl Rng) -> Option<&Command> {
        weighted_pick_by(&self.commands, |c| c.kind == kind, rng)
    }

    /// The pool weight of `kind`, used in cache routes. Falls back to the
    /// default weight when the station does not carry the command.
    pub fn command_weight(&self, kind: CommandKind) -> f32 {
        self.commands
            .iter()
            .find(|w| w.item.kind == kind)
            .map(|w| w.weight)
            .unwrap_or(DEFAULT_COMMAND_WEIGHT)
    }

    pub fn supports_command(&self, kind: CommandKind) -> bool {
        self.commands.iter().any(|w| w.item.kind == kind)
    }

    /// Resolve which command kind fires for `category`.
    ///
    /// Walks the category's trigger rules accumulating probabilities against
    /// a uniform draw in `[0, sum)`. Returns `None` when the category has no
    /// rules or the probabilities sum to zero.
    pub fn resolve_category(
        &self,
        category: ContentCategory,
        ctx: &GameContext,
        rng: &mut impl Rng,
    ) -> Option<CommandKind> {
        let rules = self
            .triggers
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, rules)| rules)?;

        let total: f32 = rules.iter().map(|r| r.probability(ctx).abs()).sum();
        if total <= 0.0 {
            return None;
        }

        let draw = rng.gen_range(0.0..total);
        let mut acc = 0.0;
        for rule in rules {
            acc += rule.probability(ctx);
            if draw < acc {
                return Some(rule.command);
            }
        }
        None
    }
}
