//! Command templates.
//!
//! A command is the authored description of one kind of radio content: which
//! slice of game context it wants, which speaker roles it needs, and the
//! objective/format/avoid blocks that become the prompt. Commands are
//! immutable after authoring and compiled into a [`Prompt`] per invocation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game_state::{Reputation, StateKind};
use crate::prompt::Prompt;
use crate::speaker::Speaker;
use crate::station::{CommandKind, ContentCategory, Station};
use crate::weighted::{weighted_pick, Weighted};

/// Sentinel separating speaker paragraphs from the trailing output-parameter
/// list. Emitted into the prompt and parsed back out of the response by the
/// same marker.
pub const OUTPUT_PARAMS_SEPARATOR: &str = "$$$";

/// Line-anchored pattern one speaker paragraph must match:
/// `speakerLabel: "speechText"`. The same pattern text is quoted verbatim in
/// the format instructions so generation and validation stay in lockstep.
pub const SECTION_PATTERN: &str = r#"^([^:\n]+):\s*"(.+)""#;

/// Which slice of the game context a command wants in its prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSlice {
    /// State value kinds to include. Empty includes none.
    pub value_kinds: Vec<StateKind>,
    /// Number of events to include; negative means all.
    pub event_count: i32,
    /// Take the most recent events, or distribute across the whole log.
    pub recent_only: bool,
    /// Offer the previously generated content of the same command kind as
    /// context.
    pub use_command_history: bool,
}

impl Default for ContextSlice {
    fn default() -> Self {
        Self {
            value_kinds: Vec::new(),
            event_count: 3,
            recent_only: true,
            use_command_history: false,
        }
    }
}

impl ContextSlice {
    /// Whether this slice asks for any game context at all.
    pub fn wants_game_context(&self) -> bool {
        !self.value_kinds.is_empty() || self.event_count != 0
    }
}

/// Objective text with weighted `{variable}` substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Objective {
    text: String,
    variables: Vec<(String, Vec<Weighted<String>>)>,
}

impl Objective {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variables: Vec::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, options: Vec<Weighted<String>>) -> Self {
        self.variables.push((name.into(), options));
        self
    }

    /// Substitute every `{variable}` occurrence with an independent weighted
    /// draw. Unknown variables are left verbatim.
    pub fn resolve(&self, rng: &mut impl Rng) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    let options = self
                        .variables
                        .iter()
                        .find(|(n, _)| n.as_str() == name)
                        .map(|(_, options)| options);
                    match options.and_then(|options| weighted_pick(options, rng)) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Format constraints rendered into the command block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    /// Emit the base constraints (pattern, section count, no newlines,
    /// expressive language).
    pub use_base: bool,
    /// Target word count; negative disables the constraint.
    pub word_length: i32,
    /// Tell the model how to refer to the player.
    pub use_player_alias: bool,
    /// Ask for an introductory sentence leading to this subject.
    pub introduction_to: String,
    /// Ask for a closing transition into the ads section.
    pub ads_transition: bool,
    /// Free-form extra constraints, one bullet each.
    pub custom: Vec<String>,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            use_base: true,
            word_length: 80,
            use_player_alias: true,
            introduction_to: String::new(),
            ads_transition: true,
            custom: Vec::new(),
        }
    }
}

impl Format {
    pub fn render(&self, sections: usize, reputation: Reputation) -> String {
        let mut lines = Vec::new();
        if self.use_base {
            lines.push(format!(
                "* the output must match the regex {SECTION_PATTERN} where for each speaker paragraph a speaker name and speaker text group can be extracted"
            ));
            lines.push(format!(
                "* the output must have exactly {sections} speaker paragraph{}",
                if sections > 1 { "s" } else { "" }
            ));
            lines.push("* speaker text must not contain new lines, line breaks or '\\n'".into());
            lines.push("* use expressive language".into());
        }
        if self.word_length > -1 {
            lines.push(format!(
                "* the output should have {} words (excluding output parameters)",
                self.word_length
            ));
        }
        if self.use_player_alias {
            lines.push(format!(
                "* the player name/alias is {}",
                reputation.player_alias()
            ));
        }
        if !self.introduction_to.trim().is_empty() {
            lines.push(format!(
                "* speaker text should start with an introductory sentence leading to the {}",
                self.introduction_to
            ));
        }
        if self.ads_transition {
            lines.push(
                "* speaker text should end with a transition to the radio ads section coming up next"
                    .into(),
            );
        }
        for line in &self.custom {
            lines.push(format!("* {line}"));
        }
        lines.join("\n")
    }
}

/// Things the model must steer clear of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avoid {
    pub template_strings: bool,
    pub sponsor_negatives: bool,
    pub player_term: bool,
    pub custom: Vec<String>,
}

impl Default for Avoid {
    fn default() -> Self {
        Self {
            template_strings: true,
            sponsor_negatives: true,
            player_term: true,
            custom: Vec::new(),
        }
    }
}

impl Avoid {
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if self.template_strings {
            lines.push("* avoid template strings but use proper values".to_string());
        }
        if self.sponsor_negatives {
            lines.push("* avoid negative opinions about the sponsors".to_string());
        }
        if self.player_term {
            lines.push("* avoid the word 'player' but use the alias".to_string());
        }
        for line in &self.custom {
            lines.push(format!("* {line}"));
        }
        lines.join("\n")
    }
}

/// External inputs needed to compile a command into a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    /// World/tone blurb shared by every command (from configuration).
    pub general_context: &'a str,
    /// Pre-rendered game context slice (empty when the command wants none).
    pub game_context: &'a str,
    /// Previously generated text of the same command kind, if any.
    pub command_history: Option<&'a str>,
    /// Current player reputation, for aliasing and dynamic moods.
    pub reputation: Reputation,
}

/// An authored command template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub category: ContentCategory,
    pub kind: CommandKind,
    pub context_slice: ContextSlice,
    pub roles: Vec<crate::speaker::SpeakerRole>,
    pub objective: Objective,
    pub format: Format,
    pub avoid: Avoid,
    /// Output parameters: key and the instruction telling the model what to
    /// put there (e.g. `gender` -> `male or female`).
    pub output_params: Vec<(String, String)>,
}

impl Command {
    pub fn new(category: ContentCategory, kind: CommandKind) -> Self {
        Self {
            category,
            kind,
            context_slice: ContextSlice::default(),
            roles: Vec::new(),
            objective: Objective::default(),
            format: Format::default(),
            avoid: Avoid::default(),
            output_params: Vec::new(),
        }
    }

    pub fn with_context_slice(mut self, slice: ContextSlice) -> Self {
        self.context_slice = slice;
        self
    }

    pub fn with_roles(mut self, roles: Vec<crate::speaker::SpeakerRole>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_avoid(mut self, avoid: Avoid) -> Self {
        self.avoid = avoid;
        self
    }

    pub fn with_output_param(
        mut self,
        key: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        self.output_params.push((key.into(), instruction.into()));
        self
    }

    /// Compile into the three prompt blocks. `speakers` must align with
    /// `self.roles` by index.
    pub fn compile(
        &self,
        station: &Station,
        speakers: &[Speaker],
        inputs: &PromptInputs<'_>,
        rng: &mut impl Rng,
    ) -> Prompt {
        // SYSTEM: broad to narrow - world, game state, history, station, cast.
        let mut system: Vec<String> = Vec::new();
        if !inputs.general_context.trim().is_empty() {
            system.push(format!("General context:\n{}", inputs.general_context));
        }
        if !inputs.game_context.trim().is_empty() {
            system.push(format!("Game context:\n{}", inputs.game_context));
        }
        if self.context_slice.use_command_history {
            if let Some(history) = inputs.command_history.filter(|h| !h.trim().is_empty()) {
                system.push(format!("Command context:\n{history}"));
            }
        }
        system.push(format!(
            "Radio station context:\n* name: {}\n* info: {}",
            station.name(),
            station.station_context()
        ));

        let mut roles_block = vec!["Role(s):".to_string()];
        for (i, (role, speaker)) in self.roles.iter().zip(speakers).enumerate() {
            let mut line = format!("{}. {}", i + 1, role.description());
            if !speaker.name.is_empty() {
                line.push_str(&format!(" called {}", speaker.name));
            }
            if !speaker.background.is_empty() {
                line.push_str(&format!(". {}", speaker.background));
            }
            roles_block.push(line);
        }
        system.push(roles_block.join("\n"));

        let mut moods_block = vec!["Role Mood(s):".to_string()];
        for (i, speaker) in speakers.iter().enumerate() {
            let mood = speaker
                .dynamic_mood
                .resolve(&speaker.static_mood, inputs.reputation);
            if speaker.name.is_empty() {
                moods_block.push(format!("{}. role is {mood}", i + 1));
            } else {
                moods_block.push(format!("{}. {} is {mood}", i + 1, speaker.name));
            }
        }
        system.push(moods_block.join("\n"));

        // COMMAND: objective, format, avoid-list.
        let command = [
            format!("Objective:\n{}", self.objective.resolve(rng)),
            format!(
                "Format:\n{}",
                self.format.render(self.roles.len(), inputs.reputation)
            ),
            format!("Things to avoid:\n{}", self.avoid.render()),
        ]
        .join("\n");

        // OUTPUT PARAMS: sentinel followed by `key: instruction` pairs.
        let output_params = if self.output_params.is_empty() {
            String::new()
        } else {
            let pairs: Vec<String> = self
                .output_params
                .iter()
                .map(|(key, instruction)| format!("{key}: {instruction}"))
                .collect();
            format!(
                "At the very end of the output (after all speaker paragraphs) append exactly '{}{}'",
                OUTPUT_PARAMS_SEPARATOR,
                pairs.join(",")
            )
        };

        Prompt::new(
            self.category,
            self.kind,
            system.join("\n"),
            command,
            output_params,
        )
    }
}
