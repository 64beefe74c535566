//! Radio speakers: roles, moods and voice configuration.

use serde::{Deserialize, Serialize};

use crate::game_state::Reputation;

/// The role a speaker fills within a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerRole {
    Host,
    Ads,
    InterviewGeneric,
    InterviewMayor,
}

impl SpeakerRole {
    /// Role description used in prompt assembly.
    pub fn description(&self) -> &'static str {
        match self {
            SpeakerRole::Host => "a radio station host",
            SpeakerRole::Ads => "a radio ads speaker",
            SpeakerRole::InterviewGeneric => "an interview partner",
            SpeakerRole::InterviewMayor => "the mayor of the city",
        }
    }
}

/// Voice tuning parameters sent with each synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl VoiceSettings {
    pub const DEFAULT_STABILITY: f32 = 0.1;
    pub const DEFAULT_SIMILARITY_BOOST: f32 = 0.9;
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: Self::DEFAULT_STABILITY,
            similarity_boost: Self::DEFAULT_SIMILARITY_BOOST,
        }
    }
}

/// How a speaker's mood is resolved at prompt time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DynamicMoodKind {
    /// Always use the static mood.
    #[default]
    StaticOnly,
    /// Four-tier mood table indexed by the player reputation. The literal
    /// `static` inside a tier is replaced with the static mood.
    ReputationShift,
}

impl DynamicMoodKind {
    pub fn param_count(&self) -> usize {
        match self {
            DynamicMoodKind::StaticOnly => 0,
            DynamicMoodKind::ReputationShift => 4,
        }
    }
}

/// Mood resolution rule with the same self-healing parameter validation as
/// trigger rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DynamicMood {
    pub kind: DynamicMoodKind,
    params: Vec<String>,
}

impl DynamicMood {
    pub fn new(kind: DynamicMoodKind, params: Vec<String>) -> Self {
        Self { kind, params }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Validate (and correct) the parameter count. Returns true when the
    /// count was already correct.
    pub fn validate_params(&mut self) -> bool {
        let expected = self.kind.param_count();
        if self.params.len() == expected {
            return true;
        }
        self.params.resize(expected, String::new());
        false
    }

    /// Resolve the mood for the current reputation. Falls back to the static
    /// mood when the rule is malformed.
    pub fn resolve(&self, static_mood: &str, reputation: Reputation) -> String {
        if self.params.len() != self.kind.param_count() {
            tracing::warn!(
                kind = ?self.kind,
                expected = self.kind.param_count(),
                actual = self.params.len(),
                "dynamic mood has wrong parameter count"
            );
            return static_mood.to_string();
        }

        match self.kind {
            DynamicMoodKind::StaticOnly => static_mood.to_string(),
            DynamicMoodKind::ReputationShift => {
                self.params[reputation.tier()].replace("static", static_mood)
            }
        }
    }
}

/// A radio speaker with prompt persona and voice configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub static_mood: String,
    pub dynamic_mood: DynamicMood,
    pub background: String,
    pub voice_name: String,
    pub voice_settings: VoiceSettings,
    pub backup_voice_name: String,
    pub backup_voice_settings: VoiceSettings,
}

impl Speaker {
    pub fn new(name: impl Into<String>, static_mood: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            static_mood: static_mood.into(),
            dynamic_mood: DynamicMood::default(),
            background: String::new(),
            voice_name: String::new(),
            voice_settings: VoiceSettings::default(),
            backup_voice_name: String::new(),
            backup_voice_settings: VoiceSettings::default(),
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_voice(mut self, voice_name: impl Into<String>, settings: VoiceSettings) -> Self {
        self.voice_name = voice_name.into();
        self.voice_settings = settings;
        self
    }

    pub fn with_backup_voice(
        mut self,
        voice_name: impl Into<String>,
        settings: VoiceSettings,
    ) -> Self {
        self.backup_voice_name = voice_name.into();
        self.backup_voice_settings = settings;
        self
    }

    pub fn with_dynamic_mood(mut self, mood: DynamicMood) -> Self {
        self.dynamic_mood = mood;
        self
    }
}
