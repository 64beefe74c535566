//! Environment-backed runtime configuration.
//!
//! The configuration surface the pipeline consumes: service endpoints,
//! models, credentials, timeouts, the probe interval and the operator's
//! target mode. Values come from the environment with sensible defaults;
//! the binary loads a `.env` file first via `dotenvy`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::Mode;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TTS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";

/// Generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// World/tone blurb prefixed to every prompt.
    pub general_context: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: String::new(),
            temperature: 1.0,
            max_tokens: 512,
            general_context: String::new(),
        }
    }
}

/// Synthesis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    /// Per-request timeout for every remote call, in seconds.
    pub request_timeout_secs: u64,
    /// How often the mode probe re-runs, in seconds.
    pub probe_interval_secs: u64,
    /// The mode the operator wants; the probe decides what is reachable.
    pub target_mode: Mode,
    /// Root directory of the offline audio store.
    pub cache_root: PathBuf,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            tts: TtsSettings::default(),
            request_timeout_secs: 30,
            probe_interval_secs: 30,
            target_mode: Mode::Offline,
            cache_root: PathBuf::from("radio_audio_db"),
        }
    }
}

impl ApiSettings {
    /// Read configuration from `SKYWAVE_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm: LlmSettings {
                base_url: env_or("SKYWAVE_LLM_BASE_URL", defaults.llm.base_url),
                model: env_or("SKYWAVE_LLM_MODEL", defaults.llm.model),
                api_key: env_or("SKYWAVE_LLM_API_KEY", defaults.llm.api_key),
                temperature: env_parsed("SKYWAVE_LLM_TEMPERATURE", defaults.llm.temperature),
                max_tokens: env_parsed("SKYWAVE_LLM_MAX_TOKENS", defaults.llm.max_tokens),
                general_context: env_or(
                    "SKYWAVE_LLM_GENERAL_CONTEXT",
                    defaults.llm.general_context,
                ),
            },
            tts: TtsSettings {
                base_url: env_or("SKYWAVE_TTS_BASE_URL", defaults.tts.base_url),
                model: env_or("SKYWAVE_TTS_MODEL", defaults.tts.model),
                api_key: env_or("SKYWAVE_TTS_API_KEY", defaults.tts.api_key),
            },
            request_timeout_secs: env_parsed(
                "SKYWAVE_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            probe_interval_secs: env_parsed(
                "SKYWAVE_PROBE_INTERVAL_SECS",
                defaults.probe_interval_secs,
            ),
            target_mode: env_parsed("SKYWAVE_TARGET_MODE", defaults.target_mode),
            cache_root: PathBuf::from(env_or(
                "SKYWAVE_CACHE_ROOT",
                defaults.cache_root.to_string_lossy().into_owned(),
            )),
        }
    }

    /// Whether the generation service has a usable credential and model.
    pub fn llm_configured(&self) -> bool {
        !self.llm.api_key.trim().is_empty() && !self.llm.model.trim().is_empty()
    }

    /// Whether the synthesis service has a usable credential and model.
    pub fn tts_configured(&self) -> bool {
        !self.tts.api_key.trim().is_empty() && !self.tts.model.trim().is_empty()
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
