//! Port traits for the two remote services.
//!
//! These are the only abstractions in the engine; everything else is
//! concrete. Ports exist so the pipeline can be exercised against
//! hand-written mocks and so either vendor could be swapped out.

use async_trait::async_trait;

use skywave_domain::VoiceSettings;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TtsError {
    #[error("TTS request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One chat-completion request: the compiled prompt plus sampling knobs.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System message (general/game/station context and cast).
    pub system: String,
    /// User message (command block plus output-parameter instructions).
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// An entry of the synthesis voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

/// Text generation service (OpenAI-style chat completions).
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// Generate the raw response text. Exactly one candidate is expected;
    /// anything else is an invalid response.
    async fn generate(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// Liveness probe against the configured model.
    async fn check_model(&self) -> Result<(), LlmError>;
}

/// Speech synthesis service (ElevenLabs-style TTS).
#[async_trait]
pub trait TtsPort: Send + Sync {
    /// Synthesize one section; returns the raw MP3 bytes.
    async fn synthesize(
        &self,
        voice_id: &str,
        settings: &VoiceSettings,
        text: &str,
    ) -> Result<Vec<u8>, TtsError>;

    /// Fetch the voice catalog.
    async fn voices(&self) -> Result<Vec<Voice>, TtsError>;

    /// Liveness probe against the account endpoint.
    async fn check_user(&self) -> Result<(), TtsError>;
}
