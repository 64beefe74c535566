//! Synthesis service client (ElevenLabs-compatible TTS API).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use skywave_domain::VoiceSettings;

use crate::infrastructure::ports::{TtsError, TtsPort, Voice};

const API_KEY_HEADER: &str = "xi-api-key";

/// Client for an ElevenLabs-compatible text-to-speech endpoint.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    base_url: String,
    model_id: String,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(base_url: &str, model_id: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl TtsPort for ElevenLabsClient {
    async fn synthesize(
        &self,
        voice_id: &str,
        settings: &VoiceSettings,
        text: &str,
    ) -> Result<Vec<u8>, TtsError> {
        let body = TtsRequest {
            voice_settings: *settings,
            model_id: self.model_id.clone(),
            text: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech/{voice_id}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TtsError::RequestFailed(error_text));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TtsError::RequestFailed(e.to_string()))
    }

    async fn voices(&self) -> Result<Vec<Voice>, TtsError> {
        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TtsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TtsError::RequestFailed(error_text));
        }

        let catalog: VoicesResponse = response
            .json()
            .await
            .map_err(|e| TtsError::InvalidResponse(e.to_string()))?;

        Ok(catalog
            .voices
            .into_iter()
            .map(|v| Voice {
                id: v.voice_id,
                name: v.name,
            })
            .collect())
    }

    async fn check_user(&self) -> Result<(), TtsError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TtsError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TtsError::RequestFailed(error_text));
        }

        Ok(())
    }
}

// =============================================================================
// API types
// =============================================================================

#[derive(Debug, Serialize)]
struct TtsRequest {
    voice_settings: VoiceSettings,
    model_id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<ApiVoice>,
}

#[derive(Debug, Deserialize)]
struct ApiVoice {
    voice_id: String,
    name: String,
}
