//! The content result aggregate.
//!
//! One `RadioContent` is the outcome of a single pipeline run: per-speaker
//! text, optional per-section audio, or a carried failure. The concatenated
//! audio buffer is derived state, recomputed on every mutation and never
//! settable from outside.

use crate::error::ContentError;
use crate::prompt::Prompt;
use crate::speaker::Speaker;
use crate::station::ContentCategory;

#[derive(Debug, Clone)]
pub struct RadioContent {
    category: Option<ContentCategory>,
    prompt: Option<Prompt>,
    sections: usize,
    speakers: Vec<Speaker>,
    text_sections: Vec<String>,
    audio_sections: Vec<Option<Vec<u8>>>,
    concat_audio: Vec<u8>,
    failure: Option<ContentError>,
}

impl RadioContent {
    /// Offline creation: cached audio only, no prompt or text.
    pub fn offline(category: ContentCategory, audio_sections: Vec<Vec<u8>>) -> Self {
        let mut content = Self {
            category: Some(category),
            prompt: None,
            sections: audio_sections.len(),
            speakers: Vec::new(),
            text_sections: Vec::new(),
            audio_sections: audio_sections.into_iter().map(Some).collect(),
            concat_audio: Vec::new(),
            failure: None,
        };
        content.recompute_concat_audio();
        content
    }

    /// Text-only creation: generated text per speaker, no audio yet.
    pub fn text_only(prompt: Prompt, speakers: Vec<Speaker>, text_sections: Vec<String>) -> Self {
        Self {
            category: Some(prompt.category),
            sections: text_sections.len(),
            prompt: Some(prompt),
            speakers,
            text_sections,
            audio_sections: Vec::new(),
            concat_audio: Vec::new(),
            failure: None,
        }
    }

    /// Failed creation: the error is carried as data.
    pub fn failed(error: ContentError) -> Self {
        Self {
            category: None,
            prompt: None,
            sections: 0,
            speakers: Vec::new(),
            text_sections: Vec::new(),
            audio_sections: Vec::new(),
            concat_audio: Vec::new(),
            failure: Some(error),
        }
    }

    pub fn category(&self) -> Option<ContentCategory> {
        self.category
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn text_sections(&self) -> &[String] {
        &self.text_sections
    }

    pub fn audio_sections(&self) -> &[Option<Vec<u8>>] {
        &self.audio_sections
    }

    /// All successful audio sections joined in section order.
    pub fn concat_audio(&self) -> &[u8] {
        &self.concat_audio
    }

    pub fn failure(&self) -> Option<&ContentError> {
        self.failure.as_ref()
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio_sections.iter().any(|s| s.is_some())
    }

    /// Upgrade a text-only result with synthesized audio, in place. Failed
    /// sections arrive as `None` and stay aligned with their text by index.
    pub fn upgrade_with_audio(&mut self, audio_sections: Vec<Option<Vec<u8>>>) {
        if self.sections != audio_sections.len() {
            tracing::warn!(
                sections = self.sections,
                audio_sections = audio_sections.len(),
                "audio section count does not match content sections"
            );
        }
        self.audio_sections = audio_sections;
        self.recompute_concat_audio();
    }

    fn recompute_concat_audio(&mut self) {
        let total: usize = self
            .audio_sections
            .iter()
            .flatten()
            .map(|section| section.len())
            .sum();
        let mut concat = Vec::with_capacity(total);
        for section in self.audio_sections.iter().flatten() {
            concat.extend_from_slice(section);
        }
        self.concat_audio = concat;
    }
}
