//! The content-creation pipeline and its degradation state machine.
//!
//! The [`ContentCreator`] owns the operating mode and drives the four-stage
//! sequence: command selection, prompt compilation, text generation and
//! speech synthesis. Every stage is gated on the mode, and every remote
//! failure degrades gracefully:
//!
//! - generation transport errors demote to `Offline` and answer from the
//!   audio store (one fallback, not a retry loop);
//! - a response that fails structural validation is a hard failure for that
//!   call - the service answered, it just answered unusably;
//! - zero successful synthesis sections demote to `TextOnly` and return the
//!   text result; partial success is success.
//!
//! There are no ambient singletons: the mode, the command history and the
//! voice catalog are owned fields, touched only from pipeline-driven
//! continuations. Spawned work (probe loop, voice refresh) checks the
//! creator's epoch counter before mutating anything so that continuations
//! resuming after `shutdown()` abandon silently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use skywave_domain::{
    Command, CommandKind, ContentCategory, ContentError, GameContext, Prompt, PromptInputs,
    RadioContent, Speaker, Station, VoiceSettings,
};

use crate::infrastructure::audio_db::AudioStore;
use crate::infrastructure::ports::{ChatRequest, LlmPort, TtsPort, Voice};
use crate::settings::ApiSettings;
use crate::validation::validate_response;

/// Current degradation level. Gates which pipeline stages may call out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Serve pre-recorded cached audio only.
    Offline,
    /// Generate text, skip synthesis.
    TextOnly,
    /// Generate text and synthesize audio.
    Online,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Offline => write!(f, "offline"),
            Mode::TextOnly => write!(f, "textonly"),
            Mode::Online => write!(f, "online"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(Mode::Offline),
            "textonly" | "text_only" | "text-only" => Ok(Mode::TextOnly),
            "online" => Ok(Mode::Online),
            _ => Err(()),
        }
    }
}

/// What the playback layer asks for: a broad category (resolved through the
/// station's triggers) or a specific command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRequest {
    Category(ContentCategory),
    Command(CommandKind),
}

/// Why text generation failed, split by fallback policy.
enum GenerateFailure {
    /// Transport/service error: fall back to the store once.
    Service(String),
    /// The service answered with unusable content: hard failure, no retry.
    Invalid(ContentError),
}

/// The pipeline orchestrator.
pub struct ContentCreator {
    llm: Arc<dyn LlmPort>,
    tts: Arc<dyn TtsPort>,
    store: AudioStore,
    settings: ApiSettings,
    context: Arc<RwLock<GameContext>>,
    mode: RwLock<Mode>,
    target_mode: RwLock<Mode>,
    /// Latest completed text sections per command kind. Overlapping calls
    /// for the same kind race here; last write wins.
    command_history: RwLock<HashMap<CommandKind, Vec<String>>>,
    voices: Arc<RwLock<Vec<Voice>>>,
    force_backup_voices: AtomicBool,
    /// Bumped by `shutdown()`; stale continuations compare and abandon.
    epoch: Arc<AtomicU64>,
}

impl ContentCreator {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        tts: Arc<dyn TtsPort>,
        store: AudioStore,
        settings: ApiSettings,
        context: Arc<RwLock<GameContext>>,
    ) -> Self {
        let target_mode = settings.target_mode;
        Self {
            llm,
            tts,
            store,
            settings,
            context,
            mode: RwLock::new(Mode::Offline),
            target_mode: RwLock::new(target_mode),
            command_history: RwLock::new(HashMap::new()),
            voices: Arc::new(RwLock::new(Vec::new())),
            force_backup_voices: AtomicBool::new(false),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn mode(&self) -> Mode {
        *self.mode.read().await
    }

    pub async fn target_mode(&self) -> Mode {
        *self.target_mode.read().await
    }

    pub fn context(&self) -> Arc<RwLock<GameContext>> {
        Arc::clone(&self.context)
    }

    pub async fn voices(&self) -> Vec<Voice> {
        self.voices.read().await.clone()
    }

    /// Force every synthesis request onto the backup voices.
    pub fn set_force_backup_voices(&self, on: bool) {
        self.force_backup_voices.store(on, Ordering::Relaxed);
    }

    /// Invalidate all spawned continuations. In-flight probe loops and voice
    /// refreshes notice the epoch change and abandon their writes.
    pub fn shutdown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Change the operator's target mode and re-probe immediately.
    pub async fn set_target_mode(&self, target: Mode) -> Mode {
        *self.target_mode.write().await = target;
        self.probe_mode().await
    }

    /// Probe service availability and settle on an operating mode.
    pub async fn probe_mode(&self) -> Mode {
        let target = *self.target_mode.read().await;
        let next = self.resolve_mode(target).await;
        *self.mode.write().await = next;
        tracing::info!(mode = %next, target = %target, "pipeline mode updated");
        next
    }

    async fn resolve_mode(&self, target: Mode) -> Mode {
        if target == Mode::Offline {
            return Mode::Offline;
        }

        if !self.settings.llm_configured() {
            let reason = ContentError::Configuration(
                "generation service credential or model missing".to_string(),
            );
            tracing::warn!(stage = "probe", error = %reason, "demoting to offline");
            return Mode::Offline;
        }

        // Probe the synthesis service only when aiming for full online mode
        // and it is actually configured.
        let want_tts = target == Mode::Online && self.settings.tts_configured();
        let (llm_check, tts_check) = tokio::join!(self.llm.check_model(), async {
            if want_tts {
                Some(self.tts.check_user().await)
            } else {
                None
            }
        });

        if let Err(error) = llm_check {
            let reason = ContentError::Connectivity(error.to_string());
            tracing::warn!(stage = "probe", error = %reason, "generation service unreachable; demoting to offline");
            return Mode::Offline;
        }

        match tts_check {
            Some(Ok(())) => {
                self.spawn_voice_refresh();
                Mode::Online
            }
            Some(Err(error)) => {
                let reason = ContentError::Connectivity(error.to_string());
                tracing::warn!(stage = "probe", error = %reason, "synthesis service unreachable; settling on textonly");
                Mode::TextOnly
            }
            None => {
                if target == Mode::Online {
                    let reason = ContentError::Configuration(
                        "synthesis service credential or model missing".to_string(),
                    );
                    tracing::warn!(stage = "probe", error = %reason, "settling on textonly");
                }
                Mode::TextOnly
            }
        }
    }

    /// Refresh the voice catalog off the probe path. The epoch guard keeps a
    /// late result from touching a creator that was shut down in between.
    fn spawn_voice_refresh(&self) {
        let tts = Arc::clone(&self.tts);
        let voices = Arc::clone(&self.voices);
        let epoch = Arc::clone(&self.epoch);
        let started = epoch.load(Ordering::SeqCst);

        tokio::spawn(async move {
            match tts.voices().await {
                Ok(catalog) if !catalog.is_empty() => {
                    if epoch.load(Ordering::SeqCst) != started {
                        return;
                    }
                    let count = catalog.len();
                    *voices.write().await = catalog;
                    tracing::debug!(count, "voice catalog refreshed");
                }
                Ok(_) => tracing::warn!("voice catalog refresh returned no voices"),
                Err(error) => tracing::warn!(error = %error, "voice catalog refresh failed"),
            }
        });
    }

    /// Re-probe on a fixed interval until the creator is shut down. The
    /// first probe fires immediately.
    pub fn spawn_probe_loop(self: Arc<Self>) -> JoinHandle<()> {
        let started = self.epoch.load(Ordering::SeqCst);

        tokio::spawn(async move {
            let period = Duration::from_secs(self.settings.probe_interval_secs.max(1));
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if self.epoch.load(Ordering::SeqCst) != started {
                    return;
                }
                self.probe_mode().await;
            }
        })
    }

    /// Create one piece of radio content. Failures are carried on the result
    /// (`RadioContent::failure()`), never raised.
    pub async fn create_content(&self, station: &Station, request: ContentRequest) -> RadioContent {
        // Stage 1: command selection.
        let Some(kind) = self.select_command_kind(station, request).await else {
            tracing::warn!(station = station.name(), request = ?request, "no command resolved");
            return RadioContent::failed(ContentError::MissingCommand(format!(
                "station <{}>, request {request:?}",
                station.name()
            )));
        };
        let Some(command) = station
            .command_for_kind(kind, &mut entropy_rng())
            .cloned()
        else {
            tracing::warn!(station = station.name(), kind = %kind, "station does not carry command");
            return RadioContent::failed(ContentError::MissingCommand(format!(
                "station <{}>, command <{kind}>",
                station.name()
            )));
        };

        // Stage 2: offline short-circuit.
        if self.mode().await == Mode::Offline {
            return self.answer_from_store(station, &command).await;
        }

        // Stage 3: prompt compilation.
        let (prompt, speakers) = match self.compile_prompt(station, &command).await {
            Ok(parts) => parts,
            Err(error) => return RadioContent::failed(error),
        };

        // Stage 4: text generation, with one-shot offline fallback.
        let text_content = match self.generate_text(&prompt, &speakers).await {
            Ok(content) => content,
            Err(GenerateFailure::Service(message)) => {
                *self.mode.write().await = Mode::Offline;
                tracing::warn!(
                    mode = %Mode::Offline,
                    stage = "generate",
                    error = %message,
                    "generation failed; retrying from the offline store"
                );
                return self.answer_from_store(station, &command).await;
            }
            Err(GenerateFailure::Invalid(error)) => {
                tracing::warn!(stage = "validate", error = %error, "generated content rejected");
                return RadioContent::failed(error);
            }
        };

        if self.mode().await != Mode::Online {
            self.remember_history(kind, &text_content).await;
            return text_content;
        }

        // Stage 5: speech synthesis.
        let content = self.synthesize_sections(text_content).await;
        self.remember_history(kind, &content).await;
        content
    }

    /// Generate a text-only result for an already compiled prompt. Serves
    /// offline cache pre-generation, which compiles prompts against what-if
    /// game states before rendering them in bulk.
    pub async fn create_text_content(
        &self,
        prompt: &Prompt,
        speakers: Vec<Speaker>,
    ) -> RadioContent {
        if self.mode().await == Mode::Offline {
            return RadioContent::failed(ContentError::Configuration(
                "pipeline is in offline mode".to_string(),
            ));
        }
        match self.generate_text(prompt, &speakers).await {
            Ok(content) => content,
            Err(GenerateFailure::Service(message)) => {
                RadioContent::failed(ContentError::Service(message))
            }
            Err(GenerateFailure::Invalid(error)) => RadioContent::failed(error),
        }
    }

    /// Upgrade a text-only result with synthesized audio.
    pub async fn create_audio_content(&self, content: RadioContent) -> RadioContent {
        if self.mode().await != Mode::Online {
            return RadioContent::failed(ContentError::Configuration(
                "pipeline is not in online mode".to_string(),
            ));
        }
        self.synthesize_sections(content).await
    }

    /// Compile a command into its prompt and cast under the current game
    /// state.
    pub async fn compile_prompt(
        &self,
        station: &Station,
        command: &Command,
    ) -> Result<(Prompt, Vec<Speaker>), ContentError> {
        if command.roles.is_empty() {
            return Err(ContentError::MissingRoles(format!(
                "station <{}>, command <{}>",
                station.name(),
                command.kind
            )));
        }

        let mut rng = entropy_rng();
        let ctx = self.context.read().await;

        let mut speakers = Vec::with_capacity(command.roles.len());
        for role in &command.roles {
            let speaker = station
                .speaker_for_role(*role, &mut rng)
                .cloned()
                .ok_or_else(|| {
                    ContentError::Configuration(format!(
                        "station <{}> has no speaker for role {role:?}",
                        station.name()
                    ))
                })?;
            speakers.push(speaker);
        }

        let game_context = if command.context_slice.wants_game_context() {
            ctx.render_text(
                Some(&command.context_slice.value_kinds),
                command.context_slice.event_count,
                command.context_slice.recent_only,
            )
        } else {
            String::new()
        };

        let history = if command.context_slice.use_command_history {
            self.command_history
                .read()
                .await
                .get(&command.kind)
                .map(|sections| sections.join("\n"))
        } else {
            None
        };

        let inputs = PromptInputs {
            general_context: &self.settings.llm.general_context,
            game_context: &game_context,
            command_history: history.as_deref(),
            reputation: ctx.reputation(),
        };
        let prompt = command.compile(station, &speakers, &inputs, &mut rng);
        Ok((prompt, speakers))
    }

    async fn select_command_kind(
        &self,
        station: &Station,
        request: ContentRequest,
    ) -> Option<CommandKind> {
        match request {
            ContentRequest::Command(kind) => Some(kind),
            ContentRequest::Category(category) => {
                let ctx = self.context.read().await;
                station.resolve_category(category, &ctx, &mut entropy_rng())
            }
        }
    }

    async fn answer_from_store(&self, station: &Station, command: &Command) -> RadioContent {
        let route = {
            let ctx = self.context.read().await;
            AudioStore::route_for(station, command, &ctx)
        };

        match self
            .store
            .query(&route, command.category.offline_sections())
            .await
        {
            Ok(buffers) => RadioContent::offline(command.category, buffers),
            Err(error) => {
                let mode = self.mode().await;
                tracing::warn!(
                    mode = %mode,
                    stage = "store",
                    route = %route,
                    error = %error,
                    "offline store query failed"
                );
                RadioContent::failed(ContentError::CacheMiss(error.to_string()))
            }
        }
    }

    async fn generate_text(
        &self,
        prompt: &Prompt,
        speakers: &[Speaker],
    ) -> Result<RadioContent, GenerateFailure> {
        let user = if prompt.output_params.trim().is_empty() {
            prompt.command.clone()
        } else {
            format!("{}\n\n{}", prompt.command, prompt.output_params)
        };
        let request = ChatRequest {
            system: prompt.system.clone(),
            user,
            temperature: self.settings.llm.temperature,
            max_tokens: self.settings.llm.max_tokens,
        };

        let raw = self
            .llm
            .generate(request)
            .await
            .map_err(|e| GenerateFailure::Service(e.to_string()))?;

        let validated =
            validate_response(&raw, speakers.len()).map_err(GenerateFailure::Invalid)?;
        if !validated.output_params.is_empty() {
            tracing::debug!(
                params = validated.output_params.len(),
                "response carried output parameters"
            );
        }

        Ok(RadioContent::text_only(
            prompt.clone(),
            speakers.to_vec(),
            validated.speech_texts,
        ))
    }

    /// Fan one synthesis request out per resolvable section, concurrently.
    /// Results come back by section index; a failed section is `None`.
    async fn synthesize_sections(&self, content: RadioContent) -> RadioContent {
        let voices = self.voices.read().await.clone();
        let force_backup = self.force_backup_voices.load(Ordering::Relaxed);

        let jobs: Vec<Option<(String, VoiceSettings, String)>> = content
            .speakers()
            .iter()
            .zip(content.text_sections())
            .map(|(speaker, text)| {
                let mut voice_id = find_voice(&voices, &speaker.voice_name);
                let mut backup_used = force_backup;
                if force_backup || voice_id.is_none() {
                    voice_id = find_voice(&voices, &speaker.backup_voice_name);
                    backup_used = true;
                }
                match voice_id {
                    Some(id) => {
                        let settings = if backup_used {
                            speaker.backup_voice_settings
                        } else {
                            speaker.voice_settings
                        };
                        Some((id, settings, text.clone()))
                    }
                    None => {
                        tracing::warn!(
                            speaker = %speaker.name,
                            voice = %speaker.voice_name,
                            backup = %speaker.backup_voice_name,
                            "no fitting voice found; skipping section"
                        );
                        None
                    }
                }
            })
            .collect();

        let results = join_all(jobs.into_iter().enumerate().map(|(index, job)| {
            let tts = Arc::clone(&self.tts);
            async move {
                let (voice_id, settings, text) = job?;
                match tts.synthesize(&voice_id, &settings, &text).await {
                    Ok(data) if !data.is_empty() => Some(data),
                    Ok(_) => {
                        tracing::warn!(section = index, "synthesis returned empty payload");
                        None
                    }
                    Err(error) => {
                        tracing::warn!(section = index, error = %error, "synthesis failed");
                        None
                    }
                }
            }
        }))
        .await;

        if results.iter().all(Option::is_none) {
            *self.mode.write().await = Mode::TextOnly;
            tracing::warn!(
                mode = %Mode::TextOnly,
                stage = "synthesize",
                "no audio sections produced; falling back to text-only"
            );
            return content;
        }

        let mut content = content;
        content.upgrade_with_audio(results);
        content
    }

    async fn remember_history(&self, kind: CommandKind, content: &RadioContent) {
        if content.is_failure() || content.text_sections().is_empty() {
            return;
        }
        self.command_history
            .write()
            .await
            .insert(kind, content.text_sections().to_vec());
    }
}

fn find_voice(voices: &[Voice], name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    voices.iter().find(|v| v.name == name).map(|v| v.id.clone())
}

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{LlmError, TtsError};
    use skywave_domain::{ContextSlice, SpeakerRole, StationKind, TriggerKind, TriggerRule};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // =========================================================================
    // Mock ports
    // =========================================================================

    struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        generate_calls: AtomicUsize,
        liveness_calls: AtomicUsize,
        liveness: Result<(), LlmError>,
    }

    impl ScriptedLlm {
        fn healthy(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                generate_calls: AtomicUsize::new(0),
                liveness_calls: AtomicUsize::new(0),
                liveness: Ok(()),
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                generate_calls: AtomicUsize::new(0),
                liveness_calls: AtomicUsize::new(0),
                liveness: Err(LlmError::RequestFailed("connection refused".into())),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmPort for ScriptedLlm {
        async fn generate(&self, _request: ChatRequest) -> Result<String, LlmError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::RequestFailed("script exhausted".into())))
        }

        async fn check_model(&self) -> Result<(), LlmError> {
            self.liveness_calls.fetch_add(1, Ordering::SeqCst);
            self.liveness.clone()
        }
    }

    struct ScriptedTts {
        catalog: Vec<Voice>,
        liveness: Result<(), TtsError>,
        liveness_calls: AtomicUsize,
        /// Texts whose synthesis should fail with a transport error.
        failing_texts: Vec<String>,
        requested_voices: Mutex<Vec<String>>,
        catalog_delay: Option<Duration>,
    }

    impl ScriptedTts {
        fn healthy() -> Arc<Self> {
            Arc::new(Self {
                catalog: vec![
                    Voice {
                        id: "v-nova".into(),
                        name: "Nova".into(),
                    },
                    Voice {
                        id: "v-echo".into(),
                        name: "Echo".into(),
                    },
                ],
                liveness: Ok(()),
                liveness_calls: AtomicUsize::new(0),
                failing_texts: Vec::new(),
                requested_voices: Mutex::new(Vec::new()),
                catalog_delay: None,
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                catalog: Vec::new(),
                liveness: Err(TtsError::RequestFailed("connection refused".into())),
                liveness_calls: AtomicUsize::new(0),
                failing_texts: Vec::new(),
                requested_voices: Mutex::new(Vec::new()),
                catalog_delay: None,
            })
        }

        fn failing_for(texts: Vec<&str>) -> Arc<Self> {
            let mut tts = Self::healthy();
            if let Some(inner) = Arc::get_mut(&mut tts) {
                inner.failing_texts = texts.into_iter().map(String::from).collect();
            }
            tts
        }
    }

    #[async_trait::async_trait]
    impl TtsPort for ScriptedTts {
        async fn synthesize(
            &self,
            voice_id: &str,
            _settings: &VoiceSettings,
            text: &str,
        ) -> Result<Vec<u8>, TtsError> {
            self.requested_voices
                .lock()
                .unwrap()
                .push(voice_id.to_string());
            if self.failing_texts.iter().any(|t| t == text) {
                return Err(TtsError::RequestFailed("synthesis refused".into()));
            }
            Ok(vec![0xAA, 0xBB, 0xCC])
        }

        async fn voices(&self) -> Result<Vec<Voice>, TtsError> {
            if let Some(delay) = self.catalog_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.catalog.clone())
        }

        async fn check_user(&self) -> Result<(), TtsError> {
            self.liveness_calls.fetch_add(1, Ordering::SeqCst);
            self.liveness.clone()
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn configured_settings(target: Mode) -> ApiSettings {
        let mut settings = ApiSettings::default();
        settings.llm.api_key = "sk-test".into();
        settings.tts.api_key = "xi-test".into();
        settings.target_mode = target;
        settings
    }

    fn unconfigured_settings(target: Mode) -> ApiSettings {
        let mut settings = ApiSettings::default();
        settings.target_mode = target;
        settings
    }

    fn test_station() -> Station {
        let host = Speaker::new("Dex", "sardonic")
            .with_voice("Nova", VoiceSettings::default())
            .with_backup_voice("Echo", VoiceSettings::default());
        let guest = Speaker::new("Guest", "nervous")
            .with_voice("Nova", VoiceSettings::default())
            .with_backup_voice("Echo", VoiceSettings::default());
        let mayor = Speaker::new("Mayor", "smug")
            .with_voice("Nova", VoiceSettings::default())
            .with_backup_voice("Echo", VoiceSettings::default());

        Station::new(StationKind::Commercial, "The Wire", "the city's biggest station")
            .with_speaker(SpeakerRole::Host, host, 1.0)
            .with_speaker(SpeakerRole::InterviewGeneric, guest, 1.0)
            .with_speaker(SpeakerRole::InterviewMayor, mayor, 1.0)
            .with_trigger_rules(
                ContentCategory::News,
                vec![TriggerRule::new(
                    CommandKind::RandomNews,
                    TriggerKind::AlwaysHundred,
                    vec![],
                )],
            )
            .with_trigger_rules(
                ContentCategory::Ads,
                vec![TriggerRule::new(CommandKind::Ad, TriggerKind::Never, vec![])],
            )
            .with_command(
                Command::new(ContentCategory::News, CommandKind::RandomNews)
                    .with_roles(vec![SpeakerRole::Host])
                    .with_context_slice(ContextSlice {
                        use_command_history: true,
                        ..ContextSlice::default()
                    }),
                100.0,
            )
            .with_command(
                Command::new(ContentCategory::Interview, CommandKind::Interview).with_roles(vec![
                    SpeakerRole::Host,
                    SpeakerRole::InterviewGeneric,
                    SpeakerRole::InterviewMayor,
                ]),
                100.0,
            )
            .with_command(
                Command::new(ContentCategory::Story, CommandKind::Story),
                100.0,
            )
    }

    struct Harness {
        _dir: TempDir,
        creator: Arc<ContentCreator>,
        store: AudioStore,
        station: Station,
    }

    fn harness(
        llm: Arc<ScriptedLlm>,
        tts: Arc<ScriptedTts>,
        settings: ApiSettings,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = AudioStore::new(dir.path());
        let creator = Arc::new(ContentCreator::new(
            llm,
            tts,
            store.clone(),
            settings,
            Arc::new(RwLock::new(GameContext::new())),
        ));
        Harness {
            _dir: dir,
            creator,
            store,
            station: test_station(),
        }
    }

    async fn seed_store(harness: &Harness, kind: CommandKind) {
        let route = AudioStore::route(harness.station.name(), kind, 100.0, "");
        let cached = RadioContent::offline(ContentCategory::News, vec![vec![7, 7, 7]]);
        harness.store.write(&route, &cached, false).await.unwrap();
    }

    async fn wait_for_voices(creator: &ContentCreator) {
        for _ in 0..100 {
            if !creator.voices().await.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("voice catalog never refreshed");
    }

    // =========================================================================
    // Probe / mode transitions
    // =========================================================================

    #[tokio::test]
    async fn probe_without_credentials_lands_offline() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            unconfigured_settings(Mode::Online),
        );
        assert_eq!(h.creator.probe_mode().await, Mode::Offline);
    }

    #[tokio::test]
    async fn probe_offline_target_skips_all_liveness_checks() {
        let llm = ScriptedLlm::healthy(vec![]);
        let tts = ScriptedTts::healthy();
        let h = harness(
            Arc::clone(&llm),
            Arc::clone(&tts),
            configured_settings(Mode::Offline),
        );

        assert_eq!(h.creator.probe_mode().await, Mode::Offline);
        assert_eq!(llm.liveness_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tts.liveness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn probe_textonly_target_does_not_touch_synthesis() {
        let tts = ScriptedTts::healthy();
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            Arc::clone(&tts),
            configured_settings(Mode::TextOnly),
        );

        assert_eq!(h.creator.probe_mode().await, Mode::TextOnly);
        assert_eq!(tts.liveness_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn probe_with_unreachable_generation_lands_offline() {
        let h = harness(
            ScriptedLlm::unreachable(),
            ScriptedTts::healthy(),
            configured_settings(Mode::Online),
        );
        assert_eq!(h.creator.probe_mode().await, Mode::Offline);
    }

    #[tokio::test]
    async fn probe_with_unreachable_synthesis_lands_textonly() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::unreachable(),
            configured_settings(Mode::Online),
        );
        assert_eq!(h.creator.probe_mode().await, Mode::TextOnly);
    }

    #[tokio::test]
    async fn probe_online_refreshes_voice_catalog() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::Online),
        );
        assert_eq!(h.creator.probe_mode().await, Mode::Online);
        wait_for_voices(&h.creator).await;
        assert_eq!(h.creator.voices().await.len(), 2);
    }

    #[tokio::test]
    async fn set_target_mode_probes_immediately() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::unreachable(),
            configured_settings(Mode::Offline),
        );
        assert_eq!(h.creator.probe_mode().await, Mode::Offline);
        assert_eq!(h.creator.set_target_mode(Mode::Online).await, Mode::TextOnly);
        assert_eq!(h.creator.mode().await, Mode::TextOnly);
    }

    // =========================================================================
    // Content creation
    // =========================================================================

    #[tokio::test]
    async fn offline_mode_serves_from_store() {
        let llm = ScriptedLlm::healthy(vec![]);
        let h = harness(
            Arc::clone(&llm),
            ScriptedTts::healthy(),
            configured_settings(Mode::Offline),
        );
        seed_store(&h, CommandKind::RandomNews).await;
        h.creator.probe_mode().await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Category(ContentCategory::News))
            .await;

        assert!(!content.is_failure(), "failure: {:?}", content.failure());
        assert_eq!(content.sections(), 1);
        assert!(content.has_audio());
        assert!(content.text_sections().is_empty());
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn offline_cache_miss_is_carried_as_failure() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::Offline),
        );
        h.creator.probe_mode().await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Category(ContentCategory::News))
            .await;

        assert!(matches!(
            content.failure(),
            Some(ContentError::CacheMiss(_))
        ));
    }

    #[tokio::test]
    async fn textonly_mode_returns_generated_sections() {
        let llm = ScriptedLlm::healthy(vec![Ok("Dex: \"Top of the hour.\"".into())]);
        let h = harness(
            llm,
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        h.creator.probe_mode().await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Category(ContentCategory::News))
            .await;

        assert!(!content.is_failure());
        assert_eq!(content.text_sections(), ["Top of the hour."]);
        assert!(!content.has_audio());
        assert_eq!(content.speakers()[0].name, "Dex");
    }

    #[tokio::test]
    async fn generation_error_demotes_and_serves_from_store_once() {
        let llm = ScriptedLlm::healthy(vec![Err(LlmError::RequestFailed("timeout".into()))]);
        let h = harness(
            Arc::clone(&llm),
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        seed_store(&h, CommandKind::RandomNews).await;
        h.creator.probe_mode().await;

        let first = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;

        // One remote attempt, then the offline answer.
        assert!(!first.is_failure(), "failure: {:?}", first.failure());
        assert!(first.has_audio());
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.creator.mode().await, Mode::Offline);

        // The demoted mode short-circuits the next call entirely.
        let second = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;
        assert!(!second.is_failure());
        assert_eq!(llm.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_content_is_a_hard_failure_without_fallback() {
        let llm = ScriptedLlm::healthy(vec![Ok("no sections in here".into())]);
        let h = harness(
            llm,
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        seed_store(&h, CommandKind::RandomNews).await;
        h.creator.probe_mode().await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;

        assert!(matches!(
            content.failure(),
            Some(ContentError::Validation(_))
        ));
        // The service answered; the mode is not demoted.
        assert_eq!(h.creator.mode().await, Mode::TextOnly);
    }

    #[tokio::test]
    async fn unresolved_category_fails_with_missing_command() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        h.creator.probe_mode().await;

        // The Ads category only carries a Never trigger.
        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Category(ContentCategory::Ads))
            .await;

        assert!(matches!(
            content.failure(),
            Some(ContentError::MissingCommand(_))
        ));
    }

    #[tokio::test]
    async fn command_without_roles_fails_with_missing_roles() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        h.creator.probe_mode().await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::Story))
            .await;

        assert!(matches!(
            content.failure(),
            Some(ContentError::MissingRoles(_))
        ));
    }

    #[tokio::test]
    async fn history_feeds_the_next_prompt_of_the_same_command() {
        let llm = ScriptedLlm::healthy(vec![
            Ok("Dex: \"First bulletin.\"".into()),
            Ok("Dex: \"Second bulletin.\"".into()),
        ]);
        let h = harness(
            llm,
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        h.creator.probe_mode().await;

        let first = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;
        assert!(!first.is_failure());

        let second = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;
        let prompt = second.prompt().expect("text result carries its prompt");
        assert!(prompt.system.contains("Command context:\nFirst bulletin."));
    }

    // =========================================================================
    // Speech synthesis
    // =========================================================================

    #[tokio::test]
    async fn online_mode_attaches_audio_sections() {
        let llm = ScriptedLlm::healthy(vec![Ok("Dex: \"Evening news.\"".into())]);
        let h = harness(
            llm,
            ScriptedTts::healthy(),
            configured_settings(Mode::Online),
        );
        h.creator.probe_mode().await;
        wait_for_voices(&h.creator).await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;

        assert!(!content.is_failure());
        assert!(content.has_audio());
        assert_eq!(content.concat_audio(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(content.text_sections(), ["Evening news."]);
    }

    #[tokio::test]
    async fn partial_synthesis_failure_is_still_success() {
        let llm = ScriptedLlm::healthy(vec![Ok(
            "Dex: \"one\"\nGuest: \"two\"\nMayor: \"three\"".into()
        )]);
        let tts = ScriptedTts::failing_for(vec!["two"]);
        let h = harness(llm, tts, configured_settings(Mode::Online));
        h.creator.probe_mode().await;
        wait_for_voices(&h.creator).await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::Interview))
            .await;

        assert!(!content.is_failure());
        assert_eq!(content.audio_sections().len(), 3);
        assert!(content.audio_sections()[0].is_some());
        assert!(content.audio_sections()[1].is_none());
        assert!(content.audio_sections()[2].is_some());
        assert_eq!(h.creator.mode().await, Mode::Online);
    }

    #[tokio::test]
    async fn total_synthesis_failure_demotes_to_textonly() {
        let llm = ScriptedLlm::healthy(vec![Ok("Dex: \"Evening news.\"".into())]);
        let tts = ScriptedTts::failing_for(vec!["Evening news."]);
        let h = harness(llm, tts, configured_settings(Mode::Online));
        h.creator.probe_mode().await;
        wait_for_voices(&h.creator).await;

        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;

        // The text result survives; only the mode drops.
        assert!(!content.is_failure());
        assert!(!content.has_audio());
        assert_eq!(content.text_sections(), ["Evening news."]);
        assert_eq!(h.creator.mode().await, Mode::TextOnly);
    }

    #[tokio::test]
    async fn missing_preferred_voice_falls_back_to_backup() {
        let llm = ScriptedLlm::healthy(vec![Ok("Dex: \"Evening news.\"".into())]);
        let tts = ScriptedTts::healthy();
        let mut station = test_station();
        // A host whose preferred voice is not in the catalog.
        station = station.with_speaker(
            SpeakerRole::Ads,
            Speaker::new("Ghost", "flat")
                .with_voice("Unlisted", VoiceSettings::default())
                .with_backup_voice("Echo", VoiceSettings::default()),
            1.0,
        );
        let station = station.with_command(
            Command::new(ContentCategory::Ads, CommandKind::Ad)
                .with_roles(vec![SpeakerRole::Ads]),
            100.0,
        );

        let h = harness(llm, Arc::clone(&tts), configured_settings(Mode::Online));
        h.creator.probe_mode().await;
        wait_for_voices(&h.creator).await;

        let content = h
            .creator
            .create_content(&station, ContentRequest::Command(CommandKind::Ad))
            .await;

        assert!(!content.is_failure());
        assert_eq!(
            tts.requested_voices.lock().unwrap().as_slice(),
            ["v-echo"]
        );
    }

    #[tokio::test]
    async fn force_backup_flag_overrides_preferred_voices() {
        let llm = ScriptedLlm::healthy(vec![Ok("Dex: \"Evening news.\"".into())]);
        let tts = ScriptedTts::healthy();
        let h = harness(llm, Arc::clone(&tts), configured_settings(Mode::Online));
        h.creator.probe_mode().await;
        wait_for_voices(&h.creator).await;

        // Dex prefers Nova, which the catalog has; the flag wins anyway.
        h.creator.set_force_backup_voices(true);
        let content = h
            .creator
            .create_content(&h.station, ContentRequest::Command(CommandKind::RandomNews))
            .await;

        assert!(!content.is_failure());
        assert_eq!(tts.requested_voices.lock().unwrap().as_slice(), ["v-echo"]);
    }

    // =========================================================================
    // Continuation lifecycle
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn stale_voice_refresh_abandons_after_shutdown() {
        let llm = ScriptedLlm::healthy(vec![]);
        let mut tts = ScriptedTts::healthy();
        if let Some(inner) = Arc::get_mut(&mut tts) {
            inner.catalog_delay = Some(Duration::from_millis(50));
        }

        let h = harness(llm, tts, configured_settings(Mode::Online));
        assert_eq!(h.creator.probe_mode().await, Mode::Online);

        // The refresh is still sleeping on the catalog fetch; tearing the
        // creator down must keep its late result from landing.
        h.creator.shutdown();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(h.creator.voices().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_loop_reprobes_until_shutdown() {
        let llm = ScriptedLlm::healthy(vec![]);
        let mut settings = configured_settings(Mode::TextOnly);
        settings.probe_interval_secs = 1;
        let h = harness(Arc::clone(&llm), ScriptedTts::healthy(), settings);

        let handle = Arc::clone(&h.creator).spawn_probe_loop();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let probes = llm.liveness_calls.load(Ordering::SeqCst);
        assert!(probes >= 3, "expected repeated probes, got {probes}");

        h.creator.shutdown();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
    }

    // =========================================================================
    // Stage wrappers
    // =========================================================================

    #[tokio::test]
    async fn text_stage_refuses_offline_mode() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::Offline),
        );
        h.creator.probe_mode().await;

        let (prompt, speakers) = {
            let command = Command::new(ContentCategory::News, CommandKind::RandomNews)
                .with_roles(vec![SpeakerRole::Host]);
            // Compile directly; the creator refuses only the remote stage.
            h.creator
                .compile_prompt(&h.station, &command)
                .await
                .unwrap()
        };

        let content = h.creator.create_text_content(&prompt, speakers).await;
        assert!(matches!(
            content.failure(),
            Some(ContentError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn audio_stage_refuses_non_online_mode() {
        let h = harness(
            ScriptedLlm::healthy(vec![]),
            ScriptedTts::healthy(),
            configured_settings(Mode::TextOnly),
        );
        h.creator.probe_mode().await;

        let content = RadioContent::offline(ContentCategory::News, vec![vec![1]]);
        let result = h.creator.create_audio_content(content).await;
        assert!(matches!(
            result.failure(),
            Some(ContentError::Configuration(_))
        ));
    }

    #[test]
    fn mode_parses_operator_friendly_names() {
        assert_eq!("offline".parse::<Mode>(), Ok(Mode::Offline));
        assert_eq!("TextOnly".parse::<Mode>(), Ok(Mode::TextOnly));
        assert_eq!("text-only".parse::<Mode>(), Ok(Mode::TextOnly));
        assert_eq!("ONLINE".parse::<Mode>(), Ok(Mode::Online));
        assert!("radio".parse::<Mode>().is_err());
    }
}
