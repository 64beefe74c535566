//! Skywave Engine - Demo entry point.
//!
//! Wires the pipeline against the configured services, seeds a little world
//! activity, probes the target mode and puts one piece of content on air.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skywave_domain::{
    BillboardInfo, BillboardKind, ChaseCause, Command, CommandKind, ContentCategory, ContextSlice,
    District, GameContext, GameEvent, Importance, Objective, Speaker, SpeakerRole, StateKind,
    Station, StationKind, TriggerKind, TriggerRule, VoiceSettings, Weighted, WorldInputs,
};
use skywave_engine::infrastructure::audio_db::AudioStore;
use skywave_engine::infrastructure::elevenlabs::ElevenLabsClient;
use skywave_engine::infrastructure::openai::OpenAiClient;
use skywave_engine::pipeline::{ContentCreator, ContentRequest};
use skywave_engine::settings::ApiSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skywave_engine=debug,skywave_domain=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Skywave Engine");

    let settings = ApiSettings::from_env();

    let llm = Arc::new(OpenAiClient::new(
        &settings.llm.base_url,
        &settings.llm.model,
        &settings.llm.api_key,
        settings.request_timeout_secs,
    ));
    let tts = Arc::new(ElevenLabsClient::new(
        &settings.tts.base_url,
        &settings.tts.model,
        &settings.tts.api_key,
        settings.request_timeout_secs,
    ));
    let store = AudioStore::new(settings.cache_root.clone());

    // A little recent world activity so the prompt has something to chew on.
    let context = Arc::new(RwLock::new(GameContext::new()));
    {
        let mut ctx = context.write().await;
        ctx.update(&WorldInputs {
            progress_points: 12,
            total_progress_points: 100,
        });
        ctx.add_event(GameEvent::Destruction {
            billboard: BillboardInfo {
                kind: BillboardKind::Billboard,
                importance: Importance::Low,
                description: "Chip ad over the fish market".into(),
                district: District::Harborside,
            },
        });
        ctx.add_event(GameEvent::Chase {
            cause: ChaseCause::Destruction,
            district: District::Harborside,
        });
        ctx.add_event(GameEvent::Escape {
            district: District::Harborside,
        });
    }

    let creator = Arc::new(ContentCreator::new(llm, tts, store, settings, context));

    let mode = creator.probe_mode().await;
    tracing::info!(%mode, "initial probe complete");
    let probe_loop = Arc::clone(&creator).spawn_probe_loop();

    let station = demo_station();
    let content = creator
        .create_content(&station, ContentRequest::Category(ContentCategory::News))
        .await;

    match content.failure() {
        Some(error) => tracing::warn!(%error, "content creation failed"),
        None => {
            for (index, text) in content.text_sections().iter().enumerate() {
                tracing::info!(section = index, %text, "text section");
            }
            for (index, audio) in content.audio_sections().iter().enumerate() {
                match audio {
                    Some(bytes) => {
                        tracing::info!(section = index, bytes = bytes.len(), "audio section")
                    }
                    None => tracing::info!(section = index, "audio section missing"),
                }
            }
            tracing::info!(
                sections = content.sections(),
                audio_bytes = content.concat_audio().len(),
                "content created"
            );
        }
    }

    creator.shutdown();
    probe_loop.abort();
    Ok(())
}

/// The station the demo puts on air.
fn demo_station() -> Station {
    let host = Speaker::new("Dex Marlowe", "dry and fast-talking")
        .with_background("Has hosted the evening block for eleven years and seen it all.")
        .with_voice("Nova", VoiceSettings::default())
        .with_backup_voice("Echo", VoiceSettings::default());
    let ads_voice = Speaker::new("Mara Quinn", "relentlessly upbeat")
        .with_voice("Lumen", VoiceSettings::default())
        .with_backup_voice("Echo", VoiceSettings::default());

    let random_news = Command::new(ContentCategory::News, CommandKind::RandomNews)
        .with_roles(vec![SpeakerRole::Host])
        .with_context_slice(ContextSlice {
            value_kinds: vec![StateKind::PlayerReputation],
            event_count: 0,
            recent_only: true,
            use_command_history: true,
        })
        .with_objective(
            Objective::new("Report a short piece of {topic} news from around the city.")
                .with_variable(
                    "topic",
                    vec![
                        Weighted::new("traffic".to_string(), 2.0),
                        Weighted::new("weather".to_string(), 2.0),
                        Weighted::new("local business".to_string(), 1.0),
                    ],
                ),
        );

    let player_news = Command::new(ContentCategory::News, CommandKind::PlayerNews)
        .with_roles(vec![SpeakerRole::Host])
        .with_context_slice(ContextSlice {
            value_kinds: vec![StateKind::PlayerReputation],
            event_count: 4,
            recent_only: true,
            use_command_history: true,
        })
        .with_objective(Objective::new(
            "Report on the recent activity of the person interfering with the city's billboards.",
        ));

    let ad = Command::new(ContentCategory::Ads, CommandKind::Ad)
        .with_roles(vec![SpeakerRole::Ads])
        .with_objective(
            Objective::new("Write a radio spot praising {product}.").with_variable(
                "product",
                vec![
                    Weighted::new("the NeroLink neural chip".to_string(), 3.0),
                    Weighted::new("Harborside instant noodles".to_string(), 1.0),
                ],
            ),
        );

    Station::new(
        StationKind::Commercial,
        "The Wire",
        "the city's biggest commercial station, always cheerful, always on message",
    )
    .with_speaker(SpeakerRole::Host, host, 1.0)
    .with_speaker(SpeakerRole::Ads, ads_voice, 1.0)
    .with_trigger_rules(
        ContentCategory::News,
        vec![
            TriggerRule::new(
                CommandKind::RandomNews,
                TriggerKind::ReputationAscend,
                vec!["80".into(), "60".into(), "40".into(), "20".into()],
            ),
            TriggerRule::new(
                CommandKind::PlayerNews,
                TriggerKind::ReputationAscend,
                vec!["1".into(), "20".into(), "40".into(), "60".into()],
            ),
        ],
    )
    .with_trigger_rules(
        ContentCategory::Ads,
        vec![TriggerRule::new(
            CommandKind::Ad,
            TriggerKind::AlwaysHundred,
            vec![],
        )],
    )
    .with_command(random_news, 100.0)
    .with_command(player_news, 100.0)
    .with_command(ad, 100.0)
}
