//! Kuchipaku - lip-sync engine demo
//!
//! Simulates TTS playback of a line of text, animates a scene graph at 60 Hz
//! and prints the resulting channel weights.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kuchipaku::{
    audio::SpectrumAnalyzer,
    channels::JAW_OPEN,
    config::Config,
    phoneme::{Language, PhonemeResolver},
    Engine, GraphSink, SceneGraph, SpeechFeed, SpeechSignal,
};

/// Frame time of the render loop
const FRAME_SECONDS: f32 = 1.0 / 60.0;
/// Playback publishes snapshots this often
const PUBLISH_MS: u64 = 10;
/// Render frames kept after playback ends so the decay is visible
const TAIL_FRAMES: u32 = 30;
const SAMPLE_RATE: u32 = 16_000;
const BLOCK_LEN: usize = 512;

/// Face used when no scene manifest is given
const BUILTIN_SCENE: &str = r#"{
    "name": "builtin-head",
    "meshes": [{
        "name": "Face",
        "morph_targets": [
            "jawOpen", "mouthOpen", "mouthClose", "mouthPucker", "mouthFunnel",
            "mouthSmile", "mouthStretch", "mouthLowerDown", "mouthUpperUp",
            "mouthRollLower", "tongueOut", "eyeBlinkLeft", "eyeBlinkRight",
            "cheekSquint", "browInnerUp", "browOuterUp", "browDown"
        ]
    }],
    "bones": [
        { "name": "head", "rest_translation": [0.0, 1.5, 0.0] },
        { "name": "jaw" },
        { "name": "teeth" },
        { "name": "tongue" }
    ]
}"#;

/// Kuchipaku - audio-driven lip-sync for 3D avatars
#[derive(Parser, Debug)]
#[command(name = "kuchipaku", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rig profile id or model path used to pick one
    #[arg(short, long)]
    rig: Option<String>,

    /// Scene manifest (JSON) describing the loaded model
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Text to speak
    #[arg(short, long)]
    text: Option<String>,

    /// Language tag (ja, en)
    #[arg(short, long)]
    lang: Option<String>,

    /// Print every frame as a JSON line
    #[arg(long)]
    json: bool,

    /// List rig profiles and exit
    #[arg(long)]
    list_rigs: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", kuchipaku::NAME, kuchipaku::VERSION);

    let config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };
    let engine = Engine::new(config)?;

    if args.list_rigs {
        list_rigs(&engine);
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args, engine))
}

fn list_rigs(engine: &Engine) {
    println!("Available rig profiles:\n");
    let default_id = engine.registry().default_profile().id.clone();
    for id in engine.registry().ids() {
        let Some(rig) = engine.registry().get(id) else {
            continue;
        };
        let marker = if rig.id == default_id { "*" } else { " " };
        println!(
            "  {} {:<12} {:<28} clamp {:.2}{}",
            marker,
            rig.id,
            rig.get_display_name(),
            rig.max_morph_clamp,
            if rig.bone_drive.is_some() { "  bones" } else { "" }
        );
    }
}

async fn run(args: Args, engine: Engine) -> anyhow::Result<()> {
    let language = match args.lang.as_deref() {
        Some(tag) => Language::from_tag(tag)
            .ok_or_else(|| anyhow::anyhow!("Unknown language tag: {}", tag))?,
        None => engine.config().avatar.language,
    };
    let text = args.text.clone().unwrap_or_else(|| match language {
        Language::Japanese => "こんにちは、きょうは いい てんき ですね".to_string(),
        Language::English => "Hello there, nice to meet you".to_string(),
    });

    let (graph, model_id) = match args.scene {
        Some(ref path) => (SceneGraph::from_file(path)?, path.display().to_string()),
        None => (SceneGraph::from_json(BUILTIN_SCENE)?, "builtin-head".to_string()),
    };
    let model_id = args.rig.clone().unwrap_or(model_id);
    tracing::debug!(
        "Scene bones: {}",
        graph.bone_names().collect::<Vec<_>>().join(", ")
    );

    let mut avatar = engine.mount(&model_id, GraphSink::new(graph));
    info!(
        "Speaking {:?} ({}) with rig {}",
        text,
        language,
        avatar.rig().id
    );

    // Playback side
    let feed = SpeechFeed::default();
    let mut receiver = feed.subscribe();
    let tokens = tokenize(engine.blender().resolver(), &text, language);
    let playback = tokio::spawn(simulate_playback(feed, tokens, language));

    // Render loop
    let mut ticker = tokio::time::interval(Duration::from_secs_f32(FRAME_SECONDS));
    let mut tail = 0;
    loop {
        ticker.tick().await;

        let signal = receiver.latest().clone();
        let frame = avatar.update(&signal, FRAME_SECONDS);

        if args.json {
            let line = serde_json::json!({
                "frame": frame.frame,
                "phase": frame.phase,
                "token": signal.token,
                "level": frame.audio_level,
                "peak": frame.peak,
                "emotion": frame.emotion,
                "channels": frame.channels.to_map(),
            });
            println!("{}", line);
        } else if frame.frame % 15 == 0 {
            let (number, phase, level, jaw, count) = (
                frame.frame,
                frame.phase,
                frame.audio_level,
                frame.channels.get(JAW_OPEN),
                frame.channels.len(),
            );
            let scene_jaw = avatar.sink().channel_weight(avatar.rig(), JAW_OPEN);
            info!(
                "frame {:>4} {:<8} token={:<6} level={:.2} jaw={:.2} scene_jaw={:?} channels={}",
                number,
                phase,
                signal.token.as_deref().unwrap_or("-"),
                level,
                jaw,
                scene_jaw,
                count
            );
        }

        if receiver.is_closed() {
            tail += 1;
            if tail >= TAIL_FRAMES {
                break;
            }
        }
    }

    if let Err(e) = playback.await {
        warn!("Playback task failed: {}", e);
    }

    avatar.hard_stop();
    let graph = avatar.into_sink().into_graph();
    info!(
        "Done; scene {:?} max morph after stop = {:.2}",
        graph.name,
        graph.max_morph_weight()
    );
    Ok(())
}

/// A playback unit: a token to show, or a pause.
#[derive(Debug, Clone)]
enum Unit {
    Token(String),
    Pause,
}

/// Split text into playback units: kana for Japanese, phonemes of each word
/// for English. Punctuation and spaces become pauses.
fn tokenize(resolver: &PhonemeResolver, text: &str, language: Language) -> Vec<Unit> {
    let mut units = Vec::new();
    match language {
        Language::Japanese => {
            for c in text.chars() {
                if c.is_whitespace() || c.is_ascii_punctuation() || "、。！？".contains(c) {
                    units.push(Unit::Pause);
                } else {
                    units.push(Unit::Token(c.to_string()));
                }
            }
        }
        Language::English => {
            for word in text.split_whitespace() {
                units.extend(
                    resolver
                        .english()
                        .word_phonemes(word)
                        .into_iter()
                        .map(|code| Unit::Token(code.to_string())),
                );
                if word.ends_with(|c: char| c.is_ascii_punctuation()) {
                    units.push(Unit::Pause);
                }
            }
        }
    }
    units
}

/// Pitch of the synthetic voice for a token, so the frequency hint varies.
fn token_pitch(token: &str) -> f32 {
    const PITCHES: [f32; 5] = [160.0, 240.0, 900.0, 1600.0, 2600.0];
    let sum: u32 = token.chars().map(|c| c as u32).sum();
    PITCHES[sum as usize % PITCHES.len()]
}

/// Publish speech snapshots for each unit, then close the feed.
async fn simulate_playback(feed: SpeechFeed, units: Vec<Unit>, language: Language) {
    let unit_ms: u64 = match language {
        Language::Japanese => 130,
        Language::English => 90,
    };
    let steps = (unit_ms / PUBLISH_MS).max(1);
    let mut spectrum = SpectrumAnalyzer::new(BLOCK_LEN, SAMPLE_RATE);
    let mut ticker = tokio::time::interval(Duration::from_millis(PUBLISH_MS));

    let total = units.len().max(1) as f32;
    for (index, unit) in units.iter().enumerate() {
        let progress = index as f32 / total * 100.0;
        for step in 0..steps {
            ticker.tick().await;
            let signal = match unit {
                Unit::Pause => SpeechSignal::silent(),
                Unit::Token(token) => {
                    // Syllable-shaped envelope
                    let phase = (step as f32 + 0.5) / steps as f32;
                    let level = 0.3 + 0.7 * (phase * std::f32::consts::PI).sin();

                    let pitch = token_pitch(token);
                    let block: Vec<f32> = (0..BLOCK_LEN)
                        .map(|i| {
                            let t = i as f32 / SAMPLE_RATE as f32;
                            level * (t * pitch * std::f32::consts::TAU).sin()
                        })
                        .collect();
                    let analysis = spectrum.analyze(&block);

                    let mut signal = SpeechSignal::speaking(token, level).with_language(language);
                    signal.frequency_hint = analysis.dominant_hz;
                    signal
                }
            };
            feed.publish(signal.with_progress(progress));
        }
    }

    ticker.tick().await;
    feed.publish(SpeechSignal::silent().with_progress(100.0));
    tracing::debug!("Playback finished ({} units)", units.len());
}
