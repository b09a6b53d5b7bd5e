use afterimage_core::{EmitterConfig, MotionType, NodeId, PresetFile, TrailActor, TrailEmitter};
use afterimage_host::{HeadlessActor, Result};
use glam::Vec2;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const FRAME_DT: f32 = 1.0 / 60.0;
const DEMO_FRAMES: u32 = 240;

fn main() {
    // Init logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("info")
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Afterimage demo starting");
    if let Err(e) = run() {
        eprintln!("Afterimage error: {e}");
    }
}

/// `afterimage-app [preset-file [preset-name]]`; without arguments every motion type runs.
fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let presets = match args.next() {
        Some(path) => {
            let file = PresetFile::load(&path)?;
            match args.next() {
                Some(name) => {
                    let preset = file
                        .find(&name)
                        .ok_or_else(|| format!("no preset named `{name}` in {path}"))?;
                    vec![(preset.name.clone(), preset.emitter.clone())]
                }
                None => file
                    .presets
                    .into_iter()
                    .map(|preset| (preset.name, preset.emitter))
                    .collect(),
            }
        }
        None => builtin_presets(),
    };

    for (name, config) in &presets {
        simulate(name, config)?;
    }
    Ok(())
}

fn builtin_presets() -> Vec<(String, EmitterConfig)> {
    let base = EmitterConfig {
        spawn_frequency: 20,
        life_time: 0.8,
        minimum_spawn_displacement: 4.0,
        ..EmitterConfig::default()
    };
    vec![
        ("static".into(), base.clone()),
        (
            "move-out".into(),
            EmitterConfig {
                motion_type: MotionType::MoveOut,
                ..base.clone()
            },
        ),
        (
            "move-in".into(),
            EmitterConfig {
                motion_type: MotionType::MoveIn,
                ..base.clone()
            },
        ),
        (
            "follow".into(),
            EmitterConfig {
                motion_type: MotionType::Follow,
                follow_trail_count: 5,
                follow_frames_span: 6,
                ..base
            },
        ),
    ]
}

/// Moves an emitter around a circle that pauses every second, animating trails headlessly.
fn simulate(name: &str, config: &EmitterConfig) -> Result<()> {
    config.validate()?;
    let mut emitter =
        TrailEmitter::from_config(HeadlessActor::new(), || Some(HeadlessActor::new()), config)?;
    emitter.set_parent(NodeId(1));
    emitter.set_start_position(orbit(0));

    let mut spawned = 0u32;
    let mut retired = 0u32;
    let mut peak_visible = 0usize;
    let mut angle_step = 0u32;
    for frame in 0..DEMO_FRAMES {
        if frame % 60 < 45 {
            angle_step += 1;
        }
        emitter.set_position(orbit(angle_step));
        let outcome = emitter.tick(FRAME_DT);
        spawned += u32::from(outcome.spawned.is_some());
        retired += u32::from(outcome.retired.is_some());
        for trail in emitter.trails_mut() {
            trail.advance(FRAME_DT);
        }
        let visible = emitter
            .pool()
            .iter()
            .filter(|trail| trail.is_visible() && trail.opacity() > 0.0)
            .count();
        peak_visible = peak_visible.max(visible);
    }

    info!(
        "{name}: {:?}, pool {}, {} spawned, {} retired, peak {} visible",
        emitter.motion_type(),
        emitter.pool_len(),
        spawned,
        retired,
        peak_visible
    );
    Ok(())
}

fn orbit(step: u32) -> Vec2 {
    let angle = step as f32 * 0.05;
    Vec2::new(angle.cos(), angle.sin()) * 120.0
}
