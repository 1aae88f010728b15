// SPDX-License-Identifier: MIT OR Apache-2.0
//! OrdoPlay Timeline Runner
//!
//! Loads a timeline asset, attaches a director and drives it at a fixed frame
//! rate without a host engine. Handlers log the effects a host would apply.

mod handlers;

use clap::Parser;
use ordoplay_timeline::{
    Binding, BindingSet, Director, DirectorSettings, EntityId, FileAssetStore, StateError,
    Timeline, TimelineRef,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "ordoplay_timeline", version, about = "Play an OrdoPlay timeline headlessly")]
struct Cli {
    /// Timeline asset (`.ron` or `.json`).
    timeline: PathBuf,

    /// Bindings file (RON list of bindings). Unbound roles get fresh entities.
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// Director settings file (RON).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host ticks per second.
    #[arg(long, default_value_t = 30.0)]
    fps: f32,

    /// Seconds of host time to run (defaults to the timeline duration).
    #[arg(long)]
    seconds: Option<f32>,

    /// Playback speed override; negative plays in reverse.
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<f32>,

    /// Loop instead of stopping at the end.
    #[arg(long = "loop")]
    looping: bool,

    /// Scrub to these times (seconds) before playing.
    #[arg(long = "scrub")]
    scrub: Vec<f32>,
}

#[derive(Debug, thiserror::Error)]
enum RunnerError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },

    #[error("Timeline {0} could not be loaded")]
    Disabled(TimelineRef),

    #[error("Invalid frame rate: {0}")]
    FrameRate(f32),

    #[error(transparent)]
    State(#[from] StateError),
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_timeline=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay Timeline Runner v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(RunnerError::FrameRate(cli.fps));
    }

    let (store, reference) = locate(&cli.timeline);
    let bindings = match &cli.bindings {
        Some(path) => read_ron(path, BindingSet::from_ron)?,
        None => BindingSet::new(),
    };
    let mut settings = match &cli.settings {
        Some(path) => read_ron(path, |s| ron::from_str::<DirectorSettings>(s))?,
        None => DirectorSettings::default(),
    };
    settings.looping |= cli.looping;

    let stats = handlers::SharedStats::default();
    let mut director = Director::builder()
        .with_bindings(bindings)
        .with_settings(settings)
        .with_handlers(handlers::registry(&stats))
        .attach(&store, &reference);
    let Some(timeline) = director.timeline() else {
        return Err(RunnerError::Disabled(reference));
    };
    if let Some(speed) = cli.speed {
        director.set_playback_speed(speed)?;
    }
    bind_missing_roles(&mut director, &timeline);

    tracing::info!(
        "Loaded `{}`: {} tracks, {:.3}s at {} fps",
        timeline.name,
        timeline.track_count(),
        timeline.duration(),
        timeline.frame_rate()
    );
    for (track, clip) in timeline.unreachable_clips() {
        tracing::warn!(
            "Clip `{}` on track `{}` ends at {:.3}s, past the timeline end",
            clip.name,
            track.name,
            clip.end()
        );
    }

    for &time in &cli.scrub {
        director.seek(time)?;
        tracing::info!(
            "Scrubbed to {:.3}s (frame {})",
            director.time(),
            timeline.time_to_frame(director.time())
        );
    }

    if !director.is_playing() {
        director.play()?;
    }
    let delta = 1.0 / cli.fps;
    let seconds = cli.seconds.unwrap_or_else(|| timeline.duration());
    let ticks = (seconds.max(0.0) * cli.fps).ceil() as u64;
    for _ in 0..ticks {
        director.tick(delta);
        for marker in director.take_markers() {
            tracing::info!("Marker `{}` at {:.3}s", marker.event, marker.time);
        }
        if !director.is_playing() {
            break;
        }
    }
    tracing::info!("Finished at {:.3}s ({:?})", director.time(), director.state());
    director.stop()?;

    let stats = stats.lock().clone();
    tracing::info!(
        "Applied {} samples ({} previewed), started {} sounds, released {} targets",
        stats.applied,
        stats.previewed,
        stats.sounds_started,
        stats.released
    );
    Ok(())
}

/// Split a timeline path into a store rooted at its directory and a reference
fn locate(path: &Path) -> (FileAssetStore, TimelineRef) {
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (FileAssetStore::new(root), TimelineRef(name))
}

fn read_ron<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, ron::error::SpannedError>,
) -> Result<T, RunnerError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents).map_err(|source| RunnerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Give every role the timeline declares but the bindings lack a fresh entity
fn bind_missing_roles(director: &mut Director, timeline: &Timeline) {
    for role in timeline.tracks().iter().filter_map(|t| t.binding.as_ref()) {
        if director.bindings().get(role).is_none() {
            tracing::debug!("Binding role `{role}` to a new entity");
            director.bind(Binding::entity(role.clone(), EntityId::new()));
        }
    }
}
