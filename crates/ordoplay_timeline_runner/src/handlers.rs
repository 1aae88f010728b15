// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless track handlers that log what a real host would apply.

use ordoplay_timeline::{
    ActivationPayload, AnimationPayload, AudioPayload, Clip, DispatchMode, EntityId,
    HandlerRegistry, MarkerPayload, TrackHandler, TrackType,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Counters shared by every handler of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Samples applied
    pub applied: usize,
    /// Samples seen in preview mode
    pub previewed: usize,
    /// Sounds started
    pub sounds_started: usize,
    /// Targets released
    pub released: usize,
}

/// Shared handle to run counters
pub type SharedStats = Arc<Mutex<RunStats>>;

/// Logs the effect of each sample and remembers per-target state so only
/// changes are logged at info level
pub struct LoggingHandler {
    track_type: TrackType,
    stats: SharedStats,
    applied: HashMap<EntityId, String>,
}

impl LoggingHandler {
    /// Create a handler for one track type
    pub fn new(track_type: TrackType, stats: SharedStats) -> Self {
        Self {
            track_type,
            stats,
            applied: HashMap::new(),
        }
    }

    /// Describe the effect of a clip, or `None` if it is suppressed in `mode`
    fn describe(&self, clip: &Clip, mode: DispatchMode) -> Option<String> {
        let payload = &clip.payload;
        let effect = match self.track_type {
            TrackType::Animation => AnimationPayload::from_payload(payload)
                .map(|p| format!("animation `{}`", p.clip_id)),
            TrackType::Activation => ActivationPayload::from_payload(payload)
                .map(|p| (if p.active { "active" } else { "inactive" }).to_string()),
            TrackType::Audio => {
                if mode.is_preview() {
                    return None;
                }
                AudioPayload::from_payload(payload)
                    .map(|p| format!("sound `{}` at volume {:.2}", p.sound, p.volume))
            }
            TrackType::Marker => {
                MarkerPayload::from_payload(payload).map(|p| format!("marker `{}`", p.event))
            }
            TrackType::Custom => Ok(format!("custom clip `{}`", clip.name)),
        };
        match effect {
            Ok(effect) => Some(effect),
            Err(e) => {
                tracing::warn!("Clip `{}` has an unusable payload: {e}", clip.name);
                None
            }
        }
    }
}

impl TrackHandler for LoggingHandler {
    fn handle(&mut self, target: EntityId, clip: &Clip, local_time: f32, mode: DispatchMode) {
        if mode.is_preview() {
            self.stats.lock().previewed += 1;
        }
        let Some(effect) = self.describe(clip, mode) else {
            tracing::trace!("Suppressed {} clip `{}` in preview", self.track_type, clip.name);
            return;
        };

        let changed = self.applied.get(&target) != Some(&effect);
        {
            let mut stats = self.stats.lock();
            stats.applied += 1;
            if changed && self.track_type == TrackType::Audio {
                stats.sounds_started += 1;
            }
        }
        if changed {
            tracing::info!(entity = ?target.0, mode = ?mode, "{}: {effect}", self.track_type);
            self.applied.insert(target, effect);
        } else {
            tracing::trace!(entity = ?target.0, "{} at {local_time:.3}s", clip.name);
        }
    }

    fn release(&mut self, target: EntityId) {
        if let Some(effect) = self.applied.remove(&target) {
            tracing::info!(entity = ?target.0, "{}: released {effect}", self.track_type);
            self.stats.lock().released += 1;
        }
    }
}

/// Build a registry with a logging handler for every track type
pub fn registry(stats: &SharedStats) -> HandlerRegistry {
    TrackType::ALL
        .into_iter()
        .fold(HandlerRegistry::new(), |registry, track_type| {
            registry.with(track_type, LoggingHandler::new(track_type, stats.clone()))
        })
}
