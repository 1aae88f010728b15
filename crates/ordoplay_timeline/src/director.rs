// SPDX-License-Identifier: MIT OR Apache-2.0
//! Director: the playback state machine driving one timeline.
//!
//! All time changes go through `play`, `pause`, `stop`, `seek` and `tick`.
//! Each tick runs exactly one evaluate + dispatch pass against a snapshot of
//! the shared timeline, so concurrent edits are seen whole or not at all.

use crate::asset::{AssetError, AssetStore, SharedTimeline, TimelineRef};
use crate::binding::{Binding, BindingId, BindingSet};
use crate::clip::ClipId;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
use crate::dispatch::{DispatchMode, DispatchOutcome, Dispatcher, HandlerRegistry, TrackHandler};
use crate::evaluate::evaluate;
use crate::payload::MarkerPayload;
use crate::timeline::Timeline;
use crate::track::{TrackId, TrackType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing
    Playing,
    /// Paused
    Paused,
}

/// Per-director playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorSettings {
    /// Start playing as soon as the director is attached
    pub play_on_start: bool,
    /// Wrap around at the ends instead of stopping
    pub looping: bool,
    /// Playback speed multiplier; negative plays in reverse, never zero
    pub playback_speed: f32,
    /// Time `play` starts from when leaving `Stopped`
    pub start_time: Option<f32>,
}

impl Default for DirectorSettings {
    fn default() -> Self {
        Self {
            play_on_start: false,
            looping: false,
            playback_speed: 1.0,
            start_time: None,
        }
    }
}

/// Invalid use of a director
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    /// The requested transition is not allowed from the current state
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        /// Current state
        from: PlaybackState,
        /// Requested action
        action: &'static str,
    },

    /// The director has no usable timeline
    #[error("Playback is disabled: the timeline could not be loaded")]
    PlaybackDisabled,

    /// Playback speed must be finite and nonzero
    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f32),
}

/// A marker clip crossed during playback
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEvent {
    /// Marker track
    pub track: TrackId,
    /// Marker clip
    pub clip: ClipId,
    /// Event name from the clip payload
    pub event: String,
    /// Timeline time of the marker
    pub time: f32,
}

/// Builder collecting what a host supplies when attaching a director
pub struct DirectorBuilder {
    bindings: BindingSet,
    settings: DirectorSettings,
    handlers: HandlerRegistry,
    sink: Arc<dyn DiagnosticSink>,
}

impl DirectorBuilder {
    /// Create a builder with no bindings, default settings and a tracing sink
    pub fn new() -> Self {
        Self {
            bindings: BindingSet::new(),
            settings: DirectorSettings::default(),
            handlers: HandlerRegistry::new(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Set the bindings
    pub fn with_bindings(mut self, bindings: BindingSet) -> Self {
        self.bindings = bindings;
        self
    }

    /// Set the playback settings
    pub fn with_settings(mut self, settings: DirectorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the whole handler registry
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Register one handler
    pub fn with_handler(
        mut self,
        track_type: TrackType,
        handler: impl TrackHandler + 'static,
    ) -> Self {
        self.handlers.register(track_type, handler);
        self
    }

    /// Set the diagnostics sink
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Load a timeline from a store and attach.
    ///
    /// A load failure is reported once and leaves the director disabled.
    pub fn attach(self, store: &dyn AssetStore, reference: &TimelineRef) -> Director {
        match store.load_timeline(reference) {
            Ok(timeline) => {
                let mut director = self.build(timeline);
                director.timeline_ref = Some(reference.clone());
                director
            }
            Err(e) => {
                tracing::warn!("Failed to load timeline {reference}: {e}");
                let diagnostic = Diagnostic::new(DiagnosticKind::MissingAsset, e.to_string());
                let mut director = self.into_director(None);
                director.timeline_ref = Some(reference.clone());
                director.dispatcher.diagnostics_mut().report(diagnostic);
                director
            }
        }
    }

    /// Attach to a timeline that is already loaded (possibly shared)
    pub fn build(self, timeline: impl Into<SharedTimeline>) -> Director {
        let shared = timeline.into();
        let snapshot = shared.snapshot();
        if let Err(e) = snapshot.validate().map_err(AssetError::Invalid) {
            tracing::warn!("Cannot attach timeline `{}`: {e}", snapshot.name);
            let mut director = self.into_director(None);
            director
                .dispatcher
                .diagnostics_mut()
                .report(Diagnostic::new(DiagnosticKind::MissingAsset, e.to_string()));
            return director;
        }

        let play_on_start = self.settings.play_on_start;
        let mut director = self.into_director(Some(shared));
        if snapshot.track_count() == 0 {
            director.dispatcher.diagnostics_mut().report(Diagnostic::new(
                DiagnosticKind::EmptyTimeline,
                format!("timeline `{}` has no tracks", snapshot.name),
            ));
        }
        if play_on_start {
            if let Err(e) = director.play() {
                tracing::debug!("Play on start failed: {e}");
            }
        }
        director
    }

    fn into_director(mut self, timeline: Option<SharedTimeline>) -> Director {
        if !valid_speed(self.settings.playback_speed) {
            tracing::warn!(
                "Invalid playback speed {}, using 1.0",
                self.settings.playback_speed
            );
            self.settings.playback_speed = 1.0;
        }
        Director {
            timeline_ref: None,
            timeline,
            bindings: self.bindings,
            settings: self.settings,
            state: PlaybackState::Stopped,
            time: 0.0,
            pending_start: None,
            fresh_start: false,
            dispatcher: Dispatcher::new(self.handlers, self.sink),
            markers: Vec::new(),
        }
    }
}

impl Default for DirectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime instance advancing one timeline for one host entity
pub struct Director {
    timeline_ref: Option<TimelineRef>,
    timeline: Option<SharedTimeline>,
    bindings: BindingSet,
    settings: DirectorSettings,
    state: PlaybackState,
    time: f32,
    pending_start: Option<f32>,
    fresh_start: bool,
    dispatcher: Dispatcher,
    markers: Vec<MarkerEvent>,
}

impl Director {
    /// Start building a director
    pub fn builder() -> DirectorBuilder {
        DirectorBuilder::new()
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current time in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Is currently playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Is currently paused
    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    /// Whether a timeline is attached
    pub fn is_enabled(&self) -> bool {
        self.timeline.is_some()
    }

    /// Reference the timeline was attached from
    pub fn timeline_ref(&self) -> Option<&TimelineRef> {
        self.timeline_ref.as_ref()
    }

    /// Current snapshot of the timeline
    pub fn timeline(&self) -> Option<Arc<Timeline>> {
        self.timeline.as_ref().map(SharedTimeline::snapshot)
    }

    /// Shared handle to the timeline, for editing
    pub fn shared_timeline(&self) -> Option<&SharedTimeline> {
        self.timeline.as_ref()
    }

    /// Get current frame number
    pub fn current_frame(&self) -> Option<u32> {
        self.timeline().map(|t| t.time_to_frame(self.time))
    }

    /// Playback settings
    pub fn settings(&self) -> &DirectorSettings {
        &self.settings
    }

    /// Enable or disable looping
    pub fn set_looping(&mut self, looping: bool) {
        self.settings.looping = looping;
    }

    /// Change the playback speed
    pub fn set_playback_speed(&mut self, speed: f32) -> Result<(), StateError> {
        if !valid_speed(speed) {
            return Err(StateError::InvalidSpeed(speed));
        }
        self.settings.playback_speed = speed;
        Ok(())
    }

    /// Set the time `play` starts from when leaving `Stopped`
    pub fn set_start_time(&mut self, start_time: Option<f32>) {
        self.settings.start_time = start_time;
    }

    /// Current bindings
    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// Replace all bindings; takes effect on the next pass
    pub fn rebind(&mut self, bindings: BindingSet) {
        self.bindings = bindings;
    }

    /// Add or replace one binding
    pub fn bind(&mut self, binding: Binding) -> Option<Binding> {
        self.bindings.insert(binding)
    }

    /// Remove one binding
    pub fn unbind(&mut self, binding_id: &BindingId) -> Option<Binding> {
        self.bindings.remove(binding_id)
    }

    /// Get the handler registry
    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        self.dispatcher.handlers_mut()
    }

    /// Start or resume playback.
    ///
    /// From `Stopped`, time restarts at the explicit start time (a seek made
    /// while stopped, else the configured start time, else 0). A disabled
    /// director ignores the request.
    pub fn play(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Playing => Err(StateError::InvalidTransition {
                from: self.state,
                action: "play",
            }),
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                tracing::debug!("Resumed timeline at {:.3}s", self.time);
                Ok(())
            }
            PlaybackState::Stopped => {
                let Some(snapshot) = self.timeline() else {
                    tracing::debug!("Ignoring play: no timeline attached");
                    return Ok(());
                };
                let start = self
                    .pending_start
                    .take()
                    .or(self.settings.start_time)
                    .unwrap_or(0.0);
                self.time = snapshot.clamp_time(start);
                self.fresh_start = true;
                self.state = PlaybackState::Playing;
                tracing::debug!("Playing timeline `{}` from {:.3}s", snapshot.name, self.time);
                Ok(())
            }
        }
    }

    /// Pause playback, keeping the current time
    pub fn pause(&mut self) -> Result<(), StateError> {
        if self.state != PlaybackState::Playing {
            return Err(StateError::InvalidTransition {
                from: self.state,
                action: "pause",
            });
        }
        self.state = PlaybackState::Paused;
        tracing::debug!("Paused timeline at {:.3}s", self.time);
        Ok(())
    }

    /// Stop playback, rewind to 0 and release handler side effects.
    ///
    /// Nothing is dispatched for this director after `stop` returns until it
    /// is played or seeked again.
    pub fn stop(&mut self) -> Result<(), StateError> {
        let was = self.state;
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
        self.pending_start = None;
        self.markers.clear();
        // Scrubbing while stopped engages targets too
        self.dispatcher.release_all();
        if was != PlaybackState::Stopped {
            tracing::debug!("Stopped timeline");
        }
        Ok(())
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Jump to `time` and dispatch one preview pass there.
    ///
    /// Valid in every state and never changes it. Each call is dispatched
    /// immediately, so no requested frame is skipped.
    pub fn seek(&mut self, time: f32) -> Result<Vec<DispatchOutcome>, StateError> {
        let snapshot = self.timeline().ok_or(StateError::PlaybackDisabled)?;
        self.time = snapshot.clamp_time(time);
        if self.state == PlaybackState::Stopped {
            self.pending_start = Some(self.time);
        }
        self.fresh_start = false;
        Ok(self.dispatch_pass(&snapshot, DispatchMode::Preview))
    }

    /// Advance playback by `delta` seconds of wall-clock time.
    ///
    /// Does nothing unless playing. Otherwise runs exactly one playback pass;
    /// without looping, reaching either end dispatches that boundary once and
    /// stops.
    pub fn tick(&mut self, delta: f32) -> Vec<DispatchOutcome> {
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }
        let Some(snapshot) = self.timeline() else {
            return Vec::new();
        };

        let duration = snapshot.duration();
        let speed = self.settings.playback_speed;
        let previous = self.time;
        let advanced = previous + delta.max(0.0) * speed;

        let out_of_range = !(0.0..=duration).contains(&advanced);
        let wrapped = self.settings.looping && out_of_range;
        let time = if wrapped {
            advanced.rem_euclid(duration).clamp(0.0, duration)
        } else {
            advanced.clamp(0.0, duration)
        };
        let finished = !self.settings.looping
            && if speed > 0.0 {
                time >= duration
            } else {
                time <= 0.0
            };

        let full_cycles = match (wrapped, speed > 0.0) {
            (false, _) => 0,
            (true, true) => ((advanced / duration).floor() as u32).saturating_sub(1),
            (true, false) => ((-advanced / duration).ceil() as u32).saturating_sub(1),
        };
        self.collect_markers(&snapshot, previous, time, speed > 0.0, wrapped, full_cycles);
        self.fresh_start = false;
        self.time = time;
        let outcomes = self.dispatch_pass(&snapshot, DispatchMode::Playback);

        if finished {
            self.state = PlaybackState::Stopped;
            self.dispatcher.release_all();
            tracing::debug!("Timeline `{}` finished at {:.3}s", snapshot.name, time);
        }
        outcomes
    }

    /// Take the markers crossed since the last call
    pub fn take_markers(&mut self) -> Vec<MarkerEvent> {
        std::mem::take(&mut self.markers)
    }

    fn dispatch_pass(&mut self, snapshot: &Timeline, mode: DispatchMode) -> Vec<DispatchOutcome> {
        let evaluation = evaluate(snapshot, self.time);
        self.dispatcher.dispatch_all(&evaluation, &self.bindings, mode)
    }

    fn collect_markers(
        &mut self,
        snapshot: &Timeline,
        previous: f32,
        time: f32,
        forward: bool,
        wrapped: bool,
        full_cycles: u32,
    ) {
        let duration = snapshot.duration();
        let fresh = self.fresh_start;
        let whole = (0.0, duration, true, true);
        // (low, high, include_low, include_high), in crossing order
        let spans: Vec<(f32, f32, bool, bool)> = match (forward, wrapped) {
            (true, false) => vec![(previous, time, fresh, true)],
            (false, false) => vec![(time, previous, true, fresh)],
            (true, true) => std::iter::once((previous, duration, fresh, true))
                .chain(std::iter::repeat(whole).take(full_cycles as usize))
                .chain(std::iter::once((0.0, time, true, true)))
                .collect(),
            (false, true) => std::iter::once((0.0, previous, true, fresh))
                .chain(std::iter::repeat(whole).take(full_cycles as usize))
                .chain(std::iter::once((time, duration, true, true)))
                .collect(),
        };

        let solo_active = snapshot.has_solo();
        for (low, high, include_low, include_high) in spans {
            let mut crossed: Vec<MarkerEvent> = snapshot
                .tracks_of_type(TrackType::Marker)
                .filter(|t| !t.muted && (!solo_active || t.solo))
                .flat_map(|track| {
                    track
                        .clips_starting_in(low, high)
                        .filter(move |c| {
                            (include_low || c.start > low) && (include_high || c.start < high)
                        })
                        .map(move |clip| MarkerEvent {
                            track: track.id(),
                            clip: clip.id,
                            event: MarkerPayload::from_payload(&clip.payload)
                                .map(|m| m.event.to_string())
                                .unwrap_or_else(|_| clip.name.clone()),
                            time: clip.start,
                        })
                })
                .collect();
            crossed.sort_by(|a, b| a.time.total_cmp(&b.time));
            if !forward {
                crossed.reverse();
            }
            self.markers.extend(crossed);
        }
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        self.dispatcher.release_all();
    }
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("timeline_ref", &self.timeline_ref)
            .field("state", &self.state)
            .field("time", &self.time)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn valid_speed(speed: f32) -> bool {
    speed.is_finite() && speed != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssetStore;
    use crate::clip::Clip;
    use crate::payload::KEY_EVENT;
    use crate::testing::{
        approx_eq, scenario_bindings, scenario_timeline, RecordingHandler, RecordingSink,
    };
    use crate::track::Track;

    struct Rig {
        director: Director,
        handler: RecordingHandler,
        sink: Arc<RecordingSink>,
    }

    fn rig(settings: DirectorSettings) -> Rig {
        let (timeline, _) = scenario_timeline();
        rig_with(timeline, settings)
    }

    fn rig_with(timeline: impl Into<SharedTimeline>, settings: DirectorSettings) -> Rig {
        let (bindings, _) = scenario_bindings();
        let handler = RecordingHandler::new();
        let sink = RecordingSink::new();
        let mut builder = Director::builder()
            .with_bindings(bindings)
            .with_settings(settings)
            .with_sink(sink.clone());
        for track_type in TrackType::ALL {
            builder = builder.with_handler(track_type, handler.clone());
        }
        Rig {
            director: builder.build(timeline),
            handler,
            sink,
        }
    }

    fn looping() -> DirectorSettings {
        DirectorSettings {
            looping: true,
            ..DirectorSettings::default()
        }
    }

    #[test]
    fn test_initial_state() {
        let Rig { director, .. } = rig(DirectorSettings::default());
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert_eq!(director.time(), 0.0);
        assert!(director.is_enabled());
    }

    #[test]
    fn test_play_on_start() {
        let Rig { director, .. } = rig(DirectorSettings {
            play_on_start: true,
            ..DirectorSettings::default()
        });
        assert!(director.is_playing());
    }

    #[test]
    fn test_transitions() {
        let Rig { mut director, .. } = rig(DirectorSettings::default());

        assert_eq!(
            director.pause(),
            Err(StateError::InvalidTransition {
                from: PlaybackState::Stopped,
                action: "pause"
            })
        );
        director.play().unwrap();
        assert!(director.play().is_err());

        director.tick(2.5);
        director.pause().unwrap();
        assert!(director.is_paused());
        assert!(director.tick(1.0).is_empty());
        assert_eq!(director.time(), 2.5);

        director.play().unwrap();
        assert_eq!(director.time(), 2.5, "resume keeps time");

        director.stop().unwrap();
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert_eq!(director.time(), 0.0);
        assert!(director.stop().is_ok());

        director.toggle_playback().unwrap();
        assert!(director.is_playing());
        director.toggle_playback().unwrap();
        assert!(director.is_paused());
    }

    #[test]
    fn test_loop_wraps() {
        let Rig { mut director, .. } = rig(looping());
        director.set_start_time(Some(9.0));
        director.play().unwrap();
        director.tick(2.0);
        assert!(approx_eq(director.time(), 1.0));
        assert!(director.is_playing());
    }

    #[test]
    fn test_reverse_loop_wraps() {
        let Rig { mut director, .. } = rig(looping());
        director.set_playback_speed(-1.0).unwrap();
        director.set_start_time(Some(1.0));
        director.play().unwrap();
        director.tick(2.0);
        assert!(approx_eq(director.time(), 9.0));

        director.set_playback_speed(-0.5).unwrap();
        director.tick(2.0);
        assert!(approx_eq(director.time(), 8.0));
    }

    #[test]
    fn test_non_loop_stops_once_at_end() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.set_start_time(Some(9.0));
        director.play().unwrap();
        handler.clear();

        let outcomes = director.tick(2.0);
        assert_eq!(director.time(), 10.0);
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert!(outcomes.contains(&DispatchOutcome::Dispatched));
        let final_calls = handler.calls();
        assert_eq!(final_calls.len(), 1);
        assert_eq!(final_calls[0].clip, "Show");
        assert_eq!(final_calls[0].local_time, 8.0);

        assert!(director.tick(1.0).is_empty());
        assert_eq!(handler.calls().len(), 1);
        assert_eq!(director.time(), 10.0);
    }

    #[test]
    fn test_reaching_end_exactly_stops() {
        let Rig { mut director, .. } = rig(DirectorSettings::default());
        director.play().unwrap();
        director.tick(4.0);
        director.tick(6.0);
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert_eq!(director.time(), 10.0);
    }

    #[test]
    fn test_reverse_stops_at_zero() {
        let Rig { mut director, .. } = rig(DirectorSettings {
            playback_speed: -2.0,
            start_time: Some(3.0),
            ..DirectorSettings::default()
        });
        director.play().unwrap();
        director.tick(1.0);
        assert!(approx_eq(director.time(), 1.0));
        director.tick(1.0);
        assert_eq!(director.time(), 0.0);
        assert_eq!(director.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_one_pass_per_tick() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.play().unwrap();
        for _ in 0..3 {
            handler.clear();
            let outcomes = director.tick(1.0);
            assert_eq!(outcomes.len(), 3);
            let dispatched = outcomes
                .iter()
                .filter(|o| **o == DispatchOutcome::Dispatched)
                .count();
            assert_eq!(handler.calls().len(), dispatched);
            assert!(handler.calls().iter().all(|c| c.mode == DispatchMode::Playback));
        }
    }

    #[test]
    fn test_seek_previews_without_state_change() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.play().unwrap();
        director.tick(1.0);
        handler.clear();

        director.seek(5.0).unwrap();
        assert!(director.is_playing());
        assert_eq!(director.time(), 5.0);
        let calls = handler.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, DispatchMode::Preview);
        assert_eq!(calls[0].local_time, 3.0);

        director.seek(-4.0).unwrap();
        assert_eq!(director.time(), 0.0);
        director.seek(400.0).unwrap();
        assert_eq!(director.time(), 10.0);
    }

    #[test]
    fn test_every_scrub_dispatched() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.play().unwrap();
        director.pause().unwrap();
        handler.clear();

        for t in [1.0, 1.5, 2.0, 3.25] {
            director.seek(t).unwrap();
        }
        let walk_times: Vec<f32> = handler
            .calls()
            .iter()
            .filter(|c| c.clip == "Walk")
            .map(|c| c.local_time)
            .collect();
        assert_eq!(walk_times, [1.0, 1.5, 2.0, 3.25]);
        assert!(director.is_paused());
    }

    #[test]
    fn test_seek_while_stopped_sets_start() {
        let Rig { mut director, .. } = rig(DirectorSettings::default());
        director.seek(6.0).unwrap();
        assert_eq!(director.state(), PlaybackState::Stopped);
        director.play().unwrap();
        assert_eq!(director.time(), 6.0);

        director.stop().unwrap();
        director.play().unwrap();
        assert_eq!(director.time(), 0.0);
    }

    #[test]
    fn test_stop_releases_and_silences() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.play().unwrap();
        director.tick(3.0);
        assert!(handler.released().is_empty());

        director.stop().unwrap();
        assert_eq!(handler.released().len(), 2);
        handler.clear();
        assert!(director.tick(1.0).is_empty());
        assert!(handler.calls().is_empty());
    }

    #[test]
    fn test_stop_after_scrub_releases() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.seek(3.0).unwrap();
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert!(handler.released().is_empty());

        director.stop().unwrap();
        assert_eq!(handler.released().len(), 2);
        assert_eq!(director.time(), 0.0);

        director.play().unwrap();
        assert_eq!(director.time(), 0.0, "stop clears the scrubbed start");
    }

    #[test]
    fn test_drop_releases() {
        let Rig { mut director, handler, .. } = rig(DirectorSettings::default());
        director.seek(1.0).unwrap();
        drop(director);
        assert_eq!(handler.released().len(), 1);
    }

    #[test]
    fn test_missing_asset_disables_playback() {
        let sink = RecordingSink::new();
        let handler = RecordingHandler::new();
        let store = MemoryAssetStore::new();
        let mut director = Director::builder()
            .with_settings(DirectorSettings {
                play_on_start: true,
                ..DirectorSettings::default()
            })
            .with_handler(TrackType::Animation, handler.clone())
            .with_sink(sink.clone())
            .attach(&store, &"missing".into());

        assert!(!director.is_enabled());
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert_eq!(director.timeline_ref(), Some(&TimelineRef::from("missing")));
        assert!(director.play().is_ok());
        assert_eq!(director.state(), PlaybackState::Stopped);
        assert!(director.tick(1.0).is_empty());
        assert_eq!(director.seek(1.0), Err(StateError::PlaybackDisabled));
        assert_eq!(sink.count(DiagnosticKind::MissingAsset), 1);
        assert!(handler.calls().is_empty());
    }

    #[test]
    fn test_invalid_timeline_disables_playback() {
        let (mut timeline, _) = scenario_timeline();
        let copy = timeline.tracks[0].clone();
        timeline.tracks.push(copy);
        let Rig { director, sink, .. } = rig_with(timeline, DirectorSettings::default());
        assert!(!director.is_enabled());
        assert_eq!(sink.count(DiagnosticKind::MissingAsset), 1);
    }

    #[test]
    fn test_attach_from_store() {
        let (timeline, _) = scenario_timeline();
        let mut store = MemoryAssetStore::new();
        store.insert("intro", timeline);
        let director = Director::builder().attach(&store, &"intro".into());
        assert!(director.is_enabled());
        assert_eq!(director.current_frame(), Some(0));
    }

    #[test]
    fn test_empty_timeline_reported() {
        let empty = Timeline::new("Empty", 5.0, 30.0).unwrap();
        let Rig { sink, director, .. } = rig_with(empty, DirectorSettings::default());
        assert!(director.is_enabled());
        assert_eq!(sink.count(DiagnosticKind::EmptyTimeline), 1);
    }

    #[test]
    fn test_invalid_speed() {
        let Rig { mut director, .. } = rig(DirectorSettings {
            playback_speed: 0.0,
            ..DirectorSettings::default()
        });
        assert_eq!(director.settings().playback_speed, 1.0);
        assert_eq!(director.set_playback_speed(0.0), Err(StateError::InvalidSpeed(0.0)));
        assert!(director.set_playback_speed(f32::NAN).is_err());
        assert_eq!(director.settings().playback_speed, 1.0);
    }

    #[test]
    fn test_rebinding_heals() {
        let Rig { mut director, handler, sink } = rig(DirectorSettings::default());
        let (_, entities) = scenario_bindings();
        director.unbind(&"hero".into());
        director.play().unwrap();
        for _ in 0..3 {
            director.tick(0.5);
        }
        assert!(handler.calls().iter().all(|c| c.clip != "Walk"));
        assert_eq!(sink.count(DiagnosticKind::UnboundTrack), 1);

        director.bind(Binding::entity("hero", entities.hero));
        director.tick(0.5);
        assert!(handler.calls().iter().any(|c| c.clip == "Walk"));
    }

    #[test]
    fn test_shared_edits_seen_by_all_directors() {
        let (timeline, ids) = scenario_timeline();
        let shared = SharedTimeline::new(timeline);
        let Rig { director: mut first, handler: first_handler, .. } =
            rig_with(shared.clone(), DirectorSettings::default());
        let Rig { director: mut second, handler: second_handler, .. } =
            rig_with(shared.clone(), DirectorSettings::default());

        let walk = shared.snapshot().track(ids.walk).unwrap().clips()[0].id;
        shared.edit(|t| t.move_clip(ids.walk, walk, 5.0)).unwrap();

        first.seek(6.0).unwrap();
        second.seek(6.0).unwrap();
        for handler in [first_handler, second_handler] {
            let walk_call = handler.calls().into_iter().find(|c| c.clip == "Walk").unwrap();
            assert!(approx_eq(walk_call.local_time, 1.0));
        }
    }

    #[test]
    fn test_markers_crossed_during_playback() {
        let (mut timeline, _) = scenario_timeline();
        let cues = timeline
            .add_track(Track::new("Cues", TrackType::Marker).with_binding("hero"))
            .unwrap();
        for (name, start) in [("begin", 0.0), ("mid", 5.0), ("late", 9.5)] {
            let clip = Clip::new(name, start, 0.1).unwrap().with_value(KEY_EVENT, name);
            timeline.add_clip(cues, clip).unwrap();
        }
        let Rig { mut director, .. } = rig_with(timeline, looping());

        director.seek(5.0).unwrap();
        director.seek(0.0).unwrap();
        assert!(director.take_markers().is_empty(), "scrubbing fires nothing");

        director.play().unwrap();
        director.tick(1.0);
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["begin"]);

        director.tick(4.0);
        director.tick(4.0);
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["mid"]);

        // 9.0 -> wraps to 1.0, crossing "late" then "begin"
        director.tick(2.0);
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["late", "begin"]);
    }

    #[test]
    fn test_markers_across_whole_cycles() {
        let (mut timeline, _) = scenario_timeline();
        let cues = timeline.add_track(Track::new("Cues", TrackType::Marker)).unwrap();
        for (name, start) in [("begin", 0.0), ("mid", 5.0), ("late", 9.5)] {
            let clip = Clip::new(name, start, 0.1).unwrap().with_value(KEY_EVENT, name);
            timeline.add_clip(cues, clip).unwrap();
        }
        let Rig { mut director, .. } = rig_with(
            timeline,
            DirectorSettings {
                looping: true,
                start_time: Some(9.0),
                ..DirectorSettings::default()
            },
        );
        director.play().unwrap();

        // 9.0 -> 21.0 wraps twice and lands on 1.0
        director.tick(12.0);
        assert!(approx_eq(director.time(), 1.0));
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["late", "begin", "mid", "late", "begin"]);

        director.set_playback_speed(-1.0).unwrap();
        // 1.0 -> -11.0 wraps twice backwards and lands on 9.0
        director.tick(12.0);
        assert!(approx_eq(director.time(), 9.0));
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["begin", "late", "mid", "begin", "late"]);
    }

    #[test]
    fn test_markers_in_reverse() {
        let mut timeline = Timeline::new("Reverse", 10.0, 30.0).unwrap();
        let cues = timeline.add_track(Track::new("Cues", TrackType::Marker)).unwrap();
        for (name, start) in [("a", 2.0), ("b", 4.0)] {
            let clip = Clip::new(name, start, 0.1).unwrap().with_value(KEY_EVENT, name);
            timeline.add_clip(cues, clip).unwrap();
        }
        let Rig { mut director, .. } = rig_with(
            timeline,
            DirectorSettings {
                playback_speed: -1.0,
                start_time: Some(5.0),
                ..DirectorSettings::default()
            },
        );
        director.play().unwrap();
        director.tick(4.0);
        let events: Vec<_> = director.take_markers().into_iter().map(|m| m.event).collect();
        assert_eq!(events, ["b", "a"]);
    }

    #[test]
    fn test_settings_from_ron() {
        let settings: DirectorSettings = ron::from_str("(looping: true, playback_speed: -1.5)").unwrap();
        assert!(settings.looping);
        assert!(!settings.play_on_start);
        assert_eq!(settings.playback_speed, -1.5);
        assert_eq!(settings.start_time, None);
    }
}
