// SPDX-License-Identifier: MIT OR Apache-2.0
//! Routing of evaluated samples to host handlers.
//!
//! The dispatcher applies mute/solo and binding policy, then hands each sample
//! to the handler registered for the track type. It contains no animation,
//! visibility or audio logic of its own.

use crate::binding::{self, Binding, BindingError, BindingId, BindingSet, EntityId};
use crate::clip::Clip;
use crate::diagnostics::{self, Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics};
use crate::evaluate::{Evaluation, Sample};
use crate::track::{Track, TrackType};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

/// Why a pass is being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DispatchMode {
    /// Regular playback; handlers apply every effect
    #[default]
    Playback,
    /// Scrubbing; handlers must suppress audible or triggering effects
    /// while still applying visual state
    Preview,
}

impl DispatchMode {
    /// Whether side effects such as sound should be suppressed
    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview)
    }
}

/// Host system that interprets samples of one track type
pub trait TrackHandler: Send {
    /// Apply a clip at `local_time` to `target`.
    ///
    /// In [`DispatchMode::Preview`] audible/triggering effects must be skipped.
    fn handle(&mut self, target: EntityId, clip: &Clip, local_time: f32, mode: DispatchMode);

    /// Release side effects started on `target` (stop sounds, restore defaults).
    ///
    /// Called when the director stops or is torn down.
    fn release(&mut self, _target: EntityId) {}
}

impl<F> TrackHandler for F
where
    F: FnMut(EntityId, &Clip, f32, DispatchMode) + Send,
{
    fn handle(&mut self, target: EntityId, clip: &Clip, local_time: f32, mode: DispatchMode) {
        self(target, clip, local_time, mode);
    }
}

/// Handlers keyed by track type
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TrackType, Box<dyn TrackHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler while building a registry
    pub fn with(mut self, track_type: TrackType, handler: impl TrackHandler + 'static) -> Self {
        self.register(track_type, handler);
        self
    }

    /// Register a handler, replacing any previous one for the type
    pub fn register(&mut self, track_type: TrackType, handler: impl TrackHandler + 'static) {
        self.handlers.insert(track_type, Box::new(handler));
    }

    /// Remove the handler for a type
    pub fn unregister(&mut self, track_type: TrackType) -> Option<Box<dyn TrackHandler>> {
        self.handlers.remove(&track_type)
    }

    /// Whether a handler is registered for a type
    pub fn contains(&self, track_type: TrackType) -> bool {
        self.handlers.contains_key(&track_type)
    }

    fn get_mut(&mut self, track_type: TrackType) -> Option<&mut (dyn TrackHandler + 'static)> {
        self.handlers.get_mut(&track_type).map(|h| h.as_mut())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// What happened to one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler was invoked
    Dispatched,
    /// Skipped: the track is muted
    Muted,
    /// Skipped: another track is soloed
    SoloSkipped,
    /// Skipped: the track has no binding
    Unbound,
    /// Skipped: no clip is active
    Idle,
    /// Skipped: no handler is registered for the track type
    NoHandler,
}

/// Routes samples to handlers and remembers which targets need releasing
pub struct Dispatcher {
    handlers: HandlerRegistry,
    diagnostics: Diagnostics,
    engaged: IndexSet<(TrackType, EntityId)>,
}

impl Dispatcher {
    /// Create a dispatcher reporting to `sink`
    pub fn new(handlers: HandlerRegistry, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            handlers,
            diagnostics: Diagnostics::new(sink),
            engaged: IndexSet::new(),
        }
    }

    /// Get the handler registry
    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    /// Get the diagnostics limiter
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Dispatch every sample of an evaluation
    pub fn dispatch_all(
        &mut self,
        evaluation: &Evaluation<'_>,
        bindings: &BindingSet,
        mode: DispatchMode,
    ) -> Vec<DispatchOutcome> {
        let solo_active = evaluation.samples.iter().any(|s| s.track.solo);
        evaluation
            .samples
            .iter()
            .map(|sample| {
                let binding = binding::resolve(bindings, sample.track);
                self.dispatch(sample, binding, solo_active, mode)
            })
            .collect()
    }

    /// Dispatch one sample
    pub fn dispatch(
        &mut self,
        sample: &Sample<'_>,
        binding: Result<&Binding, BindingError>,
        solo_active: bool,
        mode: DispatchMode,
    ) -> DispatchOutcome {
        let track = sample.track;
        if track.muted {
            return DispatchOutcome::Muted;
        }
        if solo_active && !track.solo {
            return DispatchOutcome::SoloSkipped;
        }

        let binding = match binding {
            Ok(binding) => {
                self.diagnostics.clear(DiagnosticKind::UnboundTrack, track.id());
                binding
            }
            Err(BindingError::Unbound { binding, .. }) => {
                self.report_unbound(track, binding);
                return DispatchOutcome::Unbound;
            }
        };
        if !binding.supports(track.track_type()) {
            self.diagnostics.report(
                Diagnostic::new(
                    DiagnosticKind::CapabilityMismatch,
                    format!(
                        "binding `{}` is not declared for {} tracks",
                        binding.binding_id,
                        track.track_type()
                    ),
                )
                .with_track(track.id())
                .with_binding(Some(binding.binding_id.clone())),
            );
        } else {
            self.diagnostics.clear(DiagnosticKind::CapabilityMismatch, track.id());
        }

        let Some(clip) = sample.clip else {
            return DispatchOutcome::Idle;
        };
        let Some(handler) = self.handlers.get_mut(track.track_type()) else {
            self.diagnostics
                .report(diagnostics::missing_handler(track.track_type(), track.id()));
            return DispatchOutcome::NoHandler;
        };

        handler.handle(binding.target, clip, sample.local_time, mode);
        self.engaged.insert((track.track_type(), binding.target));
        DispatchOutcome::Dispatched
    }

    /// Ask handlers to release every target they were given since the last release
    pub fn release_all(&mut self) {
        for (track_type, target) in self.engaged.drain(..) {
            if let Some(handler) = self.handlers.get_mut(track_type) {
                handler.release(target);
            }
        }
    }

    /// Number of targets awaiting release
    pub fn engaged_count(&self) -> usize {
        self.engaged.len()
    }

    fn report_unbound(&mut self, track: &Track, binding: Option<BindingId>) {
        let message = match &binding {
            Some(id) => format!("track `{}` has no binding for role `{id}`", track.name),
            None => format!("track `{}` declares no binding", track.name),
        };
        self.diagnostics.report(
            Diagnostic::new(DiagnosticKind::UnboundTrack, message)
                .with_track(track.id())
                .with_binding(binding),
        );
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers)
            .field("engaged", &self.engaged)
            .finish_non_exhaustive()
    }
}
