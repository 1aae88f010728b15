// SPDX-License-Identifier: MIT OR Apache-2.0
//! Diagnostics reported to authoring surfaces.
//!
//! Reports are fire-and-forget and rate limited: a condition is reported once
//! and stays quiet until it clears.

use crate::binding::BindingId;
use crate::track::{TrackId, TrackType};
use std::collections::HashSet;
use std::sync::Arc;

/// Kind of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A track's binding role has no target
    UnboundTrack,
    /// A binding's capability hint disagrees with the track type
    CapabilityMismatch,
    /// No handler is registered for a track type
    MissingHandler,
    /// The timeline asset could not be loaded
    MissingAsset,
    /// The timeline has no tracks
    EmptyTimeline,
}

impl DiagnosticKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnboundTrack => "unbound-track",
            Self::CapabilityMismatch => "capability-mismatch",
            Self::MissingHandler => "missing-handler",
            Self::MissingAsset => "missing-asset",
            Self::EmptyTimeline => "empty-timeline",
        }
    }
}

/// A reported condition with its context
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Kind of condition
    pub kind: DiagnosticKind,
    /// Track concerned (if any)
    pub track: Option<TrackId>,
    /// Binding role concerned (if any)
    pub binding: Option<BindingId>,
    /// Human-readable context
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic without track context
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            track: None,
            binding: None,
            message: message.into(),
        }
    }

    /// Attach a track
    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    /// Attach a binding role
    pub fn with_binding(mut self, binding: Option<BindingId>) -> Self {
        self.binding = binding;
        self
    }

    fn key(&self) -> DiagnosticKey {
        (self.kind, self.track, self.binding.clone())
    }
}

type DiagnosticKey = (DiagnosticKind, Option<TrackId>, Option<BindingId>);

/// Receiver of diagnostics supplied by the host
pub trait DiagnosticSink: Send + Sync {
    /// Report a diagnostic; must not block
    fn report(&self, diagnostic: &Diagnostic);
}

/// Sink that forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        tracing::warn!(
            kind = diagnostic.kind.name(),
            track = ?diagnostic.track,
            binding = ?diagnostic.binding,
            "{}",
            diagnostic.message
        );
    }
}

/// Rate limiter in front of a sink
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
    active: HashSet<DiagnosticKey>,
}

impl Diagnostics {
    /// Create a limiter over a sink
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            active: HashSet::new(),
        }
    }

    /// Report a diagnostic unless the same condition is still active.
    ///
    /// Returns whether the sink was called.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        if !self.active.insert(diagnostic.key()) {
            return false;
        }
        self.sink.report(&diagnostic);
        true
    }

    /// Mark every condition of `kind` on `track` as cleared
    pub fn clear(&mut self, kind: DiagnosticKind, track: TrackId) {
        self.active
            .retain(|(k, t, _)| !(*k == kind && *t == Some(track)));
    }

    /// Forget all active conditions
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Number of conditions currently suppressed
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Get the underlying sink
    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

pub(crate) fn missing_handler(track_type: TrackType, track: TrackId) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::MissingHandler,
        format!("no handler registered for {track_type} tracks"),
    )
    .with_track(track)
}
