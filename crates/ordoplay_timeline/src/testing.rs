// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for unit tests.

use crate::binding::{Binding, BindingSet, EntityId};
use crate::clip::Clip;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::dispatch::{DispatchMode, TrackHandler};
use crate::payload::{KEY_ACTIVE, KEY_CLIP_ID};
use crate::timeline::Timeline;
use crate::track::{Track, TrackId, TrackType};
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

pub(crate) struct ScenarioIds {
    pub walk: TrackId,
    pub show: TrackId,
    pub custom: TrackId,
}

/// Ten seconds at 30 fps: a walk animation on "hero" over [0, 4], an
/// activation on "prop" over [2, 10] and an empty custom track on "fx".
pub(crate) fn scenario_timeline() -> (Timeline, ScenarioIds) {
    let mut timeline = Timeline::new("Scenario", 10.0, 30.0).unwrap();

    let walk = Track::new("Walk", TrackType::Animation)
        .with_binding("hero")
        .with_clip(Clip::new("Walk", 0.0, 4.0).unwrap().with_value(KEY_CLIP_ID, "Walk"))
        .unwrap();
    let show = Track::new("Show", TrackType::Activation)
        .with_binding("prop")
        .with_clip(Clip::new("Show", 2.0, 8.0).unwrap().with_value(KEY_ACTIVE, true))
        .unwrap();
    let custom = Track::new("Custom", TrackType::Custom).with_binding("fx");

    let ids = ScenarioIds {
        walk: timeline.add_track(walk).unwrap(),
        show: timeline.add_track(show).unwrap(),
        custom: timeline.add_track(custom).unwrap(),
    };
    (timeline, ids)
}

pub(crate) struct ScenarioEntities {
    pub hero: EntityId,
    pub prop: EntityId,
}

pub(crate) fn scenario_bindings() -> (BindingSet, ScenarioEntities) {
    let entities = ScenarioEntities {
        hero: EntityId::new(),
        prop: EntityId::new(),
    };
    let bindings = BindingSet::new()
        .with(Binding::entity("hero", entities.hero))
        .with(Binding::entity("prop", entities.prop))
        .with(Binding::entity("fx", EntityId::new()));
    (bindings, entities)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub target: EntityId,
    pub clip: String,
    pub local_time: f32,
    pub mode: DispatchMode,
}

#[derive(Default)]
struct Recorded {
    calls: Vec<Call>,
    released: Vec<EntityId>,
}

/// Handler that records every call; clones share the record
#[derive(Clone, Default)]
pub(crate) struct RecordingHandler {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorded.lock().calls.clone()
    }

    pub fn clips(&self) -> Vec<String> {
        self.recorded.lock().calls.iter().map(|c| c.clip.clone()).collect()
    }

    pub fn released(&self) -> Vec<EntityId> {
        self.recorded.lock().released.clone()
    }

    pub fn clear(&self) {
        let mut recorded = self.recorded.lock();
        recorded.calls.clear();
        recorded.released.clear();
    }
}

impl TrackHandler for RecordingHandler {
    fn handle(&mut self, target: EntityId, clip: &Clip, local_time: f32, mode: DispatchMode) {
        self.recorded.lock().calls.push(Call {
            target,
            clip: clip.name.clone(),
            local_time,
            mode,
        });
    }

    fn release(&mut self, target: EntityId) {
        self.recorded.lock().released.push(target);
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.lock().iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().push(diagnostic.clone());
    }
}
