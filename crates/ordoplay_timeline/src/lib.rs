// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline sequencing and evaluation for OrdoPlay.
//!
//! This crate plays authored timelines against a host:
//! - Clips with extrapolation (hold, loop, ping-pong)
//! - Typed tracks with mute/solo and nested groups
//! - Role-based bindings resolved per director
//! - Handler dispatch with playback/preview modes
//! - Directors driving playback from a host tick
//!
//! ## Architecture
//!
//! Data flows one way each tick:
//! - [`Director`] advances time and takes a [`Timeline`] snapshot
//! - [`evaluate()`] turns `(timeline, time)` into one sample per track
//! - [`Dispatcher`] resolves bindings and calls the registered [`TrackHandler`]
//!
//! Timelines are shared through [`SharedTimeline`]; edits are validated and
//! published whole, so a pass never sees a half-applied edit.

pub mod asset;
pub mod binding;
pub mod clip;
pub mod diagnostics;
pub mod director;
pub mod dispatch;
pub mod edit;
pub mod evaluate;
pub mod group;
pub mod payload;
pub mod timeline;
pub mod track;

#[cfg(test)]
mod testing;

pub use asset::{
    decode_timeline, AssetError, AssetFormat, AssetStore, FileAssetStore, MemoryAssetStore,
    SharedTimeline, TimelineRef,
};
pub use binding::{resolve, Binding, BindingError, BindingId, BindingSet, EntityId};
pub use clip::{Clip, ClipId, Extrapolation};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics, TracingSink};
pub use director::{
    Director, DirectorBuilder, DirectorSettings, MarkerEvent, PlaybackState, StateError,
};
pub use dispatch::{DispatchMode, DispatchOutcome, Dispatcher, HandlerRegistry, TrackHandler};
pub use edit::EditError;
pub use evaluate::{evaluate, sample_track, Evaluation, Sample};
pub use group::{Group, GroupChild, GroupId};
pub use payload::{
    ActivationPayload, AnimationPayload, AudioPayload, MarkerPayload, Payload, PayloadError,
    PayloadValue,
};
pub use timeline::{Timeline, TimelineId, TIMELINE_FORMAT_VERSION};
pub use track::{Track, TrackId, TrackType};
