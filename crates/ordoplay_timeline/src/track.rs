// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for timelines.

use crate::binding::BindingId;
use crate::clip::{Clip, ClipId};
use crate::edit::EditError;
use crate::payload::{
    ActivationPayload, AnimationPayload, AudioPayload, MarkerPayload, Payload, PayloadError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    /// Skeletal/property animation
    Animation,
    /// Object activation (visibility/enabled)
    Activation,
    /// Audio playback
    Audio,
    /// Named markers
    Marker,
    /// Host-defined behavior
    Custom,
}

impl TrackType {
    /// All track types, in display order
    pub const ALL: [TrackType; 5] = [
        Self::Animation,
        Self::Activation,
        Self::Audio,
        Self::Marker,
        Self::Custom,
    ];

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Animation => "Animation",
            Self::Activation => "Activation",
            Self::Audio => "Audio",
            Self::Marker => "Marker",
            Self::Custom => "Custom",
        }
    }

    /// Check a clip payload against this track type's schema
    pub fn validate_payload(&self, payload: &Payload) -> Result<(), PayloadError> {
        match self {
            Self::Animation => AnimationPayload::from_payload(payload).map(|_| ()),
            Self::Activation => ActivationPayload::from_payload(payload).map(|_| ()),
            Self::Audio => AudioPayload::from_payload(payload).map(|_| ()),
            Self::Marker => MarkerPayload::from_payload(payload).map(|_| ()),
            Self::Custom => Ok(()),
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed lane of clips driving one binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackRecord")]
pub struct Track {
    id: TrackId,
    track_type: TrackType,
    /// Track name
    pub name: String,
    /// Logical binding role resolved against the director's bindings
    #[serde(default)]
    pub binding: Option<BindingId>,
    /// Whether the track is muted
    #[serde(default)]
    pub muted: bool,
    /// Whether the track is soloed
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    clips: Vec<Clip>,
}

/// Track as stored in an asset; clips may be in any order
#[derive(Deserialize)]
#[serde(rename = "Track")]
struct TrackRecord {
    id: TrackId,
    track_type: TrackType,
    name: String,
    #[serde(default)]
    binding: Option<BindingId>,
    #[serde(default)]
    muted: bool,
    #[serde(default)]
    solo: bool,
    #[serde(default)]
    clips: Vec<Clip>,
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        let mut track = Self {
            id: record.id,
            track_type: record.track_type,
            name: record.name,
            binding: record.binding,
            muted: record.muted,
            solo: record.solo,
            clips: record.clips,
        };
        track.sort_clips();
        track
    }
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>, track_type: TrackType) -> Self {
        Self {
            id: TrackId::new(),
            track_type,
            name: name.into(),
            binding: None,
            muted: false,
            solo: false,
            clips: Vec::new(),
        }
    }

    /// Set the binding role
    pub fn with_binding(mut self, binding: impl Into<BindingId>) -> Self {
        self.binding = Some(binding.into());
        self
    }

    /// Add a clip while building a track.
    ///
    /// Fails like [`crate::Timeline::add_clip`] does, leaving the track as it was.
    pub fn with_clip(mut self, clip: Clip) -> Result<Self, EditError> {
        self.insert_clip(clip)?;
        Ok(self)
    }

    /// Track ID
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Track type
    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    /// Clips ordered by start time
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Get clip by ID
    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    /// Get clip count
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// End of the last clip
    pub fn content_end(&self) -> f32 {
        self.clips.iter().map(Clip::end).fold(0.0, f32::max)
    }

    /// Clip covering `time`.
    ///
    /// When clips overlap the one with the latest start wins; equal starts fall
    /// back to the clip declared last.
    pub fn active_clip(&self, time: f32) -> Option<&Clip> {
        self.clips.iter().rev().find(|c| c.contains(time))
    }

    /// Clips whose start lies in `[start, end]`
    pub fn clips_starting_in(&self, start: f32, end: f32) -> impl Iterator<Item = &Clip> {
        self.clips
            .iter()
            .filter(move |c| c.start >= start && c.start <= end)
    }

    pub(crate) fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    pub(crate) fn check_clip(&self, clip: &Clip) -> Result<(), EditError> {
        clip.validate_range()?;
        if self.clip(clip.id).is_some() {
            return Err(EditError::DuplicateId(format!("clip {:?}", clip.id)));
        }
        self.track_type
            .validate_payload(&clip.payload)
            .map_err(|source| EditError::InvalidPayload {
                track_type: self.track_type,
                source,
            })
    }

    pub(crate) fn insert_clip(&mut self, clip: Clip) -> Result<ClipId, EditError> {
        self.check_clip(&clip)?;
        let id = clip.id;
        self.clips.push(clip);
        self.sort_clips();
        Ok(id)
    }

    pub(crate) fn take_clip(&mut self, clip_id: ClipId) -> Option<Clip> {
        let idx = self.clips.iter().position(|c| c.id == clip_id)?;
        Some(self.clips.remove(idx))
    }

    /// Sort clips by start; stable, so equal starts keep declaration order
    pub(crate) fn sort_clips(&mut self) {
        self.clips.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    /// Check clip ranges, clip ID uniqueness and payload schemas
    pub fn validate(&self) -> Result<(), EditError> {
        let mut seen = HashSet::new();
        for clip in &self.clips {
            clip.validate_range()?;
            if !seen.insert(clip.id) {
                return Err(EditError::DuplicateId(format!("clip {:?}", clip.id)));
            }
            self.track_type
                .validate_payload(&clip.payload)
                .map_err(|source| EditError::InvalidPayload {
                    track_type: self.track_type,
                    source,
                })?;
        }
        Ok(())
    }
}
