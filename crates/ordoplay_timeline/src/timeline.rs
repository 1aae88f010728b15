// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline asset containing tracks and groups.

use crate::clip::Clip;
use crate::edit::EditError;
use crate::group::{Group, GroupChild, GroupId};
use crate::track::{Track, TrackId, TrackType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Asset format version written by this crate
pub const TIMELINE_FORMAT_VERSION: u32 = 1;

/// Unique identifier for a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// A reusable sequence of tracks over a time axis.
///
/// Read-only while a director evaluates it; mutated only through the edit
/// operations in [`crate::edit`], which keep every invariant intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Unique timeline ID
    pub id: TimelineId,
    /// Timeline name
    pub name: String,
    pub(crate) duration: f32,
    pub(crate) frame_rate: f32,
    /// Tracks in evaluation/display order
    #[serde(default)]
    pub(crate) tracks: Vec<Track>,
    #[serde(default)]
    pub(crate) groups: Vec<Group>,
    /// Asset format version
    pub version: u32,
    /// Incremented by every successful edit
    #[serde(default)]
    pub(crate) revision: u64,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(name: impl Into<String>, duration: f32, frame_rate: f32) -> Result<Self, EditError> {
        check_positive("timeline duration", duration)?;
        check_positive("frame rate", frame_rate)?;
        Ok(Self {
            id: TimelineId::new(),
            name: name.into(),
            duration,
            frame_rate,
            tracks: Vec::new(),
            groups: Vec::new(),
            version: TIMELINE_FORMAT_VERSION,
            revision: 0,
        })
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Frame rate in frames per second
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Edit counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == track_id)
    }

    pub(crate) fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == track_id)
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Get all groups
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Get a group
    pub fn group(&self, group_id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// Whether any track is soloed
    pub fn has_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    /// Clamp a time into `[0, duration]`
    pub fn clamp_time(&self, time: f32) -> f32 {
        if time.is_nan() {
            return 0.0;
        }
        time.clamp(0.0, self.duration)
    }

    /// Get the end of the latest clip on any track
    pub fn content_end(&self) -> f32 {
        self.tracks
            .iter()
            .map(Track::content_end)
            .fold(0.0, f32::max)
    }

    /// Clips extending past the timeline duration.
    ///
    /// Their tail is never sampled; editors should warn about them.
    pub fn unreachable_clips(&self) -> impl Iterator<Item = (&Track, &Clip)> {
        self.tracks.iter().flat_map(move |t| {
            t.clips()
                .iter()
                .filter(move |c| c.end() > self.duration)
                .map(move |c| (t, c))
        })
    }

    /// Convert time to frame number
    pub fn time_to_frame(&self, time: f32) -> u32 {
        (self.clamp_time(time) * self.frame_rate) as u32
    }

    /// Convert frame number to time
    pub fn frame_to_time(&self, frame: u32) -> f32 {
        frame as f32 / self.frame_rate
    }

    /// Round a time to the nearest frame boundary
    pub fn snap_to_frame(&self, time: f32) -> f32 {
        self.clamp_time((time * self.frame_rate).round() / self.frame_rate)
    }

    /// Number of frame boundaries in `[0, duration]`
    pub fn frame_count(&self) -> u32 {
        self.time_to_frame(self.duration) + 1
    }

    /// Check every data-model invariant.
    ///
    /// Loaded assets go through this before a director may play them.
    pub fn validate(&self) -> Result<(), EditError> {
        check_positive("timeline duration", self.duration)?;
        check_positive("frame rate", self.frame_rate)?;

        let mut track_ids = HashSet::new();
        for track in &self.tracks {
            if !track_ids.insert(track.id()) {
                return Err(EditError::DuplicateId(format!("track {:?}", track.id())));
            }
            track.validate()?;
        }

        let mut group_ids = HashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id) {
                return Err(EditError::DuplicateId(format!("group {:?}", group.id)));
            }
            for child in &group.children {
                let known = match child {
                    GroupChild::Track(id) => track_ids.contains(id),
                    GroupChild::Group(id) => self.group(*id).is_some(),
                };
                if !known {
                    return Err(EditError::NotFound(format!("group child {child:?}")));
                }
            }
        }

        self.check_group_cycles()
    }

    /// Reject cycles in the group containment graph
    pub(crate) fn check_group_cycles(&self) -> Result<(), EditError> {
        let children: HashMap<GroupId, Vec<GroupId>> = self
            .groups
            .iter()
            .map(|g| (g.id, g.child_groups().collect()))
            .collect();

        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        for group in &self.groups {
            visit_group(group.id, &children, &mut visited, &mut temp_mark)?;
        }
        Ok(())
    }

    /// Tracks of one type
    pub fn tracks_of_type(&self, track_type: TrackType) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.track_type() == track_type)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

fn check_positive(what: &'static str, value: f32) -> Result<(), EditError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EditError::InvalidRange { what, value })
    }
}

fn visit_group(
    group_id: GroupId,
    children: &HashMap<GroupId, Vec<GroupId>>,
    visited: &mut HashSet<GroupId>,
    temp_mark: &mut HashSet<GroupId>,
) -> Result<(), EditError> {
    if temp_mark.contains(&group_id) {
        return Err(EditError::CycleDetected(group_id));
    }
    if visited.contains(&group_id) {
        return Ok(());
    }

    temp_mark.insert(group_id);
    for child in children.get(&group_id).into_iter().flatten() {
        visit_group(*child, children, visited, temp_mark)?;
    }
    temp_mark.remove(&group_id);
    visited.insert(group_id);

    Ok(())
}
