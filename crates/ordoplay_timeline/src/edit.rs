// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural edit operations on timelines.
//!
//! Every operation validates before it mutates, so a rejected edit leaves the
//! timeline exactly as it was. Successful edits bump the timeline revision.
//! To publish edits to running directors, apply them through
//! [`crate::SharedTimeline::edit`].

use crate::binding::BindingId;
use crate::clip::{Clip, ClipId};
use crate::group::{Group, GroupChild, GroupId};
use crate::payload::PayloadError;
use crate::timeline::Timeline;
use crate::track::{Track, TrackId, TrackType};

/// Error raised by an edit operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    /// An ID already exists in the target collection
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A time value is out of range
    #[error("Invalid {what}: {value}")]
    InvalidRange {
        /// Quantity that was rejected
        what: &'static str,
        /// Rejected value
        value: f32,
    },

    /// The group graph would contain a cycle
    #[error("Group cycle through {0:?}")]
    CycleDetected(GroupId),

    /// The edit names something that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A clip payload does not match its track type
    #[error("Invalid {track_type} payload: {source}")]
    InvalidPayload {
        /// Type of the receiving track
        track_type: TrackType,
        /// Schema violation
        source: PayloadError,
    },
}

impl Timeline {
    /// Append a track
    pub fn add_track(&mut self, track: Track) -> Result<TrackId, EditError> {
        let id = track.id();
        if self.track(id).is_some() {
            return Err(EditError::DuplicateId(format!("track {id:?}")));
        }
        track.validate()?;
        self.tracks.push(track);
        self.revision += 1;
        Ok(id)
    }

    /// Remove a track and its group memberships
    pub fn remove_track(&mut self, track_id: TrackId) -> Result<Track, EditError> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id() == track_id)
            .ok_or_else(|| track_not_found(track_id))?;
        let track = self.tracks.remove(idx);
        for group in &mut self.groups {
            group.children.retain(|c| *c != GroupChild::Track(track_id));
        }
        self.revision += 1;
        Ok(track)
    }

    /// Add a clip to a track
    pub fn add_clip(&mut self, track_id: TrackId, clip: Clip) -> Result<ClipId, EditError> {
        let track = self
            .track_mut(track_id)
            .ok_or_else(|| track_not_found(track_id))?;
        let id = track.insert_clip(clip)?;
        self.revision += 1;
        Ok(id)
    }

    /// Remove a clip from a track
    pub fn remove_clip(&mut self, track_id: TrackId, clip_id: ClipId) -> Result<Clip, EditError> {
        let track = self
            .track_mut(track_id)
            .ok_or_else(|| track_not_found(track_id))?;
        let clip = track
            .take_clip(clip_id)
            .ok_or_else(|| clip_not_found(clip_id))?;
        self.revision += 1;
        Ok(clip)
    }

    /// Move a clip to a new start time
    pub fn move_clip(
        &mut self,
        track_id: TrackId,
        clip_id: ClipId,
        new_start: f32,
    ) -> Result<(), EditError> {
        if !new_start.is_finite() || new_start < 0.0 {
            return Err(EditError::InvalidRange {
                what: "clip start",
                value: new_start,
            });
        }
        let track = self
            .track_mut(track_id)
            .ok_or_else(|| track_not_found(track_id))?;
        let clip = track
            .clip_mut(clip_id)
            .ok_or_else(|| clip_not_found(clip_id))?;
        clip.start = new_start;
        track.sort_clips();
        self.revision += 1;
        Ok(())
    }

    /// Change a clip's duration, keeping its start
    pub fn trim_clip(
        &mut self,
        track_id: TrackId,
        clip_id: ClipId,
        new_duration: f32,
    ) -> Result<(), EditError> {
        if !new_duration.is_finite() || new_duration <= 0.0 {
            return Err(EditError::InvalidRange {
                what: "clip duration",
                value: new_duration,
            });
        }
        let clip = self
            .track_mut(track_id)
            .ok_or_else(|| track_not_found(track_id))?
            .clip_mut(clip_id)
            .ok_or_else(|| clip_not_found(clip_id))?;
        clip.duration = new_duration;
        self.revision += 1;
        Ok(())
    }

    /// Add a group.
    ///
    /// Every child must already exist in the timeline.
    pub fn add_group(&mut self, group: Group) -> Result<GroupId, EditError> {
        let id = group.id;
        if self.group(id).is_some() {
            return Err(EditError::DuplicateId(format!("group {id:?}")));
        }
        for child in &group.children {
            match child {
                GroupChild::Group(child_id) if *child_id == id => {
                    return Err(EditError::CycleDetected(id));
                }
                _ => self.check_child_exists(child)?,
            }
        }
        self.groups.push(group);
        self.revision += 1;
        Ok(id)
    }

    /// Append a child to an existing group
    pub fn add_group_child(&mut self, group_id: GroupId, child: GroupChild) -> Result<(), EditError> {
        if self.group(group_id).is_none() {
            return Err(group_not_found(group_id));
        }
        self.check_child_exists(&child)?;
        if let GroupChild::Group(child_id) = child {
            if child_id == group_id || self.group_contains(child_id, group_id) {
                return Err(EditError::CycleDetected(group_id));
            }
        }
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
            group.children.push(child);
        }
        self.revision += 1;
        Ok(())
    }

    /// Remove a group.
    ///
    /// Its children stay in the timeline; parents drop their reference to it.
    pub fn remove_group(&mut self, group_id: GroupId) -> Result<Group, EditError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| group_not_found(group_id))?;
        let group = self.groups.remove(idx);
        for parent in &mut self.groups {
            parent.children.retain(|c| *c != GroupChild::Group(group_id));
        }
        self.revision += 1;
        Ok(group)
    }

    /// Change the timeline duration
    pub fn set_duration(&mut self, duration: f32) -> Result<(), EditError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EditError::InvalidRange {
                what: "timeline duration",
                value: duration,
            });
        }
        self.duration = duration;
        self.revision += 1;
        Ok(())
    }

    /// Rename a track
    pub fn rename_track(
        &mut self,
        track_id: TrackId,
        name: impl Into<String>,
    ) -> Result<(), EditError> {
        let name = name.into();
        self.update_track(track_id, |t| t.name = name)
    }

    /// Set or clear a track's binding role
    pub fn set_track_binding(
        &mut self,
        track_id: TrackId,
        binding: Option<BindingId>,
    ) -> Result<(), EditError> {
        self.update_track(track_id, |t| t.binding = binding)
    }

    /// Mute or unmute a track
    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) -> Result<(), EditError> {
        self.update_track(track_id, |t| t.muted = muted)
    }

    /// Solo or unsolo a track
    pub fn set_track_solo(&mut self, track_id: TrackId, solo: bool) -> Result<(), EditError> {
        self.update_track(track_id, |t| t.solo = solo)
    }

    fn update_track(
        &mut self,
        track_id: TrackId,
        update: impl FnOnce(&mut Track),
    ) -> Result<(), EditError> {
        let track = self
            .track_mut(track_id)
            .ok_or_else(|| track_not_found(track_id))?;
        update(track);
        self.revision += 1;
        Ok(())
    }

    fn check_child_exists(&self, child: &GroupChild) -> Result<(), EditError> {
        let exists = match child {
            GroupChild::Track(id) => self.track(*id).is_some(),
            GroupChild::Group(id) => self.group(*id).is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(EditError::NotFound(format!("group child {child:?}")))
        }
    }

    /// Whether `target` is reachable from `root` through nested groups
    fn group_contains(&self, root: GroupId, target: GroupId) -> bool {
        let mut stack = vec![root];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(group) = self.group(id) {
                stack.extend(group.child_groups());
            }
        }
        false
    }
}

fn track_not_found(id: TrackId) -> EditError {
    EditError::NotFound(format!("track {id:?}"))
}

fn clip_not_found(id: ClipId) -> EditError {
    EditError::NotFound(format!("clip {id:?}"))
}

fn group_not_found(id: GroupId) -> EditError {
    EditError::NotFound(format!("group {id:?}"))
}
