// SPDX-License-Identifier: MIT OR Apache-2.0
//! Organizational groups of tracks.
//!
//! Groups only affect how an authoring surface presents tracks; evaluation
//! never looks at them.

use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupChild {
    /// A track
    Track(TrackId),
    /// A nested group
    Group(GroupId),
}

/// Named folder of tracks and groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID
    pub id: GroupId,
    /// Group name
    pub name: String,
    /// Children in display order
    #[serde(default)]
    pub children: Vec<GroupChild>,
}

impl Group {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Add a child while building a group
    pub fn with_child(mut self, child: GroupChild) -> Self {
        self.children.push(child);
        self
    }

    /// Nested group IDs
    pub fn child_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.children.iter().filter_map(|c| match c {
            GroupChild::Group(id) => Some(*id),
            GroupChild::Track(_) => None,
        })
    }
}
