// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bindings from track roles to host targets.
//!
//! Bindings belong to a director, not to the timeline asset, so one asset can
//! drive different entities in different places.

use crate::track::{Track, TrackId, TrackType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity ID used as a binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Logical role a track declares, e.g. `"hero"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub String);

impl From<&str> for BindingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BindingId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binding of a track role to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Role this binding satisfies
    pub binding_id: BindingId,
    /// Target entity ID
    pub target: EntityId,
    /// Capability the target is expected to provide (optional)
    #[serde(default)]
    pub capability: Option<TrackType>,
}

impl Binding {
    /// Create a binding to an entity
    pub fn entity(binding_id: impl Into<BindingId>, target: EntityId) -> Self {
        Self {
            binding_id: binding_id.into(),
            target,
            capability: None,
        }
    }

    /// Create a binding with a capability hint
    pub fn with_capability(
        binding_id: impl Into<BindingId>,
        target: EntityId,
        capability: TrackType,
    ) -> Self {
        Self {
            binding_id: binding_id.into(),
            target,
            capability: Some(capability),
        }
    }

    /// Whether the capability hint (if any) agrees with a track type
    pub fn supports(&self, track_type: TrackType) -> bool {
        self.capability.map_or(true, |c| c == track_type)
    }
}

/// Bindings supplied by the host for one director
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Binding>", into = "Vec<Binding>")]
pub struct BindingSet {
    bindings: IndexMap<BindingId, Binding>,
}

impl BindingSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding while building a set
    pub fn with(mut self, binding: Binding) -> Self {
        self.insert(binding);
        self
    }

    /// Insert a binding, returning the one it replaced
    pub fn insert(&mut self, binding: Binding) -> Option<Binding> {
        self.bindings.insert(binding.binding_id.clone(), binding)
    }

    /// Remove a binding
    pub fn remove(&mut self, binding_id: &BindingId) -> Option<Binding> {
        self.bindings.shift_remove(binding_id)
    }

    /// Get a binding
    pub fn get(&self, binding_id: &BindingId) -> Option<&Binding> {
        self.bindings.get(binding_id)
    }

    /// Get all bindings
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Get binding count
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Deserialize from RON format (a list of bindings)
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl From<Vec<Binding>> for BindingSet {
    fn from(bindings: Vec<Binding>) -> Self {
        bindings.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<BindingSet> for Vec<Binding> {
    fn from(set: BindingSet) -> Self {
        set.bindings.into_values().collect()
    }
}

/// A track that cannot be bound this pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The track's role has no binding (or the track declares none)
    #[error("Track {track:?} is unbound (role {binding:?})")]
    Unbound {
        /// Track that was skipped
        track: TrackId,
        /// Role the track declared
        binding: Option<BindingId>,
    },
}

/// Look up the binding for a track.
///
/// An unbound track is an expected outcome: callers skip the track and report
/// it, they never abort the pass.
pub fn resolve<'a>(bindings: &'a BindingSet, track: &Track) -> Result<&'a Binding, BindingError> {
    track
        .binding
        .as_ref()
        .and_then(|id| bindings.get(id))
        .ok_or_else(|| BindingError::Unbound {
            track: track.id(),
            binding: track.binding.clone(),
        })
}
