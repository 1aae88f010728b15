// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline asset loading and sharing.
//!
//! Stores hand out plain [`Timeline`] values. Directors wrap them in a
//! [`SharedTimeline`]: readers take an `Arc` snapshot per pass, writers edit a
//! private copy and publish it in one swap.

use crate::edit::EditError;
use crate::timeline::{Timeline, TIMELINE_FORMAT_VERSION};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque reference to a timeline asset, as stored on a host entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineRef(pub String);

impl From<&str> for TimelineRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TimelineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error loading a timeline asset
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Nothing is stored under the reference
    #[error("Timeline not found: {0}")]
    NotFound(TimelineRef),

    /// The asset could not be decoded
    #[error("Failed to parse timeline {reference}: {message}")]
    ParseFailure {
        /// Asset reference
        reference: TimelineRef,
        /// Decoder message
        message: String,
    },

    /// The asset was written by an incompatible format version
    #[error("Timeline {reference} has format version {found}, expected {expected}")]
    VersionMismatch {
        /// Asset reference
        reference: TimelineRef,
        /// Version in the asset
        found: u32,
        /// Version this crate reads
        expected: u32,
    },

    /// The asset exists but could not be read
    #[error("Failed to read timeline {reference}: {source}")]
    Io {
        /// Asset reference
        reference: TimelineRef,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The asset decoded but breaks a data-model invariant
    #[error("Invalid timeline: {0}")]
    Invalid(#[from] EditError),
}

/// Source of timeline assets supplied by the host
pub trait AssetStore {
    /// Load the timeline behind a reference
    fn load_timeline(&self, reference: &TimelineRef) -> Result<Timeline, AssetError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    timelines: HashMap<TimelineRef, Timeline>,
}

impl MemoryAssetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a timeline under a reference
    pub fn insert(&mut self, reference: impl Into<TimelineRef>, timeline: Timeline) {
        self.timelines.insert(reference.into(), timeline);
    }

    /// Remove a timeline
    pub fn remove(&mut self, reference: &TimelineRef) -> Option<Timeline> {
        self.timelines.remove(reference)
    }
}

impl AssetStore for MemoryAssetStore {
    fn load_timeline(&self, reference: &TimelineRef) -> Result<Timeline, AssetError> {
        self.timelines
            .get(reference)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(reference.clone()))
    }
}

/// Store reading `.ron` or `.json` files below a root directory.
///
/// A reference without an extension tries `<ref>.ron`, then `<ref>.json`.
#[derive(Debug, Clone)]
pub struct FileAssetStore {
    root: PathBuf,
}

impl FileAssetStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, reference: &TimelineRef) -> Option<PathBuf> {
        let path = self.root.join(&reference.0);
        if path.extension().is_some() {
            return path.is_file().then_some(path);
        }
        ["ron", "json"]
            .into_iter()
            .map(|ext| path.with_extension(ext))
            .find(|p| p.is_file())
    }
}

impl AssetStore for FileAssetStore {
    fn load_timeline(&self, reference: &TimelineRef) -> Result<Timeline, AssetError> {
        let path = self
            .locate(reference)
            .ok_or_else(|| AssetError::NotFound(reference.clone()))?;
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            tracing::debug!("Failed to read {}: {e}", path.display());
            match e.kind() {
                std::io::ErrorKind::NotFound => AssetError::NotFound(reference.clone()),
                std::io::ErrorKind::InvalidData => AssetError::ParseFailure {
                    reference: reference.clone(),
                    message: e.to_string(),
                },
                _ => AssetError::Io {
                    reference: reference.clone(),
                    source: e,
                },
            }
        })?;
        let format = if path.extension().is_some_and(|e| e == "json") {
            AssetFormat::Json
        } else {
            AssetFormat::Ron
        };
        decode_timeline(reference, &contents, format)
    }
}

/// Encoding of a timeline asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    /// Rusty Object Notation
    Ron,
    /// JSON
    Json,
}

/// Just enough of a timeline to check its version before a full decode
#[derive(Deserialize)]
#[serde(rename = "Timeline")]
struct VersionProbe {
    version: u32,
}

/// Decode and version-check a timeline.
///
/// Invariants are not checked here; directors validate on attach.
pub fn decode_timeline(
    reference: &TimelineRef,
    contents: &str,
    format: AssetFormat,
) -> Result<Timeline, AssetError> {
    let parse_failure = |message: String| AssetError::ParseFailure {
        reference: reference.clone(),
        message,
    };

    let probe: VersionProbe = match format {
        AssetFormat::Ron => ron::from_str(contents).map_err(|e| parse_failure(e.to_string()))?,
        AssetFormat::Json => {
            serde_json::from_str(contents).map_err(|e| parse_failure(e.to_string()))?
        }
    };
    if probe.version != TIMELINE_FORMAT_VERSION {
        return Err(AssetError::VersionMismatch {
            reference: reference.clone(),
            found: probe.version,
            expected: TIMELINE_FORMAT_VERSION,
        });
    }

    match format {
        AssetFormat::Ron => ron::from_str(contents).map_err(|e| parse_failure(e.to_string())),
        AssetFormat::Json => serde_json::from_str(contents).map_err(|e| parse_failure(e.to_string())),
    }
}

/// A timeline shared between directors and editors.
///
/// Cloning the handle shares the asset. Readers never observe a half-applied
/// edit: [`SharedTimeline::edit`] works on a copy and swaps it in whole.
#[derive(Debug, Clone)]
pub struct SharedTimeline {
    current: Arc<RwLock<Arc<Timeline>>>,
}

impl SharedTimeline {
    /// Share a timeline
    pub fn new(timeline: Timeline) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(timeline))),
        }
    }

    /// Get the current immutable snapshot
    pub fn snapshot(&self) -> Arc<Timeline> {
        self.current.read().clone()
    }

    /// Apply edits to a copy and publish it if `edit` succeeds and the result
    /// still validates.
    ///
    /// Writers are serialized; on error the published snapshot is untouched.
    pub fn edit<R>(
        &self,
        edit: impl FnOnce(&mut Timeline) -> Result<R, EditError>,
    ) -> Result<R, EditError> {
        let mut current = self.current.write();
        let mut next = Timeline::clone(&current);
        let result = edit(&mut next)?;
        next.validate()?;
        *current = Arc::new(next);
        Ok(result)
    }

    /// Whether two handles share the same asset
    pub fn ptr_eq(&self, other: &SharedTimeline) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl From<Timeline> for SharedTimeline {
    fn from(timeline: Timeline) -> Self {
        Self::new(timeline)
    }
}
