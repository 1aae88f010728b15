// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clips and the mapping from timeline time to clip-local time.

use crate::edit::EditError;
use crate::payload::{Payload, PayloadValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a clip maps time outside (and inside) its natural span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Extrapolation {
    /// Clamp to the clip span
    #[default]
    None,
    /// Clamp to the clip span; handlers keep the last value past the end
    Hold,
    /// Repeat from the start
    Loop,
    /// Play forward then backward
    PingPong,
}

impl Extrapolation {
    /// Map a clip-relative time `t` (global time minus clip start) to local time.
    ///
    /// `duration` must be positive; clips enforce that on construction.
    pub fn map(self, t: f32, duration: f32) -> f32 {
        match self {
            Self::None | Self::Hold => t.clamp(0.0, duration),
            Self::Loop => {
                if t < 0.0 {
                    0.0
                } else {
                    t % duration
                }
            }
            Self::PingPong => {
                let cycle = 2.0 * duration;
                let c = ((t % cycle) + cycle) % cycle;
                if c <= duration {
                    c
                } else {
                    cycle - c
                }
            }
        }
    }
}

/// A time-bounded unit of payload data on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Clip ID, unique within its track
    pub id: ClipId,
    /// Clip name
    pub name: String,
    /// Start time in timeline seconds
    pub start: f32,
    /// Length in seconds, always positive
    pub duration: f32,
    /// Extrapolation policy
    #[serde(default)]
    pub extrapolation: Extrapolation,
    /// Handler data
    #[serde(default)]
    pub payload: Payload,
}

impl Clip {
    /// Create a new clip, rejecting a negative start or non-positive duration
    pub fn new(name: impl Into<String>, start: f32, duration: f32) -> Result<Self, EditError> {
        let clip = Self {
            id: ClipId::new(),
            name: name.into(),
            start,
            duration,
            extrapolation: Extrapolation::None,
            payload: Payload::new(),
        };
        clip.validate_range()?;
        Ok(clip)
    }

    /// Set the extrapolation policy
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Set the whole payload
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Add a single payload entry
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.payload.insert(key, value);
        self
    }

    /// End time in timeline seconds
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Whether `time` lies within `[start, end]`
    pub fn contains(&self, time: f32) -> bool {
        time >= self.start && time <= self.end()
    }

    /// Clip-local time for a global timeline time
    pub fn local_time(&self, global_time: f32) -> f32 {
        self.extrapolation.map(global_time - self.start, self.duration)
    }

    /// Check `start >= 0` and `duration > 0`
    pub fn validate_range(&self) -> Result<(), EditError> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(EditError::InvalidRange {
                what: "clip start",
                value: self.start,
            });
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(EditError::InvalidRange {
                what: "clip duration",
                value: self.duration,
            });
        }
        Ok(())
    }
}
