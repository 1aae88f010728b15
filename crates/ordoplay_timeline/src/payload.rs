// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip payloads and their per-track-type schemas.
//!
//! A payload is an opaque key/value map as far as evaluation is concerned.
//! Each track type declares the keys its handlers rely on; those are checked
//! once when a clip enters a timeline (load or edit), never per tick.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Payload key naming the animation clip to pose.
pub const KEY_CLIP_ID: &str = "clipId";
/// Payload key holding the activation state.
pub const KEY_ACTIVE: &str = "active";
/// Payload key naming the sound asset.
pub const KEY_SOUND: &str = "sound";
/// Payload key holding an optional sound volume.
pub const KEY_VOLUME: &str = "volume";
/// Payload key naming a marker event.
pub const KEY_EVENT: &str = "event";

/// Value stored under a payload key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Boolean
    Bool(bool),
    /// Number
    Number(f32),
    /// Text (asset keys, event names)
    Text(String),
}

impl PayloadValue {
    /// Get as bool if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as number if possible
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PayloadValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as text if possible
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for PayloadValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Key/value data carried by a clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(IndexMap<String, PayloadValue>);

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    /// Iterate over entries in authored order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn text(&self, key: &'static str) -> Result<&str, PayloadError> {
        let value = self.get(key).ok_or(PayloadError::MissingKey { key })?;
        value.as_text().ok_or(PayloadError::WrongType { key, expected: "text" })
    }

    fn boolean(&self, key: &'static str) -> Result<bool, PayloadError> {
        let value = self.get(key).ok_or(PayloadError::MissingKey { key })?;
        value.as_bool().ok_or(PayloadError::WrongType { key, expected: "a bool" })
    }

    fn optional_number(&self, key: &'static str) -> Result<Option<f32>, PayloadError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_number()
                .map(Some)
                .ok_or(PayloadError::WrongType { key, expected: "a number" }),
        }
    }
}

/// Payload schema violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// A required key is absent
    #[error("missing required key `{key}`")]
    MissingKey {
        /// Missing key
        key: &'static str,
    },

    /// A key holds a value of the wrong kind
    #[error("key `{key}` must be {expected}")]
    WrongType {
        /// Offending key
        key: &'static str,
        /// Expected kind of value
        expected: &'static str,
    },
}

/// Payload view for animation clips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationPayload<'a> {
    /// Animation clip to pose
    pub clip_id: &'a str,
}

impl<'a> AnimationPayload<'a> {
    /// Read the view from a payload
    pub fn from_payload(payload: &'a Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            clip_id: payload.text(KEY_CLIP_ID)?,
        })
    }
}

/// Payload view for activation clips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationPayload {
    /// Visibility/enabled state while the clip is active
    pub active: bool,
}

impl ActivationPayload {
    /// Read the view from a payload
    pub fn from_payload(payload: &Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            active: payload.boolean(KEY_ACTIVE)?,
        })
    }
}

/// Payload view for audio clips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioPayload<'a> {
    /// Sound asset key
    pub sound: &'a str,
    /// Volume multiplier
    pub volume: f32,
}

impl<'a> AudioPayload<'a> {
    /// Read the view from a payload
    pub fn from_payload(payload: &'a Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            sound: payload.text(KEY_SOUND)?,
            volume: payload.optional_number(KEY_VOLUME)?.unwrap_or(1.0),
        })
    }
}

/// Payload view for marker clips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPayload<'a> {
    /// Event name
    pub event: &'a str,
}

impl<'a> MarkerPayload<'a> {
    /// Read the view from a payload
    pub fn from_payload(payload: &'a Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            event: payload.text(KEY_EVENT)?,
        })
    }
}
