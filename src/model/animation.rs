//! Animations, timeline markers, and tracks.

use serde::{Deserialize, Serialize};

use crate::document::SceneItem;
use crate::store::Id;

/// Reserved animation id for the zero pose.
///
/// The zero pose is a one-frame animation capturing the rest value of each
/// animated property. When a property receives its first real keyframe, a
/// zero-pose keyframe with the property's current value is recorded
/// alongside it, so resetting the timeline restores the rest pose.
pub const ZERO_POSE_ID: &str = "@zero-pose";

/// A named animation owned by a node.
///
/// In the document tree an animation is a leaf row under its owning node.
/// Its markers and tracks are shown in a separate per-animation tree whose
/// root is the animation itself (see `Document::animation_view`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Stable string identifier, unique within the owning node's scope.
    pub id: String,
    /// Length in frames.
    pub length: u32,
    pub looped: bool,
    /// Marker ids ordered by ascending frame.
    #[serde(skip)]
    pub(crate) markers: Vec<Id<Marker>>,
    #[serde(skip)]
    pub(crate) tracks: Vec<Id<AnimationTrack>>,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
    #[serde(skip)]
    pub(crate) view_root: Option<Id<SceneItem>>,
}

impl Animation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            length: 0,
            looped: false,
            markers: Vec::new(),
            tracks: Vec::new(),
            wrapper: None,
            view_root: None,
        }
    }

    /// Creates the zero-pose animation.
    pub fn zero_pose() -> Self {
        Self::new(ZERO_POSE_ID)
    }

    /// Set the length in frames.
    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Set whether playback loops.
    #[must_use]
    pub fn with_looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    pub fn is_zero_pose(&self) -> bool {
        self.id == ZERO_POSE_ID
    }

    /// Marker ids ordered by ascending frame.
    pub fn markers(&self) -> &[Id<Marker>] {
        &self.markers
    }

    pub fn tracks(&self) -> &[Id<AnimationTrack>] {
        &self.tracks
    }
}

/// What happens when playback reaches a marker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerAction {
    #[default]
    None,
    /// Pause playback at the marker frame.
    Pause,
    /// Jump to another frame.
    JumpTo(u32),
    /// Raise a named event to game code.
    Event(String),
}

/// A labeled point on an animation's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub frame: u32,
    pub action: MarkerAction,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
}

impl Marker {
    pub fn new(label: impl Into<String>, frame: u32) -> Self {
        Self {
            label: label.into(),
            frame,
            action: MarkerAction::None,
            wrapper: None,
        }
    }

    /// Set the marker action.
    #[must_use]
    pub fn with_action(mut self, action: MarkerAction) -> Self {
        self.action = action;
        self
    }
}

/// An auxiliary timeline row of an animation, e.g. a sound or event lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    pub name: String,
    pub muted: bool,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
}

impl AnimationTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            muted: false,
            wrapper: None,
        }
    }

    /// Set whether the track is muted.
    #[must_use]
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}
