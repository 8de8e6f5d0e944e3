//! Animators: per-property keyframe lists attached to nodes.

use serde::{Deserialize, Serialize};

use crate::document::SceneItem;
use crate::error::{DocumentError, DocumentResult};
use crate::model::{Node, PropertyValue, ValueKind};
use crate::store::Id;

/// The node properties that can carry keyframes.
///
/// Each variant is a typed accessor pair over [`Node`]: [`read`] returns the
/// current value, [`write`] stores one after checking its kind. Operations
/// dispatch on this enum instead of looking fields up by name.
///
/// [`read`]: AnimatedProperty::read
/// [`write`]: AnimatedProperty::write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimatedProperty {
    Position,
    Rotation,
    Scale,
    Color,
    Visible,
}

impl AnimatedProperty {
    /// The value kind this property stores.
    pub fn value_kind(self) -> ValueKind {
        match self {
            AnimatedProperty::Position | AnimatedProperty::Scale => ValueKind::Vec2,
            AnimatedProperty::Rotation => ValueKind::Float,
            AnimatedProperty::Color => ValueKind::Color,
            AnimatedProperty::Visible => ValueKind::Bool,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnimatedProperty::Position => "position",
            AnimatedProperty::Rotation => "rotation",
            AnimatedProperty::Scale => "scale",
            AnimatedProperty::Color => "color",
            AnimatedProperty::Visible => "visible",
        }
    }

    /// Reads the current value from a node.
    pub fn read(self, node: &Node) -> PropertyValue {
        match self {
            AnimatedProperty::Position => PropertyValue::Vec2(node.position),
            AnimatedProperty::Rotation => PropertyValue::Float(node.rotation),
            AnimatedProperty::Scale => PropertyValue::Vec2(node.scale),
            AnimatedProperty::Color => PropertyValue::Color(node.color),
            AnimatedProperty::Visible => PropertyValue::Bool(node.visible),
        }
    }

    /// Writes a value to a node, rejecting mismatched kinds before any
    /// mutation.
    pub fn write(self, node: &mut Node, value: PropertyValue) -> DocumentResult {
        if value.kind() != self.value_kind() {
            return Err(DocumentError::KeyframeKindMismatch {
                expected: self.value_kind(),
                found: value.kind(),
            });
        }
        match (self, value) {
            (AnimatedProperty::Position, PropertyValue::Vec2(v)) => node.position = v,
            (AnimatedProperty::Rotation, PropertyValue::Float(v)) => node.rotation = v,
            (AnimatedProperty::Scale, PropertyValue::Vec2(v)) => node.scale = v,
            (AnimatedProperty::Color, PropertyValue::Color(v)) => node.color = v,
            (AnimatedProperty::Visible, PropertyValue::Bool(v)) => node.visible = v,
            _ => unreachable!("kind checked above"),
        }
        Ok(())
    }
}

/// Interpolation curve between a keyframe and its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    /// Hold the left value until the next keyframe.
    Step,
    EaseIn,
    EaseOut,
}

impl Easing {
    /// Maps linear `t` in `[0, 1]` to the eased parameter.
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::Step => 0.0,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
        }
    }
}

/// A single keyframe: a value at a frame, with the easing toward the next
/// keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: u32,
    pub value: PropertyValue,
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(frame: u32, value: PropertyValue) -> Self {
        Self {
            frame,
            value,
            easing: Easing::Linear,
        }
    }

    /// Set the easing toward the next keyframe.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// Keyframes for one property of one node within one animation.
///
/// The key list is kept sorted by frame with at most one keyframe per
/// frame; keyframe operations maintain this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    /// The property being animated.
    pub target: AnimatedProperty,
    /// Id of the animation this animator belongs to.
    pub animation_id: String,
    pub(crate) keys: Vec<Keyframe>,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
}

impl Animator {
    pub fn new(target: AnimatedProperty, animation_id: impl Into<String>) -> Self {
        Self {
            target,
            animation_id: animation_id.into(),
            keys: Vec::new(),
            wrapper: None,
        }
    }

    /// Keyframes ordered by ascending frame.
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Binary search for a frame: `Ok(i)` if `keys[i]` sits exactly on the
    /// frame, `Err(i)` with the insertion position otherwise.
    pub fn key_position(&self, frame: u32) -> Result<usize, usize> {
        self.keys.binary_search_by_key(&frame, |key| key.frame)
    }

    pub fn key_at(&self, frame: u32) -> Option<&Keyframe> {
        self.key_position(frame).ok().map(|i| &self.keys[i])
    }

    /// Samples the animator at a frame.
    ///
    /// Returns `None` when there are no keyframes. Frames outside the keyed
    /// range clamp to the first or last value; frames between two keyframes
    /// interpolate using the left keyframe's easing.
    pub fn value_at(&self, frame: u32) -> Option<PropertyValue> {
        let first = self.keys.first()?;
        if frame <= first.frame {
            return Some(first.value.clone());
        }
        let last = self.keys.last()?;
        if frame >= last.frame {
            return Some(last.value.clone());
        }
        let next = match self.key_position(frame) {
            Ok(i) => return Some(self.keys[i].value.clone()),
            Err(i) => i,
        };
        let left = &self.keys[next - 1];
        let right = &self.keys[next];
        let span = (right.frame - left.frame) as f32;
        let t = (frame - left.frame) as f32 / span;
        Some(left.value.interpolate(&right.value, left.easing.apply(t)))
    }
}
