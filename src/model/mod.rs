//! Domain entities stored in a scene document.
//!
//! - [`Node`] / [`Folder`]: the structural tree ([`node`])
//! - [`Animation`] / [`Marker`] / [`AnimationTrack`]: timelines ([`animation`])
//! - [`Animator`] / [`Keyframe`] / [`AnimatedProperty`]: keyframe data ([`animator`])
//! - [`PropertyValue`] / [`ValueKind`]: typed values ([`value`])
//!
//! These are plain data types. All mutation of entities that belong to a
//! document goes through operations (see [`crate::operations`]) so that
//! every change is recorded in history.

pub mod animation;
pub mod animator;
pub mod node;
pub mod value;

pub use animation::{Animation, AnimationTrack, Marker, MarkerAction, ZERO_POSE_ID};
pub use animator::{AnimatedProperty, Animator, Easing, Keyframe};
pub use node::{Folder, Node, NodeKind};
pub use value::{PropertyValue, ValueKind};
