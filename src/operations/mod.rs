//! The operations the editor performs on a document.
//!
//! - [`list`] / [`property`] / [`map`]: generic reversible primitives over
//!   the document's lists, scalar fields, and attribute maps
//! - [`link`]: linking and unlinking scene items, with all the segment,
//!   folder, and bone bookkeeping that entails
//! - [`keyframe`]: keyframe edits with animation scoping and zero-pose
//!   capture
//! - [`marker`]: timeline markers and tracks
//!
//! The primitives are plain [`Operation`](crate::history::Operation)
//! implementations; the rest are composites exposed as methods on
//! [`EditContext`](crate::context::EditContext) that group their
//! primitives into one transaction.

pub mod keyframe;
pub mod link;
pub mod list;
pub mod map;
pub mod marker;
pub mod property;

pub use keyframe::{resolve_animation_scope, InsertKeyframe, RemoveKeyframe};
pub use link::{can_link, can_unlink};
pub use list::{InsertIntoList, ListSlot, RemoveFromList, SetListElement};
pub use map::{AddTag, InsertAttribute, RemoveAttribute, RemoveTag};
pub use property::{PropertySlot, SetProperty};
