//! The scene document and its item tree.
//!
//! - [`Document`]: entity stores plus the tree ([`document`])
//! - [`SceneItem`] / [`ItemPayload`] / [`ItemKind`]: tree rows ([`item`])
//! - [`index`]: flat / kind-local position translation

pub mod document;
pub mod index;
pub mod item;

pub use document::Document;
pub use item::{ItemKind, ItemPayload, SceneItem};
