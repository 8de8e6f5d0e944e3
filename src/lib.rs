//! # Sorrel Document
//!
//! The document core of the Sorrel editor: the scene/animation document,
//! the reversible operations that mutate it, and the undo/redo history
//! that records them.
//!
//! Nothing here draws or plays anything. The crate owns one concern:
//! every change to a document is an [`Operation`](history::Operation)
//! that knows how to apply, replay, and revert itself, and every
//! user-visible edit becomes exactly one history entry, however many
//! operations it took.
//!
//! # Architecture
//!
//! - [`model`] holds the domain entities (nodes, folders, animations,
//!   animators, markers, tracks). They are plain data.
//! - [`document`] owns the entities in append-only stores and arranges
//!   their wrapper items into the scene tree.
//! - [`history`] defines the operation trait and the transaction-capable
//!   undo/redo stacks.
//! - [`operations`] implements the reversible primitives and the
//!   composite edits (linking, keyframes, markers) built from them.
//! - [`context`] pairs a document with its history for the duration of
//!   an edit.
//!
//! # Example
//!
//! ```
//! use sorrel_document::context::EditContext;
//! use sorrel_document::document::Document;
//! use sorrel_document::history::DocumentHistory;
//! use sorrel_document::model::{Folder, Node};
//!
//! let mut doc = Document::new();
//! let mut history = DocumentHistory::default();
//! let mut ctx = EditContext::new(&mut doc, &mut history);
//!
//! let root = ctx.document.root();
//! let props = ctx.document.new_folder(Folder::new("props"));
//! let barrel = ctx.document.new_node(Node::new("barrel"));
//! ctx.link_scene_item(root, 0, props)?;
//! ctx.link_scene_item(props, 0, barrel)?;
//!
//! // One edit, one entry: the folder unlink takes its contents with it.
//! ctx.unlink_scene_item(props)?;
//! assert!(!ctx.document.is_attached(barrel));
//! ctx.undo()?;
//! assert!(ctx.document.is_attached(barrel));
//! # Ok::<(), sorrel_document::error::DocumentError>(())
//! ```

pub mod context;
pub mod document;
pub mod error;
pub mod history;
pub mod math;
pub mod model;
pub mod operations;
pub mod store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the library version. Call once at editor startup.
pub fn init() {
    log::info!("Sorrel Document v{} initialized", VERSION);
}
