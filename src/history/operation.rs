//! The reversible operation trait.

use std::fmt;

use crate::document::Document;
use crate::error::DocumentResult;

/// A reversible edit applied to a [`Document`].
///
/// Operations are self-contained: whatever state is needed to reverse the
/// edit (previous values, removed elements, resolved positions) is captured
/// inside the operation instance when it first runs. The history then
/// replays and reverts the same instance, so redo restores exactly what
/// undo removed.
///
/// # Lifecycle
///
/// - [`apply`](Operation::apply) runs once, when the operation is first
///   performed. This is where positions are resolved and backups taken.
///   The default implementation just delegates to `replay`, which is
///   enough for operations that capture their backup on every run.
/// - [`revert`](Operation::revert) runs on undo and must restore the
///   document to the state before `apply`.
/// - [`replay`](Operation::replay) runs on redo and must re-apply the edit
///   using the state resolved by `apply`, without re-deciding anything.
///
/// A failing `apply` must leave the document untouched: validate first,
/// mutate after. Failures on `replay`/`revert` indicate a programming
/// error, since the history only calls them on states the operation has
/// already seen.
///
/// # Dyn compatibility
///
/// The trait is dyn-compatible; the history stores `Box<dyn Operation>`.
pub trait Operation: fmt::Debug + Send {
    /// Performs the operation for the first time.
    fn apply(&mut self, document: &mut Document) -> DocumentResult {
        self.replay(document)
    }

    /// Re-applies the operation on redo.
    fn replay(&mut self, document: &mut Document) -> DocumentResult;

    /// Reverses the operation on undo.
    fn revert(&mut self, document: &mut Document) -> DocumentResult;

    /// Short human-readable label, shown in undo/redo menus.
    fn description(&self) -> &str;

    /// Whether this operation modifies document content.
    ///
    /// Session-state edits such as expanding a tree row return `false`:
    /// they are recorded and undoable, but do not count toward unsaved
    /// changes.
    fn changes_document(&self) -> bool {
        true
    }
}
