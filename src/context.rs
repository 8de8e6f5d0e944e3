//! The edit context: a document paired with its history.

use crate::document::Document;
use crate::error::DocumentResult;
use crate::history::{DocumentHistory, Operation};

/// Borrows a [`Document`] together with its [`DocumentHistory`] for the
/// duration of an editing call.
///
/// Every mutation goes through a context, so the pairing between a
/// document and the history that records its changes is explicit in the
/// signature of each edit instead of living in a global. Composite edits
/// (linking, keyframes, markers) are methods on this type, defined in
/// [`crate::operations`].
///
/// # Example
///
/// ```
/// use sorrel_document::context::EditContext;
/// use sorrel_document::document::Document;
/// use sorrel_document::history::DocumentHistory;
/// use sorrel_document::model::Node;
///
/// let mut doc = Document::new();
/// let mut history = DocumentHistory::default();
/// let mut ctx = EditContext::new(&mut doc, &mut history);
///
/// let root = ctx.document.root();
/// let hero = ctx.document.new_node(Node::new("hero"));
/// ctx.link_scene_item(root, usize::MAX, hero).unwrap();
/// assert!(ctx.undo().unwrap());
/// ```
pub struct EditContext<'a> {
    pub document: &'a mut Document,
    pub history: &'a mut DocumentHistory,
}

impl<'a> EditContext<'a> {
    pub fn new(document: &'a mut Document, history: &'a mut DocumentHistory) -> Self {
        Self { document, history }
    }

    /// Performs one operation. See [`DocumentHistory::perform`].
    pub fn perform(&mut self, op: Box<dyn Operation>) -> DocumentResult {
        self.history.perform(op, self.document)
    }

    /// Undoes the most recent entry. Returns `Ok(false)` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> DocumentResult<bool> {
        self.history.undo(self.document)
    }

    /// Redoes the most recently undone entry. Returns `Ok(false)` when
    /// there is nothing to redo.
    pub fn redo(&mut self) -> DocumentResult<bool> {
        self.history.redo(self.document)
    }

    /// Runs `f` inside a transaction scope.
    ///
    /// On success the scope is committed and everything performed inside
    /// it becomes (part of) one history entry. If `f` fails, the scope's
    /// operations are rolled back before the scope is committed empty, so
    /// a failing composite leaves neither document changes nor a history
    /// entry behind. Scopes nest: inside an outer transaction the commit
    /// merely closes this scope.
    pub fn transaction<R>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Self) -> DocumentResult<R>,
    ) -> DocumentResult<R> {
        self.history.begin_transaction(label);
        match f(self) {
            Ok(value) => {
                self.history.commit_transaction();
                Ok(value)
            }
            Err(err) => {
                self.history.rollback_transaction(self.document)?;
                self.history.commit_transaction();
                Err(err)
            }
        }
    }
}
