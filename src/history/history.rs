//! Undo/redo history with nested transactions.
//!
//! [`DocumentHistory`] manages a linear undo/redo stack of
//! [`HistoryEntry`] values, each holding one or more [`Operation`] trait
//! objects. When a new operation is performed after undoing, the redo
//! stack is cleared (standard editor behavior). Transactions group several
//! operations into one entry so composite edits undo atomically.

use std::collections::VecDeque;
use std::fmt;

use log::trace;

use crate::document::Document;
use crate::error::DocumentResult;
use crate::history::Operation;

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// One undo step: a labeled group of operations.
///
/// Single operations performed outside a transaction become one-element
/// entries labeled by the operation; a committed transaction becomes one
/// entry holding everything performed inside it, labeled by the outermost
/// `begin_transaction` call.
pub struct HistoryEntry {
    label: String,
    ops: Vec<Box<dyn Operation>>,
    changes_document: bool,
}

impl HistoryEntry {
    fn from_op(op: Box<dyn Operation>) -> Self {
        Self {
            label: op.description().to_string(),
            changes_document: op.changes_document(),
            ops: vec![op],
        }
    }

    fn from_transaction(label: String, ops: Vec<Box<dyn Operation>>) -> Self {
        let changes_document = ops.iter().any(|op| op.changes_document());
        Self {
            label,
            ops,
            changes_document,
        }
    }

    pub fn description(&self) -> &str {
        &self.label
    }

    /// Number of operations grouped in this entry.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Whether undoing or redoing this entry changes document content.
    pub fn changes_document(&self) -> bool {
        self.changes_document
    }
}

impl fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("label", &self.label)
            .field("op_count", &self.ops.len())
            .field("changes_document", &self.changes_document)
            .finish()
    }
}

/// Manages an undo/redo stack of document operations.
///
/// The undo stack is a bounded [`VecDeque`]: when it exceeds `max_undo`,
/// the oldest entry is dropped from the front. The redo stack is an
/// unbounded [`Vec`] (it can never grow larger than the undo stack was).
///
/// # Transactions
///
/// [`begin_transaction`](Self::begin_transaction) opens a scope in which
/// performed operations are buffered instead of recorded individually.
/// Scopes nest: only the outermost
/// [`commit_transaction`](Self::commit_transaction) produces a history
/// entry, holding every buffered operation.
/// [`rollback_transaction`](Self::rollback_transaction) reverts the
/// innermost scope's operations but leaves the scope open, so a caller can
/// re-perform with fresh values. That is the pattern behind live previews,
/// where each input tick rolls back the previous preview and applies the
/// next.
///
/// # Example
///
/// ```ignore
/// let mut history = DocumentHistory::new(50);
/// let mut doc = Document::new();
///
/// history.perform(Box::new(my_op), &mut doc)?;
/// history.undo(&mut doc)?;
/// history.redo(&mut doc)?;
/// ```
pub struct DocumentHistory {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_undo: usize,
    /// Buffer of operations performed inside the current transaction chain.
    txn_buffer: Vec<Box<dyn Operation>>,
    /// Buffer watermarks, one per open scope; the value is the buffer
    /// length at `begin_transaction` time.
    txn_marks: Vec<usize>,
    /// Label given to the outermost open scope.
    txn_label: String,
    /// Tracks distance from the saved state.
    ///
    /// - `Some(0)`: the current state matches the last save.
    /// - `Some(n)` with `n > 0`: `n` undos needed to reach the saved state.
    /// - `Some(n)` with `n < 0`: `|n|` redos needed to reach the saved state.
    /// - `None`: never saved, or the save point is permanently unreachable
    ///   (e.g. after capacity overflow dropped it, or the redo branch was
    ///   discarded).
    save_distance: Option<i64>,
}

impl DocumentHistory {
    /// Creates a new empty history with the given maximum undo depth.
    ///
    /// When the undo stack exceeds `max_undo`, the oldest entry is dropped.
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo,
            txn_buffer: Vec::new(),
            txn_marks: Vec::new(),
            txn_label: String::new(),
            save_distance: Some(0),
        }
    }

    /// Applies an operation to the document and records it.
    ///
    /// Outside a transaction the operation becomes its own history entry.
    /// Inside one it is buffered; the entry is produced by the outermost
    /// commit. Performing always clears the redo stack.
    ///
    /// If the operation fails, nothing is recorded and the document is
    /// unchanged (failing operations validate before mutating).
    pub fn perform(&mut self, mut op: Box<dyn Operation>, document: &mut Document) -> DocumentResult {
        op.apply(document)?;
        trace!("perform: {}", op.description());

        // Clearing the redo stack invalidates a save point that was in redo.
        self.redo_stack.clear();
        if op.changes_document()
            && let Some(d) = self.save_distance
            && d < 0
        {
            self.save_distance = None;
        }

        if self.txn_marks.is_empty() {
            self.push_entry(HistoryEntry::from_op(op));
        } else {
            self.txn_buffer.push(op);
        }
        Ok(())
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        // A new entry moves the save point one step further away.
        if entry.changes_document
            && let Some(d) = &mut self.save_distance
        {
            *d += 1;
        }

        self.undo_stack.push_back(entry);
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
            // If the save point was beyond the oldest surviving entry, it's gone.
            if let Some(d) = self.save_distance
                && d > self.undo_stack.len() as i64
            {
                self.save_distance = None;
            }
        }
    }

    /// Opens a transaction scope. The label of the outermost scope names
    /// the resulting history entry.
    pub fn begin_transaction(&mut self, label: &str) {
        if self.txn_marks.is_empty() {
            self.txn_label = label.to_string();
        }
        self.txn_marks.push(self.txn_buffer.len());
        trace!("begin transaction '{label}' (depth {})", self.txn_marks.len());
    }

    /// Closes the innermost transaction scope. Closing the outermost scope
    /// records one entry holding every operation performed in the chain;
    /// an empty chain records nothing.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    pub fn commit_transaction(&mut self) {
        let Some(_) = self.txn_marks.pop() else {
            panic!("commit_transaction without begin_transaction");
        };
        trace!("commit transaction (depth {})", self.txn_marks.len());
        if !self.txn_marks.is_empty() {
            return;
        }
        if self.txn_buffer.is_empty() {
            return;
        }
        let ops = std::mem::take(&mut self.txn_buffer);
        let label = std::mem::take(&mut self.txn_label);
        self.push_entry(HistoryEntry::from_transaction(label, ops));
    }

    /// Reverts every operation performed since the innermost
    /// `begin_transaction`, leaving the scope open. The caller can then
    /// perform replacement operations or commit the (possibly empty)
    /// scope.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    pub fn rollback_transaction(&mut self, document: &mut Document) -> DocumentResult {
        let Some(&mark) = self.txn_marks.last() else {
            panic!("rollback_transaction without begin_transaction");
        };
        let mut dropped = self.txn_buffer.split_off(mark);
        trace!("rollback transaction ({} ops)", dropped.len());
        for op in dropped.iter_mut().rev() {
            op.revert(document)?;
        }
        Ok(())
    }

    /// Whether a transaction scope is currently open.
    pub fn in_transaction(&self) -> bool {
        !self.txn_marks.is_empty()
    }

    /// Undoes the most recent entry. Returns `Ok(false)` when there is
    /// nothing to undo.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is open: undo inside a transaction would
    /// interleave with the buffered operations.
    pub fn undo(&mut self, document: &mut Document) -> DocumentResult<bool> {
        assert!(
            self.txn_marks.is_empty(),
            "undo during an open transaction"
        );
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        trace!("undo: {}", entry.label);
        for op in entry.ops.iter_mut().rev() {
            op.revert(document)?;
        }
        if entry.changes_document
            && let Some(d) = &mut self.save_distance
        {
            *d -= 1;
        }
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Redoes the most recently undone entry. Returns `Ok(false)` when
    /// there is nothing to redo.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is open.
    pub fn redo(&mut self, document: &mut Document) -> DocumentResult<bool> {
        assert!(
            self.txn_marks.is_empty(),
            "redo during an open transaction"
        );
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        trace!("redo: {}", entry.label);
        for op in entry.ops.iter_mut() {
            op.replay(document)?;
        }
        if entry.changes_document
            && let Some(d) = &mut self.save_distance
        {
            *d += 1;
        }
        self.undo_stack.push_back(entry);
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
            if let Some(d) = self.save_distance
                && d > self.undo_stack.len() as i64
            {
                self.save_distance = None;
            }
        }
        Ok(true)
    }

    /// Returns `true` if there are entries that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there are entries that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns an iterator over undo entry descriptions, most recent first.
    pub fn undo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.undo_stack.iter().rev().map(|e| e.description())
    }

    /// Returns an iterator over redo entry descriptions, most recent first.
    pub fn redo_descriptions(&self) -> impl Iterator<Item = &str> {
        self.redo_stack.iter().rev().map(|e| e.description())
    }

    /// Returns an iterator over undo entries, most recent first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter().rev()
    }

    /// Returns an iterator over redo entries, most recent first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo_stack.iter().rev()
    }

    /// Returns the number of entries in the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Returns the number of entries in the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Returns the maximum undo depth.
    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Records the current state as the saved state.
    ///
    /// After calling this, [`has_unsaved_changes`](Self::has_unsaved_changes)
    /// returns `false` until a content-changing entry is performed, undone,
    /// or redone.
    pub fn mark_saved(&mut self) {
        self.save_distance = Some(0);
    }

    /// Returns `true` if the current state differs from the last saved
    /// state.
    ///
    /// Returns `true` if [`mark_saved`](Self::mark_saved) has never been
    /// called, or if content changed since the last save, or if the save
    /// point is permanently unreachable (dropped by capacity overflow, or
    /// the redo branch holding it was discarded). Entries whose operations
    /// only touch session state (see [`Operation::changes_document`]) do
    /// not affect this.
    pub fn has_unsaved_changes(&self) -> bool {
        self.save_distance != Some(0)
    }

    /// Clears both stacks.
    ///
    /// If the current state was the saved state it remains so; otherwise
    /// the save point is permanently lost.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is open.
    pub fn clear(&mut self) {
        assert!(
            self.txn_marks.is_empty(),
            "clear during an open transaction"
        );
        self.undo_stack.clear();
        self.redo_stack.clear();
        if self.save_distance != Some(0) {
            self.save_distance = None;
        }
    }
}

impl Default for DocumentHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl fmt::Debug for DocumentHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHistory")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("max_undo", &self.max_undo)
            .field("open_transactions", &self.txn_marks.len())
            .field("save_distance", &self.save_distance)
            .finish()
    }
}
