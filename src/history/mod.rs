//! Reversible operations and the undo/redo history.
//!
//! - [`Operation`]: the reversible edit trait ([`operation`])
//! - [`DocumentHistory`] / [`HistoryEntry`]: undo/redo stacks and
//!   transactions ([`history`])
//!
//! Operations are self-contained, so they can be grouped, undone, and
//! redone without consulting anything but the document itself.

pub mod history;
pub mod operation;

pub use history::{DocumentHistory, HistoryEntry, DEFAULT_MAX_UNDO};
pub use operation::Operation;
