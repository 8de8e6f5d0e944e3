//! Error types for document edits.
//!
//! Two failure families exist and they are handled differently:
//!
//! - **Domain errors** ([`DocumentError`]): a well-formed request that the
//!   current document state refuses, such as keying an animation that is not
//!   in scope for the node. These are returned as `Err` and leave the
//!   document unchanged; callers surface them in the UI.
//! - **Programming errors**: API misuse such as committing a transaction
//!   that was never begun. These panic, because continuing would corrupt
//!   the undo history.

use thiserror::Error;

use crate::model::ValueKind;

/// A domain-level edit failure. The document is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The named animation is not reachable from the node's ancestor chain.
    #[error("Animation '{animation}' is not in scope for node '{node}'")]
    AnimationOutOfScope { animation: String, node: String },

    /// The item kind cannot be parented under the target item kind.
    #[error("Cannot link {item} under {parent}")]
    CannotLink { item: String, parent: String },

    /// An index was outside the valid range for the addressed collection.
    #[error("Index {index} out of range for {target} of length {len}")]
    IndexOutOfRange {
        target: &'static str,
        index: usize,
        len: usize,
    },

    /// A keyframe value's kind does not match the animated property's kind.
    #[error("Keyframe value kind {found:?} does not match property kind {expected:?}")]
    KeyframeKindMismatch { expected: ValueKind, found: ValueKind },

    /// The edit is valid in shape but not in the current document state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result alias used by every fallible document edit.
pub type DocumentResult<T = ()> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        let err = DocumentError::AnimationOutOfScope {
            animation: "walk".to_string(),
            node: "arm".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Animation 'walk' is not in scope for node 'arm'"
        );

        let err = DocumentError::IndexOutOfRange {
            target: "child nodes",
            index: 9,
            len: 3,
        };
        assert_eq!(err.to_string(), "Index 9 out of range for child nodes of length 3");
    }
}
