//! Translation between flat child positions and kind-local positions.
//!
//! A parent's child list is one flat `Vec`, but the UI and most callers
//! think in kind-local terms ("the third node", "the first marker"). The
//! functions here convert between the two using the segment layout
//! described on [`ItemKind`]. For any child at flat position `f`:
//!
//! ```text
//! flat_from_kind_index(parent, kind_of(f), kind_index_from_flat(parent, f)) == f
//! ```

use std::ops::Range;

use crate::document::{Document, ItemKind, SceneItem};
use crate::store::Id;

/// The half-open range of `parent`'s child list occupied by `kind`'s
/// segment. Empty segments yield an empty range positioned where the
/// segment would start.
pub fn segment_range(doc: &Document, parent: Id<SceneItem>, kind: ItemKind) -> Range<usize> {
    let children = doc.item(parent).children();
    let rank = kind.rank();
    let start = children
        .iter()
        .position(|&child| doc.item(child).kind().rank() >= rank)
        .unwrap_or(children.len());
    let end = children[start..]
        .iter()
        .position(|&child| doc.item(child).kind().rank() > rank)
        .map_or(children.len(), |offset| start + offset);
    start..end
}

/// Converts a kind-local position to a flat child position.
///
/// `kind_index` may equal the segment length, denoting the insertion slot
/// at the segment's end.
///
/// # Panics
///
/// Panics if `kind_index` is past the segment's insertion slot.
pub fn flat_from_kind_index(
    doc: &Document,
    parent: Id<SceneItem>,
    kind: ItemKind,
    kind_index: usize,
) -> usize {
    let segment = segment_range(doc, parent, kind);
    assert!(
        kind_index <= segment.len(),
        "kind index {kind_index} out of range for {} segment of length {}",
        kind.label(),
        segment.len()
    );
    segment.start + kind_index
}

/// Converts a flat child position to its kind-local position.
///
/// # Panics
///
/// Panics if `flat` does not address an existing child.
pub fn kind_index_from_flat(doc: &Document, parent: Id<SceneItem>, flat: usize) -> usize {
    let children = doc.item(parent).children();
    assert!(
        flat < children.len(),
        "flat index {flat} out of range for child list of length {}",
        children.len()
    );
    let kind = doc.item(children[flat]).kind();
    let segment = segment_range(doc, parent, kind);
    debug_assert!(segment.contains(&flat), "segments are contiguous");
    flat - segment.start
}

/// Clamps a requested flat position into the valid insertion range for
/// `kind` under `parent`. The result is always a position a link of that
/// kind may use.
pub fn clamp_link_index(
    doc: &Document,
    parent: Id<SceneItem>,
    kind: ItemKind,
    requested: usize,
) -> usize {
    let segment = segment_range(doc, parent, kind);
    requested.clamp(segment.start, segment.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, ItemPayload};
    use crate::model::{AnimatedProperty, Animation, Animator, Folder, Node};

    // Builds a parent with children [animation, animator, node, folder,
    // node] pushed directly, bypassing the link engine.
    fn mixed_parent(doc: &mut Document) -> Id<SceneItem> {
        let parent = doc.new_node(Node::new("parent"));
        let children = vec![
            doc.new_animation(Animation::new("walk")),
            doc.new_animator(Animator::new(AnimatedProperty::Position, "walk")),
            doc.new_node(Node::new("a")),
            doc.new_folder(Folder::new("group")),
            doc.new_node(Node::new("b")),
        ];
        for &child in &children {
            doc.items[child].parent = Some(parent);
        }
        doc.items[parent].children = children;
        parent
    }

    #[test]
    fn segments_follow_kind_order() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);

        assert_eq!(segment_range(&doc, parent, ItemKind::Animation), 0..1);
        assert_eq!(segment_range(&doc, parent, ItemKind::Animator), 1..2);
        assert_eq!(segment_range(&doc, parent, ItemKind::Node), 2..5);
        assert_eq!(segment_range(&doc, parent, ItemKind::Folder), 2..5);
        // No markers: empty range where the segment would sit.
        assert_eq!(segment_range(&doc, parent, ItemKind::Marker), 5..5);
    }

    #[test]
    fn round_trip_for_every_child() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);

        for flat in 0..doc.item(parent).children().len() {
            let child = doc.item(parent).children()[flat];
            let kind = doc.item(child).kind();
            let local = kind_index_from_flat(&doc, parent, flat);
            assert_eq!(flat_from_kind_index(&doc, parent, kind, local), flat);
        }
    }

    #[test]
    fn nodes_and_folders_share_local_indices() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);

        // Children 2..5 are node, folder, node: the folder is the second
        // entry of the shared segment.
        assert_eq!(kind_index_from_flat(&doc, parent, 3), 1);
        assert_eq!(flat_from_kind_index(&doc, parent, ItemKind::Folder, 1), 3);
        assert_eq!(flat_from_kind_index(&doc, parent, ItemKind::Node, 1), 3);
    }

    #[test]
    fn clamp_pulls_out_of_segment_requests_inside() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);

        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Node, 0), 2);
        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Node, 3), 3);
        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Node, 99), 5);
        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Animation, 99), 1);
        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Track, 0), 5);
    }

    #[test]
    fn insertion_slot_at_segment_end_is_allowed() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);
        assert_eq!(flat_from_kind_index(&doc, parent, ItemKind::Animation, 1), 1);
    }

    #[test]
    #[should_panic(expected = "kind index 2 out of range")]
    fn past_insertion_slot_panics() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);
        flat_from_kind_index(&doc, parent, ItemKind::Animation, 2);
    }

    #[test]
    fn empty_parent_has_empty_segments() {
        let mut doc = Document::new();
        let parent = doc.new_node(Node::new("empty"));
        assert_eq!(segment_range(&doc, parent, ItemKind::Node), 0..0);
        assert_eq!(clamp_link_index(&doc, parent, ItemKind::Node, 7), 0);
    }

    #[test]
    fn payload_matches_segment() {
        let mut doc = Document::new();
        let parent = mixed_parent(&mut doc);
        let first = doc.item(parent).children()[0];
        assert!(matches!(doc.item(first).payload(), ItemPayload::Animation(_)));
    }
}
