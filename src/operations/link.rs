//! Linking and unlinking scene items.
//!
//! Linking is a composite edit: besides attaching the wrapper to the tree
//! it has to keep every derived structure in step, meaning the owning
//! sprite's flat node and folder lists, folder index/count bookkeeping,
//! and bone numbering. [`EditContext::link_scene_item`] and
//! [`EditContext::unlink_scene_item`] run the whole composite inside one
//! transaction, built from the generic list and property operations plus
//! the two tree primitives here ([`AttachItem`], [`DetachItem`]). Undoing
//! the transaction therefore restores every piece of bookkeeping exactly.
//!
//! Validation happens before the transaction opens: a rejected link
//! returns an error with the document untouched.

use crate::context::EditContext;
use crate::document::index::{clamp_link_index, kind_index_from_flat, segment_range};
use crate::document::{Document, ItemKind, ItemPayload, SceneItem};
use crate::error::{DocumentError, DocumentResult};
use crate::history::Operation;
use crate::model::{AnimatedProperty, Folder, Node};
use crate::operations::list::{
    AnimationMarkers, AnimationTracks, ChildNodes, InsertIntoList, NodeAnimations, NodeAnimators,
    NodeFolders, RemoveFromList,
};
use crate::operations::property::{
    BoneBaseIndex, BoneIndex, FolderIndex, FolderItemCount, SetProperty,
};
use crate::store::Id;

/// Whether an item of `item`'s kind may hang under `parent`.
///
/// This is the pure kind-admissibility matrix; cycle, attachment and
/// double-link rules are checked separately by the link calls.
///
/// - A sprite node accepts animations, animators, nodes and folders.
/// - A bone accepts nested bones, and animators targeting position,
///   rotation or scale.
/// - A folder accepts nodes and folders.
/// - An animation's view root accepts markers and tracks. The animation's
///   row in the document tree accepts nothing.
pub fn can_link(document: &Document, parent: Id<SceneItem>, item: Id<SceneItem>) -> bool {
    let kind = document.item(item).kind();
    match document.item(parent).payload() {
        ItemPayload::Node(node) if document.node(node).is_bone() => {
            match document.item(item).payload() {
                ItemPayload::Node(child) => document.node(child).is_bone(),
                ItemPayload::Animator(animator) => matches!(
                    document.animator(animator).target,
                    AnimatedProperty::Position | AnimatedProperty::Rotation | AnimatedProperty::Scale
                ),
                _ => false,
            }
        }
        ItemPayload::Node(_) => matches!(
            kind,
            ItemKind::Animation | ItemKind::Animator | ItemKind::Node | ItemKind::Folder
        ),
        ItemPayload::Folder(_) => matches!(kind, ItemKind::Node | ItemKind::Folder),
        ItemPayload::Animation(_) => {
            document.is_view_root(parent) && matches!(kind, ItemKind::Marker | ItemKind::Track)
        }
        _ => false,
    }
}

/// Whether an item may be unlinked.
///
/// No rule rejects an unlink today, so this always returns `true`. The
/// hook is consulted on every unlink anyway so that a future rule (locked
/// layers, items referenced from outside the document) lands here without
/// touching call sites.
pub fn can_unlink(_document: &Document, _item: Id<SceneItem>) -> bool {
    true
}

impl EditContext<'_> {
    /// Links a staged (or previously unlinked) item under `parent`.
    ///
    /// `index` is a flat position in `parent`'s child list and is clamped
    /// into the segment belonging to the item's kind, so `0` means "front
    /// of the segment" and `usize::MAX` means "end of the segment".
    ///
    /// The whole composite (attach, owner-list insert, folder and bone
    /// bookkeeping) is one history entry.
    pub fn link_scene_item(
        &mut self,
        parent: Id<SceneItem>,
        index: usize,
        item: Id<SceneItem>,
    ) -> DocumentResult {
        self.link_validated(parent, index, item, true)
    }

    /// Like [`link_scene_item`](Self::link_scene_item), but `index` must
    /// already be a valid flat position inside the kind's segment.
    ///
    /// # Panics
    ///
    /// Panics if `index` lies outside the segment (its end insertion slot
    /// included). Callers use this form when they have computed the
    /// position themselves and a mismatch means their computation is wrong.
    pub fn link_scene_item_at(
        &mut self,
        parent: Id<SceneItem>,
        index: usize,
        item: Id<SceneItem>,
    ) -> DocumentResult {
        self.link_validated(parent, index, item, false)
    }

    fn link_validated(
        &mut self,
        parent: Id<SceneItem>,
        index: usize,
        item: Id<SceneItem>,
        clamp: bool,
    ) -> DocumentResult {
        let doc = &*self.document;
        if doc.item(item).parent().is_some() {
            return Err(DocumentError::InvalidState(format!(
                "{item:?} is already linked"
            )));
        }
        if doc.is_ancestor_or_self(item, parent) {
            return Err(DocumentError::InvalidState(
                "cannot link an item into its own subtree".into(),
            ));
        }
        if !can_link(doc, parent, item) {
            return Err(DocumentError::CannotLink {
                item: item_label(doc, item),
                parent: item_label(doc, parent),
            });
        }
        if !doc.is_attached(parent) {
            return Err(DocumentError::InvalidState(
                "link target is not attached to the document".into(),
            ));
        }

        let kind = doc.item(item).kind();
        let flat = if clamp {
            clamp_link_index(doc, parent, kind, index)
        } else {
            let segment = segment_range(doc, parent, kind);
            assert!(
                segment.start <= index && index <= segment.end,
                "flat index {index} outside the {} segment {}..{}",
                kind.label(),
                segment.start,
                segment.end
            );
            index
        };

        if kind == ItemKind::Marker {
            check_marker_slot(doc, parent, flat, item)?;
        }

        let label = match kind {
            ItemKind::Animation => "Link animation",
            ItemKind::Animator => "Link animator",
            ItemKind::Node => "Link node",
            ItemKind::Folder => "Link folder",
            ItemKind::Marker => "Link marker",
            ItemKind::Track => "Link track",
        };
        self.transaction(label, |ctx| ctx.link_ops(parent, flat, item))
    }

    fn link_ops(
        &mut self,
        parent: Id<SceneItem>,
        flat: usize,
        item: Id<SceneItem>,
    ) -> DocumentResult {
        match self.document.item(item).payload() {
            ItemPayload::Animation(anim) => {
                let ItemPayload::Node(owner) = self.document.item(parent).payload() else {
                    unreachable!("animations hang under sprite nodes");
                };
                let local =
                    flat - segment_range(self.document, parent, ItemKind::Animation).start;
                self.perform(AttachItem::boxed(parent, flat, item))?;
                self.perform(InsertIntoList::boxed(NodeAnimations(owner), local, anim))
            }
            ItemPayload::Animator(animator) => {
                let ItemPayload::Node(owner) = self.document.item(parent).payload() else {
                    unreachable!("animators hang under nodes");
                };
                let local = flat - segment_range(self.document, parent, ItemKind::Animator).start;
                self.perform(AttachItem::boxed(parent, flat, item))?;
                self.perform(InsertIntoList::boxed(NodeAnimators(owner), local, animator))
            }
            ItemPayload::Marker(marker) => {
                let ItemPayload::Animation(anim) = self.document.item(parent).payload() else {
                    unreachable!("markers hang under view roots");
                };
                let local = flat - segment_range(self.document, parent, ItemKind::Marker).start;
                self.perform(AttachItem::boxed(parent, flat, item))?;
                self.perform(InsertIntoList::boxed(AnimationMarkers(anim), local, marker))
            }
            ItemPayload::Track(track) => {
                let ItemPayload::Animation(anim) = self.document.item(parent).payload() else {
                    unreachable!("tracks hang under view roots");
                };
                let local = flat - segment_range(self.document, parent, ItemKind::Track).start;
                self.perform(AttachItem::boxed(parent, flat, item))?;
                self.perform(InsertIntoList::boxed(AnimationTracks(anim), local, track))
            }
            ItemPayload::Node(node) => self.link_node_ops(parent, flat, item, node),
            ItemPayload::Folder(folder) => self.link_folder_ops(parent, flat, item, folder),
        }
    }

    /// Linking a node touches the owner sprite's flat list: every folder
    /// whose pre-order position is after the slot gains one preceding node,
    /// and a bone additionally receives its document index and the index of
    /// its enclosing bone.
    fn link_node_ops(
        &mut self,
        parent: Id<SceneItem>,
        flat: usize,
        item: Id<SceneItem>,
        node: Id<Node>,
    ) -> DocumentResult {
        let doc = &*self.document;
        let (owner_item, owner_node) = doc
            .owner_sprite(parent)
            .ok_or_else(|| DocumentError::InvalidState("link target has no owning sprite".into()))?;
        let (nodes_before, folders_before) = forest_position(doc, owner_item, parent, flat);
        let shifted: Vec<_> = doc.node(owner_node).folders()[folders_before..].to_vec();
        let parent_folder = match doc.item(parent).payload() {
            ItemPayload::Folder(folder) => Some(folder),
            _ => None,
        };
        let is_bone = doc.node(node).is_bone();
        let base = if is_bone { enclosing_bone(doc, parent) } else { 0 };
        let needs_index = is_bone && doc.node(node).bone_index() == 0;

        self.perform(AttachItem::boxed(parent, flat, item))?;
        self.perform(InsertIntoList::boxed(
            ChildNodes(owner_node),
            nodes_before,
            node,
        ))?;
        for folder in shifted {
            let index = self.document.folder(folder).index() + 1;
            self.perform(SetProperty::boxed(FolderIndex(folder), index))?;
        }
        if let Some(folder) = parent_folder {
            let count = self.document.folder(folder).item_count() + 1;
            self.perform(SetProperty::boxed(FolderItemCount(folder), count))?;
        }
        if is_bone {
            if needs_index {
                let index = self.document.issue_bone_index();
                self.perform(SetProperty::boxed(BoneIndex(node), index))?;
            }
            self.perform(SetProperty::boxed(BoneBaseIndex(node), base))?;
            debug_assert!(
                bone_order_holds(self.document, owner_node, node),
                "a bone must come after its base in the flat node order"
            );
        }
        Ok(())
    }

    /// Linking a folder inserts its descriptor at the matching pre-order
    /// position and records its absolute index. No sibling shifts: an
    /// empty folder adds no nodes.
    fn link_folder_ops(
        &mut self,
        parent: Id<SceneItem>,
        flat: usize,
        item: Id<SceneItem>,
        folder: Id<Folder>,
    ) -> DocumentResult {
        let doc = &*self.document;
        let (owner_item, owner_node) = doc
            .owner_sprite(parent)
            .ok_or_else(|| DocumentError::InvalidState("link target has no owning sprite".into()))?;
        let (nodes_before, folders_before) = forest_position(doc, owner_item, parent, flat);
        debug_assert_eq!(
            doc.folder(folder).item_count(),
            0,
            "a linking folder has no children yet"
        );
        let parent_folder = match doc.item(parent).payload() {
            ItemPayload::Folder(id) => Some(id),
            _ => None,
        };

        self.perform(AttachItem::boxed(parent, flat, item))?;
        self.perform(InsertIntoList::boxed(
            NodeFolders(owner_node),
            folders_before,
            folder,
        ))?;
        self.perform(SetProperty::boxed(FolderIndex(folder), nodes_before))?;
        if let Some(id) = parent_folder {
            let count = self.document.folder(id).item_count() + 1;
            self.perform(SetProperty::boxed(FolderItemCount(id), count))?;
        }
        Ok(())
    }

    /// Unlinks an item, recursively unlinking the node-segment children of
    /// folders and bones first (their entries live in the owner sprite's
    /// flat lists and must leave them too). The whole recursion is one
    /// history entry; undo relinks everything in forward order.
    ///
    /// The unlinked subtree stays alive in the stores, so undo entries
    /// holding its ids never go stale.
    pub fn unlink_scene_item(&mut self, item: Id<SceneItem>) -> DocumentResult {
        let doc = &*self.document;
        if item == doc.root() {
            return Err(DocumentError::InvalidState(
                "the root cannot be unlinked".into(),
            ));
        }
        if doc.item(item).parent().is_none() {
            return Err(DocumentError::InvalidState(format!(
                "{item:?} is not linked"
            )));
        }
        if !can_unlink(doc, item) {
            return Err(DocumentError::InvalidState(format!(
                "{item:?} cannot be unlinked"
            )));
        }
        let label = match doc.item(item).kind() {
            ItemKind::Animation => "Unlink animation",
            ItemKind::Animator => "Unlink animator",
            ItemKind::Node => "Unlink node",
            ItemKind::Folder => "Unlink folder",
            ItemKind::Marker => "Unlink marker",
            ItemKind::Track => "Unlink track",
        };
        self.transaction(label, |ctx| ctx.unlink_ops(item))
    }

    fn unlink_ops(&mut self, item: Id<SceneItem>) -> DocumentResult {
        let recurse = match self.document.item(item).payload() {
            ItemPayload::Folder(_) => true,
            ItemPayload::Node(node) => self.document.node(node).is_bone(),
            _ => false,
        };
        if recurse {
            let segment = segment_range(self.document, item, ItemKind::Node);
            let children: Vec<_> = self.document.item(item).children()[segment].to_vec();
            // Reverse order, so the undo replays forward with valid slots.
            for &child in children.iter().rev() {
                self.unlink_ops(child)?;
            }
        }

        let doc = &*self.document;
        let parent = doc.item(item).parent().ok_or_else(|| {
            DocumentError::InvalidState(format!("{item:?} is not linked"))
        })?;
        let flat = doc
            .item(parent)
            .children()
            .iter()
            .position(|&child| child == item)
            .ok_or_else(|| {
                DocumentError::InvalidState("parent does not list the item as a child".into())
            })?;

        match doc.item(item).payload() {
            ItemPayload::Node(_) => {
                let (owner_item, owner_node) = doc.owner_sprite(parent).ok_or_else(|| {
                    DocumentError::InvalidState("linked node has no owning sprite".into())
                })?;
                let (nodes_before, folders_before) = forest_position(doc, owner_item, parent, flat);
                let shifted: Vec<_> = doc.node(owner_node).folders()[folders_before..].to_vec();
                let parent_folder = match doc.item(parent).payload() {
                    ItemPayload::Folder(folder) => Some(folder),
                    _ => None,
                };

                if let Some(folder) = parent_folder {
                    let count = self.document.folder(folder).item_count() - 1;
                    self.perform(SetProperty::boxed(FolderItemCount(folder), count))?;
                }
                for folder in shifted {
                    let index = self.document.folder(folder).index() - 1;
                    self.perform(SetProperty::boxed(FolderIndex(folder), index))?;
                }
                self.perform(RemoveFromList::boxed(ChildNodes(owner_node), nodes_before))?;
                self.perform(DetachItem::boxed(item))
            }
            ItemPayload::Folder(_) => {
                let (owner_item, owner_node) = doc.owner_sprite(parent).ok_or_else(|| {
                    DocumentError::InvalidState("linked folder has no owning sprite".into())
                })?;
                let (_, folders_before) = forest_position(doc, owner_item, parent, flat);
                let parent_folder = match doc.item(parent).payload() {
                    ItemPayload::Folder(folder) => Some(folder),
                    _ => None,
                };

                if let Some(folder) = parent_folder {
                    let count = self.document.folder(folder).item_count() - 1;
                    self.perform(SetProperty::boxed(FolderItemCount(folder), count))?;
                }
                self.perform(RemoveFromList::boxed(NodeFolders(owner_node), folders_before))?;
                self.perform(DetachItem::boxed(item))
            }
            ItemPayload::Animation(_) => {
                let ItemPayload::Node(owner) = doc.item(parent).payload() else {
                    unreachable!("animations hang under sprite nodes");
                };
                let local = kind_index_from_flat(doc, parent, flat);
                self.perform(RemoveFromList::boxed(NodeAnimations(owner), local))?;
                self.perform(DetachItem::boxed(item))
            }
            ItemPayload::Animator(_) => {
                let ItemPayload::Node(owner) = doc.item(parent).payload() else {
                    unreachable!("animators hang under nodes");
                };
                let local = kind_index_from_flat(doc, parent, flat);
                self.perform(RemoveFromList::boxed(NodeAnimators(owner), local))?;
                self.perform(DetachItem::boxed(item))
            }
            ItemPayload::Marker(_) => {
                let ItemPayload::Animation(anim) = doc.item(parent).payload() else {
                    unreachable!("markers hang under view roots");
                };
                let local = kind_index_from_flat(doc, parent, flat);
                self.perform(RemoveFromList::boxed(AnimationMarkers(anim), local))?;
                self.perform(DetachItem::boxed(item))
            }
            ItemPayload::Track(_) => {
                let ItemPayload::Animation(anim) = doc.item(parent).payload() else {
                    unreachable!("tracks hang under view roots");
                };
                let local = kind_index_from_flat(doc, parent, flat);
                self.perform(RemoveFromList::boxed(AnimationTracks(anim), local))?;
                self.perform(DetachItem::boxed(item))
            }
        }
    }
}

fn item_label(document: &Document, item: Id<SceneItem>) -> String {
    match document.item(item).payload() {
        ItemPayload::Node(node) if document.node(node).is_bone() => "bone".to_string(),
        payload => payload.kind().label().to_string(),
    }
}

/// Rejects a marker slot that would break the strictly-increasing frame
/// order of the animation's marker list.
fn check_marker_slot(
    document: &Document,
    parent: Id<SceneItem>,
    flat: usize,
    item: Id<SceneItem>,
) -> DocumentResult {
    let ItemPayload::Animation(anim) = document.item(parent).payload() else {
        unreachable!("markers hang under view roots");
    };
    let ItemPayload::Marker(marker) = document.item(item).payload() else {
        unreachable!("marker links wrap markers");
    };
    let frame = document.marker(marker).frame;
    let local = flat - segment_range(document, parent, ItemKind::Marker).start;
    let markers = document.animation(anim).markers();
    if local > 0 && document.marker(markers[local - 1]).frame >= frame {
        return Err(DocumentError::InvalidState(format!(
            "marker at frame {frame} breaks frame order"
        )));
    }
    if local < markers.len() && document.marker(markers[local]).frame <= frame {
        return Err(DocumentError::InvalidState(format!(
            "marker at frame {frame} breaks frame order"
        )));
    }
    Ok(())
}

/// Computes where a slot in the wrapper tree falls in the owner sprite's
/// flat lists: the number of nodes and of folders whose pre-order visit
/// comes strictly before `(target_parent, target_flat)`.
///
/// The pre-order walk descends into folders and bones but not into sprite
/// children, mirroring how the flat lists are defined.
fn forest_position(
    document: &Document,
    owner: Id<SceneItem>,
    target_parent: Id<SceneItem>,
    target_flat: usize,
) -> (usize, usize) {
    let mut nodes_before = 0;
    let mut folders_before = 0;
    let found = forest_walk(
        document,
        owner,
        target_parent,
        target_flat,
        &mut nodes_before,
        &mut folders_before,
    );
    debug_assert!(found, "slot is not inside its owner's forest");
    (nodes_before, folders_before)
}

fn forest_walk(
    document: &Document,
    item: Id<SceneItem>,
    target_parent: Id<SceneItem>,
    target_flat: usize,
    nodes_before: &mut usize,
    folders_before: &mut usize,
) -> bool {
    let segment = segment_range(document, item, ItemKind::Node);
    for flat in segment.clone() {
        if item == target_parent && flat == target_flat {
            return true;
        }
        let child = document.item(item).children()[flat];
        match document.item(child).payload() {
            ItemPayload::Node(node) => {
                *nodes_before += 1;
                if document.node(node).is_bone()
                    && forest_walk(
                        document,
                        child,
                        target_parent,
                        target_flat,
                        nodes_before,
                        folders_before,
                    )
                {
                    return true;
                }
            }
            ItemPayload::Folder(_) => {
                *folders_before += 1;
                if forest_walk(
                    document,
                    child,
                    target_parent,
                    target_flat,
                    nodes_before,
                    folders_before,
                ) {
                    return true;
                }
            }
            _ => {}
        }
    }
    item == target_parent && target_flat == segment.end
}

/// The bone index of the nearest bone on the parent chain, or zero. A
/// sprite boundary ends the chain.
fn enclosing_bone(document: &Document, from: Id<SceneItem>) -> u32 {
    let mut current = Some(from);
    while let Some(item) = current {
        match document.item(item).payload() {
            ItemPayload::Node(node) => {
                let data = document.node(node);
                return if data.is_bone() { data.bone_index() } else { 0 };
            }
            ItemPayload::Folder(_) => current = document.item(item).parent(),
            _ => return 0,
        }
    }
    0
}

/// A bone's base must precede it in the owner's flat node order, or the
/// runtime would pose a bone before its base.
fn bone_order_holds(document: &Document, owner: Id<Node>, bone: Id<Node>) -> bool {
    let base = document.node(bone).base_index();
    if base == 0 {
        return true;
    }
    let nodes = document.node(owner).nodes();
    let bone_pos = nodes.iter().position(|&n| n == bone);
    let base_pos = nodes
        .iter()
        .position(|&n| document.node(n).bone_index() == base);
    matches!((base_pos, bone_pos), (Some(b), Some(p)) if b < p)
}

/// Inserts a detached item into a parent's child list and sets its parent
/// pointer. The tree half of linking; owner-list bookkeeping is separate.
#[derive(Debug)]
pub(crate) struct AttachItem {
    parent: Id<SceneItem>,
    index: usize,
    item: Id<SceneItem>,
}

impl AttachItem {
    pub(crate) fn boxed(
        parent: Id<SceneItem>,
        index: usize,
        item: Id<SceneItem>,
    ) -> Box<dyn Operation> {
        Box::new(Self {
            parent,
            index,
            item,
        })
    }
}

impl Operation for AttachItem {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        debug_assert!(
            document.items[self.item].parent.is_none(),
            "attach of a linked item"
        );
        let children = &mut document.items[self.parent].children;
        if self.index > children.len() {
            return Err(DocumentError::IndexOutOfRange {
                target: "children",
                index: self.index,
                len: children.len(),
            });
        }
        children.insert(self.index, self.item);
        document.items[self.item].parent = Some(self.parent);
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let removed = document.items[self.parent].children.remove(self.index);
        debug_assert!(removed == self.item, "revert removed a different item");
        document.items[self.item].parent = None;
        Ok(())
    }

    fn description(&self) -> &str {
        "Attach item"
    }
}

/// Removes an item from its parent's child list, remembering the slot so
/// undo can reinsert it there.
#[derive(Debug)]
pub(crate) struct DetachItem {
    item: Id<SceneItem>,
    restore: Option<(Id<SceneItem>, usize)>,
}

impl DetachItem {
    pub(crate) fn boxed(item: Id<SceneItem>) -> Box<dyn Operation> {
        Box::new(Self {
            item,
            restore: None,
        })
    }

    fn detach(&self, document: &mut Document, parent: Id<SceneItem>, index: usize) {
        let children = &mut document.items[parent].children;
        debug_assert!(
            children.get(index) == Some(&self.item),
            "detach slot moved since apply"
        );
        children.remove(index);
        document.items[self.item].parent = None;
    }
}

impl Operation for DetachItem {
    fn apply(&mut self, document: &mut Document) -> DocumentResult {
        let parent = document.items[self.item].parent.ok_or_else(|| {
            DocumentError::InvalidState("detach of an unlinked item".into())
        })?;
        let index = document.items[parent]
            .children
            .iter()
            .position(|&child| child == self.item)
            .ok_or_else(|| {
                DocumentError::InvalidState("parent does not list the item as a child".into())
            })?;
        self.restore = Some((parent, index));
        self.detach(document, parent, index);
        Ok(())
    }

    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let (parent, index) = self
            .restore
            .ok_or_else(|| DocumentError::InvalidState("replay before apply".into()))?;
        self.detach(document, parent, index);
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let (parent, index) = self
            .restore
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        document.items[parent].children.insert(index, self.item);
        document.items[self.item].parent = Some(parent);
        Ok(())
    }

    fn description(&self) -> &str {
        "Detach item"
    }
}
