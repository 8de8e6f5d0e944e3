//! Scene tree items: the uniform wrapper around domain entities.

use crate::model::{Animation, AnimationTrack, Animator, Folder, Marker, Node};
use crate::store::Id;

/// The domain entity a [`SceneItem`] wraps. Exactly one variant per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPayload {
    Node(Id<Node>),
    Folder(Id<Folder>),
    Animation(Id<Animation>),
    Animator(Id<Animator>),
    Marker(Id<Marker>),
    Track(Id<AnimationTrack>),
}

impl ItemPayload {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPayload::Node(_) => ItemKind::Node,
            ItemPayload::Folder(_) => ItemKind::Folder,
            ItemPayload::Animation(_) => ItemKind::Animation,
            ItemPayload::Animator(_) => ItemKind::Animator,
            ItemPayload::Marker(_) => ItemKind::Marker,
            ItemPayload::Track(_) => ItemKind::Track,
        }
    }
}

/// Kind of a scene tree item, independent of the concrete entity.
///
/// Children of an item are grouped into contiguous runs by kind, in a fixed
/// order given by [`rank`](ItemKind::rank): animations first, then
/// animators, then nodes and folders (interleaved freely), then markers,
/// then tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Animation,
    Animator,
    Node,
    Folder,
    Marker,
    Track,
}

impl ItemKind {
    /// Segment rank in a parent's child list. Nodes and folders share a
    /// rank, so they interleave within one segment.
    pub fn rank(self) -> u8 {
        match self {
            ItemKind::Animation => 0,
            ItemKind::Animator => 1,
            ItemKind::Node | ItemKind::Folder => 2,
            ItemKind::Marker => 3,
            ItemKind::Track => 4,
        }
    }

    /// Whether two kinds occupy the same segment of a child list.
    pub fn shares_segment(self, other: ItemKind) -> bool {
        self.rank() == other.rank()
    }

    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Animation => "animation",
            ItemKind::Animator => "animator",
            ItemKind::Node => "node",
            ItemKind::Folder => "folder",
            ItemKind::Marker => "marker",
            ItemKind::Track => "track",
        }
    }
}

/// A row in a scene tree.
///
/// Items form the uniform tree the editor displays: every domain entity is
/// wrapped in exactly one item per tree it appears in. Parent links and
/// child lists are maintained by the link engine; `expanded` is per-item UI
/// state that undoes like any other change but does not dirty the document.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub(crate) payload: ItemPayload,
    pub(crate) parent: Option<Id<SceneItem>>,
    pub(crate) children: Vec<Id<SceneItem>>,
    pub(crate) expanded: bool,
}

impl SceneItem {
    pub(crate) fn new(payload: ItemPayload) -> Self {
        Self {
            payload,
            parent: None,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn payload(&self) -> ItemPayload {
        self.payload
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn parent(&self) -> Option<Id<SceneItem>> {
        self.parent
    }

    /// Children in segment order.
    pub fn children(&self) -> &[Id<SceneItem>] {
        &self.children
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}
