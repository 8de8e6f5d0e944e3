//! Nodes and folders: the structural entities of a scene document.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::SceneItem;
use crate::math::{Color, Vec2};
use crate::model::{Animation, Animator, PropertyValue};
use crate::store::Id;

/// Flavor of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// A drawable node. Owns its own child lists.
    #[default]
    Sprite,
    /// A skeleton bone. Bones nest in the tree but are stored flat in the
    /// child-node list of the nearest enclosing sprite.
    Bone,
}

/// A scene node: drawable sprite or skeleton bone.
///
/// Plain-data fields (`name`, transform, `attrs`, `tags`) may be filled in
/// freely while staging a node. Once the node is part of a document they are
/// only changed through operations, so every edit is undoable. Structural
/// fields (child lists, bone indices) are owned by the link engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Display name shown in the scene tree.
    pub name: String,
    pub kind: NodeKind,
    pub visible: bool,
    /// Local translation relative to the parent node.
    pub position: Vec2,
    /// Local rotation in radians.
    pub rotation: f32,
    pub scale: Vec2,
    /// Tint color, RGBA in `[0, 1]`.
    pub color: Color,
    /// Free-form attributes, insertion-ordered.
    pub attrs: IndexMap<String, PropertyValue>,
    /// Unordered string tags.
    pub tags: BTreeSet<String>,
    /// Child nodes in flat pre-order. For a sprite this holds its own
    /// children plus every node inside its folders and bone chains.
    #[serde(skip)]
    pub(crate) nodes: Vec<Id<Node>>,
    /// Folder descriptors in pre-order.
    #[serde(skip)]
    pub(crate) folders: Vec<Id<Folder>>,
    #[serde(skip)]
    pub(crate) animations: Vec<Id<Animation>>,
    #[serde(skip)]
    pub(crate) animators: Vec<Id<Animator>>,
    /// Document-unique bone number, assigned on first link. 0 = unassigned.
    #[serde(skip)]
    pub(crate) bone_index: u32,
    /// `bone_index` of the parent bone in the skeleton, or 0 for a bone
    /// attached directly to a sprite.
    #[serde(skip)]
    pub(crate) base_index: u32,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
}

impl Node {
    /// Creates a sprite node with identity transform and no attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Sprite,
            visible: true,
            position: Vec2::zeros(),
            rotation: 0.0,
            scale: Vec2::new(1.0, 1.0),
            color: [1.0, 1.0, 1.0, 1.0],
            attrs: IndexMap::new(),
            tags: BTreeSet::new(),
            nodes: Vec::new(),
            folders: Vec::new(),
            animations: Vec::new(),
            animators: Vec::new(),
            bone_index: 0,
            base_index: 0,
            wrapper: None,
        }
    }

    /// Creates a bone node.
    pub fn bone(name: impl Into<String>) -> Self {
        Self::new(name).with_kind(NodeKind::Bone)
    }

    /// Set the node kind.
    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the local position.
    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Set the local rotation in radians.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the local scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Set the tint color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Set visibility.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Add a free-form attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn is_bone(&self) -> bool {
        self.kind == NodeKind::Bone
    }

    /// Child nodes in flat pre-order, including folder and bone contents.
    pub fn nodes(&self) -> &[Id<Node>] {
        &self.nodes
    }

    /// Folder descriptors in pre-order.
    pub fn folders(&self) -> &[Id<Folder>] {
        &self.folders
    }

    pub fn animations(&self) -> &[Id<Animation>] {
        &self.animations
    }

    pub fn animators(&self) -> &[Id<Animator>] {
        &self.animators
    }

    /// Document-unique bone number. 0 means the node was never linked as
    /// a bone.
    pub fn bone_index(&self) -> u32 {
        self.bone_index
    }

    /// Bone number of the parent bone, or 0 for a skeleton root.
    pub fn base_index(&self) -> u32 {
        self.base_index
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("node")
    }
}

/// A folder descriptor inside a node's child list.
///
/// Folders group a contiguous run of entries in the owning sprite's flat
/// `nodes` list without owning storage themselves: `index` is the absolute
/// position in that list where the folder's contents start, `item_count`
/// the number of *direct* children (nodes and sub-folders). Both fields are
/// maintained by the link engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Display name shown in the scene tree.
    pub name: String,
    #[serde(skip)]
    pub(crate) index: usize,
    #[serde(skip)]
    pub(crate) item_count: usize,
    #[serde(skip)]
    pub(crate) wrapper: Option<Id<SceneItem>>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            item_count: 0,
            wrapper: None,
        }
    }

    /// Absolute position in the owning sprite's `nodes` list where this
    /// folder's contents start.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of direct children (nodes and sub-folders).
    pub fn item_count(&self) -> usize {
        self.item_count
    }
}
