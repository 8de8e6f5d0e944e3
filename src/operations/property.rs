//! Reversible single-value writes.
//!
//! A [`PropertySlot`] names one settable value inside the document together
//! with its read and write accessors; [`SetProperty`] is the one operation
//! that drives any slot, capturing the previous value on apply so undo can
//! restore it. Link bookkeeping (folder indices, bone indices) runs through
//! the same slots so that every write lands in history individually.

use std::fmt;

use crate::document::{Document, SceneItem};
use crate::error::{DocumentError, DocumentResult};
use crate::history::Operation;
use crate::model::{AnimatedProperty, Animation, AnimationTrack, Folder, Node, PropertyValue};
use crate::store::Id;

/// Addresses one settable value inside a document.
pub trait PropertySlot: fmt::Debug + Send + Copy + 'static {
    type Value: Clone + PartialEq + fmt::Debug + Send + 'static;

    /// History label for a write to this slot.
    fn description(&self) -> &'static str;

    fn get(&self, document: &Document) -> Self::Value;

    /// Writes the value. Implementations validate before mutating, so a
    /// returned error means the document is untouched.
    fn set(&self, document: &mut Document, value: Self::Value) -> DocumentResult;

    /// Whether a write to this slot counts as a content change. Session
    /// state such as tree expansion reports `false`.
    fn changes_document(&self) -> bool {
        true
    }
}

/// A node's display name.
#[derive(Debug, Clone, Copy)]
pub struct NodeName(pub Id<Node>);

impl PropertySlot for NodeName {
    type Value = String;

    fn description(&self) -> &'static str {
        "Set node name"
    }

    fn get(&self, document: &Document) -> String {
        document.nodes[self.0].name.clone()
    }

    fn set(&self, document: &mut Document, value: String) -> DocumentResult {
        document.nodes[self.0].name = value;
        Ok(())
    }
}

/// A folder's display name.
#[derive(Debug, Clone, Copy)]
pub struct FolderName(pub Id<Folder>);

impl PropertySlot for FolderName {
    type Value = String;

    fn description(&self) -> &'static str {
        "Set folder name"
    }

    fn get(&self, document: &Document) -> String {
        document.folders[self.0].name.clone()
    }

    fn set(&self, document: &mut Document, value: String) -> DocumentResult {
        document.folders[self.0].name = value;
        Ok(())
    }
}

/// A folder's absolute position in its sprite's flat node list. Owned by
/// the link engine; exposed as a slot so every shift is undoable.
#[derive(Debug, Clone, Copy)]
pub struct FolderIndex(pub Id<Folder>);

impl PropertySlot for FolderIndex {
    type Value = usize;

    fn description(&self) -> &'static str {
        "Set folder index"
    }

    fn get(&self, document: &Document) -> usize {
        document.folders[self.0].index
    }

    fn set(&self, document: &mut Document, value: usize) -> DocumentResult {
        document.folders[self.0].index = value;
        Ok(())
    }
}

/// A folder's direct-children count. Owned by the link engine.
#[derive(Debug, Clone, Copy)]
pub struct FolderItemCount(pub Id<Folder>);

impl PropertySlot for FolderItemCount {
    type Value = usize;

    fn description(&self) -> &'static str {
        "Set folder item count"
    }

    fn get(&self, document: &Document) -> usize {
        document.folders[self.0].item_count
    }

    fn set(&self, document: &mut Document, value: usize) -> DocumentResult {
        document.folders[self.0].item_count = value;
        Ok(())
    }
}

/// A bone's document-wide index. Owned by the link engine; rejects writes
/// to nodes that are not bones.
#[derive(Debug, Clone, Copy)]
pub struct BoneIndex(pub Id<Node>);

impl PropertySlot for BoneIndex {
    type Value = u32;

    fn description(&self) -> &'static str {
        "Set bone index"
    }

    fn get(&self, document: &Document) -> u32 {
        document.nodes[self.0].bone_index
    }

    fn set(&self, document: &mut Document, value: u32) -> DocumentResult {
        let node = &mut document.nodes[self.0];
        if !node.is_bone() {
            return Err(DocumentError::InvalidState(format!(
                "node '{}' is not a bone",
                node.name
            )));
        }
        node.bone_index = value;
        Ok(())
    }
}

/// The index of a bone's enclosing bone, or zero at the top of a chain.
#[derive(Debug, Clone, Copy)]
pub struct BoneBaseIndex(pub Id<Node>);

impl PropertySlot for BoneBaseIndex {
    type Value = u32;

    fn description(&self) -> &'static str {
        "Set bone base"
    }

    fn get(&self, document: &Document) -> u32 {
        document.nodes[self.0].base_index
    }

    fn set(&self, document: &mut Document, value: u32) -> DocumentResult {
        let node = &mut document.nodes[self.0];
        if !node.is_bone() {
            return Err(DocumentError::InvalidState(format!(
                "node '{}' is not a bone",
                node.name
            )));
        }
        node.base_index = value;
        Ok(())
    }
}

/// One of a node's animated stage properties, written as a dynamic value.
/// The write is kind-checked against the property.
#[derive(Debug, Clone, Copy)]
pub struct NodeProperty(pub Id<Node>, pub AnimatedProperty);

impl PropertySlot for NodeProperty {
    type Value = PropertyValue;

    fn description(&self) -> &'static str {
        "Set node property"
    }

    fn get(&self, document: &Document) -> PropertyValue {
        self.1.read(&document.nodes[self.0])
    }

    fn set(&self, document: &mut Document, value: PropertyValue) -> DocumentResult {
        self.1.write(&mut document.nodes[self.0], value)
    }
}

/// An animation's length in frames.
#[derive(Debug, Clone, Copy)]
pub struct AnimationLength(pub Id<Animation>);

impl PropertySlot for AnimationLength {
    type Value = u32;

    fn description(&self) -> &'static str {
        "Set animation length"
    }

    fn get(&self, document: &Document) -> u32 {
        document.animations[self.0].length
    }

    fn set(&self, document: &mut Document, value: u32) -> DocumentResult {
        document.animations[self.0].length = value;
        Ok(())
    }
}

/// A track's mute flag.
#[derive(Debug, Clone, Copy)]
pub struct TrackMuted(pub Id<AnimationTrack>);

impl PropertySlot for TrackMuted {
    type Value = bool;

    fn description(&self) -> &'static str {
        "Mute track"
    }

    fn get(&self, document: &Document) -> bool {
        document.tracks[self.0].muted
    }

    fn set(&self, document: &mut Document, value: bool) -> DocumentResult {
        document.tracks[self.0].muted = value;
        Ok(())
    }
}

/// A tree item's expanded flag. Recorded in history like any edit, but
/// does not mark the document dirty.
#[derive(Debug, Clone, Copy)]
pub struct ItemExpanded(pub Id<SceneItem>);

impl PropertySlot for ItemExpanded {
    type Value = bool;

    fn description(&self) -> &'static str {
        "Expand item"
    }

    fn get(&self, document: &Document) -> bool {
        document.items[self.0].expanded
    }

    fn set(&self, document: &mut Document, value: bool) -> DocumentResult {
        document.items[self.0].expanded = value;
        Ok(())
    }

    fn changes_document(&self) -> bool {
        false
    }
}

/// Writes a value through a [`PropertySlot`], capturing the previous value
/// so the write can be reverted.
#[derive(Debug)]
pub struct SetProperty<P: PropertySlot> {
    slot: P,
    value: P::Value,
    previous: Option<P::Value>,
}

impl<P: PropertySlot> SetProperty<P> {
    pub fn new(slot: P, value: P::Value) -> Self {
        Self {
            slot,
            value,
            previous: None,
        }
    }

    pub fn boxed(slot: P, value: P::Value) -> Box<dyn Operation> {
        Box::new(Self::new(slot, value))
    }
}

impl<P: PropertySlot> Operation for SetProperty<P> {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let previous = self.slot.get(document);
        self.slot.set(document, self.value.clone())?;
        self.previous = Some(previous);
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let previous = self
            .previous
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        self.slot.set(document, previous)
    }

    fn description(&self) -> &str {
        self.slot.description()
    }

    fn changes_document(&self) -> bool {
        self.slot.changes_document()
    }
}
