//! Generic reversible operations over the document's ordered lists.
//!
//! A [`ListSlot`] names one concrete `Vec` inside the document (a node's
//! child-node list, an animation's marker list, ...). The three operations
//! here work uniformly over any slot: [`InsertIntoList`],
//! [`RemoveFromList`], and [`SetListElement`]. Composite edits are built
//! by performing several of these inside one transaction.

use std::fmt;

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::history::Operation;
use crate::model::{Animation, AnimationTrack, Animator, Folder, Marker, Node};
use crate::store::Id;

/// Addresses one ordered list inside a document.
///
/// Slots are small copyable values (an id plus the field choice encoded in
/// the type), so operations can keep them across undo/redo cycles.
pub trait ListSlot: fmt::Debug + Send + Copy + 'static {
    type Elem: Clone + PartialEq + fmt::Debug + Send + 'static;

    /// Name of the addressed list, used in error messages.
    fn target(&self) -> &'static str;

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Self::Elem>;

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Self::Elem>;
}

/// A node's flat child-node list.
#[derive(Debug, Clone, Copy)]
pub struct ChildNodes(pub Id<Node>);

impl ListSlot for ChildNodes {
    type Elem = Id<Node>;

    fn target(&self) -> &'static str {
        "child nodes"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<Node>> {
        &document.nodes[self.0].nodes
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<Node>> {
        &mut document.nodes[self.0].nodes
    }
}

/// A node's folder descriptor list.
#[derive(Debug, Clone, Copy)]
pub struct NodeFolders(pub Id<Node>);

impl ListSlot for NodeFolders {
    type Elem = Id<Folder>;

    fn target(&self) -> &'static str {
        "folders"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<Folder>> {
        &document.nodes[self.0].folders
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<Folder>> {
        &mut document.nodes[self.0].folders
    }
}

/// A node's animation list.
#[derive(Debug, Clone, Copy)]
pub struct NodeAnimations(pub Id<Node>);

impl ListSlot for NodeAnimations {
    type Elem = Id<Animation>;

    fn target(&self) -> &'static str {
        "animations"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<Animation>> {
        &document.nodes[self.0].animations
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<Animation>> {
        &mut document.nodes[self.0].animations
    }
}

/// A node's animator list.
#[derive(Debug, Clone, Copy)]
pub struct NodeAnimators(pub Id<Node>);

impl ListSlot for NodeAnimators {
    type Elem = Id<Animator>;

    fn target(&self) -> &'static str {
        "animators"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<Animator>> {
        &document.nodes[self.0].animators
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<Animator>> {
        &mut document.nodes[self.0].animators
    }
}

/// An animation's marker list, ordered by frame.
#[derive(Debug, Clone, Copy)]
pub struct AnimationMarkers(pub Id<Animation>);

impl ListSlot for AnimationMarkers {
    type Elem = Id<Marker>;

    fn target(&self) -> &'static str {
        "markers"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<Marker>> {
        &document.animations[self.0].markers
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<Marker>> {
        &mut document.animations[self.0].markers
    }
}

/// An animation's track list.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTracks(pub Id<Animation>);

impl ListSlot for AnimationTracks {
    type Elem = Id<AnimationTrack>;

    fn target(&self) -> &'static str {
        "tracks"
    }

    fn list<'a>(&self, document: &'a Document) -> &'a Vec<Id<AnimationTrack>> {
        &document.animations[self.0].tracks
    }

    fn list_mut<'a>(&self, document: &'a mut Document) -> &'a mut Vec<Id<AnimationTrack>> {
        &mut document.animations[self.0].tracks
    }
}

/// Inserts an element at a position. Reverts by removing it again.
#[derive(Debug)]
pub struct InsertIntoList<S: ListSlot> {
    slot: S,
    index: usize,
    element: S::Elem,
}

impl<S: ListSlot> InsertIntoList<S> {
    pub fn new(slot: S, index: usize, element: S::Elem) -> Self {
        Self {
            slot,
            index,
            element,
        }
    }

    pub fn boxed(slot: S, index: usize, element: S::Elem) -> Box<dyn Operation> {
        Box::new(Self::new(slot, index, element))
    }
}

impl<S: ListSlot> Operation for InsertIntoList<S> {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let len = self.slot.list(document).len();
        if self.index > len {
            return Err(DocumentError::IndexOutOfRange {
                target: self.slot.target(),
                index: self.index,
                len,
            });
        }
        self.slot
            .list_mut(document)
            .insert(self.index, self.element.clone());
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let removed = self.slot.list_mut(document).remove(self.index);
        debug_assert!(removed == self.element, "revert removed a different element");
        Ok(())
    }

    fn description(&self) -> &str {
        "Insert element"
    }
}

/// Removes the element at a position, remembering it for undo.
#[derive(Debug)]
pub struct RemoveFromList<S: ListSlot> {
    slot: S,
    index: usize,
    removed: Option<S::Elem>,
}

impl<S: ListSlot> RemoveFromList<S> {
    pub fn new(slot: S, index: usize) -> Self {
        Self {
            slot,
            index,
            removed: None,
        }
    }

    pub fn boxed(slot: S, index: usize) -> Box<dyn Operation> {
        Box::new(Self::new(slot, index))
    }
}

impl<S: ListSlot> Operation for RemoveFromList<S> {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let len = self.slot.list(document).len();
        if self.index >= len {
            return Err(DocumentError::IndexOutOfRange {
                target: self.slot.target(),
                index: self.index,
                len,
            });
        }
        self.removed = Some(self.slot.list_mut(document).remove(self.index));
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let element = self
            .removed
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        self.slot.list_mut(document).insert(self.index, element);
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove element"
    }
}

/// Replaces the element at a position, remembering the old one for undo.
#[derive(Debug)]
pub struct SetListElement<S: ListSlot> {
    slot: S,
    index: usize,
    element: S::Elem,
    previous: Option<S::Elem>,
}

impl<S: ListSlot> SetListElement<S> {
    pub fn new(slot: S, index: usize, element: S::Elem) -> Self {
        Self {
            slot,
            index,
            element,
            previous: None,
        }
    }

    pub fn boxed(slot: S, index: usize, element: S::Elem) -> Box<dyn Operation> {
        Box::new(Self::new(slot, index, element))
    }
}

impl<S: ListSlot> Operation for SetListElement<S> {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let len = self.slot.list(document).len();
        if self.index >= len {
            return Err(DocumentError::IndexOutOfRange {
                target: self.slot.target(),
                index: self.index,
                len,
            });
        }
        let list = self.slot.list_mut(document);
        self.previous = Some(std::mem::replace(
            &mut list[self.index],
            self.element.clone(),
        ));
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let previous = self
            .previous
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        self.slot.list_mut(document)[self.index] = previous;
        Ok(())
    }

    fn description(&self) -> &str {
        "Replace element"
    }
}
