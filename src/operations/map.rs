//! Reversible edits of a node's keyed data: custom attributes and tags.
//!
//! Attributes live in an [`IndexMap`](indexmap::IndexMap), so removal has
//! to remember the entry's position as well as its value; undo restores
//! the original iteration order, not just the key.

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::history::Operation;
use crate::model::{Node, PropertyValue};
use crate::store::Id;

/// Sets a custom attribute on a node, inserting or overwriting.
#[derive(Debug)]
pub struct InsertAttribute {
    node: Id<Node>,
    key: String,
    value: PropertyValue,
    /// `Some(Some(v))` once applied over an existing entry, `Some(None)`
    /// once applied as a fresh insert.
    previous: Option<Option<PropertyValue>>,
}

impl InsertAttribute {
    pub fn new(node: Id<Node>, key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            node,
            key: key.into(),
            value,
            previous: None,
        }
    }

    pub fn boxed(node: Id<Node>, key: impl Into<String>, value: PropertyValue) -> Box<dyn Operation> {
        Box::new(Self::new(node, key, value))
    }
}

impl Operation for InsertAttribute {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let attrs = &mut document.nodes[self.node].attrs;
        self.previous = Some(attrs.insert(self.key.clone(), self.value.clone()));
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let previous = self
            .previous
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        let attrs = &mut document.nodes[self.node].attrs;
        match previous {
            Some(old) => {
                attrs.insert(self.key.clone(), old);
            }
            None => {
                attrs.shift_remove(&self.key);
            }
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Set attribute"
    }
}

/// Removes a custom attribute, remembering its position and value.
#[derive(Debug)]
pub struct RemoveAttribute {
    node: Id<Node>,
    key: String,
    removed: Option<(usize, PropertyValue)>,
}

impl RemoveAttribute {
    pub fn new(node: Id<Node>, key: impl Into<String>) -> Self {
        Self {
            node,
            key: key.into(),
            removed: None,
        }
    }

    pub fn boxed(node: Id<Node>, key: impl Into<String>) -> Box<dyn Operation> {
        Box::new(Self::new(node, key))
    }
}

impl Operation for RemoveAttribute {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let attrs = &mut document.nodes[self.node].attrs;
        let Some(index) = attrs.get_index_of(&self.key) else {
            return Err(DocumentError::InvalidState(format!(
                "attribute '{}' is not present",
                self.key
            )));
        };
        let (_, value) = attrs
            .shift_remove_index(index)
            .ok_or_else(|| DocumentError::InvalidState("attribute vanished".into()))?;
        self.removed = Some((index, value));
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let (index, value) = self
            .removed
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        document.nodes[self.node]
            .attrs
            .shift_insert(index, self.key.clone(), value);
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove attribute"
    }
}

/// Adds a tag to a node. Fails if the tag is already present, so undo can
/// remove exactly what apply added.
#[derive(Debug)]
pub struct AddTag {
    node: Id<Node>,
    tag: String,
}

impl AddTag {
    pub fn new(node: Id<Node>, tag: impl Into<String>) -> Self {
        Self {
            node,
            tag: tag.into(),
        }
    }

    pub fn boxed(node: Id<Node>, tag: impl Into<String>) -> Box<dyn Operation> {
        Box::new(Self::new(node, tag))
    }
}

impl Operation for AddTag {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let tags = &mut document.nodes[self.node].tags;
        if !tags.insert(self.tag.clone()) {
            return Err(DocumentError::InvalidState(format!(
                "tag '{}' is already present",
                self.tag
            )));
        }
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let removed = document.nodes[self.node].tags.remove(&self.tag);
        debug_assert!(removed, "revert of an unapplied tag add");
        Ok(())
    }

    fn description(&self) -> &str {
        "Add tag"
    }
}

/// Removes a tag from a node. Fails if the tag is absent.
#[derive(Debug)]
pub struct RemoveTag {
    node: Id<Node>,
    tag: String,
}

impl RemoveTag {
    pub fn new(node: Id<Node>, tag: impl Into<String>) -> Self {
        Self {
            node,
            tag: tag.into(),
        }
    }

    pub fn boxed(node: Id<Node>, tag: impl Into<String>) -> Box<dyn Operation> {
        Box::new(Self::new(node, tag))
    }
}

impl Operation for RemoveTag {
    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let tags = &mut document.nodes[self.node].tags;
        if !tags.remove(&self.tag) {
            return Err(DocumentError::InvalidState(format!(
                "tag '{}' is not present",
                self.tag
            )));
        }
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        document.nodes[self.node].tags.insert(self.tag.clone());
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove tag"
    }
}
