//! Typed id arena backing the document model.
//!
//! Every entity kind in a document (nodes, folders, animations, markers,
//! tracks, animators, scene items) lives in its own [`Store`] and is
//! addressed by a typed [`Id`]. Stores are append-only: removing an item
//! from the document tree never frees its slot, it only makes the item
//! unreachable from the root. Undo entries keep referring to the same ids,
//! so an id recorded in history stays valid for the document's lifetime.
//!
//! Membership in the document is therefore *reachability from the root*,
//! not presence in a store.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A typed index into a [`Store`].
///
/// `Id<Node>` and `Id<Folder>` are distinct types even though both are a
/// `u32` underneath, so ids cannot be crossed between stores.
///
/// # Identity
///
/// Ids are never reused within a document. Two ids are equal if they have
/// the same index; an id is only meaningful together with the document that
/// issued it.
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Raw slot index. Mainly useful for debug output.
    pub fn index(self) -> u32 {
        self.index
    }
}

// Manual impls: derives would require `T` itself to satisfy the bound,
// but an id is just a number regardless of what it points at.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        write!(f, "{}#{}", short, self.index)
    }
}

/// Append-only arena of `T` values addressed by [`Id<T>`].
///
/// # Example
///
/// ```
/// use sorrel_document::store::Store;
///
/// let mut names: Store<String> = Store::new();
/// let a = names.insert("left arm".to_string());
/// let b = names.insert("right arm".to_string());
/// assert_ne!(a, b);
/// assert_eq!(names[a], "left arm");
/// assert_eq!(names.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Store<T> {
    items: Vec<T>,
}

impl<T> Store<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds a value and returns its id. Ids are handed out sequentially
    /// and never recycled.
    pub fn insert(&mut self, value: T) -> Id<T> {
        let id = Id::new(self.items.len() as u32);
        self.items.push(value);
        id
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.index as usize)
    }

    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.items.get_mut(id.index as usize)
    }

    pub fn contains(&self, id: Id<T>) -> bool {
        (id.index as usize) < self.items.len()
    }

    /// Number of values ever inserted, including ones no longer reachable
    /// from the document root.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all slots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, value)| (Id::new(i as u32), value))
    }
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Id<T>> for Store<T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the id was issued by a different document's store.
    fn index(&self, id: Id<T>) -> &T {
        &self.items[id.index as usize]
    }
}

impl<T> IndexMut<Id<T>> for Store<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.items[id.index as usize]
    }
}
