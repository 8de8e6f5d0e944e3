//! Keyframe edits: scope resolution, zero-pose capture, and the two
//! keyframe operations.
//!
//! Keyframes address an animation by its node-scoped string id: the
//! animation may live on the keyed node or on any ancestor node, and a
//! nearer animation with the same id shadows a farther one. Setting the
//! first keyframe of a property also records the property's rest value at
//! frame zero of the zero pose (when one is in scope), so the timeline can
//! always return to the unanimated state.

use crate::context::EditContext;
use crate::document::{Document, ItemPayload};
use crate::error::{DocumentError, DocumentResult};
use crate::history::Operation;
use crate::model::{AnimatedProperty, Animation, Animator, Keyframe, Node, ZERO_POSE_ID};
use crate::store::Id;

/// Checks that `animation` is what the node's scope resolves for its id:
/// reachable from the node's wrapper chain, and not shadowed by a nearer
/// animation with the same id.
pub fn resolve_animation_scope(
    document: &Document,
    node: Id<Node>,
    animation: Id<Animation>,
) -> DocumentResult {
    let id = &document.animation(animation).id;
    match scope_search(document, node, id) {
        Some(found) if found == animation => Ok(()),
        _ => Err(DocumentError::AnimationOutOfScope {
            animation: id.clone(),
            node: document.node(node).name.clone(),
        }),
    }
}

/// Walks the node's wrapper chain looking for an animation with the given
/// string id, nearest owner first.
fn scope_search(document: &Document, node: Id<Node>, id: &str) -> Option<Id<Animation>> {
    let mut current = Some(document.node_item(node));
    while let Some(item) = current {
        if let ItemPayload::Node(owner) = document.item(item).payload()
            && let Some(found) = document.find_animation(owner, id)
        {
            return Some(found);
        }
        current = document.item(item).parent();
    }
    None
}

impl EditContext<'_> {
    /// Sets a keyframe for `property` of `node` in `animation`.
    ///
    /// One transaction covers everything the edit may entail: recording
    /// the zero-pose rest value (on the property's first keyframe),
    /// staging and linking an animator when the property has none for this
    /// animation yet, and the keyframe write itself. A keyframe already
    /// sitting on the frame is replaced.
    ///
    /// Fails without touching the document if the value kind does not
    /// match the property or the animation is not in scope for the node.
    pub fn set_keyframe(
        &mut self,
        node: Id<Node>,
        property: AnimatedProperty,
        animation: Id<Animation>,
        key: Keyframe,
    ) -> DocumentResult {
        if key.value.kind() != property.value_kind() {
            return Err(DocumentError::KeyframeKindMismatch {
                expected: property.value_kind(),
                found: key.value.kind(),
            });
        }
        resolve_animation_scope(self.document, node, animation)?;
        let animation_id = self.document.animation(animation).id.clone();

        self.transaction("Set keyframe", |ctx| {
            if animation_id != ZERO_POSE_ID {
                ctx.sync_zero_pose(node, property)?;
            }
            let animator = ctx.ensure_animator(node, property, &animation_id)?;
            ctx.perform(InsertKeyframe::boxed(animator, key))
        })
    }

    /// Removes the keyframe at `frame` for `property` of `node` in
    /// `animation`. An animator left without keyframes is unlinked in the
    /// same transaction.
    pub fn remove_keyframe(
        &mut self,
        node: Id<Node>,
        property: AnimatedProperty,
        animation: Id<Animation>,
        frame: u32,
    ) -> DocumentResult {
        resolve_animation_scope(self.document, node, animation)?;
        let animation_id = self.document.animation(animation).id.clone();
        let Some(animator) = self.document.find_animator(node, property, &animation_id) else {
            return Err(DocumentError::InvalidState(format!(
                "no {} animator for animation '{animation_id}'",
                property.name()
            )));
        };

        self.transaction("Remove keyframe", |ctx| {
            ctx.perform(RemoveKeyframe::boxed(animator, frame))?;
            if ctx.document.animator(animator).keys().is_empty() {
                let item = ctx.document.animator_item(animator);
                ctx.unlink_scene_item(item)?;
            }
            Ok(())
        })
    }

    /// Records the property's rest value at frame zero of the zero pose,
    /// unless the property already has a zero-pose keyframe. Does nothing
    /// when no zero pose is in scope.
    fn sync_zero_pose(&mut self, node: Id<Node>, property: AnimatedProperty) -> DocumentResult {
        let doc = &*self.document;
        if scope_search(doc, node, ZERO_POSE_ID).is_none() {
            return Ok(());
        }
        if let Some(animator) = doc.find_animator(node, property, ZERO_POSE_ID)
            && !doc.animator(animator).keys().is_empty()
        {
            return Ok(());
        }
        let rest = property.read(doc.node(node));
        let animator = self.ensure_animator(node, property, ZERO_POSE_ID)?;
        self.perform(InsertKeyframe::boxed(animator, Keyframe::new(0, rest)))
    }

    /// Finds the node's animator for `(property, animation_id)`, staging
    /// and linking one when there is none yet.
    fn ensure_animator(
        &mut self,
        node: Id<Node>,
        property: AnimatedProperty,
        animation_id: &str,
    ) -> DocumentResult<Id<Animator>> {
        if let Some(existing) = self.document.find_animator(node, property, animation_id) {
            return Ok(existing);
        }
        let item = self
            .document
            .new_animator(Animator::new(property, animation_id));
        let parent = self.document.node_item(node);
        self.link_scene_item(parent, usize::MAX, item)?;
        match self.document.item(item).payload() {
            ItemPayload::Animator(id) => Ok(id),
            _ => unreachable!("staged animators wrap an animator"),
        }
    }
}

/// Where a keyframe write landed, resolved on first apply.
#[derive(Debug, Clone, Copy)]
enum KeySlot {
    Insert(usize),
    Replace(usize),
}

/// Inserts or replaces one keyframe at its frame, keeping the key list
/// sorted with at most one keyframe per frame.
#[derive(Debug)]
pub struct InsertKeyframe {
    animator: Id<Animator>,
    key: Keyframe,
    slot: Option<KeySlot>,
    replaced: Option<Keyframe>,
}

impl InsertKeyframe {
    pub fn new(animator: Id<Animator>, key: Keyframe) -> Self {
        Self {
            animator,
            key,
            slot: None,
            replaced: None,
        }
    }

    pub fn boxed(animator: Id<Animator>, key: Keyframe) -> Box<dyn Operation> {
        Box::new(Self::new(animator, key))
    }

    fn execute(&mut self, document: &mut Document, slot: KeySlot) {
        let keys = &mut document.animators[self.animator].keys;
        match slot {
            KeySlot::Insert(index) => keys.insert(index, self.key.clone()),
            KeySlot::Replace(index) => {
                self.replaced = Some(std::mem::replace(&mut keys[index], self.key.clone()));
            }
        }
    }
}

impl Operation for InsertKeyframe {
    fn apply(&mut self, document: &mut Document) -> DocumentResult {
        let animator = &document.animators[self.animator];
        if self.key.value.kind() != animator.target.value_kind() {
            return Err(DocumentError::KeyframeKindMismatch {
                expected: animator.target.value_kind(),
                found: self.key.value.kind(),
            });
        }
        let slot = match animator.key_position(self.key.frame) {
            Ok(index) => KeySlot::Replace(index),
            Err(index) => KeySlot::Insert(index),
        };
        self.slot = Some(slot);
        self.execute(document, slot);
        Ok(())
    }

    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let slot = self
            .slot
            .ok_or_else(|| DocumentError::InvalidState("replay before apply".into()))?;
        self.execute(document, slot);
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let slot = self
            .slot
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        let keys = &mut document.animators[self.animator].keys;
        match slot {
            KeySlot::Insert(index) => {
                let removed = keys.remove(index);
                debug_assert!(removed == self.key, "revert removed a different keyframe");
            }
            KeySlot::Replace(index) => {
                let previous = self
                    .replaced
                    .take()
                    .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
                keys[index] = previous;
            }
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Set keyframe"
    }
}

/// Removes the keyframe at an exact frame, remembering it for undo.
#[derive(Debug)]
pub struct RemoveKeyframe {
    animator: Id<Animator>,
    frame: u32,
    slot: Option<usize>,
    removed: Option<Keyframe>,
}

impl RemoveKeyframe {
    pub fn new(animator: Id<Animator>, frame: u32) -> Self {
        Self {
            animator,
            frame,
            slot: None,
            removed: None,
        }
    }

    pub fn boxed(animator: Id<Animator>, frame: u32) -> Box<dyn Operation> {
        Box::new(Self::new(animator, frame))
    }
}

impl Operation for RemoveKeyframe {
    fn apply(&mut self, document: &mut Document) -> DocumentResult {
        let Ok(index) = document.animators[self.animator].key_position(self.frame) else {
            return Err(DocumentError::InvalidState(format!(
                "no keyframe at frame {}",
                self.frame
            )));
        };
        self.slot = Some(index);
        self.removed = Some(document.animators[self.animator].keys.remove(index));
        Ok(())
    }

    fn replay(&mut self, document: &mut Document) -> DocumentResult {
        let index = self
            .slot
            .ok_or_else(|| DocumentError::InvalidState("replay before apply".into()))?;
        let keys = &mut document.animators[self.animator].keys;
        debug_assert!(
            keys[index].frame == self.frame,
            "keyframe slot moved since apply"
        );
        self.removed = Some(keys.remove(index));
        Ok(())
    }

    fn revert(&mut self, document: &mut Document) -> DocumentResult {
        let index = self
            .slot
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        let key = self
            .removed
            .take()
            .ok_or_else(|| DocumentError::InvalidState("revert before apply".into()))?;
        document.animators[self.animator].keys.insert(index, key);
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove keyframe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DocumentHistory;
    use crate::model::{PropertyValue, ValueKind};

    fn anim_of(doc: &Document, item: Id<crate::document::SceneItem>) -> Id<Animation> {
        match doc.item(item).payload() {
            ItemPayload::Animation(id) => id,
            _ => panic!("expected an animation item"),
        }
    }

    /// Root with a zero pose and a "walk" animation.
    fn setup() -> (Document, DocumentHistory, Id<Node>, Id<Animation>) {
        let mut doc = Document::new();
        let mut history = DocumentHistory::default();
        {
            let mut ctx = EditContext::new(&mut doc, &mut history);
            let root = ctx.document.root();
            let zero = ctx.document.new_animation(Animation::zero_pose());
            ctx.link_scene_item(root, 0, zero).unwrap();
            let walk = ctx
                .document
                .new_animation(Animation::new("walk").with_length(20));
            ctx.link_scene_item(root, usize::MAX, walk).unwrap();
        }
        let node = doc.root_node();
        let walk = doc.find_animation(node, "walk").unwrap();
        (doc, history, node, walk)
    }

    #[test]
    fn first_keyframe_records_the_zero_pose() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(1.0)),
        )
        .unwrap();

        let walk_animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, "walk")
            .unwrap();
        assert_eq!(ctx.document.animator(walk_animator).keys().len(), 1);

        // The rest value landed at frame zero of the zero pose.
        let zero_animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, ZERO_POSE_ID)
            .unwrap();
        let keys = ctx.document.animator(zero_animator).keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].frame, 0);
        assert_eq!(keys[0].value, PropertyValue::Float(0.0));
        ctx.document.check_consistency().unwrap();

        // The whole edit is one entry; undo removes both animators.
        ctx.undo().unwrap();
        assert!(
            ctx.document
                .find_animator(node, AnimatedProperty::Rotation, "walk")
                .is_none()
        );
        assert!(
            ctx.document
                .find_animator(node, AnimatedProperty::Rotation, ZERO_POSE_ID)
                .is_none()
        );
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn zero_pose_is_captured_only_once() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(1.0)),
        )
        .unwrap();
        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(9, PropertyValue::Float(2.0)),
        )
        .unwrap();

        let zero_animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, ZERO_POSE_ID)
            .unwrap();
        assert_eq!(ctx.document.animator(zero_animator).keys().len(), 1);
    }

    #[test]
    fn keying_the_zero_pose_itself_does_not_resync() {
        let (mut doc, mut history, node, _) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        let zero = ctx.document.find_zero_pose(node).unwrap();

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            zero,
            Keyframe::new(0, PropertyValue::Float(0.25)),
        )
        .unwrap();

        // Exactly one animator exists, holding the explicit key.
        assert_eq!(ctx.document.node(node).animators().len(), 1);
        let animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, ZERO_POSE_ID)
            .unwrap();
        assert_eq!(
            ctx.document.animator(animator).keys()[0].value,
            PropertyValue::Float(0.25)
        );
    }

    #[test]
    fn keyframe_on_an_occupied_frame_replaces_it() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(1.0)),
        )
        .unwrap();
        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(2.0)),
        )
        .unwrap();

        let animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, "walk")
            .unwrap();
        let keys = ctx.document.animator(animator).keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].value, PropertyValue::Float(2.0));

        ctx.undo().unwrap();
        let keys = ctx.document.animator(animator).keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].value, PropertyValue::Float(1.0));
    }

    #[test]
    fn keys_stay_sorted_across_undo_and_redo() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(8, PropertyValue::Float(1.0)),
        )
        .unwrap();
        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(3, PropertyValue::Float(0.5)),
        )
        .unwrap();
        let after = ctx.document.describe();

        let animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, "walk")
            .unwrap();
        let frames: Vec<_> = ctx
            .document
            .animator(animator)
            .keys()
            .iter()
            .map(|key| key.frame)
            .collect();
        assert_eq!(frames, vec![3, 8]);

        ctx.undo().unwrap();
        ctx.undo().unwrap();
        ctx.redo().unwrap();
        ctx.redo().unwrap();
        assert_eq!(ctx.document.describe(), after);
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn ancestor_animations_are_in_scope() {
        let (mut doc, mut history, _, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        let root = ctx.document.root();

        let child_item = ctx.document.new_node(Node::new("child"));
        ctx.link_scene_item(root, usize::MAX, child_item).unwrap();
        let ItemPayload::Node(child) = ctx.document.item(child_item).payload() else {
            panic!("expected a node item");
        };

        ctx.set_keyframe(
            child,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(2, PropertyValue::Float(0.7)),
        )
        .unwrap();

        // The animator lives on the keyed node, not the animation's owner.
        assert!(
            ctx.document
                .find_animator(child, AnimatedProperty::Rotation, "walk")
                .is_some()
        );
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn sibling_animations_are_out_of_scope() {
        let (mut doc, mut history, _, _) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        let root = ctx.document.root();

        let child_item = ctx.document.new_node(Node::new("child"));
        ctx.link_scene_item(root, usize::MAX, child_item).unwrap();
        let run_item = ctx.document.new_animation(Animation::new("run"));
        ctx.link_scene_item(child_item, 0, run_item).unwrap();
        let run = anim_of(ctx.document, run_item);

        let node = ctx.document.root_node();
        let err = ctx
            .set_keyframe(
                node,
                AnimatedProperty::Rotation,
                run,
                Keyframe::new(0, PropertyValue::Float(1.0)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            DocumentError::AnimationOutOfScope {
                animation: "run".to_string(),
                node: "root".to_string(),
            }
        );
    }

    #[test]
    fn nearer_animations_shadow_farther_ones() {
        let (mut doc, mut history, _, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        let root = ctx.document.root();

        let child_item = ctx.document.new_node(Node::new("child"));
        ctx.link_scene_item(root, usize::MAX, child_item).unwrap();
        let shadow_item = ctx.document.new_animation(Animation::new("walk"));
        ctx.link_scene_item(child_item, 0, shadow_item).unwrap();
        let ItemPayload::Node(child) = ctx.document.item(child_item).payload() else {
            panic!("expected a node item");
        };

        // The root's "walk" is hidden behind the child's own "walk".
        let err = ctx
            .set_keyframe(
                child,
                AnimatedProperty::Rotation,
                walk,
                Keyframe::new(0, PropertyValue::Float(1.0)),
            )
            .unwrap_err();
        assert!(matches!(err, DocumentError::AnimationOutOfScope { .. }));
    }

    #[test]
    fn kind_mismatch_is_rejected_before_any_mutation() {
        let (mut doc, mut history, node, walk) = setup();
        let undo_before = history.undo_count();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        let err = ctx
            .set_keyframe(
                node,
                AnimatedProperty::Position,
                walk,
                Keyframe::new(0, PropertyValue::Float(1.0)),
            )
            .unwrap_err();
        assert_eq!(
            err,
            DocumentError::KeyframeKindMismatch {
                expected: ValueKind::Vec2,
                found: ValueKind::Float,
            }
        );
        assert!(ctx.document.node(node).animators().is_empty());
        assert_eq!(ctx.history.undo_count(), undo_before);
    }

    #[test]
    fn removing_the_last_keyframe_unlinks_the_animator() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(1.0)),
        )
        .unwrap();
        ctx.remove_keyframe(node, AnimatedProperty::Rotation, walk, 5)
            .unwrap();

        assert!(
            ctx.document
                .find_animator(node, AnimatedProperty::Rotation, "walk")
                .is_none()
        );
        ctx.document.check_consistency().unwrap();

        ctx.undo().unwrap();
        let animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, "walk")
            .unwrap();
        assert_eq!(ctx.document.animator(animator).keys().len(), 1);
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn removing_a_missing_keyframe_rolls_back_cleanly() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_keyframe(
            node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(5, PropertyValue::Float(1.0)),
        )
        .unwrap();
        let undo_before = ctx.history.undo_count();

        let err = ctx
            .remove_keyframe(node, AnimatedProperty::Rotation, walk, 7)
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidState(_)));
        assert_eq!(ctx.history.undo_count(), undo_before);

        let animator = ctx
            .document
            .find_animator(node, AnimatedProperty::Rotation, "walk")
            .unwrap();
        assert_eq!(ctx.document.animator(animator).keys().len(), 1);
    }

    #[test]
    fn removing_from_a_property_without_animator_fails() {
        let (mut doc, mut history, node, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        let err = ctx
            .remove_keyframe(node, AnimatedProperty::Scale, walk, 0)
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidState(_)));
    }
}
