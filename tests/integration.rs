use sorrel_document::context::EditContext;
use sorrel_document::document::index::{flat_from_kind_index, kind_index_from_flat};
use sorrel_document::document::{Document, ItemKind, ItemPayload, SceneItem};
use sorrel_document::error::DocumentError;
use sorrel_document::history::DocumentHistory;
use sorrel_document::model::{
    AnimatedProperty, Animation, AnimationTrack, Folder, Keyframe, Marker, Node, PropertyValue,
};
use sorrel_document::operations::SetProperty;
use sorrel_document::operations::property::NodeName;
use sorrel_document::store::Id;

fn node_id(doc: &Document, item: Id<SceneItem>) -> Id<Node> {
    match doc.item(item).payload() {
        ItemPayload::Node(id) => id,
        other => panic!("expected a node item, got {other:?}"),
    }
}

fn folder_id(doc: &Document, item: Id<SceneItem>) -> Id<Folder> {
    match doc.item(item).payload() {
        ItemPayload::Folder(id) => id,
        other => panic!("expected a folder item, got {other:?}"),
    }
}

fn animation_id(doc: &Document, item: Id<SceneItem>) -> Id<Animation> {
    match doc.item(item).payload() {
        ItemPayload::Animation(id) => id,
        other => panic!("expected an animation item, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Concrete editing scenarios
// ---------------------------------------------------------------------------

#[test]
fn front_links_stack_in_reverse_order() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let a = ctx.document.new_node(Node::new("a"));
    let b = ctx.document.new_node(Node::new("b"));
    ctx.link_scene_item(root, 0, a).unwrap();
    ctx.link_scene_item(root, 0, b).unwrap();

    assert_eq!(ctx.document.item(root).children(), [b, a]);

    assert!(ctx.undo().unwrap());
    assert!(ctx.undo().unwrap());
    assert!(ctx.document.item(root).children().is_empty());
    ctx.document.check_consistency().unwrap();
}

#[test]
fn folder_item_count_tracks_direct_children() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let props = ctx.document.new_folder(Folder::new("props"));
    ctx.link_scene_item(root, 0, props).unwrap();
    let descriptor = folder_id(ctx.document, props);
    assert_eq!(ctx.document.folder(descriptor).item_count(), 0);

    let a = ctx.document.new_node(Node::new("a"));
    let b = ctx.document.new_node(Node::new("b"));
    ctx.link_scene_item(props, usize::MAX, a).unwrap();
    ctx.link_scene_item(props, usize::MAX, b).unwrap();
    assert_eq!(ctx.document.folder(descriptor).item_count(), 2);

    ctx.unlink_scene_item(a).unwrap();
    assert_eq!(ctx.document.folder(descriptor).item_count(), 1);

    ctx.undo().unwrap();
    assert_eq!(ctx.document.folder(descriptor).item_count(), 2);
    ctx.document.check_consistency().unwrap();
}

#[test]
fn out_of_scope_keyframes_are_rejected_atomically() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let holder = ctx.document.new_node(Node::new("holder"));
    let stranger = ctx.document.new_node(Node::new("stranger"));
    ctx.link_scene_item(root, usize::MAX, holder).unwrap();
    ctx.link_scene_item(root, usize::MAX, stranger).unwrap();

    let walk_item = ctx.document.new_animation(Animation::new("walk"));
    ctx.link_scene_item(holder, 0, walk_item).unwrap();
    let walk = animation_id(ctx.document, walk_item);
    let stranger_node = node_id(ctx.document, stranger);

    // "walk" lives on a sibling, not on the stranger's ancestor chain.
    let err = ctx
        .set_keyframe(
            stranger_node,
            AnimatedProperty::Rotation,
            walk,
            Keyframe::new(10, PropertyValue::Float(1.0)),
        )
        .unwrap_err();
    assert_eq!(
        err,
        DocumentError::AnimationOutOfScope {
            animation: "walk".into(),
            node: "stranger".into(),
        }
    );

    assert!(ctx.document.node(stranger_node).animators().is_empty());
    assert_eq!(ctx.history.undo_count(), 3); // only the three links
    ctx.document.check_consistency().unwrap();
}

#[test]
fn nested_transactions_produce_one_entry() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let node = doc.root_node();

    history.begin_transaction("Rename thrice");
    history
        .perform(SetProperty::boxed(NodeName(node), "first".to_string()), &mut doc)
        .unwrap();
    history.begin_transaction("inner");
    history
        .perform(SetProperty::boxed(NodeName(node), "second".to_string()), &mut doc)
        .unwrap();
    history.commit_transaction();
    history
        .perform(SetProperty::boxed(NodeName(node), "third".to_string()), &mut doc)
        .unwrap();
    history.commit_transaction();

    assert_eq!(history.undo_count(), 1);
    let entry = history.undo_entries().next().unwrap();
    assert_eq!(entry.description(), "Rename thrice");
    assert_eq!(entry.op_count(), 3);
    assert_eq!(doc.node(node).name, "third");

    assert!(history.undo(&mut doc).unwrap());
    assert_eq!(doc.node(node).name, "root");
}

// ---------------------------------------------------------------------------
// Undo/redo laws over a whole editing session
// ---------------------------------------------------------------------------

// Runs a session touching every subsystem (folders, bones, animations,
// markers, tracks, keyframes), snapshotting the document after every entry.
// Undoing to the bottom and redoing back to the top must reproduce every
// snapshot exactly, and the document must stay consistent at every stop.
#[test]
fn editing_session_round_trips_exactly() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let mut states = vec![ctx.document.describe()];

    let props = ctx.document.new_folder(Folder::new("props"));
    ctx.link_scene_item(root, 0, props).unwrap();
    states.push(ctx.document.describe());

    let crate_node = ctx.document.new_node(Node::new("crate"));
    ctx.link_scene_item(props, usize::MAX, crate_node).unwrap();
    states.push(ctx.document.describe());

    let barrel = ctx.document.new_node(Node::new("barrel"));
    ctx.link_scene_item(props, 0, barrel).unwrap();
    states.push(ctx.document.describe());

    let vases = ctx.document.new_folder(Folder::new("vases"));
    ctx.link_scene_item(props, usize::MAX, vases).unwrap();
    states.push(ctx.document.describe());

    let vase = ctx.document.new_node(Node::new("vase"));
    ctx.link_scene_item(vases, 0, vase).unwrap();
    states.push(ctx.document.describe());

    let spine = ctx.document.new_node(Node::bone("spine"));
    ctx.link_scene_item(root, usize::MAX, spine).unwrap();
    states.push(ctx.document.describe());

    let arm = ctx.document.new_node(Node::bone("arm"));
    ctx.link_scene_item(spine, usize::MAX, arm).unwrap();
    states.push(ctx.document.describe());

    let spine_node = node_id(ctx.document, spine);
    let arm_node = node_id(ctx.document, arm);
    assert_eq!(ctx.document.node(spine_node).bone_index(), 1);
    assert_eq!(ctx.document.node(arm_node).bone_index(), 2);
    assert_eq!(ctx.document.node(arm_node).base_index(), 1);

    let swing_item = ctx.document.new_animation(Animation::new("swing").with_length(24));
    ctx.link_scene_item(root, 0, swing_item).unwrap();
    let swing = animation_id(ctx.document, swing_item);
    states.push(ctx.document.describe());

    ctx.add_track(swing, AnimationTrack::new("sfx")).unwrap();
    states.push(ctx.document.describe());

    ctx.set_marker(swing, Marker::new("start", 0)).unwrap();
    states.push(ctx.document.describe());

    ctx.set_marker(swing, Marker::new("hit", 12)).unwrap();
    states.push(ctx.document.describe());

    ctx.set_keyframe(
        arm_node,
        AnimatedProperty::Rotation,
        swing,
        Keyframe::new(6, PropertyValue::Float(0.5)),
    )
    .unwrap();
    assert_eq!(ctx.document.node(arm_node).animators().len(), 1);
    states.push(ctx.document.describe());

    ctx.set_marker(swing, Marker::new("start loud", 0)).unwrap();
    states.push(ctx.document.describe());

    ctx.unlink_scene_item(props).unwrap();
    assert!(!ctx.document.is_attached(props));
    assert!(!ctx.document.is_attached(vase));
    states.push(ctx.document.describe());

    ctx.remove_marker(swing, 12).unwrap();
    states.push(ctx.document.describe());

    ctx.document.check_consistency().unwrap();
    assert_eq!(ctx.history.undo_count(), states.len() - 1);

    for expected in states.iter().rev().skip(1) {
        assert!(ctx.undo().unwrap());
        ctx.document.check_consistency().unwrap();
        assert_eq!(ctx.document.describe(), *expected);
    }
    assert!(!ctx.undo().unwrap());

    for expected in states.iter().skip(1) {
        assert!(ctx.redo().unwrap());
        ctx.document.check_consistency().unwrap();
        assert_eq!(ctx.document.describe(), *expected);
    }
    assert!(!ctx.redo().unwrap());
}

// ---------------------------------------------------------------------------
// Index translation through the link engine
// ---------------------------------------------------------------------------

#[test]
fn kind_local_and_flat_indices_round_trip() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    for name in ["walk", "run"] {
        let anim = ctx.document.new_animation(Animation::new(name));
        ctx.link_scene_item(root, usize::MAX, anim).unwrap();
    }
    let folder = ctx.document.new_folder(Folder::new("group"));
    ctx.link_scene_item(root, usize::MAX, folder).unwrap();
    for name in ["a", "b"] {
        let node = ctx.document.new_node(Node::new(name));
        ctx.link_scene_item(root, usize::MAX, node).unwrap();
    }

    let walk = ctx.document.find_animation(ctx.document.root_node(), "walk").unwrap();
    ctx.set_marker(walk, Marker::new("one", 1)).unwrap();
    ctx.set_marker(walk, Marker::new("two", 2)).unwrap();
    ctx.add_track(walk, AnimationTrack::new("sound")).unwrap();

    let view = ctx.document.animation_view(walk);
    for parent in [root, view] {
        for flat in 0..ctx.document.item(parent).children().len() {
            let child = ctx.document.item(parent).children()[flat];
            let kind = ctx.document.item(child).kind();
            let local = kind_index_from_flat(ctx.document, parent, flat);
            assert_eq!(flat_from_kind_index(ctx.document, parent, kind, local), flat);
        }
    }
    ctx.document.check_consistency().unwrap();
}

// ---------------------------------------------------------------------------
// Save tracking and history capacity
// ---------------------------------------------------------------------------

#[test]
fn save_point_follows_undo_and_redo() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::default();
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let a = ctx.document.new_node(Node::new("a"));
    ctx.link_scene_item(root, 0, a).unwrap();
    ctx.history.mark_saved();
    assert!(!ctx.history.has_unsaved_changes());

    let b = ctx.document.new_node(Node::new("b"));
    ctx.link_scene_item(root, 0, b).unwrap();
    assert!(ctx.history.has_unsaved_changes());

    ctx.undo().unwrap();
    assert!(!ctx.history.has_unsaved_changes());
    ctx.undo().unwrap();
    assert!(ctx.history.has_unsaved_changes());

    ctx.redo().unwrap();
    assert!(!ctx.history.has_unsaved_changes());
    ctx.redo().unwrap();
    assert!(ctx.history.has_unsaved_changes());
}

#[test]
fn capacity_overflow_drops_the_oldest_edit() {
    let mut doc = Document::new();
    let mut history = DocumentHistory::new(2);
    let mut ctx = EditContext::new(&mut doc, &mut history);
    let root = ctx.document.root();

    let a = ctx.document.new_node(Node::new("a"));
    ctx.link_scene_item(root, usize::MAX, a).unwrap();
    ctx.history.mark_saved();

    let later = [
        ctx.document.new_node(Node::new("b")),
        ctx.document.new_node(Node::new("c")),
        ctx.document.new_node(Node::new("d")),
    ];
    for item in later {
        ctx.link_scene_item(root, usize::MAX, item).unwrap();
    }

    assert_eq!(ctx.history.undo_count(), 2);
    assert!(ctx.undo().unwrap());
    assert!(ctx.undo().unwrap());
    assert!(!ctx.undo().unwrap());

    // The two oldest links survive; the save point is out of reach for good.
    assert!(ctx.document.is_attached(a));
    assert!(ctx.document.is_attached(later[0]));
    assert!(!ctx.document.is_attached(later[1]));
    assert!(ctx.history.has_unsaved_changes());
    ctx.document.check_consistency().unwrap();
}
