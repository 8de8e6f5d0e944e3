//! The scene document: entity stores plus the item tree.

use crate::document::{ItemKind, ItemPayload, SceneItem};
use crate::model::{
    Animation, AnimationTrack, Animator, Folder, Marker, Node, NodeKind, ZERO_POSE_ID,
};
use crate::store::{Id, Store};

/// A scene document: typed entity stores, the item tree rooted at a sprite
/// node, and one marker/track view per animation.
///
/// # Mutation discipline
///
/// `Document` hands out shared references only. Entities that belong to a
/// document are mutated exclusively through operations executed via
/// [`EditContext`](crate::context::EditContext), which records every change
/// in history. The `new_*` staging constructors are the one exception:
/// staging creates an entity and its tree item in a detached state, and the
/// entity only becomes part of the document when a link operation attaches
/// it.
///
/// # Id stability
///
/// Stores never free slots. Unlinking makes an item unreachable but keeps
/// it alive, so ids captured in undo entries stay valid; relinking through
/// undo restores the same ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) items: Store<SceneItem>,
    pub(crate) nodes: Store<Node>,
    pub(crate) folders: Store<Folder>,
    pub(crate) animations: Store<Animation>,
    pub(crate) markers: Store<Marker>,
    pub(crate) tracks: Store<AnimationTrack>,
    pub(crate) animators: Store<Animator>,
    root: Id<SceneItem>,
    next_bone_index: u32,
}

impl Document {
    /// Creates an empty document containing only the root sprite.
    pub fn new() -> Self {
        let mut doc = Self {
            items: Store::new(),
            nodes: Store::new(),
            folders: Store::new(),
            animations: Store::new(),
            markers: Store::new(),
            tracks: Store::new(),
            animators: Store::new(),
            root: Id::new(0),
            next_bone_index: 1,
        };
        doc.root = doc.new_node(Node::new("root"));
        doc.items[doc.root].expanded = true;
        doc
    }

    /// The root item. Always wraps a sprite node and is never unlinked.
    pub fn root(&self) -> Id<SceneItem> {
        self.root
    }

    pub fn root_node(&self) -> Id<Node> {
        match self.items[self.root].payload {
            ItemPayload::Node(node) => node,
            _ => unreachable!("the root item always wraps a node"),
        }
    }

    // ===== Staging =====

    /// Stages a node: stores it and wraps it in a detached tree item.
    pub fn new_node(&mut self, node: Node) -> Id<SceneItem> {
        let node_id = self.nodes.insert(node);
        let item = self.items.insert(SceneItem::new(ItemPayload::Node(node_id)));
        self.nodes[node_id].wrapper = Some(item);
        item
    }

    pub fn new_folder(&mut self, folder: Folder) -> Id<SceneItem> {
        let folder_id = self.folders.insert(folder);
        let item = self
            .items
            .insert(SceneItem::new(ItemPayload::Folder(folder_id)));
        self.folders[folder_id].wrapper = Some(item);
        item
    }

    /// Stages an animation. Besides the document-tree item this creates the
    /// animation's view root, the parentless item under which the
    /// animation's markers and tracks hang (see [`animation_view`]).
    ///
    /// [`animation_view`]: Document::animation_view
    pub fn new_animation(&mut self, animation: Animation) -> Id<SceneItem> {
        let anim_id = self.animations.insert(animation);
        let item = self
            .items
            .insert(SceneItem::new(ItemPayload::Animation(anim_id)));
        let view = self
            .items
            .insert(SceneItem::new(ItemPayload::Animation(anim_id)));
        self.items[view].expanded = true;
        let animation = &mut self.animations[anim_id];
        animation.wrapper = Some(item);
        animation.view_root = Some(view);
        item
    }

    pub fn new_marker(&mut self, marker: Marker) -> Id<SceneItem> {
        let marker_id = self.markers.insert(marker);
        let item = self
            .items
            .insert(SceneItem::new(ItemPayload::Marker(marker_id)));
        self.markers[marker_id].wrapper = Some(item);
        item
    }

    pub fn new_track(&mut self, track: AnimationTrack) -> Id<SceneItem> {
        let track_id = self.tracks.insert(track);
        let item = self
            .items
            .insert(SceneItem::new(ItemPayload::Track(track_id)));
        self.tracks[track_id].wrapper = Some(item);
        item
    }

    pub fn new_animator(&mut self, animator: Animator) -> Id<SceneItem> {
        let animator_id = self.animators.insert(animator);
        let item = self
            .items
            .insert(SceneItem::new(ItemPayload::Animator(animator_id)));
        self.animators[animator_id].wrapper = Some(item);
        item
    }

    // ===== Read access =====

    /// # Panics
    ///
    /// All typed accessors panic when given an id issued by a different
    /// document.
    pub fn item(&self, id: Id<SceneItem>) -> &SceneItem {
        &self.items[id]
    }

    pub fn node(&self, id: Id<Node>) -> &Node {
        &self.nodes[id]
    }

    pub fn folder(&self, id: Id<Folder>) -> &Folder {
        &self.folders[id]
    }

    pub fn animation(&self, id: Id<Animation>) -> &Animation {
        &self.animations[id]
    }

    pub fn marker(&self, id: Id<Marker>) -> &Marker {
        &self.markers[id]
    }

    pub fn track(&self, id: Id<AnimationTrack>) -> &AnimationTrack {
        &self.tracks[id]
    }

    pub fn animator(&self, id: Id<Animator>) -> &Animator {
        &self.animators[id]
    }

    // ===== Wrapper lookup =====

    pub fn node_item(&self, id: Id<Node>) -> Id<SceneItem> {
        self.nodes[id].wrapper.expect("staged nodes have a wrapper")
    }

    pub fn folder_item(&self, id: Id<Folder>) -> Id<SceneItem> {
        self.folders[id]
            .wrapper
            .expect("staged folders have a wrapper")
    }

    pub fn animation_item(&self, id: Id<Animation>) -> Id<SceneItem> {
        self.animations[id]
            .wrapper
            .expect("staged animations have a wrapper")
    }

    pub fn marker_item(&self, id: Id<Marker>) -> Id<SceneItem> {
        self.markers[id]
            .wrapper
            .expect("staged markers have a wrapper")
    }

    pub fn track_item(&self, id: Id<AnimationTrack>) -> Id<SceneItem> {
        self.tracks[id]
            .wrapper
            .expect("staged tracks have a wrapper")
    }

    pub fn animator_item(&self, id: Id<Animator>) -> Id<SceneItem> {
        self.animators[id]
            .wrapper
            .expect("staged animators have a wrapper")
    }

    /// The root of the animation's marker/track view. Created together
    /// with the animation; markers and tracks link under it.
    pub fn animation_view(&self, id: Id<Animation>) -> Id<SceneItem> {
        self.animations[id]
            .view_root
            .expect("staged animations have a view root")
    }

    /// Whether `item` is the view root of its animation rather than the
    /// animation's row in the document tree.
    pub fn is_view_root(&self, item: Id<SceneItem>) -> bool {
        match self.items[item].payload {
            ItemPayload::Animation(anim) => self.animations[anim].view_root == Some(item),
            _ => false,
        }
    }

    /// Computed flat position of `item` in its parent's child list, or
    /// `None` for the root and for unlinked items.
    pub fn item_index(&self, item: Id<SceneItem>) -> Option<usize> {
        let parent = self.items[item].parent?;
        self.items[parent]
            .children
            .iter()
            .position(|&child| child == item)
    }

    // ===== Membership =====

    /// Whether an item is part of the document: reachable from the root,
    /// or hanging in the view of an animation that is itself reachable.
    pub fn is_attached(&self, item: Id<SceneItem>) -> bool {
        let mut current = item;
        loop {
            if current == self.root {
                return true;
            }
            match self.items[current].parent {
                Some(parent) => current = parent,
                None => {
                    if self.is_view_root(current) {
                        let ItemPayload::Animation(anim) = self.items[current].payload else {
                            return false;
                        };
                        return self.is_attached(self.animation_item(anim));
                    }
                    return false;
                }
            }
        }
    }

    /// Whether `maybe_ancestor` appears on `item`'s parent chain
    /// (inclusive of `item` itself).
    pub fn is_ancestor_or_self(&self, maybe_ancestor: Id<SceneItem>, item: Id<SceneItem>) -> bool {
        let mut current = Some(item);
        while let Some(id) = current {
            if id == maybe_ancestor {
                return true;
            }
            current = self.items[id].parent;
        }
        false
    }

    /// Resolves the sprite whose flat `nodes` list stores children linked
    /// under `parent`, walking up through folder and bone wrappers.
    /// `None` when the chain leaves node territory or hits a detached
    /// folder or bone.
    pub(crate) fn owner_sprite(&self, parent: Id<SceneItem>) -> Option<(Id<SceneItem>, Id<Node>)> {
        let mut current = parent;
        loop {
            match self.items[current].payload {
                ItemPayload::Node(node) if !self.nodes[node].is_bone() => {
                    return Some((current, node));
                }
                ItemPayload::Node(_) | ItemPayload::Folder(_) => {
                    current = self.items[current].parent?;
                }
                _ => return None,
            }
        }
    }

    /// Hands out the next document-unique bone number.
    pub(crate) fn issue_bone_index(&mut self) -> u32 {
        let index = self.next_bone_index;
        self.next_bone_index += 1;
        index
    }

    // ===== Diagnostics =====

    /// Verifies every structural invariant of the reachable tree and
    /// returns the list of violations, one per line. Used heavily by tests;
    /// cheap enough to call after every edit in a debugging session.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        let mut reachable_animations = Vec::new();
        self.check_item(self.root, None, &mut reachable_animations, &mut problems);

        for &anim in &reachable_animations {
            let view = self.animation_view(anim);
            self.check_item(view, None, &mut Vec::new(), &mut problems);
            self.check_animation_view(anim, view, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("\n"))
        }
    }

    fn check_item(
        &self,
        item: Id<SceneItem>,
        parent: Option<Id<SceneItem>>,
        animations: &mut Vec<Id<Animation>>,
        problems: &mut Vec<String>,
    ) {
        let data = &self.items[item];
        if data.parent != parent {
            problems.push(format!(
                "{item:?}: parent is {:?}, expected {parent:?}",
                data.parent
            ));
        }

        let mut last_rank = 0;
        for &child in &data.children {
            let rank = self.items[child].kind().rank();
            if rank < last_rank {
                problems.push(format!(
                    "{item:?}: child {child:?} breaks kind segmentation"
                ));
            }
            last_rank = rank;
            self.check_item(child, Some(item), animations, problems);
        }

        match data.payload {
            ItemPayload::Animation(anim) => animations.push(anim),
            ItemPayload::Node(node) => {
                self.check_node_segments(item, node, problems);
                if !self.nodes[node].is_bone() {
                    self.check_sprite(item, node, problems);
                }
            }
            _ => {}
        }
    }

    /// Checks a node's animation and animator lists against the matching
    /// child segments of its wrapper. Holds for sprites and bones alike.
    fn check_node_segments(&self, item: Id<SceneItem>, node: Id<Node>, problems: &mut Vec<String>) {
        let data = &self.nodes[node];
        let animations: Vec<_> = data
            .animations
            .iter()
            .map(|&a| self.animation_item(a))
            .collect();
        let animators: Vec<_> = data
            .animators
            .iter()
            .map(|&a| self.animator_item(a))
            .collect();
        let children = &self.items[item].children;
        let wrapped: Vec<_> = children
            .iter()
            .copied()
            .filter(|&c| self.items[c].kind() == ItemKind::Animation)
            .collect();
        if wrapped != animations {
            problems.push(format!("{node:?}: animation segment does not match"));
        }
        let wrapped: Vec<_> = children
            .iter()
            .copied()
            .filter(|&c| self.items[c].kind() == ItemKind::Animator)
            .collect();
        if wrapped != animators {
            problems.push(format!("{node:?}: animator segment does not match"));
        }
    }

    /// Checks a sprite's flat lists against its wrapper subtree: the
    /// `nodes` list must be the pre-order flattening of the node/folder
    /// forest, folder descriptors must carry the matching index and direct
    /// child count, and bone numbering must be consistent.
    fn check_sprite(&self, item: Id<SceneItem>, node: Id<Node>, problems: &mut Vec<String>) {
        let mut nodes = Vec::new();
        let mut folders = Vec::new();
        self.collect_forest(item, 0, &mut nodes, &mut folders, problems);

        let data = &self.nodes[node];
        if data.nodes != nodes {
            problems.push(format!(
                "{node:?}: nodes list {:?} does not match tree pre-order {nodes:?}",
                data.nodes
            ));
        }
        if data.folders != folders {
            problems.push(format!(
                "{node:?}: folders list {:?} does not match tree pre-order {folders:?}",
                data.folders
            ));
        }
    }

    fn collect_forest(
        &self,
        item: Id<SceneItem>,
        enclosing_bone: u32,
        nodes: &mut Vec<Id<Node>>,
        folders: &mut Vec<Id<Folder>>,
        problems: &mut Vec<String>,
    ) {
        for &child in &self.items[item].children {
            match self.items[child].payload {
                ItemPayload::Node(id) => {
                    nodes.push(id);
                    let data = &self.nodes[id];
                    if data.is_bone() {
                        if data.bone_index == 0 {
                            problems.push(format!("{id:?}: linked bone has no bone index"));
                        }
                        if data.base_index != enclosing_bone {
                            problems.push(format!(
                                "{id:?}: base index {} but enclosing bone is {enclosing_bone}",
                                data.base_index
                            ));
                        }
                        self.collect_forest(child, data.bone_index, nodes, folders, problems);
                    }
                    // A sprite child owns its own lists; do not descend.
                }
                ItemPayload::Folder(id) => {
                    let data = &self.folders[id];
                    if data.index != nodes.len() {
                        problems.push(format!(
                            "{id:?}: folder index {} but {} nodes precede it",
                            data.index,
                            nodes.len()
                        ));
                    }
                    let direct = self.items[child].children.len();
                    if data.item_count != direct {
                        problems.push(format!(
                            "{id:?}: item count {} but folder has {direct} direct children",
                            data.item_count
                        ));
                    }
                    folders.push(id);
                    self.collect_forest(child, enclosing_bone, nodes, folders, problems);
                }
                _ => {}
            }
        }
    }

    fn check_animation_view(
        &self,
        anim: Id<Animation>,
        view: Id<SceneItem>,
        problems: &mut Vec<String>,
    ) {
        let data = &self.animations[anim];
        let children = &self.items[view].children;

        let markers: Vec<_> = data.markers.iter().map(|&m| self.marker_item(m)).collect();
        let wrapped: Vec<_> = children
            .iter()
            .copied()
            .filter(|&c| self.items[c].kind() == ItemKind::Marker)
            .collect();
        if wrapped != markers {
            problems.push(format!("{anim:?}: marker segment does not match"));
        }

        let tracks: Vec<_> = data.tracks.iter().map(|&t| self.track_item(t)).collect();
        let wrapped: Vec<_> = children
            .iter()
            .copied()
            .filter(|&c| self.items[c].kind() == ItemKind::Track)
            .collect();
        if wrapped != tracks {
            problems.push(format!("{anim:?}: track segment does not match"));
        }

        let mut last_frame = None;
        for &marker in &data.markers {
            let frame = self.markers[marker].frame;
            if let Some(last) = last_frame
                && frame <= last
            {
                problems.push(format!("{anim:?}: markers out of frame order"));
            }
            last_frame = Some(frame);
        }
    }

    /// Renders the reachable document as an indented text tree, one line
    /// per item, followed by each reachable animation's marker/track view.
    /// The output is deterministic, which makes it handy for diffing two
    /// document states.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let mut animations = Vec::new();
        self.describe_item(self.root, 0, &mut animations, &mut out);
        for anim in animations {
            let data = &self.animations[anim];
            out.push_str(&format!("=== view '{}' ===\n", data.id));
            let view = self.animation_view(anim);
            for &child in &self.items[view].children {
                self.describe_item(child, 1, &mut Vec::new(), &mut out);
            }
        }
        out
    }

    fn describe_item(
        &self,
        item: Id<SceneItem>,
        depth: usize,
        animations: &mut Vec<Id<Animation>>,
        out: &mut String,
    ) {
        let pad = "  ".repeat(depth);
        let data = &self.items[item];
        let open = if data.expanded { " [open]" } else { "" };
        match data.payload {
            ItemPayload::Node(id) => {
                let node = &self.nodes[id];
                let mut line = format!(
                    "{pad}node '{}' pos=({}, {}) rot={} scale=({}, {}) color=[{}, {}, {}, {}] visible={}",
                    node.name,
                    node.position.x,
                    node.position.y,
                    node.rotation,
                    node.scale.x,
                    node.scale.y,
                    node.color[0],
                    node.color[1],
                    node.color[2],
                    node.color[3],
                    node.visible,
                );
                if node.kind == NodeKind::Bone {
                    line.push_str(&format!(" bone={} base={}", node.bone_index, node.base_index));
                }
                if !node.tags.is_empty() {
                    let tags: Vec<_> = node.tags.iter().map(String::as_str).collect();
                    line.push_str(&format!(" tags=[{}]", tags.join(", ")));
                }
                if !node.attrs.is_empty() {
                    let attrs: Vec<_> = node
                        .attrs
                        .iter()
                        .map(|(key, value)| format!("{key}={value:?}"))
                        .collect();
                    line.push_str(&format!(" attrs=[{}]", attrs.join(", ")));
                }
                out.push_str(&format!("{line}{open}\n"));
            }
            ItemPayload::Folder(id) => {
                let folder = &self.folders[id];
                out.push_str(&format!(
                    "{pad}folder '{}' index={} count={}{open}\n",
                    folder.name, folder.index, folder.item_count
                ));
            }
            ItemPayload::Animation(id) => {
                let anim = &self.animations[id];
                out.push_str(&format!(
                    "{pad}animation '{}' length={} looped={}{open}\n",
                    anim.id, anim.length, anim.looped
                ));
                animations.push(id);
            }
            ItemPayload::Animator(id) => {
                let animator = &self.animators[id];
                let keys: Vec<_> = animator
                    .keys
                    .iter()
                    .map(|key| format!("{}:{:?}/{:?}", key.frame, key.value, key.easing))
                    .collect();
                out.push_str(&format!(
                    "{pad}animator {} @{} keys=[{}]{open}\n",
                    animator.target.name(),
                    animator.animation_id,
                    keys.join(", ")
                ));
            }
            ItemPayload::Marker(id) => {
                let marker = &self.markers[id];
                out.push_str(&format!(
                    "{pad}marker '{}' frame={} action={:?}{open}\n",
                    marker.label, marker.frame, marker.action
                ));
            }
            ItemPayload::Track(id) => {
                let track = &self.tracks[id];
                out.push_str(&format!(
                    "{pad}track '{}' muted={}{open}\n",
                    track.name, track.muted
                ));
            }
        }
        for &child in &data.children {
            self.describe_item(child, depth + 1, animations, out);
        }
    }

    /// Finds an animation with the given string id among a node's own
    /// animations.
    pub fn find_animation(&self, node: Id<Node>, id: &str) -> Option<Id<Animation>> {
        self.nodes[node]
            .animations
            .iter()
            .copied()
            .find(|&anim| self.animations[anim].id == id)
    }

    /// Finds the node's zero-pose animation, if it has one.
    pub fn find_zero_pose(&self, node: Id<Node>) -> Option<Id<Animation>> {
        self.find_animation(node, ZERO_POSE_ID)
    }

    /// Finds an animator on `node` for the given property within the given
    /// animation.
    pub fn find_animator(
        &self,
        node: Id<Node>,
        target: crate::model::AnimatedProperty,
        animation_id: &str,
    ) -> Option<Id<Animator>> {
        self.nodes[node].animators.iter().copied().find(|&a| {
            let animator = &self.animators[a];
            animator.target == target && animator.animation_id == animation_id
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
