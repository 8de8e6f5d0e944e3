//! Marker and track edits on an animation's timeline view.
//!
//! Markers live twice: as ids in the animation's frame-ordered marker
//! list and as wrapper items under the animation's view root. The
//! composites here keep both in lockstep inside one transaction.
//! [`EditContext::set_marker`] follows replace-on-frame semantics: at most
//! one marker per frame, and setting a frame that already has one swaps
//! the whole marker out.

use crate::context::EditContext;
use crate::document::index::flat_from_kind_index;
use crate::document::{ItemKind, ItemPayload, SceneItem};
use crate::error::{DocumentError, DocumentResult};
use crate::model::{Animation, AnimationTrack, Marker};
use crate::operations::link::{AttachItem, DetachItem};
use crate::operations::list::{AnimationMarkers, SetListElement};
use crate::store::Id;

impl EditContext<'_> {
    /// Places `marker` on the animation's timeline, keeping the marker
    /// list sorted by frame. A marker already sitting on the frame is
    /// replaced wholesale; otherwise the marker is inserted at its sorted
    /// position. Either way this is one history entry.
    pub fn set_marker(&mut self, animation: Id<Animation>, marker: Marker) -> DocumentResult {
        let doc = &*self.document;
        if !doc.is_attached(doc.animation_item(animation)) {
            return Err(DocumentError::InvalidState(
                "animation is not part of the document".into(),
            ));
        }
        let frame = marker.frame;
        let view = doc.animation_view(animation);
        let markers = doc.animation(animation).markers();
        let existing = markers
            .iter()
            .position(|&m| doc.marker(m).frame == frame);

        match existing {
            Some(local) => {
                let old_item = doc.marker_item(markers[local]);
                let flat = flat_from_kind_index(doc, view, ItemKind::Marker, local);
                self.transaction("Set marker", move |ctx| {
                    let new_item = ctx.document.new_marker(marker);
                    let ItemPayload::Marker(new_id) = ctx.document.item(new_item).payload()
                    else {
                        unreachable!("staged markers wrap a marker");
                    };
                    // Same slot in both structures: list entry and wrapper.
                    ctx.perform(SetListElement::boxed(
                        AnimationMarkers(animation),
                        local,
                        new_id,
                    ))?;
                    ctx.perform(DetachItem::boxed(old_item))?;
                    ctx.perform(AttachItem::boxed(view, flat, new_item))
                })
            }
            None => {
                let local = markers
                    .iter()
                    .position(|&m| doc.marker(m).frame > frame)
                    .unwrap_or(markers.len());
                let flat = flat_from_kind_index(doc, view, ItemKind::Marker, local);
                self.transaction("Set marker", move |ctx| {
                    let item = ctx.document.new_marker(marker);
                    ctx.link_scene_item_at(view, flat, item)
                })
            }
        }
    }

    /// Removes the marker at `frame` from the animation's timeline.
    pub fn remove_marker(&mut self, animation: Id<Animation>, frame: u32) -> DocumentResult {
        let doc = &*self.document;
        let Some(&marker) = doc
            .animation(animation)
            .markers()
            .iter()
            .find(|&&m| doc.marker(m).frame == frame)
        else {
            return Err(DocumentError::InvalidState(format!(
                "no marker at frame {frame}"
            )));
        };
        let item = doc.marker_item(marker);
        self.transaction("Remove marker", |ctx| ctx.unlink_scene_item(item))
    }

    /// Stages a track and links it at the end of the animation's track
    /// list. Returns the track's wrapper item.
    pub fn add_track(
        &mut self,
        animation: Id<Animation>,
        track: AnimationTrack,
    ) -> DocumentResult<Id<SceneItem>> {
        let view = self.document.animation_view(animation);
        let item = self.document.new_track(track);
        self.transaction("Add track", |ctx| {
            ctx.link_scene_item(view, usize::MAX, item)?;
            Ok(item)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::history::DocumentHistory;
    use crate::model::MarkerAction;

    fn setup() -> (Document, DocumentHistory, Id<Animation>) {
        let mut doc = Document::new();
        let mut history = DocumentHistory::default();
        {
            let mut ctx = EditContext::new(&mut doc, &mut history);
            let root = ctx.document.root();
            let walk = ctx
                .document
                .new_animation(Animation::new("walk").with_length(30));
            ctx.link_scene_item(root, 0, walk).unwrap();
        }
        let walk = doc.find_animation(doc.root_node(), "walk").unwrap();
        (doc, history, walk)
    }

    fn frames(doc: &Document, animation: Id<Animation>) -> Vec<u32> {
        doc.animation(animation)
            .markers()
            .iter()
            .map(|&m| doc.marker(m).frame)
            .collect()
    }

    #[test]
    fn markers_insert_sorted_regardless_of_edit_order() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_marker(walk, Marker::new("end", 9)).unwrap();
        ctx.set_marker(walk, Marker::new("start", 3)).unwrap();
        ctx.set_marker(walk, Marker::new("mid", 6)).unwrap();

        assert_eq!(frames(ctx.document, walk), vec![3, 6, 9]);
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn setting_an_occupied_frame_replaces_the_marker() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_marker(walk, Marker::new("hit", 4)).unwrap();
        ctx.set_marker(
            walk,
            Marker::new("hit hard", 4).with_action(MarkerAction::Event("shake".into())),
        )
        .unwrap();

        let markers = ctx.document.animation(walk).markers();
        assert_eq!(markers.len(), 1);
        let marker = ctx.document.marker(markers[0]);
        assert_eq!(marker.label, "hit hard");
        assert_eq!(marker.action, MarkerAction::Event("shake".into()));
        ctx.document.check_consistency().unwrap();

        // Undo swaps the original marker back in, wrapper and all.
        ctx.undo().unwrap();
        let markers = ctx.document.animation(walk).markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(ctx.document.marker(markers[0]).label, "hit");
        ctx.document.check_consistency().unwrap();
    }

    #[test]
    fn remove_marker_round_trips_through_history() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.set_marker(walk, Marker::new("a", 2)).unwrap();
        ctx.set_marker(walk, Marker::new("b", 8)).unwrap();
        let before = ctx.document.describe();

        ctx.remove_marker(walk, 2).unwrap();
        assert_eq!(frames(ctx.document, walk), vec![8]);
        ctx.document.check_consistency().unwrap();

        ctx.undo().unwrap();
        assert_eq!(ctx.document.describe(), before);
    }

    #[test]
    fn removing_a_missing_marker_is_an_error() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);
        assert!(matches!(
            ctx.remove_marker(walk, 5),
            Err(DocumentError::InvalidState(_))
        ));
    }

    #[test]
    fn markers_need_an_attached_animation() {
        let mut doc = Document::new();
        let mut history = DocumentHistory::default();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        let staged = ctx.document.new_animation(Animation::new("loose"));
        let ItemPayload::Animation(anim) = ctx.document.item(staged).payload() else {
            panic!("expected an animation item");
        };
        assert!(matches!(
            ctx.set_marker(anim, Marker::new("hit", 1)),
            Err(DocumentError::InvalidState(_))
        ));
    }

    #[test]
    fn tracks_append_in_order() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        ctx.add_track(walk, AnimationTrack::new("sound")).unwrap();
        ctx.add_track(walk, AnimationTrack::new("events").with_muted(true))
            .unwrap();

        let tracks = ctx.document.animation(walk).tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(ctx.document.track(tracks[0]).name, "sound");
        assert!(ctx.document.track(tracks[1]).muted);
        ctx.document.check_consistency().unwrap();

        ctx.undo().unwrap();
        assert_eq!(ctx.document.animation(walk).tracks().len(), 1);
    }

    #[test]
    fn tracks_follow_markers_in_the_view() {
        let (mut doc, mut history, walk) = setup();
        let mut ctx = EditContext::new(&mut doc, &mut history);

        let track = ctx.add_track(walk, AnimationTrack::new("sound")).unwrap();
        ctx.set_marker(walk, Marker::new("hit", 4)).unwrap();

        let view = ctx.document.animation_view(walk);
        let children = ctx.document.item(view).children();
        assert_eq!(children.len(), 2);
        // Markers rank before tracks even though the track came first.
        assert_eq!(children[1], track);
        ctx.document.check_consistency().unwrap();
    }
}
