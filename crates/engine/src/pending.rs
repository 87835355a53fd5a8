use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use shadowtracks_core::{Channel, ChannelRef, DuplicateOptions, ListId, Track, TrackId};
use shadowtracks_list::{Publisher, Subscription, TrackList, TrackListEvent};

use crate::error::{EngineError, UpdateError};

type UpdateFn = dyn FnMut(&mut Track, &Track) -> Result<(), UpdateError>;

/// Copies part of a live original's state into its shadow, so that edits
/// made to the original while the shadow is pending are not lost when the
/// shadow replaces it. May be empty.
#[derive(Default)]
pub struct Updater(Option<Box<UpdateFn>>);

impl Updater {
    pub fn new(f: impl FnMut(&mut Track, &Track) -> Result<(), UpdateError> + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn infallible(mut f: impl FnMut(&mut Track, &Track) + 'static) -> Self {
        Self::new(move |shadow, original| {
            f(shadow, original);
            Ok(())
        })
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    fn apply(&mut self, shadow: &mut Track, original: &Track) -> Result<(), UpdateError> {
        match &mut self.0 {
            Some(f) => f(shadow, original),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_empty() { "Updater(none)" } else { "Updater(..)" })
    }
}

/// Shadow tracks and their updaters, index-aligned.
#[derive(Default)]
struct PendingState {
    shadows: Vec<Track>,
    updaters: Vec<Updater>,
}

impl PendingState {
    fn position(&self, id: TrackId) -> Option<usize> {
        self.shadows.iter().position(|t| t.id() == id)
    }

    /// Run each updater against its original as found by `originals`.
    /// Shadows whose original is gone are left alone.
    fn update<'t>(
        &mut self,
        originals: impl Fn(TrackId) -> Option<&'t Track>,
    ) -> Result<(), EngineError> {
        debug_assert_eq!(self.shadows.len(), self.updaters.len());
        for (shadow, updater) in self.shadows.iter_mut().zip(self.updaters.iter_mut()) {
            if let Some(original) = originals(shadow.id()) {
                updater
                    .apply(shadow, original)
                    .map_err(|source| EngineError::Update {
                        track_id: shadow.id(),
                        source,
                    })?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.updaters.clear();
        self.shadows.clear();
    }
}

/// Pending state shared with the list subscription.
#[derive(Default)]
struct Shared {
    state: RefCell<PendingState>,
    /// Copies of the originals taken when a refresh could not run because
    /// a shadow was borrowed. Replayed as soon as the shadows are free.
    deferred: RefCell<Option<Vec<Track>>>,
}

impl Shared {
    /// Refresh every shadow from `tracks`, or defer the pass if a shadow is
    /// in use.
    fn refresh(&self, tracks: &TrackList, event: &TrackListEvent) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            log::debug!(
                "pending tracks in use, deferring refresh after {} event",
                event.as_str()
            );
            self.defer(tracks);
            return;
        };
        self.deferred.borrow_mut().take();
        if state.shadows.is_empty() {
            return;
        }
        if let Err(e) = state.update(|id| tracks.find_by_id(id)) {
            log::warn!("refresh after {} event failed: {e}", event.as_str());
        }
    }

    fn defer(&self, tracks: &TrackList) {
        let wanted: Option<Vec<TrackId>> = self
            .state
            .try_borrow()
            .ok()
            .map(|s| s.shadows.iter().map(Track::id).collect());
        if wanted.as_ref().is_some_and(Vec::is_empty) {
            return;
        }
        let originals = tracks
            .iter()
            .filter(|t| !t.is_pending_addition())
            .filter(|t| wanted.as_ref().is_none_or(|ids| ids.contains(&t.id())))
            .map(|t| t.duplicate(DuplicateOptions::new().shallow_copy_attachments()))
            .collect();
        *self.deferred.borrow_mut() = Some(originals);
    }

    /// Run a deferred refresh if one is waiting and no shadow is borrowed.
    fn catch_up(&self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        let Some(originals) = self.deferred.borrow_mut().take() else {
            return;
        };
        log::debug!("running deferred refresh of {} shadow(s)", state.shadows.len());
        if let Err(e) = state.update(|id| originals.iter().find(|t| t.id() == id)) {
            log::warn!("deferred refresh failed: {e}");
        }
    }

    /// Drop a deferred refresh that a full pass is about to supersede.
    fn discard_deferred(&self) {
        self.deferred.borrow_mut().take();
    }
}

/// Either the track a reader asked about or the shadow standing in for it.
pub enum TrackView<'a> {
    Original(&'a Track),
    Pending(Ref<'a, Track>),
}

impl TrackView<'_> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl Deref for TrackView<'_> {
    type Target = Track;

    fn deref(&self) -> &Track {
        match self {
            Self::Original(track) => track,
            Self::Pending(track) => track,
        }
    }
}

impl fmt::Debug for TrackView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.is_pending() { "Pending" } else { "Original" };
        f.debug_tuple(side).field(&self.id()).finish()
    }
}

/// A channel of a [`TrackView`].
#[derive(Debug)]
pub struct ChannelView<'a> {
    track: TrackView<'a>,
    index: usize,
}

impl<'a> ChannelView<'a> {
    pub fn group(&self) -> &Track {
        &self.track
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_pending(&self) -> bool {
        self.track.is_pending()
    }

    pub fn as_channel_ref(&self) -> ChannelRef<'_> {
        let group = self.group();
        group.channel_ref(self.index).unwrap_or_else(|| group.leader())
    }

    pub fn channel(&self) -> &Channel {
        self.as_channel_ref().channel()
    }

    pub fn into_track(self) -> TrackView<'a> {
        self.track
    }
}

/// Runs the rollback half of a commit on every exit path of the
/// fallible prefix.
struct ClearOnExit<'a> {
    shared: &'a Shared,
    tracks: &'a mut TrackList,
    additions: &'a mut Vec<Option<Track>>,
}

impl Drop for ClearOnExit<'_> {
    fn drop(&mut self) {
        clear_pending(self.shared, &mut *self.tracks, Some(&mut *self.additions));
    }
}

/// Put additions saved by [`clear_pending`] back among the surviving
/// tracks: each `None` stands for one survivor, in order. If survivors run
/// out, the remaining additions go at the end.
fn restore_additions(tracks: &mut TrackList, additions: Vec<Option<Track>>) {
    let mut cursor = 0;
    for saved in additions {
        match saved {
            Some(track) => {
                let index = cursor.min(tracks.len());
                match tracks.insert(index, track, true) {
                    Ok(id) => log::debug!("confirmed new track {id} at {index}"),
                    Err(e) => log::error!("could not restore pending addition: {e}"),
                }
                cursor = index + 1;
            }
            None => {
                if cursor >= tracks.len() {
                    log::error!("no surviving track at {cursor}; appending remaining additions");
                }
                cursor += 1;
            }
        }
    }
}

fn clear_pending(
    shared: &Shared,
    tracks: &mut TrackList,
    mut added: Option<&mut Vec<Option<Track>>>,
) {
    shared.state.borrow_mut().clear();
    shared.discard_deferred();

    if let Some(added) = added.as_deref_mut() {
        added.clear();
    }

    let mut index = 0;
    while index < tracks.len() {
        let is_addition = tracks.get(index).is_some_and(Track::is_pending_addition);
        if !is_addition {
            if let Some(added) = added.as_deref_mut() {
                added.push(None);
            }
            index += 1;
            continue;
        }
        match tracks.remove_at(index) {
            Ok(track) => {
                if let Some(added) = added.as_deref_mut() {
                    added.push(Some(track));
                }
            }
            Err(e) => {
                log::error!("could not remove pending addition at {index}: {e}");
                index += 1;
            }
        }
    }

    if let Some(added) = added {
        while matches!(added.last(), Some(None)) {
            added.pop();
        }
    }
}

/// Pending changes to one [`TrackList`]: shadow copies of changed tracks
/// and not-yet-confirmed additions, applied or discarded as a unit.
///
/// Readers choose which version they see through the `substitute_*`
/// lookups. Structural changes to the list refresh the shadows
/// immediately, and every list event is passed on to this object's own
/// subscribers afterwards.
pub struct PendingTracks {
    shared: Rc<Shared>,
    publisher: Publisher,
    list_id: ListId,
    _subscription: Subscription,
}

impl fmt::Debug for PendingTracks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTracks")
            .field("list_id", &self.list_id)
            .field("shadows", &self.pending_count())
            .finish()
    }
}

impl PendingTracks {
    /// Bind to `tracks` for the lifetime of the returned value.
    pub fn new(tracks: &TrackList) -> Self {
        let shared = Rc::new(Shared::default());
        let publisher = Publisher::new();
        let subscription = {
            let shared = Rc::clone(&shared);
            let downstream = publisher.clone();
            tracks.subscribe(move |list, event| {
                if event.is_structural() {
                    shared.refresh(list, event);
                } else {
                    shared.catch_up();
                }
                downstream.publish(list, event);
            })
        };
        Self {
            shared,
            publisher,
            list_id: tracks.id(),
            _subscription: subscription,
        }
    }

    pub fn list_id(&self) -> ListId {
        self.list_id
    }

    /// Receive every event of the bound list, after reconciliation.
    pub fn subscribe(
        &self,
        listener: impl FnMut(&TrackList, &TrackListEvent) + 'static,
    ) -> Subscription {
        self.publisher.subscribe(listener)
    }

    fn check_bound(&self, tracks: &TrackList) {
        assert_eq!(
            self.list_id,
            tracks.id(),
            "pending tracks used with a list they are not bound to"
        );
    }

    /// Number of shadow tracks.
    pub fn pending_count(&self) -> usize {
        self.shared.state.borrow().shadows.len()
    }

    /// Identities of the shadow tracks, in registration order.
    pub fn pending_ids(&self) -> Vec<TrackId> {
        self.shared.state.borrow().shadows.iter().map(Track::id).collect()
    }

    pub fn has_pending_tracks(&self, tracks: &TrackList) -> bool {
        self.check_bound(tracks);
        self.pending_count() > 0 || tracks.has_pending_additions()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Append `track` to the list as it is; its identity stays unassigned
    /// until the next commit.
    pub fn register_pending_new_track(&mut self, tracks: &mut TrackList, track: Track) {
        self.register_pending_new_tracks(tracks, vec![track]);
    }

    pub fn register_pending_new_tracks(&mut self, tracks: &mut TrackList, new_tracks: Vec<Track>) {
        self.check_bound(tracks);
        log::debug!("registering {} pending new track(s)", new_tracks.len());
        tracks.append(new_tracks, false);
    }

    /// Start a pending change of `source`, returning its shadow for editing.
    ///
    /// The shadow shares attachments with the source. `updater` runs
    /// whenever the list changes structurally and once more at commit.
    pub fn register_pending_changed_track(
        &mut self,
        updater: Updater,
        source: &Track,
    ) -> Result<RefMut<'_, Track>, EngineError> {
        if source.is_pending_addition() {
            return Err(EngineError::UnassignedTrack);
        }
        let shadow = source.duplicate(DuplicateOptions::new().shallow_copy_attachments());
        debug_assert_eq!(source.channel_count(), shadow.channel_count());
        log::debug!("registering pending change of track {}", source.id());

        self.shared.catch_up();
        let mut state = self.shared.state.borrow_mut();
        state.shadows.push(shadow);
        state.updaters.push(updater);
        let last = state.shadows.len() - 1;
        Ok(RefMut::map(state, |s| &mut s.shadows[last]))
    }

    /// As [`Self::register_pending_changed_track`], addressed through the
    /// group's leading channel.
    pub fn register_pending_changed_channel(
        &mut self,
        updater: Updater,
        leader: ChannelRef<'_>,
    ) -> Result<RefMut<'_, Track>, EngineError> {
        if !leader.is_leader() {
            return Err(EngineError::NotALeader {
                index: leader.index(),
            });
        }
        self.register_pending_changed_track(updater, leader.group())
    }

    pub fn pending_track(&self, id: TrackId) -> Option<Ref<'_, Track>> {
        self.shared.catch_up();
        Ref::filter_map(self.shared.state.borrow(), |s| s.shadows.iter().find(|t| t.id() == id)).ok()
    }

    pub fn pending_track_mut(&mut self, id: TrackId) -> Option<RefMut<'_, Track>> {
        self.shared.catch_up();
        RefMut::filter_map(self.shared.state.borrow_mut(), |s| {
            s.shadows.iter_mut().find(|t| t.id() == id)
        })
        .ok()
    }

    // ========================================================================
    // Substitution
    // ========================================================================

    /// The shadow of `track` if it has one, else `track` itself.
    pub fn substitute_pending_changed_track<'a>(&'a self, track: &'a Track) -> TrackView<'a> {
        self.substitute_pending_changed_channel(track.leader())
            .into_track()
    }

    /// The corresponding channel of the shadow of `channel`'s group if it
    /// has one, else `channel` itself.
    pub fn substitute_pending_changed_channel<'a>(
        &'a self,
        channel: ChannelRef<'a>,
    ) -> ChannelView<'a> {
        self.shared.catch_up();
        let state = self.shared.state.borrow();
        let Some(position) = state.position(channel.track_id()) else {
            return ChannelView {
                track: TrackView::Original(channel.group()),
                index: channel.index(),
            };
        };
        let count = state.shadows[position].channel_count();
        debug_assert!(channel.index() < count);
        let index = channel.index().min(count.saturating_sub(1));
        ChannelView {
            track: TrackView::Pending(Ref::map(state, |s| &s.shadows[position])),
            index,
        }
    }

    /// The live original of a shadowed `track`, else `track` itself.
    pub fn substitute_original_track<'a>(&self, tracks: &'a TrackList, track: &'a Track) -> &'a Track {
        self.substitute_original_channel(tracks, track.leader())
            .group()
    }

    /// The corresponding channel of the live original of a shadowed
    /// `channel`'s group, else `channel` itself.
    pub fn substitute_original_channel<'a>(
        &self,
        tracks: &'a TrackList,
        channel: ChannelRef<'a>,
    ) -> ChannelRef<'a> {
        self.check_bound(tracks);
        self.shared.catch_up();
        let id = channel.track_id();
        if self.shared.state.borrow().position(id).is_none() {
            return channel;
        }
        let Some(original) = tracks.find_by_id(id) else {
            return channel;
        };
        let count = original.channel_count();
        debug_assert!(channel.index() < count);
        original
            .channel_ref(channel.index().min(count.saturating_sub(1)))
            .unwrap_or(channel)
    }

    // ========================================================================
    // Reconciliation, rollback and commit
    // ========================================================================

    /// Run every updater against its live original now.
    pub fn update_pending_tracks(&mut self, tracks: &TrackList) -> Result<(), EngineError> {
        self.check_bound(tracks);
        self.shared.discard_deferred();
        self.shared
            .state
            .borrow_mut()
            .update(|id| tracks.find_by_id(id))
    }

    /// Discard all pending changes and remove all pending additions.
    ///
    /// If `added` is given it receives, in list order, the removed
    /// additions as `Some` and a `None` for each track that stayed, with
    /// trailing `None`s trimmed.
    pub fn clear_pending_tracks(
        &mut self,
        tracks: &mut TrackList,
        added: Option<&mut Vec<Option<Track>>>,
    ) {
        self.check_bound(tracks);
        log::debug!("clearing {} pending track(s)", self.pending_count());
        clear_pending(&self.shared, tracks, added);
    }

    /// Replace each original with its shadow and confirm pending additions.
    ///
    /// Returns whether any original was replaced or reinstated. If an
    /// updater fails, all pending state is discarded as by
    /// [`Self::clear_pending_tracks`] and the committed tracks are left
    /// unchanged.
    pub fn apply_pending_tracks(&mut self, tracks: &mut TrackList) -> Result<bool, EngineError> {
        self.check_bound(tracks);
        let mut additions = Vec::new();

        self.shared.discard_deferred();
        let updated = {
            let guard = ClearOnExit {
                shared: &self.shared,
                tracks: &mut *tracks,
                additions: &mut additions,
            };
            let live: &TrackList = &*guard.tracks;
            let folded = guard.shared.state.borrow_mut().update(|id| live.find_by_id(id));
            folded?;
            let mut state = guard.shared.state.borrow_mut();
            state.updaters.clear();
            std::mem::take(&mut state.shadows)
        };

        // Nothing below may fail.
        let mut changed = false;
        let mut reinstated = Vec::new();

        for shadow in &updated {
            shadow.reparent_all_attachments();
        }

        for shadow in updated {
            let id = shadow.id();
            if tracks.position(id).is_none() {
                // The original was deleted meanwhile; keep the edits.
                reinstated.push(shadow);
                continue;
            }
            match tracks.replace_one(id, shadow) {
                Ok(_) => changed = true,
                Err(e) => log::error!("could not replace track {id}: {e}"),
            }
        }

        for track in reinstated {
            log::debug!("reinstating deleted track {}", track.id());
            tracks.add(track);
            changed = true;
        }

        restore_additions(tracks, additions);

        log::debug!("applied pending tracks, changed: {changed}");
        Ok(changed)
    }
}
