use std::fmt;

use shadowtracks_core::{Fingerprint, IdentityResolver, ListId, Track, TrackId, UuidResolver};

use crate::error::ListError;
use crate::events::{Publisher, Subscription, TrackListEvent};

/// The authoritative, ordered, owning collection of tracks.
///
/// Every structural mutation notifies subscribers synchronously before
/// returning.
pub struct TrackList {
    id: ListId,
    tracks: Vec<Track>,
    resolver: Box<dyn IdentityResolver>,
    publisher: Publisher,
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackList")
            .field("id", &self.id)
            .field("tracks", &self.tracks)
            .field("listeners", &self.publisher.listener_count())
            .finish()
    }
}

impl TrackList {
    pub fn new() -> Self {
        Self::with_resolver(UuidResolver)
    }

    pub fn with_resolver(resolver: impl IdentityResolver + 'static) -> Self {
        Self {
            id: ListId::new(),
            tracks: Vec::new(),
            resolver: Box::new(resolver),
            publisher: Publisher::new(),
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn subscribe(
        &self,
        listener: impl FnMut(&TrackList, &TrackListEvent) + 'static,
    ) -> Subscription {
        self.publisher.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.publisher.listener_count()
    }

    fn publish(&self, event: TrackListEvent) {
        self.publisher.publish(self, &event);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Position of the first track with `id`. The unassigned identity
    /// never matches.
    pub fn position(&self, id: TrackId) -> Option<usize> {
        if id.is_unassigned() {
            return None;
        }
        self.tracks.iter().position(|t| t.id() == id)
    }

    pub fn find_by_id(&self, id: TrackId) -> Option<&Track> {
        self.position(id).map(|index| &self.tracks[index])
    }

    /// Edit a track in place without notifying anyone; follow up with
    /// [`TrackList::notify_data_change`] when listeners should know.
    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        let index = self.position(id)?;
        self.tracks.get_mut(index)
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(Track::id).collect()
    }

    pub fn has_pending_additions(&self) -> bool {
        self.tracks.iter().any(Track::is_pending_addition)
    }

    /// Digest of the serialized tracks: order, identities and content.
    pub fn fingerprint(&self) -> Result<Fingerprint, ListError> {
        let mut bytes = Vec::new();
        for track in &self.tracks {
            bytes.extend(track.to_msgpack()?);
        }
        Ok(Fingerprint::of(&bytes))
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    fn assign_id(&mut self, track: &mut Track) {
        if track.is_pending_addition() {
            track.set_id(self.resolver.next_id());
        }
    }

    /// Append a track, giving it an identity if it has none.
    pub fn add(&mut self, mut track: Track) -> TrackId {
        self.assign_id(&mut track);
        let track_id = track.id();
        let index = self.tracks.len();
        self.tracks.push(track);
        self.publish(TrackListEvent::Addition { track_id, index });
        track_id
    }

    /// Append tracks in order. With `assign_ids` false, unassigned tracks
    /// stay unassigned.
    pub fn append(&mut self, tracks: impl IntoIterator<Item = Track>, assign_ids: bool) {
        for mut track in tracks {
            if assign_ids {
                self.assign_id(&mut track);
            }
            let track_id = track.id();
            let index = self.tracks.len();
            self.tracks.push(track);
            self.publish(TrackListEvent::Addition { track_id, index });
        }
    }

    /// Insert before the track at `index`; `index == len()` appends.
    pub fn insert(
        &mut self,
        index: usize,
        mut track: Track,
        assign_id: bool,
    ) -> Result<TrackId, ListError> {
        if index > self.tracks.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        if assign_id {
            self.assign_id(&mut track);
        }
        let track_id = track.id();
        self.tracks.insert(index, track);
        self.publish(TrackListEvent::Addition { track_id, index });
        Ok(track_id)
    }

    pub fn remove(&mut self, id: TrackId) -> Result<Track, ListError> {
        let index = self.position(id).ok_or(ListError::TrackNotFound(id))?;
        self.remove_at(index)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Track, ListError> {
        if index >= self.tracks.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        let track = self.tracks.remove(index);
        self.publish(TrackListEvent::Deletion {
            track_id: track.id(),
            index,
        });
        Ok(track)
    }

    /// Put `replacement` where the track with `id` is, under the same
    /// identity. Returns the replaced track.
    pub fn replace_one(&mut self, id: TrackId, mut replacement: Track) -> Result<Track, ListError> {
        let index = self.position(id).ok_or(ListError::TrackNotFound(id))?;
        replacement.set_id(id);
        let replaced = std::mem::replace(&mut self.tracks[index], replacement);
        self.publish(TrackListEvent::Addition { track_id: id, index });
        Ok(replaced)
    }

    /// Reorder so that the track formerly at `order[i]` ends up at `i`.
    pub fn permute(&mut self, order: &[usize]) -> Result<(), ListError> {
        let len = self.tracks.len();
        if order.len() != len {
            return Err(ListError::InvalidPermutation(format!(
                "expected {len} positions, got {}",
                order.len()
            )));
        }
        let mut seen = vec![false; len];
        for &from in order {
            if from >= len || seen[from] {
                return Err(ListError::InvalidPermutation(format!(
                    "position {from} is out of range or repeated"
                )));
            }
            seen[from] = true;
        }

        let mut slots: Vec<Option<Track>> = std::mem::take(&mut self.tracks)
            .into_iter()
            .map(Some)
            .collect();
        self.tracks = order.iter().filter_map(|&from| slots[from].take()).collect();
        self.publish(TrackListEvent::Permuted);
        Ok(())
    }

    /// Swap with the previous track. Returns false at the top.
    pub fn move_up(&mut self, id: TrackId) -> Result<bool, ListError> {
        let index = self.position(id).ok_or(ListError::TrackNotFound(id))?;
        if index == 0 {
            return Ok(false);
        }
        self.tracks.swap(index - 1, index);
        self.publish(TrackListEvent::Permuted);
        Ok(true)
    }

    /// Swap with the next track. Returns false at the bottom.
    pub fn move_down(&mut self, id: TrackId) -> Result<bool, ListError> {
        let index = self.position(id).ok_or(ListError::TrackNotFound(id))?;
        if index + 1 >= self.tracks.len() {
            return Ok(false);
        }
        self.tracks.swap(index, index + 1);
        self.publish(TrackListEvent::Permuted);
        Ok(true)
    }

    // ========================================================================
    // Non-structural notification
    // ========================================================================

    pub fn set_height(&mut self, id: TrackId, height: u32) -> Result<(), ListError> {
        let track = self.track_mut(id).ok_or(ListError::TrackNotFound(id))?;
        track.set_height(height);
        self.publish(TrackListEvent::Resizing { track_id: id });
        Ok(())
    }

    pub fn set_selected(&mut self, id: TrackId, selected: bool) -> Result<(), ListError> {
        let track = self.track_mut(id).ok_or(ListError::TrackNotFound(id))?;
        track.set_selected(selected);
        self.publish(TrackListEvent::SelectionChange { track_id: id });
        Ok(())
    }

    pub fn notify_data_change(&self, id: TrackId) -> Result<(), ListError> {
        if self.position(id).is_none() {
            return Err(ListError::TrackNotFound(id));
        }
        self.publish(TrackListEvent::TrackDataChange { track_id: id });
        Ok(())
    }
}
