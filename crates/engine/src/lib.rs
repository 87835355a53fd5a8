pub mod error;
pub mod pending;

pub use error::{EngineError, UpdateError};
pub use pending::{ChannelView, PendingTracks, TrackView, Updater};

use std::cell::RefMut;
use std::fmt;

use shadowtracks_core::{DEFAULT_TRACK_HEIGHT, IdentityResolver, Track, TrackId, UuidResolver};
use shadowtracks_list::{Subscription, TrackList, TrackListEvent};

pub struct ProjectConfig {
    pub name: String,
    /// Display height given to tracks made by [`Project::new_track`].
    pub track_height: u32,
    pub resolver: Box<dyn IdentityResolver>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "untitled".to_string(),
            track_height: DEFAULT_TRACK_HEIGHT,
            resolver: Box::new(UuidResolver),
        }
    }
}

impl ProjectConfig {
    pub fn with_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }
}

impl fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("name", &self.name)
            .field("track_height", &self.track_height)
            .finish_non_exhaustive()
    }
}

/// A track list together with the pending changes bound to it.
pub struct Project {
    name: String,
    track_height: u32,
    // Declared before `tracks` so it unsubscribes before the list goes away.
    pending: PendingTracks,
    tracks: TrackList,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(ProjectConfig::default())
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("tracks", &self.tracks.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl Project {
    pub fn new(config: ProjectConfig) -> Self {
        let ProjectConfig {
            name,
            track_height,
            resolver,
        } = config;
        let tracks = TrackList::with_resolver(resolver);
        let pending = PendingTracks::new(&tracks);
        log::debug!("opened project {name:?}");
        Self {
            name,
            track_height,
            pending,
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracks(&self) -> &TrackList {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut TrackList {
        &mut self.tracks
    }

    pub fn pending(&self) -> &PendingTracks {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingTracks {
        &mut self.pending
    }

    /// Both halves at once, for calls that need the coordinator and its list.
    pub fn parts_mut(&mut self) -> (&mut PendingTracks, &mut TrackList) {
        (&mut self.pending, &mut self.tracks)
    }

    /// Listen to list events as passed on by the pending layer.
    pub fn subscribe(
        &self,
        listener: impl FnMut(&TrackList, &TrackListEvent) + 'static,
    ) -> Subscription {
        self.pending.subscribe(listener)
    }

    /// An unassigned track with the configured height.
    pub fn new_track(&self, name: impl Into<String>, channels: usize) -> Track {
        let mut track = Track::with_channels(name, channels);
        track.set_height(self.track_height);
        track
    }

    /// Add a track directly, outside any pending edit.
    pub fn add_track(&mut self, track: Track) -> TrackId {
        self.tracks.add(track)
    }

    pub fn register_pending_new_track(&mut self, track: Track) {
        self.pending.register_pending_new_track(&mut self.tracks, track);
    }

    pub fn register_pending_changed_track(
        &mut self,
        updater: Updater,
        id: TrackId,
    ) -> Result<RefMut<'_, Track>, EngineError> {
        let source = self
            .tracks
            .find_by_id(id)
            .ok_or(EngineError::TrackNotFound(id))?;
        self.pending.register_pending_changed_track(updater, source)
    }

    pub fn pending_track_mut(&mut self, id: TrackId) -> Option<RefMut<'_, Track>> {
        self.pending.pending_track_mut(id)
    }

    /// The version of a committed track that editing should see.
    pub fn editing_view(&self, id: TrackId) -> Option<TrackView<'_>> {
        let track = self.tracks.find_by_id(id)?;
        Some(self.pending.substitute_pending_changed_track(track))
    }

    pub fn has_pending_tracks(&self) -> bool {
        self.pending.has_pending_tracks(&self.tracks)
    }

    pub fn update_pending_tracks(&mut self) -> Result<(), EngineError> {
        self.pending.update_pending_tracks(&self.tracks)
    }

    pub fn apply_pending_tracks(&mut self) -> Result<bool, EngineError> {
        self.pending.apply_pending_tracks(&mut self.tracks)
    }

    pub fn clear_pending_tracks(&mut self, added: Option<&mut Vec<Option<Track>>>) {
        self.pending.clear_pending_tracks(&mut self.tracks, added);
    }
}

#[cfg(test)]
mod tests {
    use shadowtracks_core::SequentialResolver;

    use super::*;

    fn project() -> Project {
        Project::new(ProjectConfig::default().with_resolver(SequentialResolver::new()))
    }

    #[test]
    fn new_track_uses_configured_height() {
        let config = ProjectConfig {
            track_height: 42,
            ..ProjectConfig::default()
        };
        let project = Project::new(config);
        let track = project.new_track("t", 2);
        assert_eq!(track.height(), 42);
        assert_eq!(track.channel_count(), 2);
        assert!(track.is_pending_addition());
    }

    #[test]
    fn editing_view_prefers_shadow() -> Result<(), EngineError> {
        let mut project = project();
        let id = project.add_track(Track::new("lead"));
        assert!(!project.editing_view(id).is_some_and(|v| v.is_pending()));

        project
            .register_pending_changed_track(Updater::none(), id)?
            .set_name("lead (take 2)");
        let view = project.editing_view(id);
        assert!(view.as_ref().is_some_and(|v| v.is_pending()));
        assert_eq!(view.as_ref().map(|v| v.name()), Some("lead (take 2)"));
        Ok(())
    }

    #[test]
    fn unknown_track_is_reported() {
        let mut project = project();
        let missing = TrackId::new();
        let result = project.register_pending_changed_track(Updater::none(), missing);
        assert!(matches!(result, Err(EngineError::TrackNotFound(id)) if id == missing));
    }

    #[test]
    fn pending_additions_count_as_pending() -> Result<(), EngineError> {
        let mut project = project();
        assert!(!project.has_pending_tracks());
        let track = project.new_track("new", 1);
        project.register_pending_new_track(track);
        assert!(project.has_pending_tracks());
        assert!(!project.apply_pending_tracks()?);
        assert!(!project.has_pending_tracks());
        assert_eq!(project.tracks().len(), 1);
        Ok(())
    }
}
