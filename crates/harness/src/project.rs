use shadowtracks_core::{SequentialResolver, Track, TrackId};
use shadowtracks_engine::{EngineError, Project, ProjectConfig, Updater};
use shadowtracks_list::{ListError, TrackList};

use crate::events::EventLog;

/// Observable state of a list: order, identities, names and a content
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
    pub ids: Vec<TrackId>,
    pub names: Vec<String>,
    pub fingerprint: shadowtracks_core::Fingerprint,
}

impl ListSnapshot {
    pub fn of(tracks: &TrackList) -> Result<Self, ListError> {
        Ok(Self {
            ids: tracks.ids(),
            names: tracks.iter().map(|t| t.name().to_string()).collect(),
            fingerprint: tracks.fingerprint()?,
        })
    }
}

/// A project with deterministic identities and helpers for building
/// pending-edit scenarios.
pub struct TestProject {
    pub project: Project,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    pub fn new() -> Self {
        let config = ProjectConfig {
            name: "test".to_string(),
            ..ProjectConfig::default()
        }
        .with_resolver(SequentialResolver::new());
        Self {
            project: Project::new(config),
        }
    }

    /// A project holding one committed mono track per name.
    pub fn with_tracks(names: &[&str]) -> (Self, Vec<TrackId>) {
        let mut test = Self::new();
        let ids = names.iter().map(|name| test.add_track(name, 1)).collect();
        (test, ids)
    }

    pub fn add_track(&mut self, name: &str, channels: usize) -> TrackId {
        let track = self.project.new_track(name, channels);
        self.project.add_track(track)
    }

    pub fn tracks(&self) -> &TrackList {
        self.project.tracks()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.project.tracks().find_by_id(id)
    }

    pub fn names(&self) -> Vec<String> {
        self.tracks().iter().map(|t| t.name().to_string()).collect()
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks().ids()
    }

    pub fn snapshot(&self) -> Result<ListSnapshot, ListError> {
        ListSnapshot::of(self.tracks())
    }

    /// Log of events seen directly on the list.
    pub fn list_events(&self) -> EventLog {
        EventLog::attach(|f| self.project.tracks().subscribe(f))
    }

    /// Log of events as passed on by the pending layer.
    pub fn pending_events(&self) -> EventLog {
        EventLog::attach(|f| self.project.subscribe(f))
    }

    /// Add an unassigned track as a pending addition.
    pub fn add_pending(&mut self, name: &str) {
        let track = self.project.new_track(name, 1);
        self.project.register_pending_new_track(track);
    }

    /// Shadow `id` with an updater that keeps the original's mixer state.
    pub fn begin_recording(&mut self, id: TrackId) -> Result<(), EngineError> {
        self.project.register_pending_changed_track(crate::copy_mixer_state(), id)?;
        Ok(())
    }

    /// Append samples to every channel of the shadow of `id`.
    pub fn record(&mut self, id: TrackId, samples: &[f32]) -> Result<(), EngineError> {
        let mut shadow = self
            .project
            .pending_track_mut(id)
            .ok_or(EngineError::TrackNotFound(id))?;
        for channel in shadow.channels_mut() {
            channel.append(samples);
        }
        Ok(())
    }

    pub fn change(&mut self, id: TrackId, updater: Updater) -> Result<(), EngineError> {
        self.project.register_pending_changed_track(updater, id)?;
        Ok(())
    }

    /// Edit a committed track in place, outside any pending change.
    pub fn edit_original(&mut self, id: TrackId, edit: impl FnOnce(&mut Track)) -> Result<(), EngineError> {
        let track = self
            .project
            .tracks_mut()
            .track_mut(id)
            .ok_or(EngineError::TrackNotFound(id))?;
        edit(track);
        self.project.tracks().notify_data_change(id)?;
        Ok(())
    }

    pub fn delete(&mut self, id: TrackId) -> Result<Track, EngineError> {
        Ok(self.project.tracks_mut().remove(id)?)
    }

    /// Samples of channel 0 of the committed track `id`.
    pub fn samples(&self, id: TrackId) -> Vec<f32> {
        self.track(id)
            .and_then(|t| t.channel(0))
            .map(|c| c.samples().to_vec())
            .unwrap_or_default()
    }
}
