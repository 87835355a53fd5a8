use shadowtracks_core::TrackId;
use shadowtracks_list::ListError;
use thiserror::Error;

/// Failure reported by an updater while folding state into a shadow.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UpdateError(pub String);

impl UpdateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("list error: {0}")]
    List(#[from] ListError),

    #[error("track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("track has no identity yet")]
    UnassignedTrack,

    #[error("channel {index} is not a group leader")]
    NotALeader { index: usize },

    #[error("updater for track {track_id} failed: {source}")]
    Update {
        track_id: TrackId,
        source: UpdateError,
    },
}
