use shadowtracks_core::TrackId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("index {index} out of range for list of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("core error: {0}")]
    Core(#[from] shadowtracks_core::CoreError),
}
