pub mod error;
pub mod events;
pub mod track_list;

pub use error::ListError;
pub use events::{Publisher, Subscription, TrackListEvent};
pub use track_list::TrackList;
