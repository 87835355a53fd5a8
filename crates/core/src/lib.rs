pub mod attachments;
pub mod channel;
pub mod error;
pub mod ids;
pub mod track;

pub use attachments::{AttachmentOwner, Attachments, ChannelAttachment};
pub use channel::{Channel, ChannelRef};
pub use error::CoreError;
pub use ids::*;
pub use track::{DEFAULT_TRACK_HEIGHT, DuplicateOptions, Track};
