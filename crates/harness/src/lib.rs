pub mod events;
pub mod fixtures;
pub mod project;

pub use events::EventLog;
pub use fixtures::{WaveformCache, copy_mixer_state, failing_updater};
pub use project::{ListSnapshot, TestProject};
