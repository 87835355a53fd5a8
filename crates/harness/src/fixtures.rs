use std::any::Any;

use shadowtracks_core::{AttachmentOwner, ChannelAttachment, Track};
use shadowtracks_engine::{UpdateError, Updater};

/// Keep the mixer and naming state of the original while a shadow records
/// into its channels.
pub fn copy_mixer_state() -> Updater {
    Updater::infallible(|shadow, original| {
        shadow.set_name(original.name());
        shadow.set_gain(original.gain());
        shadow.set_pan(original.pan());
        shadow.set_muted(original.is_muted());
        shadow.set_solo(original.is_solo());
    })
}

/// Fails on every call.
pub fn failing_updater(message: &str) -> Updater {
    let message = message.to_string();
    Updater::new(move |_, _| Err(UpdateError::new(message.clone())))
}

/// Peak summary of a channel, as a waveform display would cache it.
#[derive(Debug, Default, Clone)]
pub struct WaveformCache {
    pub peaks: Vec<f32>,
    pub owner: Option<AttachmentOwner>,
    pub reparented: usize,
}

impl WaveformCache {
    pub const KEY: &'static str = "waveform";

    pub fn attach_to(track: &mut Track) {
        for channel in track.channels_mut() {
            let peaks = channel.samples().iter().map(|s| s.abs()).collect();
            channel.attachments_mut().insert(
                Self::KEY,
                WaveformCache {
                    peaks,
                    ..WaveformCache::default()
                },
            );
        }
    }

    pub fn read(track: &Track, channel: usize) -> Option<WaveformCache> {
        track
            .channel(channel)?
            .attachments()
            .with::<WaveformCache, _>(Self::KEY, |cache| cache.clone())
    }
}

impl ChannelAttachment for WaveformCache {
    fn duplicate(&self) -> Box<dyn ChannelAttachment> {
        Box::new(self.clone())
    }

    fn reparent(&mut self, owner: AttachmentOwner) {
        self.owner = Some(owner);
        self.reparented += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
