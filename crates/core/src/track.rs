use serde::Serialize;

use crate::attachments::AttachmentOwner;
use crate::channel::{Channel, ChannelRef};
use crate::error::CoreError;
use crate::ids::TrackId;

pub const DEFAULT_TRACK_HEIGHT: u32 = 150;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateOptions {
    shallow_copy_attachments: bool,
}

impl DuplicateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share attachment objects with the source instead of copying them.
    pub fn shallow_copy_attachments(mut self) -> Self {
        self.shallow_copy_attachments = true;
        self
    }

    pub fn shares_attachments(&self) -> bool {
        self.shallow_copy_attachments
    }
}

/// A group of one or more channels with shared mixer and view state.
#[derive(Debug, Serialize)]
pub struct Track {
    id: TrackId,
    name: String,
    gain: f32,
    pan: f32,
    mute: bool,
    solo: bool,
    selected: bool,
    height: u32,
    channels: Vec<Channel>,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_channels(name, 1)
    }

    pub fn stereo(name: impl Into<String>) -> Self {
        Self::with_channels(name, 2)
    }

    /// A track with `count` empty channels; at least one is always created.
    pub fn with_channels(name: impl Into<String>, count: usize) -> Self {
        let channels = (0..count.max(1)).map(|_| Channel::new()).collect();
        Self::from_channels(name, channels)
    }

    pub fn from_channels(name: impl Into<String>, mut channels: Vec<Channel>) -> Self {
        if channels.is_empty() {
            channels.push(Channel::new());
        }
        Self {
            id: TrackId::UNASSIGNED,
            name: name.into(),
            gain: 1.0,
            pan: 0.0,
            mute: false,
            solo: false,
            selected: false,
            height: DEFAULT_TRACK_HEIGHT,
            channels,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn set_id(&mut self, id: TrackId) {
        self.id = id;
    }

    /// Inserted into a list but not yet confirmed.
    pub fn is_pending_addition(&self) -> bool {
        self.id.is_unassigned()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn set_muted(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }

    pub fn channel_ref(&self, index: usize) -> Option<ChannelRef<'_>> {
        ChannelRef::new(self, index)
    }

    pub fn channel_refs(&self) -> impl Iterator<Item = ChannelRef<'_>> {
        (0..self.channels.len()).filter_map(move |index| ChannelRef::new(self, index))
    }

    /// The first channel; a track is always its own group leader.
    pub fn leader(&self) -> ChannelRef<'_> {
        ChannelRef::leader(self)
    }

    /// Structurally equivalent copy with the same identity.
    pub fn duplicate(&self, options: DuplicateOptions) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            gain: self.gain,
            pan: self.pan,
            mute: self.mute,
            solo: self.solo,
            selected: self.selected,
            height: self.height,
            channels: self.channels.iter().map(|c| c.duplicate(options)).collect(),
        }
    }

    /// Tell every channel attachment that this track now owns it.
    pub fn reparent_all_attachments(&self) {
        for (index, channel) in self.channels.iter().enumerate() {
            channel.attachments().reparent_all(AttachmentOwner {
                track_id: self.id,
                channel: index,
            });
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
