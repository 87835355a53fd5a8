use std::fmt;

use serde::Serialize;

use crate::attachments::Attachments;
use crate::ids::TrackId;
use crate::track::{DuplicateOptions, Track};

/// One addressable stream of a track.
#[derive(Debug, Default, Serialize)]
pub struct Channel {
    samples: Vec<f32>,
    #[serde(skip)]
    attachments: Attachments,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(samples: Vec<f32>) -> Self {
        Self {
            samples,
            attachments: Attachments::new(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut Vec<f32> {
        &mut self.samples
    }

    pub fn append(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    pub(crate) fn duplicate(&self, options: DuplicateOptions) -> Self {
        let attachments = if options.shares_attachments() {
            self.attachments.shallow_copy()
        } else {
            self.attachments.deep_copy()
        };
        Self {
            samples: self.samples.clone(),
            attachments,
        }
    }
}

/// A channel addressed through its group: the owning track plus the
/// channel's index in that track.
#[derive(Clone, Copy)]
pub struct ChannelRef<'a> {
    group: &'a Track,
    index: usize,
}

impl<'a> ChannelRef<'a> {
    /// `None` when `index` is past the group's last channel.
    pub fn new(group: &'a Track, index: usize) -> Option<Self> {
        (index < group.channel_count()).then_some(Self { group, index })
    }

    pub(crate) fn leader(group: &'a Track) -> Self {
        Self { group, index: 0 }
    }

    pub fn group(&self) -> &'a Track {
        self.group
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn track_id(&self) -> TrackId {
        self.group.id()
    }

    pub fn channel(&self) -> &'a Channel {
        &self.group.channels()[self.index]
    }

    pub fn is_leader(&self) -> bool {
        self.index == 0
    }

    /// Same channel object, not merely the same identity.
    pub fn same_channel(&self, other: &ChannelRef<'_>) -> bool {
        std::ptr::eq(self.group, other.group) && self.index == other.index
    }
}

impl fmt::Debug for ChannelRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRef")
            .field("track", &self.group.id())
            .field("index", &self.index)
            .finish()
    }
}
