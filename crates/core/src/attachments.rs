//! Auxiliary per-channel client data, such as waveform caches or
//! spectrum summaries, that travels with a channel but is not part of
//! its serialized state.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ids::TrackId;

/// The channel an attachment currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentOwner {
    pub track_id: TrackId,
    pub channel: usize,
}

pub trait ChannelAttachment: Any {
    /// Independent copy, used when a channel is deep-duplicated.
    fn duplicate(&self) -> Box<dyn ChannelAttachment>;

    /// Called when the channel holding this attachment is about to become
    /// the canonical owner.
    fn reparent(&mut self, _owner: AttachmentOwner) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub type SharedAttachment = Rc<RefCell<Box<dyn ChannelAttachment>>>;

/// Named attachments of one channel. Shallow copies share the same
/// attachment objects.
#[derive(Default)]
pub struct Attachments {
    slots: BTreeMap<String, SharedAttachment>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, attachment: impl ChannelAttachment) {
        let boxed: Box<dyn ChannelAttachment> = Box::new(attachment);
        self.slots.insert(key.into(), Rc::new(RefCell::new(boxed)));
    }

    pub fn remove(&mut self, key: &str) -> Option<SharedAttachment> {
        self.slots.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&SharedAttachment> {
        self.slots.get(key)
    }

    /// Read a typed attachment.
    pub fn with<T: 'static, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let slot = self.slots.get(key)?;
        let attachment = slot.borrow();
        attachment.as_any().downcast_ref::<T>().map(f)
    }

    /// Mutate a typed attachment. Shallow copies observe the change.
    pub fn with_mut<T: 'static, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let slot = self.slots.get(key)?;
        let mut attachment = slot.borrow_mut();
        attachment.as_any_mut().downcast_mut::<T>().map(f)
    }

    /// True when both sets hold the very same object under `key`.
    pub fn shares(&self, other: &Attachments, key: &str) -> bool {
        match (self.slots.get(key), other.slots.get(key)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn shallow_copy(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }

    pub fn deep_copy(&self) -> Self {
        let slots = self
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), Rc::new(RefCell::new(slot.borrow().duplicate()))))
            .collect();
        Self { slots }
    }

    pub fn reparent_all(&self, owner: AttachmentOwner) {
        for slot in self.slots.values() {
            slot.borrow_mut().reparent(owner);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}
