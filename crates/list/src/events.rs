//! Synchronous, ordered change notification for a [`TrackList`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use shadowtracks_core::TrackId;

use crate::track_list::TrackList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackListEvent {
    /// Contents of a track changed; its place in the list did not.
    TrackDataChange { track_id: TrackId },
    SelectionChange { track_id: TrackId },
    /// Tracks were reordered but otherwise unchanged.
    Permuted,
    /// A track changed its display height.
    Resizing { track_id: TrackId },
    /// A track was added. Also posted when one track replaces another.
    Addition { track_id: TrackId, index: usize },
    Deletion { track_id: TrackId, index: usize },
}

impl TrackListEvent {
    /// Events that change which tracks exist or where they sit.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Permuted | Self::Resizing { .. } | Self::Addition { .. } | Self::Deletion { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrackDataChange { .. } => "track_data_change",
            Self::SelectionChange { .. } => "selection_change",
            Self::Permuted => "permuted",
            Self::Resizing { .. } => "resizing",
            Self::Addition { .. } => "addition",
            Self::Deletion { .. } => "deletion",
        }
    }
}

type Listener = dyn FnMut(&TrackList, &TrackListEvent);
type ListenerSlot = Rc<RefCell<Box<Listener>>>;

#[derive(Default)]
struct Registry {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, ListenerSlot)>>,
    delivering: Cell<bool>,
    /// Events published while a delivery is running, oldest first.
    queued: RefCell<VecDeque<TrackListEvent>>,
}

/// Marks a delivery as running; resets the registry even if a listener
/// panics.
struct Delivery<'a>(&'a Registry);

impl<'a> Delivery<'a> {
    fn start(registry: &'a Registry) -> Self {
        registry.delivering.set(true);
        Self(registry)
    }
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        self.0.delivering.set(false);
        self.0.queued.borrow_mut().clear();
    }
}

/// Ordered listener list. Clones share the same listeners.
#[derive(Clone, Default)]
pub struct Publisher {
    registry: Rc<Registry>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listeners are called in subscription order. The returned
    /// subscription removes the listener when dropped.
    pub fn subscribe(
        &self,
        listener: impl FnMut(&TrackList, &TrackListEvent) + 'static,
    ) -> Subscription {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        let slot: ListenerSlot = Rc::new(RefCell::new(Box::new(listener)));
        self.registry.listeners.borrow_mut().push((id, slot));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Deliver `event` to every current listener before returning.
    ///
    /// Listeners may subscribe or unsubscribe while being called; the set
    /// receiving an event is fixed when its delivery starts. An event
    /// published from inside a listener is queued and delivered once the
    /// current event has reached every listener, so all listeners see
    /// events in the same order.
    pub fn publish(&self, list: &TrackList, event: &TrackListEvent) {
        let registry = &*self.registry;
        if registry.delivering.get() {
            log::debug!("queueing {} event behind current delivery", event.as_str());
            registry.queued.borrow_mut().push_back(*event);
            return;
        }
        let _delivery = Delivery::start(registry);
        let mut next = Some(*event);
        while let Some(event) = next {
            self.deliver(list, &event);
            next = registry.queued.borrow_mut().pop_front();
        }
    }

    fn deliver(&self, list: &TrackList, event: &TrackListEvent) {
        let listeners: Vec<ListenerSlot> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .map(|(_, slot)| Rc::clone(slot))
            .collect();
        for slot in listeners {
            (&mut **slot.borrow_mut())(list, event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.borrow().len()
    }
}

/// Keeps a listener registered for as long as it lives.
#[must_use = "dropping a subscription unsubscribes the listener"]
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|r| r.listeners.borrow().iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}
