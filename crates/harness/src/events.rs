use std::cell::RefCell;
use std::rc::Rc;

use shadowtracks_list::{Subscription, TrackList, TrackListEvent};

/// Records every event delivered to it, in order.
pub struct EventLog {
    events: Rc<RefCell<Vec<TrackListEvent>>>,
    _subscription: Subscription,
}

impl EventLog {
    /// Subscribe through `subscribe`, e.g. `|f| list.subscribe(f)`.
    pub fn attach<S>(subscribe: S) -> Self
    where
        S: FnOnce(Box<dyn FnMut(&TrackList, &TrackListEvent)>) -> Subscription,
    {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let subscription = subscribe(Box::new(move |_, event| sink.borrow_mut().push(*event)));
        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<TrackListEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Event names, e.g. `["addition", "deletion"]`.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(TrackListEvent::as_str).collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
