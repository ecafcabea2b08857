use std::{
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    rc::{Rc, Weak},
    sync::Arc,
};

use crate::{
    event_bus::bus_event::{BusEvent, EventName},
    log::LogSink,
    sink_trace, sink_warn,
};

type Callback = Rc<RefCell<dyn FnMut(&BusEvent)>>;

struct Slot {
    id: u64,
    /// `None` subscribes to every event.
    name: Option<EventName>,
    callback: Callback,
}

struct BusInner {
    next_id: Cell<u64>,
    slots: RefCell<Vec<Slot>>,
    log: Arc<dyn LogSink>,
}

/// Synchronous, single-threaded publish/subscribe.
///
/// Subscribers run in registration order on the emitting thread. A
/// subscriber that panics is logged and skipped; delivery continues with
/// the next one. Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

/// Returned by [`EventBus::on`]; call [`unsubscribe`](Self::unsubscribe) to
/// stop delivery. Dropping it keeps the subscription alive.
pub struct Subscription {
    bus: Weak<BusInner>,
    id: u64,
}

impl Subscription {
    /// Removes the callback. It is not invoked again, even by an emit
    /// already in progress.
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.slots.borrow_mut().retain(|s| s.id != self.id);
        }
    }
}

impl EventBus {
    pub fn new(log: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Rc::new(BusInner {
                next_id: Cell::new(1),
                slots: RefCell::new(Vec::new()),
                log,
            }),
        }
    }

    pub fn on<F>(&self, name: EventName, callback: F) -> Subscription
    where
        F: FnMut(&BusEvent) + 'static,
    {
        self.register(Some(name), Rc::new(RefCell::new(callback)))
    }

    /// Subscribes to every event name.
    pub fn on_any<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&BusEvent) + 'static,
    {
        self.register(None, Rc::new(RefCell::new(callback)))
    }

    fn register(&self, name: Option<EventName>, callback: Callback) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.slots.borrow_mut().push(Slot { id, name, callback });
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.inner
            .slots
            .borrow()
            .iter()
            .filter(|s| s.name.is_none_or(|n| n == name))
            .count()
    }

    /// Delivers `event` to every subscriber of its name.
    ///
    /// Subscribers may subscribe, unsubscribe or emit from inside a callback.
    /// A callback is never re-entered: a nested emit skips the subscriber
    /// that is currently running.
    pub fn emit(&self, event: &BusEvent) {
        let name = event.name();
        let targets: Vec<(u64, Callback)> = self
            .inner
            .slots
            .borrow()
            .iter()
            .filter(|s| s.name.is_none_or(|n| n == name))
            .map(|s| (s.id, s.callback.clone()))
            .collect();

        for (id, callback) in targets {
            if !self.is_live(id) {
                continue;
            }
            let Ok(mut f) = callback.try_borrow_mut() else {
                sink_trace!(self.inner.log, "[bus] skipped re-entrant {name} subscriber #{id}");
                continue;
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*f)(event)));
            if outcome.is_err() {
                sink_warn!(self.inner.log, "[bus] subscriber #{id} panicked handling {name}");
            }
        }
    }

    fn is_live(&self, id: u64) -> bool {
        self.inner.slots.borrow().iter().any(|s| s.id == id)
    }
}
