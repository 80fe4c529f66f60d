//! Synchronous, single-threaded publish/subscribe.
//!
//! [`EventBus::publish`] invokes every handler registered for a key in
//! registration order, on the caller's thread, before returning. There is no
//! queueing and no retry. Each invocation is isolated: a handler that returns
//! an error or panics is logged and counted, and its siblings still run.
//!
//! The handler list is snapshotted when publishing starts, so handlers may
//! subscribe, dispose or publish again without invalidating the iteration.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::warn;

/// Failure reported by a handler.
pub type HandlerError = Box<dyn std::error::Error>;

/// Return type of every handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<E> = Rc<dyn Fn(&E) -> HandlerResult>;

struct Registry<K, E> {
    next_id: u64,
    handlers: HashMap<K, Vec<(u64, Handler<E>)>>,
}

impl<K: Eq + Hash, E> Registry<K, E> {
    fn remove(&mut self, key: &K, id: u64) {
        let now_empty = self.handlers.get_mut(key).is_some_and(|entries| {
            entries.retain(|(entry_id, _)| *entry_id != id);
            entries.is_empty()
        });
        if now_empty {
            self.handlers.remove(key);
        }
    }
}

/// Outcome of a single [`EventBus::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Keyed fan-out of events of type `E` to handlers.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use mapview_core::EventBus;
///
/// let bus: EventBus<&'static str, u32> = EventBus::new();
/// let total = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&total);
/// let subscription = bus.subscribe("tick", move |value: &u32| {
///     sink.set(sink.get() + value);
///     Ok(())
/// });
///
/// bus.publish(&"tick", &2);
/// subscription.dispose();
/// bus.publish(&"tick", &5);
/// assert_eq!(total.get(), 2);
/// ```
pub struct EventBus<K, E> {
    registry: Rc<RefCell<Registry<K, E>>>,
}

impl<K, E> Default for EventBus<K, E> {
    fn default() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }
}

impl<K, E> fmt::Debug for EventBus<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("keys", &registry.handlers.len())
            .finish_non_exhaustive()
    }
}

impl<K, E> EventBus<K, E>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    E: 'static,
{
    /// Create a bus with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events published under `key`.
    ///
    /// Keys nobody publishes under are accepted; the handler never fires.
    pub fn subscribe<F>(&self, key: K, handler: F) -> Subscription
    where
        F: Fn(&E) -> HandlerResult + 'static,
    {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .handlers
                .entry(key.clone())
                .or_default()
                .push((id, Rc::new(handler)));
            id
        };
        let registry = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(live) = registry.upgrade() {
                live.borrow_mut().remove(&key, id);
            }
        })
    }

    /// Deliver `event` to every handler registered under `key`.
    pub fn publish(&self, key: &K, event: &E) -> PublishReport {
        let handlers: Vec<Handler<E>> = self
            .registry
            .borrow()
            .handlers
            .get(key)
            .map(|entries| entries.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!("event handler for {key:?} failed: {err}");
                    report.failed += 1;
                }
                Err(payload) => {
                    warn!(
                        "event handler for {key:?} panicked: {}",
                        panic_message(payload.as_ref())
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Number of handlers currently registered under `key`.
    #[must_use]
    pub fn handler_count(&self, key: &K) -> usize {
        self.registry.borrow().handlers.get(key).map_or(0, Vec::len)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Disposer returned by every `subscribe` call.
///
/// Dropping a subscription leaves the handler registered; call
/// [`Subscription::dispose`] to remove it. Disposing after the bus itself has
/// been dropped is a no-op.
pub struct Subscription {
    disposer: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(disposer: impl FnOnce() + 'static) -> Self {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    /// Remove the handler from its bus.
    pub fn dispose(mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disposer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    #[fixture]
    fn bus() -> EventBus<&'static str, u32> {
        EventBus::new()
    }

    fn recorder(log: &Log, label: &'static str) -> impl Fn(&u32) -> HandlerResult + 'static {
        let sink = Rc::clone(log);
        move |value: &u32| {
            sink.borrow_mut().push(format!("{label}:{value}"));
            Ok(())
        }
    }

    #[rstest]
    fn handlers_run_in_registration_order(bus: EventBus<&'static str, u32>) {
        let log: Log = Rc::default();
        let _first = bus.subscribe("k", recorder(&log, "a"));
        let _second = bus.subscribe("k", recorder(&log, "b"));
        let _third = bus.subscribe("k", recorder(&log, "c"));

        let report = bus.publish(&"k", &1);

        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "c:1"]);
        assert_eq!(report, PublishReport { delivered: 3, failed: 0 });
    }

    #[rstest]
    fn failing_handler_does_not_stop_siblings(bus: EventBus<&'static str, u32>) {
        let log: Log = Rc::default();
        let _first = bus.subscribe("k", recorder(&log, "a"));
        let _failing = bus.subscribe("k", |_: &u32| Err("boom".into()));
        let _panicking = bus.subscribe("k", |_: &u32| -> HandlerResult { panic!("kaboom") });
        let _last = bus.subscribe("k", recorder(&log, "d"));

        let report = bus.publish(&"k", &7);

        assert_eq!(*log.borrow(), vec!["a:7", "d:7"]);
        assert_eq!(report, PublishReport { delivered: 2, failed: 2 });
    }

    #[rstest]
    fn disposed_handler_no_longer_fires(bus: EventBus<&'static str, u32>) {
        let log: Log = Rc::default();
        let keep = bus.subscribe("k", recorder(&log, "keep"));
        let gone = bus.subscribe("k", recorder(&log, "gone"));
        gone.dispose();

        bus.publish(&"k", &3);

        assert_eq!(*log.borrow(), vec!["keep:3"]);
        assert_eq!(bus.handler_count(&"k"), 1);
        keep.dispose();
        assert_eq!(bus.handler_count(&"k"), 0);
    }

    #[rstest]
    fn unknown_keys_are_tolerated(bus: EventBus<&'static str, u32>) {
        let log: Log = Rc::default();
        let _sub = bus.subscribe("never-published", recorder(&log, "x"));
        let report = bus.publish(&"other", &1);
        assert_eq!(report, PublishReport::default());
        assert!(log.borrow().is_empty());
    }

    #[rstest]
    fn handlers_may_subscribe_while_publishing() {
        let bus: Rc<EventBus<&'static str, u32>> = Rc::new(EventBus::new());
        let log: Log = Rc::default();
        let inner_bus = Rc::clone(&bus);
        let inner_log = Rc::clone(&log);
        let _outer = bus.subscribe("k", move |_: &u32| {
            let _late = inner_bus.subscribe("k", recorder(&inner_log, "late"));
            Ok(())
        });

        bus.publish(&"k", &1);
        assert!(log.borrow().is_empty(), "late handler joins the next publish");

        bus.publish(&"k", &2);
        assert_eq!(*log.borrow(), vec!["late:2"]);
    }

    #[rstest]
    fn dispose_after_bus_drop_is_noop() {
        let bus: EventBus<&'static str, u32> = EventBus::new();
        let sub = bus.subscribe("k", |_: &u32| Ok(()));
        drop(bus);
        sub.dispose();
    }
}
