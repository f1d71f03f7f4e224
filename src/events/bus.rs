use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde_json::Value;
use tracing::{error, trace};

use crate::error::{ViewerError, ViewerResult};

use super::{Channel, Event};

type SharedHandler = Rc<RefCell<dyn FnMut(&Event) -> ViewerResult<()>>>;

/// Handle returned by `subscribe`, used to deregister the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: SharedHandler,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    channels: HashMap<Channel, Vec<Subscriber>>,
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub channel: Channel,
    pub delivered: usize,
    pub failures: Vec<ViewerError>,
}

impl DispatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Synchronous in-process publish/subscribe bus.
///
/// Cloning yields another handle to the same subscriber table. Handlers run
/// in registration order; a handler returning `Err` or panicking is reported
/// and the remaining handlers still run.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> ViewerResult<()> + 'static,
    {
        self.subscribe_multiple(&[channel], handler)
    }

    /// Registers one handler on several channels under a single id.
    pub fn subscribe_multiple<F>(&self, channels: &[Channel], handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> ViewerResult<()> + 'static,
    {
        let handler: SharedHandler = Rc::new(RefCell::new(handler));
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        for channel in channels {
            state
                .channels
                .entry(*channel)
                .or_default()
                .push(Subscriber {
                    id,
                    handler: Rc::clone(&handler),
                });
        }
        trace!(?id, ?channels, "subscribed handler");
        id
    }

    /// Removes the handler from every channel it was registered on.
    /// Returns `true` when anything was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let mut removed = false;
        for subscribers in state.channels.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|subscriber| subscriber.id != id);
            removed |= subscribers.len() != before;
        }
        state.channels.retain(|_, subscribers| !subscribers.is_empty());
        removed
    }

    #[must_use]
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.state
            .borrow()
            .channels
            .get(&channel)
            .map_or(0, Vec::len)
    }

    /// Total registrations across all channels.
    #[must_use]
    pub fn total_subscriptions(&self) -> usize {
        self.state.borrow().channels.values().map(Vec::len).sum()
    }

    /// Dispatches `payload` to the handlers registered on `channel` when the
    /// call starts. Subscriptions changed by a handler apply to later publishes.
    pub fn publish(&self, channel: Channel, payload: Value) -> DispatchReport {
        let subscribers: Vec<(SubscriptionId, SharedHandler)> = self
            .state
            .borrow()
            .channels
            .get(&channel)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|subscriber| (subscriber.id, Rc::clone(&subscriber.handler)))
                    .collect()
            })
            .unwrap_or_default();

        let mut report = DispatchReport {
            channel,
            delivered: 0,
            failures: Vec::new(),
        };
        if subscribers.is_empty() {
            trace!(%channel, "publish without subscribers");
            return report;
        }

        let event = Event::new(channel, payload);
        for (id, handler) in subscribers {
            let outcome = match handler.try_borrow_mut() {
                Ok(mut guard) => {
                    let handler_fn = &mut *guard;
                    panic::catch_unwind(AssertUnwindSafe(|| handler_fn(&event)))
                        .unwrap_or_else(|payload| Err(panic_failure(channel, payload.as_ref())))
                }
                Err(_) => Err(ViewerError::HandlerFailure {
                    channel: channel.to_string(),
                    message: "handler re-entered while already running".to_owned(),
                }),
            };
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    let failure = into_handler_failure(channel, err);
                    error!(%channel, ?id, error = %failure, "event handler failed");
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    /// Publishes with an empty payload.
    pub fn notify(&self, channel: Channel) -> DispatchReport {
        self.publish(channel, Value::Null)
    }
}

fn into_handler_failure(channel: Channel, err: ViewerError) -> ViewerError {
    match err {
        ViewerError::HandlerFailure { .. } => err,
        other => ViewerError::HandlerFailure {
            channel: channel.to_string(),
            message: other.to_string(),
        },
    }
}

fn panic_failure(channel: Channel, payload: &(dyn Any + Send)) -> ViewerError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_owned());
    ViewerError::HandlerFailure {
        channel: channel.to_string(),
        message: format!("panicked: {message}"),
    }
}

/// Subscriptions owned by one coordinator, released together on teardown.
pub struct Subscriptions {
    bus: EventBus,
    ids: Vec<SubscriptionId>,
}

impl Subscriptions {
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            ids: Vec::new(),
        }
    }

    pub fn push(&mut self, id: SubscriptionId) {
        self.ids.push(id);
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Unsubscribes everything and returns how many ids were still live.
    pub fn release_all(&mut self) -> usize {
        self.ids
            .drain(..)
            .filter(|id| self.bus.unsubscribe(*id))
            .count()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release_all();
    }
}
