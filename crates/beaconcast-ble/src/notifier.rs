//! Session event fan-out
//!
//! Observers are notified from a dedicated delivery task. `publish` snapshots the
//! subscribers registered at that moment and queues the event, so the publisher never
//! waits on observer code and observers may subscribe or unsubscribe from inside their
//! own handler.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use beaconcast_core::SessionEvent;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::error;

// ----------------------------------------------------------------------------
// Observers
// ----------------------------------------------------------------------------

/// Identifier returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Receiver of session events
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: &SessionEvent) {
        self(event)
    }
}

struct Subscription {
    id: ObserverId,
    observer: Arc<dyn SessionObserver>,
    active: Arc<AtomicBool>,
}

struct Delivery {
    event: SessionEvent,
    targets: Vec<(ObserverId, Arc<dyn SessionObserver>, Arc<AtomicBool>)>,
}

// ----------------------------------------------------------------------------
// Event Notifier
// ----------------------------------------------------------------------------

struct NotifierInner {
    observers: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
    queue: mpsc::UnboundedSender<Delivery>,
}

/// Cloneable handle to a session's observer list
#[derive(Clone)]
pub struct EventNotifier {
    inner: Arc<NotifierInner>,
}

impl EventNotifier {
    /// Create a notifier whose delivery task runs on `runtime`
    pub fn new(runtime: &Handle) -> Self {
        let (queue, deliveries) = mpsc::unbounded_channel();
        runtime.spawn(run_delivery(deliveries));

        Self {
            inner: Arc::new(NotifierInner {
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                queue,
            }),
        }
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an observer for every event published from now on
    pub fn subscribe(&self, observer: impl SessionObserver + 'static) -> ObserverId {
        self.subscribe_arc(Arc::new(observer))
    }

    pub fn subscribe_arc(&self, observer: Arc<dyn SessionObserver>) -> ObserverId {
        let id = ObserverId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers().push(Subscription {
            id,
            observer,
            active: Arc::new(AtomicBool::new(true)),
        });
        id
    }

    /// Register a channel receiving every event published from now on
    pub fn subscribe_channel(&self) -> (ObserverId, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event: &SessionEvent| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Remove an observer; queued events are no longer delivered to it
    ///
    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers();
        match observers.iter().position(|sub| sub.id == id) {
            Some(index) => {
                let sub = observers.remove(index);
                sub.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Queue `event` for every current observer
    pub fn publish(&self, event: SessionEvent) {
        let targets: Vec<_> = self
            .observers()
            .iter()
            .map(|sub| (sub.id, sub.observer.clone(), sub.active.clone()))
            .collect();
        if targets.is_empty() {
            return;
        }

        if self.inner.queue.send(Delivery { event, targets }).is_err() {
            error!("Event delivery task has stopped; dropping session event");
        }
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}

async fn run_delivery(mut deliveries: mpsc::UnboundedReceiver<Delivery>) {
    while let Some(Delivery { event, targets }) = deliveries.recv().await {
        for (id, observer, active) in targets {
            if !active.load(Ordering::Acquire) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if outcome.is_err() {
                error!("Observer {} panicked while handling '{}'", id, event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaconcast_core::{ErrorCode, SessionState};
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn test_events_delivered_in_publish_order() {
        let notifier = EventNotifier::new(&Handle::current());
        let (_id, mut rx) = notifier.subscribe_channel();

        notifier.publish(SessionEvent::state_changed(SessionState::Starting));
        notifier.publish(SessionEvent::failed(ErrorCode::InternalError));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, beaconcast_core::EventKind::StateChanged(SessionState::Starting));
        assert_eq!(second.code, Some(ErrorCode::InternalError));
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let notifier = EventNotifier::new(&Handle::current());
        let (id, mut rx) = notifier.subscribe_channel();
        assert_eq!(notifier.observer_count(), 1);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.observer_count(), 0);

        notifier.publish(SessionEvent::timed_out());
        // The observer's sender was dropped with its subscription
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_panicking_observer_does_not_block_others() {
        let notifier = EventNotifier::new(&Handle::current());
        notifier.subscribe(|_: &SessionEvent| panic!("observer failure"));
        let (_id, mut rx) = notifier.subscribe_channel();

        notifier.publish(SessionEvent::timed_out());
        notifier.publish(SessionEvent::timed_out());

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let notifier = EventNotifier::new(&Handle::current());
        let seen = Arc::new(StdMutex::new(0usize));

        notifier.publish(SessionEvent::timed_out());

        let counter = seen.clone();
        notifier.subscribe(move |_: &SessionEvent| *counter.lock().unwrap() += 1);
        let (_id, mut rx) = notifier.subscribe_channel();
        notifier.publish(SessionEvent::state_changed(SessionState::Idle));

        rx.recv().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
