//! Ready-made subscriber handlers: in-memory capture, tracing output, and
//! an async tap for consumers that live outside the pump task.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::time::timeout;

use crate::bridge::{Handler, HandlerError};
use crate::event::Event;

/// In-memory event capture for tests and snapshots.
///
/// Clones share the same storage, so a recorder can be kept for assertions
/// after its handler has been registered.
///
/// # Example
///
/// ```
/// use fanbridge::bridge::EventBridge;
/// use fanbridge::event::Event;
/// use fanbridge::subscribers::Recorder;
///
/// let recorder = Recorder::new();
/// let bridge = EventBridge::new();
/// bridge.on("tick", recorder.handler());
///
/// bridge.dispatch(&Event::new("tick").with("count", 1));
/// assert_eq!(recorder.snapshot().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends every event it sees to this recorder.
    pub fn handler(&self) -> Handler {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |event| {
            entries.lock().unwrap().push(event.clone());
            Ok(())
        })
    }

    /// Snapshot of all captured events, in delivery order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// A handler that logs every event at `info` through [`tracing`].
pub fn log_events() -> Handler {
    Arc::new(|event| {
        tracing::info!(kind = event.kind(), "{event}");
        Ok(())
    })
}

/// Forward events into a queue consumed asynchronously elsewhere.
///
/// The handler side stays synchronous and non-blocking; the [`EventTap`]
/// side can await events from any task. If the tap is dropped the handler
/// starts reporting a contained fault per event, which shows up in logs —
/// remove the registration with `off` when the tap goes away.
///
/// # Example
///
/// ```
/// use fanbridge::bridge::EventBridge;
/// use fanbridge::event::Event;
/// use fanbridge::subscribers::tap;
///
/// # async fn demo() {
/// let (handler, tap) = tap();
/// let bridge = EventBridge::new();
/// bridge.on("tick", handler);
///
/// bridge.dispatch(&Event::new("tick").with("count", 1));
/// assert_eq!(tap.recv().await.unwrap().u64_field("count"), Some(1));
/// # }
/// ```
pub fn tap() -> (Handler, EventTap) {
    let (tx, rx) = flume::unbounded();
    let handler: Handler = Arc::new(move |event| {
        tx.send(event.clone())
            .map_err(|_| HandlerError::msg("tap receiver dropped"))
    });
    (handler, EventTap { receiver: rx })
}

/// Consuming end of [`tap`].
pub struct EventTap {
    receiver: flume::Receiver<Event>,
}

impl EventTap {
    /// Receive the next event, awaiting if necessary. Returns `None` once
    /// every registered tap handler has been dropped.
    pub async fn recv(&self) -> Option<Event> {
        self.receiver.recv_async().await.ok()
    }

    /// Receive without awaiting.
    pub fn try_recv(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `duration` for the next event.
    pub async fn next_timeout(&self, duration: Duration) -> Option<Event> {
        timeout(duration, self.recv()).await.ok().flatten()
    }

    /// Convert into an async stream of events.
    pub fn into_async_stream(self) -> impl Stream<Item = Event> {
        stream::unfold(self, |tap| async move {
            tap.recv().await.map(|event| (event, tap))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventBridge;

    #[test]
    fn recorder_preserves_delivery_order() {
        let recorder = Recorder::new();
        let bridge = EventBridge::new();
        bridge.on("tick", recorder.handler());

        bridge.dispatch(&Event::new("tick").with("count", 1));
        bridge.dispatch(&Event::new("tick").with("count", 2));

        let counts: Vec<_> = recorder
            .snapshot()
            .iter()
            .filter_map(|e| e.u64_field("count"))
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[tokio::test]
    async fn tap_forwards_events() {
        let (handler, tap) = tap();
        let bridge = EventBridge::new();
        bridge.on("tick", handler);

        bridge.dispatch(&Event::new("tick").with("count", 7));

        let event = tap.next_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(event.u64_field("count"), Some(7));
        assert!(tap.try_recv().is_none());
    }
}
