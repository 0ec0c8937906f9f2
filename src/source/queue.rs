use async_trait::async_trait;

use crate::event::Event;

use super::{EventSource, ReleaseError, SourceError};

/// Event source backed by a [`flume`] queue.
///
/// Producing ends are cheap clones of the returned sender. Once every
/// sender has been dropped, each subsequent receive reports
/// [`SourceError::Closed`]; the pump treats that like any other receive
/// failure and keeps running until it is cancelled.
///
/// # Example
///
/// ```
/// use fanbridge::event::Event;
/// use fanbridge::source::QueueSource;
///
/// let (tx, _source) = QueueSource::unbounded();
/// tx.send(Event::new("tick").with("count", 1)).unwrap();
/// ```
pub struct QueueSource {
    receiver: Option<flume::Receiver<Event>>,
}

impl QueueSource {
    /// Create an unbounded queue, returning the producing end and the source.
    pub fn unbounded() -> (flume::Sender<Event>, Self) {
        let (tx, rx) = flume::unbounded();
        (tx, Self { receiver: Some(rx) })
    }

    /// Create a bounded queue. Senders block once `capacity` events are
    /// waiting, extending the pump's backpressure to producers.
    pub fn bounded(capacity: usize) -> (flume::Sender<Event>, Self) {
        let (tx, rx) = flume::bounded(capacity);
        (tx, Self { receiver: Some(rx) })
    }

    /// Wrap an existing receiver.
    pub fn from_receiver(receiver: flume::Receiver<Event>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }
}

#[async_trait]
impl EventSource for QueueSource {
    async fn receive(&mut self) -> Result<Event, SourceError> {
        let received = match &self.receiver {
            Some(receiver) => receiver.recv_async().await.map_err(|_| SourceError::Closed),
            None => Err(SourceError::Closed),
        };
        if received.is_err() {
            // A disconnected queue resolves immediately; yield so a pump
            // looping on the failure cannot starve the scheduler.
            tokio::task::yield_now().await;
        }
        received
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        // Dropping the receiver disconnects remaining senders. Idempotent.
        self.receiver = None;
        Ok(())
    }
}
