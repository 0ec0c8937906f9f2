use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::event::Event;

use super::{EventSource, ReleaseError, SourceError};

/// Periodic event source emitting `tick` events with an incrementing
/// numeric `count` field.
///
/// The first tick is delayed by one full period. Ticks missed while a slow
/// handler held up the pump are skipped rather than bursted, so the count
/// always advances by one per delivered event.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use fanbridge::source::TickSource;
///
/// let source = TickSource::new(Duration::from_secs(1));
/// ```
pub struct TickSource {
    timer: Interval,
    kind: String,
    count: u64,
}

impl TickSource {
    pub fn new(period: Duration) -> Self {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Consume the immediate first tick so the initial event arrives one
        // period after construction.
        timer.reset();
        Self {
            timer,
            kind: "tick".to_string(),
            count: 0,
        }
    }

    /// Emit events under a kind other than `tick`.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Start counting from `start` instead of zero; the first event carries
    /// `start + 1`.
    #[must_use]
    pub fn starting_at(mut self, start: u64) -> Self {
        self.count = start;
        self
    }
}

#[async_trait]
impl EventSource for TickSource {
    async fn receive(&mut self) -> Result<Event, SourceError> {
        self.timer.tick().await;
        self.count += 1;
        Ok(Event::new(self.kind.clone()).with("count", self.count))
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_advance_by_one() {
        let mut source = TickSource::new(Duration::from_millis(10));
        assert_eq!(source.receive().await.unwrap().u64_field("count"), Some(1));
        assert_eq!(source.receive().await.unwrap().u64_field("count"), Some(2));
        assert_eq!(source.receive().await.unwrap().u64_field("count"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_kind_and_start() {
        let mut source = TickSource::new(Duration::from_millis(10))
            .with_kind("pulse")
            .starting_at(41);
        let event = source.receive().await.unwrap();
        assert_eq!(event.kind(), "pulse");
        assert_eq!(event.u64_field("count"), Some(42));
    }
}
