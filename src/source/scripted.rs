use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::event::Event;

use super::{EventSource, ReleaseError, SourceError};

/// One scripted receive outcome.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// Resolve the receive with this event.
    Emit(Event),
    /// Resolve the receive with a failure carrying this message.
    Fail(String),
    /// Sleep before producing the next step's outcome.
    Delay(Duration),
}

/// Deterministic event source for tests.
///
/// Plays back a script of emissions, failures, and delays, then reports the
/// source as closed (or parks forever, see [`pending_after`]). A
/// [`ScriptProbe`] taken before the source is handed to the pump exposes
/// what actually happened: how many receives started, whether any pair of
/// them overlapped, when each one began, and how often release was called.
///
/// [`pending_after`]: ScriptedSource::pending_after
///
/// # Example
///
/// ```
/// use fanbridge::event::Event;
/// use fanbridge::source::{ScriptStep, ScriptedSource};
///
/// let source = ScriptedSource::new([
///     ScriptStep::Emit(Event::new("tick").with("count", 1)),
///     ScriptStep::Fail("transient".into()),
/// ]);
/// let probe = source.probe();
/// assert_eq!(probe.releases(), 0);
/// ```
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    park_when_drained: bool,
    latency: Option<Duration>,
    release_failure: Option<String>,
    stats: Arc<ScriptStats>,
}

#[derive(Default)]
struct ScriptStats {
    receives: AtomicUsize,
    releases: AtomicUsize,
    overlaps: AtomicUsize,
    in_flight: AtomicBool,
    receive_starts: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            park_when_drained: false,
            latency: None,
            release_failure: None,
            stats: Arc::new(ScriptStats::default()),
        }
    }

    /// A source that is already closed: every receive fails immediately.
    pub fn closed() -> Self {
        Self::new([])
    }

    /// Park forever once the script is drained instead of reporting closed.
    #[must_use]
    pub fn pending_after(mut self) -> Self {
        self.park_when_drained = true;
        self
    }

    /// Make every receive take at least `latency` before resolving.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make release fail with this message. Release calls are still
    /// counted.
    #[must_use]
    pub fn fail_release(mut self, message: impl Into<String>) -> Self {
        self.release_failure = Some(message.into());
        self
    }

    /// Observation handle that stays valid after the source moves into the
    /// pump.
    pub fn probe(&self) -> ScriptProbe {
        ScriptProbe {
            stats: Arc::clone(&self.stats),
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn receive(&mut self) -> Result<Event, SourceError> {
        if self.stats.in_flight.swap(true, Ordering::AcqRel) {
            self.stats.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        let _in_flight = InFlight(&self.stats.in_flight);
        self.stats.receives.fetch_add(1, Ordering::Relaxed);
        self.stats
            .receive_starts
            .lock()
            .unwrap()
            .push(Instant::now());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        loop {
            match self.steps.pop_front() {
                Some(ScriptStep::Emit(event)) => return Ok(event),
                Some(ScriptStep::Fail(message)) => return Err(SourceError::receive(message)),
                Some(ScriptStep::Delay(duration)) => tokio::time::sleep(duration).await,
                None if self.park_when_drained => std::future::pending::<()>().await,
                None => {
                    // Same as a disconnected queue: resolve immediately but
                    // yield so a pump looping on Closed cannot starve the
                    // scheduler.
                    tokio::task::yield_now().await;
                    return Err(SourceError::Closed);
                }
            }
        }
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        self.stats.releases.fetch_add(1, Ordering::Relaxed);
        match &self.release_failure {
            Some(message) => Err(ReleaseError::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Observation handle for a [`ScriptedSource`].
#[derive(Clone)]
pub struct ScriptProbe {
    stats: Arc<ScriptStats>,
}

impl ScriptProbe {
    /// Number of receive calls that have started.
    pub fn receives(&self) -> usize {
        self.stats.receives.load(Ordering::Relaxed)
    }

    /// Number of release calls.
    pub fn releases(&self) -> usize {
        self.stats.releases.load(Ordering::Relaxed)
    }

    /// Number of receives that started while another was outstanding.
    pub fn overlaps(&self) -> usize {
        self.stats.overlaps.load(Ordering::Relaxed)
    }

    /// Start instant of every receive, in call order.
    pub fn receive_starts(&self) -> Vec<Instant> {
        self.stats.receive_starts.lock().unwrap().clone()
    }
}
