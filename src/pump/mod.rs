//! The consumption loop binding one event source to one bridge.
//!
//! [`EventPump`] serializes consumption of an [`EventSource`] and turns
//! each outcome into a synchronous dispatch through an
//! [`EventBridge`](crate::bridge::EventBridge), until cooperatively
//! cancelled. The loop body is explicit — the receive await is the single
//! suspension point, iterations never overlap, and the terminal condition
//! is a visible [`PumpState`], not an implicit recursive base case.
//!
//! Because dispatch completes before the next receive is issued,
//! backpressure is implicit and total: a slow handler directly delays the
//! next pull from the source, and events are never buffered ahead of
//! consumption.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::bridge::{BridgeConfig, CancelToken, EventBridge};
use crate::source::{EventSource, ReleaseError};

/// Where the pump currently is in its lifecycle.
///
/// ```text
/// Idle -> Awaiting -> Dispatching -> Idle -> ...
/// Idle -> ShuttingDown -> Stopped
/// ```
///
/// There is no `Awaiting -> ShuttingDown` edge: an in-flight receive is
/// never interrupted; cancellation takes effect at the next iteration
/// boundary. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpState {
    Idle,
    Awaiting,
    Dispatching,
    ShuttingDown,
    Stopped,
}

impl PumpState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Awaiting,
            2 => Self::Dispatching,
            3 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Awaiting => 1,
            Self::Dispatching => 2,
            Self::ShuttingDown => 3,
            Self::Stopped => 4,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: PumpState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    fn set(&self, state: PumpState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    fn get(&self) -> PumpState {
        PumpState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Errors surfaced when joining a pump.
#[derive(Debug, Error, Diagnostic)]
pub enum PumpError {
    /// The source failed to release its resources during shutdown.
    #[error("source release failed during shutdown")]
    #[diagnostic(code(fanbridge::pump::release))]
    Release(#[source] ReleaseError),

    /// The driver task ended without running the loop to completion.
    #[error("pump task terminated abnormally: {0}")]
    #[diagnostic(code(fanbridge::pump::terminated))]
    Terminated(String),
}

/// Drives one [`EventSource`] into one [`EventBridge`].
///
/// Exactly one pump is bound to a source/bridge pair; the pump owns the
/// source exclusively, so no other task can issue a competing receive.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use fanbridge::{EventBridge, EventPump, handler};
/// use fanbridge::source::TickSource;
///
/// # async fn demo() {
/// let bridge = std::sync::Arc::new(EventBridge::new());
/// bridge.on("tick", handler(|e| println!("{e}")));
///
/// let pump = EventPump::new(TickSource::new(Duration::from_secs(1)), bridge.clone());
/// let pump = pump.spawn();
///
/// bridge.request_shutdown();
/// pump.join().await.unwrap();
/// # }
/// ```
pub struct EventPump<S> {
    source: S,
    bridge: Arc<EventBridge>,
    cancel: CancelToken,
    state: Arc<StateCell>,
}

impl<S: EventSource> EventPump<S> {
    /// Bind `source` to `bridge`. The pump polls the bridge's cancellation
    /// token.
    pub fn new(source: S, bridge: Arc<EventBridge>) -> Self {
        let cancel = bridge.cancel_token();
        Self {
            source,
            bridge,
            cancel,
            state: Arc::new(StateCell::new(PumpState::Idle)),
        }
    }

    /// Spawn the driver task and return its handle.
    pub fn spawn(self) -> PumpHandle
    where
        S: 'static,
    {
        let state = Arc::clone(&self.state);
        let join = tokio::spawn(self.run());
        PumpHandle { state, join }
    }

    /// Run the loop on the current task until cancelled.
    ///
    /// [`spawn`](Self::spawn) is the usual entry point; `run` is public so
    /// the loop can be driven directly, e.g. inside a test or a custom
    /// supervisor.
    pub async fn run(mut self) -> Result<(), ReleaseError> {
        loop {
            if self.cancel.is_cancelled() {
                self.state.set(PumpState::ShuttingDown);
                tracing::debug!("cancellation observed; releasing source");
                let released = self.source.release().await;
                self.state.set(PumpState::Stopped);
                return released;
            }

            self.state.set(PumpState::Awaiting);
            let outcome = self.source.receive().await;

            self.state.set(PumpState::Dispatching);
            match outcome {
                Ok(event) => {
                    tracing::trace!(kind = event.kind(), "dispatching");
                    self.bridge.dispatch(&event);
                }
                Err(error) => {
                    // Non-fatal by contract: report and keep consuming.
                    tracing::debug!(%error, "receive failed; reporting to subscribers");
                    self.bridge.dispatch_receive_failure(&error);
                }
            }
            self.state.set(PumpState::Idle);
        }
    }
}

/// Handle to a spawned pump.
///
/// Dropping the handle detaches the task; the pump keeps running until its
/// bridge requests shutdown.
pub struct PumpHandle {
    state: Arc<StateCell>,
    join: JoinHandle<Result<(), ReleaseError>>,
}

impl PumpHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> PumpState {
        self.state.get()
    }

    /// Whether the pump has reached its terminal state.
    pub fn is_stopped(&self) -> bool {
        self.state() == PumpState::Stopped
    }

    /// Await actual termination.
    ///
    /// Resolves once the loop has observed cancellation and released its
    /// source; a failed release surfaces here as [`PumpError::Release`].
    pub async fn join(self) -> Result<(), PumpError> {
        match self.join.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(release)) => Err(PumpError::Release(release)),
            Err(join) => Err(PumpError::Terminated(join.to_string())),
        }
    }
}

/// Build a bridge, bind a pump to `source`, and spawn it.
///
/// Convenience wiring for the common case of one source, one bridge, one
/// pump.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use fanbridge::{attach, handler};
/// use fanbridge::source::TickSource;
///
/// # async fn demo() {
/// let (bridge, pump) = attach(TickSource::new(Duration::from_millis(100)));
/// bridge.on("tick", handler(|e| println!("{e}")));
/// bridge.request_shutdown();
/// pump.join().await.unwrap();
/// # }
/// ```
pub fn attach<S: EventSource + 'static>(source: S) -> (Arc<EventBridge>, PumpHandle) {
    attach_with_config(source, BridgeConfig::default())
}

/// [`attach`] with an explicit [`BridgeConfig`].
pub fn attach_with_config<S: EventSource + 'static>(
    source: S,
    config: BridgeConfig,
) -> (Arc<EventBridge>, PumpHandle) {
    let bridge = Arc::new(EventBridge::with_config(config));
    let handle = EventPump::new(source, Arc::clone(&bridge)).spawn();
    (bridge, handle)
}
