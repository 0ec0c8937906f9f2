//! The event source contract and the sources shipped with the crate.
//!
//! An [`EventSource`] is a single-consumer producer of [`Event`]s: the pump
//! issues one `receive` at a time and calls `release` exactly once when it
//! shuts down. Implementations for common cases live in submodules; the
//! [`SharedSource`] wrapper enforces the single-consumer discipline at
//! runtime for handles that have to be shared.

pub mod queue;
pub mod scripted;
pub mod tick;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::event::Event;

pub use queue::QueueSource;
pub use scripted::{ScriptProbe, ScriptStep, ScriptedSource};
pub use tick::TickSource;

/// Errors produced by a failed receive.
///
/// Receive failures are non-fatal to the pump: each one is reported to
/// subscribers through the reserved failure kind and consumption continues.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    /// The source has no more events and will never produce another.
    #[error("event source closed")]
    #[diagnostic(code(fanbridge::source::closed))]
    Closed,

    /// The source failed to produce an event.
    #[error("receive failed: {message}")]
    #[diagnostic(code(fanbridge::source::receive))]
    Receive { message: String },
}

impl SourceError {
    pub fn receive(message: impl Into<String>) -> Self {
        Self::Receive {
            message: message.into(),
        }
    }
}

/// Error produced when a source fails to release its resources.
///
/// Surfaced to whoever initiated shutdown through
/// [`PumpHandle::join`](crate::pump::PumpHandle::join).
#[derive(Debug, Error, Diagnostic)]
#[error("source release failed: {message}")]
#[diagnostic(code(fanbridge::source::release))]
pub struct ReleaseError {
    message: String,
}

impl ReleaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single-consumer asynchronous producer of events.
///
/// # Contract
///
/// - `receive` may suspend the caller for an unbounded duration. At most
///   one call may be outstanding per source instance; `&mut self` makes an
///   overlap unrepresentable for owned sources, and [`SharedSource`]
///   enforces it at runtime for shared handles.
/// - `release` is idempotent and safe to call after a failed receive or
///   before any receive has been issued.
#[async_trait]
pub trait EventSource: Send {
    /// Produce the next event, suspending until one is available.
    async fn receive(&mut self) -> Result<Event, SourceError>;

    /// Release the resources backing this source.
    async fn release(&mut self) -> Result<(), ReleaseError>;
}

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for Box<S> {
    async fn receive(&mut self) -> Result<Event, SourceError> {
        (**self).receive().await
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        (**self).release().await
    }
}

/// Clonable wrapper that shares one source between owners while keeping the
/// single-consumer discipline.
///
/// Issuing a second `receive` while one is outstanding is a contract
/// violation, not a recoverable condition: the call panics immediately with
/// a distinguishable message instead of queueing behind the first.
///
/// # Example
///
/// ```
/// use fanbridge::source::{ScriptedSource, SharedSource};
///
/// let shared = SharedSource::new(ScriptedSource::closed());
/// let _clone = shared.clone();
/// ```
pub struct SharedSource<S> {
    inner: Arc<SharedInner<S>>,
}

struct SharedInner<S> {
    source: tokio::sync::Mutex<S>,
    receiving: AtomicBool,
}

impl<S> Clone for SharedSource<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SharedSource<S> {
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                source: tokio::sync::Mutex::new(source),
                receiving: AtomicBool::new(false),
            }),
        }
    }
}

/// Clears the in-flight marker even if the receive future is dropped or the
/// underlying source panics.
struct ReceiveGuard<'a>(&'a AtomicBool);

impl Drop for ReceiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[async_trait]
impl<S: EventSource> EventSource for SharedSource<S> {
    async fn receive(&mut self) -> Result<Event, SourceError> {
        if self.inner.receiving.swap(true, Ordering::AcqRel) {
            panic!(
                "contract violation: receive issued while a previous receive \
                 is outstanding on this source"
            );
        }
        let _guard = ReceiveGuard(&self.inner.receiving);
        let mut source = self.inner.source.lock().await;
        source.receive().await
    }

    async fn release(&mut self) -> Result<(), ReleaseError> {
        let mut source = self.inner.source.lock().await;
        source.release().await
    }
}
