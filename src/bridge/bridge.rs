use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::event::Event;
use crate::source::SourceError;

use super::cancel::CancelToken;
use super::config::BridgeConfig;
use super::handler::Handler;

/// Subscriber registry and synchronous dispatcher.
///
/// The bridge owns a per-kind handler registry and the cancellation token
/// its pump polls. It has no opinion about where events come from; the
/// pump pushes them in via [`dispatch`](Self::dispatch).
///
/// # Example
///
/// ```
/// use fanbridge::bridge::{EventBridge, handler};
/// use fanbridge::event::Event;
///
/// let bridge = EventBridge::new();
/// bridge
///     .on("tick", handler(|e| println!("count={:?}", e.u64_field("count"))))
///     .on("tick", handler(|e| println!("again: {e}")));
///
/// bridge.dispatch(&Event::new("tick").with("count", 1));
/// bridge.request_shutdown();
/// ```
pub struct EventBridge {
    handlers: Mutex<FxHashMap<String, Vec<Handler>>>,
    cancel: CancelToken,
    config: BridgeConfig,
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBridge {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            handlers: Mutex::new(FxHashMap::default()),
            cancel: CancelToken::new(),
            config,
        }
    }

    /// Register `handler` for `kind`. Returns the bridge for chaining.
    ///
    /// Registrations are not de-duplicated: registering the same handler
    /// twice for the same kind means it runs twice per event.
    pub fn on(&self, kind: impl Into<String>, handler: Handler) -> &Self {
        self.handlers
            .lock()
            .expect("handler registry poisoned")
            .entry(kind.into())
            .or_default()
            .push(handler);
        self
    }

    /// Remove the first registration of `handler` for `kind`, matching by
    /// `Arc` pointer identity. Registrations for other kinds and remaining
    /// registrations of the same handler are untouched.
    ///
    /// Returns whether a registration was removed.
    pub fn off(&self, kind: &str, handler: &Handler) -> bool {
        let mut registry = self.handlers.lock().expect("handler registry poisoned");
        let Some(registered) = registry.get_mut(kind) else {
            return false;
        };
        let Some(position) = registered.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        registered.remove(position);
        if registered.is_empty() {
            registry.remove(kind);
        }
        true
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers
            .lock()
            .expect("handler registry poisoned")
            .get(kind)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the event's kind, synchronously
    /// and in registration order.
    ///
    /// Handler faults — `Err` returns and panics alike — are contained
    /// here: logged at `warn` and never rethrown, so neither the remaining
    /// handlers for this event nor any later event is affected. Dispatch
    /// returns only after the last handler has.
    pub fn dispatch(&self, event: &Event) {
        // Snapshot under the lock, invoke outside it: handlers may
        // re-enter `on`/`off`.
        let snapshot: Vec<Handler> = {
            let registry = self.handlers.lock().expect("handler registry poisoned");
            registry.get(event.kind()).cloned().unwrap_or_default()
        };

        for (position, handler) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(
                        kind = event.kind(),
                        position,
                        %error,
                        "handler failed; continuing dispatch"
                    );
                }
                Err(payload) => {
                    tracing::warn!(
                        kind = event.kind(),
                        position,
                        panic = panic_message(payload.as_ref()),
                        "handler panicked; continuing dispatch"
                    );
                }
            }
        }
    }

    /// Report a failed receive to subscribers of the configured failure
    /// kind. Same containment as [`dispatch`](Self::dispatch), so the
    /// failure path can never throw back into the pump.
    pub(crate) fn dispatch_receive_failure(&self, error: &SourceError) {
        self.dispatch(&Event::receive_failure(self.config.error_kind(), error));
    }

    /// Set the cancellation flag. Returns the bridge for chaining.
    ///
    /// Fire-and-forget: the pump stops at its next iteration boundary, not
    /// here. Await [`PumpHandle::join`](crate::pump::PumpHandle::join) to
    /// observe actual termination. Requesting shutdown more than once has
    /// the same effect as requesting it once.
    pub fn request_shutdown(&self) -> &Self {
        self.cancel.cancel();
        self
    }

    /// The token polled by this bridge's pump.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
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
