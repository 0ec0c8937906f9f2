use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::event::Event;

/// A subscriber callback.
///
/// Handlers are shared callables; the same `Arc` may be registered more
/// than once (and is then invoked once per registration), and removal via
/// [`EventBridge::off`](crate::bridge::EventBridge::off) matches by `Arc`
/// pointer identity.
pub type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Fault reported by a subscriber callback.
///
/// Contained at the dispatch boundary: logged, never rethrown, and without
/// effect on other handlers or later events. Panics inside handlers are
/// contained the same way.
#[derive(Debug, Error, Diagnostic)]
#[error("handler failed: {message}")]
#[diagnostic(code(fanbridge::bridge::handler))]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Wrap an infallible closure as a [`Handler`].
///
/// # Example
///
/// ```
/// use fanbridge::bridge::{EventBridge, handler};
///
/// let bridge = EventBridge::new();
/// bridge.on("tick", handler(|event| println!("{event}")));
/// ```
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(move |event| {
        f(event);
        Ok(())
    })
}

/// Wrap a fallible closure as a [`Handler`].
pub fn try_handler<F>(f: F) -> Handler
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}
