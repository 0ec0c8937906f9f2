//! Subscriber registry and synchronous dispatcher.
//!
//! [`EventBridge`] decouples event production cadence from an arbitrary
//! number of independent subscribers: handlers register per event kind,
//! dispatch runs them synchronously in registration order, and faults are
//! contained at the dispatch boundary so one bad subscriber can never stop
//! delivery to the rest.

pub mod bridge;
pub mod cancel;
pub mod config;
pub mod handler;

pub use bridge::EventBridge;
pub use cancel::CancelToken;
pub use config::BridgeConfig;
pub use handler::{Handler, HandlerError, handler, try_handler};
