//! # fanbridge: single-consumer channels, multi-subscriber events
//!
//! fanbridge turns a single-consumer asynchronous event source into a
//! multi-subscriber, in-process event interface with graceful shutdown.
//! One pump task drains the source; each event is fanned out synchronously,
//! in registration order, to the handlers currently subscribed to its kind.
//!
//! ## Core Concepts
//!
//! - **Events**: discriminated `{kind, payload}` records
//! - **Sources**: single-consumer producers behind the [`EventSource`] trait
//! - **Bridge**: per-kind handler registry with fault-contained dispatch
//! - **Pump**: the one loop binding a source to a bridge
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use fanbridge::{attach, handler};
//! use fanbridge::source::TickSource;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (bridge, pump) = attach(TickSource::new(Duration::from_millis(500)));
//!
//!     bridge
//!         .on("tick", handler(|e| println!("count={:?}", e.u64_field("count"))))
//!         .on("error", handler(|e| eprintln!("source fault: {e}")));
//!
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!
//!     // Cooperative: the pump stops at its next iteration boundary and
//!     // releases the source exactly once.
//!     bridge.request_shutdown();
//!     pump.join().await.unwrap();
//! }
//! ```
//!
//! ## Delivery Guarantees
//!
//! - Dispatch order equals production order; iterations never overlap, so
//!   a handler registered for a kind sees exactly the subsequence of
//!   events with that kind, each exactly once.
//! - Dispatch is synchronous relative to the pump: every handler for one
//!   event returns before the next receive is issued. Backpressure is
//!   implicit — a slow handler delays the next pull; nothing is buffered
//!   ahead of consumption.
//! - A faulting handler (error return or panic) is contained at the
//!   dispatch boundary and cannot stop its peers or later events.
//! - A failed receive is reported to subscribers of the reserved failure
//!   kind ([`event::ERROR_KIND`]) and never halts the pump; only
//!   cancellation does.
//!
//! ## Module Guide
//!
//! - [`event`] - The event record and the reserved failure kind
//! - [`bridge`] - Registry, dispatch, cancellation token, configuration
//! - [`pump`] - The consumption loop, its states, and the join handle
//! - [`source`] - The source contract plus tick/queue/scripted sources
//! - [`subscribers`] - Ready-made handlers: recorder, logger, async tap
//! - [`telemetry`] - Tracing subscriber setup for binaries

pub mod bridge;
pub mod event;
pub mod pump;
pub mod source;
pub mod subscribers;
pub mod telemetry;

pub use bridge::{
    BridgeConfig, CancelToken, EventBridge, Handler, HandlerError, handler, try_handler,
};
pub use event::{ERROR_KIND, Event};
pub use pump::{EventPump, PumpError, PumpHandle, PumpState, attach, attach_with_config};
pub use source::{EventSource, ReleaseError, SourceError};
