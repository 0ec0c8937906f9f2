//! Subscribe to a periodic tick source, print each count, and shut down
//! cleanly after five seconds.
//!
//! Run with: `cargo run --example tick`

use std::time::Duration;

use fanbridge::source::TickSource;
use fanbridge::{attach, handler, telemetry};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init();

    let (bridge, pump) = attach(TickSource::new(Duration::from_millis(500)));

    bridge
        .on("tick", handler(|event| {
            println!("{}", event.u64_field("count").unwrap_or_default());
        }))
        .on("error", handler(|event| {
            eprintln!("source fault: {event}");
        }));

    tokio::time::sleep(Duration::from_secs(5)).await;

    bridge.request_shutdown();
    pump.join().await.expect("pump shutdown");
}
