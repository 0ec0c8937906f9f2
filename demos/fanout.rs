//! Several independent subscribers on one queue-fed bridge: a printer, a
//! structured logger, and a deliberately faulty handler that demonstrates
//! dispatch containment.
//!
//! Run with: `cargo run --example fanout`

use std::time::Duration;

use fanbridge::source::QueueSource;
use fanbridge::subscribers::log_events;
use fanbridge::{Event, attach, handler, telemetry};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    telemetry::init();

    let (tx, source) = QueueSource::unbounded();
    let (bridge, pump) = attach(source);

    bridge
        .on("job", handler(|event| {
            println!("job {:?} done", event.str_field("name"));
        }))
        .on("job", log_events())
        .on("job", handler(|event| {
            // Contained at the dispatch boundary; the subscribers above
            // keep receiving every event.
            if event.str_field("name") == Some("unlucky") {
                panic!("flaky subscriber");
            }
        }));

    let producer = tokio::spawn(async move {
        for name in ["alpha", "unlucky", "omega"] {
            tx.send(Event::new("job").with("name", name)).expect("send");
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    producer.await.expect("producer");
    bridge.request_shutdown();
    pump.join().await.expect("pump shutdown");
}
