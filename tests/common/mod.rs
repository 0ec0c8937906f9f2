#![allow(dead_code)]

use std::time::Duration;

use fanbridge::event::Event;
use fanbridge::subscribers::Recorder;

/// Poll `cond` until it holds, failing the test after `deadline`.
pub async fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) {
    let limit = tokio::time::Instant::now() + deadline;
    while !cond() {
        assert!(
            tokio::time::Instant::now() < limit,
            "condition not met within {deadline:?}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub fn tick(count: u64) -> Event {
    Event::new("tick").with("count", count)
}

/// The `count` fields of every recorded event, in delivery order.
pub fn counts(recorder: &Recorder) -> Vec<u64> {
    recorder
        .snapshot()
        .iter()
        .filter_map(|event| event.u64_field("count"))
        .collect()
}
