mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fanbridge::bridge::{BridgeConfig, EventBridge, handler};
use fanbridge::event::ERROR_KIND;
use fanbridge::pump::{EventPump, PumpError, PumpState, attach_with_config};
use fanbridge::source::{ScriptStep, ScriptedSource};
use fanbridge::subscribers::Recorder;

use common::{counts, tick, wait_until};

/// Scenario: two ticks, then the source closes; an external shutdown
/// request then stops the pump, which releases exactly once.
#[tokio::test]
async fn ticks_then_close_then_shutdown() {
    let source = ScriptedSource::new([
        ScriptStep::Emit(tick(1)),
        ScriptStep::Emit(tick(2)),
    ]);
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    let ticks = Recorder::new();
    bridge.on("tick", ticks.handler());

    let pump = EventPump::new(source, Arc::clone(&bridge)).spawn();
    wait_until(Duration::from_secs(2), || ticks.len() == 2).await;

    bridge.request_shutdown();
    wait_until(Duration::from_secs(2), || pump.is_stopped()).await;
    assert_eq!(pump.state(), PumpState::Stopped);
    pump.join().await.unwrap();

    assert_eq!(counts(&ticks), vec![1, 2]);
    assert_eq!(probe.releases(), 1);
}

/// Scenario: the first receive fails, the second succeeds; subscribers see
/// exactly one failure notification and the tick still arrives.
#[tokio::test]
async fn failed_receive_is_reported_and_consumption_continues() {
    let source = ScriptedSource::new([
        ScriptStep::Fail("boom".into()),
        ScriptStep::Emit(tick(1)),
    ])
    .pending_after();

    let bridge = Arc::new(EventBridge::new());
    let ticks = Recorder::new();
    let faults = Recorder::new();
    bridge
        .on("tick", ticks.handler())
        .on(ERROR_KIND, faults.handler());

    let _pump = EventPump::new(source, Arc::clone(&bridge)).spawn();
    wait_until(Duration::from_secs(2), || ticks.len() == 1).await;

    assert_eq!(counts(&ticks), vec![1]);
    assert_eq!(faults.len(), 1);
    let fault = &faults.snapshot()[0];
    assert_eq!(fault.kind(), ERROR_KIND);
    assert!(fault.str_field("message").unwrap().contains("boom"));
}

#[tokio::test]
async fn shutdown_before_first_receive_releases_without_receiving() {
    let source = ScriptedSource::new([ScriptStep::Emit(tick(1))]).pending_after();
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    bridge.request_shutdown();

    let pump = EventPump::new(source, bridge).spawn();
    pump.join().await.unwrap();

    assert_eq!(probe.receives(), 0);
    assert_eq!(probe.releases(), 1);
}

#[tokio::test]
async fn repeated_shutdown_requests_release_once() {
    let source = ScriptedSource::closed();
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    let pump = EventPump::new(source, Arc::clone(&bridge)).spawn();

    bridge.request_shutdown().request_shutdown();
    bridge.request_shutdown();
    pump.join().await.unwrap();

    assert_eq!(probe.releases(), 1);
}

/// An in-flight receive is never interrupted: a pump parked in a receive
/// stays `Awaiting` after a shutdown request.
#[tokio::test]
async fn shutdown_does_not_interrupt_inflight_receive() {
    let source = ScriptedSource::closed().pending_after();

    let bridge = Arc::new(EventBridge::new());
    let pump = EventPump::new(source, Arc::clone(&bridge)).spawn();
    wait_until(Duration::from_secs(2), || pump.state() == PumpState::Awaiting).await;

    bridge.request_shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pump.state(), PumpState::Awaiting);
}

#[tokio::test(start_paused = true)]
async fn receives_never_overlap() {
    let source = ScriptedSource::new(
        (1..=5u64)
            .map(|count| ScriptStep::Emit(tick(count)))
            .collect::<Vec<_>>(),
    )
    .with_latency(Duration::from_millis(20))
    .pending_after();
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    let ticks = Recorder::new();
    bridge.on("tick", ticks.handler());

    let _pump = EventPump::new(source, Arc::clone(&bridge)).spawn();
    wait_until(Duration::from_secs(10), || ticks.len() == 5).await;

    assert_eq!(probe.overlaps(), 0);
    assert!(probe.receives() >= 5);
    assert_eq!(counts(&ticks), vec![1, 2, 3, 4, 5]);
}

/// The next receive starts only after the blocking handler has returned.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_handler_delays_next_receive() {
    const BLOCK: Duration = Duration::from_millis(80);

    let source = ScriptedSource::new([
        ScriptStep::Emit(tick(1)),
        ScriptStep::Emit(tick(2)),
    ])
    .pending_after();
    let probe = source.probe();

    let returns: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let bridge = Arc::new(EventBridge::new());
    bridge.on("tick", {
        let returns = Arc::clone(&returns);
        handler(move |_| {
            std::thread::sleep(BLOCK);
            returns.lock().unwrap().push(tokio::time::Instant::now());
        })
    });

    let _pump = EventPump::new(source, Arc::clone(&bridge)).spawn();
    wait_until(Duration::from_secs(5), || returns.lock().unwrap().len() == 2).await;

    let starts = probe.receive_starts();
    let returns = returns.lock().unwrap().clone();
    assert!(starts.len() >= 2);
    assert!(
        starts[1] >= returns[0],
        "second receive must not start before the first handler returned"
    );
    assert!(starts[1] - starts[0] >= BLOCK);
}

#[tokio::test]
async fn failed_release_surfaces_on_join() {
    let source = ScriptedSource::closed().fail_release("device busy");
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    bridge.request_shutdown();

    let pump = EventPump::new(source, bridge).spawn();
    let error = pump.join().await.unwrap_err();
    assert!(matches!(error, PumpError::Release(_)));
    assert_eq!(probe.releases(), 1);
}

#[tokio::test]
async fn receive_failures_use_configured_kind() {
    let source = ScriptedSource::new([ScriptStep::Fail("boom".into())]).pending_after();

    let (bridge, _pump) =
        attach_with_config(source, BridgeConfig::default().with_error_kind("source-fault"));
    let faults = Recorder::new();
    let default_kind = Recorder::new();
    bridge
        .on("source-fault", faults.handler())
        .on(ERROR_KIND, default_kind.handler());

    wait_until(Duration::from_secs(2), || faults.len() == 1).await;

    assert!(default_kind.is_empty());
    let fault = &faults.snapshot()[0];
    assert_eq!(fault.kind(), "source-fault");
    assert!(fault.str_field("message").unwrap().contains("boom"));
}

/// A handler that panics on one event affects neither later events nor the
/// pump itself.
#[tokio::test]
async fn handler_fault_does_not_stop_delivery() {
    let source = ScriptedSource::new([
        ScriptStep::Emit(tick(1)),
        ScriptStep::Emit(tick(2)),
        ScriptStep::Emit(tick(3)),
    ]);
    let probe = source.probe();

    let bridge = Arc::new(EventBridge::new());
    let ticks = Recorder::new();
    bridge
        .on(
            "tick",
            handler(|event| {
                if event.u64_field("count") == Some(1) {
                    panic!("faulty subscriber");
                }
            }),
        )
        .on("tick", ticks.handler());

    // Stop as soon as the script reports closed.
    let stop = Arc::clone(&bridge);
    bridge.on(ERROR_KIND, handler(move |_| {
        stop.request_shutdown();
    }));

    EventPump::new(source, Arc::clone(&bridge))
        .run()
        .await
        .unwrap();

    assert_eq!(counts(&ticks), vec![1, 2, 3]);
    assert_eq!(probe.releases(), 1);
}
