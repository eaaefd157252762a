//! Integration tests: Dispatcher → Queue → Serializer → LineRegistry.

use std::time::{Duration, Instant};

use axum::http::Method;
use irrigator::adapters::sim::SimBench;
use irrigator::app::dispatcher::Dispatch;
use irrigator::app::events::AppEvent;
use irrigator::app::queue::ActivationRequest;
use irrigator::drivers::registry::PlantId;

use super::mock_rig::{MockRig, basil, pump, tomatoes, wait_until};

const SLACK: Duration = Duration::from_millis(500);

fn short(plant: usize, name: &str, millis: u64) -> ActivationRequest {
    ActivationRequest {
        plant: PlantId::new(plant),
        name: name.to_owned(),
        hold: Duration::from_millis(millis),
    }
}

#[test]
fn post_energizes_pump_then_valve_then_releases_after_duration() {
    let rig = MockRig::start();
    let started = Instant::now();

    assert!(matches!(
        rig.dispatcher.dispatch(&Method::POST, "/tomatoes"),
        Dispatch::Accepted { .. }
    ));

    assert!(wait_until(SLACK, || rig.is_active(&tomatoes())));
    assert!(rig.is_active(&pump()));

    assert!(wait_until(Duration::from_secs(1) + SLACK, || rig.all_inactive()));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(950), "released early: {elapsed:?}");

    let order: Vec<_> = rig
        .bench
        .writes()
        .iter()
        .map(|w| (w.gpio.line, w.high))
        .collect();
    assert_eq!(order, vec![(4, false), (17, false), (17, true), (4, true)]);

    assert!(rig.wait_idle(SLACK));
    let events = rig.sink.snapshot();
    assert!(matches!(events[0], AppEvent::ActivationStarted { .. }));
    assert!(matches!(events[1], AppEvent::Energized { .. }));
    assert!(matches!(events[2], AppEvent::ActivationCompleted { .. }));
}

#[test]
fn requests_during_hold_are_busy_and_touch_nothing() {
    let rig = MockRig::start();
    rig.queue.try_enqueue(short(0, "tomatoes", 400)).unwrap();
    assert!(wait_until(SLACK, || rig.is_active(&tomatoes())));

    for path in ["/tomatoes", "/basil"] {
        assert!(matches!(
            rig.dispatcher.dispatch(&Method::POST, path),
            Dispatch::Busy { .. }
        ));
    }

    assert!(rig.wait_idle(Duration::from_millis(400) + SLACK));
    assert!(
        rig.bench.writes().iter().all(|w| w.gpio != basil()),
        "busy request must not drive basil's valve"
    );
}

#[test]
fn slot_frees_after_completion() {
    let rig = MockRig::start();
    rig.queue.try_enqueue(short(0, "tomatoes", 50)).unwrap();
    assert!(rig.wait_idle(SLACK));

    rig.queue.try_enqueue(short(1, "basil", 50)).unwrap();
    assert!(wait_until(SLACK, || rig.is_active(&basil())));
    assert!(!rig.is_active(&tomatoes()));
    assert!(rig.wait_idle(SLACK));
    assert!(rig.all_inactive());
}

#[test]
fn valve_failure_still_releases_both_lines() {
    let bench = SimBench::new();
    let rig = MockRig::start_with(bench.clone());
    bench.fail_writes(&tomatoes(), 1);

    rig.queue.try_enqueue(short(0, "tomatoes", 5_000)).unwrap();
    assert!(rig.wait_idle(SLACK), "failed activation must not hold");

    let writes = bench.writes();
    let valve: Vec<_> = writes.iter().filter(|w| w.gpio == tomatoes()).collect();
    let pumps: Vec<_> = writes.iter().filter(|w| w.gpio == pump()).collect();
    assert_eq!(valve.len(), 2, "energize attempt + cleanup");
    assert!(!valve[0].applied);
    assert!(valve[1].high);
    assert_eq!(pumps.len(), 2);
    assert!(pumps[1].high && pumps[1].applied);
    assert!(rig.all_inactive());

    let events = rig.sink.snapshot();
    assert!(events.iter().any(|e| matches!(e, AppEvent::ActivationFailed { .. })));
    assert!(!events.iter().any(|e| matches!(e, AppEvent::Energized { .. })));
}

#[test]
fn pump_failure_skips_valve_and_cleans_up() {
    let bench = SimBench::new();
    let rig = MockRig::start_with(bench.clone());
    bench.fail_writes(&pump(), 1);

    rig.queue.try_enqueue(short(1, "basil", 5_000)).unwrap();
    assert!(rig.wait_idle(SLACK));

    let order: Vec<_> = bench
        .writes()
        .iter()
        .map(|w| (w.gpio.line, w.high, w.applied))
        .collect();
    assert_eq!(
        order,
        vec![(4, false, false), (27, true, true), (4, true, true)]
    );
    assert!(rig.all_inactive());
}

#[test]
fn worker_survives_failures() {
    let bench = SimBench::new();
    let rig = MockRig::start_with(bench.clone());
    bench.fail_writes(&tomatoes(), 1);

    rig.queue.try_enqueue(short(0, "tomatoes", 50)).unwrap();
    assert!(rig.wait_idle(SLACK));

    rig.queue.try_enqueue(short(0, "tomatoes", 50)).unwrap();
    assert!(wait_until(SLACK, || rig.is_active(&tomatoes())));
    assert!(rig.wait_idle(SLACK));
    assert!(
        rig.sink
            .snapshot()
            .iter()
            .any(|e| matches!(e, AppEvent::ActivationCompleted { .. }))
    );
}

#[test]
fn release_failure_is_reported() {
    let bench = SimBench::new();
    let rig = MockRig::start_with(bench.clone());
    rig.queue.try_enqueue(short(0, "tomatoes", 100)).unwrap();
    assert!(wait_until(SLACK, || rig.is_active(&tomatoes())));
    bench.fail_writes(&tomatoes(), 1);

    assert!(rig.wait_idle(SLACK));
    assert!(!rig.is_active(&pump()), "pump released despite valve failure");
    assert!(
        rig.sink
            .snapshot()
            .iter()
            .any(|e| matches!(e, AppEvent::ReleaseFailed { .. }))
    );
}

#[test]
fn shutdown_interrupts_hold_and_turns_everything_off() {
    let rig = MockRig::start();
    rig.queue.try_enqueue(short(1, "basil", 60_000)).unwrap();
    assert!(wait_until(SLACK, || rig.is_active(&basil())));

    let bench = rig.bench.clone();
    let sink = rig.sink.clone();
    let started = Instant::now();
    let registry = rig.stop();
    assert!(started.elapsed() < SLACK);

    assert_eq!(registry.plant_count(), 2);
    assert!(bench.levels().values().all(|high| *high));

    let events = sink.snapshot();
    assert!(matches!(
        events[events.len() - 2],
        AppEvent::ActivationInterrupted { .. }
    ));
    assert_eq!(events.last(), Some(&AppEvent::WorkerStopped));
}

#[test]
fn idle_shutdown_stops_worker() {
    let rig = MockRig::start();
    let sink = rig.sink.clone();
    let _registry = rig.stop();
    assert_eq!(sink.snapshot(), vec![AppEvent::WorkerStopped]);
}
