//! Worker thread lifecycle: pacing, cancellation, session notifications and
//! the abort path. Each test bounds its waits so a hung thread fails instead
//! of blocking the suite.

use std::time::{Duration, Instant};

use lockguard_core::mocks::{RecordingSession, Reading, ScriptedRangefinder};
use lockguard_core::{
    GuardError, GuardEvent, MonitorCfg, MonitorState, MonitorWorker, PresenceMonitor,
};

const WAIT: Duration = Duration::from_secs(5);

fn monitor(rf: ScriptedRangefinder, interval_ms: u64, sample_size: usize) -> PresenceMonitor {
    PresenceMonitor::builder()
        .with_rangefinder(rf)
        .with_session(RecordingSession::new())
        .with_config(MonitorCfg {
            interval_ms,
            sample_size,
            ..MonitorCfg::default()
        })
        .build()
        .expect("valid monitor")
}

fn wait_for(rx: &crossbeam_channel::Receiver<GuardEvent>, want: GuardEvent) {
    let deadline = Instant::now() + WAIT;
    loop {
        match rx.recv_deadline(deadline) {
            Ok(e) if e == want => return,
            Ok(_) => {}
            Err(e) => panic!("no {want:?} before deadline: {e}"),
        }
    }
}

#[test]
fn worker_locks_and_hands_the_monitor_back() {
    let mut m = monitor(ScriptedRangefinder::ranges([250]), 5, 3);
    let events = m.subscribe();

    let worker = MonitorWorker::spawn(m).expect("spawn");
    wait_for(&events, GuardEvent::Locked);

    let m = worker.stop().expect("join");
    assert!(m.is_locked());
    assert_eq!(m.state(), MonitorState::Locked);
}

#[test]
fn notifications_are_applied_while_waiting() {
    let mut m = monitor(ScriptedRangefinder::ranges([250]), 5, 2);
    let events = m.subscribe();
    let notifier = m.notifier();

    let worker = MonitorWorker::spawn(m).expect("spawn");
    wait_for(&events, GuardEvent::Locked);

    assert!(notifier.unlocked());
    wait_for(&events, GuardEvent::Unlocked);
    // Still far away: locks again from a fresh window.
    wait_for(&events, GuardEvent::Locked);
    drop(worker);
}

#[test]
fn stop_is_bounded_by_the_wait_not_the_interval() {
    let m = monitor(ScriptedRangefinder::ranges([90]), 60_000, 12);
    let worker = MonitorWorker::spawn(m).expect("spawn");
    std::thread::sleep(Duration::from_millis(20));

    let t0 = Instant::now();
    let m = worker.stop().expect("join");
    assert!(t0.elapsed() < Duration::from_secs(1), "stop took {:?}", t0.elapsed());
    assert_eq!(m.state(), MonitorState::Polling);
}

#[test]
fn abort_ends_the_thread_and_refuses_restart() {
    let mut m = monitor(
        ScriptedRangefinder::new([Reading::Cm(90), Reading::Closed]),
        1,
        12,
    );
    let events = m.subscribe();
    let worker = MonitorWorker::spawn(m).expect("spawn");
    wait_for(&events, GuardEvent::Abort);

    let deadline = Instant::now() + WAIT;
    while !worker.is_finished() {
        assert!(Instant::now() < deadline, "worker kept running after abort");
        std::thread::sleep(Duration::from_millis(5));
    }

    let m = worker.stop().expect("join");
    assert_eq!(m.state(), MonitorState::Aborted);
    let err = MonitorWorker::spawn(m).err().expect("aborted monitor refused");
    assert!(matches!(
        err.downcast_ref::<GuardError>(),
        Some(GuardError::State(_))
    ));
}

#[test]
fn dropping_workers_does_not_leak_threads() {
    for _ in 0..10 {
        let m = monitor(ScriptedRangefinder::ranges([90]), 2, 12);
        let worker = MonitorWorker::spawn(m).expect("spawn");
        std::thread::sleep(Duration::from_millis(5));
        drop(worker);
    }
}
