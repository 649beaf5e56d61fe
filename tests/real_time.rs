//! Real-time paced execution with scripted clocks.

use std::sync::Arc;

use parking_lot::Mutex;

use pdevs::models::{Counter, Generator};
use pdevs::{
    CoupledModel, Coupling, ErrorClass, RealTimeClock, RecordingLogger, RootCoordinator, SimError,
    SimResult, SimTime, SystemClock, VirtualClock,
};

// ============================================================================
// Scripted clocks
// ============================================================================

/// Returns exactly what is asked, plus `late`, and remembers each request.
struct ScriptedClock {
    requests: Arc<Mutex<Vec<SimTime>>>,
    late: SimTime,
}

impl ScriptedClock {
    fn new(late: SimTime) -> (Self, Arc<Mutex<Vec<SimTime>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let clock = Self {
            requests: Arc::clone(&requests),
            late,
        };
        (clock, requests)
    }
}

impl RealTimeClock for ScriptedClock {
    fn wait_for(&mut self, duration: SimTime) -> SimResult<SimTime> {
        self.requests.lock().push(duration);
        Ok(duration + self.late)
    }
}

/// Fails on the `n`-th wait.
struct BrokenClock {
    n: usize,
}

impl RealTimeClock for BrokenClock {
    fn wait_for(&mut self, duration: SimTime) -> SimResult<SimTime> {
        if self.n == 0 {
            return Err(SimError::Clock("timer device unavailable".to_string()));
        }
        self.n -= 1;
        Ok(duration)
    }
}

fn ticking(period: SimTime) -> CoupledModel {
    CoupledModel::new("top")
        .with_child(Generator::new(period).into_model("gen").unwrap())
        .unwrap()
        .with_child(Counter::new().into_model("sink").unwrap())
        .unwrap()
        .with_coupling(Coupling::internal("gen", "out", "sink", "in"))
}

fn paced(model: CoupledModel, clock: Box<dyn RealTimeClock>) -> (RootCoordinator, RecordingLogger) {
    let recorder = RecordingLogger::new();
    let handle = recorder.handle();
    let mut root = RootCoordinator::new(model).unwrap();
    root.set_logger(Box::new(recorder));
    root.set_clock(clock);
    root.start().unwrap();
    (root, handle)
}

// ============================================================================
// Pacing bound
// ============================================================================

#[test]
fn test_no_cycle_beyond_duration() {
    let (clock, requests) = ScriptedClock::new(0.0);
    let (mut root, log) = paced(ticking(0.3), Box::new(clock));

    let cycles = root.simulate_for(2.0).unwrap();

    let times = log.times();
    assert_eq!(cycles, 6);
    assert_eq!(times.len(), 6);
    assert!(times.iter().all(|t| *t <= 2.0));
    assert!(root.time_next() > 2.0);
    assert_eq!(requests.lock().len(), 6);
}

#[test]
fn test_event_at_boundary_is_excluded() {
    let (mut root, log) = paced(ticking(1.0), Box::new(VirtualClock::new()));
    assert_eq!(root.simulate_for(3.0).unwrap(), 2);
    assert_eq!(log.times(), vec![1.0, 2.0]);
}

#[test]
fn test_waits_match_event_spacing() {
    let (clock, requests) = ScriptedClock::new(0.0);
    let (mut root, _) = paced(ticking(0.5), Box::new(clock));

    root.simulate_for(2.1).unwrap();
    assert_eq!(*requests.lock(), vec![0.5, 0.5, 0.5, 0.5]);
}

#[test]
fn test_duration_is_relative_to_last_event() {
    let (clock, requests) = ScriptedClock::new(0.0);
    let (mut root, log) = paced(ticking(1.0), Box::new(clock));

    root.simulate_for(2.5).unwrap();
    root.simulate_for(2.5).unwrap();

    assert_eq!(log.times(), vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(requests.lock().len(), 4);
}

// ============================================================================
// Drift
// ============================================================================

#[test]
fn test_late_clock_does_not_move_events() {
    let (clock, requests) = ScriptedClock::new(0.2);
    let (mut root, log) = paced(ticking(1.0), Box::new(clock));

    root.simulate_for(4.5).unwrap();

    assert_eq!(log.times(), vec![1.0, 2.0, 3.0, 4.0]);
    // each lateness is absorbed by the next wait
    let requests = requests.lock().clone();
    assert_eq!(requests[0], 1.0);
    for r in &requests[1..] {
        assert!((r - 0.8).abs() < 1e-9, "unexpected wait {r}");
    }
    assert!((root.stats().max_drift - 0.2).abs() < 1e-9);
}

#[test]
fn test_very_late_clock_never_waits_negative() {
    let (clock, requests) = ScriptedClock::new(3.0);
    let (mut root, log) = paced(ticking(1.0), Box::new(clock));

    root.simulate_for(5.5).unwrap();

    assert_eq!(log.times(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(requests.lock().iter().all(|r| *r >= 0.0));
}

// ============================================================================
// Failures and the wall clock
// ============================================================================

#[test]
fn test_clock_failure_is_environment_error() {
    let (mut root, log) = paced(ticking(1.0), Box::new(BrokenClock { n: 2 }));

    let err = root.simulate_for(10.0).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Environment);
    assert_eq!(log.times(), vec![1.0, 2.0]);

    // the tree is between cycles and can carry on
    assert_eq!(root.time_last(), 2.0);
    assert_eq!(root.time_next(), 3.0);
    assert_eq!(root.simulate(1).unwrap(), 1);
}

#[test]
fn test_system_clock_paces_run() {
    // 1 time unit = 2 ms
    let clock = SystemClock::new().with_scale(0.002);
    let (mut root, log) = paced(ticking(1.0), Box::new(clock));

    let timer = pdevs::Timer::start();
    root.simulate_for(5.5).unwrap();

    assert_eq!(log.times().len(), 5);
    assert!(timer.elapsed_ms() >= 10.0);
}
