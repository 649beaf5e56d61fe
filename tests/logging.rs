//! Simulation trace: CSV format, debug logger and logger failures.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use pdevs::logger::CSV_COLUMNS;
use pdevs::models::{Counter, Generator};
use pdevs::types::{ModelId, SimTime};
use pdevs::{
    AbstractSimulator, CoupledModel, Coupling, CsvLogger, ErrorClass, LogRecord, Logger,
    RecordingLogger, RootCoordinator,
};

// ============================================================================
// Helpers
// ============================================================================

/// A `Write` sink whose bytes stay readable after the logger is moved.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fails once, on the state record of `model` at `time`.
struct FlakyLogger {
    model: String,
    time: SimTime,
    armed: bool,
}

impl Logger for FlakyLogger {
    fn log_output(
        &mut self,
        _time: SimTime,
        _model_id: ModelId,
        _model_name: &str,
        _port_name: &str,
        _output: &str,
    ) -> io::Result<()> {
        Ok(())
    }

    fn log_state(
        &mut self,
        time: SimTime,
        _model_id: ModelId,
        model_name: &str,
        _state: &str,
    ) -> io::Result<()> {
        if self.armed && time == self.time && model_name == self.model {
            self.armed = false;
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "transmit buffer full"));
        }
        Ok(())
    }
}

fn pipeline(jobs: u64) -> CoupledModel {
    CoupledModel::new("top")
        .with_child(Generator::new(1.0).with_limit(jobs).into_model("gen").unwrap())
        .unwrap()
        .with_child(Counter::new().into_model("sink").unwrap())
        .unwrap()
        .with_coupling(Coupling::internal("gen", "out", "sink", "in"))
}

// ============================================================================
// CSV format
// ============================================================================

#[test]
fn test_csv_trace() {
    let buffer = SharedBuffer::default();
    let mut root = RootCoordinator::new(pipeline(2)).unwrap();
    root.set_logger(Box::new(CsvLogger::new(buffer.clone())));
    root.start().unwrap();
    root.simulate(10).unwrap();
    root.stop().unwrap();

    let text = buffer.contents();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], CSV_COLUMNS.join(" , "));
    assert_eq!(
        lines[1..],
        [
            "0 , 1 , gen ,  , next_job=0",
            "0 , 2 , sink ,  , count=0",
            "1 , 1 , gen , out , 0",
            "1 , 1 , gen ,  , next_job=1",
            "1 , 2 , sink ,  , count=1",
            "2 , 1 , gen , out , 1",
            "2 , 1 , gen ,  , next_job=2",
            "2 , 2 , sink ,  , count=2",
            "2 , 1 , gen ,  , next_job=2",
            "2 , 2 , sink ,  , count=2",
        ]
    );
}

#[test]
fn test_csv_custom_separator() {
    let buffer = SharedBuffer::default();
    let mut root = RootCoordinator::new(pipeline(1)).unwrap();
    root.set_logger(Box::new(CsvLogger::with_separator(buffer.clone(), ";")));
    root.start().unwrap();
    root.simulate(10).unwrap();
    root.stop().unwrap();

    let text = buffer.contents();
    assert!(text.starts_with("time;model_id;model_name;port_name;data\n"));
    assert!(text.contains("1;1;gen;out;0\n"));
}

// ============================================================================
// Debug logger
// ============================================================================

#[test]
fn test_debug_logger_mirrors_primary() {
    let primary = RecordingLogger::new();
    let debug = RecordingLogger::new();
    let (p, d) = (primary.handle(), debug.handle());

    let mut root = RootCoordinator::new(pipeline(3)).unwrap();
    root.set_logger(Box::new(primary));
    root.set_debug_logger(Box::new(debug));
    root.start().unwrap();
    root.simulate(10).unwrap();
    root.stop().unwrap();

    assert!(!p.is_empty());
    assert_eq!(p.records(), d.records());
}

#[test]
fn test_debug_logger_alone() {
    let debug = RecordingLogger::new();
    let d = debug.handle();

    let mut root = RootCoordinator::new(pipeline(2)).unwrap();
    root.set_debug_logger(Box::new(debug));
    root.start().unwrap();
    root.simulate(10).unwrap();

    assert_eq!(d.times(), vec![1.0, 2.0]);
}

// ============================================================================
// Logger failures
// ============================================================================

#[test]
fn test_logger_failure_leaves_tree_consistent() {
    let mut root = RootCoordinator::new(pipeline(5)).unwrap();
    root.set_logger(Box::new(FlakyLogger {
        model: "gen".to_string(),
        time: 2.0,
        armed: true,
    }));
    root.start().unwrap();
    root.simulate(1).unwrap();

    let err = root.simulate(1).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Environment);

    // both children finished the instant at t=2
    let top = root.top_coordinator();
    let gen = top.child("gen").unwrap();
    let sink = top.child("sink").unwrap();
    assert_eq!(gen.time_last(), 2.0);
    assert_eq!(gen.time_next(), 3.0);
    assert_eq!(sink.time_last(), 2.0);
    assert_eq!(sink.export_stats()["external_transitions"], 2);
    assert_eq!(root.time_last(), 2.0);
    assert_eq!(root.time_next(), 3.0);
    assert!(gen.component().out_empty());
    assert!(sink.component().in_empty());

    // the run resumes from where it stopped
    assert_eq!(root.simulate(10).unwrap(), 3);
    assert_eq!(root.stats().last_event_time, Some(5.0));
}

#[test]
fn test_logger_failure_at_start() {
    let mut root = RootCoordinator::new(pipeline(1)).unwrap();
    root.set_logger(Box::new(FlakyLogger {
        model: "sink".to_string(),
        time: 0.0,
        armed: true,
    }));
    let err = root.start().unwrap_err();
    assert!(err.to_string().contains("transmit buffer full"));
}

#[test]
fn test_logger_failure_at_start_still_schedules_tree() {
    let mut root = RootCoordinator::new(pipeline(3)).unwrap();
    root.set_logger(Box::new(FlakyLogger {
        model: "gen".to_string(),
        time: 0.0,
        armed: true,
    }));

    let err = root.start().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Environment);

    // the sibling after the failing model was started too
    let top = root.top_coordinator();
    assert_eq!(top.child("gen").unwrap().time_next(), 1.0);
    assert_eq!(top.child("sink").unwrap().time_last(), 0.0);
    assert_eq!(root.time_next(), 1.0);

    assert_eq!(root.simulate(10).unwrap(), 3);
}

#[test]
fn test_logger_failure_at_stop_logs_every_model_and_stops_loggers() {
    let debug = RecordingLogger::new();
    let d = debug.handle();

    let mut root = RootCoordinator::new(pipeline(2)).unwrap();
    root.set_debug_logger(Box::new(debug));
    root.start().unwrap();
    root.simulate(10).unwrap();

    root.set_logger(Box::new(FlakyLogger {
        model: "gen".to_string(),
        time: 2.0,
        armed: true,
    }));
    let err = root.stop().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Environment);

    // the debug trace still has both final states and the stop record
    let records = d.records();
    assert_eq!(records.last(), Some(&LogRecord::Stop));
    assert_eq!(d.states_of("gen").len(), 4);
    assert_eq!(d.states_of("sink").last().unwrap(), &(2.0, "count=2".to_string()));
    assert_eq!(d.states_of("sink").len(), 4);
}
