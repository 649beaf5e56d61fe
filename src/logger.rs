//! Simulation trace loggers.
//!
//! A [`Logger`] receives the simulation trace: the advancing time, every
//! output message and every state an atomic model takes. The root
//! coordinator owns at most two of them (primary and debug) inside a
//! [`Loggers`] context that is handed down the model tree on every call
//! that may log.
//!
//! Each logger sits behind its own `parking_lot::Mutex`. Writers take the
//! lock for one coherent burst of records through [`Loggers::burst`]; the
//! guard is dropped when the burst ends, on the error path included.
//!
//! This module is the simulation trace only. Kernel diagnostics go through
//! `tracing`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::types::{ModelId, SimTime};

/// Column names of the comma-separated trace format.
pub const CSV_COLUMNS: [&str; 5] = ["time", "model_id", "model_name", "port_name", "data"];

/// A sink for the simulation trace.
pub trait Logger: Send {
    /// Called once when the simulation starts.
    fn start(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called once when the simulation stops.
    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// The simulation is about to execute the instant `time`.
    fn log_time(&mut self, _time: SimTime) -> io::Result<()> {
        Ok(())
    }

    /// An atomic model produced `output` on `port_name` at `time`.
    fn log_output(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        port_name: &str,
        output: &str,
    ) -> io::Result<()>;

    /// An atomic model is in `state` at `time`.
    fn log_state(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        state: &str,
    ) -> io::Result<()>;
}

/// The primary and debug loggers of one simulation, both optional.
#[derive(Default)]
pub struct Loggers {
    primary: Option<Mutex<Box<dyn Logger>>>,
    debug: Option<Mutex<Box<dyn Logger>>>,
}

impl Loggers {
    /// An empty context: nothing is logged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the primary logger.
    pub fn set_primary(&mut self, logger: Box<dyn Logger>) {
        self.primary = Some(Mutex::new(logger));
    }

    /// Sets (or replaces) the debug logger.
    pub fn set_debug(&mut self, logger: Box<dyn Logger>) {
        self.debug = Some(Mutex::new(logger));
    }

    /// Returns `true` if a primary logger is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Returns `true` if a debug logger is configured.
    pub fn has_debug(&self) -> bool {
        self.debug.is_some()
    }

    /// Returns `true` if no logger is configured.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.debug.is_none()
    }

    /// Runs `write` against each configured logger, primary first, holding
    /// that logger's lock for the whole call. Every logger gets the burst;
    /// the first failure is returned.
    pub fn burst<F>(&self, mut write: F) -> io::Result<()>
    where
        F: FnMut(&mut dyn Logger) -> io::Result<()>,
    {
        let mut first = None;
        for slot in [&self.primary, &self.debug].into_iter().flatten() {
            let mut guard = slot.lock();
            if let Err(e) = write(&mut **guard) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Starts every configured logger.
    pub fn start(&self) -> io::Result<()> {
        self.burst(|l| l.start())
    }

    /// Stops every configured logger.
    pub fn stop(&self) -> io::Result<()> {
        self.burst(|l| l.stop())
    }

    /// Logs the advancing simulation time.
    pub fn log_time(&self, time: SimTime) -> io::Result<()> {
        self.burst(|l| l.log_time(time))
    }
}

impl std::fmt::Debug for Loggers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loggers")
            .field("primary", &self.has_primary())
            .field("debug", &self.has_debug())
            .finish()
    }
}

/// Streams the trace as separated text, one record per line.
///
/// The header is `time , model_id , model_name , port_name , data`. State
/// records leave the port column empty. Write failures (a full transmit
/// buffer on a serial line, a closed pipe) are returned to the caller.
#[derive(Debug)]
pub struct CsvLogger<W: Write + Send> {
    sink: W,
    sep: String,
}

impl<W: Write + Send> CsvLogger<W> {
    /// Creates a logger writing to `sink` with the ` , ` separator.
    pub fn new(sink: W) -> Self {
        Self::with_separator(sink, " , ")
    }

    /// Creates a logger writing to `sink` with a custom column separator.
    pub fn with_separator(sink: W, sep: impl Into<String>) -> Self {
        Self {
            sink,
            sep: sep.into(),
        }
    }

    /// Returns the header line (without the newline).
    pub fn header(&self) -> String {
        CSV_COLUMNS.join(self.sep.as_str())
    }

    /// Consumes the logger, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl CsvLogger<io::Stdout> {
    /// A logger writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl CsvLogger<BufWriter<File>> {
    /// A logger writing to a newly created file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> Logger for CsvLogger<W> {
    fn start(&mut self) -> io::Result<()> {
        let header = self.header();
        writeln!(self.sink, "{}", header)
    }

    fn stop(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    fn log_output(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        port_name: &str,
        output: &str,
    ) -> io::Result<()> {
        let sep = &self.sep;
        writeln!(
            self.sink,
            "{time}{sep}{model_id}{sep}{model_name}{sep}{port_name}{sep}{output}"
        )
    }

    fn log_state(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        state: &str,
    ) -> io::Result<()> {
        let sep = &self.sep;
        writeln!(self.sink, "{time}{sep}{model_id}{sep}{model_name}{sep}{sep}{state}")
    }
}

/// One record of the simulation trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogRecord {
    Start,
    Stop,
    Time(SimTime),
    Output {
        time: SimTime,
        model_id: ModelId,
        model: String,
        port: String,
        data: String,
    },
    State {
        time: SimTime,
        model_id: ModelId,
        model: String,
        state: String,
    },
}

/// Keeps the trace in memory.
///
/// The records live behind a shared handle, so a caller can keep a
/// [`RecordingLogger::handle`] after handing the logger to a simulation.
#[derive(Clone, Debug, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordingLogger {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle sharing this recorder's records.
    pub fn handle(&self) -> RecordingLogger {
        self.clone()
    }

    /// Returns a copy of all records so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the logged times, in order.
    pub fn times(&self) -> Vec<SimTime> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::Time(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Returns the output records as `(time, model, port, data)`.
    pub fn outputs(&self) -> Vec<(SimTime, String, String, String)> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::Output {
                    time,
                    model,
                    port,
                    data,
                    ..
                } => Some((*time, model.clone(), port.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns the state records of `model` as `(time, state)`.
    pub fn states_of(&self, model: &str) -> Vec<(SimTime, String)> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                LogRecord::State {
                    time,
                    model: m,
                    state,
                    ..
                } if m == model => Some((*time, state.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Logger for RecordingLogger {
    fn start(&mut self) -> io::Result<()> {
        self.records.lock().push(LogRecord::Start);
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        self.records.lock().push(LogRecord::Stop);
        Ok(())
    }

    fn log_time(&mut self, time: SimTime) -> io::Result<()> {
        self.records.lock().push(LogRecord::Time(time));
        Ok(())
    }

    fn log_output(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        port_name: &str,
        output: &str,
    ) -> io::Result<()> {
        self.records.lock().push(LogRecord::Output {
            time,
            model_id,
            model: model_name.to_string(),
            port: port_name.to_string(),
            data: output.to_string(),
        });
        Ok(())
    }

    fn log_state(
        &mut self,
        time: SimTime,
        model_id: ModelId,
        model_name: &str,
        state: &str,
    ) -> io::Result<()> {
        self.records.lock().push(LogRecord::State {
            time,
            model_id,
            model: model_name.to_string(),
            state: state.to_string(),
        });
        Ok(())
    }
}
