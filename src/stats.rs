//! Run statistics: what the model tree did and how fast.
//!
//! [`StatsCollector`] wraps a run with a wall-clock [`Timer`] and folds the
//! tree returned by `RootCoordinator::export_stats` into a flat
//! [`SimulationStats`], which exports as JSON, CSV or a readable summary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::types::{ModelId, SimTime};

/// Flattened statistics of one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    pub run: RunInfo,
    pub root: RootSummary,
    /// One entry per atomic model, ordered by model id
    pub models: Vec<ModelStats>,
    pub throughput: Throughput,
}

/// Identification of a run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    pub version: String,
    pub config_file: Option<String>,
    /// Unix seconds
    pub started_at: Option<u64>,
    /// Unix seconds
    pub finished_at: Option<u64>,
}

/// Counters of the root and of the whole tree.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RootSummary {
    /// Time of the last executed cycle
    pub final_time: Option<SimTime>,
    pub cycles: u64,
    /// Largest real-time lateness observed
    pub max_drift: SimTime,
    /// Models in the tree, coupled ones included
    pub model_count: usize,
    pub atomic_count: usize,
    /// Messages copied along couplings, over all coordinators
    pub messages_routed: u64,
}

/// Counters of one atomic model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub id: ModelId,
    pub name: String,
    pub collections: u64,
    pub internal: u64,
    pub external: u64,
    pub confluent: u64,
}

impl ModelStats {
    /// Total transitions of any kind.
    pub fn transitions(&self) -> u64 {
        self.internal + self.external + self.confluent
    }

    fn from_node(node: &Value) -> Self {
        let count = |key: &str| node[key].as_u64().unwrap_or(0);
        Self {
            id: count("model_id"),
            name: node["model"].as_str().unwrap_or_default().to_string(),
            collections: count("collections"),
            internal: count("internal_transitions"),
            external: count("external_transitions"),
            confluent: count("confluent_transitions"),
        }
    }
}

/// Rates measured against the wall clock.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Throughput {
    pub wall_time_ms: f64,
    pub sim_time_per_second: f64,
    pub cycles_per_second: f64,
    pub transitions_per_second: f64,
}

impl SimulationStats {
    /// Empty statistics stamped with the crate version.
    pub fn new() -> Self {
        let mut stats = Self::default();
        stats.run.version = env!("CARGO_PKG_VERSION").to_string();
        stats
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.run.name = name.into();
        self
    }

    pub fn record_start(&mut self) {
        self.run.started_at = Some(unix_seconds());
    }

    pub fn record_end(&mut self) {
        self.run.finished_at = Some(unix_seconds());
    }

    /// Total transitions over all atomic models.
    pub fn total_transitions(&self) -> u64 {
        self.models.iter().map(ModelStats::transitions).sum()
    }

    /// Derives the rates from the wall time the run took.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        let per_second = |n: f64| {
            if wall_time_ms > 0.0 {
                n * 1000.0 / wall_time_ms
            } else {
                0.0
            }
        };
        self.throughput = Throughput {
            wall_time_ms,
            sim_time_per_second: per_second(self.root.final_time.unwrap_or(0.0)),
            cycles_per_second: per_second(self.root.cycles as f64),
            transitions_per_second: per_second(self.total_transitions() as f64),
        };
    }

    /// Headline figures as `(metric, value)` pairs.
    fn metrics(&self) -> Vec<(&'static str, String)> {
        let final_time = self.root.final_time.map(|t| t.to_string()).unwrap_or_default();
        vec![
            ("final_time", final_time),
            ("cycles", self.root.cycles.to_string()),
            ("max_drift", self.root.max_drift.to_string()),
            ("model_count", self.root.model_count.to_string()),
            ("atomic_count", self.root.atomic_count.to_string()),
            ("messages_routed", self.root.messages_routed.to_string()),
            ("transitions", self.total_transitions().to_string()),
            ("wall_time_ms", format!("{:.2}", self.throughput.wall_time_ms)),
            ("sim_time_per_second", format!("{:.2}", self.throughput.sim_time_per_second)),
            ("cycles_per_second", format!("{:.2}", self.throughput.cycles_per_second)),
        ]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Headline figures as `metric,value` CSV.
    pub fn to_csv(&self) -> String {
        self.metrics()
            .into_iter()
            .fold(String::from("metric,value\n"), |mut csv, (metric, value)| {
                csv.push_str(metric);
                csv.push(',');
                csv.push_str(&value);
                csv.push('\n');
                csv
            })
    }

    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// One CSV row per atomic model.
    pub fn models_to_csv(&self) -> String {
        let mut csv = String::from("model_id,model_name,collections,internal,external,confluent\n");
        for m in &self.models {
            csv += &format!(
                "{},{},{},{},{},{}\n",
                m.id, m.name, m.collections, m.internal, m.external, m.confluent
            );
        }
        csv
    }

    pub fn models_to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.models_to_csv())
    }

    /// Writes the headline figures, then a table of atomic models.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        let title = if self.run.name.is_empty() {
            "simulation"
        } else {
            self.run.name.as_str()
        };
        writeln!(w, "{} (pdevs {})", title, self.run.version)?;
        if let Some(path) = &self.run.config_file {
            writeln!(w, "config: {}", path)?;
        }

        for (metric, value) in self.metrics() {
            let value = if value.is_empty() { "-" } else { value.as_str() };
            writeln!(w, "  {:<20} {}", metric, value)?;
        }

        if !self.models.is_empty() {
            writeln!(w)?;
            writeln!(
                w,
                "  {:>4}  {:<16} {:>8} {:>8} {:>8} {:>8}",
                "id", "model", "outputs", "int", "ext", "conf"
            )?;
            for m in &self.models {
                writeln!(
                    w,
                    "  {:>4}  {:<16} {:>8} {:>8} {:>8} {:>8}",
                    m.id, m.name, m.collections, m.internal, m.external, m.confluent
                )?;
            }
        }
        Ok(())
    }

    /// The summary as a string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // a Vec sink never fails
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Wall-clock stopwatch.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    began: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            began: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_secs() * 1000.0
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.began.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Times a run and gathers its counters.
#[derive(Debug)]
pub struct StatsCollector {
    stats: SimulationStats,
    timer: Option<Timer>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self {
            stats: SimulationStats::new(),
            timer: None,
        }
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.stats.run.name = name.into();
    }

    /// Records the configuration file the run was built from.
    pub fn set_config_file(&mut self, path: impl Into<String>) {
        self.stats.run.config_file = Some(path.into());
    }

    pub fn start(&mut self) {
        self.stats.record_start();
        self.timer = Some(Timer::start());
    }

    /// Stops the timer and derives the rates. Call after
    /// [`StatsCollector::update_from_json`] so the rates see the counters.
    pub fn stop(&mut self) {
        self.stats.record_end();
        if let Some(timer) = self.timer.take() {
            self.stats.compute_timing(timer.elapsed_ms());
        }
    }

    /// Replaces the counters with those in `json`, the value returned by
    /// `RootCoordinator::export_stats`.
    pub fn update_from_json(&mut self, json: &Value) {
        let root = &mut self.stats.root;
        if let Some(r) = json.get("root") {
            root.final_time = r["last_event_time"].as_f64();
            root.cycles = r["cycles"].as_u64().unwrap_or(0);
            root.max_drift = r["max_drift"].as_f64().unwrap_or(0.0);
        }
        root.model_count = 0;
        root.messages_routed = 0;

        let mut models = Vec::new();
        let mut pending: Vec<&Value> = json.get("model").into_iter().collect();
        while let Some(node) = pending.pop() {
            root.model_count += 1;
            if node["kind"] == "atomic" {
                models.push(ModelStats::from_node(node));
                continue;
            }
            root.messages_routed += node["messages_routed"].as_u64().unwrap_or(0);
            if let Some(children) = node["children"].as_array() {
                pending.extend(children);
            }
        }
        models.sort_by_key(|m| m.id);

        root.atomic_count = models.len();
        self.stats.models = models;
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn into_stats(self) -> SimulationStats {
        self.stats
    }
}
