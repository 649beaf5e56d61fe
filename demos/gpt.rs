//! Generator / processor / counter simulation driven by a YAML file.
//!
//! Run with `cargo run --example gpt [config.yaml]`. Without an argument the
//! bundled `demos/gpt.yaml` is used. The CSV trace goes to stdout (or to the
//! configured `output_file`), the run summary to stderr.

use std::error::Error;

use pdevs::config::SimConfig;
use pdevs::registry::default_registry;
use pdevs::StatsCollector;

const BUNDLED: &str = include_str!("gpt.yaml");

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1);
    let config = match &path {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::from_yaml(BUNDLED)?,
    };

    pdevs::init_logging(&config.simulation.log_level);
    tracing::info!(
        model = config.model.name.as_str(),
        models = config.model_count(),
        "configuration loaded"
    );

    let mut root = config.build_root(&default_registry())?;

    let mut collector = StatsCollector::new();
    collector.set_name(config.model.name.as_str());
    if let Some(path) = &path {
        collector.set_config_file(path.as_str());
    }

    collector.start();
    let cycles = config.run(&mut root)?;
    collector.update_from_json(&root.export_stats());
    collector.stop();

    tracing::info!(cycles, time = root.time_last(), "run finished");
    if config.simulation.collect_stats {
        collector.stats().write_summary(std::io::stderr())?;
    }
    Ok(())
}
