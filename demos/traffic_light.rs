//! Traffic light paced against the wall clock.
//!
//! A light cycles green -> yellow -> red. A pedestrian button (a generator
//! firing every 4.5 time units) cuts a green phase short; presses during
//! yellow or red are only counted. A display counts the colour changes. One
//! time unit lasts 100 ms.
//!
//! Run with `cargo run --example traffic_light`.

use std::error::Error;

use serde::Serialize;

use pdevs::models::{Counter, Generator};
use pdevs::port::PortSet;
use pdevs::{
    Atomic, AtomicModel, CoupledModel, Coupling, CsvLogger, RootCoordinator, SimResult, SimTime,
    StatsCollector, SystemClock,
};

const SECONDS_PER_UNIT: f64 = 0.1;
const RUN_FOR: SimTime = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Colour {
    Green,
    Yellow,
    Red,
}

impl Colour {
    fn duration(self) -> SimTime {
        match self {
            Colour::Green => 4.0,
            Colour::Yellow => 1.0,
            Colour::Red => 3.0,
        }
    }

    fn next(self) -> Colour {
        match self {
            Colour::Green => Colour::Yellow,
            Colour::Yellow => Colour::Red,
            Colour::Red => Colour::Green,
        }
    }
}

// -----------------------------------------------------------------------------
// Traffic light
// -----------------------------------------------------------------------------

struct TrafficLight {
    colour: Colour,
    remaining: SimTime,
    presses: u32,
}

impl TrafficLight {
    fn new() -> Self {
        Self {
            colour: Colour::Red,
            remaining: Colour::Red.duration(),
            presses: 0,
        }
    }
}

impl Atomic for TrafficLight {
    fn internal_transition(&mut self) {
        self.colour = self.colour.next();
        self.remaining = self.colour.duration();
    }

    fn external_transition(&mut self, elapsed: SimTime, inputs: &PortSet) {
        self.presses += inputs.messages("button").len() as u32;
        self.remaining -= elapsed;
        // a press turns a long green into a short one
        if self.colour == Colour::Green {
            self.remaining = self.remaining.min(0.5);
        }
    }

    fn output(&self, outputs: &mut PortSet) -> SimResult<()> {
        outputs.push("colour", self.colour.next())
    }

    fn time_advance(&self) -> SimTime {
        self.remaining.max(0.0)
    }

    fn state(&self) -> String {
        format!("{:?} remaining={} presses={}", self.colour, self.remaining, self.presses)
    }
}

fn crossing() -> SimResult<CoupledModel> {
    let light = AtomicModel::new("light", TrafficLight::new())
        .with_in_port("button")?
        .with_out_port("colour")?;

    Ok(CoupledModel::new("crossing")
        .with_child(Generator::new(4.5).into_model("button")?)?
        .with_child(light)?
        .with_child(Counter::new().into_model("display")?)?
        .with_coupling(Coupling::internal("button", "out", "light", "button"))
        .with_coupling(Coupling::internal("light", "colour", "display", "in")))
}

fn main() -> Result<(), Box<dyn Error>> {
    pdevs::init_logging("info");

    let mut root = RootCoordinator::new(crossing()?)?;
    root.set_logger(Box::new(CsvLogger::stdout()));
    root.set_clock(Box::new(
        SystemClock::new()
            .with_scale(SECONDS_PER_UNIT)
            .with_tolerance(0.05),
    ));

    let mut collector = StatsCollector::new();
    collector.set_name("traffic light");
    collector.start();

    root.start()?;
    let cycles = root.simulate_for(RUN_FOR)?;
    root.stop()?;

    collector.update_from_json(&root.export_stats());
    collector.stop();

    tracing::info!(cycles, max_drift = root.stats().max_drift, "crossing closed");
    eprintln!("{}", collector.stats().summary());
    Ok(())
}
