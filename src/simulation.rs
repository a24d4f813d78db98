//! Tick-Driven Simulation Engine
//!
//! Owns the switch state and the single seeded random source. Every tick runs
//! in two strictly ordered steps:
//! - arrivals are drawn and enqueued at every input
//! - the PIM matcher resolves contention and dequeues the winners
//!
//! Periodic delay reports are handed to an observer and never touch state.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arrivals::ArrivalGenerator;
use crate::config::SwitchConfig;
use crate::error::ConfigError;
use crate::matching::{PimMatcher, TickMatching};
use crate::stats::{DelayAccumulator, SimulationStats};
use crate::voq::VoqStore;

/// Global simulation clock
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    pub tick: u64,
}

/// Running average emitted every `report_interval` ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicReport {
    pub tick: u64,
    /// `None` until the first packet has departed
    pub average_delay: Option<f64>,
}

impl std::fmt::Display for PeriodicReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.average_delay {
            Some(avg) => write!(f, "Average delay after {} ticks = {} ticks", self.tick, avg),
            None => write!(f, "Average delay after {} ticks: no packets delivered yet", self.tick),
        }
    }
}

/// The main simulation engine
///
/// State is only reachable through read accessors, so the configuration that
/// `new` validated stays the one the run uses.
pub struct Simulation {
    config: SwitchConfig,
    clock: Clock,

    voqs: VoqStore,
    arrivals: ArrivalGenerator,
    matcher: PimMatcher,
    delays: DelayAccumulator,
    stats: SimulationStats,

    rng: StdRng,
}

impl Simulation {
    /// Validate `config` and build an empty switch seeded from `config.seed`
    pub fn new(config: SwitchConfig) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Same as `new` but with an externally prepared random source
    pub fn with_rng(config: SwitchConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.num_ports;

        Ok(Simulation {
            clock: Clock::default(),
            voqs: VoqStore::new(n),
            arrivals: ArrivalGenerator::new(n, config.arrival_prob),
            matcher: PimMatcher::new(n, config.pim_iters),
            delays: DelayAccumulator::new(),
            stats: SimulationStats::new(config.pim_iters),
            config,
            rng,
        })
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn voqs(&self) -> &VoqStore {
        &self.voqs
    }

    pub fn arrivals(&self) -> &ArrivalGenerator {
        &self.arrivals
    }

    pub fn matcher(&self) -> &PimMatcher {
        &self.matcher
    }

    pub fn delays(&self) -> &DelayAccumulator {
        &self.delays
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Execute one tick and return its matching decisions
    pub fn step(&mut self) -> TickMatching {
        let tick = self.clock.tick;

        let arrived = self.arrivals.generate(tick, &mut self.voqs, &mut self.rng);
        let matching = self
            .matcher
            .run_tick(tick, &mut self.voqs, &mut self.delays, &mut self.rng);

        self.collect_stats(arrived, &matching);
        debug!(
            "tick {}: {} arrivals, {} departures in {} rounds, backlog {}",
            tick,
            arrived,
            matching.len(),
            matching.rounds.len(),
            self.voqs.backlog()
        );

        self.clock.tick += 1;
        matching
    }

    fn collect_stats(&mut self, arrived: usize, matching: &TickMatching) {
        self.stats.ticks += 1;
        self.stats.arrivals += arrived as u64;
        self.stats.departures += matching.len() as u64;
        self.stats.rounds_executed += matching.rounds.len() as u64;
        for (round, outcome) in matching.rounds.iter().enumerate() {
            self.stats.matches_per_round[round] += outcome.matches.len() as u64;
        }
    }

    /// Run the configured number of ticks without reporting
    pub fn run(&mut self) {
        self.run_with_reports(|_| {});
    }

    /// Run the configured number of ticks, calling `observer` after every
    /// tick that is a multiple of `report_interval`
    pub fn run_with_reports<F>(&mut self, mut observer: F)
    where
        F: FnMut(&PeriodicReport),
    {
        info!(
            "simulating {} ticks: N={} load={} pim_iters={} seed={}",
            self.config.simulation_ticks,
            self.config.num_ports,
            self.config.arrival_prob,
            self.config.pim_iters,
            self.config.seed
        );

        let end_tick = self.clock.tick + self.config.simulation_ticks;
        while self.clock.tick < end_tick {
            let tick = self.clock.tick;
            self.step();
            if tick % self.config.report_interval == 0 {
                observer(&self.periodic_report(tick));
            }
        }

        info!(
            "finished at tick {}: {} departures, backlog {}",
            self.clock.tick,
            self.stats.departures,
            self.voqs.backlog()
        );
    }

    fn periodic_report(&self, tick: u64) -> PeriodicReport {
        PeriodicReport {
            tick,
            average_delay: self.delays.average().ok(),
        }
    }

    /// Generate summary report
    pub fn report(&self) -> SimulationReport {
        let n = self.config.num_ports;
        SimulationReport {
            config: self.config.clone(),
            total_ticks: self.stats.ticks,
            arrivals: self.stats.arrivals,
            departures: self.stats.departures,
            backlog: self.voqs.backlog() as u64,
            average_delay: self.delays.average().ok(),
            max_delay: self.delays.max_delay(),
            offered_load: self.stats.offered_load(n),
            throughput: self.stats.throughput(n),
            avg_rounds: self.stats.avg_rounds(),
            matches_per_round: self.stats.matches_per_round.clone(),
        }
    }
}

/// Summary report from simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub config: SwitchConfig,
    pub total_ticks: u64,
    pub arrivals: u64,
    pub departures: u64,
    pub backlog: u64,
    pub average_delay: Option<f64>,
    pub max_delay: f64,
    pub offered_load: f64,
    pub throughput: f64,
    pub avg_rounds: f64,
    pub matches_per_round: Vec<u64>,
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(f, "║              PIM Crossbar Switch Simulation                  ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Ports:                     {:>12}                       ║", self.config.num_ports)?;
        writeln!(f, "║ PIM Iterations:            {:>12}                       ║", self.config.pim_iters)?;
        writeln!(f, "║ Total Ticks:               {:>12}                       ║", self.total_ticks)?;
        writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Arrivals:                  {:>12}                       ║", self.arrivals)?;
        writeln!(f, "║ Departures:                {:>12}                       ║", self.departures)?;
        writeln!(f, "║ Backlog:                   {:>12}                       ║", self.backlog)?;
        writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Offered Load:              {:>11.2}%                       ║", self.offered_load * 100.0)?;
        writeln!(f, "║ Throughput:                {:>11.2}%                       ║", self.throughput * 100.0)?;
        writeln!(f, "║ Avg Rounds per Tick:       {:>12.3}                       ║", self.avg_rounds)?;
        writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
        match self.average_delay {
            Some(avg) => writeln!(f, "║ Avg Delay:                 {:>11.3} ticks                  ║", avg)?,
            None => writeln!(f, "║ Avg Delay:                      no data                       ║")?,
        }
        writeln!(f, "║ Max Delay:                 {:>11.0} ticks                  ║", self.max_delay)?;
        writeln!(f, "╚══════════════════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
