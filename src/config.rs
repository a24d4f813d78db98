//! Switch Configuration Module
//!
//! Every parameter of a simulation run, plus the grid walked by a parameter
//! sweep. Configurations can be saved to and loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Complete configuration of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Switch fan-in / fan-out N
    pub num_ports: usize,
    /// Probability that a packet arrives at an input in a given tick
    pub arrival_prob: f64,
    /// Seed for the random source shared by arrivals and arbitration
    pub seed: u64,
    /// Request/grant/accept rounds available per tick
    pub pim_iters: usize,
    /// Total run length in ticks
    pub simulation_ticks: u64,
    /// Ticks between periodic delay reports
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

fn default_report_interval() -> u64 {
    100
}

impl Default for SwitchConfig {
    fn default() -> Self {
        SwitchConfig {
            num_ports: 4,
            arrival_prob: 0.5,
            seed: 0,
            pim_iters: 1,
            simulation_ticks: 20000,
            report_interval: default_report_interval(),
        }
    }
}

impl SwitchConfig {
    pub fn new(num_ports: usize, arrival_prob: f64, seed: u64) -> Self {
        SwitchConfig {
            num_ports,
            arrival_prob,
            seed,
            ..Default::default()
        }
    }

    pub fn with_pim_iters(mut self, pim_iters: usize) -> Self {
        self.pim_iters = pim_iters;
        self
    }

    pub fn with_ticks(mut self, simulation_ticks: u64) -> Self {
        self.simulation_ticks = simulation_ticks;
        self
    }

    /// Reject anything that would make the run meaningless
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.num_ports == 0 {
            return Err(ConfigError::ZeroPorts);
        }
        // NaN fails both comparisons
        if !(0.0..=1.0).contains(&self.arrival_prob) {
            return Err(ConfigError::ArrivalProbOutOfRange(self.arrival_prob));
        }
        if self.pim_iters == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.simulation_ticks == 0 {
            return Err(ConfigError::ZeroTicks);
        }
        if self.report_interval == 0 {
            return Err(ConfigError::ZeroReportInterval);
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn load(path: &str) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&toml_str)?)
    }
}

/// Finest load step a sweep accepts; bounds the grid to 1000 loads
pub const MIN_LOAD_STEP: f64 = 1e-3;

/// Parameter grid for a sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSpace {
    pub arrival_probs: Vec<f64>,
    pub pim_iters: Vec<usize>,
}

impl Default for SweepSpace {
    fn default() -> Self {
        SweepSpace {
            arrival_probs: vec![0.1, 0.3, 0.5, 0.7, 0.9],
            pim_iters: vec![1, 2, 3, 4],
        }
    }
}

impl SweepSpace {
    /// Load steps `step, 2*step, ...` up to and including `min(max, 1)`
    pub fn load_range(step: f64, max: f64) -> std::result::Result<Vec<f64>, ConfigError> {
        if !(MIN_LOAD_STEP..=1.0).contains(&step) {
            return Err(ConfigError::InvalidLoadStep(step));
        }
        let upper = max.min(1.0);
        if upper < step {
            return Ok(Vec::new());
        }
        let steps = (upper / step + 1e-9).floor() as usize;
        // Rounding may push the last step a hair past `upper`
        Ok((1..=steps).map(|k| (k as f64 * step).min(upper)).collect())
    }

    /// Every configuration in the grid, loads outermost, all sharing `base`'s
    /// port count, seed and run length
    pub fn enumerate(&self, base: &SwitchConfig) -> Vec<SwitchConfig> {
        let mut configs = Vec::new();

        for &arrival_prob in &self.arrival_probs {
            for &pim_iters in &self.pim_iters {
                configs.push(SwitchConfig {
                    arrival_prob,
                    pim_iters,
                    ..base.clone()
                });
            }
        }

        configs
    }
}
