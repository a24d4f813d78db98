//! Parameter Sweep
//!
//! Runs one independent simulation per (arrival_prob, pim_iters) point of a
//! `SweepSpace` in parallel. Each point owns its seeded random source, so the
//! results do not depend on thread scheduling.

use rayon::prelude::*;

use crate::config::{SweepSpace, SwitchConfig};
use crate::error::ConfigError;
use crate::simulation::{Simulation, SimulationReport};

/// A single point of the sweep
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SweepPoint {
    pub arrival_prob: f64,
    pub pim_iters: usize,
    pub report: SimulationReport,
}

/// Sweep engine
pub struct ParameterSweep {
    pub space: SweepSpace,
    pub base: SwitchConfig,
}

impl ParameterSweep {
    pub fn new(space: SweepSpace, base: SwitchConfig) -> Self {
        ParameterSweep { space, base }
    }

    /// Every grid configuration, rejected as a whole if any point is invalid
    fn validated_configs(&self) -> Result<Vec<SwitchConfig>, ConfigError> {
        let configs = self.space.enumerate(&self.base);
        for config in &configs {
            config.validate()?;
        }
        Ok(configs)
    }

    /// Run every point of the grid (parallel), results in grid order
    pub fn run(&self) -> Result<Vec<SweepPoint>, ConfigError> {
        let configs = self.validated_configs()?;
        configs.par_iter().map(Self::evaluate).collect()
    }

    /// Run with progress callback
    pub fn run_with_progress<F>(&self, callback: F) -> Result<Vec<SweepPoint>, ConfigError>
    where
        F: Fn(usize, usize) + Sync,
    {
        let configs = self.validated_configs()?;
        let total = configs.len();
        let counter = std::sync::atomic::AtomicUsize::new(0);

        configs
            .par_iter()
            .map(|config| {
                let result = Self::evaluate(config);
                let count = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                callback(count + 1, total);
                result
            })
            .collect()
    }

    fn evaluate(config: &SwitchConfig) -> Result<SweepPoint, ConfigError> {
        let mut sim = Simulation::new(config.clone())?;
        sim.run();
        Ok(SweepPoint {
            arrival_prob: config.arrival_prob,
            pim_iters: config.pim_iters,
            report: sim.report(),
        })
    }

    /// Highest load whose run kept the backlog below `max_backlog_per_port`
    /// packets per port, for the given iteration count
    pub fn saturation_load(points: &[SweepPoint], pim_iters: usize, max_backlog_per_port: f64) -> Option<f64> {
        points
            .iter()
            .filter(|p| p.pim_iters == pim_iters)
            .filter(|p| {
                let n = p.report.config.num_ports as f64;
                (p.report.backlog as f64 / n) <= max_backlog_per_port
            })
            .map(|p| p.arrival_prob)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Render the results as a delay table, loads down, iterations across
    pub fn table(&self, points: &[SweepPoint]) -> String {
        let mut table = String::new();
        table.push_str("Load  │");
        for iters in &self.space.pim_iters {
            table.push_str(&format!(" iters={:<5}│", iters));
        }
        table.push('\n');
        table.push_str("──────┼");
        for _ in &self.space.pim_iters {
            table.push_str("────────────┼");
        }
        table.push('\n');

        for &load in &self.space.arrival_probs {
            table.push_str(&format!("{:5.2} │", load));
            for &iters in &self.space.pim_iters {
                let cell = points
                    .iter()
                    .find(|p| p.arrival_prob == load && p.pim_iters == iters)
                    .and_then(|p| p.report.average_delay);
                match cell {
                    Some(delay) => table.push_str(&format!(" {:>10.3} │", delay)),
                    None => table.push_str(&format!(" {:>10} │", "-")),
                }
            }
            table.push('\n');
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_sweep() -> ParameterSweep {
        let space = SweepSpace {
            arrival_probs: vec![0.3, 0.6],
            pim_iters: vec![1, 3],
        };
        ParameterSweep::new(space, SwitchConfig::new(4, 0.0, 17).with_ticks(500))
    }

    #[test]
    fn test_sweep_grid_order() {
        let points = small_sweep().run().unwrap();
        let grid: Vec<_> = points.iter().map(|p| (p.arrival_prob, p.pim_iters)).collect();
        assert_eq!(grid, vec![(0.3, 1), (0.3, 3), (0.6, 1), (0.6, 3)]);
    }

    #[test]
    fn test_sweep_matches_serial_run() {
        let points = small_sweep().run().unwrap();

        let mut sim = Simulation::new(SwitchConfig::new(4, 0.6, 17).with_ticks(500).with_pim_iters(3)).unwrap();
        sim.run();
        assert_eq!(points[3].report, sim.report());
    }

    #[test]
    fn test_sweep_rejects_invalid_point() {
        let space = SweepSpace {
            arrival_probs: vec![0.5, 1.5],
            pim_iters: vec![1],
        };
        let sweep = ParameterSweep::new(space, SwitchConfig::default());
        assert_eq!(sweep.run().unwrap_err(), ConfigError::ArrivalProbOutOfRange(1.5));
    }

    #[test]
    fn test_progress_rejects_invalid_grid_before_running() {
        let space = SweepSpace {
            arrival_probs: vec![0.5, 0.7, 1.5],
            pim_iters: vec![1],
        };
        let sweep = ParameterSweep::new(space, SwitchConfig::default());
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let result = sweep.run_with_progress(|_, _| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        assert_eq!(result.unwrap_err(), ConfigError::ArrivalProbOutOfRange(1.5));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_progress_and_table() {
        let sweep = small_sweep();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let points = sweep
            .run_with_progress(|_, total| {
                assert_eq!(total, 4);
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 4);

        let table = sweep.table(&points);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("iters=3"));
    }

    #[test]
    fn test_saturation_load() {
        let points = small_sweep().run().unwrap();
        assert_eq!(ParameterSweep::saturation_load(&points, 3, f64::INFINITY), Some(0.6));
        assert_eq!(ParameterSweep::saturation_load(&points, 2, f64::INFINITY), None);
    }
}
