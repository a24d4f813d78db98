//! Delay and throughput statistics

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Running mean of queueing delay over every dequeued packet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayAccumulator {
    sample_count: u64,
    total_delay: f64,
    max_delay: f64,
}

impl DelayAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delay sample, in ticks
    pub fn record(&mut self, delay: f64) {
        debug_assert!(delay >= 0.0, "negative delay sample {}", delay);
        self.sample_count += 1;
        self.total_delay += delay;
        if delay > self.max_delay {
            self.max_delay = delay;
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn total_delay(&self) -> f64 {
        self.total_delay
    }

    /// Largest sample seen so far (0 with no samples)
    pub fn max_delay(&self) -> f64 {
        self.max_delay
    }

    /// Mean delay, or `StatsError::NoSamples` before the first dequeue
    pub fn average(&self) -> Result<f64, StatsError> {
        if self.sample_count == 0 {
            return Err(StatsError::NoSamples);
        }
        Ok(self.total_delay / self.sample_count as f64)
    }
}

/// Counters collected by the driver across the run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    pub ticks: u64,
    pub arrivals: u64,
    pub departures: u64,

    /// `matches_per_round[k]` = confirmed pairs made in round k, summed over ticks
    pub matches_per_round: Vec<u64>,

    /// Sum over ticks of rounds that actually ran
    pub rounds_executed: u64,
}

impl SimulationStats {
    pub fn new(pim_iters: usize) -> Self {
        SimulationStats {
            matches_per_round: vec![0; pim_iters],
            ..Default::default()
        }
    }

    /// Arrivals per input port per tick
    pub fn offered_load(&self, num_ports: usize) -> f64 {
        Self::per_port_tick(self.arrivals, self.ticks, num_ports)
    }

    /// Departures per output port per tick
    pub fn throughput(&self, num_ports: usize) -> f64 {
        Self::per_port_tick(self.departures, self.ticks, num_ports)
    }

    /// Mean rounds needed per tick
    pub fn avg_rounds(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.rounds_executed as f64 / self.ticks as f64
    }

    fn per_port_tick(count: u64, ticks: u64, num_ports: usize) -> f64 {
        let slots = ticks * num_ports as u64;
        if slots == 0 {
            return 0.0;
        }
        count as f64 / slots as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_average() {
        let acc = DelayAccumulator::new();
        assert_eq!(acc.average(), Err(StatsError::NoSamples));
        assert_eq!(acc.sample_count(), 0);
    }

    #[test]
    fn test_average() {
        let mut acc = DelayAccumulator::new();
        acc.record(0.0);
        acc.record(3.0);
        acc.record(6.0);
        assert_eq!(acc.sample_count(), 3);
        assert_eq!(acc.average(), Ok(3.0));
        assert_eq!(acc.max_delay(), 6.0);
    }

    #[test]
    fn test_throughput() {
        let stats = SimulationStats {
            ticks: 10,
            arrivals: 20,
            departures: 15,
            ..SimulationStats::new(2)
        };
        assert_eq!(stats.offered_load(4), 0.5);
        assert_eq!(stats.throughput(4), 0.375);
        assert_eq!(SimulationStats::new(1).throughput(4), 0.0);
    }
}
