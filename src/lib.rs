//! PIM Crossbar Switch Simulator
//!
//! A tick-driven simulator of an N×N input-queued crossbar switch whose
//! fabric is scheduled with Parallel Iterative Matching (Anderson et al.,
//! "High-Speed Switch Scheduling for Local-Area Networks", 1993).
//!
//! # Overview
//!
//! Every input keeps one virtual output queue (VOQ) per output, so a packet
//! blocked on a busy output never holds back traffic for other outputs. Each
//! tick:
//!
//! - every input independently receives a packet with probability
//!   `arrival_prob`, addressed to a uniformly random output
//! - the PIM arbiter runs up to `pim_iters` request/grant/accept rounds,
//!   each restricted to ports left unmatched by earlier rounds
//! - every confirmed pair moves one head-of-line packet across the fabric and
//!   contributes its queueing delay to the running average
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pim_switch_sim::prelude::*;
//!
//! let config = SwitchConfig::new(8, 0.8, 42).with_pim_iters(3);
//! let mut sim = Simulation::new(config).expect("valid config");
//!
//! sim.run_with_reports(|report| println!("{}", report));
//! println!("{}", sim.report());
//! ```
//!
//! # Parameter Sweeps
//!
//! ```rust,no_run
//! use pim_switch_sim::prelude::*;
//!
//! let sweep = ParameterSweep::new(SweepSpace::default(), SwitchConfig::new(16, 0.0, 1));
//! let points = sweep.run().expect("valid sweep");
//! println!("{}", sweep.table(&points));
//! ```

pub mod arrivals;
pub mod config;
pub mod error;
pub mod matching;
pub mod packet;
pub mod simulation;
pub mod stats;
pub mod sweep;
pub mod voq;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::arrivals::ArrivalGenerator;
    pub use crate::config::{SweepSpace, SwitchConfig};
    pub use crate::error::{ConfigError, SimError, StatsError, VoqError};
    pub use crate::matching::{MatchedPair, PimMatcher, RoundOutcome, TickMatching};
    pub use crate::packet::Packet;
    pub use crate::simulation::{Clock, PeriodicReport, Simulation, SimulationReport};
    pub use crate::stats::{DelayAccumulator, SimulationStats};
    pub use crate::sweep::{ParameterSweep, SweepPoint};
    pub use crate::voq::VoqStore;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Throughput a single PIM round reaches under saturated uniform traffic,
/// `1 - (1 - 1/N)^N`. Tends to `1 - 1/e` (about 63%) for large N.
pub fn single_round_saturation_throughput(num_ports: usize) -> f64 {
    if num_ports == 0 {
        return 0.0;
    }
    let n = num_ports as f64;
    1.0 - (1.0 - 1.0 / n).powf(n)
}

/// Upper bound on the expected number of rounds PIM needs to reach a maximal
/// matching, `log2(N) + 4/3`. The actual expectation is usually lower.
pub fn expected_rounds_upper_bound(num_ports: usize) -> f64 {
    (num_ports.max(1) as f64).log2() + 4.0 / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_round_saturation() {
        assert_eq!(single_round_saturation_throughput(1), 1.0);
        assert_eq!(single_round_saturation_throughput(2), 0.75);
        let large = single_round_saturation_throughput(1000);
        assert!((large - (1.0 - (-1.0f64).exp())).abs() < 1e-3);
    }

    #[test]
    fn test_expected_rounds_bound() {
        assert!((expected_rounds_upper_bound(16) - (4.0 + 4.0 / 3.0)).abs() < 1e-12);
        assert!((expected_rounds_upper_bound(1) - 4.0 / 3.0).abs() < 1e-12);
    }
}
