//! Error types
//!
//! Configuration problems are reported before any tick runs. Everything that
//! happens inside a tick is expected to succeed for a valid configuration.

use thiserror::Error;

/// Invalid switch configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("num_ports must be at least 1")]
    ZeroPorts,
    #[error("arrival_prob must be within [0, 1], got {0}")]
    ArrivalProbOutOfRange(f64),
    #[error("pim_iters must be at least 1")]
    ZeroIterations,
    #[error("simulation_ticks must be at least 1")]
    ZeroTicks,
    #[error("report_interval must be at least 1")]
    ZeroReportInterval,
    #[error("sweep load step must be within [0.001, 1], got {0}")]
    InvalidLoadStep(f64),
}

/// Statistics queried before any sample exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("no delay samples recorded yet")]
    NoSamples,
}

/// Failure of a checked VOQ operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VoqError {
    #[error("VOQ[{input}][{output}] is empty")]
    Empty { input: usize, output: usize },
    #[error("port pair ({input}, {output}) out of range for a {num_ports}-port switch")]
    PortOutOfRange {
        input: usize,
        output: usize,
        num_ports: usize,
    },
}

/// Top-level error for the simulator
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps() {
        let err: SimError = ConfigError::ArrivalProbOutOfRange(1.5).into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: arrival_prob must be within [0, 1], got 1.5"
        );
    }

    #[test]
    fn test_json_error_wraps() {
        let json_err = serde_json::from_str::<u64>("not json").unwrap_err();
        let err: SimError = json_err.into();
        assert!(matches!(err, SimError::Json(_)));
        assert!(err.to_string().starts_with("failed to encode JSON"));
    }

    #[test]
    fn test_voq_error_message() {
        let err = VoqError::Empty { input: 1, output: 2 };
        assert_eq!(err.to_string(), "VOQ[1][2] is empty");
    }
}
