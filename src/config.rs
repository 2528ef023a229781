//! Simulation configuration loading, parsing, and validation.
//!
//! Configurations are TOML files selecting the channel access protocol,
//! topology policy, and protocol timing parameters. Validation rejects
//! inputs that would make the simulation meaningless before it starts.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::topology::TopologyKind;

/// Channel access policy selecting which arbitration engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Carrier sensing with randomized backoff on collision.
    Contention,
    /// Slot/band assignment (TDMA/FDMA), collision-free by construction.
    Scheduled,
}

/// Error type for configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse TOML: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Root simulation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Which arbitration engine to run.
    pub protocol: Protocol,
    /// Number of nodes to generate.
    pub node_count: u32,
    /// Topology generation policy.
    pub topology: TopologyKind,
    /// Length of one slot in scheduled mode (time units).
    #[serde(default = "default_slot_duration")]
    pub slot_duration: f64,
    /// Elapsed time after session start before the acknowledgment is granted.
    #[serde(default = "default_ack_delay")]
    pub ack_delay: f64,
    /// Elapsed time after the acknowledgment before the transfer completes.
    #[serde(default = "default_transfer_delay")]
    pub transfer_delay: f64,
    /// Ordered band labels cycled through in scheduled mode.
    #[serde(default = "default_frequency_bands")]
    pub frequency_bands: Vec<String>,
    /// Seed for the injected RNG; omit for entropy-based seeding.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Stop admitting new sessions (or opening new slots) after this many.
    #[serde(default)]
    pub max_sessions: Option<u64>,
    /// Simulated time between driver ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f64,
}

fn default_slot_duration() -> f64 {
    50.0
}

fn default_ack_delay() -> f64 {
    10.0
}

fn default_transfer_delay() -> f64 {
    20.0
}

fn default_frequency_bands() -> Vec<String> {
    vec!["2.4GHz".to_string(), "2.5GHz".to_string()]
}

fn default_tick_interval() -> f64 {
    1.0
}

/// Load, parse, and validate a configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SimulationConfig, ConfigError> {
    let content =
        fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;
    let config: SimulationConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config).map_err(ConfigError::ValidationError)?;
    Ok(config)
}

/// Validate a configuration to reject inputs the simulation cannot run with.
///
/// Checked conditions:
/// - at least one node
/// - non-empty frequency band list
/// - strictly positive durations and tick interval
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_config(config: &SimulationConfig) -> Result<(), String> {
    if config.node_count == 0 {
        return Err("node_count must be at least 1".to_string());
    }
    if config.frequency_bands.is_empty() {
        return Err("frequency_bands must not be empty".to_string());
    }
    if config.slot_duration <= 0.0 {
        return Err(format!(
            "slot_duration {} must be positive",
            config.slot_duration
        ));
    }
    if config.ack_delay <= 0.0 {
        return Err(format!("ack_delay {} must be positive", config.ack_delay));
    }
    if config.transfer_delay <= 0.0 {
        return Err(format!(
            "transfer_delay {} must be positive",
            config.transfer_delay
        ));
    }
    if config.tick_interval <= 0.0 {
        return Err(format!(
            "tick_interval {} must be positive",
            config.tick_interval
        ));
    }
    Ok(())
}
