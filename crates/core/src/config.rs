use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Per-simulation settings supplied when a simulation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Idle timeout in seconds. `None` defers to the registry default.
    pub timeout: Option<u64>,
    pub log_level: String,
    pub auto_advance: bool,
    pub speed: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            timeout: Some(300),
            log_level: "info".to_string(),
            auto_advance: false,
            speed: 1.0,
        }
    }
}

impl SimulationConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Reject settings a simulation cannot run with. A zero timeout would
    /// expire the simulation as soon as it is registered.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.timeout == Some(0) {
            return Err(SimError::InvalidConfig {
                message: "timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
