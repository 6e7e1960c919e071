//! arsim-registry: live simulations keyed by id.
//!
//! The registry is the only shared mutable state in the system. The table
//! itself sits behind one async mutex; each engine sits behind its own, so
//! actions on one simulation are serialized while different simulations
//! proceed independently.
//!
//! Simulations are held in memory only. Idle entries expire after their
//! timeout and are dropped lazily on access or by [`SimulationRegistry::spawn_sweeper`].

mod config;
mod registry;

pub use config::{ConfigError, RegistryConfig};
pub use registry::{SimulationHandle, SimulationRegistry, SimulationState, StartedSimulation};
