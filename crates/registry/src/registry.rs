use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arsim_core::{
    DebugInfo, ExportFormat, ExportResult, HistoryView, ScenarioGraph, ScenarioSnapshot, SimError,
    SimulationConfig, SimulationEngine, SimulationSummary, StateSnapshot, ValidationReport,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::RegistryConfig;

/// Shared handle to one engine. Lock it to serialize actions.
pub type SimulationHandle = Arc<Mutex<SimulationEngine>>;

/// Result of starting a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSimulation {
    pub simulation_id: String,
    pub scenario_id: Option<i64>,
    #[serde(flatten)]
    pub state: StateSnapshot,
}

/// A state snapshot tagged with its simulation id.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationState {
    pub simulation_id: String,
    #[serde(flatten)]
    pub state: StateSnapshot,
}

struct Entry {
    engine: SimulationHandle,
    idle_timeout: Duration,
    last_access: Instant,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_access) >= self.idle_timeout
    }
}

type Table = HashMap<String, Entry>;

pub struct SimulationRegistry {
    simulations: Mutex<Table>,
    config: RegistryConfig,
}

impl Default for SimulationRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl SimulationRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        SimulationRegistry {
            simulations: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Build a graph from `snapshot` and start a simulation under a fresh id.
    pub async fn start(
        &self,
        snapshot: &ScenarioSnapshot,
        start_node_id: Option<&str>,
        config: SimulationConfig,
    ) -> Result<StartedSimulation, SimError> {
        self.start_with_id(Uuid::new_v4().to_string(), snapshot, start_node_id, config)
            .await
    }

    /// Like [`start`](Self::start), under a caller-chosen id.
    pub async fn start_with_id(
        &self,
        simulation_id: String,
        snapshot: &ScenarioSnapshot,
        start_node_id: Option<&str>,
        config: SimulationConfig,
    ) -> Result<StartedSimulation, SimError> {
        config.validate()?;
        let graph = Arc::new(ScenarioGraph::build(snapshot)?);
        let idle_timeout = config
            .idle_timeout()
            .unwrap_or_else(|| self.config.idle_timeout());
        let engine = SimulationEngine::start(simulation_id.clone(), graph, start_node_id, config)?;
        let state = engine.state();

        let mut table = self.simulations.lock().await;
        let now = Instant::now();
        evict_expired(&mut table, now);
        if table.contains_key(&simulation_id) {
            return Err(SimError::DuplicateSimulation { simulation_id });
        }
        if table.len() >= self.config.max_simulations {
            tracing::warn!(
                capacity = self.config.max_simulations,
                "simulation registry full"
            );
            return Err(SimError::RegistryFull {
                capacity: self.config.max_simulations,
            });
        }
        table.insert(
            simulation_id.clone(),
            Entry {
                engine: Arc::new(Mutex::new(engine)),
                idle_timeout,
                last_access: now,
            },
        );
        tracing::info!(
            simulation_id = %simulation_id,
            scenario_id = ?snapshot.scenario_id,
            active = table.len(),
            "simulation registered"
        );

        Ok(StartedSimulation {
            simulation_id,
            scenario_id: snapshot.scenario_id,
            state,
        })
    }

    /// Look up a live simulation, refreshing its idle timer.
    pub async fn get(&self, simulation_id: &str) -> Result<SimulationHandle, SimError> {
        let mut table = self.simulations.lock().await;
        let now = Instant::now();
        let expired = match table.get_mut(simulation_id) {
            Some(entry) if !entry.expired(now) => {
                entry.last_access = now;
                return Ok(Arc::clone(&entry.engine));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            table.remove(simulation_id);
            tracing::info!(simulation_id, "simulation expired");
        }
        Err(SimError::SimulationNotFound {
            simulation_id: simulation_id.to_string(),
        })
    }

    /// Remove a simulation. Returns whether it was present.
    pub async fn stop(&self, simulation_id: &str) -> bool {
        let removed = self.simulations.lock().await.remove(simulation_id).is_some();
        if removed {
            tracing::info!(simulation_id, "simulation stopped");
        }
        removed
    }

    /// Drop every expired simulation. Returns how many were evicted.
    pub async fn sweep_expired(&self) -> usize {
        let mut table = self.simulations.lock().await;
        evict_expired(&mut table, Instant::now())
    }

    /// Number of live (unexpired) simulations.
    pub async fn active_count(&self) -> usize {
        let mut table = self.simulations.lock().await;
        evict_expired(&mut table, Instant::now());
        table.len()
    }

    /// Periodically evict expired simulations until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(live) = registry.upgrade() else {
                    break;
                };
                live.sweep_expired().await;
            }
        })
    }

    // ── Engine operations ────────────────────────────────────────────────────

    async fn with_engine<T>(
        &self,
        simulation_id: &str,
        f: impl FnOnce(&mut SimulationEngine) -> T,
    ) -> Result<T, SimError> {
        let handle = self.get(simulation_id).await?;
        let mut engine = handle.lock().await;
        Ok(f(&mut *engine))
    }

    pub async fn state(&self, simulation_id: &str) -> Result<SimulationState, SimError> {
        let state = self.with_engine(simulation_id, |e| e.state()).await?;
        Ok(tagged(simulation_id, state))
    }

    pub async fn execute_action(
        &self,
        simulation_id: &str,
        action_type: &str,
        value: Value,
        additional_data: Map<String, Value>,
    ) -> Result<SimulationState, SimError> {
        let state = self
            .with_engine(simulation_id, |e| {
                e.execute_action(action_type, value, additional_data)
            })
            .await??;
        Ok(tagged(simulation_id, state))
    }

    pub async fn reset(
        &self,
        simulation_id: &str,
        start_node_id: Option<&str>,
    ) -> Result<SimulationState, SimError> {
        let state = self
            .with_engine(simulation_id, |e| e.reset(start_node_id))
            .await??;
        Ok(tagged(simulation_id, state))
    }

    pub async fn start_playback(
        &self,
        simulation_id: &str,
        speed: f64,
        auto_advance: bool,
    ) -> Result<SimulationState, SimError> {
        let state = self
            .with_engine(simulation_id, |e| e.start_playback(speed, auto_advance))
            .await??;
        Ok(tagged(simulation_id, state))
    }

    pub async fn pause(&self, simulation_id: &str) -> Result<(), SimError> {
        self.with_engine(simulation_id, |e| e.set_paused(true)).await
    }

    pub async fn resume(&self, simulation_id: &str) -> Result<(), SimError> {
        self.with_engine(simulation_id, |e| e.set_paused(false)).await
    }

    pub async fn history(&self, simulation_id: &str) -> Result<HistoryView, SimError> {
        self.with_engine(simulation_id, |e| e.history()).await
    }

    pub async fn export(
        &self,
        simulation_id: &str,
        format: ExportFormat,
    ) -> Result<ExportResult, SimError> {
        self.with_engine(simulation_id, |e| e.export(format)).await?
    }

    pub async fn summary(&self, simulation_id: &str) -> Result<SimulationSummary, SimError> {
        self.with_engine(simulation_id, |e| e.summary()).await
    }

    pub async fn debug_info(&self, simulation_id: &str) -> Result<DebugInfo, SimError> {
        self.with_engine(simulation_id, |e| e.debug_info()).await
    }

    pub async fn validate(&self, simulation_id: &str) -> Result<ValidationReport, SimError> {
        self.with_engine(simulation_id, |e| e.validate()).await
    }
}

fn tagged(simulation_id: &str, state: StateSnapshot) -> SimulationState {
    SimulationState {
        simulation_id: simulation_id.to_string(),
        state,
    }
}

fn evict_expired(table: &mut Table, now: Instant) -> usize {
    let before = table.len();
    table.retain(|id, entry| {
        let keep = !entry.expired(now);
        if !keep {
            tracing::info!(simulation_id = %id, "evicting idle simulation");
        }
        keep
    });
    before - table.len()
}
