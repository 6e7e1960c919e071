//! arsim-core: scenario graph and simulation engine for IVR call flows.
//!
//! A scenario is a directed graph of call-flow nodes (start, message,
//! branch, input, transfer, end). The core consumes a persisted scenario
//! snapshot, validates it once into an immutable [`ScenarioGraph`], and
//! drives one stateful walk of that graph per [`SimulationEngine`].
//!
//! Nothing here performs I/O or blocks. Hosts own persistence, transport
//! and the lifetime of engines (see the `arsim-registry` crate).

mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod inspect;
pub mod report;
pub mod snapshot;

pub use config::SimulationConfig;
pub use engine::{
    display_value, ActionType, AvailableAction, HistoryStep, NodeView, SessionData,
    SimulationEngine, SimulationStatus, StateSnapshot,
};
pub use error::{ErrorKind, SimError};
pub use export::{ExportFormat, ExportMetadata, ExportResult};
pub use graph::{
    BranchOption, Connection, InputSpec, InputType, NodeKind, ScenarioGraph, ScenarioNode,
};
pub use inspect::{DebugInfo, HistoryView, PerformanceMetrics, SimulationSummary};
pub use report::ValidationReport;
pub use snapshot::{ConnectionRecord, NodeRecord, NodeType, ScenarioSnapshot};
