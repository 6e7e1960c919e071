//! Export of a simulation's results as JSON or CSV.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::engine::{display_value, HistoryStep, SessionData, SimulationEngine, SimulationStatus};
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format '{}' (expected json or csv)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportMetadata {
    pub format: ExportFormat,
    pub steps_count: usize,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    pub simulation_id: String,
    pub content: String,
    pub metadata: ExportMetadata,
    pub generated_at: String,
}

/// Document rendered by the JSON export.
#[derive(Serialize)]
struct ExportDocument<'a> {
    simulation_id: &'a str,
    status: SimulationStatus,
    execution_history: &'a [HistoryStep],
    session_data: &'a SessionData,
    total_execution_time: f64,
    exported_at: String,
}

impl SimulationEngine {
    pub fn export(&self, format: ExportFormat) -> Result<ExportResult, SimError> {
        let duration = self.execution_time();
        let content = match format {
            ExportFormat::Json => {
                let doc = ExportDocument {
                    simulation_id: self.simulation_id(),
                    status: self.status(),
                    execution_history: self.execution_history(),
                    session_data: self.session_data(),
                    total_execution_time: duration,
                    exported_at: clock::now_rfc3339(),
                };
                serde_json::to_string_pretty(&doc).map_err(export_error)?
            }
            ExportFormat::Csv => history_csv(self.execution_history())?,
        };

        Ok(ExportResult {
            simulation_id: self.simulation_id().to_string(),
            content,
            metadata: ExportMetadata {
                format,
                steps_count: self.execution_history().len(),
                duration,
            },
            generated_at: clock::now_rfc3339(),
        })
    }
}

fn history_csv(history: &[HistoryStep]) -> Result<String, SimError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Step", "Timestamp", "Node ID", "Action Type", "Value"])
        .map_err(export_error)?;
    for (i, step) in history.iter().enumerate() {
        writer
            .write_record([
                (i + 1).to_string(),
                step.timestamp.to_string(),
                step.node_id.clone(),
                step.action_type.clone(),
                display_value(&step.value),
            ])
            .map_err(export_error)?;
    }
    let bytes = writer.into_inner().map_err(export_error)?;
    String::from_utf8(bytes).map_err(export_error)
}

fn export_error(e: impl fmt::Display) -> SimError {
    SimError::Export {
        message: e.to_string(),
    }
}
