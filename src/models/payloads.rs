// Success payloads of the gateway operations
//
// Field names are the JSON keys the orchestrator receives next to `success`.

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::powerbi::TableInfo;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceList {
    pub workspaces: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetList {
    pub datasets: Vec<Value>,
    pub workspace_id: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDetails {
    pub dataset: Value,
    pub dataset_id: String,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSchema {
    pub dataset_info: Value,
    pub tables: Vec<TableInfo>,
    pub dataset_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub result: Value,
    pub dataset_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshTriggered {
    pub message: String,
    pub dataset_id: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshHistory {
    pub refresh_history: Vec<Value>,
    pub dataset_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCreated {
    pub report: Value,
    pub report_id: Option<String>,
    pub workspace_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportList {
    pub reports: Vec<Value>,
    pub workspace_id: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCreated {
    pub column: Value,
    pub table_name: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureCreated {
    pub measure: Value,
    pub table_name: String,
    pub dataset_id: String,
}

/// Quality entry for one table; a failed table carries only its error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableQuality {
    Analyzed {
        row_count: u64,
        column_count: usize,
        measure_count: usize,
    },
    Failed {
        error: String,
    },
}

impl TableQuality {
    pub fn is_failed(&self) -> bool {
        matches!(self, TableQuality::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub dataset_id: String,
    /// Table name to entry, in the order the service listed the tables
    #[serde(serialize_with = "serialize_as_map")]
    pub quality_analysis: Vec<(String, TableQuality)>,
    pub total_tables: usize,
}

impl QualityReport {
    pub fn table(&self, name: &str) -> Option<&TableQuality> {
        self.quality_analysis
            .iter()
            .find(|(table, _)| table == name)
            .map(|(_, quality)| quality)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvExport {
    pub csv_content: String,
    pub row_count: usize,
    pub column_count: usize,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Serialize ordered pairs as a JSON object, keeping their order
fn serialize_as_map<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    serializer.collect_map(entries.iter().map(|(key, value)| (key, value)))
}
