// Tool dispatch
// Maps a tool name plus JSON arguments onto a gateway operation and returns
// the operation's envelope as JSON, untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::gateway::{PowerBiGateway, DEFAULT_EXPORT_ROWS, DEFAULT_REFRESH_HISTORY_TOP};
use crate::models::powerbi::ColumnDataType;
use crate::models::Envelope;

/// Every tool the dispatcher understands
pub const TOOL_NAMES: &[&str] = &[
    "get_workspaces",
    "get_datasets",
    "get_dataset",
    "get_dataset_schema",
    "query_dataset",
    "refresh_dataset",
    "get_refresh_history",
    "create_report",
    "get_reports",
    "create_calculated_column",
    "create_measure",
    "analyze_data_quality",
    "export_data_to_csv",
];

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceArgs {
    pub workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatasetArgs {
    pub dataset_id: String,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryArgs {
    pub dataset_id: String,
    pub dax_query: String,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshHistoryArgs {
    pub dataset_id: String,
    pub workspace_id: Option<String>,
    #[serde(default = "default_top")]
    pub top: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateReportArgs {
    pub workspace_id: String,
    pub dataset_id: String,
    pub report_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CalculatedColumnArgs {
    pub dataset_id: String,
    pub table_name: String,
    pub column_name: String,
    pub dax_expression: String,
    pub data_type: Option<ColumnDataType>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MeasureArgs {
    pub dataset_id: String,
    pub table_name: String,
    pub measure_name: String,
    pub dax_expression: String,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportArgs {
    pub dataset_id: String,
    pub table_name: String,
    pub workspace_id: Option<String>,
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
}

fn default_top() -> u32 {
    DEFAULT_REFRESH_HISTORY_TOP
}

fn default_max_rows() -> u32 {
    DEFAULT_EXPORT_ROWS
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ApiError> {
    // A tool without arguments may be called with `null`
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ApiError::Validation(format!("invalid arguments for {}: {}", tool, e)))
}

fn to_json<T: Serialize>(envelope: Envelope<T>) -> Result<Value, ApiError> {
    serde_json::to_value(envelope).map_err(|e| ApiError::Internal(e.into()))
}

/// Invoke `tool` with `args`
///
/// Only an unknown tool or malformed arguments produce `Err`; everything the
/// gateway reports comes back inside the envelope.
pub async fn dispatch(gateway: &PowerBiGateway, tool: &str, args: Value) -> Result<Value, ApiError> {
    tracing::debug!(tool, "Dispatching tool call");

    match tool {
        "get_workspaces" => to_json(gateway.list_workspaces().await),
        "get_datasets" => {
            let a: WorkspaceArgs = parse_args(tool, args)?;
            to_json(gateway.list_datasets(a.workspace_id.as_deref()).await)
        }
        "get_dataset" => {
            let a: DatasetArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .get_dataset(&a.dataset_id, a.workspace_id.as_deref())
                    .await,
            )
        }
        "get_dataset_schema" => {
            let a: DatasetArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .get_dataset_schema(&a.dataset_id, a.workspace_id.as_deref())
                    .await,
            )
        }
        "query_dataset" => {
            let a: QueryArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .execute_query(&a.dataset_id, &a.dax_query, a.workspace_id.as_deref())
                    .await,
            )
        }
        "refresh_dataset" => {
            let a: DatasetArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .refresh_dataset(&a.dataset_id, a.workspace_id.as_deref())
                    .await,
            )
        }
        "get_refresh_history" => {
            let a: RefreshHistoryArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .get_refresh_history(&a.dataset_id, a.workspace_id.as_deref(), a.top)
                    .await,
            )
        }
        "create_report" => {
            let a: CreateReportArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .create_report(&a.workspace_id, &a.dataset_id, &a.report_name)
                    .await,
            )
        }
        "get_reports" => {
            let a: WorkspaceArgs = parse_args(tool, args)?;
            to_json(gateway.list_reports(a.workspace_id.as_deref()).await)
        }
        "create_calculated_column" => {
            let a: CalculatedColumnArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .create_calculated_column(
                        &a.dataset_id,
                        &a.table_name,
                        &a.column_name,
                        &a.dax_expression,
                        a.data_type,
                        a.workspace_id.as_deref(),
                    )
                    .await,
            )
        }
        "create_measure" => {
            let a: MeasureArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .create_measure(
                        &a.dataset_id,
                        &a.table_name,
                        &a.measure_name,
                        &a.dax_expression,
                        a.workspace_id.as_deref(),
                    )
                    .await,
            )
        }
        "analyze_data_quality" => {
            let a: DatasetArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .analyze_data_quality(&a.dataset_id, a.workspace_id.as_deref())
                    .await,
            )
        }
        "export_data_to_csv" => {
            let a: ExportArgs = parse_args(tool, args)?;
            to_json(
                gateway
                    .export_table_to_csv(
                        &a.dataset_id,
                        &a.table_name,
                        a.workspace_id.as_deref(),
                        a.max_rows,
                    )
                    .await,
            )
        }
        _ => Err(ApiError::UnknownTool(tool.to_string())),
    }
}
