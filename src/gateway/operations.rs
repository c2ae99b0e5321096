// Primitive gateway operations

use reqwest::Method;
use serde_json::{json, Value};

use super::{dataset_path, decode, run, scoped_path, table_path, PowerBiGateway};
use crate::models::payloads::{
    ColumnCreated, DatasetDetails, DatasetList, DatasetSchema, MeasureCreated, QueryOutcome,
    RefreshHistory, RefreshTriggered, ReportCreated, ReportList, WorkspaceList,
};
use crate::models::powerbi::{
    ColumnDataType, CreateColumnRequest, CreateMeasureRequest, CreateReportRequest,
    ExecuteQueriesRequest, ODataList, TableInfo,
};
use crate::models::Envelope;

/// Refresh history entries returned when the caller does not ask for a count
pub const DEFAULT_REFRESH_HISTORY_TOP: u32 = 5;

impl PowerBiGateway {
    /// GET /groups
    pub async fn list_workspaces(&self) -> Envelope<WorkspaceList> {
        tracing::info!("Listing workspaces");
        run("list_workspaces", async {
            let list: ODataList = decode(self.http.get_json("/groups", &[]).await?)?;
            Ok(WorkspaceList {
                count: list.value.len(),
                workspaces: list.value,
            })
        })
        .await
    }

    /// GET [/groups/{ws}]/datasets
    pub async fn list_datasets(&self, workspace_id: Option<&str>) -> Envelope<DatasetList> {
        tracing::info!(workspace_id = ?workspace_id, "Listing datasets");
        run("list_datasets", async {
            let path = scoped_path(workspace_id, "/datasets");
            let list: ODataList = decode(self.http.get_json(&path, &[]).await?)?;
            Ok(DatasetList {
                count: list.value.len(),
                datasets: list.value,
                workspace_id: workspace_id.map(str::to_string),
            })
        })
        .await
    }

    /// GET [/groups/{ws}]/datasets/{id}
    pub async fn get_dataset(
        &self,
        dataset_id: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<DatasetDetails> {
        run("get_dataset", async {
            let path = dataset_path(workspace_id, dataset_id, "");
            let dataset = self.http.get_json(&path, &[]).await?;
            Ok(DatasetDetails {
                dataset,
                dataset_id: dataset_id.to_string(),
                workspace_id: workspace_id.map(str::to_string),
            })
        })
        .await
    }

    /// Dataset metadata followed by its table list
    pub async fn get_dataset_schema(
        &self,
        dataset_id: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<DatasetSchema> {
        run("get_dataset_schema", async {
            let dataset_info = self
                .http
                .get_json(&dataset_path(workspace_id, dataset_id, ""), &[])
                .await?;
            let tables: ODataList<TableInfo> = decode(
                self.http
                    .get_json(&dataset_path(workspace_id, dataset_id, "/tables"), &[])
                    .await?,
            )?;

            tracing::debug!(
                dataset_id,
                tables = tables.value.len(),
                "Fetched dataset schema"
            );

            Ok(DatasetSchema {
                dataset_info,
                tables: tables.value,
                dataset_id: dataset_id.to_string(),
            })
        })
        .await
    }

    /// POST .../executeQueries with a single DAX query
    pub async fn execute_query(
        &self,
        dataset_id: &str,
        dax_query: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<QueryOutcome> {
        tracing::debug!(dataset_id, query = dax_query, "Executing DAX query");
        run("execute_query", async {
            let path = dataset_path(workspace_id, dataset_id, "/executeQueries");
            let result = self
                .http
                .post_json(&path, &ExecuteQueriesRequest::single(dax_query))
                .await?;
            Ok(QueryOutcome {
                query: dax_query.to_string(),
                result,
                dataset_id: dataset_id.to_string(),
            })
        })
        .await
    }

    /// POST .../refreshes; the service answers 202 with no body
    pub async fn refresh_dataset(
        &self,
        dataset_id: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<RefreshTriggered> {
        tracing::info!(dataset_id, workspace_id = ?workspace_id, "Triggering dataset refresh");
        run("refresh_dataset", async {
            let path = dataset_path(workspace_id, dataset_id, "/refreshes");
            let status = self
                .http
                .authenticated_status(Method::POST, &path, Some(&json!({})))
                .await?;
            Ok(RefreshTriggered {
                message: "Dataset refresh initiated".to_string(),
                dataset_id: dataset_id.to_string(),
                status_code: status.as_u16(),
            })
        })
        .await
    }

    /// GET .../refreshes?$top=N
    pub async fn get_refresh_history(
        &self,
        dataset_id: &str,
        workspace_id: Option<&str>,
        top: u32,
    ) -> Envelope<RefreshHistory> {
        run("get_refresh_history", async {
            let path = dataset_path(workspace_id, dataset_id, "/refreshes");
            let list: ODataList = decode(
                self.http
                    .get_json(&path, &[("$top", top.to_string())])
                    .await?,
            )?;
            Ok(RefreshHistory {
                count: list.value.len(),
                refresh_history: list.value,
                dataset_id: dataset_id.to_string(),
            })
        })
        .await
    }

    /// POST /groups/{ws}/reports
    pub async fn create_report(
        &self,
        workspace_id: &str,
        dataset_id: &str,
        report_name: &str,
    ) -> Envelope<ReportCreated> {
        tracing::info!(workspace_id, dataset_id, report_name, "Creating report");
        run("create_report", async {
            let path = scoped_path(Some(workspace_id), "/reports");
            let report = self
                .http
                .post_json(
                    &path,
                    &CreateReportRequest {
                        name: report_name,
                        dataset_id,
                    },
                )
                .await?;
            let report_id = report.get("id").and_then(Value::as_str).map(str::to_string);
            Ok(ReportCreated {
                report,
                report_id,
                workspace_id: workspace_id.to_string(),
            })
        })
        .await
    }

    /// GET [/groups/{ws}]/reports
    pub async fn list_reports(&self, workspace_id: Option<&str>) -> Envelope<ReportList> {
        tracing::info!(workspace_id = ?workspace_id, "Listing reports");
        run("list_reports", async {
            let path = scoped_path(workspace_id, "/reports");
            let list: ODataList = decode(self.http.get_json(&path, &[]).await?)?;
            Ok(ReportList {
                count: list.value.len(),
                reports: list.value,
                workspace_id: workspace_id.map(str::to_string),
            })
        })
        .await
    }

    /// POST .../tables/{table}/columns
    ///
    /// `data_type` falls back to `String` when not given.
    pub async fn create_calculated_column(
        &self,
        dataset_id: &str,
        table_name: &str,
        column_name: &str,
        dax_expression: &str,
        data_type: Option<ColumnDataType>,
        workspace_id: Option<&str>,
    ) -> Envelope<ColumnCreated> {
        tracing::info!(dataset_id, table_name, column_name, "Creating calculated column");
        run("create_calculated_column", async {
            let path = table_path(workspace_id, dataset_id, table_name, "/columns");
            let column = self
                .http
                .post_json(
                    &path,
                    &CreateColumnRequest {
                        name: column_name,
                        data_type: data_type.unwrap_or_default(),
                        expression: dax_expression,
                    },
                )
                .await?;
            Ok(ColumnCreated {
                column,
                table_name: table_name.to_string(),
                dataset_id: dataset_id.to_string(),
            })
        })
        .await
    }

    /// POST .../tables/{table}/measures
    pub async fn create_measure(
        &self,
        dataset_id: &str,
        table_name: &str,
        measure_name: &str,
        dax_expression: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<MeasureCreated> {
        tracing::info!(dataset_id, table_name, measure_name, "Creating measure");
        run("create_measure", async {
            let path = table_path(workspace_id, dataset_id, table_name, "/measures");
            let measure = self
                .http
                .post_json(
                    &path,
                    &CreateMeasureRequest {
                        name: measure_name,
                        expression: dax_expression,
                    },
                )
                .await?;
            Ok(MeasureCreated {
                measure,
                table_name: table_name.to_string(),
                dataset_id: dataset_id.to_string(),
            })
        })
        .await
    }
}
