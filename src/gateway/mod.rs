// Power BI gateway
// Primitive operations wrap one or two REST calls; composed operations fan
// out over tables sequentially and tolerate per-table failures.

mod export;
mod operations;
mod quality;

pub use export::{rows_to_csv, DEFAULT_EXPORT_ROWS};
pub use operations::DEFAULT_REFRESH_HISTORY_TOP;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use urlencoding::encode;

use crate::config::GatewaySettings;
use crate::error::Result;
use crate::http_client::PowerBiHttpClient;
use crate::models::Envelope;

/// One authenticated session against the Power BI REST API
///
/// Owns its credential; two gateways never share a token.
pub struct PowerBiGateway {
    http: PowerBiHttpClient,
}

impl PowerBiGateway {
    pub fn new(settings: &GatewaySettings) -> anyhow::Result<Self> {
        Ok(Self {
            http: PowerBiHttpClient::new(settings)?,
        })
    }

    pub fn http(&self) -> &PowerBiHttpClient {
        &self.http
    }
}

/// Prefix `path` with `/groups/{workspace_id}` when a workspace is given
///
/// Ids are percent-encoded as single path segments.
pub fn scoped_path(workspace_id: Option<&str>, path: &str) -> String {
    match workspace_id {
        Some(ws) if !ws.is_empty() => format!("/groups/{}{}", encode(ws), path),
        _ => path.to_string(),
    }
}

/// `[/groups/{ws}]/datasets/{dataset_id}{suffix}`
pub fn dataset_path(workspace_id: Option<&str>, dataset_id: &str, suffix: &str) -> String {
    scoped_path(
        workspace_id,
        &format!("/datasets/{}{}", encode(dataset_id), suffix),
    )
}

/// `[/groups/{ws}]/datasets/{dataset_id}/tables/{table_name}{suffix}`
pub fn table_path(
    workspace_id: Option<&str>,
    dataset_id: &str,
    table_name: &str,
    suffix: &str,
) -> String {
    dataset_path(
        workspace_id,
        dataset_id,
        &format!("/tables/{}{}", encode(table_name), suffix),
    )
}

/// Quote a table name for DAX, doubling embedded single quotes
pub fn quote_table(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Run one operation body and fold its outcome into an envelope
async fn run<T, F>(operation: &'static str, body: F) -> Envelope<T>
where
    F: Future<Output = Result<T>>,
{
    let result = body.await;
    if let Err(e) = &result {
        tracing::warn!(operation, error = %e, "Gateway operation failed");
    }
    Envelope::from(result)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
