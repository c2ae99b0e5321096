// Power BI REST wire format

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

// ==================================================================================================
// Response Models
// ==================================================================================================

/// OData collection: `{"value": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct ODataList<T = Value> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// Table entry of `GET .../datasets/{id}/tables`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub measures: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row of a query result, keyed by column name in service order
pub type Row = Map<String, Value>;

/// `POST .../executeQueries` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteQueriesResponse {
    #[serde(default)]
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub tables: Vec<QueryTable>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryTable {
    pub rows: Option<Vec<Row>>,
}

impl ExecuteQueriesResponse {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Rows of `results[0].tables[0]`
    pub fn into_first_table_rows(self) -> Result<Vec<Row>> {
        let result = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::UnexpectedShape("results[0]".to_string()))?;

        if let Some(error) = result.error {
            return Err(ApiError::QueryFailed(error.to_string()));
        }

        result
            .tables
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::UnexpectedShape("results[0].tables[0]".to_string()))?
            .rows
            .ok_or_else(|| ApiError::UnexpectedShape("results[0].tables[0].rows".to_string()))
    }
}

/// Key the query engine gives the `RowCount` alias of `ROW("RowCount", ...)`
pub const ROW_COUNT_KEY: &str = "[RowCount]";

/// Row count from the single-row result of a `ROW("RowCount", COUNTROWS(...))` query
///
/// A blank count (empty table) comes back as `null` and reads as zero.
pub fn extract_row_count(result: &Value) -> Result<u64> {
    let rows = ExecuteQueriesResponse::from_value(result)?.into_first_table_rows()?;
    let row = rows
        .first()
        .ok_or_else(|| ApiError::UnexpectedShape("results[0].tables[0].rows[0]".to_string()))?;

    match row.get(ROW_COUNT_KEY) {
        None => Err(ApiError::UnexpectedShape(format!(
            "results[0].tables[0].rows[0].{}",
            ROW_COUNT_KEY
        ))),
        Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| {
                ApiError::UnexpectedShape(format!("integer {} (got {})", ROW_COUNT_KEY, value))
            }),
    }
}

// ==================================================================================================
// Request Models
// ==================================================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueriesRequest<'a> {
    pub queries: Vec<DaxQuery<'a>>,
    pub serializer_settings: SerializerSettings,
}

impl<'a> ExecuteQueriesRequest<'a> {
    /// Single query with nulls kept in the result rows
    pub fn single(query: &'a str) -> Self {
        Self {
            queries: vec![DaxQuery { query }],
            serializer_settings: SerializerSettings {
                include_nulls: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DaxQuery<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializerSettings {
    pub include_nulls: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest<'a> {
    pub name: &'a str,
    pub dataset_id: &'a str,
}

/// Data types accepted for calculated columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnDataType {
    #[default]
    String,
    Int64,
    Double,
    Decimal,
    Boolean,
    DateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumnRequest<'a> {
    pub name: &'a str,
    pub data_type: ColumnDataType,
    pub expression: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMeasureRequest<'a> {
    pub name: &'a str,
    pub expression: &'a str,
}
