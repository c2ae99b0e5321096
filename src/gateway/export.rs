// Tabular export of a query result as comma-delimited text

use serde_json::Value;

use super::{quote_table, PowerBiGateway};
use crate::models::payloads::CsvExport;
use crate::models::powerbi::{ExecuteQueriesResponse, Row};
use crate::models::Envelope;

/// Row limit applied when the caller does not give one
pub const DEFAULT_EXPORT_ROWS: u32 = 1000;

/// `EVALUATE TOPN(<max_rows>, '<table>')`
pub fn top_n_query(table_name: &str, max_rows: u32) -> String {
    format!("EVALUATE TOPN({}, {})", max_rows, quote_table(table_name))
}

/// Render rows as delimited text, returning the text and the column count
///
/// Columns come from the key order of the first row. Commas inside values
/// become semicolons, so cell values are not recoverable verbatim.
pub fn rows_to_csv(rows: &[Row]) -> (String, usize) {
    let Some(first) = rows.first() else {
        return (String::new(), 0);
    };

    let columns: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| csv_cell(row.get(column.as_str())))
            .collect();
        lines.push(cells.join(","));
    }

    (lines.join("\n"), columns.len())
}

fn csv_cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    text.replace(',', ";")
}

impl PowerBiGateway {
    /// Export up to `max_rows` rows of a table as delimited text
    pub async fn export_table_to_csv(
        &self,
        dataset_id: &str,
        table_name: &str,
        workspace_id: Option<&str>,
        max_rows: u32,
    ) -> Envelope<CsvExport> {
        tracing::info!(dataset_id, table_name, max_rows, "Exporting table");

        let query = top_n_query(table_name, max_rows);
        let outcome = match self.execute_query(dataset_id, &query, workspace_id).await {
            Envelope::Success(outcome) => outcome,
            Envelope::Failure { error } => return Envelope::Failure { error },
        };

        let rows = match ExecuteQueriesResponse::from_value(&outcome.result)
            .and_then(ExecuteQueriesResponse::into_first_table_rows)
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(table_name, error = %e, "Export result could not be read");
                return Envelope::failure(e.to_string());
            }
        };

        if rows.is_empty() {
            return Envelope::Success(CsvExport {
                csv_content: String::new(),
                row_count: 0,
                column_count: 0,
                table_name: table_name.to_string(),
                message: Some("No data found in table".to_string()),
            });
        }

        let (csv_content, column_count) = rows_to_csv(&rows);
        Envelope::Success(CsvExport {
            csv_content,
            row_count: rows.len(),
            column_count,
            table_name: table_name.to_string(),
            message: None,
        })
    }
}
