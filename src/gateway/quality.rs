// Data-quality analysis: one row-count query per table

use super::{quote_table, PowerBiGateway};
use crate::models::payloads::{QualityReport, TableQuality};
use crate::models::powerbi::{extract_row_count, TableInfo};
use crate::models::Envelope;

/// `EVALUATE ROW("RowCount", COUNTROWS('<table>'))`
pub fn row_count_query(table_name: &str) -> String {
    format!(
        "EVALUATE ROW(\"RowCount\", COUNTROWS({}))",
        quote_table(table_name)
    )
}

impl PowerBiGateway {
    /// Row, column and measure counts for every table of a dataset
    ///
    /// Only a failed schema fetch fails the envelope. A table whose count
    /// cannot be obtained gets an `error` entry and the loop moves on.
    pub async fn analyze_data_quality(
        &self,
        dataset_id: &str,
        workspace_id: Option<&str>,
    ) -> Envelope<QualityReport> {
        tracing::info!(dataset_id, workspace_id = ?workspace_id, "Analyzing data quality");

        let schema = match self.get_dataset_schema(dataset_id, workspace_id).await {
            Envelope::Success(schema) => schema,
            Envelope::Failure { error } => return Envelope::Failure { error },
        };

        let mut quality_analysis = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let entry = self.analyze_table(dataset_id, table, workspace_id).await;
            if let TableQuality::Failed { error } = &entry {
                tracing::warn!(table = %table.name, error = %error, "Table analysis failed");
            }
            quality_analysis.push((table.name.clone(), entry));
        }

        Envelope::Success(QualityReport {
            dataset_id: dataset_id.to_string(),
            total_tables: schema.tables.len(),
            quality_analysis,
        })
    }

    async fn analyze_table(
        &self,
        dataset_id: &str,
        table: &TableInfo,
        workspace_id: Option<&str>,
    ) -> TableQuality {
        let query = row_count_query(&table.name);
        let outcome = match self
            .execute_query(dataset_id, &query, workspace_id)
            .await
            .into_result()
        {
            Ok(outcome) => outcome,
            Err(error) => return TableQuality::Failed { error },
        };

        match extract_row_count(&outcome.result) {
            Ok(row_count) => TableQuality::Analyzed {
                row_count,
                column_count: table.columns.len(),
                measure_count: table.measures.len(),
            },
            Err(e) => TableQuality::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_query() {
        assert_eq!(
            row_count_query("Sales"),
            "EVALUATE ROW(\"RowCount\", COUNTROWS('Sales'))"
        );
        assert_eq!(
            row_count_query("O'Brien"),
            "EVALUATE ROW(\"RowCount\", COUNTROWS('O''Brien'))"
        );
    }
}
