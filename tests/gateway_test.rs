// Integration tests for the Power BI gateway
//
// A mockito server stands in for both the identity provider and the
// Power BI REST API.

use mockito::{Matcher, Mock, Server};
use serde_json::json;

use powerbi_gateway::{
    auth::Credentials,
    config::GatewaySettings,
    gateway::PowerBiGateway,
    models::payloads::TableQuality,
    models::powerbi::ColumnDataType,
    Envelope,
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";
const API: &str = "/v1.0/myorg";

async fn token_mock(server: &mut Server) -> Mock {
    server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok-1","expires_in":3600}"#)
        .create_async()
        .await
}

fn gateway_for(server: &Server) -> PowerBiGateway {
    let settings = GatewaySettings::new(Credentials::new("tenant-1", "client-1", "secret-1"))
        .with_base_url(format!("{}{}", server.url(), API))
        .with_authority_url(server.url());
    PowerBiGateway::new(&settings).expect("Failed to create gateway")
}

fn api(path: &str) -> String {
    format!("{}{}", API, path)
}

fn query_body(dax: &str) -> Matcher {
    Matcher::PartialJson(json!({"queries": [{"query": dax}]}))
}

fn rows_result(rows: serde_json::Value) -> String {
    json!({"results": [{"tables": [{"rows": rows}]}]}).to_string()
}

// ==================================================================================================
// Credential Tests
// ==================================================================================================

#[tokio::test]
async fn test_token_reused_across_operations() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token":"tok-1","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", api("/groups").as_str())
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_body(r#"{"value":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    assert!(gateway.list_workspaces().await.is_success());
    assert!(gateway.list_workspaces().await.is_success());

    token.assert_async().await;
}

#[tokio::test]
async fn test_token_at_expiry_is_refreshed() {
    let mut server = Server::new_async().await;
    // expires_in of 60 leaves no usable lifetime after the safety margin
    let token = server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token":"short-lived","expires_in":60}"#)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("GET", api("/groups").as_str())
        .with_status(200)
        .with_body(r#"{"value":[]}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    gateway.list_workspaces().await;
    gateway.list_workspaces().await;

    token.assert_async().await;
}

#[tokio::test]
async fn test_missing_credentials_fail_every_operation() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", TOKEN_PATH)
        .expect(0)
        .create_async()
        .await;
    let datasets = server
        .mock("GET", api("/datasets").as_str())
        .expect(0)
        .create_async()
        .await;

    let settings = GatewaySettings::new(Credentials::new("tenant-1", "client-1", ""))
        .with_base_url(format!("{}{}", server.url(), API))
        .with_authority_url(server.url());
    let gateway = PowerBiGateway::new(&settings).unwrap();

    let env = gateway.list_datasets(None).await;
    let error = env.error().expect("should fail");
    assert!(error.contains("missing credentials"));
    assert!(error.contains("client_secret"));

    token.assert_async().await;
    datasets.assert_async().await;
}

#[tokio::test]
async fn test_token_rejection_becomes_failed_envelope() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", TOKEN_PATH)
        .with_status(401)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let env = gateway_for(&server).list_reports(Some("W")).await;
    let error = env.error().unwrap();
    assert!(error.starts_with("Authentication failed"));
    assert!(error.contains("401"));
}

#[tokio::test]
async fn test_out_of_range_token_lifetime_becomes_failed_envelope() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_body(r#"{"access_token":"tok","expires_in":100000000000000000}"#)
        .create_async()
        .await;
    let groups = server
        .mock("GET", api("/groups").as_str())
        .expect(0)
        .create_async()
        .await;

    let env = gateway_for(&server).list_workspaces().await;
    let error = env.error().expect("should fail");
    assert!(error.starts_with("Authentication failed"));
    assert!(error.contains("expires_in"));

    groups.assert_async().await;
}

// ==================================================================================================
// Primitive Operation Tests
// ==================================================================================================

#[tokio::test]
async fn test_list_datasets_scoping() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let scoped = server
        .mock("GET", api("/groups/W/datasets").as_str())
        .with_status(200)
        .with_body(r#"{"value":[{"id":"d1"},{"id":"d2"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let unscoped = server
        .mock("GET", api("/datasets").as_str())
        .with_status(200)
        .with_body(r#"{"value":[{"id":"d3"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway_for(&server);

    let env = gateway.list_datasets(Some("W")).await;
    let payload = env.payload().unwrap();
    assert_eq!(payload.count, 2);
    assert_eq!(payload.workspace_id.as_deref(), Some("W"));

    let env = gateway.list_datasets(None).await;
    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({
            "success": true,
            "datasets": [{"id": "d3"}],
            "workspace_id": null,
            "count": 1
        })
    );

    scoped.assert_async().await;
    unscoped.assert_async().await;
}

#[tokio::test]
async fn test_get_dataset_schema_issues_two_calls() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("GET", api("/datasets/D").as_str())
        .with_status(200)
        .with_body(r#"{"id":"D","name":"Sales Model"}"#)
        .create_async()
        .await;
    server
        .mock("GET", api("/datasets/D/tables").as_str())
        .with_status(200)
        .with_body(r#"{"value":[{"name":"Sales","columns":[{"name":"Qty"}]}]}"#)
        .create_async()
        .await;

    let env = gateway_for(&server).get_dataset_schema("D", None).await;
    let schema = env.payload().unwrap();
    assert_eq!(schema.dataset_info["name"], "Sales Model");
    assert_eq!(schema.tables.len(), 1);
    assert_eq!(schema.tables[0].name, "Sales");
}

#[tokio::test]
async fn test_execute_query_request_body() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let mock = server
        .mock("POST", api("/groups/W/datasets/D/executeQueries").as_str())
        .match_body(Matcher::Json(json!({
            "queries": [{"query": "EVALUATE 'Sales'"}],
            "serializerSettings": {"includeNulls": true}
        })))
        .with_status(200)
        .with_body(rows_result(json!([{"Sales[Qty]": 1}])))
        .create_async()
        .await;

    let env = gateway_for(&server)
        .execute_query("D", "EVALUATE 'Sales'", Some("W"))
        .await;

    mock.assert_async().await;
    let outcome = env.payload().unwrap();
    assert_eq!(outcome.query, "EVALUATE 'Sales'");
    assert_eq!(outcome.result["results"][0]["tables"][0]["rows"][0]["Sales[Qty]"], 1);
}

#[tokio::test]
async fn test_refresh_dataset_reports_status_code() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/datasets/D/refreshes").as_str())
        .with_status(202)
        .create_async()
        .await;

    let env = gateway_for(&server).refresh_dataset("D", None).await;
    let payload = env.payload().unwrap();
    assert_eq!(payload.status_code, 202);
    assert_eq!(payload.message, "Dataset refresh initiated");
}

#[tokio::test]
async fn test_refresh_history_passes_top() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let mock = server
        .mock("GET", api("/datasets/D/refreshes").as_str())
        .match_query(Matcher::UrlEncoded("$top".into(), "2".into()))
        .with_status(200)
        .with_body(r#"{"value":[{"status":"Completed"},{"status":"Failed"}]}"#)
        .create_async()
        .await;

    let env = gateway_for(&server).get_refresh_history("D", None, 2).await;

    mock.assert_async().await;
    assert_eq!(env.payload().unwrap().count, 2);
}

#[tokio::test]
async fn test_create_report_echoes_id() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let mock = server
        .mock("POST", api("/groups/W/reports").as_str())
        .match_body(Matcher::Json(json!({"name": "Quarterly", "datasetId": "D"})))
        .with_status(200)
        .with_body(r#"{"id":"r-1","name":"Quarterly"}"#)
        .create_async()
        .await;

    let env = gateway_for(&server).create_report("W", "D", "Quarterly").await;

    mock.assert_async().await;
    let payload = env.payload().unwrap();
    assert_eq!(payload.report_id.as_deref(), Some("r-1"));
    assert_eq!(payload.workspace_id, "W");
}

#[tokio::test]
async fn test_create_calculated_column_data_type() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let default_type = server
        .mock("POST", api("/datasets/D/tables/Sales/columns").as_str())
        .match_body(Matcher::Json(json!({
            "name": "Label",
            "dataType": "String",
            "expression": "[A]"
        })))
        .with_status(200)
        .with_body(r#"{"name":"Label"}"#)
        .expect(1)
        .create_async()
        .await;
    let explicit_type = server
        .mock("POST", api("/datasets/D/tables/Sales/columns").as_str())
        .match_body(Matcher::PartialJson(json!({"dataType": "Int64"})))
        .with_status(200)
        .with_body(r#"{"name":"Units"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let env = gateway
        .create_calculated_column("D", "Sales", "Label", "[A]", None, None)
        .await;
    assert_eq!(env.payload().unwrap().table_name, "Sales");

    let env = gateway
        .create_calculated_column("D", "Sales", "Units", "[Qty]", Some(ColumnDataType::Int64), None)
        .await;
    assert!(env.is_success());

    default_type.assert_async().await;
    explicit_type.assert_async().await;
}

#[tokio::test]
async fn test_create_measure_http_error() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/groups/W/datasets/D/tables/Sales/measures").as_str())
        .match_body(Matcher::Json(json!({"name": "Total", "expression": "SUM(Sales[Qty])"})))
        .with_status(404)
        .with_body("Table not found")
        .create_async()
        .await;

    let env = gateway_for(&server)
        .create_measure("D", "Sales", "Total", "SUM(Sales[Qty])", Some("W"))
        .await;

    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({"success": false, "error": "Power BI API error: 404 - Table not found"})
    );
}

#[tokio::test]
async fn test_table_name_is_one_path_segment() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let mock = server
        .mock("POST", api("/datasets/D/tables/Sales%2F2024%3Fv/measures").as_str())
        .with_status(200)
        .with_body(r#"{"name":"Total"}"#)
        .expect(1)
        .create_async()
        .await;

    let env = gateway_for(&server)
        .create_measure("D", "Sales/2024?v", "Total", "SUM(Sales[Qty])", None)
        .await;

    mock.assert_async().await;
    assert_eq!(env.payload().unwrap().table_name, "Sales/2024?v");
}

// ==================================================================================================
// Composed Operation Tests
// ==================================================================================================

async fn schema_mocks(server: &mut Server, tables: serde_json::Value) {
    server
        .mock("GET", api("/datasets/D").as_str())
        .with_status(200)
        .with_body(r#"{"id":"D"}"#)
        .create_async()
        .await;
    server
        .mock("GET", api("/datasets/D/tables").as_str())
        .with_status(200)
        .with_body(json!({ "value": tables }).to_string())
        .create_async()
        .await;
}

#[tokio::test]
async fn test_quality_analysis_tolerates_table_failure() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    schema_mocks(
        &mut server,
        json!([
            {"name": "A", "columns": [{"name": "c1"}, {"name": "c2"}], "measures": [{"name": "m"}]},
            {"name": "B", "columns": []}
        ]),
    )
    .await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .match_body(query_body("EVALUATE ROW(\"RowCount\", COUNTROWS('A'))"))
        .with_status(200)
        .with_body(rows_result(json!([{"[RowCount]": 10}])))
        .create_async()
        .await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .match_body(query_body("EVALUATE ROW(\"RowCount\", COUNTROWS('B'))"))
        .with_status(400)
        .with_body("Query execution failed")
        .create_async()
        .await;

    let env = gateway_for(&server).analyze_data_quality("D", None).await;
    assert!(env.is_success());

    let report = env.payload().unwrap();
    assert_eq!(report.total_tables, 2);
    assert_eq!(
        report.table("A"),
        Some(&TableQuality::Analyzed {
            row_count: 10,
            column_count: 2,
            measure_count: 1
        })
    );
    assert!(report.table("B").unwrap().is_failed());

    let value = serde_json::to_value(&env).unwrap();
    assert_eq!(value["quality_analysis"]["A"]["row_count"], 10);
    assert!(value["quality_analysis"]["B"]["error"]
        .as_str()
        .unwrap()
        .contains("400"));
}

#[tokio::test]
async fn test_quality_analysis_malformed_count_is_per_table() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    schema_mocks(&mut server, json!([{"name": "A"}])).await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .with_status(200)
        .with_body(rows_result(json!([{"RowCount": 10}])))
        .create_async()
        .await;

    let env = gateway_for(&server).analyze_data_quality("D", None).await;
    let report = env.payload().unwrap();
    match report.table("A").unwrap() {
        TableQuality::Failed { error } => assert!(error.contains("[RowCount]")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_quality_analysis_schema_failure_short_circuits() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("GET", api("/datasets/D").as_str())
        .with_status(404)
        .with_body("Dataset not found")
        .create_async()
        .await;
    let queries = server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .expect(0)
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let schema = gateway.get_dataset_schema("D", None).await;
    let analysis = gateway.analyze_data_quality("D", None).await;

    assert_eq!(analysis.error(), schema.error());
    assert_eq!(
        analysis.error(),
        Some("Power BI API error: 404 - Dataset not found")
    );
    queries.assert_async().await;
}

#[tokio::test]
async fn test_export_clean_rows() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    let mock = server
        .mock("POST", api("/groups/W/datasets/D/executeQueries").as_str())
        .match_body(query_body("EVALUATE TOPN(1000, 'T')"))
        .with_status(200)
        .with_body(rows_result(json!([{"x": "1", "y": "2"}, {"x": "3", "y": "4"}])))
        .create_async()
        .await;

    let env = gateway_for(&server)
        .export_table_to_csv("D", "T", Some("W"), 1000)
        .await;

    mock.assert_async().await;
    let export = env.payload().unwrap();
    assert_eq!(export.csv_content, "x,y\n1,2\n3,4");
    assert_eq!(export.row_count, 2);
    assert_eq!(export.column_count, 2);
    assert_eq!(export.table_name, "T");
}

#[tokio::test]
async fn test_export_replaces_commas() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .match_body(query_body("EVALUATE TOPN(5, 'T')"))
        .with_status(200)
        .with_body(rows_result(json!([{"v": "a,b"}])))
        .create_async()
        .await;

    let env = gateway_for(&server).export_table_to_csv("D", "T", None, 5).await;
    assert_eq!(env.payload().unwrap().csv_content, "v\na;b");
}

#[tokio::test]
async fn test_export_empty_table() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .with_status(200)
        .with_body(rows_result(json!([])))
        .create_async()
        .await;

    let env = gateway_for(&server).export_table_to_csv("D", "T", None, 1000).await;
    let export = env.payload().unwrap();
    assert_eq!(export.csv_content, "");
    assert_eq!(export.row_count, 0);
    assert_eq!(export.column_count, 0);
    assert_eq!(export.message.as_deref(), Some("No data found in table"));
}

#[tokio::test]
async fn test_export_query_failure_passes_through() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let export = gateway.export_table_to_csv("D", "T", None, 10).await;
    let query = gateway.execute_query("D", "EVALUATE TOPN(10, 'T')", None).await;

    assert!(!export.is_success());
    assert_eq!(export.error(), query.error());
}

#[tokio::test]
async fn test_export_malformed_result() {
    let mut server = Server::new_async().await;
    token_mock(&mut server).await;
    server
        .mock("POST", api("/datasets/D/executeQueries").as_str())
        .with_status(200)
        .with_body(r#"{"results":[]}"#)
        .create_async()
        .await;

    let env: Envelope<_> = gateway_for(&server).export_table_to_csv("D", "T", None, 10).await;
    assert_eq!(
        env.error(),
        Some("Unexpected response shape: missing results[0]")
    );
}
