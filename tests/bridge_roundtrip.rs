//! Tool calls against a live reference host over real loopback HTTP.
//!
//! Each test binds both planes on ephemeral ports, points an `HttpBridge` at
//! them and drives the MCP tool handlers.
//!
//! Run with: cargo test --test bridge_roundtrip

#![cfg(feature = "host")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use appmodel_bridge::catalog::Catalogs;
use appmodel_bridge::host::{bind_loopback, DocumentStore, HostHandle, HostOptions, HostState};
use appmodel_bridge::mcp::ToolHandlers;
use appmodel_bridge::types::Document;
use appmodel_bridge::{BridgeConfig, HttpBridge, Toolbox};

fn model() -> Value {
    json!({
        "root": {
            "name": "Shop",
            "namespace": [{
                "name": "Main",
                "object": [
                    {"name": "Tac"},
                    {
                        "name": "Customer",
                        "parentObjectName": "Tac",
                        "report": [{
                            "name": "CustomerList",
                            "isCachingAllowed": "true",
                            "reportColumn": [
                                {"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}
                            ]
                        }],
                        "objectWorkflow": [
                            {"name": "CustomerAdd"},
                            {"name": "ApproveCustomer", "isDynaFlow": "true"}
                        ]
                    },
                    {
                        "name": "Order",
                        "parentObjectName": "Customer",
                        "report": [{"name": "CustomerList"}]
                    }
                ]
            }]
        }
    })
}

async fn start(store: DocumentStore, options: HostOptions) -> HostHandle {
    let state = HostState::new(store, &options);
    bind_loopback(state, "127.0.0.1", 0, 0).await.unwrap()
}

async fn start_default() -> HostHandle {
    let store = DocumentStore::new(Document::from_value(model()).unwrap());
    start(store, HostOptions::default()).await
}

fn tools(config: BridgeConfig) -> ToolHandlers {
    let catalogs = Catalogs::builtin().unwrap();
    let bridge = Arc::new(HttpBridge::new(config).unwrap());
    ToolHandlers::new(Toolbox::new(bridge, &catalogs).unwrap())
}

async fn call(handlers: &ToolHandlers, name: &str, args: Value) -> Value {
    let result = handlers.handle(name, args).await;
    assert_eq!(result.is_error, None, "{name}: {}", result.content[0].text);
    serde_json::from_str(&result.content[0].text).unwrap()
}

#[tokio::test]
async fn test_first_match_wins_without_owner() {
    let host = start_default().await;
    let handlers = tools(host.bridge_config());

    let first = call(&handlers, "get_report", json!({"report_name": "customerlist"})).await;
    assert_eq!(first["success"], json!(true));
    assert_eq!(first["owner_object_name"], json!("Customer"));
    assert!(first["report"].get("isCachingAllowed").is_none());

    let scoped = call(
        &handlers,
        "get_report",
        json!({"report_name": "CustomerList", "owner_object_name": "order"}),
    )
    .await;
    assert_eq!(scoped["owner_object_name"], json!("Order"));

    let missing = call(
        &handlers,
        "get_report",
        json!({"report_name": "CustomerList", "owner_object_name": "Invoice"}),
    )
    .await;
    assert_eq!(missing["error_code"], json!("NOT_FOUND"));
    assert_eq!(missing["error"], json!("Data object 'Invoice' not found"));
}

#[tokio::test]
async fn test_move_column_reorders_on_host() {
    let host = start_default().await;
    let handlers = tools(host.bridge_config());

    let moved = call(
        &handlers,
        "move_report_column",
        json!({
            "report_name": "CustomerList",
            "owner_object_name": "Customer",
            "column_name": "B",
            "new_position": 3
        }),
    )
    .await;
    assert_eq!(moved["old_position"], json!(1));
    assert_eq!(moved["new_position"], json!(3));

    let report = call(
        &handlers,
        "get_report",
        json!({"report_name": "CustomerList", "owner_object_name": "Customer"}),
    )
    .await;
    let names: Vec<_> = report["report"]["reportColumn"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["A", "C", "D", "B"]);

    let out_of_range = call(
        &handlers,
        "move_report_column",
        json!({"report_name": "CustomerList", "column_name": "A", "new_position": 4}),
    )
    .await;
    assert_eq!(out_of_range["error_code"], json!("INVALID_POSITION"));
}

#[tokio::test]
async fn test_duplicates_are_rejected() {
    let host = start_default().await;
    let handlers = tools(host.bridge_config());

    let report = call(
        &handlers,
        "add_report",
        json!({"owner_object_name": "Tac", "report": {"name": "CUSTOMERLIST"}}),
    )
    .await;
    assert_eq!(report["error_code"], json!("DUPLICATE_NAME"));

    let column = call(
        &handlers,
        "add_report_column",
        json!({"report_name": "CustomerList", "column": {"name": "C"}}),
    )
    .await;
    assert_eq!(column["error_code"], json!("DUPLICATE_NAME"));

    let added = call(
        &handlers,
        "add_report_column",
        json!({"report_name": "CustomerList", "column": {"name": "E", "headerText": "E"}}),
    )
    .await;
    assert_eq!(added["success"], json!(true));
    assert_eq!(added["owner_object_name"], json!("Customer"));
}

#[tokio::test]
async fn test_validation_stops_before_host() {
    let host = start_default().await;
    let handlers = tools(host.bridge_config());

    let rejected = call(
        &handlers,
        "add_report",
        json!({
            "owner_object_name": "Customer",
            "report": {"name": "CustomerGrid", "visualizationType": "Pie"}
        }),
    )
    .await;
    assert_eq!(rejected["error_code"], json!("VALIDATION_FAILED"));

    let listed = call(&handlers, "list_reports", json!({"owner_object_name": "Customer"})).await;
    assert_eq!(listed["count"], json!(1));
    let status = call(&handlers, "get_model_status", json!({})).await;
    assert_eq!(status["has_unsaved_changes"], json!(false));
}

#[tokio::test]
async fn test_flow_kinds_do_not_cross() {
    let host = start_default().await;
    let handlers = tools(host.bridge_config());

    let wrong_kind = call(
        &handlers,
        "update_general_flow",
        json!({"general_flow_name": "ApproveCustomer", "updates": {"titleText": "Approve"}}),
    )
    .await;
    assert_eq!(wrong_kind["error_code"], json!("NOT_FOUND"));

    let workflows = call(&handlers, "list_workflows", json!({})).await;
    assert_eq!(workflows["count"], json!(1));
    assert_eq!(workflows["workflows"][0]["workflow"]["name"], json!("ApproveCustomer"));
}

#[tokio::test]
async fn test_auth_probe_timeout_means_logged_out() {
    let store = DocumentStore::new(Document::from_value(model()).unwrap());
    let host = start(
        store,
        HostOptions {
            logged_in: true,
            auth_delay_ms: Some(500),
        },
    )
    .await;
    let mut config = host.bridge_config();
    config.timeouts.auth_probe_ms = 50;
    let handlers = tools(config);

    let gated = call(&handlers, "open_model_feature_catalog", json!({})).await;
    assert_eq!(gated["success"], json!(false));
    assert_eq!(gated["error_code"], json!("AUTH_REQUIRED"));

    let ungated = call(
        &handlers,
        "open_report_details",
        json!({"report_name": "CustomerList"}),
    )
    .await;
    assert_eq!(ungated["success"], json!(true));
}

#[tokio::test]
async fn test_unreachable_host_is_bridge_unavailable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let handlers = tools(BridgeConfig {
        data_port: port,
        command_port: port,
        ..Default::default()
    });

    let result = call(&handlers, "list_reports", json!({})).await;
    assert_eq!(result["success"], json!(false));
    assert_eq!(result["error_code"], json!("BRIDGE_UNAVAILABLE"));

    let auth = call(&handlers, "get_auth_status", json!({})).await;
    assert_eq!(auth["isLoggedIn"], json!(false));
}

#[tokio::test]
async fn test_save_model_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.model.json");
    std::fs::write(&path, serde_json::to_string(&model()).unwrap()).unwrap();

    let host = start(DocumentStore::load(&path).unwrap(), HostOptions::default()).await;
    let handlers = tools(host.bridge_config());

    call(
        &handlers,
        "update_data_object",
        json!({"data_object_name": "order", "updates": {"isLookup": "false"}}),
    )
    .await;
    let status = call(&handlers, "get_model_status", json!({})).await;
    assert_eq!(status["has_unsaved_changes"], json!(true));

    let saved = call(&handlers, "save_model", json!({})).await;
    assert_eq!(saved["success"], json!(true));

    let status = call(&handlers, "get_model_status", json!({})).await;
    assert_eq!(status["has_unsaved_changes"], json!(false));
    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        on_disk["root"]["namespace"][0]["object"][2]["isLookup"],
        json!("false")
    );
}
