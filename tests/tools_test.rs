//! Built-in tools against a mock remote API

mod common;

use common::fixed_client;
use permgate::auth::CallContext;
use permgate::tools::{
    GenerateSysqlTool, GetEventInfoTool, GetEventProcessTreeTool, ListRuntimeEventsTool,
    PromQlTool, RunSysqlTool, Tool,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_run_sysql_terminates_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sysql/v2/query"))
        .and(body_json(json!({"q": "MATCH Vulnerability RETURN Vulnerability;"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let tool = RunSysqlTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(
            &CallContext::new(),
            &json!({"sysql_query": "MATCH Vulnerability RETURN Vulnerability"}),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_run_sysql_requires_query() {
    let server = MockServer::start().await;
    let tool = RunSysqlTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"sysql_query": "  "}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_event_info_reports_remote_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure/events/v1/events/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let tool = GetEventInfoTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"event_id": "missing"}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.to_text().contains("404"));
}

#[tokio::test]
async fn test_list_runtime_events_sends_time_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure/events/v1/events"))
        .and(query_param("limit", "50"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "e1"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let tool = ListRuntimeEventsTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(result.to_text().contains("e1"));

    let requests = server.received_requests().await.unwrap();
    let query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(query.iter().any(|(k, _)| k == "from"));
    assert!(query.iter().any(|(k, _)| k == "to"));
    assert!(query
        .iter()
        .any(|(k, v)| k == "filter" && v.starts_with("source != \"audittrail\"")));
}

#[tokio::test]
async fn test_list_clusters_filters_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prometheus/api/v1/query"))
        .and(query_param("query", "kube_cluster_info{cluster=\"prod\"}"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let tool = PromQlTool::named("kubernetes_list_clusters", fixed_client(&server, "t")).unwrap();
    let result = tool
        .execute(&CallContext::new(), &json!({"cluster_name": "prod"}))
        .await
        .unwrap();
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_generate_sysql_sends_question() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sage/sysql/generate"))
        .and(query_param("question", "list critical vulnerabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "MATCH Vulnerability WHERE Vulnerability.severity = 'Critical' RETURN Vulnerability;"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = GenerateSysqlTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(
            &CallContext::new(),
            &json!({"question": " list critical vulnerabilities "}),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(result.to_text().contains("MATCH Vulnerability"));
}

#[tokio::test]
async fn test_generate_sysql_requires_question() {
    let server = MockServer::start().await;
    let tool = GenerateSysqlTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"question": ""}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert_eq!(result.to_text(), "question is required");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_tree_combines_branches_and_tree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-branches/ev1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"branches": ["b1"]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-trees/ev1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"root": "bash"})))
        .expect(1)
        .mount(&server)
        .await;

    let tool = GetEventProcessTreeTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"event_id": "ev1"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    let body: serde_json::Value = serde_json::from_str(&result.to_text()).unwrap();
    assert_eq!(body["tree"]["root"], "bash");
    assert_eq!(body["branches"]["branches"][0], "b1");
    assert!(body.get("metadata").is_none());
}

#[tokio::test]
async fn test_process_tree_missing_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-branches/ev2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-trees/ev2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tool = GetEventProcessTreeTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"event_id": "ev2"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert!(result
        .to_text()
        .contains("Process tree not available for this event"));
}

#[tokio::test]
async fn test_process_tree_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-branches/ev3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/process-tree/v1/process-trees/ev3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let tool = GetEventProcessTreeTool::new(fixed_client(&server, "t"));
    let result = tool
        .execute(&CallContext::new(), &json!({"event_id": "ev3"}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.to_text().contains("process branches"));
}

#[tokio::test]
async fn test_workloads_query_reaches_prometheus() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prometheus/api/v1/query"))
        .and(query_param(
            "query",
            "kube_workload_status_unavailable{kube_namespace_name=\"prod\"}",
        ))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let tool = PromQlTool::named("kubernetes_list_workloads", fixed_client(&server, "t")).unwrap();
    let result = tool
        .execute(
            &CallContext::new(),
            &json!({"status": "unavailable", "namespace_name": "prod", "limit": 5}),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_invalid_workload_status_sends_nothing() {
    let server = MockServer::start().await;
    let tool = PromQlTool::named("kubernetes_list_workloads", fixed_client(&server, "t")).unwrap();
    let result = tool
        .execute(&CallContext::new(), &json!({"status": "broken"}))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(server.received_requests().await.unwrap().is_empty());
}
