use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_gateway::GatewayClient;
use shared_models::error::GatewayError;

#[tokio::test]
async fn test_request_sends_bearer_token_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("estado", "programada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let result: Value = client
        .request_with_query(
            Method::GET,
            "/appointments",
            &[("estado", "programada".to_string())],
            Some("test-token"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(result, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_request_posts_json_body() {
    let mock_server = MockServer::start().await;
    let body = json!({"motivo": "Control"});

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9, "motivo": "Control"})))
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let result: Value = client
        .request(Method::POST, "/appointments", Some("t"), Some(body))
        .await
        .unwrap();

    assert_eq!(result["id"], 9);
}

#[tokio::test]
async fn test_empty_body_decodes_as_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/3"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let result: Value = client
        .request(Method::DELETE, "/appointments/3", Some("t"), None)
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_unauthorized_is_reported_with_server_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expirado"})))
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let result = client
        .request::<Value>(Method::GET, "/appointments", Some("stale"), None)
        .await;

    assert_matches!(
        result,
        Err(GatewayError::Unauthorized { status: 401, ref message }) if message == "Token expirado"
    );
}

#[tokio::test]
async fn test_server_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/appointments/5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let err = client
        .request::<Value>(Method::PUT, "/appointments/5", Some("t"), Some(json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.server_message(), Some("boom"));
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appointments/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let client = GatewayClient::with_base_url(&mock_server.uri());
    let result = client
        .request::<Value>(Method::GET, "/appointments/1", None, None)
        .await;

    assert_matches!(result, Err(GatewayError::Decode(_)));
}
