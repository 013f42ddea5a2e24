#![allow(clippy::unwrap_used)]
// Integration tests for `ResourceClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use genrm_api::{
    Credentials, Error, HttpMethod, RemoteClient, ResourceClient, TransportConfig,
    discover_environment,
};

const RG_PATH: &str = "/subscriptions/sub1/resourceGroups/rg1";
const API_VERSION: &str = "2021-04-01";

// ── Helpers ─────────────────────────────────────────────────────────

fn transport() -> TransportConfig {
    TransportConfig {
        max_retries: 0,
        ..TransportConfig::default()
    }
    .with_fast_polling()
}

async fn setup() -> (MockServer, ResourceClient) {
    let server = MockServer::start().await;
    let client =
        ResourceClient::from_reqwest(&server.uri(), reqwest::Client::new(), &transport()).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_resource() {
    let (server, client) = setup().await;

    let body = json!({ "id": RG_PATH, "name": "rg1", "location": "westeurope" });
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .and(query_param("api-version", API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let resp = client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, body);
}

#[tokio::test]
async fn test_put_sends_body() {
    let (server, client) = setup().await;

    let request = json!({ "location": "westeurope", "tags": { "env": "dev" } });
    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .and(query_param("api-version", API_VERSION))
        .and(body_json(&request))
        .respond_with(ResponseTemplate::new(200).set_body_json(&request))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .create_update(
            &CancellationToken::new(),
            RG_PATH,
            API_VERSION,
            &request,
            HttpMethod::Put,
        )
        .await
        .unwrap();

    assert_eq!(resp.body, request);
}

#[tokio::test]
async fn test_post_method_is_honoured() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/things/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .create_update(
            &CancellationToken::new(),
            "/things/a",
            "1.0",
            &json!({}),
            HttpMethod::Post,
        )
        .await
        .unwrap();

    assert_eq!(resp.body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let resp = client
        .delete(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap();

    assert_eq!(resp.status, 204);
    assert_eq!(resp.body, Value::Null);
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let creds = Credentials::BearerToken(SecretString::from("tok".to_string()));
    let client = ResourceClient::new(&server.uri(), &creds, &transport()).unwrap();

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_carries_status_and_code() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ResourceGroupNotFound", "message": "Resource group 'rg1' could not be found." }
        })))
        .mount(&server)
        .await;

    let err = client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap_err();

    assert!(err.is_not_found(), "expected 404, got: {err:?}");
    assert_eq!(err.api_error_code(), Some("ResourceGroupNotFound"));
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let err = client
        .create_update(
            &CancellationToken::new(),
            RG_PATH,
            API_VERSION,
            &json!({}),
            HttpMethod::Put,
        )
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad request");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_json_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_cancelled_token_aborts_request() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client.get(&cancel, RG_PATH, API_VERSION).await.unwrap_err();

    assert!(err.is_cancelled(), "got: {err:?}");
}

// ── Throttling ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_throttled_request_is_retried() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "rg1" })))
        .mount(&server)
        .await;

    // max_retries is 0, but throttling does not consume the budget.
    let resp = client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap();

    assert_eq!(resp.body, json!({ "name": "rg1" }));
}

#[tokio::test]
async fn test_unavailable_exhausts_retry_budget() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .get(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
}

// ── Long-running operations ─────────────────────────────────────────

#[tokio::test]
async fn test_async_operation_is_polled_to_completion() {
    let (server, client) = setup().await;
    let op_url = format!("{}/operations/op1", server.uri());
    let final_body = json!({ "name": "rg1", "properties": { "provisioningState": "Succeeded" } });

    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", op_url.as_str())
                .set_body_json(json!({ "properties": { "provisioningState": "Accepted" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&final_body))
        .mount(&server)
        .await;

    let resp = client
        .create_update(
            &CancellationToken::new(),
            RG_PATH,
            API_VERSION,
            &json!({}),
            HttpMethod::Put,
        )
        .await
        .unwrap();

    assert_eq!(resp.body, final_body);
}

#[tokio::test]
async fn test_failed_async_operation_surfaces_error() {
    let (server, client) = setup().await;
    let op_url = format!("{}/operations/op2", server.uri());

    Mock::given(method("PUT"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", op_url.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": { "code": "Conflict", "message": "quota exceeded" }
        })))
        .mount(&server)
        .await;

    let err = client
        .create_update(
            &CancellationToken::new(),
            RG_PATH,
            API_VERSION,
            &json!({}),
            HttpMethod::Put,
        )
        .await
        .unwrap_err();

    match err {
        Error::OperationFailed { status, message } => {
            assert_eq!(status, "Failed");
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected OperationFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_location_polling() {
    let (server, client) = setup().await;
    let location = format!("{}/results/del1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(RG_PATH))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/del1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/del1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .delete(&CancellationToken::new(), RG_PATH, API_VERSION)
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, Value::Null);
}

// ── Metadata discovery ──────────────────────────────────────────────

#[tokio::test]
async fn test_discover_environment_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/endpoints"))
        .and(query_param("api-version", "2020-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "AzureCloud",
                "resourceManager": "https://management.azure.com/",
                "authentication": { "loginEndpoint": "https://login.microsoftonline.com/", "audiences": ["https://management.core.windows.net/"] }
            },
            {
                "name": "AzureUSGovernment",
                "resourceManager": "https://management.usgovcloudapi.net",
                "authentication": { "loginEndpoint": "https://login.microsoftonline.us/", "audiences": [] }
            }
        ])))
        .mount(&server)
        .await;

    let env = discover_environment(&reqwest::Client::new(), &server.uri(), "usgovernment")
        .await
        .unwrap();

    assert_eq!(env.name, "AzureUSGovernment");
    assert_eq!(env.resource_manager, "https://management.usgovcloudapi.net/");
    assert_eq!(env.login_endpoint, "https://login.microsoftonline.us/");
}

#[tokio::test]
async fn test_discover_single_environment_defaults_resource_manager() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/endpoints"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "AzureStackCloud", "authentication": { "loginEndpoint": "https://login.stack/" } }
        ])))
        .mount(&server)
        .await;

    let env = discover_environment(&reqwest::Client::new(), &server.uri(), "")
        .await
        .unwrap();

    assert_eq!(env.resource_manager, format!("{}/", server.uri()));
}

#[tokio::test]
async fn test_discover_unknown_environment_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/endpoints"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "AzureCloud", "resourceManager": "https://management.azure.com/" },
            { "name": "AzureChinaCloud", "resourceManager": "https://management.chinacloudapi.cn/" }
        ])))
        .mount(&server)
        .await;

    let err = discover_environment(&reqwest::Client::new(), &server.uri(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Metadata { .. }), "got: {err:?}");
}
