#![allow(clippy::unwrap_used)]
// Integration tests for `PortalClient` using wiremock.

use std::time::Duration;

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wolflink_api::{
    ClientConfig, Credentials, Error, ParameterKind, PortalClient, RequestOptions, TlsMode,
    TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const TOKEN_PATH: &str = "/idsrv/connect/token";
const SESSION_ID: i64 = 4711;

fn portal_path(suffix: &str) -> String {
    format!("/portal/api/portal/{suffix}")
}

fn config(server: &MockServer, refresh: Duration) -> ClientConfig {
    ClientConfig {
        portal_url: Url::parse(&format!("{}/portal/", server.uri())).unwrap(),
        token_url: Url::parse(&format!("{}{TOKEN_PATH}", server.uri())).unwrap(),
        credentials: Credentials {
            username: "heizung@example.com".into(),
            password: SecretString::from("hunter2".to_string()),
        },
        transport: TransportConfig {
            tls: TlsMode::System,
            timeout: Duration::from_secs(5),
        },
        session_refresh_interval: refresh,
    }
}

/// Token endpoint hands out `tok-1` once, then `tok-2`; `CreateSession2` succeeds.
async fn mount_auth_without_keepalive(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1", "expires_in": 3600 })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-2", "expires_in": 3600 })),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(portal_path("CreateSession2")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "browserSessionId": SESSION_ID })),
        )
        .mount(server)
        .await;
}

/// Token and session endpoints, with every keepalive accepted.
async fn mount_auth(server: &MockServer) {
    mount_auth_without_keepalive(server).await;

    Mock::given(method("POST"))
        .and(path(portal_path("UpdateSession")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn setup_with_refresh(refresh: Duration) -> (MockServer, PortalClient) {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    let client = PortalClient::new(&config(&server, refresh)).unwrap();
    (server, client)
}

async fn setup() -> (MockServer, PortalClient) {
    setup_with_refresh(Duration::from_secs(60)).await
}

async fn count_requests(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

fn systems_body() -> serde_json::Value {
    json!([{ "id": 7, "gatewayId": 8, "name": "Zuhause" }])
}

// ── Authentication and session ──────────────────────────────────────

#[tokio::test]
async fn test_first_request_authenticates_once() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    let systems = client.fetch_system_list().await.unwrap();
    client.fetch_system_list().await.unwrap();

    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0].id, 7);
    assert_eq!(systems[0].gateway_id, 8);
    assert_eq!(systems[0].name, "Zuhause");
    assert_eq!(count_requests(&server, TOKEN_PATH).await, 1);
    assert_eq!(count_requests(&server, &portal_path("CreateSession2")).await, 1);
    assert!(!client.last_request_failed());
}

#[tokio::test]
async fn test_password_grant_form() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    client.fetch_system_list().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == TOKEN_PATH)
        .unwrap();
    let form = String::from_utf8_lossy(&token_request.body);
    assert!(form.contains("grant_type=password"), "form: {form}");
    assert!(form.contains("username=heizung%40example.com"), "form: {form}");
}

#[tokio::test]
async fn test_rejected_credentials_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let client = PortalClient::new(&config(&server, Duration::from_secs(60))).unwrap();
    let result = client.fetch_system_list().await;

    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message.contains("invalid_grant")),
        "expected Authentication error, got: {result:?}"
    );
    assert_eq!(count_requests(&server, &portal_path("GetSystemList")).await, 0);
    assert!(client.last_request_failed());
}

#[tokio::test]
async fn test_session_open_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1", "expires_in": 3600 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("CreateSession2")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = PortalClient::new(&config(&server, Duration::from_secs(60))).unwrap();
    let result = client.fetch_system_list().await;

    assert!(matches!(result, Err(Error::Session { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_keepalive_is_throttled() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    for _ in 0..3 {
        client.fetch_system_list().await.unwrap();
    }

    assert_eq!(count_requests(&server, &portal_path("UpdateSession")).await, 1);
}

#[tokio::test]
async fn test_keepalive_every_request_without_throttle() {
    let (server, client) = setup_with_refresh(Duration::ZERO).await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    for _ in 0..3 {
        client.fetch_system_list().await.unwrap();
    }

    assert_eq!(count_requests(&server, &portal_path("UpdateSession")).await, 3);
    let requests = server.received_requests().await.unwrap();
    let keepalive = requests
        .iter()
        .find(|r| r.url.path() == portal_path("UpdateSession"))
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&keepalive.body).unwrap();
    assert_eq!(body["sessionId"], SESSION_ID);
}

#[tokio::test]
async fn test_rejected_keepalive_opens_new_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1", "expires_in": 3600 })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("CreateSession2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "browserSessionId": 1 })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("CreateSession2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "browserSessionId": 2 })))
        .mount(&server)
        .await;
    // The portal forgot session 1 while the token is still valid.
    Mock::given(method("POST"))
        .and(path(portal_path("UpdateSession")))
        .and(body_partial_json(json!({ "sessionId": 1 })))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("UpdateSession")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    let client = PortalClient::new(&config(&server, Duration::ZERO)).unwrap();
    for _ in 0..3 {
        let systems = client.fetch_system_list().await.unwrap();
        assert_eq!(systems[0].name, "Zuhause");
    }

    assert!(!client.last_request_failed());
    assert_eq!(count_requests(&server, &portal_path("CreateSession2")).await, 2);
    assert_eq!(
        client.session().session_id().await,
        Some(wolflink_api::SessionId(2))
    );
}

#[tokio::test]
async fn test_keepalive_forbidden_is_not_retried() {
    let server = MockServer::start().await;
    mount_auth_without_keepalive(&server).await;
    Mock::given(method("POST"))
        .and(path(portal_path("UpdateSession")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = PortalClient::new(&config(&server, Duration::from_secs(60))).unwrap();
    let result = client.fetch_system_list().await;

    assert!(
        matches!(result, Err(Error::Session { status: Some(403), .. })),
        "got: {result:?}"
    );
    assert_eq!(count_requests(&server, &portal_path("CreateSession2")).await, 1);
    assert!(client.last_request_failed());
}

// ── Retry pipeline ──────────────────────────────────────────────────

#[tokio::test]
async fn test_401_then_success_returns_retry_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    let systems = client.fetch_system_list().await.unwrap();

    assert_eq!(systems[0].name, "Zuhause");
    assert!(!client.last_request_failed());
    assert_eq!(count_requests(&server, TOKEN_PATH).await, 2);
    assert_eq!(count_requests(&server, &portal_path("CreateSession2")).await, 2);
}

#[tokio::test]
async fn test_500_then_success_returns_retry_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    let body = client
        .execute(Method::GET, "api/portal/GetSystemList", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body, systems_body());
    assert!(!client.last_request_failed());
}

#[tokio::test]
async fn test_second_401_fails_and_sets_flag() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.fetch_system_list().await;

    match result {
        Err(Error::FetchFailed { status, .. }) => assert_eq!(status, Some(401)),
        other => panic!("expected FetchFailed, got: {other:?}"),
    }
    assert!(client.last_request_failed());
    assert_eq!(count_requests(&server, &portal_path("GetSystemList")).await, 2);
}

#[tokio::test]
async fn test_flag_clears_after_next_success() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    assert!(client.fetch_system_list().await.is_err());
    assert!(client.last_request_failed());

    client.fetch_system_list().await.unwrap();
    assert!(!client.last_request_failed());
}

#[tokio::test]
async fn test_retry_transport_failure_is_fetch_failure() {
    let server = MockServer::start().await;
    mount_auth(&server).await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(systems_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(&server, Duration::from_secs(60));
    cfg.transport.timeout = Duration::from_secs(1);
    let client = PortalClient::new(&cfg).unwrap();

    let result = client.fetch_system_list().await;

    assert!(
        matches!(result, Err(Error::FetchFailed { status: None, .. })),
        "expected FetchFailed without status, got: {result:?}"
    );
    assert!(client.last_request_failed());
}

#[tokio::test]
async fn test_other_status_is_passed_through() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "denied" })))
        .mount(&server)
        .await;

    let body = client
        .execute(Method::GET, "api/portal/GetSystemList", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(body["message"], "denied");
    assert_eq!(count_requests(&server, &portal_path("GetSystemList")).await, 1);
    assert!(!client.last_request_failed());
}

#[tokio::test]
async fn test_caller_header_overrides_bearer() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .and(header("authorization", "Bearer custom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;

    let options = RequestOptions::new().header(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_static("Bearer custom"),
    );
    let body = client
        .execute(Method::GET, "api/portal/GetSystemList", options)
        .await
        .unwrap();

    assert_eq!(body, systems_body());
}

// ── Endpoints ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_system_state() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(portal_path("GetSystemStateList")))
        .and(body_partial_json(json!({
            "sessionId": SESSION_ID,
            "systemList": [{ "systemId": 7, "gatewayId": 8 }],
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "gatewayState": { "isOnline": true } }])),
        )
        .mount(&server)
        .await;

    assert!(client.fetch_system_state(7, 8).await.unwrap());
}

#[tokio::test]
async fn test_fetch_parameters_flattens_tabs() {
    let (server, client) = setup().await;

    let gui = json!({
        "menuItems": [{
            "tabViews": [
                {
                    "tabName": "Anlage",
                    "parameterDescriptors": [
                        { "valueId": 1, "name": "Anlagendruck", "parameterId": 11 },
                        { "valueId": 2, "name": "Betriebsart", "parameterId": 12,
                          "listItems": [
                              { "value": 0, "displayText": "Standby" },
                              { "value": 1, "displayText": "Automatik" }
                          ] }
                    ],
                    "SVGHeatingSchemaConfigDevices": [{
                        "parameters": [{ "valueId": 1, "unit": "bar" }, { "valueId": 2 }]
                    }]
                },
                {
                    "tabName": "Heizkreis",
                    "parameterDescriptors": [
                        { "valueId": 3, "name": "Vorlauftemperatur", "parameterId": 13, "unit": "°C" },
                        { "valueId": 2, "name": "Betriebsart HK", "parameterId": 14 }
                    ]
                }
            ]
        }]
    });

    Mock::given(method("GET"))
        .and(path(portal_path("GetGuiDescriptionForGateway")))
        .and(query_param("GatewayId", "8"))
        .and(query_param("SystemId", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gui))
        .mount(&server)
        .await;

    let params = client.fetch_parameters(8, 7).await.unwrap();

    let summary: Vec<_> = params
        .iter()
        .map(|p| (p.value_id(), p.name(), p.parent(), p.kind()))
        .collect();
    assert_eq!(
        summary,
        [
            (3, "Vorlauftemperatur", "Heizkreis", ParameterKind::Temperature),
            (2, "Betriebsart HK", "Heizkreis", ParameterKind::Simple),
            (1, "Anlagendruck", "Anlage", ParameterKind::Pressure),
        ]
    );
}

async fn mount_gui_with_one_parameter(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(portal_path("GetGuiDescriptionForGateway")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "menuItems": [{ "tabViews": [{
                "tabName": "Heizung",
                "parameterDescriptors": [
                    { "valueId": 5, "name": "Kesseltemperatur", "parameterId": 50, "unit": "°C" }
                ]
            }] }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_values_tracks_last_access() {
    let (server, client) = setup().await;
    mount_gui_with_one_parameter(&server).await;
    let params = client.fetch_parameters(8, 7).await.unwrap();

    Mock::given(method("POST"))
        .and(path(portal_path("GetParameterValues")))
        .and(body_partial_json(json!({ "lastAccess": "2024-05-01T10:00:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lastAccess": "2024-05-01T10:01:00",
            "values": [{ "valueId": 5, "value": "55.0", "state": 1 }]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("GetParameterValues")))
        .and(body_partial_json(json!({
            "bundleId": 1000,
            "bundle": false,
            "valueIdList": [5],
            "gatewayId": 8,
            "systemId": 7,
            "guiIdChanged": false,
            "sessionId": SESSION_ID,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lastAccess": "2024-05-01T10:00:00",
            "values": [
                { "valueId": 5, "value": "54.5", "state": 1 },
                { "valueId": 6, "state": 0 }
            ]
        })))
        .mount(&server)
        .await;

    let first = client.fetch_values(8, 7, &params).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].raw_text(), "54.5");
    assert_eq!(params[0].display_value(&first[0]), "54.5 °C");
    assert_eq!(
        client.session().last_access().await.as_deref(),
        Some("2024-05-01T10:00:00")
    );

    let second = client.fetch_values(8, 7, &params).await.unwrap();
    assert_eq!(second[0].raw_text(), "55.0");
}

#[tokio::test]
async fn test_fetch_values_read_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(portal_path("GetParameterValues")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": 1,
            "errorMessage": "ReadParameterValues"
        })))
        .mount(&server)
        .await;

    let result = client.fetch_values(8, 7, &[]).await;

    assert!(
        matches!(result, Err(Error::ParameterRead { .. })),
        "expected ParameterRead, got: {result:?}"
    );
}

#[tokio::test]
async fn test_fetch_values_other_error_payload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(portal_path("GetParameterValues")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorType": "Unknown",
            "errorMessage": "Gateway not reachable"
        })))
        .mount(&server)
        .await;

    let result = client.fetch_values(8, 7, &[]).await;

    match result {
        Err(Error::FetchFailed { message, payload, .. }) => {
            assert_eq!(message, "Gateway not reachable");
            assert_eq!(payload.unwrap()["errorType"], "Unknown");
        }
        other => panic!("expected FetchFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_close_system_drops_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("CloseSystem")))
        .and(body_partial_json(json!({ "sessionId": SESSION_ID })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.fetch_system_list().await.unwrap();
    client.close_system().await;
    assert!(client.session().session_id().await.is_none());

    client.fetch_system_list().await.unwrap();
    assert_eq!(count_requests(&server, &portal_path("CreateSession2")).await, 2);
}

#[tokio::test]
async fn test_failed_close_still_drops_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(portal_path("GetSystemList")))
        .respond_with(ResponseTemplate::new(200).set_body_json(systems_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(portal_path("CloseSystem")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    client.fetch_system_list().await.unwrap();
    client.close_system().await;

    assert!(client.last_request_failed());
    assert!(client.session().session_id().await.is_none());
}

#[tokio::test]
async fn test_close_without_session_is_noop() {
    let (server, client) = setup().await;

    client.close_system().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}
