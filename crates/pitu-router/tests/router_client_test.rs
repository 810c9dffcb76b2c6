// Integration tests for `RouterClient` using wiremock.
#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pitu_router::{Error, RouterClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RouterClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().unwrap();
    let client = RouterClient::new(base, &TransportConfig::default()).unwrap();
    (server, client)
}

fn model(connection: &str) -> serde_json::Value {
    json!({
        "session": { "secToken": "tok-42" },
        "general": { "supportedLangList": ["en", "es"] },
        "wwan": { "connection": connection, "signalStrength": { "rssi": -71 } },
    })
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sess_cd_tmp"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_model(server: &MockServer, connection: &str) {
    Mock::given(method("GET"))
        .and(path("/api/model.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model(connection)))
        .mount(server)
        .await;
}

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

// ── Probe ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_ok() {
    let (server, client) = setup().await;
    mount_session(&server).await;

    client.probe().await.unwrap();
}

#[tokio::test]
async fn test_probe_wrong_status_is_unreachable() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/sess_cd_tmp"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.probe().await.unwrap_err();
    assert!(matches!(err, Error::Unreachable { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_probe_connection_refused_is_unreachable() {
    let server = MockServer::start().await;
    let base: url::Url = server.uri().parse().unwrap();
    drop(server);

    let client = RouterClient::new(base, &TransportConfig::default()).unwrap();
    let err = client.probe().await.unwrap_err();
    assert!(matches!(err, Error::Unreachable { .. }), "got {err:?}");
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;
    mount_session(&server).await;
    mount_model(&server, "Connected").await;

    Mock::given(method("POST"))
        .and(path("/Forms/config"))
        .and(body_string_contains("token=tok-42"))
        .and(body_string_contains("session.password=hunter2"))
        .and(body_string_contains("ok_redirect=%2Findex.html"))
        .respond_with(redirect_to("/index.html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    client
        .login(&SecretString::from("hunter2".to_owned()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (server, client) = setup().await;
    mount_session(&server).await;
    mount_model(&server, "Connected").await;

    Mock::given(method("POST"))
        .and(path("/Forms/config"))
        .respond_with(redirect_to("/index.html?loginfailed"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client
        .login(&SecretString::from("nope".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_login_without_token() {
    let (server, client) = setup().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/model.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "wwan": {} })))
        .mount(&server)
        .await;

    let err = client
        .login(&SecretString::from("pw".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingToken), "got {err:?}");
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_reads_model() {
    let (server, client) = setup().await;
    mount_model(&server, "Disconnected").await;

    let status = client.status().await.unwrap();
    assert_eq!(status.wwan_connection(), Some("Disconnected"));
    assert!(!status.is_connected());
    assert_eq!(status.as_json()["general"]["supportedLangList"], json!(["en", "es"]));
}

#[tokio::test]
async fn test_status_invalid_json() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/model.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client.status().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>login</html>"),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}

// ── Reconnect ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_toggles_autoconnect() {
    let (server, client) = setup().await;
    mount_model(&server, "Disconnected").await;

    Mock::given(method("POST"))
        .and(path("/Forms/config"))
        .and(body_string_contains("wwan.autoconnect=Never"))
        .respond_with(redirect_to("/success.json"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Forms/config"))
        .and(body_string_contains("wwan.autoconnect=HomeNetwork"))
        .respond_with(redirect_to("/success.json"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/success.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    client.reconnect().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_reports_failed_step() {
    let (server, client) = setup().await;
    mount_model(&server, "Disconnected").await;

    Mock::given(method("POST"))
        .and(path("/Forms/config"))
        .respond_with(redirect_to("/error.json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/error.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client.reconnect().await.unwrap_err();
    match err {
        Error::UnexpectedRedirect { action, .. } => assert_eq!(action, "disconnect"),
        other => panic!("expected UnexpectedRedirect, got {other:?}"),
    }
}
