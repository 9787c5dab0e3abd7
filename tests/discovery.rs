//! Server discovery against a mock lookup service.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ndtview::backend::{self, BackendKind};
use ndtview::locator::{lookup, ServerDescriptor, ServerLocator};
use ndtview::settings::Settings;
use ndtview::Error;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings_for(server: &MockServer) -> Settings {
    Settings {
        discovery_url: server.uri(),
        client_command: "ndtview-test-missing-client".to_string(),
        ..Settings::default()
    }
}

async fn mount(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/ndt_ssl"))
        .and(query_param("format", "json"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn resolve(settings: &Settings) -> ServerDescriptor {
    let mut locator = ServerLocator::spawn(settings.lookup_url());
    tokio::time::timeout(Duration::from_secs(5), locator.resolved())
        .await
        .expect("lookup did not finish")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_returns_fqdn() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string(r#"{"fqdn":"ndt.iupui.mlab1.example.net"}"#),
    )
    .await;

    let settings = settings_for(&server);
    let fqdn = lookup(&settings.lookup_url()).await.unwrap();
    assert_eq!(fqdn, "ndt.iupui.mlab1.example.net");
}

#[tokio::test]
async fn insecure_lookup_uses_plain_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ndt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"fqdn":"plain.example.net"}"#))
        .mount(&server)
        .await;

    let settings = Settings {
        secure: false,
        ..settings_for(&server)
    };
    assert_eq!(
        resolve(&settings).await,
        ServerDescriptor::Resolved("plain.example.net".to_string())
    );
}

#[tokio::test]
async fn resolved_host_is_bound_to_backend() {
    let server = MockServer::start().await;
    mount(
        &server,
        ResponseTemplate::new(200).set_body_string(r#"{"fqdn":"ndt.example.org"}"#),
    )
    .await;

    let settings = settings_for(&server);
    let descriptor = resolve(&settings).await;
    assert_eq!(descriptor.host(), Some("ndt.example.org"));

    // No external client on PATH, so the selector falls back to the plugin.
    let handle = backend::start_test(&settings, &descriptor).unwrap();
    assert_eq!(handle.kind(), BackendKind::Plugin);
}

#[tokio::test]
async fn server_error_leaves_no_server() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(500)).await;

    let settings = settings_for(&server);
    assert!(matches!(
        lookup(&settings.lookup_url()).await,
        Err(Error::Discovery { status: 500 })
    ));

    let descriptor = resolve(&settings).await;
    assert_eq!(descriptor, ServerDescriptor::Failed);
    assert!(matches!(
        backend::start_test(&settings, &descriptor),
        Err(Error::NoServerAvailable)
    ));
}

#[tokio::test]
async fn malformed_body_leaves_no_server() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_string("<html>busy</html>")).await;

    let settings = settings_for(&server);
    assert!(matches!(
        lookup(&settings.lookup_url()).await,
        Err(Error::Json(_))
    ));
    assert_eq!(resolve(&settings).await, ServerDescriptor::Failed);
}

#[tokio::test]
async fn empty_fqdn_leaves_no_server() {
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(200).set_body_string(r#"{"fqdn":""}"#)).await;

    let settings = settings_for(&server);
    assert_eq!(resolve(&settings).await, ServerDescriptor::Failed);
}
