//! Whole runs driven through `App`: discovery, start, polling, results.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ndtview::app::{App, TestUpdate};
use ndtview::backend::NdtBackend;
use ndtview::phase::{Phase, PollOutcome};
use ndtview::poller::sample;
use ndtview::session::{Page, Session};
use ndtview::settings::Settings;
use ndtview::test_utils::ScriptedBackend;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_settings() -> Settings {
    Settings {
        client_command: "ndtview-test-missing-client".to_string(),
        poll_interval_ms: 10,
        transition_ms: 0,
        ..Settings::default()
    }
}

async fn wait_for_server(app: &App) {
    for _ in 0..500 {
        if !app.server().is_pending() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server lookup did not finish");
}

async fn next_update(rx: &mut mpsc::Receiver<TestUpdate>) -> TestUpdate {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no update in time")
        .expect("update channel closed")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plugin_fallback_run_ends_on_results_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ndt_ssl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"fqdn":"ndt.example.org"}"#))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel(16);
    let mut app = App::new(
        Settings {
            discovery_url: server.uri(),
            ..fast_settings()
        },
        tx,
    );
    app.initialize();
    wait_for_server(&app).await;

    app.start_test();
    assert!(app.session.is_running());
    assert_eq!(app.session.page(), Page::Test);

    let update = next_update(&mut rx).await;
    app.handle_update(update);

    assert_eq!(app.session.phase(), Phase::Results);
    assert_eq!(app.session.last_outcome, Some(PollOutcome::Failed));
    assert!(app.session.start_enabled);
    assert!(!app.is_polling());

    let results = app.session.results.as_ref().unwrap();
    assert!(results.details[1][0].text.contains("plugin runtime unavailable"));
}

#[tokio::test]
async fn failed_discovery_refuses_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (tx, _rx) = mpsc::channel(16);
    let mut app = App::new(
        Settings {
            discovery_url: server.uri(),
            ..fast_settings()
        },
        tx,
    );
    app.initialize();
    wait_for_server(&app).await;

    app.start_test();
    assert!(app.session.plugin_warning);
    assert!(app.session.backend().is_none());
    assert!(app.session.start_enabled);
    assert_eq!(app.session.phase(), Phase::Welcome);
}

#[test]
fn scripted_run_walks_every_phase() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.run_test("ndt.example.org").unwrap();

    let mut session = Session::new(&fast_settings());
    session.set_phase(Phase::Welcome).unwrap();
    session.begin_run(Some(backend.clone() as Arc<dyn NdtBackend>));

    let tick = |session: &mut Session| session.apply_poll(&sample(backend.as_ref()));

    backend.store().set_host("mlab1.example.net");
    assert_eq!(tick(&mut session), PollOutcome::Continue);
    assert_eq!(session.phase(), Phase::Preparing);

    backend.store().set_status("Outbound");
    backend.store().set_var("avgrtt", "21.2");
    tick(&mut session);
    assert_eq!(session.phase(), Phase::Upload);
    assert_eq!(session.rtt_label, "21 ms");
    assert_eq!(session.remote_host, "mlab1.example.net");

    backend.store().set_status("Inbound");
    backend.store().set_var("ServerToClientSpeed", "94250");
    backend.store().set_var("ClientToServerSpeed", "41000");
    tick(&mut session);
    assert_eq!(session.phase(), Phase::Download);

    backend.store().set_errmsg("Test completed successfully");
    assert_eq!(tick(&mut session), PollOutcome::Completed);
    assert_eq!(session.phase(), Phase::Results);

    let results = session.results.as_ref().unwrap();
    assert_eq!(results.download.value_text(), "94.25");
    assert_eq!(results.download.unit, "Mb/s");
    assert_eq!(results.upload.value_text(), "41.00");
    assert_eq!(results.latency, "21");
}
