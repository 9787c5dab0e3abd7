//! Test session context and the phase state machine.
//!
//! `Session` owns everything that changes during a run: the current phase,
//! the backend handle, gauges, visible page and rendered results. Entering
//! a phase applies that phase's side effects to this view model; the UI only
//! reads it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::NdtBackend;
use crate::error::{Error, Result};
use crate::gauge::Gauge;
use crate::metrics::Metrics;
use crate::phase::{decide, BackendSignals, Phase, PollOutcome};
use crate::results::{render_results, ResultsView, ScaledSpeed};
use crate::settings::Settings;

const GAUGE_REFRESH: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Welcome,
    Test,
    Results,
}

/// Which part of the test page is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestRegion {
    Loading,
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsTab {
    Summary,
    Details,
    Advanced,
}

impl ResultsTab {
    pub const ALL: [ResultsTab; 3] = [ResultsTab::Summary, ResultsTab::Details, ResultsTab::Advanced];

    pub fn next(self) -> Self {
        match self {
            ResultsTab::Summary => ResultsTab::Details,
            ResultsTab::Details => ResultsTab::Advanced,
            ResultsTab::Advanced => ResultsTab::Summary,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResultsTab::Summary => "summary",
            ResultsTab::Details => "details",
            ResultsTab::Advanced => "advanced",
        }
    }
}

/// Fade from one page to another: out over one duration, in over another.
#[derive(Debug, Clone, Copy)]
pub struct PageTransition {
    pub from: Page,
    pub to: Page,
    pub started: Instant,
    pub duration: Duration,
}

impl PageTransition {
    pub fn total(&self) -> Duration {
        self.duration * 2
    }

    /// Page to draw at `now` and whether it is mid-fade.
    pub fn visible(&self, now: Instant) -> (Page, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.duration {
            (self.from, true)
        } else if elapsed < self.total() {
            (self.to, true)
        } else {
            (self.to, false)
        }
    }
}

pub struct Session {
    phase: Phase,
    backend: Option<Arc<dyn NdtBackend>>,
    simulate: bool,
    transition_duration: Duration,

    page: Page,
    transition: Option<PageTransition>,
    reset_gauges_after_transition: bool,

    pub region: TestRegion,
    pub upload_gauge: Gauge,
    pub download_gauge: Gauge,
    pub rtt_label: String,
    pub remote_host: String,
    next_gauge_refresh: Option<Instant>,

    pub results: Option<ResultsView>,
    pub results_tab: ResultsTab,
    pub start_enabled: bool,
    pub plugin_warning: bool,
    pub last_outcome: Option<PollOutcome>,
}

impl Session {
    pub fn new(settings: &Settings) -> Self {
        Self {
            phase: Phase::Loading,
            backend: None,
            simulate: settings.simulate,
            transition_duration: settings.transition(),
            page: Page::Welcome,
            transition: None,
            reset_gauges_after_transition: false,
            region: TestRegion::Loading,
            upload_gauge: Gauge::new("Upload", settings.gauge_max),
            download_gauge: Gauge::new("Download", settings.gauge_max),
            rtt_label: String::new(),
            remote_host: String::new(),
            next_gauge_refresh: None,
            results: None,
            results_tab: ResultsTab::Summary,
            start_enabled: true,
            plugin_warning: false,
            last_outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn is_simulated(&self) -> bool {
        self.simulate
    }

    pub fn set_simulate(&mut self, simulate: bool) {
        self.simulate = simulate;
    }

    /// Change the scale of both gauges; existing bands are reset.
    pub fn set_gauge_max(&mut self, max: f64) {
        for gauge in [&mut self.upload_gauge, &mut self.download_gauge] {
            gauge.max = max;
            gauge.reset();
        }
    }

    pub fn backend(&self) -> Option<&Arc<dyn NdtBackend>> {
        self.backend.as_ref()
    }

    pub fn metrics(&self) -> Metrics<'_> {
        Metrics::new(self.backend.as_deref(), self.simulate)
    }

    /// Test is between start and results.
    pub fn is_running(&self) -> bool {
        !self.start_enabled
    }

    /// Page to draw at `now` and whether it is mid-fade.
    pub fn visible_page(&self, now: Instant) -> (Page, bool) {
        match &self.transition {
            Some(t) => t.visible(now),
            None => (self.page, false),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Run lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Reset for a new run, attaching `backend` (or none in simulate mode).
    ///
    /// This is the only way to move the phase backwards past Results.
    pub fn begin_run(&mut self, backend: Option<Arc<dyn NdtBackend>>) {
        info!("Starting new test run");
        self.backend = backend;
        self.results = None;
        self.results_tab = ResultsTab::Summary;
        self.plugin_warning = false;
        self.last_outcome = None;
        self.next_gauge_refresh = None;
        self.start_enabled = false;
        self.rtt_label.clear();
        self.remote_host.clear();
        self.region = TestRegion::Loading;
        self.phase = Phase::Welcome;
        self.show_page(Page::Test, true);
    }

    /// Start was refused because no server is known.
    pub fn refuse_start(&mut self) {
        warn!("No server available, cannot start test");
        self.backend = None;
        self.plugin_warning = true;
    }

    /// Abandon a running test and return to the welcome page.
    pub fn abandon(&mut self) {
        info!("Test abandoned in phase {}", self.phase);
        self.backend = None;
        self.next_gauge_refresh = None;
        self.start_enabled = true;
        self.phase = Phase::Welcome;
        self.show_page(Page::Welcome, false);
    }

    // ─────────────────────────────────────────────────────────────
    // Phase transitions
    // ─────────────────────────────────────────────────────────────

    pub fn set_phase_value(&mut self, value: u8) -> Result<()> {
        let target = Phase::try_from(value)?;
        self.set_phase(target)
    }

    /// Enter `target`, applying its side effects.
    ///
    /// Phases only move forward within a run; use [`Session::begin_run`] or
    /// [`Session::abandon`] to go back.
    pub fn set_phase(&mut self, target: Phase) -> Result<()> {
        let invalid = Error::InvalidTransition {
            from: self.phase,
            to: target,
        };
        if target < self.phase {
            return Err(invalid);
        }

        debug!("{}", target);
        match target {
            Phase::Loading => return Err(invalid),
            Phase::Welcome => self.show_page(Page::Welcome, false),
            Phase::Preparing => self.enter_preparing(),
            Phase::Upload => self.enter_upload(),
            Phase::Download => self.region = TestRegion::Download,
            Phase::Results => self.enter_results(),
        }
        self.phase = target;
        Ok(())
    }

    fn enter_preparing(&mut self) {
        self.upload_gauge.value = 0.0;
        self.download_gauge.value = 0.0;
        self.region = TestRegion::Loading;
        self.show_page(Page::Test, true);
    }

    fn enter_upload(&mut self) {
        let metrics = self.metrics();
        let limit = metrics.speed_limit();
        let rtt = metrics.average_round_trip();
        let remote = metrics.remote_server();

        self.rtt_label = if rtt.is_nan() {
            "n/a".to_string()
        } else {
            format!("{} ms", rtt.round())
        };

        if !limit.is_nan() {
            self.upload_gauge.set_limit(limit);
            self.download_gauge.set_limit(limit);
        }

        self.region = TestRegion::Upload;
        self.next_gauge_refresh = Some(Instant::now() + GAUGE_REFRESH);
        self.remote_host = remote;
    }

    fn enter_results(&mut self) {
        debug!("Testing complete");
        self.results = Some(render_results(&self.metrics()));
        self.next_gauge_refresh = None;
        self.start_enabled = true;
        self.show_page(Page::Results, false);
    }

    // ─────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────

    /// Apply one poll tick worth of backend text.
    pub fn apply_poll(&mut self, signals: &BackendSignals) -> PollOutcome {
        let decision = decide(self.phase, signals);

        if decision.outcome == PollOutcome::Abandoned {
            self.abandon();
            self.last_outcome = Some(decision.outcome);
            return decision.outcome;
        }

        for target in decision.transitions {
            if target == Phase::Upload && self.phase == Phase::Preparing {
                debug!("Remote server is {}", signals.host);
            }
            if let Err(e) = self.set_phase(target) {
                warn!("Ignoring transition: {}", e);
            }
        }

        match decision.outcome {
            PollOutcome::Failed => warn!("Test failed: {}", signals.errmsg),
            PollOutcome::Completed => info!("Test completed"),
            _ => {}
        }
        if decision.outcome.is_terminal() {
            self.last_outcome = Some(decision.outcome);
        }
        decision.outcome
    }

    // ─────────────────────────────────────────────────────────────
    // Timers driven from the UI loop
    // ─────────────────────────────────────────────────────────────

    /// Advance page fades and the periodic gauge refresh.
    pub fn on_frame(&mut self, now: Instant) {
        if let Some(t) = self.transition {
            if now.saturating_duration_since(t.started) >= t.total() {
                self.transition = None;
                if self.reset_gauges_after_transition {
                    self.reset_gauges();
                }
            }
        }

        if let Some(due) = self.next_gauge_refresh {
            if now >= due {
                self.update_gauge_value();
                if self.next_gauge_refresh.is_some() {
                    self.next_gauge_refresh = Some(due + GAUGE_REFRESH);
                }
            }
        }
    }

    /// Push the current speed into the gauge of the active transfer; stops
    /// the refresh outside the transfer phases.
    pub fn update_gauge_value(&mut self) {
        let (upload, download) = {
            let metrics = self.metrics();
            (metrics.upload_speed(), metrics.download_speed())
        };

        match self.phase {
            Phase::Upload => {
                let scaled = ScaledSpeed::from_kbps(upload);
                self.upload_gauge.set_value(scaled.value, scaled.unit);
            }
            Phase::Download => {
                let scaled = ScaledSpeed::from_kbps(download);
                self.download_gauge.set_value(scaled.value, scaled.unit);
            }
            _ => self.next_gauge_refresh = None,
        }
    }

    pub fn reset_gauges(&mut self) {
        self.reset_gauges_after_transition = false;
        self.upload_gauge.reset();
        self.download_gauge.reset();
    }

    /// Switch pages with a fade. Showing the current page only runs the
    /// completion step.
    fn show_page(&mut self, page: Page, reset_gauges: bool) {
        debug!("Show page: {:?}", page);
        if page == self.page && self.transition.is_none() {
            if reset_gauges {
                self.reset_gauges();
            }
            return;
        }

        let from = self
            .transition
            .map(|t| t.visible(Instant::now()).0)
            .unwrap_or(self.page);
        self.transition = Some(PageTransition {
            from,
            to: page,
            started: Instant::now(),
            duration: self.transition_duration,
        });
        self.reset_gauges_after_transition = reset_gauges;
        self.page = page;
    }

    pub fn show_results_tab(&mut self, tab: ResultsTab) {
        debug!("Results: show {}", tab.label());
        self.results_tab = tab;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedBackend;

    fn settings() -> Settings {
        Settings {
            transition_ms: 0,
            ..Settings::default()
        }
    }

    fn running_session(backend: &Arc<ScriptedBackend>) -> Session {
        backend.run_test("ndt.example.org").unwrap();
        let mut session = Session::new(&settings());
        session.set_phase(Phase::Welcome).unwrap();
        session.begin_run(Some(backend.clone() as Arc<dyn NdtBackend>));
        session
    }

    #[test]
    fn test_new_session_is_loading() {
        let session = Session::new(&settings());
        assert_eq!(session.phase(), Phase::Loading);
        assert!(session.start_enabled);
    }

    #[test]
    fn test_loading_is_not_a_target() {
        let mut session = Session::new(&settings());
        assert!(session.set_phase(Phase::Loading).is_err());
        assert!(matches!(
            session.set_phase_value(9),
            Err(Error::UnknownPhase(9))
        ));
        assert_eq!(session.phase(), Phase::Loading);
    }

    #[test]
    fn test_results_cannot_regress_without_new_run() {
        let mut session = Session::new(&settings());
        session.set_phase(Phase::Welcome).unwrap();
        session.set_phase(Phase::Results).unwrap();

        for target in [Phase::Welcome, Phase::Preparing, Phase::Upload, Phase::Download] {
            assert!(session.set_phase(target).is_err());
            assert_eq!(session.phase(), Phase::Results);
        }

        session.begin_run(None);
        assert_eq!(session.phase(), Phase::Welcome);
        session.set_phase(Phase::Preparing).unwrap();
    }

    #[test]
    fn test_preparing_shows_loading_region() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut session = running_session(&backend);
        session.upload_gauge.set_value(50.0, "Mb/s");

        session.set_phase(Phase::Preparing).unwrap();
        assert_eq!(session.region, TestRegion::Loading);
        assert_eq!(session.page(), Page::Test);
        assert_eq!(session.upload_gauge.value, 0.0);
    }

    #[test]
    fn test_upload_applies_limit_and_host() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.store().apply(crate::backend::BackendMessage::SpeedLimit {
            spd_limit: serde_json::json!("400"),
        });
        backend.store().set_var("avgrtt", "18.7");
        backend.store().set_host("mlab1.example.net");

        let mut session = running_session(&backend);
        session.set_phase(Phase::Preparing).unwrap();
        session.set_phase(Phase::Upload).unwrap();

        assert_eq!(session.region, TestRegion::Upload);
        assert_eq!(session.rtt_label, "19 ms");
        assert_eq!(session.remote_host, "mlab1.example.net");
        assert_eq!(session.upload_gauge.highlights.len(), 2);
        assert_eq!(session.download_gauge.highlights[0].to, 400.0);
    }

    #[test]
    fn test_upload_without_numbers() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut session = running_session(&backend);
        session.set_phase(Phase::Upload).unwrap();

        assert_eq!(session.rtt_label, "n/a");
        assert_eq!(session.upload_gauge.highlights.len(), 1);
    }

    #[test]
    fn test_gauge_refresh_follows_phase() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.store().set_var("ClientToServerSpeed", "94250");
        backend.store().set_var("ServerToClientSpeed", "850");

        let mut session = running_session(&backend);
        session.set_phase(Phase::Upload).unwrap();
        session.on_frame(Instant::now() + Duration::from_secs(2));
        assert_eq!(session.upload_gauge.value, 94.25);
        assert_eq!(session.upload_gauge.units, "Mb/s");

        session.set_phase(Phase::Download).unwrap();
        session.update_gauge_value();
        assert_eq!(session.download_gauge.value, 850.0);
        assert_eq!(session.download_gauge.units, "kb/s");

        session.set_phase(Phase::Results).unwrap();
        session.update_gauge_value();
        assert!(session.next_gauge_refresh.is_none());
    }

    #[test]
    fn test_completed_poll_renders_results_once() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.store().set_var("ServerToClientSpeed", "94250");
        let mut session = running_session(&backend);
        session.set_phase(Phase::Preparing).unwrap();
        session.set_phase(Phase::Upload).unwrap();
        session.set_phase(Phase::Download).unwrap();

        let signals = BackendSignals {
            errmsg: "Test completed successfully".into(),
            status: "Inbound".into(),
            host: "ndt.example.org".into(),
        };
        assert_eq!(session.apply_poll(&signals), PollOutcome::Completed);
        assert_eq!(session.phase(), Phase::Results);
        assert!(session.start_enabled);
        let first = session.results.clone().unwrap();
        assert_eq!(first.download.value_text(), "94.25");

        // A late tick changes nothing.
        backend.store().set_var("ServerToClientSpeed", "1");
        assert_eq!(session.apply_poll(&signals), PollOutcome::Continue);
        assert_eq!(session.results.as_ref(), Some(&first));
    }

    #[test]
    fn test_not_run_poll_abandons() {
        let signals = BackendSignals {
            errmsg: "Test not run.".into(),
            status: "notStarted".into(),
            host: "unknown".into(),
        };

        for entered in [None, Some(Phase::Preparing)] {
            let backend = Arc::new(ScriptedBackend::new());
            let mut session = running_session(&backend);
            if let Some(phase) = entered {
                session.set_phase(phase).unwrap();
            }

            assert_eq!(session.apply_poll(&signals), PollOutcome::Abandoned);
            assert_eq!(session.phase(), Phase::Welcome);
            assert_eq!(session.page(), Page::Welcome);
            assert!(session.start_enabled, "start disabled after abandon from {:?}", entered);
            assert!(session.backend().is_none());
        }
    }

    #[test]
    fn test_refused_start_shows_warning() {
        let mut session = Session::new(&settings());
        session.set_phase(Phase::Welcome).unwrap();
        session.refuse_start();
        assert!(session.plugin_warning);
        assert!(session.backend().is_none());
        assert_eq!(session.phase(), Phase::Welcome);
    }

    #[test]
    fn test_page_fade_completes() {
        let mut session = Session::new(&Settings {
            transition_ms: 400,
            ..Settings::default()
        });
        session.set_phase(Phase::Welcome).unwrap();
        session.begin_run(None);

        let now = Instant::now();
        assert!(session.visible_page(now).1);
        session.on_frame(now + Duration::from_secs(1));
        assert_eq!(session.visible_page(now + Duration::from_secs(1)), (Page::Test, false));
    }

    #[test]
    fn test_results_tabs_cycle() {
        assert_eq!(ResultsTab::Summary.next(), ResultsTab::Details);
        assert_eq!(ResultsTab::Advanced.next(), ResultsTab::Summary);
    }
}
