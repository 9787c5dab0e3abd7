use crate::backend;
use crate::error::Error;
use crate::locator::{ServerDescriptor, ServerLocator};
use crate::phase::{BackendSignals, Phase};
use crate::poller::PollerHandle;
use crate::session::{Page, ResultsTab, Session};
use crate::settings::{step_gauge_down, step_gauge_up, Settings, SettingsField};
use crate::simulate::SimulationHandle;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Main,
    Settings,
}

#[derive(Debug, Clone, Copy)]
pub enum AppAction {
    Quit,
    StartTest,
    CancelTest,
}

/// Messages from background tasks to the UI loop.
#[derive(Debug, Clone)]
pub enum TestUpdate {
    /// One poller sample of the backend's status texts.
    Poll(BackendSignals),
    /// A phase to enter, from the simulated timeline.
    Phase(Phase),
}

pub struct App {
    pub session: Session,
    pub settings: Settings,
    pub should_quit: bool,

    // UI state
    pub view: AppView,
    pub selected_setting: SettingsField,

    locator: Option<ServerLocator>,
    poller: Option<PollerHandle>,
    simulation: Option<SimulationHandle>,
    update_tx: mpsc::Sender<TestUpdate>,
}

impl App {
    /// Build the app and, unless simulating, fire the server lookup.
    pub fn new(settings: Settings, update_tx: mpsc::Sender<TestUpdate>) -> Self {
        let mut app = Self {
            session: Session::new(&settings),
            settings,
            should_quit: false,
            view: AppView::Main,
            selected_setting: SettingsField::Simulate,
            locator: None,
            poller: None,
            simulation: None,
            update_tx,
        };
        if !app.settings.simulate {
            app.spawn_locator();
        }
        app
    }

    /// Use an already-known lookup result instead of querying the service.
    pub fn with_locator(mut self, locator: ServerLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    fn spawn_locator(&mut self) {
        let url = self.settings.lookup_url();
        info!("Looking up NDT server via {}", url);
        self.locator = Some(ServerLocator::spawn(url));
    }

    pub fn server(&self) -> ServerDescriptor {
        self.locator
            .as_ref()
            .map(|l| l.descriptor())
            .unwrap_or(ServerDescriptor::Unresolved)
    }

    /// Leave the loading phase. In simulate mode this happens after a short
    /// delay through the update channel.
    pub fn initialize(&mut self) {
        if self.session.is_simulated() {
            self.simulation = Some(SimulationHandle::startup(self.update_tx.clone()));
        } else if let Err(e) = self.session.set_phase(Phase::Welcome) {
            warn!("Failed to show welcome page: {}", e);
        }
    }

    pub fn handle_key_event(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match self.view {
            AppView::Main => self.handle_main_key(key),
            AppView::Settings => self.handle_settings_key(key),
        }
    }

    fn can_start(&self) -> bool {
        self.session.start_enabled
            && matches!(self.session.phase(), Phase::Welcome | Phase::Results)
    }

    fn handle_main_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Char('s') => {
                if !self.session.is_running() {
                    self.view = AppView::Settings;
                }
                None
            }
            KeyCode::Enter => {
                if self.can_start() {
                    Some(AppAction::StartTest)
                } else {
                    None
                }
            }
            KeyCode::Esc => {
                if self.session.is_running() {
                    Some(AppAction::CancelTest)
                } else {
                    None
                }
            }
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                if self.session.page() == Page::Results {
                    let next = self.session.results_tab.next();
                    self.session.show_results_tab(next);
                }
                None
            }
            KeyCode::Char(c @ '1'..='3') => {
                if self.session.page() == Page::Results {
                    let index = (c as u8 - b'1') as usize;
                    self.session.show_results_tab(ResultsTab::ALL[index]);
                }
                None
            }
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.view = AppView::Main;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_setting = self.selected_setting.prev();
                None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected_setting = self.selected_setting.next();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.adjust_setting(false);
                None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                self.adjust_setting(true);
                None
            }
            _ => None,
        }
    }

    fn adjust_setting(&mut self, increase: bool) {
        match self.selected_setting {
            SettingsField::Simulate => {
                self.settings.simulate = !self.settings.simulate;
                self.session.set_simulate(self.settings.simulate);
                if !self.settings.simulate && self.locator.is_none() {
                    self.spawn_locator();
                }
            }
            SettingsField::Secure => {
                self.settings.secure = !self.settings.secure;
                if !self.settings.simulate {
                    self.spawn_locator();
                }
            }
            SettingsField::GaugeMax => {
                self.settings.gauge_max = if increase {
                    step_gauge_up(self.settings.gauge_max)
                } else {
                    step_gauge_down(self.settings.gauge_max)
                };
                self.session.set_gauge_max(self.settings.gauge_max);
            }
        }
    }

    fn stop_background(&mut self) {
        self.poller = None;
        self.simulation = None;
    }

    pub fn start_test(&mut self) {
        self.stop_background();

        if self.session.is_simulated() {
            self.session.begin_run(None);
            if let Err(e) = self.session.set_phase(Phase::Preparing) {
                warn!("Simulated run could not start: {}", e);
            }
            self.simulation = Some(SimulationHandle::run(self.update_tx.clone()));
            return;
        }

        match backend::start_test(&self.settings, &self.server()) {
            Ok(handle) => {
                self.session.begin_run(Some(handle.clone()));
                self.poller = Some(PollerHandle::spawn(
                    handle,
                    self.settings.poll_interval(),
                    self.update_tx.clone(),
                ));
            }
            Err(Error::NoServerAvailable) => self.session.refuse_start(),
            Err(e) => {
                error!("Failed to start test: {}", e);
                self.session.refuse_start();
            }
        }
    }

    pub fn cancel_test(&mut self) {
        self.stop_background();
        self.session.abandon();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn handle_update(&mut self, update: TestUpdate) {
        match update {
            TestUpdate::Poll(signals) => {
                // Samples queued before the poller was dropped are stale.
                if self.poller.is_none() {
                    return;
                }
                let outcome = self.session.apply_poll(&signals);
                if outcome.is_terminal() {
                    self.poller = None;
                }
            }
            TestUpdate::Phase(phase) => {
                // Steps queued before the timeline was dropped are stale.
                if self.simulation.is_none() {
                    return;
                }
                if let Err(e) = self.session.set_phase(phase) {
                    warn!("Ignoring simulated phase: {}", e);
                }
                if phase == Phase::Results {
                    self.simulation = None;
                }
            }
        }
    }
}

pub fn poll_event(timeout: Duration) -> std::io::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
