use anyhow::Result;
use clap::Parser;
use crossterm::event::Event;
use ndtview::app::{poll_event, App, AppAction, TestUpdate};
use ndtview::settings::{default_config_path, load_settings, Settings};
use ndtview::ui::draw_ui;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Terminal front-end for the NDT network speed test
#[derive(Parser, Debug)]
#[command(name = "ndtview", version, about)]
struct Cli {
    /// Path to a config file (defaults to <config_dir>/ndtview/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a simulated test without contacting any server
    #[arg(long)]
    simulate: bool,

    /// Look up plain-transport servers instead of TLS ones
    #[arg(long)]
    insecure: bool,

    /// Base URL of the server discovery service
    #[arg(long)]
    discovery_url: Option<String>,

    /// External NDT client used for the websocket test
    #[arg(long)]
    client: Option<String>,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = self
            .config
            .clone()
            .or_else(default_config_path)
            .map(|path| load_settings(&path))
            .unwrap_or_default();

        if self.simulate {
            settings.simulate = true;
        }
        if self.insecure {
            settings.secure = false;
        }
        if let Some(url) = &self.discovery_url {
            settings.discovery_url = url.clone();
        }
        if let Some(client) = &self.client {
            settings.client_command = client.clone();
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = ndtview::logging::init() {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    let settings = cli.settings();

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let result = run_app(&mut terminal, settings).await;

    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, settings: Settings) -> Result<()> {
    let (update_tx, mut update_rx) = mpsc::channel::<TestUpdate>(32);
    let mut app = App::new(settings, update_tx);
    app.initialize();

    loop {
        let now = Instant::now();
        app.session.on_frame(now);
        terminal.draw(|frame| draw_ui(frame, &app, now))?;

        // Handle test updates
        while let Ok(update) = update_rx.try_recv() {
            app.handle_update(update);
        }

        // Handle input
        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(30))? {
            if let Some(action) = app.handle_key_event(key) {
                match action {
                    AppAction::Quit => break,
                    AppAction::StartTest => app.start_test(),
                    AppAction::CancelTest => app.cancel_test(),
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
