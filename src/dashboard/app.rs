//! Main application logic

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, interval_at};
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::engine::RefreshEngine;

use super::{
    state::{Command, Dashboard, Effect, Message},
    ui::{self, Theme},
};

/// Main TUI application
pub struct App {
    apps: Arc<BTreeMap<String, AppConfig>>,
    engine: RefreshEngine,
    dashboard: Dashboard,
    theme: Theme,
    refresh_interval: Option<Duration>,
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
    /// Effect produced when the dashboard was created, run once the loop starts
    initial: Effect,
}

impl App {
    pub fn new(
        apps: BTreeMap<String, AppConfig>,
        engine: RefreshEngine,
        filter: Option<String>,
        theme: Theme,
        refresh_interval: Option<Duration>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (dashboard, initial) = Dashboard::new(filter);

        Self {
            apps: Arc::new(apps),
            engine,
            dashboard,
            theme,
            refresh_interval,
            tx,
            rx,
            initial,
        }
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_event_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Main event loop
    ///
    /// Waits for whichever comes first: a key press, a finished refresh or the
    /// auto refresh tick. Each one is turned into exactly one [`Message`] and
    /// the frame is redrawn afterwards.
    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let mut events = EventStream::new();
        let mut ticker = self
            .refresh_interval
            .map(|period| interval_at(Instant::now() + period, period));

        let initial = std::mem::replace(&mut self.initial, Effect::None);
        self.perform(initial);

        loop {
            terminal.draw(|frame| {
                ui::draw(
                    frame,
                    self.dashboard.state(),
                    self.dashboard.filter(),
                    &self.theme,
                )
            })?;

            let message = tokio::select! {
                Some(message) = self.rx.recv() => message,

                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match map_key(key) {
                            Some(command) => Message::Command(command),
                            None => continue,
                        }
                    }
                    // resize and friends only need a redraw
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("terminal input failed: {e}");
                        return Err(e.into());
                    }
                    None => break,
                },

                _ = tick(&mut ticker) => {
                    if self.dashboard.state().is_loading() {
                        continue;
                    }
                    debug!("auto refresh");
                    Message::Command(Command::Refresh)
                }
            };

            let effect = self.dashboard.update(message);
            if self.perform(effect) {
                break;
            }
        }

        Ok(())
    }

    /// Carry out an effect, returns `true` when the app should exit
    fn perform(&self, effect: Effect) -> bool {
        match effect {
            Effect::None => false,
            Effect::Quit => true,
            Effect::StartRefresh { generation } => {
                spawn_refresh(
                    self.engine.clone(),
                    Arc::clone(&self.apps),
                    self.dashboard.filter().map(str::to_string),
                    generation,
                    self.tx.clone(),
                );
                false
            }
        }
    }
}

/// Run one fan-out in the background and deliver its outcome as a single
/// [`Message::Refreshed`]
pub fn spawn_refresh(
    engine: RefreshEngine,
    apps: Arc<BTreeMap<String, AppConfig>>,
    filter: Option<String>,
    generation: u64,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = engine.refresh(&apps, filter.as_deref()).await;

        if tx.send(Message::Refreshed { generation, result }).is_err() {
            debug!("dashboard closed before refresh generation {generation} finished");
        }
    })
}

/// Key bindings
pub fn map_key(key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Refresh),
        KeyCode::Char('?') => Some(Command::ToggleErrors),
        _ => None,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
