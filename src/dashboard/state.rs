//! Dashboard state machine
//!
//! [`Dashboard`] is driven by exactly one task, the host loop, which feeds it
//! [`Message`]s one at a time and carries out the returned [`Effect`]s. Query
//! workers never touch it: their only output is the single
//! [`Message::Refreshed`] a finished fan-out produces.
//!
//! ```text
//!            ┌──────── refresh ─────────┐
//!            ▼                          │
//!   ──► Loading ── rows ──► Ready ──────┤
//!            │                 ▲ │      │
//!            │                 └─┘ ?    │
//!            └── engine error ─► Failed ┘
//! ```
//!
//! Every refresh bumps a generation counter. A completion carrying an older
//! generation belongs to a superseded fan-out and is dropped.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::DisplayRow;
use crate::error::DashError;

/// What the dashboard currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    /// A fan-out is in flight; `target` names the app when only one is queried
    Loading { target: Option<String> },

    /// Results of the latest completed fan-out
    Ready {
        rows: Vec<DisplayRow>,
        refreshed_at: DateTime<Utc>,
        /// Error detail overlay, only ever open while some row has an error
        show_errors: bool,
    },

    /// The fan-out itself failed
    Failed { error: String },
}

impl DashboardState {
    pub fn rows(&self) -> &[DisplayRow] {
        match self {
            DashboardState::Ready { rows, .. } => rows,
            _ => &[],
        }
    }

    pub fn has_errors(&self) -> bool {
        self.rows().iter().any(|row| row.outcome.is_error())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DashboardState::Loading { .. })
    }
}

/// User-level commands, independent of the key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    ToggleErrors,
    Quit,
}

/// Input to the state machine
#[derive(Debug)]
pub enum Message {
    Command(Command),

    /// A fan-out finished
    Refreshed {
        generation: u64,
        result: Result<Vec<DisplayRow>, DashError>,
    },
}

/// Side effect the host loop must perform after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,

    /// Spawn a fan-out tagged with this generation
    StartRefresh { generation: u64 },

    /// Leave the dashboard
    Quit,
}

/// The single-threaded dashboard controller
#[derive(Debug)]
pub struct Dashboard {
    state: DashboardState,
    generation: u64,
    filter: Option<String>,
    quit: bool,
}

impl Dashboard {
    /// Create the controller in `Loading`, together with the effect that
    /// starts the first fan-out
    pub fn new(filter: Option<String>) -> (Self, Effect) {
        let dashboard = Self {
            state: DashboardState::Loading {
                target: filter.clone(),
            },
            generation: 1,
            filter,
            quit: false,
        };

        (dashboard, Effect::StartRefresh { generation: 1 })
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Process one message and report what the host has to do next
    pub fn update(&mut self, message: Message) -> Effect {
        if self.quit {
            return Effect::None;
        }

        match message {
            Message::Command(command) => self.handle_command(command),
            Message::Refreshed { generation, result } => {
                self.handle_refreshed(generation, result);
                Effect::None
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Effect {
        match command {
            Command::Quit => {
                debug!("quit requested");
                self.quit = true;
                Effect::Quit
            }
            Command::Refresh => {
                self.generation += 1;
                debug!("starting refresh generation {}", self.generation);

                self.state = DashboardState::Loading {
                    target: self.filter.clone(),
                };
                Effect::StartRefresh {
                    generation: self.generation,
                }
            }
            Command::ToggleErrors => {
                let has_errors = self.state.has_errors();

                if let DashboardState::Ready { show_errors, .. } = &mut self.state
                    && has_errors
                {
                    *show_errors = !*show_errors;
                }
                Effect::None
            }
        }
    }

    fn handle_refreshed(&mut self, generation: u64, result: Result<Vec<DisplayRow>, DashError>) {
        if generation != self.generation || !self.state.is_loading() {
            trace!(
                "discarding stale refresh generation {generation} (current {})",
                self.generation
            );
            return;
        }

        self.state = match result {
            Ok(rows) => {
                debug!("refresh generation {generation} ready with {} rows", rows.len());
                DashboardState::Ready {
                    rows,
                    refreshed_at: Utc::now(),
                    show_errors: false,
                }
            }
            Err(e) => {
                debug!("refresh generation {generation} failed: {e}");
                DashboardState::Failed {
                    error: e.to_string(),
                }
            }
        };
    }
}
