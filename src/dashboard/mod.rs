//! Terminal dashboard
//!
//! [`state`] holds the controller, [`ui`] turns its state into frames and
//! [`App`] wires both to the terminal and the refresh engine.

mod app;
pub mod state;
pub mod ui;

pub use app::{App, map_key, spawn_refresh};
pub use state::{Command, Dashboard, DashboardState, Effect, Message};
