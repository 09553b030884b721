//! UI rendering module

mod errors;
mod format;
mod layout;
mod table;
mod theme;

pub use format::{RowStatus, display_value, format_value, is_timeout};
pub use layout::{draw, render};
pub use theme::Theme;
