//! Colors and styles used by the renderer

use ratatui::style::{Color, Modifier, Style};

/// Immutable set of styles handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub title: Style,
    pub success: Style,
    pub error: Style,
    pub timeout: Style,
    pub muted: Style,
    pub border: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Rgb(249, 250, 251))
                .bg(Color::Rgb(99, 102, 241))
                .add_modifier(Modifier::BOLD),
            success: Style::default().fg(Color::Rgb(16, 185, 129)),
            error: Style::default().fg(Color::Rgb(239, 68, 68)),
            timeout: Style::default().fg(Color::Rgb(249, 115, 22)),
            muted: Style::default().fg(Color::Rgb(107, 114, 128)),
            border: Style::default().fg(Color::Rgb(107, 114, 128)),
        }
    }
}

impl Theme {
    /// Plain theme for terminals without color support
    pub fn monochrome() -> Self {
        Self {
            title: Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
            success: Style::default(),
            error: Style::default().add_modifier(Modifier::BOLD),
            timeout: Style::default().add_modifier(Modifier::UNDERLINED),
            muted: Style::default().add_modifier(Modifier::DIM),
            border: Style::default(),
        }
    }
}
