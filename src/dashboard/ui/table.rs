//! Result table

use chrono::{DateTime, Local, Utc};
use ratatui::text::{Line, Span};

use crate::DisplayRow;

use super::format::{RowStatus, display_value};
use super::theme::Theme;

const RULE_WIDTH: usize = 70;

pub fn clock(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Header, rule and one line per row
pub fn table_lines(rows: &[DisplayRow], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(rows.len() + 2);

    lines.push(Line::styled(
        format!("  {:<14} {:<20} {:<15} {}", "APP", "QUERY", "VALUE", "UPDATED"),
        theme.muted,
    ));
    lines.push(Line::styled("-".repeat(RULE_WIDTH), theme.muted));

    lines.extend(rows.iter().map(|row| row_line(row, theme)));
    lines
}

fn row_line(row: &DisplayRow, theme: &Theme) -> Line<'static> {
    let status = RowStatus::of(&row.outcome);

    Line::from(vec![
        Span::styled(status.glyph(), status.style(theme)),
        Span::raw(format!(
            " {:<14} {:<20} {:<15} ",
            row.app,
            row.label,
            display_value(&row.outcome)
        )),
        Span::styled(clock(&row.completed_at), theme.muted),
    ])
}
