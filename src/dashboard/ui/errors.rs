//! Error detail overlay

use ratatui::text::{Line, Span};

use crate::DisplayRow;

use super::format::RowStatus;
use super::theme::Theme;

/// One block per failing row with the full error text, then a count
pub fn error_lines(rows: &[DisplayRow], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut count = 0;

    for row in rows {
        let Some(error) = row.outcome.error() else {
            continue;
        };
        count += 1;

        let status = RowStatus::of(&row.outcome);
        lines.push(Line::from(vec![
            Span::styled("✗", status.style(theme)),
            Span::raw(format!(" {}.{}", row.app, row.label)),
        ]));
        lines.push(Line::raw(format!("  {error}")));
        lines.push(Line::default());
    }

    lines.push(Line::styled(
        format!("{count} error(s) found • Press ? to close"),
        theme.muted,
    ));
    lines
}
