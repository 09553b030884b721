//! Cell formatting and status classification

use std::sync::LazyLock;

use ratatui::style::Style;
use regex::Regex;

use crate::{QueryOutcome, Scalar};

use super::theme::Theme;

/// Strings longer than this are truncated in the table
const MAX_TEXT_WIDTH: usize = 15;

/// Characters kept before the ellipsis when truncating
const TRUNCATED_WIDTH: usize = 12;

static TIMEOUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btime(d)?[ _-]?out\b|deadline exceeded").expect("timeout pattern is valid")
});

/// Whether an error message describes a timeout rather than a hard failure
pub fn is_timeout(error: &str) -> bool {
    TIMEOUT_PATTERN.is_match(error)
}

/// Health of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Success,
    NoData,
    Degraded,
    Failed,
}

impl RowStatus {
    pub fn of(outcome: &QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Failed(error) if is_timeout(error) => RowStatus::Degraded,
            QueryOutcome::Failed(_) => RowStatus::Failed,
            QueryOutcome::Rows { .. } if outcome.first_value().is_some() => RowStatus::Success,
            QueryOutcome::Rows { .. } => RowStatus::NoData,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            RowStatus::Success => "✓",
            RowStatus::NoData => "?",
            RowStatus::Degraded => "⚠",
            RowStatus::Failed => "✗",
        }
    }

    pub fn style(&self, theme: &Theme) -> Style {
        match self {
            RowStatus::Success => theme.success,
            RowStatus::NoData => theme.muted,
            RowStatus::Degraded => theme.timeout,
            RowStatus::Failed => theme.error,
        }
    }
}

/// Text shown in the VALUE column
pub fn display_value(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Failed(_) => "ERROR".to_string(),
        QueryOutcome::Rows { .. } => outcome
            .first_value()
            .map(format_value)
            .unwrap_or_else(|| "No data".to_string()),
    }
}

pub fn format_value(value: &Scalar) -> String {
    match value {
        Scalar::Integer(value) => value.to_string(),
        Scalar::Float(value) => format!("{value:.2}"),
        Scalar::Text(value) if value.chars().count() > MAX_TEXT_WIDTH => {
            let kept: String = value.chars().take(TRUNCATED_WIDTH).collect();
            format!("{kept}...")
        }
        Scalar::Text(value) => value.clone(),
        Scalar::Opaque(value) => value.clone(),
    }
}
