pub mod backends;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database technology an app connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    Mysql,
    Mongodb,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Mysql => "mysql",
            BackendKind::Mongodb => "mongodb",
        }
    }

    /// Cheapest query that proves a connection can answer
    pub fn probe_query(&self) -> &'static str {
        match self {
            BackendKind::Postgres | BackendKind::Mysql => "SELECT 1",
            BackendKind::Mongodb => "test.count({})",
        }
    }

    /// Query seeded into newly added apps
    pub fn default_query(&self) -> &'static str {
        match self {
            BackendKind::Postgres | BackendKind::Mysql => "SELECT COUNT(*) FROM users",
            BackendKind::Mongodb => "users.count({})",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = error::DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(BackendKind::Postgres),
            "mysql" => Ok(BackendKind::Mysql),
            "mongodb" => Ok(BackendKind::Mongodb),
            other => Err(error::DashError::Config(format!(
                "invalid database type '{other}'. Supported: postgres, mysql, mongodb"
            ))),
        }
    }
}

/// A single dynamically-typed cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Anything the driver could not map onto the variants above (NULL, decimals, dates, ...)
    Opaque(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) | Scalar::Opaque(value) => f.write_str(value),
        }
    }
}

/// Backend-neutral result of running one query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Scalar>>,
    },
    Failed(String),
}

impl QueryOutcome {
    pub fn failed(error: impl fmt::Display) -> Self {
        QueryOutcome::Failed(error.to_string())
    }

    /// Single-cell outcome, e.g. a count
    pub fn scalar(column: impl Into<String>, value: Scalar) -> Self {
        QueryOutcome::Rows {
            columns: vec![column.into()],
            rows: vec![vec![value]],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryOutcome::Failed(error) => Some(error),
            QueryOutcome::Rows { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// The first cell of the first row, which is what the dashboard displays
    pub fn first_value(&self) -> Option<&Scalar> {
        match self {
            QueryOutcome::Rows { rows, .. } => rows.first().and_then(|row| row.first()),
            QueryOutcome::Failed(_) => None,
        }
    }
}

/// One line of the dashboard table
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub app: String,
    pub label: String,
    pub outcome: QueryOutcome,
    pub completed_at: DateTime<Utc>,
}

impl DisplayRow {
    pub fn new(app: impl Into<String>, label: impl Into<String>, outcome: QueryOutcome) -> Self {
        Self {
            app: app.into(),
            label: label.into(),
            outcome,
            completed_at: Utc::now(),
        }
    }
}
