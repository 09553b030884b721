//! Query fan-out engine
//!
//! One refresh opens exactly one connection per matched app and runs all of
//! that app's queries over it, while different apps are queried concurrently.
//!
//! ## Message Flow
//!
//! ```text
//!                 refresh(apps, filter)
//!                          │ spawns one task per app (name order)
//!          ┌───────────────┼───────────────┐
//!          ▼               ▼               ▼
//!     connect → q1..qn  connect → …     connect ✗ → "Connection" row
//!          │ close         │ close         │
//!          └───────► accumulator ◄─────────┘   (locked for the push only)
//!                          │ join all
//!                          ▼
//!                   aggregate() → Vec<DisplayRow>
//! ```
//!
//! ## Failure isolation
//!
//! - connect failure or connect timeout: one synthetic row labelled
//!   [`CONNECTION_LABEL`], the app's queries are skipped
//! - query failure or query timeout: only that row carries the error
//! - a worker panicking: the whole refresh fails with [`DashError::Engine`],
//!   after the remaining workers have finished and closed their connections

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::backends::ConnectionProvider;
use crate::config::AppConfig;
use crate::error::{DashError, DashResult};
use crate::{DisplayRow, QueryOutcome};

mod aggregate;

pub use aggregate::{AppBatch, aggregate};

/// Label of the synthetic row emitted when an app cannot be reached
pub const CONNECTION_LABEL: &str = "Connection";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs refresh cycles against a [`ConnectionProvider`]
#[derive(Clone)]
pub struct RefreshEngine {
    provider: Arc<dyn ConnectionProvider>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl RefreshEngine {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            connect_timeout: DEFAULT_TIMEOUT,
            query_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, query_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.query_timeout = query_timeout;
        self
    }

    /// Query every app matching `filter` (`None` = all apps) and return the
    /// rows in display order.
    ///
    /// Per-app and per-query failures are reported in the rows; an `Err` means
    /// the orchestration itself broke.
    #[instrument(skip_all, fields(filter = ?filter))]
    pub async fn refresh(
        &self,
        apps: &BTreeMap<String, AppConfig>,
        filter: Option<&str>,
    ) -> DashResult<Vec<DisplayRow>> {
        let accumulator = Arc::new(Mutex::new(Vec::with_capacity(apps.len())));
        let mut workers = JoinSet::new();

        for (name, app) in apps
            .iter()
            .filter(|(name, _)| filter.is_none_or(|wanted| wanted == name.as_str()))
        {
            trace!("dispatching worker for {name}");

            let worker = AppWorker {
                name: name.clone(),
                app: app.clone(),
                provider: Arc::clone(&self.provider),
                connect_timeout: self.connect_timeout,
                query_timeout: self.query_timeout,
            };
            let accumulator = Arc::clone(&accumulator);

            workers.spawn(async move {
                let batch = worker.run().await;
                accumulator.lock().await.push(batch);
            });
        }

        // wait for every worker so each opened connection gets closed
        let mut first_err = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("query worker failed: {e}");
                first_err.get_or_insert(DashError::from(e));
            }
        }

        if let Some(e) = first_err {
            return Err(e);
        }

        let batches = std::mem::take(&mut *accumulator.lock().await);
        debug!("refresh finished with {} app batches", batches.len());

        Ok(aggregate(batches))
    }
}

/// Everything one worker needs, owned so the task is `'static`
struct AppWorker {
    name: String,
    app: AppConfig,
    provider: Arc<dyn ConnectionProvider>,
    connect_timeout: Duration,
    query_timeout: Duration,
}

impl AppWorker {
    #[instrument(skip(self), fields(app = %self.name, backend = %self.app.kind))]
    async fn run(self) -> AppBatch {
        let connecting = self.provider.connect(self.app.kind, &self.app.connection);

        let mut conn = match timeout(self.connect_timeout, connecting).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                warn!("connection failed: {e}");
                return self.connection_failure(e.to_string());
            }
            Err(_) => {
                warn!("connection timed out");
                return self.connection_failure(format!(
                    "timeout connecting to {} after {:?}",
                    self.app.kind, self.connect_timeout
                ));
            }
        };

        let mut rows = Vec::with_capacity(self.app.queries.len());

        for (label, text) in &self.app.queries {
            trace!("running query {label}");

            let outcome = match timeout(self.query_timeout, conn.query(text)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    QueryOutcome::Failed(format!("query timed out after {:?}", self.query_timeout))
                }
            };

            if let Some(e) = outcome.error() {
                debug!("query {label} failed: {e}");
            }

            rows.push(DisplayRow::new(&self.name, label, outcome));
        }

        conn.close().await;

        AppBatch {
            app: self.name,
            rows,
        }
    }

    fn connection_failure(&self, error: String) -> AppBatch {
        AppBatch {
            app: self.name.clone(),
            rows: vec![DisplayRow::new(
                &self.name,
                CONNECTION_LABEL,
                QueryOutcome::Failed(error),
            )],
        }
    }
}
