//! Database connection providers
//!
//! The refresh engine only talks to databases through the two traits defined
//! here. [`DriverProvider`] is the production implementation that dispatches
//! on [`BackendKind`] to the compiled-in drivers; tests substitute their own
//! [`ConnectionProvider`] to script outcomes and latencies.
//!
//! ## Error contract
//!
//! - Failing to establish or authenticate a connection is a
//!   [`DashError::Connection`] returned from [`ConnectionProvider::connect`].
//! - Everything that goes wrong afterwards is reported inside the
//!   [`QueryOutcome`] of that single query, with the driver's own error text
//!   preserved so the dashboard can classify timeouts.

use async_trait::async_trait;

use crate::error::{DashError, DashResult};
use crate::{BackendKind, QueryOutcome};

pub mod mongo;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;

/// An open connection to one database, exclusively owned by one worker
#[async_trait]
pub trait Connection: Send {
    /// Execute a query; failures are captured in the outcome
    async fn query(&mut self, text: &str) -> QueryOutcome;

    /// Release the connection. Called exactly once, after the last query.
    async fn close(&mut self);
}

/// Factory for [`Connection`]s
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn connect(&self, kind: BackendKind, descriptor: &str)
    -> DashResult<Box<dyn Connection>>;
}

/// Provider backed by the real database drivers
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverProvider;

#[async_trait]
impl ConnectionProvider for DriverProvider {
    async fn connect(
        &self,
        kind: BackendKind,
        descriptor: &str,
    ) -> DashResult<Box<dyn Connection>> {
        match kind {
            #[cfg(feature = "postgres")]
            BackendKind::Postgres => postgres::connect(descriptor).await,
            #[cfg(feature = "mysql")]
            BackendKind::Mysql => mysql::connect(descriptor).await,
            #[cfg(feature = "mongo")]
            BackendKind::Mongodb => mongo::connect(descriptor).await,
            #[allow(unreachable_patterns)]
            other => Err(DashError::Unsupported(format!(
                "{other} support was not compiled into this build"
            ))),
        }
    }
}
