//! MongoDB driver
//!
//! MongoDB has no query language the dashboard could pass through, so queries
//! follow a fixed textual convention:
//!
//! ```text
//! <collection>.count(<json filter>)
//! ```
//!
//! e.g. `users.count({"status": "active"})`. Any other operation is reported
//! as a query error on that row; the connection stays usable.

use serde_json::{Map, Value};
use tracing::warn;

/// A parsed `collection.count(filter)` query
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub collection: String,
    pub filter: Map<String, Value>,
}

/// Parse the query convention described in the module docs.
///
/// An empty filter means "all documents". A filter that is not a JSON object
/// also falls back to counting all documents.
pub fn parse_query(text: &str) -> Result<CountQuery, String> {
    let Some((collection, operation)) = text.trim().split_once('.') else {
        return Err("invalid MongoDB query format. Use: collection.operation(filter)".to_string());
    };

    let filter = operation
        .strip_prefix("count(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| "unsupported MongoDB operation. Use: count({filter})".to_string())?
        .trim();

    let filter = if filter.is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(filter) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("ignoring malformed MongoDB filter {filter:?}, counting all documents");
                Map::new()
            }
        }
    };

    Ok(CountQuery {
        collection: collection.to_string(),
        filter,
    })
}

/// Database name from the descriptor path, `test` when there is none
pub fn database_name(descriptor: &str) -> String {
    let parts: Vec<&str> = descriptor.split('/').collect();
    if parts.len() > 3 {
        let name = parts[parts.len() - 1]
            .split('?')
            .next()
            .unwrap_or_default();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    "test".to_string()
}

#[cfg(feature = "mongo")]
pub use driver::connect;

#[cfg(feature = "mongo")]
mod driver {
    use async_trait::async_trait;
    use mongodb::Client;
    use mongodb::bson::{Document, doc};
    use tracing::{debug, warn};

    use crate::backends::Connection;
    use crate::error::{DashError, DashResult};
    use crate::{QueryOutcome, Scalar};

    use super::{database_name, parse_query};

    pub struct MongoConnection {
        client: Option<Client>,
        database: String,
    }

    pub async fn connect(descriptor: &str) -> DashResult<Box<dyn Connection>> {
        let client = Client::with_uri_str(descriptor)
            .await
            .map_err(|e| DashError::Connection(format!("failed to connect to mongodb: {e}")))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DashError::Connection(format!("failed to ping mongodb: {e}")))?;

        let database = database_name(descriptor);
        debug!("mongodb connection established (database {database})");

        Ok(Box::new(MongoConnection {
            client: Some(client),
            database,
        }))
    }

    #[async_trait]
    impl Connection for MongoConnection {
        async fn query(&mut self, text: &str) -> QueryOutcome {
            let Some(client) = self.client.as_ref() else {
                return QueryOutcome::failed("connection already closed");
            };

            let query = match parse_query(text) {
                Ok(query) => query,
                Err(e) => return QueryOutcome::Failed(e),
            };

            let filter = match mongodb::bson::to_document(&query.filter) {
                Ok(filter) => filter,
                Err(e) => return QueryOutcome::failed(e),
            };

            let collection = client
                .database(&self.database)
                .collection::<Document>(&query.collection);

            match collection.count_documents(filter).await {
                Ok(count) => {
                    let value = match i64::try_from(count) {
                        Ok(count) => Scalar::Integer(count),
                        Err(_) => Scalar::Opaque(count.to_string()),
                    };
                    QueryOutcome::scalar("count", value)
                }
                Err(e) => QueryOutcome::failed(e),
            }
        }

        async fn close(&mut self) {
            if let Some(client) = self.client.take() {
                client.shutdown().await;
            } else {
                warn!("mongodb connection closed twice");
            }
        }
    }
}
