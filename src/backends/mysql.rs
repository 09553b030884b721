//! MySQL driver (sqlx)

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Column, Connection as _, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::{DashError, DashResult};
use crate::{QueryOutcome, Scalar};

use super::Connection;

pub struct MySqlBackendConnection {
    conn: Option<MySqlConnection>,
}

/// Connect using a `mysql://` URL. Go-style DSNs (`user:pass@tcp(host:port)/db`)
/// are rewritten to URL form first.
pub async fn connect(descriptor: &str) -> DashResult<Box<dyn Connection>> {
    let url = normalize_dsn(descriptor);
    let conn = MySqlConnection::connect(&url)
        .await
        .map_err(|e| DashError::Connection(format!("failed to connect to mysql: {e}")))?;

    debug!("mysql connection established");
    Ok(Box::new(MySqlBackendConnection { conn: Some(conn) }))
}

fn normalize_dsn(descriptor: &str) -> String {
    if descriptor.contains("://") {
        return descriptor.to_string();
    }

    match descriptor.split_once("@tcp(") {
        Some((credentials, rest)) => match rest.split_once(')') {
            Some((host, path)) => format!("mysql://{credentials}@{host}{path}"),
            None => format!("mysql://{descriptor}"),
        },
        None => format!("mysql://{descriptor}"),
    }
}

#[async_trait]
impl Connection for MySqlBackendConnection {
    async fn query(&mut self, text: &str) -> QueryOutcome {
        let Some(conn) = self.conn.as_mut() else {
            return QueryOutcome::failed("connection already closed");
        };

        match sqlx::query(text).fetch_all(conn).await {
            Ok(rows) => into_outcome(&rows),
            Err(e) => QueryOutcome::failed(e),
        }
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(e) = conn.close().await
        {
            warn!("failed to close mysql connection cleanly: {e}");
        }
    }
}

fn into_outcome(rows: &[MySqlRow]) -> QueryOutcome {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|index| decode_cell(row, index)).collect())
        .collect();

    QueryOutcome::Rows { columns, rows }
}

fn decode_cell(row: &MySqlRow, index: usize) -> Scalar {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Scalar::Opaque("NULL".to_string()),
        Ok(raw) => raw.type_info().name().to_string(),
        Err(e) => return Scalar::Opaque(e.to_string()),
    };

    let decoded = match type_name.as_str() {
        "BIGINT UNSIGNED" | "INT UNSIGNED" | "MEDIUMINT UNSIGNED" | "SMALLINT UNSIGNED"
        | "TINYINT UNSIGNED" => row.try_get::<u64, _>(index).map(|v| match i64::try_from(v) {
            Ok(v) => Scalar::Integer(v),
            Err(_) => Scalar::Opaque(v.to_string()),
        }),
        "BIGINT" | "INT" | "MEDIUMINT" | "SMALLINT" | "TINYINT" => {
            row.try_get::<i64, _>(index).map(Scalar::Integer)
        }
        "FLOAT" => row.try_get::<f32, _>(index).map(|v| Scalar::Float(v.into())),
        "DOUBLE" => row.try_get::<f64, _>(index).map(Scalar::Float),
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
            row.try_get::<String, _>(index).map(Scalar::Text)
        }
        "DECIMAL" => row
            .try_get::<sqlx::types::Decimal, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "BOOLEAN" => row
            .try_get::<bool, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|v| Scalar::Opaque(v.to_rfc3339())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        _ => Ok(Scalar::Opaque(format!("<{type_name}>"))),
    };

    decoded.unwrap_or_else(|e| Scalar::Opaque(e.to_string()))
}
