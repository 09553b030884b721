//! PostgreSQL driver (sqlx)

use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Connection as _, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::{DashError, DashResult};
use crate::{QueryOutcome, Scalar};

use super::Connection;

pub struct PostgresConnection {
    conn: Option<PgConnection>,
}

pub async fn connect(descriptor: &str) -> DashResult<Box<dyn Connection>> {
    let conn = PgConnection::connect(descriptor)
        .await
        .map_err(|e| DashError::Connection(format!("failed to connect to postgres: {e}")))?;

    debug!("postgres connection established");
    Ok(Box::new(PostgresConnection { conn: Some(conn) }))
}

#[async_trait]
impl Connection for PostgresConnection {
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
            warn!("failed to close postgres connection cleanly: {e}");
        }
    }
}

fn into_outcome(rows: &[PgRow]) -> QueryOutcome {
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

fn decode_cell(row: &PgRow, index: usize) -> Scalar {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Scalar::Opaque("NULL".to_string()),
        Ok(raw) => raw.type_info().name().to_string(),
        Err(e) => return Scalar::Opaque(e.to_string()),
    };

    let decoded = match type_name.as_str() {
        "INT2" => row.try_get::<i16, _>(index).map(|v| Scalar::Integer(v.into())),
        "INT4" => row.try_get::<i32, _>(index).map(|v| Scalar::Integer(v.into())),
        "INT8" => row.try_get::<i64, _>(index).map(Scalar::Integer),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Scalar::Float(v.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Scalar::Float),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<String, _>(index).map(Scalar::Text),
        "NUMERIC" => row
            .try_get::<sqlx::types::Decimal, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|v| Scalar::Opaque(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|v| Scalar::Opaque(v.to_string())),
        _ => Ok(Scalar::Opaque(format!("<{type_name}>"))),
    };

    decoded.unwrap_or_else(|e| Scalar::Opaque(e.to_string()))
}
