#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::RecordSource;
use crate::SyncError;
use crate::config::DatabaseConfig;
use crate::records::{FieldValue, Record};

const COLUMNS_SQL: &str = r"
    SELECT column_name::text, data_type::text
    FROM information_schema.columns
    WHERE table_schema = current_schema() AND table_name = $1
    ORDER BY ordinal_position
";

const PRIMARY_KEY_SQL: &str = r"
    SELECT kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = current_schema()
      AND tc.table_name = $1
    ORDER BY kcu.ordinal_position
";

/// How a column is read back into a [`FieldValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Bool,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Text,
    Uuid,
    TimestampTz,
    Timestamp,
    Json,
    Bytes,
    /// Arbitrary precision numeric, read through its text form
    Numeric,
    /// Anything else (dates, arrays, enums, ...), read through its text form
    Other,
}

impl ColumnKind {
    /// Map an `information_schema.columns.data_type` value
    pub(crate) fn from_data_type(data_type: &str) -> Self {
        match data_type.to_ascii_lowercase().as_str() {
            "boolean" => Self::Bool,
            "smallint" => Self::SmallInt,
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "real" => Self::Real,
            "double precision" => Self::Double,
            "text" | "character varying" | "character" | "name" => Self::Text,
            "uuid" => Self::Uuid,
            "timestamp with time zone" => Self::TimestampTz,
            "timestamp without time zone" => Self::Timestamp,
            "json" | "jsonb" => Self::Json,
            "bytea" => Self::Bytes,
            "numeric" => Self::Numeric,
            _ => Self::Other,
        }
    }

    const fn read_as_text(self) -> bool {
        matches!(self, Self::Numeric | Self::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceColumn {
    pub name: String,
    pub kind: ColumnKind,
}

pub(crate) fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `SELECT` for every column of `table`, ordered by its primary key when it has one
pub(crate) fn select_sql(table: &str, columns: &[SourceColumn], order_by: &[String]) -> String {
    let projection: Vec<String> = columns
        .iter()
        .map(|column| {
            let quoted = quote_ident(&column.name);
            if column.kind.read_as_text() {
                format!("{}::text AS {}", quoted, quoted)
            } else {
                quoted
            }
        })
        .collect();

    let mut sql = format!(
        "SELECT {} FROM {}",
        projection.join(", "),
        quote_ident(table)
    );
    if !order_by.is_empty() {
        let keys: Vec<String> = order_by.iter().map(|key| quote_ident(key)).collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
    sql
}

fn decode(row: &PgRow, index: usize, kind: ColumnKind) -> std::result::Result<FieldValue, sqlx::Error> {
    let value = match kind {
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(index)?.into(),
        ColumnKind::SmallInt => row
            .try_get::<Option<i16>, _>(index)?
            .map(i64::from)
            .into(),
        ColumnKind::Integer => row
            .try_get::<Option<i32>, _>(index)?
            .map(i64::from)
            .into(),
        ColumnKind::BigInt => row.try_get::<Option<i64>, _>(index)?.into(),
        ColumnKind::Real => row
            .try_get::<Option<f32>, _>(index)?
            .map(f64::from)
            .into(),
        ColumnKind::Double => row.try_get::<Option<f64>, _>(index)?.into(),
        ColumnKind::Text | ColumnKind::Other => row.try_get::<Option<String>, _>(index)?.into(),
        ColumnKind::Uuid => row.try_get::<Option<Uuid>, _>(index)?.into(),
        ColumnKind::TimestampTz => row.try_get::<Option<DateTime<Utc>>, _>(index)?.into(),
        ColumnKind::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|naive| naive.and_utc())
            .into(),
        ColumnKind::Json => row.try_get::<Option<Value>, _>(index)?.into(),
        ColumnKind::Bytes => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map_or(FieldValue::Null, FieldValue::Bytes),
        ColumnKind::Numeric => row
            .try_get::<Option<String>, _>(index)?
            .map_or(FieldValue::Null, FieldValue::Decimal),
    };
    Ok(value)
}

/// Record source reading whole tables from PostgreSQL
#[derive(Debug, Clone)]
pub struct PgRecordSource {
    pool: PgPool,
}

impl PgRecordSource {
    #[inline]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = match config.url.as_deref() {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .context("Invalid database URL")?,
            None => {
                let mut options = PgConnectOptions::new()
                    .host(&config.host)
                    .port(config.port)
                    .database(&config.name)
                    .username(&config.user);
                if let Some(password) = config.password.as_deref() {
                    options = options.password(password);
                }
                options
            }
        }
        .options([(
            "statement_timeout",
            format!("{}s", config.statement_timeout_seconds),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to connect to the relational source")?;

        info!("Connected to PostgreSQL record source");
        Ok(Self::from_pool(pool))
    }

    #[inline]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn columns(&self, table: &str) -> std::result::Result<Vec<SourceColumn>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(COLUMNS_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| SourceColumn {
                name,
                kind: ColumnKind::from_data_type(&data_type),
            })
            .collect())
    }

    async fn primary_key(&self, table: &str) -> std::result::Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(PRIMARY_KEY_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    #[inline]
    async fn fetch_all(&self, table: &str) -> crate::Result<Vec<Record>> {
        let source_error = |e: sqlx::Error| SyncError::Source {
            table: table.to_string(),
            message: e.to_string(),
        };

        let columns = self.columns(table).await.map_err(source_error)?;
        if columns.is_empty() {
            return Err(SyncError::Source {
                table: table.to_string(),
                message: "table not found or has no columns".to_string(),
            });
        }
        let order_by = self.primary_key(table).await.map_err(source_error)?;

        let sql = select_sql(table, &columns, &order_by);
        debug!("Reading table '{}': {}", table, sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(source_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Record::new();
            for (index, column) in columns.iter().enumerate() {
                let value = decode(row, index, column.kind).map_err(source_error)?;
                record.insert(column.name.clone(), value);
            }
            records.push(record);
        }

        debug!("Read {} records from '{}'", records.len(), table);
        Ok(records)
    }
}
