
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use crate::indexer::{SyncReport, TableOutcome, TableReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SyncRun {
    pub id: i64,
    pub driver: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub recreate: bool,
    pub embedding_scheme: String,
    pub vector_size: i64,
    pub tables_total: i64,
    pub tables_failed: i64,
}

impl SyncRun {
    #[inline]
    pub const fn is_success(&self) -> bool {
        self.tables_failed == 0
    }

    #[inline]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSyncRun {
    pub driver: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub recreate: bool,
    pub embedding_scheme: String,
    pub vector_size: i64,
    pub tables_total: i64,
    pub tables_failed: i64,
}

impl From<&SyncReport> for NewSyncRun {
    #[inline]
    fn from(report: &SyncReport) -> Self {
        Self {
            driver: report.driver.to_string(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            recreate: report.recreate,
            embedding_scheme: report.embedding_scheme.clone(),
            vector_size: report.vector_size as i64,
            tables_total: report.tables.len() as i64,
            tables_failed: report.failed_tables().len() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum TableStatus {
    Synced,
    Empty,
    Failed,
}

impl std::fmt::Display for TableStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            TableStatus::Synced => write!(f, "Synced"),
            TableStatus::Empty => write!(f, "Empty"),
            TableStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TableResult {
    pub id: i64,
    pub run_id: i64,
    pub position: i64,
    pub table_name: String,
    pub collection: String,
    pub status: TableStatus,
    pub records: i64,
    pub batches: i64,
    pub attempts: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTableResult {
    pub position: i64,
    pub table_name: String,
    pub collection: String,
    pub status: TableStatus,
    pub records: i64,
    pub batches: i64,
    pub attempts: i64,
    pub error_message: Option<String>,
}

impl NewTableResult {
    #[inline]
    pub fn from_report(position: usize, report: &TableReport) -> Self {
        let (status, records, batches, attempts, error_message) = match &report.outcome {
            TableOutcome::Synced {
                records,
                batches,
                attempts,
            } => (
                TableStatus::Synced,
                *records as i64,
                *batches as i64,
                i64::from(*attempts),
                None,
            ),
            TableOutcome::Empty => (TableStatus::Empty, 0, 0, 1, None),
            TableOutcome::Failed { error, attempts } => (
                TableStatus::Failed,
                0,
                0,
                i64::from(*attempts),
                Some(error.clone()),
            ),
        };

        Self {
            position: position as i64,
            table_name: report.table.clone(),
            collection: report.collection.clone(),
            status,
            records,
            batches,
            attempts,
            error_message,
        }
    }
}
