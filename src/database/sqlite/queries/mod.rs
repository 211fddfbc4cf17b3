
use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::models::*;

const RUN_COLUMNS: &str = "id, driver, started_at, finished_at, recreate, embedding_scheme, \
                           vector_size, tables_total, tables_failed";

const RESULT_COLUMNS: &str = "id, run_id, position, table_name, collection, status, records, \
                              batches, attempts, error_message";

pub struct SyncRunQueries;

impl SyncRunQueries {
    #[inline]
    pub async fn insert(conn: &mut SqliteConnection, run: &NewSyncRun) -> Result<i64> {
        let id = sqlx::query(
            r#"
            INSERT INTO sync_runs (driver, started_at, finished_at, recreate, embedding_scheme,
                                   vector_size, tables_total, tables_failed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.driver)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.recreate)
        .bind(&run.embedding_scheme)
        .bind(run.vector_size)
        .bind(run.tables_total)
        .bind(run.tables_failed)
        .execute(&mut *conn)
        .await
        .context("Failed to insert sync run")?
        .last_insert_rowid();

        debug!("Recorded sync run {}", id);
        Ok(id)
    }

    /// Most recent runs first
    #[inline]
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<SyncRun>> {
        let sql = format!(
            "SELECT {} FROM sync_runs ORDER BY started_at DESC, id DESC LIMIT ?",
            RUN_COLUMNS
        );
        sqlx::query_as::<_, SyncRun>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("Failed to list sync runs")
    }

    #[inline]
    pub async fn delete_older_than(pool: &SqlitePool, keep: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sync_runs
            WHERE id NOT IN (SELECT id FROM sync_runs ORDER BY started_at DESC, id DESC LIMIT ?)
            "#,
        )
        .bind(keep)
        .execute(pool)
        .await
        .context("Failed to prune sync runs")?;

        Ok(result.rows_affected())
    }
}

pub struct TableResultQueries;

impl TableResultQueries {
    #[inline]
    pub async fn insert(
        conn: &mut SqliteConnection,
        run_id: i64,
        result: &NewTableResult,
    ) -> Result<i64> {
        let id = sqlx::query(
            r#"
            INSERT INTO table_results (run_id, position, table_name, collection, status,
                                       records, batches, attempts, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run_id)
        .bind(result.position)
        .bind(&result.table_name)
        .bind(&result.collection)
        .bind(result.status)
        .bind(result.records)
        .bind(result.batches)
        .bind(result.attempts)
        .bind(&result.error_message)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to insert result for table '{}'", result.table_name))?
        .last_insert_rowid();

        Ok(id)
    }

    #[inline]
    pub async fn list_for_run(pool: &SqlitePool, run_id: i64) -> Result<Vec<TableResult>> {
        let sql = format!(
            "SELECT {} FROM table_results WHERE run_id = ? ORDER BY position",
            RESULT_COLUMNS
        );
        sqlx::query_as::<_, TableResult>(&sql)
            .bind(run_id)
            .fetch_all(pool)
            .await
            .context("Failed to list table results")
    }

}
