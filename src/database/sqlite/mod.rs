use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{NewSyncRun, NewTableResult, SyncRun, TableResult};
use crate::database::sqlite::queries::{SyncRunQueries, TableResultQueries};
use crate::indexer::SyncReport;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Local history of sync runs and their per-table outcomes
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: DbPool,
}

impl Ledger {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("Failed to create ledger connection pool")?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;

        Ok(ledger)
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running ledger migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run ledger schema migration")?;

        debug!("Ledger migrations completed successfully");
        Ok(())
    }

    /// Open the ledger at `path`, creating its parent directory if needed
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create ledger directory: {}", parent.display())
            })?;
        }

        Self::new(path).await
    }

    /// Store a finished run and all of its table results atomically
    #[inline]
    pub async fn record_report(&self, report: &SyncReport) -> Result<i64> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for sync run")?;

        let run_id = SyncRunQueries::insert(&mut transaction, &NewSyncRun::from(report)).await?;
        for (position, table) in report.tables.iter().enumerate() {
            let result = NewTableResult::from_report(position, table);
            TableResultQueries::insert(&mut transaction, run_id, &result).await?;
        }

        transaction
            .commit()
            .await
            .context("Failed to commit sync run")?;

        info!(
            "Recorded sync run {} ({} tables) in ledger",
            run_id,
            report.tables.len()
        );
        Ok(run_id)
    }

    #[inline]
    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
        SyncRunQueries::list_recent(&self.pool, i64::try_from(limit).unwrap_or(i64::MAX)).await
    }

    #[inline]
    pub async fn results_for_run(&self, run_id: i64) -> Result<Vec<TableResult>> {
        TableResultQueries::list_for_run(&self.pool, run_id).await
    }

    /// Keep only the newest `keep` runs; `0` keeps everything
    #[inline]
    pub async fn prune(&self, keep: usize) -> Result<u64> {
        if keep == 0 {
            return Ok(0);
        }

        let removed =
            SyncRunQueries::delete_older_than(&self.pool, i64::try_from(keep).unwrap_or(i64::MAX))
                .await?;
        if removed > 0 {
            debug!("Pruned {} old sync runs", removed);
        }
        Ok(removed)
    }
}
