// Sync orchestration
// Runs a driver's tables one after another and collects a per-table report


use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::registry::{Driver, TableSpec};
use super::{DEFAULT_BATCH_SIZE, PointIds, SyncOptions, TableSyncer};
use crate::config::{PointIdMode, SyncConfig};

/// Final state of one table in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Synced {
        records: usize,
        batches: usize,
        attempts: u32,
    },
    Empty,
    Failed {
        error: String,
        attempts: u32,
    },
}

impl TableOutcome {
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Short human readable summary
    #[inline]
    pub fn summary(&self) -> String {
        match self {
            Self::Synced { records, .. } => format!("Synced {} records", records),
            Self::Empty => "No records found".to_string(),
            Self::Failed { error, .. } => format!("Error: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub collection: String,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Everything an operator needs to see partial success of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub driver: Driver,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub recreate: bool,
    pub embedding_scheme: String,
    pub vector_size: usize,
    pub tables: Vec<TableReport>,
}

impl SyncReport {
    #[inline]
    pub fn failed_tables(&self) -> Vec<&TableReport> {
        self.tables
            .iter()
            .filter(|report| report.outcome.is_failure())
            .collect()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.tables.iter().all(|report| !report.outcome.is_failure())
    }

    /// Table name to outcome summary
    #[inline]
    pub fn results(&self) -> BTreeMap<String, String> {
        self.tables
            .iter()
            .map(|report| (report.table.clone(), report.outcome.summary()))
            .collect()
    }

    #[inline]
    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|report| report.table == table)
            .map(|report| &report.outcome)
    }
}

/// Run-wide settings shared by every table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub recreate: bool,
    pub batch_size: usize,
    pub point_ids: PointIdMode,
    /// Extra attempts for a failed table; retries always recreate
    pub table_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for RunOptions {
    #[inline]
    fn default() -> Self {
        Self {
            recreate: true,
            batch_size: DEFAULT_BATCH_SIZE,
            point_ids: PointIdMode::Sequential,
            table_retries: 0,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl RunOptions {
    #[inline]
    pub fn from_config(config: &SyncConfig, recreate: bool) -> Self {
        Self {
            recreate,
            batch_size: config.batch_size,
            point_ids: config.point_ids,
            table_retries: config.table_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Drives [`TableSyncer`] over a list of tables.
///
/// Tables run strictly one after another. A table that fails is recorded and the
/// run moves on to the next one. While a table is being recreated, searches against
/// its collection may see it empty or partially filled.
pub struct SyncRunner {
    syncer: TableSyncer,
    options: RunOptions,
}

impl SyncRunner {
    #[inline]
    pub const fn new(syncer: TableSyncer, options: RunOptions) -> Self {
        Self { syncer, options }
    }

    #[inline]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    fn table_options(&self, spec: &TableSpec, recreate: bool) -> SyncOptions {
        let point_ids = match (self.options.point_ids, spec.primary_key.as_ref()) {
            (PointIdMode::Sequential, _) => PointIds::Sequential,
            (PointIdMode::SourceKey, Some(key)) => PointIds::SourceKey(key.clone()),
            (PointIdMode::SourceKey, None) => {
                warn!(
                    "Table '{}' has no primary key, falling back to sequential point ids",
                    spec.name
                );
                PointIds::Sequential
            }
        };

        SyncOptions {
            collection_name: None,
            batch_size: self.options.batch_size,
            text_fields: spec.text_field_set(),
            recreate,
            point_ids,
        }
    }

    async fn run_table(&self, spec: &TableSpec) -> TableReport {
        let max_attempts = self.options.table_retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let recreate = self.options.recreate || attempts > 1;
            let options = self.table_options(spec, recreate);

            match self.syncer.sync_table(&spec.name, &options).await {
                Ok(stats) => {
                    let outcome = if stats.records == 0 {
                        TableOutcome::Empty
                    } else {
                        info!(
                            "Successfully synced table '{}' ({} records)",
                            spec.name, stats.records
                        );
                        TableOutcome::Synced {
                            records: stats.records,
                            batches: stats.batches,
                            attempts,
                        }
                    };
                    return TableReport {
                        table: spec.name.clone(),
                        collection: stats.collection,
                        outcome,
                    };
                }
                Err(e) if attempts < max_attempts => {
                    let delay = self
                        .options
                        .retry_backoff
                        .saturating_mul(2_u32.saturating_pow(attempts - 1));
                    warn!(
                        "Sync of table '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                        spec.name, attempts, max_attempts, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    error!("Failed to sync table '{}': {}", spec.name, e);
                    return TableReport {
                        table: spec.name.clone(),
                        collection: spec.name.clone(),
                        outcome: TableOutcome::Failed {
                            error: e.to_string(),
                            attempts,
                        },
                    };
                }
            }
        }
    }

    /// Sync `tables` in order and report the outcome of each one
    #[inline]
    pub async fn run(&self, driver: Driver, tables: &[TableSpec]) -> SyncReport {
        let started_at = Utc::now();
        let embedder = self.syncer.embedder();
        info!(
            "Starting {} sync of {} tables (embedding scheme {}, {} dimensions)",
            driver,
            tables.len(),
            embedder.scheme(),
            embedder.dimension()
        );

        let mut reports = Vec::with_capacity(tables.len());
        for spec in tables {
            info!("Syncing table '{}'", spec.name);
            reports.push(self.run_table(spec).await);
        }

        let report = SyncReport {
            driver,
            started_at,
            finished_at: Utc::now(),
            recreate: self.options.recreate,
            embedding_scheme: embedder.scheme().to_string(),
            vector_size: embedder.dimension(),
            tables: reports,
        };

        let failed = report.failed_tables().len();
        if failed == 0 {
            info!("Sync completed: {} tables", report.tables.len());
        } else {
            warn!(
                "Sync completed with {} of {} tables failed",
                failed,
                report.tables.len()
            );
        }

        report
    }
}
