// Invocation surfaces behind the CLI


use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Confirm;
use serde_json::Value;
use tracing::{info, warn};

use crate::collections::CollectionManager;
use crate::config::{Config, TableConfig};
use crate::database::{Ledger, PgRecordSource, RecordSource};
use crate::embeddings::Embedder;
use crate::index::{MemoryIndex, QdrantClient, VectorIndex};
use crate::indexer::runner::RunOptions;
use crate::indexer::{Driver, SyncReport, SyncRunner, TableOutcome, TableSpec, TableSyncer};
use crate::search::{SearchClient, SearchHit, SuggestionQuery};

/// Options of a `sync` invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    pub driver: Driver,
    pub recreate: bool,
    /// Restrict the run to these tables; empty means all of the driver's tables
    pub tables: Vec<String>,
    /// Write into an in-process index instead of the vector store
    pub dry_run: bool,
    pub json: bool,
}

/// Build the vector store client. A missing URL is fatal.
#[inline]
pub fn connect_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    let client = QdrantClient::new(&config.qdrant).context("Vector store is not configured")?;
    info!("Using vector store at {}", client.base_url());
    Ok(Arc::new(client))
}

/// Tables of `driver`, optionally narrowed to `only` (kept in driver order)
#[inline]
pub fn select_tables(
    driver: Driver,
    configured: &[TableConfig],
    only: &[String],
) -> Result<Vec<TableSpec>> {
    let tables = driver.tables(configured);
    if only.is_empty() {
        return Ok(tables);
    }

    if let Some(unknown) = only
        .iter()
        .find(|name| !tables.iter().any(|spec| &spec.name == *name))
    {
        bail!("Table '{}' is not synced by the {} driver", unknown, driver);
    }

    Ok(tables
        .into_iter()
        .filter(|spec| only.contains(&spec.name))
        .collect())
}

/// Run the orchestration against explicit index and source handles
#[inline]
pub async fn run_sync(
    config: &Config,
    index: Arc<dyn VectorIndex>,
    source: Arc<dyn RecordSource>,
    driver: Driver,
    tables: &[TableSpec],
    recreate: bool,
) -> SyncReport {
    let syncer = TableSyncer::new(index, source, Embedder::new(config.sync.vector_size));
    let runner = SyncRunner::new(syncer, RunOptions::from_config(&config.sync, recreate));
    runner.run(driver, tables).await
}

/// Sync every table of the selected driver
#[inline]
pub async fn sync_tables(config: &Config, args: &SyncArgs) -> Result<SyncReport> {
    let tables = select_tables(args.driver, &config.tables, &args.tables)?;

    let index: Arc<dyn VectorIndex> = if args.dry_run {
        info!("Dry run: writing into an in-process index");
        Arc::new(MemoryIndex::new())
    } else {
        connect_index(config)?
    };
    let source = PgRecordSource::connect(&config.database).await?;

    let report = run_sync(
        config,
        index,
        Arc::new(source),
        args.driver,
        &tables,
        args.recreate,
    )
    .await;

    if config.ledger.enabled && !args.dry_run {
        record_in_ledger(config, &report).await;
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize sync report")?
        );
    } else {
        for line in report_lines(&report) {
            println!("{}", line);
        }
    }

    Ok(report)
}

/// Append `report` to the ledger and apply the retention setting.
/// Ledger problems are logged and never fail the sync.
#[inline]
pub async fn record_in_ledger(config: &Config, report: &SyncReport) -> Option<i64> {
    let ledger = match Ledger::open(&config.ledger_path()).await {
        Ok(ledger) => ledger,
        Err(e) => {
            warn!("Sync ledger unavailable, run not recorded: {:#}", e);
            return None;
        }
    };

    let run_id = match ledger.record_report(report).await {
        Ok(run_id) => run_id,
        Err(e) => {
            warn!("Failed to record sync run in ledger: {:#}", e);
            return None;
        }
    };

    if let Err(e) = ledger.prune(config.ledger.keep_runs).await {
        warn!("Failed to prune sync ledger: {:#}", e);
    }
    Some(run_id)
}

/// Human readable summary of a run
#[inline]
pub fn report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync ({} driver, {}) finished in {:.1}s",
        report.driver,
        if report.recreate {
            "recreate"
        } else {
            "in place"
        },
        (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
    )];

    for table in &report.tables {
        let marker = match table.outcome {
            TableOutcome::Synced { .. } => "✅",
            TableOutcome::Empty => "➖",
            TableOutcome::Failed { .. } => "❌",
        };
        let retried = match table.outcome {
            TableOutcome::Synced { attempts, .. } | TableOutcome::Failed { attempts, .. }
                if attempts > 1 =>
            {
                format!(" ({} attempts)", attempts)
            }
            _ => String::new(),
        };
        lines.push(format!(
            "  {} {}: {}{}",
            marker,
            table.table,
            table.outcome.summary(),
            retried
        ));
    }

    let failed = report.failed_tables().len();
    if failed > 0 {
        lines.push(format!(
            "{} of {} tables failed",
            failed,
            report.tables.len()
        ));
    }
    lines
}

/// Search one collection and print the ranked payloads
#[inline]
pub fn search(
    config: &Config,
    collection: &str,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<Vec<SearchHit>> {
    let client = SearchClient::new(connect_index(config)?, Embedder::new(config.sync.vector_size));
    let hits = client
        .search(collection, query, limit)
        .with_context(|| format!("Search in '{}' failed", collection))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results in '{}' for \"{}\"", collection, query);
    } else {
        for (rank, hit) in hits.iter().enumerate() {
            println!(
                "{}. [{:.4}] {}",
                rank + 1,
                hit.score,
                Value::Object(hit.payload.clone())
            );
        }
    }

    Ok(hits)
}

/// Product and shop suggestions for the given terms
#[inline]
pub fn suggest(config: &Config, query: &SuggestionQuery) -> Result<()> {
    let client = SearchClient::new(connect_index(config)?, Embedder::new(config.sync.vector_size));
    let suggestions = client.suggest(query);
    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}

/// Candidate payload values for a raw lookup argument, most literal first
#[inline]
pub fn lookup_candidates(raw: &str) -> Vec<Value> {
    let typed = serde_json::from_str::<Value>(raw)
        .ok()
        .filter(|parsed| matches!(parsed, Value::Number(_) | Value::Bool(_)));

    std::iter::once(Value::String(raw.to_string()))
        .chain(typed)
        .collect()
}

/// Find a synced record by a payload field
#[inline]
pub fn lookup(config: &Config, collection: &str, field: &str, raw: &str) -> Result<()> {
    let client = SearchClient::new(connect_index(config)?, Embedder::new(config.sync.vector_size));

    for value in lookup_candidates(raw) {
        if let Some(payload) = client.find_by_source_id(collection, field, &value)? {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }
    }

    println!("No record with {} = {} in '{}'", field, raw, collection);
    Ok(())
}

/// List collections with their vector configuration
#[inline]
pub fn list_collections(config: &Config) -> Result<()> {
    let manager = CollectionManager::new(connect_index(config)?);
    let collections = manager
        .describe_all()
        .context("Failed to list collections")?;

    if collections.is_empty() {
        println!("No collections exist yet.");
        println!("Use 'catalog-sync sync' to create them.");
        return Ok(());
    }

    println!("Collections ({} total):", collections.len());
    for info in &collections {
        let points = info
            .points_count
            .map_or_else(|| "unknown".to_string(), |count| count.to_string());
        println!(
            "  {} (size {}, {}, {} points)",
            style(&info.name).bold(),
            info.params.size,
            info.params.distance,
            points
        );
    }
    Ok(())
}

/// Delete a collection after confirmation
#[inline]
pub fn drop_collection(config: &Config, name: &str, assume_yes: bool) -> Result<()> {
    let confirmed = assume_yes
        || Confirm::new()
            .with_prompt(format!(
                "Delete collection '{}'? Searches against it return nothing until the next sync.",
                name
            ))
            .default(false)
            .interact()?;
    if !confirmed {
        println!("Aborted.");
        return Ok(());
    }

    let manager = CollectionManager::new(connect_index(config)?);
    if !manager.delete_collection(name) {
        bail!("Failed to delete collection '{}'", name);
    }
    println!("✓ Collection '{}' deleted", name);
    Ok(())
}

/// Recent sync runs from the ledger
#[inline]
pub async fn show_history(config: &Config, limit: usize) -> Result<()> {
    let ledger = Ledger::open(&config.ledger_path())
        .await
        .context("Failed to open sync ledger")?;
    let runs = ledger.recent_runs(limit).await?;

    if runs.is_empty() {
        println!("No sync runs recorded yet.");
        return Ok(());
    }

    for run in &runs {
        let status = if run.is_success() {
            style("ok").green()
        } else {
            style("partial").red()
        };
        println!(
            "#{} {} {} driver, {} tables, {} failed [{}] ({}, {}d)",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.driver,
            run.tables_total,
            run.tables_failed,
            status,
            run.embedding_scheme,
            run.vector_size
        );
        for result in ledger.results_for_run(run.id).await? {
            let detail = result
                .error_message
                .as_deref()
                .map_or_else(|| format!("{} records", result.records), str::to_string);
            println!("    {} {}: {}", result.status, result.table_name, detail);
        }
    }

    Ok(())
}
