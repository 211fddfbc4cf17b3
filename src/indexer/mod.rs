// Indexer module
// Batch sync pipeline: one source table into one collection

pub mod registry;
pub mod runner;


use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::collections::{CollectionManager, CollectionState};
use crate::database::RecordSource;
use crate::embeddings::Embedder;
use crate::index::{Point, PointId, VectorIndex, VectorParams};
use crate::records::{Record, embedding_text, to_payload};
use crate::{Result, SyncError};

pub use registry::{Driver, TableSpec};
pub use runner::{SyncReport, SyncRunner, TableOutcome, TableReport};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How point ids are derived
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PointIds {
    /// Position in the table's record stream: contiguous `[0, N)` on every run
    #[default]
    Sequential,
    /// UUIDv5 of `"{table}:{value of field}"`, stable across runs
    SourceKey(String),
}

/// Options for a single table sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Target collection; defaults to the table name
    pub collection_name: Option<String>,
    pub batch_size: usize,
    /// Columns fed to the embedder; `None` means every non-null column
    pub text_fields: Option<HashSet<String>>,
    pub recreate: bool,
    pub point_ids: PointIds,
}

impl Default for SyncOptions {
    #[inline]
    fn default() -> Self {
        Self {
            collection_name: None,
            batch_size: DEFAULT_BATCH_SIZE,
            text_fields: None,
            recreate: false,
            point_ids: PointIds::Sequential,
        }
    }
}

/// Result of a successful table sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSyncStats {
    pub table: String,
    pub collection: String,
    pub collection_state: CollectionState,
    pub records: usize,
    pub batches: usize,
}

/// Derive the id of the record at `position` in the table's record stream
#[inline]
pub fn point_id(
    table: &str,
    record: &Record,
    position: usize,
    strategy: &PointIds,
) -> Result<PointId> {
    match strategy {
        PointIds::Sequential => Ok(PointId::Num(position as u64)),
        PointIds::SourceKey(field) => match record.get(field) {
            Some(value) if !value.is_null() => {
                let name = format!("{}:{}", table, value);
                Ok(PointId::Uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())))
            }
            _ => Err(SyncError::MissingSourceKey {
                table: table.to_string(),
                field: field.clone(),
                position,
            }),
        },
    }
}

/// Turn one batch of records into points. `offset` is the position of the first
/// record of the batch within the whole table.
#[inline]
pub fn build_points(
    table: &str,
    records: &[Record],
    offset: usize,
    options: &SyncOptions,
    embedder: &Embedder,
) -> Result<Vec<Point>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let position = offset + index;
            let text = embedding_text(record, options.text_fields.as_ref());
            Ok(Point {
                id: point_id(table, record, position, &options.point_ids)?,
                vector: embedder.embed(&text),
                payload: to_payload(record),
            })
        })
        .collect()
}

/// Syncs whole tables from a record source into a vector index
#[derive(Clone)]
pub struct TableSyncer {
    index: Arc<dyn VectorIndex>,
    source: Arc<dyn RecordSource>,
    collections: CollectionManager,
    embedder: Embedder,
}

impl TableSyncer {
    #[inline]
    pub fn new(
        index: Arc<dyn VectorIndex>,
        source: Arc<dyn RecordSource>,
        embedder: Embedder,
    ) -> Self {
        Self {
            collections: CollectionManager::new(Arc::clone(&index)),
            index,
            source,
            embedder,
        }
    }

    #[inline]
    pub const fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Mirror every record of `table` into its collection.
    ///
    /// Batches are upserted strictly in order. A failed upsert stops the table; the
    /// points of earlier batches stay in the collection, so a retry should recreate it.
    #[inline]
    pub async fn sync_table(&self, table: &str, options: &SyncOptions) -> Result<TableSyncStats> {
        if options.batch_size == 0 {
            return Err(SyncError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }

        let collection = options
            .collection_name
            .clone()
            .unwrap_or_else(|| table.to_string());
        let params = VectorParams::cosine(self.embedder.dimension());

        let collection_state =
            self.collections
                .ensure_collection(&collection, params, options.recreate)?;
        debug!(
            "Collection '{}' is ready ({:?}) for table '{}'",
            collection, collection_state, table
        );

        let records = self.source.fetch_all(table).await?;
        let total = records.len();

        if total == 0 {
            info!("No records found in table '{}'", table);
            return Ok(TableSyncStats {
                table: table.to_string(),
                collection,
                collection_state,
                records: 0,
                batches: 0,
            });
        }

        let total_batches = total.div_ceil(options.batch_size);
        let mut points_written = 0;

        for (batch, chunk) in records.chunks(options.batch_size).enumerate() {
            let offset = batch * options.batch_size;
            let points = build_points(table, chunk, offset, options, &self.embedder)?;

            self.index
                .upsert_points(&collection, &points)
                .map_err(|source| SyncError::BatchUpsert {
                    collection: collection.clone(),
                    batch,
                    points_written,
                    source,
                })?;

            points_written += points.len();
            info!(
                "Pushed batch {}/{} to '{}' (processed {}/{} records)",
                batch + 1,
                total_batches,
                collection,
                points_written,
                total
            );
        }

        Ok(TableSyncStats {
            table: table.to_string(),
            collection,
            collection_state,
            records: total,
            batches: total_batches,
        })
    }
}
