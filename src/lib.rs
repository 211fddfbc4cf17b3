use thiserror::Error;

use crate::index::IndexError;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error while reading table '{table}': {message}")]
    Source { table: String, message: String },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(
        "Upsert of batch {batch} into collection '{collection}' failed after {points_written} points: {source}"
    )]
    BatchUpsert {
        collection: String,
        batch: usize,
        points_written: usize,
        #[source]
        source: IndexError,
    },

    #[error("Record {position} of table '{table}' has no value for key field '{field}'")]
    MissingSourceKey {
        table: String,
        field: String,
        position: usize,
    },

    #[error("Invalid sync options: {0}")]
    InvalidOptions(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod collections;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod index;
pub mod indexer;
pub mod records;
pub mod search;
