// Database module
// Relational record sources feeding the sync pipeline, plus the local SQLite sync ledger

pub mod memory;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;

use crate::records::Record;

pub use memory::StaticRecordSource;
pub use postgres::PgRecordSource;
pub use sqlite::Ledger;

/// Read access to "all rows of table T" as ordered records.
///
/// The column set of a table is assumed stable for the duration of a sync run.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Every row of `table`, in a stable order
    async fn fetch_all(&self, table: &str) -> crate::Result<Vec<Record>>;
}
